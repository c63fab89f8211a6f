pub mod archive;
pub mod composer;
pub mod config;
pub mod dedup;
pub mod delivery;
pub mod enricher;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod ranker;
pub mod report;
pub mod summarizer;
pub mod types;

pub use archive::WeeklyArchive;
pub use config::{DedupConfig, DigestConfig, EnrichmentConfig, RankingConfig, RetryPolicy};
pub use dedup::Deduplicator;
pub use enricher::{ContentEnricher, FetchPage, HttpPageFetcher};
pub use ingest::FeedIngester;
pub use llm::{HeuristicModel, OpenAiModel};
pub use pipeline::DigestPipeline;
pub use ranker::{Ranker, ScoreModel};
pub use report::FailureReport;
pub use summarizer::{Summarizer, SummaryModel};
pub use types::*;
