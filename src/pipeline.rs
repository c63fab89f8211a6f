use crate::composer::compose;
use crate::config::DigestConfig;
use crate::dedup::Deduplicator;
use crate::enricher::{ContentEnricher, FetchPage};
use crate::ranker::{Ranker, ScoreModel};
use crate::report::FailureReport;
use crate::summarizer::{Summarizer, SummaryModel};
use crate::types::{Article, ArticleCluster, Digest};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::info;

/// The digest assembly pipeline: enrichment, deduplication, ranking,
/// summarization and composition wired together.
///
/// All collaborators are injected at construction; a run consumes a fresh
/// ingestion result and produces an isolated [`Digest`]. Recovered failures
/// in any stage are counted on the shared [`FailureReport`] and never abort
/// the run.
pub struct DigestPipeline {
    category_order: Vec<String>,
    enricher: ContentEnricher,
    deduplicator: Deduplicator,
    ranker: Ranker,
    summarizer: Summarizer,
    report: Arc<FailureReport>,
}

impl DigestPipeline {
    pub fn new(
        config: &DigestConfig,
        fetcher: Arc<dyn FetchPage>,
        score_model: Arc<dyn ScoreModel>,
        summary_model: Arc<dyn SummaryModel>,
    ) -> Self {
        let report = Arc::new(FailureReport::default());
        Self {
            category_order: config.category_order(),
            enricher: ContentEnricher::new(
                config.content_enrichment.clone(),
                config.retry_policy(),
                fetcher,
                Arc::clone(&report),
            ),
            deduplicator: Deduplicator::new(config.dedup.clone()),
            ranker: Ranker::new(score_model, Arc::clone(&report)),
            summarizer: Summarizer::new(config.ranking.clone(), summary_model, Arc::clone(&report)),
            report,
        }
    }

    pub fn report(&self) -> &FailureReport {
        &self.report
    }

    /// Run all stages over one ingestion result. The returned digest is
    /// always structurally complete: every configured category has a
    /// section even when every model call failed.
    pub async fn run(
        &self,
        articles: Vec<Article>,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Digest {
        info!(articles = articles.len(), "starting digest run");

        let enriched = self.enricher.enrich_all(articles).await;
        let clusters = self.deduplicator.deduplicate(enriched);
        let ranked = self.ranker.rank(clusters).await;

        // Group by the canonical article's category, preserving rank order
        // within each group.
        let mut by_category: IndexMap<String, Vec<ArticleCluster>> = IndexMap::new();
        for cluster in ranked {
            by_category
                .entry(cluster.category().to_string())
                .or_default()
                .push(cluster);
        }

        let mut sections = Vec::with_capacity(by_category.len());
        for (category, clusters) in by_category {
            sections.push(self.summarizer.summarize(&category, clusters).await);
        }

        let digest = compose(sections, &self.category_order, period_start, period_end);
        info!(sections = digest.sections.len(), "digest run complete");
        digest
    }
}
