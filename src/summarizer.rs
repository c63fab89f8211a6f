use crate::config::RankingConfig;
use crate::report::FailureReport;
use crate::types::{ArticleCluster, CategorySection, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// AI-backed narrative generation, injected so tests can substitute a
/// deterministic stub.
#[async_trait]
pub trait SummaryModel: Send + Sync {
    /// Produce one short narrative covering the given `(title, text)` pairs
    /// for a category.
    async fn generate_summary(&self, category: &str, items: &[(String, String)]) -> Result<String>;
}

/// Summarization stage: selects the top-ranked clusters per category and
/// produces one summary per category, never per article.
pub struct Summarizer {
    config: RankingConfig,
    model: Arc<dyn SummaryModel>,
    report: Arc<FailureReport>,
}

impl Summarizer {
    pub fn new(
        config: RankingConfig,
        model: Arc<dyn SummaryModel>,
        report: Arc<FailureReport>,
    ) -> Self {
        Self {
            config,
            model,
            report,
        }
    }

    /// Build the section for one category from its ranked clusters.
    ///
    /// A category with no clusters still produces a section, so the
    /// digest's category list stays stable week to week. A generation
    /// failure falls back to a plain list of the selected titles and is
    /// recorded; it never blocks composition.
    pub async fn summarize(
        &self,
        category: &str,
        ranked_clusters: Vec<ArticleCluster>,
    ) -> CategorySection {
        let top_clusters: Vec<ArticleCluster> = ranked_clusters
            .into_iter()
            .take(self.config.top_stories)
            .collect();

        if top_clusters.is_empty() {
            debug!(category, "no qualifying stories, emitting empty section");
            return CategorySection::empty(category);
        }

        let items: Vec<(String, String)> = top_clusters
            .iter()
            .map(|c| {
                (
                    c.canonical.title.clone(),
                    c.canonical.best_text().to_string(),
                )
            })
            .collect();

        let summary_text = match self.model.generate_summary(category, &items).await {
            Ok(text) => text,
            Err(e) => {
                self.report
                    .record_generation_failure(category, &e.to_string());
                items
                    .iter()
                    .map(|(title, _)| title.as_str())
                    .collect::<Vec<_>>()
                    .join("; ")
            }
        };

        info!(
            category,
            stories = top_clusters.len(),
            "category summarized"
        );
        CategorySection {
            category: category.to_string(),
            top_clusters,
            summary_text,
        }
    }
}
