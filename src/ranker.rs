use crate::report::FailureReport;
use crate::types::{ArticleCluster, Result};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Lower and upper bounds of the importance scale. Scores returned by a
/// model are clamped into this range; a failed scoring call yields
/// `SCORE_MIN` so the article is deprioritized rather than dropped.
pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 10.0;

/// AI-backed importance judgment, injected so tests can substitute a
/// deterministic stub.
#[async_trait]
pub trait ScoreModel: Send + Sync {
    /// Score the importance of a story's text within `[SCORE_MIN, SCORE_MAX]`.
    async fn score(&self, text: &str) -> Result<f64>;
}

/// Ranking stage: assigns each canonical article an importance score and
/// orders clusters within each category by descending score.
pub struct Ranker {
    model: Arc<dyn ScoreModel>,
    report: Arc<FailureReport>,
    // Per-run memo so repeated identical texts cost one model call.
    cache: Mutex<HashMap<String, f64>>,
}

impl Ranker {
    pub fn new(model: Arc<dyn ScoreModel>, report: Arc<FailureReport>) -> Self {
        Self {
            model,
            report,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Score every cluster's canonical article and return the clusters
    /// grouped by category, ordered by descending score. Ties break on
    /// `published_at` (more recent wins), then id.
    pub async fn rank(&self, mut clusters: Vec<ArticleCluster>) -> Vec<ArticleCluster> {
        for cluster in &mut clusters {
            let score = self.score_article(cluster).await;
            cluster.canonical.importance_score = Some(score);
        }
        clusters.sort_by(compare_ranked);
        info!(clusters = clusters.len(), "ranking complete");
        clusters
    }

    async fn score_article(&self, cluster: &ArticleCluster) -> f64 {
        let text = cluster.canonical.best_text();
        let key = text_key(text);
        if let Some(&cached) = self.cache.lock().await.get(&key) {
            debug!(id = %cluster.canonical.id, "reusing cached score");
            return cached;
        }
        match self.model.score(text).await {
            Ok(raw) => {
                let score = raw.clamp(SCORE_MIN, SCORE_MAX);
                self.cache.lock().await.insert(key, score);
                score
            }
            Err(e) => {
                self.report
                    .record_scoring_failure(&cluster.canonical.id, &e.to_string());
                SCORE_MIN
            }
        }
    }
}

fn text_key(text: &str) -> String {
    use sha2::{Digest as _, Sha256};
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

fn compare_ranked(a: &ArticleCluster, b: &ArticleCluster) -> Ordering {
    a.category()
        .cmp(b.category())
        .then_with(|| {
            b.score()
                .partial_cmp(&a.score())
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| b.canonical.published_at.cmp(&a.canonical.published_at))
        .then_with(|| a.canonical.id.cmp(&b.canonical.id))
}
