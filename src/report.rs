use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

/// Observability sink for recovered failures. Stages record the failure and
/// carry on; nothing here ever aborts a run.
#[derive(Debug, Default)]
pub struct FailureReport {
    fetch_failures: AtomicUsize,
    scoring_failures: AtomicUsize,
    generation_failures: AtomicUsize,
}

impl FailureReport {
    pub fn record_fetch_failure(&self, article_id: &str, url: &str, reason: &str) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
        warn!(article_id, url, reason, "enrichment failed, falling back to feed summary");
    }

    pub fn record_scoring_failure(&self, article_id: &str, reason: &str) {
        self.scoring_failures.fetch_add(1, Ordering::Relaxed);
        warn!(article_id, reason, "scoring failed, assigning lowest score");
    }

    pub fn record_generation_failure(&self, category: &str, reason: &str) {
        self.generation_failures.fetch_add(1, Ordering::Relaxed);
        warn!(category, reason, "summary generation failed, falling back to title list");
    }

    pub fn fetch_failures(&self) -> usize {
        self.fetch_failures.load(Ordering::Relaxed)
    }

    pub fn scoring_failures(&self) -> usize {
        self.scoring_failures.load(Ordering::Relaxed)
    }

    pub fn generation_failures(&self) -> usize {
        self.generation_failures.load(Ordering::Relaxed)
    }

    pub fn log_totals(&self) {
        info!(
            fetch_failures = self.fetch_failures(),
            scoring_failures = self.scoring_failures(),
            generation_failures = self.generation_failures(),
            "recovered failure totals for this run"
        );
    }
}
