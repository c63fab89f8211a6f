use crate::types::{DigestError, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Bounded-attempt retry policy applied uniformly to network fetches.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Per-domain description of how to locate the main body text on a source
/// page.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionRule {
    /// CSS selector for the element holding the article body.
    pub selector: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between requests to the same domain. A politeness contract,
    /// not a correctness requirement.
    #[serde(default = "default_scraping_delay")]
    pub scraping_delay: u64,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    /// Domain -> extraction rule. Articles from domains without a rule are
    /// not enriched.
    #[serde(default)]
    pub sources: HashMap<String, ExtractionRule>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scraping_delay: default_scraping_delay(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            sources: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    /// Minimum Jaccard similarity of text signatures for two articles to be
    /// considered the same story.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_shingle_size")]
    pub shingle_size: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            shingle_size: default_shingle_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    /// How many top-ranked stories each category summary covers.
    #[serde(default = "default_top_stories")]
    pub top_stories: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_stories: default_top_stories(),
        }
    }
}

/// Explicit configuration passed into each stage's constructor. No stage
/// performs ambient lookups.
#[derive(Debug, Clone, Deserialize)]
pub struct DigestConfig {
    /// Category name -> feed URL. Insertion order defines the digest's
    /// section order.
    pub categories: IndexMap<String, String>,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    /// Seconds to wait between retry attempts.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,
    #[serde(default)]
    pub content_enrichment: EnrichmentConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default = "default_base_folder")]
    pub base_folder: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

impl DigestConfig {
    /// Load and validate a JSON configuration file. Any problem here is
    /// fatal and reported before any pipeline stage runs.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DigestError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: DigestConfig = serde_json::from_str(&content).map_err(|e| {
            DigestError::Config(format!("malformed config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(DigestError::Config(
                "config must define at least one category".to_string(),
            ));
        }
        for (category, feed_url) in &self.categories {
            url::Url::parse(feed_url).map_err(|e| {
                DigestError::Config(format!(
                    "category {:?} has invalid feed URL {:?}: {}",
                    category, feed_url, e
                ))
            })?;
        }
        for (domain, rule) in &self.content_enrichment.sources {
            scraper::Selector::parse(&rule.selector).map_err(|e| {
                DigestError::Config(format!(
                    "invalid selector for domain {:?}: {}",
                    domain, e
                ))
            })?;
        }
        let threshold = self.dedup.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(DigestError::Config(format!(
                "similarity_threshold must be within [0.0, 1.0], got {}",
                threshold
            )));
        }
        if self.dedup.shingle_size == 0 {
            return Err(DigestError::Config(
                "shingle_size must be at least 1".to_string(),
            ));
        }
        if self.ranking.top_stories == 0 {
            return Err(DigestError::Config(
                "top_stories must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_count,
            delay: Duration::from_secs(self.retry_delay),
        }
    }

    /// Configured category order, used by the composition stage.
    pub fn category_order(&self) -> Vec<String> {
        self.categories.keys().cloned().collect()
    }
}

fn default_true() -> bool {
    true
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2
}

fn default_scraping_delay() -> u64 {
    2
}

fn default_max_concurrent_fetches() -> usize {
    4
}

fn default_similarity_threshold() -> f64 {
    0.55
}

fn default_shingle_size() -> usize {
    3
}

fn default_top_stories() -> usize {
    8
}

fn default_base_folder() -> String {
    "weekly_news".to_string()
}

fn default_log_file() -> String {
    "logs/output.log".to_string()
}
