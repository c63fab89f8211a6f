use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::collections::BTreeSet;

/// One feed item flowing through the pipeline.
///
/// `raw_summary` is always non-empty; `enriched_content`, `text_signature`
/// and `importance_score` are filled in by later stages and never cleared
/// once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub url: String,
    pub source_feed: String,
    pub category: String,
    pub published_at: DateTime<Utc>,
    pub raw_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enriched_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_signature: Option<TextSignature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance_score: Option<f64>,
}

impl Article {
    /// The best text available for downstream stages: the full body when
    /// enrichment succeeded, the feed-provided summary otherwise.
    pub fn best_text(&self) -> &str {
        self.enriched_content.as_deref().unwrap_or(&self.raw_summary)
    }

    /// Domain of the source page, used to look up extraction rules.
    pub fn domain(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
    }
}

/// Stable article identifier derived from the source URL.
pub fn article_id(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut id = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        id.push_str(&format!("{:02x}", byte));
    }
    id
}

/// Normalized representation of an article's text used for near-duplicate
/// detection: a set of hashed word shingles compared by Jaccard similarity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSignature {
    shingles: BTreeSet<u64>,
}

impl TextSignature {
    /// Build a signature from normalized text using `shingle_size`-word
    /// shingles. Texts shorter than one shingle hash as a single unit so
    /// very short summaries still compare meaningfully.
    pub fn from_text(text: &str, shingle_size: usize) -> Self {
        let words: Vec<String> = text
            .to_lowercase()
            .split_whitespace()
            .map(|w| {
                w.chars()
                    .filter(|c| c.is_alphanumeric())
                    .collect::<String>()
            })
            .filter(|w| !w.is_empty())
            .collect();

        let mut shingles = BTreeSet::new();
        if words.len() < shingle_size {
            if !words.is_empty() {
                shingles.insert(hash_shingle(&words.join(" ")));
            }
        } else {
            for window in words.windows(shingle_size) {
                shingles.insert(hash_shingle(&window.join(" ")));
            }
        }
        Self { shingles }
    }

    /// Jaccard similarity in `[0.0, 1.0]`. Two empty signatures compare as
    /// dissimilar rather than identical.
    pub fn jaccard(&self, other: &TextSignature) -> f64 {
        if self.shingles.is_empty() || other.shingles.is_empty() {
            return 0.0;
        }
        let intersection = self.shingles.intersection(&other.shingles).count();
        let union = self.shingles.len() + other.shingles.len() - intersection;
        intersection as f64 / union as f64
    }

    pub fn is_empty(&self) -> bool {
        self.shingles.is_empty()
    }
}

fn hash_shingle(shingle: &str) -> u64 {
    let digest = Sha256::digest(shingle.as_bytes());
    u64::from_be_bytes(digest[..8].try_into().expect("digest is 32 bytes"))
}

/// A group of articles judged to cover the same underlying story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleCluster {
    /// The chosen representative; its category is the cluster's category.
    pub canonical: Article,
    /// All articles in the cluster, canonical first, the rest ordered by id.
    /// Members keep their original `source_feed` and `url` for attribution.
    pub members: Vec<Article>,
}

impl ArticleCluster {
    pub fn category(&self) -> &str {
        &self.canonical.category
    }

    pub fn score(&self) -> f64 {
        self.canonical.importance_score.unwrap_or(0.0)
    }
}

/// Text used for a category that produced no qualifying stories. The
/// category still appears in the digest so the section list is stable
/// from week to week.
pub const EMPTY_CATEGORY_TEXT: &str = "No significant news for this period.";

/// One category's slice of the digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySection {
    pub category: String,
    /// Selected clusters, ordered by descending canonical importance score.
    pub top_clusters: Vec<ArticleCluster>,
    pub summary_text: String,
}

impl CategorySection {
    pub fn empty(category: &str) -> Self {
        Self {
            category: category.to_string(),
            top_clusters: Vec::new(),
            summary_text: EMPTY_CATEGORY_TEXT.to_string(),
        }
    }
}

/// The final composed digest for one period. Constructed fresh each run and
/// never mutated after composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Digest {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub sections: Vec<CategorySection>,
}

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("delivery error: {0}")]
    Delivery(String),
}

pub type Result<T> = std::result::Result<T, DigestError>;
