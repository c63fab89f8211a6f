use crate::config::RetryPolicy;
use crate::types::{article_id, Article, DigestError, Result};
use backoff::backoff::Backoff;
use backoff::exponential::ExponentialBackoff;
use chrono::{DateTime, Utc};
use feed_rs::parser;
use indexmap::IndexMap;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36";

/// Ingestion adapter: fetches each category's RSS feed and produces the
/// flat article list the pipeline consumes, already filtered to the target
/// time window.
pub struct FeedIngester {
    client: Client,
    retry: RetryPolicy,
}

impl FeedIngester {
    pub fn new(retry: RetryPolicy) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .expect("failed to create HTTP client");
        Self { client, retry }
    }

    /// Fetch every configured category. A feed that stays unreachable after
    /// retries contributes no articles but does not abort ingestion.
    pub async fn fetch_all(
        &self,
        categories: &IndexMap<String, String>,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Vec<Article> {
        let mut articles = Vec::new();
        for (category, feed_url) in categories {
            match self.fetch(category, feed_url, since, until).await {
                Ok(items) => {
                    info!(%category, %feed_url, items = items.len(), "feed ingested");
                    articles.extend(items);
                }
                Err(e) => {
                    error!(%category, %feed_url, error = %e, "feed ingestion failed");
                }
            }
        }
        articles
    }

    /// Fetch and parse one feed with retry, returning items published
    /// within `[since, until)`.
    pub async fn fetch(
        &self,
        category: &str,
        feed_url: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Article>> {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: self.retry.delay,
            initial_interval: self.retry.delay,
            max_interval: self.retry.delay * 8,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut last_error = None;
        for attempt in 1..=self.retry.max_attempts.max(1) {
            match self.fetch_once(feed_url).await {
                Ok(body) => return parse_feed(&body, category, feed_url, since, until),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.retry.max_attempts {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!(feed_url, attempt, "feed fetch failed, retrying in {:?}", delay);
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| DigestError::Parse(format!("no fetch attempts for {}", feed_url))))
    }

    async fn fetch_once(&self, feed_url: &str) -> Result<String> {
        let response = self.client.get(feed_url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Parse RSS/Atom content into articles for one category, keeping only
/// items with a usable URL and a publication date inside the window.
pub fn parse_feed(
    content: &str,
    category: &str,
    feed_url: &str,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<Article>> {
    let feed = parser::parse(content.as_bytes())
        .map_err(|e| DigestError::Parse(format!("failed to parse feed: {}", e)))?;

    let mut articles = Vec::new();
    for entry in feed.entries {
        let Some(url) = entry_url(&entry) else {
            debug!("skipping feed entry without URL");
            continue;
        };
        let Some(published_at) = entry.published.or(entry.updated) else {
            debug!(%url, "skipping feed entry without publication date");
            continue;
        };
        let published_at = published_at.with_timezone(&Utc);
        if published_at < since || published_at >= until {
            continue;
        }

        let title = entry
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());

        // Prefer the summary, fall back to inline content, and finally the
        // title so raw_summary is never empty.
        let raw_summary = entry
            .summary
            .map(|s| strip_html(&s.content))
            .filter(|s| !s.is_empty())
            .or_else(|| {
                entry
                    .content
                    .and_then(|c| c.body)
                    .map(|b| strip_html(&b))
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or_else(|| title.clone());

        articles.push(Article {
            id: article_id(&url),
            title,
            url,
            source_feed: feed_url.to_string(),
            category: category.to_string(),
            published_at,
            raw_summary,
            enriched_content: None,
            text_signature: None,
            importance_score: None,
        });
    }
    Ok(articles)
}

fn entry_url(entry: &feed_rs::model::Entry) -> Option<String> {
    if let Some(link) = entry.links.first() {
        return Some(link.href.clone());
    }
    // Some feeds only carry the permalink in the guid.
    if entry.id.starts_with("http") {
        return Some(entry.id.clone());
    }
    None
}

/// Drop markup from feed-provided summaries, collapsing whitespace.
pub fn strip_html(raw: &str) -> String {
    let fragment = scraper::Html::parse_fragment(raw);
    fragment
        .root_element()
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
