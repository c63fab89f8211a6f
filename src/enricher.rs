use crate::config::{EnrichmentConfig, RetryPolicy};
use crate::report::FailureReport;
use crate::types::{Article, DigestError, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use scraper::Selector;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36";

/// Page-fetching seam so tests can substitute deterministic stubs for
/// network I/O.
#[async_trait]
pub trait FetchPage: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .expect("failed to create HTTP client");
        Self { client }
    }
}

impl Default for HttpPageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchPage for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Enrichment stage: attempts to replace each article's feed summary with
/// the full body text scraped from its source page.
///
/// Failures never leave this stage. An article whose page cannot be fetched
/// or parsed proceeds with `enriched_content` absent and its `raw_summary`
/// stays authoritative downstream.
pub struct ContentEnricher {
    config: EnrichmentConfig,
    retry: RetryPolicy,
    fetcher: Arc<dyn FetchPage>,
    report: Arc<FailureReport>,
    // Selectors parsed once per domain at construction.
    selectors: HashMap<String, Selector>,
    // Earliest instant the next request to each domain may go out.
    domain_gate: Mutex<HashMap<String, Instant>>,
}

impl ContentEnricher {
    pub fn new(
        config: EnrichmentConfig,
        retry: RetryPolicy,
        fetcher: Arc<dyn FetchPage>,
        report: Arc<FailureReport>,
    ) -> Self {
        let mut selectors = HashMap::new();
        for (domain, rule) in &config.sources {
            match Selector::parse(&rule.selector) {
                Ok(selector) => {
                    selectors.insert(domain.clone(), selector);
                }
                Err(e) => {
                    warn!(%domain, error = %e, "dropping unparseable selector");
                }
            }
        }
        Self {
            config,
            retry,
            fetcher,
            report,
            selectors,
            domain_gate: Mutex::new(HashMap::new()),
        }
    }

    /// Enrich a batch of articles with bounded concurrency. Requests to the
    /// same domain are spaced by `scraping_delay` regardless of the global
    /// concurrency limit.
    pub async fn enrich_all(&self, articles: Vec<Article>) -> Vec<Article> {
        if !self.config.enabled {
            debug!("content enrichment disabled, skipping");
            return articles;
        }
        stream::iter(articles.into_iter().map(|article| self.enrich(article)))
            .buffer_unordered(self.config.max_concurrent_fetches.max(1))
            .collect()
            .await
    }

    /// Enrich a single article. Never errors; on failure the article is
    /// returned unchanged and the failure is recorded.
    pub async fn enrich(&self, mut article: Article) -> Article {
        let Some(domain) = article.domain() else {
            debug!(url = %article.url, "article URL has no host, skipping enrichment");
            return article;
        };
        let Some(selector) = self.selectors.get(&domain) else {
            debug!(%domain, "no extraction rule for domain, keeping feed summary");
            return article;
        };

        let mut last_error = String::new();
        for attempt in 1..=self.retry.max_attempts.max(1) {
            self.wait_for_domain(&domain).await;
            match self.try_extract(&article.url, selector).await {
                Ok(body) => {
                    debug!(id = %article.id, bytes = body.len(), "article enriched");
                    article.enriched_content = Some(body);
                    return article;
                }
                Err(e) => {
                    debug!(
                        id = %article.id,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %e,
                        "enrichment attempt failed"
                    );
                    last_error = e.to_string();
                }
            }
            if attempt < self.retry.max_attempts {
                tokio::time::sleep(self.retry.delay).await;
            }
        }

        self.report
            .record_fetch_failure(&article.id, &article.url, &last_error);
        article
    }

    async fn try_extract(&self, url: &str, selector: &Selector) -> Result<String> {
        let html = self.fetcher.fetch(url).await?;
        extract_body(&html, selector)
    }

    /// Reserve a send slot for `domain`, sleeping until `scraping_delay`
    /// has passed since the previous request to it.
    async fn wait_for_domain(&self, domain: &str) {
        let delay = Duration::from_secs(self.config.scraping_delay);
        let ready_at = {
            let mut gate = self.domain_gate.lock().await;
            let now = Instant::now();
            let ready_at = match gate.get(domain) {
                Some(last) => (*last + delay).max(now),
                None => now,
            };
            gate.insert(domain.to_string(), ready_at);
            ready_at
        };
        tokio::time::sleep_until(ready_at).await;
    }
}

/// Extract the text of the first element matching `selector`. Kept
/// synchronous so the non-`Send` DOM types never live across an await.
fn extract_body(html: &str, selector: &Selector) -> Result<String> {
    let document = scraper::Html::parse_document(html);
    let element = document
        .select(selector)
        .next()
        .ok_or_else(|| DigestError::Parse("selector matched no element".to_string()))?;
    let text = element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        return Err(DigestError::Parse(
            "selected element contained no text".to_string(),
        ));
    }
    Ok(text)
}
