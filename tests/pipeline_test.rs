use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use news_digest::config::{DedupConfig, DigestConfig, EnrichmentConfig, RankingConfig};
use news_digest::types::{Article, CategorySection, DigestError, Result, EMPTY_CATEGORY_TEXT};
use news_digest::{composer, DigestPipeline, FetchPage, ScoreModel, SummaryModel};
use std::sync::Arc;

struct NoFetch;

#[async_trait]
impl FetchPage for NoFetch {
    async fn fetch(&self, _url: &str) -> Result<String> {
        Err(DigestError::Parse("no network in tests".to_string()))
    }
}

/// Scores by word count; texts containing "unscorable" fail.
struct WordCountScore;

#[async_trait]
impl ScoreModel for WordCountScore {
    async fn score(&self, text: &str) -> Result<f64> {
        if text.contains("unscorable") {
            return Err(DigestError::Model("scoring backend down".to_string()));
        }
        Ok(text.split_whitespace().count() as f64)
    }
}

struct EchoSummary;

#[async_trait]
impl SummaryModel for EchoSummary {
    async fn generate_summary(&self, category: &str, items: &[(String, String)]) -> Result<String> {
        Ok(format!("{} covered {} stories", category, items.len()))
    }
}

struct BrokenSummary;

#[async_trait]
impl SummaryModel for BrokenSummary {
    async fn generate_summary(
        &self,
        _category: &str,
        _items: &[(String, String)],
    ) -> Result<String> {
        Err(DigestError::Model("generation backend down".to_string()))
    }
}

fn test_config() -> DigestConfig {
    let mut categories = IndexMap::new();
    categories.insert(
        "Ukraina".to_string(),
        "https://news.example/ukraina/rss".to_string(),
    );
    categories.insert(
        "Verslas".to_string(),
        "https://news.example/verslas/rss".to_string(),
    );
    DigestConfig {
        categories,
        retry_count: 1,
        retry_delay: 0,
        content_enrichment: EnrichmentConfig {
            enabled: true,
            scraping_delay: 0,
            max_concurrent_fetches: 2,
            sources: Default::default(),
        },
        dedup: DedupConfig::default(),
        ranking: RankingConfig { top_stories: 8 },
        base_folder: "weekly_news".to_string(),
        log_file: "logs/output.log".to_string(),
    }
}

fn pipeline(config: &DigestConfig, summary: Arc<dyn SummaryModel>) -> DigestPipeline {
    DigestPipeline::new(config, Arc::new(NoFetch), Arc::new(WordCountScore), summary)
}

fn article(id: &str, category: &str, text: &str, day: u32) -> Article {
    Article {
        id: id.to_string(),
        title: format!("Title {}", id),
        url: format!("https://news.example/{}", id),
        source_feed: format!("https://news.example/{}/rss", category.to_lowercase()),
        category: category.to_string(),
        published_at: Utc.with_ymd_and_hms(2025, 1, day, 8, 0, 0).unwrap(),
        raw_summary: text.to_string(),
        enriched_content: None,
        text_signature: None,
        importance_score: None,
    }
}

fn period() -> (DateTime<Utc>, DateTime<Utc>) {
    (
        Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 1, 13, 0, 0, 0).unwrap(),
    )
}

#[tokio::test]
async fn empty_categories_still_produce_sections_in_order() {
    let config = test_config();
    let pipeline = pipeline(&config, Arc::new(EchoSummary));
    let (start, end) = period();

    // Only Verslas has articles this week.
    let articles = vec![
        article("v1", "Verslas", "quarterly results beat expectations by a wide margin", 7),
        article("v2", "Verslas", "central bank holds interest rates steady again today", 8),
    ];
    let digest = pipeline.run(articles, start, end).await;

    assert_eq!(digest.sections.len(), 2);
    assert_eq!(digest.sections[0].category, "Ukraina");
    assert!(digest.sections[0].top_clusters.is_empty());
    assert_eq!(digest.sections[0].summary_text, EMPTY_CATEGORY_TEXT);
    assert_eq!(digest.sections[1].category, "Verslas");
    assert_eq!(digest.sections[1].top_clusters.len(), 2);
    assert_eq!(digest.sections[1].summary_text, "Verslas covered 2 stories");
}

#[tokio::test]
async fn scoring_failure_deprioritizes_but_keeps_article() {
    let config = test_config();
    let pipeline = pipeline(&config, Arc::new(EchoSummary));
    let (start, end) = period();

    // Five dissimilar stories; the longest one cannot be scored.
    let articles = vec![
        article("f1", "Ukraina", "one two three four five six seven eight nine ten", 7),
        article("f2", "Ukraina", "alpha bravo charlie delta echo foxtrot golf hotel", 7),
        article("f3", "Ukraina", "red orange yellow green blue indigo violet", 7),
        article("f4", "Ukraina", "north south east west compass bearing heading", 7),
        article(
            "f5",
            "Ukraina",
            "unscorable words repeated here again again again again again again again again",
            7,
        ),
    ];
    let digest = pipeline.run(articles, start, end).await;

    let section = digest
        .sections
        .iter()
        .find(|s| s.category == "Ukraina")
        .expect("section present");
    assert_eq!(section.top_clusters.len(), 5, "all five stories survive");
    let last = section.top_clusters.last().unwrap();
    assert_eq!(last.canonical.id, "f5");
    assert_eq!(last.canonical.importance_score, Some(0.0));
    assert_eq!(pipeline.report().scoring_failures(), 1);

    // Scores are descending throughout the section.
    let scores: Vec<f64> = section.top_clusters.iter().map(|c| c.score()).collect();
    for pair in scores.windows(2) {
        assert!(pair[0] >= pair[1]);
    }
}

#[tokio::test]
async fn generation_failure_falls_back_to_title_list() {
    let config = test_config();
    let pipeline = pipeline(&config, Arc::new(BrokenSummary));
    let (start, end) = period();

    let articles = vec![
        article("g1", "Verslas", "markets rallied strongly on stimulus news today", 7),
        article("g2", "Verslas", "a completely different merger was announced quietly", 8),
    ];
    let digest = pipeline.run(articles, start, end).await;

    let section = digest
        .sections
        .iter()
        .find(|s| s.category == "Verslas")
        .expect("section present");
    assert_eq!(section.top_clusters.len(), 2);
    // Fallback is the selected titles in rank order.
    assert!(section.summary_text.contains("Title g1"));
    assert!(section.summary_text.contains("Title g2"));
    assert!(section.summary_text.contains("; "));
    assert_eq!(pipeline.report().generation_failures(), 1);
}

#[tokio::test]
async fn top_stories_limit_is_applied() {
    let mut config = test_config();
    config.ranking.top_stories = 1;
    let pipeline = pipeline(&config, Arc::new(EchoSummary));
    let (start, end) = period();

    let articles = vec![
        article("t1", "Verslas", "short note", 7),
        article(
            "t2",
            "Verslas",
            "much longer and therefore more important story with many words in it",
            8,
        ),
    ];
    let digest = pipeline.run(articles, start, end).await;

    let section = digest
        .sections
        .iter()
        .find(|s| s.category == "Verslas")
        .expect("section present");
    assert_eq!(section.top_clusters.len(), 1);
    assert_eq!(section.top_clusters[0].canonical.id, "t2");
}

#[test]
fn compose_appends_unconfigured_categories_after_order() {
    let (start, end) = period();
    let sections = vec![
        CategorySection {
            category: "Extra".to_string(),
            top_clusters: Vec::new(),
            summary_text: "extra summary".to_string(),
        },
        CategorySection {
            category: "Verslas".to_string(),
            top_clusters: Vec::new(),
            summary_text: "verslas summary".to_string(),
        },
    ];
    let order = vec!["Ukraina".to_string(), "Verslas".to_string()];
    let digest = composer::compose(sections, &order, start, end);

    let names: Vec<&str> = digest.sections.iter().map(|s| s.category.as_str()).collect();
    assert_eq!(names, vec!["Ukraina", "Verslas", "Extra"]);
    assert_eq!(digest.sections[0].summary_text, EMPTY_CATEGORY_TEXT);
    assert_eq!(digest.sections[1].summary_text, "verslas summary");
    assert_eq!(digest.period_start, start);
    assert_eq!(digest.period_end, end);
}
