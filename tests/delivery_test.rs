use chrono::{TimeZone, Utc};
use news_digest::delivery::render_html;
use news_digest::types::{Article, ArticleCluster, CategorySection, Digest, EMPTY_CATEGORY_TEXT};

fn story(url: &str, title: &str) -> ArticleCluster {
    let article = Article {
        id: "d1".to_string(),
        title: title.to_string(),
        url: url.to_string(),
        source_feed: "https://news.example/rss".to_string(),
        category: "Verslas".to_string(),
        published_at: Utc.with_ymd_and_hms(2025, 1, 7, 10, 0, 0).unwrap(),
        raw_summary: "Summary text.".to_string(),
        enriched_content: None,
        text_signature: None,
        importance_score: Some(5.0),
    };
    ArticleCluster {
        canonical: article.clone(),
        members: vec![article],
    }
}

fn digest(sections: Vec<CategorySection>) -> Digest {
    Digest {
        period_start: Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap(),
        period_end: Utc.with_ymd_and_hms(2025, 1, 13, 0, 0, 0).unwrap(),
        sections,
    }
}

#[test]
fn render_html_escapes_urls_and_text() {
    let digest = digest(vec![CategorySection {
        category: "Verslas".to_string(),
        top_clusters: vec![story(
            "https://news.example/story?id=1&ref=\"rss\"",
            "Q3 \"record\" profits & more",
        )],
        summary_text: "Profits <up> this quarter.".to_string(),
    }]);

    let html = render_html(&digest);

    assert!(html.contains("href=\"https://news.example/story?id=1&amp;ref=&quot;rss&quot;\""));
    assert!(html.contains("Q3 &quot;record&quot; profits &amp; more"));
    assert!(html.contains("Profits &lt;up&gt; this quarter."));
    assert!(!html.contains("id=1&ref="));
}

#[test]
fn empty_section_renders_notice_without_story_list() {
    let digest = digest(vec![CategorySection::empty("Ukraina")]);
    let html = render_html(&digest);

    assert!(html.contains("<b>Ukraina</b>"));
    assert!(html.contains(EMPTY_CATEGORY_TEXT));
    assert!(!html.contains("<ul>"));
    assert!(html.contains("2025-01-06"));
    assert!(html.contains("2025-01-13"));
}
