use chrono::{TimeZone, Utc};
use news_digest::archive::{week_range, WeeklyArchive};
use news_digest::types::Article;
use std::fs;
use std::path::PathBuf;

fn temp_base(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("news-digest-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn article(id: &str) -> Article {
    Article {
        id: id.to_string(),
        title: format!("Title {}", id),
        url: format!("https://news.example/{}", id),
        source_feed: "https://news.example/rss".to_string(),
        category: "Verslas".to_string(),
        published_at: Utc.with_ymd_and_hms(2025, 1, 7, 10, 0, 0).unwrap(),
        raw_summary: "Summary text.".to_string(),
        enriched_content: None,
        text_signature: None,
        importance_score: None,
    }
}

#[test]
fn save_and_load_round_trip() {
    let base = temp_base("roundtrip");
    let archive = WeeklyArchive::new(&base);

    let articles = vec![article("a1"), article("a2")];
    archive.save(2025, 2, &articles).expect("save");

    let loaded = archive.load(2025, 2);
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].id, "a1");

    let _ = fs::remove_dir_all(&base);
}

#[test]
fn missing_week_loads_empty() {
    let base = temp_base("missing");
    let archive = WeeklyArchive::new(&base);
    assert!(archive.load(2025, 30).is_empty());
}

#[test]
fn corrupted_archive_is_backed_up_and_treated_as_empty() {
    let base = temp_base("corrupted");
    fs::create_dir_all(&base).expect("mkdir");
    let archive = WeeklyArchive::new(&base);
    let path = archive.file_path(2025, 3);
    fs::write(&path, "{ not valid json").expect("write");

    let loaded = archive.load(2025, 3);
    assert!(loaded.is_empty());
    assert!(!path.exists(), "corrupted file moved aside");
    assert!(path.with_extension("json.bak").exists());

    let _ = fs::remove_dir_all(&base);
}

#[test]
fn merge_skips_already_known_ids() {
    let existing = vec![article("a1"), article("a2")];
    let fetched = vec![article("a2"), article("a3")];
    let (merged, added) = WeeklyArchive::merge(existing, fetched);

    assert_eq!(added, 1);
    let ids: Vec<&str> = merged.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a2", "a3"]);
}

#[test]
fn week_range_covers_iso_week() {
    let (start, end) = week_range(2025, 2).expect("valid week");
    assert_eq!(start, Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap());
    assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 13, 0, 0, 0).unwrap());
    assert!(week_range(2025, 60).is_err());
}
