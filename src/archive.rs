use crate::types::{Article, DigestError, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Weekly article store: one JSON file per ISO week under the configured
/// base folder. Repeated runs within the same week merge by article id so
/// earlier fetches are never lost.
pub struct WeeklyArchive {
    base_folder: PathBuf,
}

impl WeeklyArchive {
    pub fn new(base_folder: impl Into<PathBuf>) -> Self {
        Self {
            base_folder: base_folder.into(),
        }
    }

    pub fn file_path(&self, year: i32, week: u32) -> PathBuf {
        self.base_folder
            .join(format!("news_{}_{:02}.json", year, week))
    }

    /// Load the week's articles. A missing file yields an empty list; a
    /// corrupted file is backed up to `.bak` and treated as empty.
    pub fn load(&self, year: i32, week: u32) -> Vec<Article> {
        let path = self.file_path(year, week);
        if !path.exists() {
            return Vec::new();
        }
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to read weekly archive");
                return Vec::new();
            }
        };
        if content.trim().is_empty() {
            warn!(path = %path.display(), "weekly archive is empty");
            return Vec::new();
        }
        match serde_json::from_str(&content) {
            Ok(articles) => articles,
            Err(e) => {
                error!(path = %path.display(), error = %e, "corrupted weekly archive");
                backup_file(&path);
                Vec::new()
            }
        }
    }

    pub fn save(&self, year: i32, week: u32, articles: &[Article]) -> Result<()> {
        fs::create_dir_all(&self.base_folder)?;
        let path = self.file_path(year, week);
        let content = serde_json::to_string_pretty(articles)?;
        fs::write(&path, content)?;
        info!(path = %path.display(), articles = articles.len(), "weekly archive saved");
        Ok(())
    }

    /// Merge freshly fetched articles into the existing set, keeping the
    /// first occurrence of each id. Returns the merged set and the number
    /// of newly added articles.
    pub fn merge(existing: Vec<Article>, fetched: Vec<Article>) -> (Vec<Article>, usize) {
        let mut seen: HashSet<String> = existing.iter().map(|a| a.id.clone()).collect();
        let mut merged = existing;
        let mut added = 0;
        for article in fetched {
            if seen.insert(article.id.clone()) {
                merged.push(article);
                added += 1;
            }
        }
        (merged, added)
    }
}

fn backup_file(path: &Path) {
    let backup = path.with_extension("json.bak");
    match fs::rename(path, &backup) {
        Ok(()) => info!(backup = %backup.display(), "backed up corrupted archive"),
        Err(e) => error!(path = %path.display(), error = %e, "failed to back up archive"),
    }
}

/// `[start, end)` of an ISO week in UTC.
pub fn week_range(year: i32, week: u32) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start_date = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
        .ok_or_else(|| DigestError::Config(format!("invalid ISO week {}-W{:02}", year, week)))?;
    let start = start_date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc();
    Ok((start, start + Duration::days(7)))
}

/// Current ISO year and week number.
pub fn current_year_week() -> (i32, u32) {
    let today = Utc::now();
    let iso = today.iso_week();
    (iso.year(), iso.week())
}
