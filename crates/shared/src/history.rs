use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkStatus {
    Resolved,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub status: LinkStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub total_links: usize,
    pub resolved: usize,
    pub unresolved: usize,
}

/// "Already seen" store keyed by original link, persisted as a JSON object.
pub struct HistoryStore {
    path: PathBuf,
    records: BTreeMap<String, HistoryRecord>,
}

impl HistoryStore {
    /// Load the store at `path`. A missing file is an empty store; a corrupt
    /// one is logged and replaced on the next save.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let records = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read history file: {}", path.display()))?;
            match serde_json::from_str(&content) {
                Ok(records) => records,
                Err(e) => {
                    warn!("Corrupt history file {}: {}. Starting fresh.", path.display(), e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self { path, records })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create history directory")?;
        }

        let json =
            serde_json::to_string_pretty(&self.records).context("Failed to serialize history")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write history file: {}", self.path.display()))?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, url: &str) -> Option<&HistoryRecord> {
        self.records.get(url)
    }

    pub fn is_known(&self, url: &str) -> bool {
        self.records.contains_key(url)
    }

    /// True if some earlier link already resolved to `destination`.
    pub fn has_destination(&self, destination: &str) -> bool {
        self.records
            .values()
            .any(|r| r.resolved_url.as_deref() == Some(destination))
    }

    /// True if this link resolved in an earlier run, or if its destination
    /// was already reached through some other link. Links that only ever
    /// failed are not repeats.
    pub fn is_repeat(&self, original: &str, resolved: &str) -> bool {
        let resolved_before = self
            .get(original)
            .is_some_and(|r| r.resolved_url.is_some());
        resolved_before || (resolved != original && self.has_destination(resolved))
    }

    /// Record the outcome for `original`. An unresolved outcome never
    /// overwrites an earlier resolution.
    pub fn record_resolution(&mut self, original: &str, resolved: Option<&str>) {
        let now = Utc::now();
        let record = self
            .records
            .entry(original.to_string())
            .or_insert_with(|| HistoryRecord {
                first_seen: now,
                last_updated: now,
                status: LinkStatus::Unresolved,
                resolved_url: None,
            });

        record.last_updated = now;
        if let Some(url) = resolved {
            record.status = LinkStatus::Resolved;
            record.resolved_url = Some(url.to_string());
        }
    }

    pub fn stats(&self) -> HistoryStats {
        let resolved = self
            .records
            .values()
            .filter(|r| r.status == LinkStatus::Resolved)
            .count();

        HistoryStats {
            total_links: self.records.len(),
            resolved,
            unresolved: self.records.len() - resolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::load(dir.path().join("history.json")).unwrap();
        assert_eq!(store.stats(), HistoryStats::default());
    }

    #[test]
    fn corrupt_file_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{ not json").unwrap();

        let store = HistoryStore::load(&path).unwrap();
        assert!(!store.is_known("https://news.google.com/articles/A"));
    }

    #[test]
    fn records_survive_a_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("history.json");

        let mut store = HistoryStore::load(&path).unwrap();
        store.record_resolution("https://news.google.com/articles/A", Some("https://a.example/1"));
        store.record_resolution("https://news.google.com/articles/B", None);
        store.save().unwrap();

        let store = HistoryStore::load(&path).unwrap();
        assert!(store.is_known("https://news.google.com/articles/A"));
        assert!(store.has_destination("https://a.example/1"));
        assert_eq!(
            store.get("https://news.google.com/articles/B").unwrap().status,
            LinkStatus::Unresolved
        );
        assert_eq!(
            store.stats(),
            HistoryStats {
                total_links: 2,
                resolved: 1,
                unresolved: 1
            }
        );
    }

    #[test]
    fn earlier_failures_are_not_repeats() {
        let dir = TempDir::new().unwrap();
        let mut store = HistoryStore::load(dir.path().join("h.json")).unwrap();
        store.record_resolution("https://news.google.com/articles/A", None);
        store.record_resolution("https://news.google.com/articles/B", Some("https://b.example/1"));

        // A only failed before, so it is new whether it resolves now or not.
        assert!(!store.is_repeat("https://news.google.com/articles/A", "https://a.example/1"));
        assert!(!store.is_repeat(
            "https://news.google.com/articles/A",
            "https://news.google.com/articles/A"
        ));

        assert!(store.is_repeat("https://news.google.com/articles/B", "https://news.google.com/articles/B"));
        assert!(store.is_repeat("https://news.google.com/articles/C", "https://b.example/1"));
        assert!(!store.is_repeat("https://news.google.com/articles/C", "https://c.example/1"));
    }

    #[test]
    fn failure_does_not_erase_a_resolution() {
        let dir = TempDir::new().unwrap();
        let mut store = HistoryStore::load(dir.path().join("h.json")).unwrap();

        store.record_resolution("u", Some("https://a.example/1"));
        let first_seen = store.get("u").unwrap().first_seen;
        store.record_resolution("u", None);

        let record = store.get("u").unwrap();
        assert_eq!(record.status, LinkStatus::Resolved);
        assert_eq!(record.resolved_url.as_deref(), Some("https://a.example/1"));
        assert_eq!(record.first_seen, first_seen);
    }
}
