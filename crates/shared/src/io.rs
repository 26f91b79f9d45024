use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::BatchReport;

/// Default location of the resolution history file.
pub fn get_default_history_path() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .context("Could not determine local data directory")?
        .join("news-resolver");

    fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

    Ok(data_dir.join("history.json"))
}

/// Parse a list of URLs: either a JSON array of strings or one URL per line,
/// skipping blank lines and `#` comments.
pub fn parse_url_list(content: &str) -> Result<Vec<String>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("Failed to parse JSON URL list");
    }

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

pub fn read_url_list(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        anyhow::bail!("URL list not found: {}", path.display());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list: {}", path.display()))?;

    parse_url_list(&content).with_context(|| format!("Invalid URL list: {}", path.display()))
}

/// Write a batch report as pretty JSON.
pub fn write_report(report: &BatchReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;

    fs::write(path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_line_list_with_comments() {
        let urls = parse_url_list("# today\nhttps://a.example/1\n\n  https://b.example/2  \n").unwrap();
        assert_eq!(urls, vec!["https://a.example/1", "https://b.example/2"]);
    }

    #[test]
    fn parses_json_list() {
        let urls = parse_url_list(r#" ["https://a.example/1", ""]"#).unwrap();
        assert_eq!(urls, vec!["https://a.example/1", ""]);
    }

    #[test]
    fn rejects_malformed_json_list() {
        assert!(parse_url_list("[1, 2").is_err());
    }

    #[test]
    fn report_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = BatchReport::passthrough(vec!["https://a.example/1".to_string()]);

        write_report(&report, &path).unwrap();
        let loaded: BatchReport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.urls, report.urls);
    }
}
