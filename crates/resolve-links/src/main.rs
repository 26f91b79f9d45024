use anyhow::{Context, Result};
use clap::Parser;
use shared::{
    get_default_history_path, read_url_list, write_report, BatchResolver, HistoryStore,
    HttpTransport, ResolverConfig,
};
use std::io::{self as stdio, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "resolve-links")]
#[command(about = "Resolve Google News redirect links to their real article URLs")]
struct Args {
    /// URLs to resolve (read from --input or stdin when omitted)
    urls: Vec<String>,

    /// File with URLs, one per line or a JSON array
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Write the full JSON report here instead of printing URLs
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum number of links resolved in parallel
    #[arg(long)]
    max_workers: Option<usize>,

    /// Seconds allowed per link
    #[arg(long)]
    per_url_timeout: Option<u64>,

    /// Seconds allowed for the whole batch
    #[arg(long)]
    batch_timeout: Option<u64>,

    /// Pause in milliseconds after each successful resolution
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,

    /// History file (defaults to the local data directory)
    #[arg(long, conflicts_with = "no_history")]
    history: Option<PathBuf>,

    /// Do not read or update the history file
    #[arg(long)]
    no_history: bool,

    /// Only print links whose destination was not seen in an earlier run
    #[arg(long, conflicts_with = "no_history")]
    new_only: bool,
}

impl Args {
    fn apply_to(&self, mut config: ResolverConfig) -> ResolverConfig {
        if let Some(workers) = self.max_workers {
            config.max_workers = workers;
        }
        if let Some(secs) = self.per_url_timeout {
            config.per_url_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.batch_timeout {
            config.batch_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = self.interval_ms {
            config.interval = Duration::from_millis(ms);
        }
        if self.quiet {
            config.show_progress = false;
        }
        config
    }

    /// URLs from the command line and `--input`; stdin is only read when
    /// neither was given.
    fn collect_urls(&self, mut stdin: impl Read) -> Result<Vec<String>> {
        if self.urls.is_empty() && self.input.is_none() {
            let mut content = String::new();
            stdin
                .read_to_string(&mut content)
                .context("Failed to read URLs from stdin")?;
            return shared::io::parse_url_list(&content);
        }

        let mut urls = self.urls.clone();
        if let Some(path) = &self.input {
            urls.extend(read_url_list(path)?);
        }

        Ok(urls)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(stdio::stderr)
        .init();

    let args = Args::parse();
    let config = args.apply_to(ResolverConfig::from_env()?);

    info!(
        "Resolver config: {} workers, {:?} per link, {:?} per batch",
        config.max_workers, config.per_url_timeout, config.batch_timeout
    );

    let urls = args.collect_urls(stdio::stdin())?;
    if urls.is_empty() {
        eprintln!("No URLs to resolve.");
        return Ok(());
    }

    let mut history = if args.no_history {
        None
    } else {
        let path = match &args.history {
            Some(path) => path.clone(),
            None => get_default_history_path()?,
        };
        Some(HistoryStore::load(path)?)
    };

    let transport = Arc::new(HttpTransport::new()?);
    let resolver = BatchResolver::new(transport, config)?;

    let shutdown = async {
        // If the handler cannot be installed, run without interrupt support.
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let report = resolver.resolve_all_until(&urls, shutdown).await;

    let mut printed = Vec::with_capacity(report.urls.len());
    for (original, resolved) in urls.iter().zip(&report.urls) {
        let changed = resolved != original;
        let seen_before = history
            .as_ref()
            .is_some_and(|h| h.is_repeat(original, resolved));

        if !(args.new_only && seen_before) {
            printed.push(resolved.as_str());
        }

        if let Some(store) = history.as_mut() {
            if shared::is_redirect_link(original) {
                store.record_resolution(original, changed.then_some(resolved.as_str()));
            }
        }
    }

    if let Some(store) = &history {
        store.save().context("Failed to save history")?;
        if resolver.config().show_progress {
            let stats = store.stats();
            eprintln!(
                "📚 History: {} links ({} resolved) in {}",
                stats.total_links,
                stats.resolved,
                store.path().display()
            );
        }
    }

    if let Some(path) = &args.output {
        write_report(&report, path).context("Failed to write report")?;
        eprintln!("\n✅ Report saved to: {}", path.display());
    } else {
        for url in printed {
            println!("{}", url);
        }
    }

    if report.interrupted {
        warn!(
            "Interrupted with {} of {} links resolved",
            report.resolved, report.candidates
        );
        anyhow::bail!("Interrupted before all links were resolved");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn empty_input_file_does_not_fall_back_to_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "").unwrap();

        let args = Args::parse_from(["resolve-links", "--input", path.to_str().unwrap()]);
        let urls = args
            .collect_urls(Cursor::new("https://news.google.com/articles/FROM_STDIN"))
            .unwrap();

        assert!(urls.is_empty());
    }

    #[test]
    fn stdin_is_read_when_nothing_else_is_given() {
        let args = Args::parse_from(["resolve-links"]);
        let urls = args
            .collect_urls(Cursor::new("# list\nhttps://a.example/1\n"))
            .unwrap();

        assert_eq!(urls, vec!["https://a.example/1".to_string()]);
    }

    #[test]
    fn positional_urls_come_before_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "https://b.example/2\n").unwrap();

        let args = Args::parse_from([
            "resolve-links",
            "https://a.example/1",
            "--input",
            path.to_str().unwrap(),
        ]);
        let urls = args.collect_urls(Cursor::new("")).unwrap();

        assert_eq!(urls, vec!["https://a.example/1", "https://b.example/2"]);
    }
}
