use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::models::{BatchReport, Resolution};
use crate::resolver::Resolver;
use crate::token::is_redirect_link;
use crate::transport::Transport;

/// Extra time the supervisor allows past the per-item timeout before it
/// re-checks the batch deadline.
const COMPLETION_GRACE: Duration = Duration::from_secs(5);

const PROGRESS_EVERY: usize = 5;

/// Resolves lists of links concurrently under a per-item timeout and a
/// batch-wide deadline. Output order always matches input order.
pub struct BatchResolver<T: ?Sized> {
    resolver: Arc<Resolver<T>>,
    config: ResolverConfig,
}

impl<T: Transport + ?Sized + 'static> BatchResolver<T> {
    pub fn new(transport: Arc<T>, config: ResolverConfig) -> Result<Self> {
        config.validate()?;
        let resolver = Resolver::new(transport).with_interval(config.interval);

        Ok(Self {
            resolver: Arc::new(resolver),
            config,
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub async fn resolve_all(&self, urls: &[String]) -> BatchReport {
        self.resolve_all_until(urls, std::future::pending()).await
    }

    /// Like [`resolve_all`](Self::resolve_all), but returns as soon as
    /// `shutdown` completes. Unfinished slots keep their original URL.
    pub async fn resolve_all_until<F>(&self, urls: &[String], shutdown: F) -> BatchReport
    where
        F: Future<Output = ()>,
    {
        if urls.is_empty() {
            return BatchReport::default();
        }

        let candidates: Vec<(usize, String)> = urls
            .iter()
            .enumerate()
            .filter(|(_, url)| is_redirect_link(url))
            .map(|(index, url)| (index, url.clone()))
            .collect();

        if candidates.is_empty() {
            return BatchReport::passthrough(urls.to_vec());
        }

        let mut job = BatchJob::new(urls, candidates.len(), self.config.show_progress);
        let batch_deadline = job.started + self.config.batch_timeout;

        if job.show_progress {
            eprintln!(
                "🔗 Resolving {} redirect links (max {}s)...",
                job.total,
                self.config.batch_timeout.as_secs()
            );
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_workers));
        let mut tasks = JoinSet::new();
        for (index, url) in candidates {
            let resolver = Arc::clone(&self.resolver);
            let semaphore = Arc::clone(&semaphore);
            let budget = self.config.per_url_timeout;
            tasks.spawn(async move {
                let resolution = match semaphore.acquire_owned().await {
                    Ok(_permit) => resolver.resolve(&url, budget).await,
                    Err(_) => Resolution::TimedOut,
                };
                (index, resolution)
            });
        }

        tokio::pin!(shutdown);
        let wait_cap = self.config.per_url_timeout + COMPLETION_GRACE;

        while !tasks.is_empty() {
            let now = Instant::now();
            if now >= batch_deadline {
                warn!(
                    "Batch deadline of {:?} reached with {} links outstanding",
                    self.config.batch_timeout,
                    tasks.len()
                );
                if job.show_progress {
                    eprintln!(
                        "\n  ⚠ Batch timeout ({}s) reached, cancelling the rest...",
                        self.config.batch_timeout.as_secs()
                    );
                }
                job.timed_out += tasks.len();
                tasks.abort_all();
                break;
            }

            let wait_until = batch_deadline.min(now + wait_cap);
            tokio::select! {
                _ = &mut shutdown => {
                    if job.show_progress {
                        eprintln!("\n  Interrupted, stopping...");
                    }
                    job.interrupted = true;
                    tasks.abort_all();
                    break;
                }
                joined = tokio::time::timeout_at(wait_until, tasks.join_next()) => match joined {
                    // Nothing finished within the cap; loop to re-check the deadline.
                    Err(_) => continue,
                    Ok(None) => break,
                    Ok(Some(Ok((index, resolution)))) => job.record(index, resolution),
                    Ok(Some(Err(e))) => {
                        warn!("Resolver task ended abnormally: {}", e);
                        job.failed += 1;
                    }
                },
            }
        }

        // Dropping the set aborts anything still running without waiting on it.
        drop(tasks);
        job.finish()
    }
}

/// Per-call bookkeeping. Only the supervising task touches it, so slot
/// writes and counter updates need no synchronization.
struct BatchJob<'a> {
    originals: &'a [String],
    slots: Vec<String>,
    started: Instant,
    total: usize,
    resolved: usize,
    failed: usize,
    timed_out: usize,
    interrupted: bool,
    show_progress: bool,
}

impl<'a> BatchJob<'a> {
    fn new(originals: &'a [String], total: usize, show_progress: bool) -> Self {
        Self {
            originals,
            slots: originals.to_vec(),
            started: Instant::now(),
            total,
            resolved: 0,
            failed: 0,
            timed_out: 0,
            interrupted: false,
            show_progress,
        }
    }

    fn record(&mut self, index: usize, resolution: Resolution) {
        match &resolution {
            Resolution::Resolved(_) => self.resolved += 1,
            Resolution::Passthrough(_) => {}
            Resolution::Failed(e) => {
                self.failed += 1;
                debug!("Link #{} failed: {}", index, e);
                if self.show_progress {
                    eprintln!("    ✗ #{}: {}", index, shorten(&e.to_string(), 60));
                }
            }
            Resolution::TimedOut => {
                self.timed_out += 1;
                if self.show_progress {
                    eprintln!("    ⏱ Timeout: link #{}", index);
                }
            }
        }

        let original = &self.originals[index];
        self.slots[index] = resolution.into_url(original);

        let done = self.resolved + self.failed + self.timed_out;
        if self.show_progress && done % PROGRESS_EVERY == 0 {
            eprintln!(
                "    {}/{} processed ({} ok, {} failed) [{:.1}s]",
                done,
                self.total,
                self.resolved,
                self.failed + self.timed_out,
                self.started.elapsed().as_secs_f64()
            );
        }
    }

    fn finish(self) -> BatchReport {
        let elapsed = self.started.elapsed();
        if self.show_progress {
            if self.timed_out > 0 {
                eprintln!(
                    "✓ Resolved {}/{} ({} failed, {} timed out) [{:.1}s]",
                    self.resolved,
                    self.total,
                    self.failed,
                    self.timed_out,
                    elapsed.as_secs_f64()
                );
            } else {
                eprintln!(
                    "✓ Resolved {}/{} ({} failed) [{:.1}s]",
                    self.resolved,
                    self.total,
                    self.failed,
                    elapsed.as_secs_f64()
                );
            }
        }

        BatchReport {
            urls: self.slots,
            candidates: self.total,
            resolved: self.resolved,
            failed: self.failed,
            timed_out: self.timed_out,
            interrupted: self.interrupted,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}
