use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::models::{Resolution, ResolveError};
use crate::params::fetch_decoding_params;
use crate::rpc::decode_url;
use crate::token::{extract_token, TokenMatch, NEWS_HOST};
use crate::transport::Transport;

/// Resolves a single redirect link: token, then signing parameters, then the
/// decode call. No retries happen here.
pub struct Resolver<T: ?Sized> {
    transport: Arc<T>,
    interval: Option<Duration>,
}

impl<T: Transport + ?Sized> Resolver<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            interval: None,
        }
    }

    /// Pause after each successful resolution to go easy on the upstream.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Resolve `url` within `budget`. The throttle interval runs after the
    /// budget is settled and is not charged against it.
    pub async fn resolve(&self, url: &str, budget: Duration) -> Resolution {
        let token = match extract_token(url) {
            TokenMatch::Token(token) => token,
            TokenMatch::NotRedirect => return Resolution::Passthrough(url.to_string()),
        };

        let deadline = Instant::now() + budget;
        let attempt = tokio::time::timeout_at(deadline, self.attempt(&token, deadline)).await;

        let resolution = match attempt {
            Err(_) => Resolution::TimedOut,
            Ok(Err(e)) if e.is_timeout() => Resolution::TimedOut,
            Ok(Err(e)) => Resolution::Failed(e),
            Ok(Ok(decoded)) => Resolution::Resolved(decoded),
        };
        debug!("{} -> {:?}", url, resolution);

        if let (Resolution::Resolved(_), Some(interval)) = (&resolution, self.interval) {
            tokio::time::sleep(interval).await;
        }

        resolution
    }

    async fn attempt(&self, token: &str, deadline: Instant) -> Result<String, ResolveError> {
        let params =
            fetch_decoding_params(self.transport.as_ref(), token, remaining(deadline)).await?;
        let decoded = decode_url(self.transport.as_ref(), &params, remaining(deadline)).await?;

        if decoded.is_empty() {
            return Err(ResolveError::parse("decoded URL is empty"));
        }
        if points_at_aggregator(&decoded) {
            return Err(ResolveError::parse(format!(
                "decoded URL still points at the aggregator: {}",
                decoded
            )));
        }

        Ok(decoded)
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

fn points_at_aggregator(url: &str) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h == NEWS_HOST))
        .unwrap_or(false)
}
