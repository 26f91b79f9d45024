use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::TransportError;

/// Signing parameters issued per token, consumed by a single decode call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodingParams {
    pub signature: String,
    pub timestamp: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("request error: {0}")]
    Request(#[from] TransportError),
    #[error("parse error: {0}")]
    Parse(String),
}

impl ResolveError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request(TransportError::Timeout))
    }
}

/// Outcome of one resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    /// Not a redirect link; carries the original URL.
    Passthrough(String),
    Failed(ResolveError),
    TimedOut,
}

impl Resolution {
    /// The URL to emit for this outcome: the destination when resolved,
    /// the original otherwise.
    pub fn into_url(self, original: &str) -> String {
        match self {
            Resolution::Resolved(url) => url,
            Resolution::Passthrough(url) => url,
            Resolution::Failed(_) | Resolution::TimedOut => original.to_string(),
        }
    }
}

/// Result of one batch call. `urls` always matches the input's length and order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub urls: Vec<String>,
    pub candidates: usize,
    pub resolved: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub interrupted: bool,
    pub elapsed_ms: u64,
}

impl BatchReport {
    pub fn passthrough(urls: Vec<String>) -> Self {
        Self {
            urls,
            ..Self::default()
        }
    }
}
