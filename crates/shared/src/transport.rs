use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36";

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("HTTP error: {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
}

/// The two network operations the resolver needs.
///
/// Every call carries its own timeout so callers can hand down whatever is
/// left of their budget.
pub trait Transport: Send + Sync {
    fn get<'a>(&'a self, url: &'a str, timeout: Duration)
        -> BoxFuture<'a, Result<String, TransportError>>;

    /// POST an already-encoded `application/x-www-form-urlencoded` body.
    fn post_form<'a>(
        &'a self,
        url: &'a str,
        body: String,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<String, TransportError>>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .cookie_store(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    async fn read_body(response: reqwest::Response) -> Result<String, TransportError> {
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        response.text().await.map_err(map_reqwest_error)
    }
}

impl Transport for HttpTransport {
    fn get<'a>(
        &'a self,
        url: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<String, TransportError>> {
        async move {
            let response = self
                .client
                .get(url)
                .timeout(timeout)
                .send()
                .await
                .map_err(map_reqwest_error)?;
            Self::read_body(response).await
        }
        .boxed()
    }

    fn post_form<'a>(
        &'a self,
        url: &'a str,
        body: String,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<String, TransportError>> {
        async move {
            let response = self
                .client
                .post(url)
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .header(USER_AGENT, BROWSER_USER_AGENT)
                .body(body)
                .timeout(timeout)
                .send()
                .await
                .map_err(map_reqwest_error)?;
            Self::read_body(response).await
        }
        .boxed()
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if let Some(status) = err.status() {
        TransportError::Status(status.as_u16())
    } else {
        TransportError::Network(err.to_string())
    }
}
