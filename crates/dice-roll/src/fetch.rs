#![forbid(unsafe_code)]

//! Outcome retrieval.
//!
//! A [`ResultFetcher`] produces the face a roll should land on. Fetchers run
//! on a background worker, so they may block; the controller only ever sees
//! the returned `Result`.
//!
//! The provider contract is small: the response body must be a decimal
//! integer literal in `1..=6`, optionally surrounded by whitespace. Anything
//! else (non-2xx status, transport failure, timeout, malformed body) is a
//! [`FetchError`]. There is no retry and no caching.

use std::fmt;
use std::time::Duration;

use dice_core::{Face, FaceError};
use thiserror::Error;

use crate::config::ProviderConfig;

/// Why an outcome could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection, DNS, TLS, timeout, or body read failure.
    #[error("request failed: {0}")]
    Transport(String),
    /// The provider answered with a non-success status.
    #[error("provider answered with HTTP status {0}")]
    Status(u16),
    /// The body was not a face value.
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] FaceError),
}

/// Source of roll outcomes.
pub trait ResultFetcher: Send + Sync + 'static {
    fn fetch(&self) -> Result<Face, FetchError>;
}

impl<F> ResultFetcher for F
where
    F: Fn() -> Result<Face, FetchError> + Send + Sync + 'static,
{
    fn fetch(&self) -> Result<Face, FetchError> {
        self()
    }
}

/// Validate a provider response body into a face.
pub fn parse_payload(body: &str) -> Result<Face, FetchError> {
    Ok(body.parse::<Face>()?)
}

/// Blocking HTTP fetcher: `GET <url>`, body parsed by [`parse_payload`].
pub struct HttpResultFetcher {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpResultFetcher {
    /// Build a fetcher for `url`. `timeout` of `None` disables the request
    /// timeout entirely.
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(provider: &ProviderConfig) -> Result<Self, FetchError> {
        Self::new(
            provider.url.clone(),
            provider.timeout_ms.map(Duration::from_millis),
        )
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for HttpResultFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResultFetcher")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl ResultFetcher for HttpResultFetcher {
    fn fetch(&self) -> Result<Face, FetchError> {
        tracing::debug!(target: "dice.fetch", url = %self.url, "requesting outcome");
        let response = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let face = parse_payload(&body)?;
        tracing::debug!(target: "dice.fetch", face = face.get(), "outcome received");
        Ok(face)
    }
}
