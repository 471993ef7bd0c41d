//! Avatar download with retry.
//!
//! The status notification needs the bot's avatar before it is first shown, so
//! a failed download is retried until it succeeds or the session ends. The
//! delay between attempts follows [`AvatarRetryPolicy`].

use async_trait::async_trait;
use bot_console_core::{Avatar, AvatarRetryPolicy, LogBuffer};
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{ExponentialBackoff, FixedInterval};
use tokio_retry::Retry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Errors of a single avatar download attempt
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AvatarError {
    /// The request could not be sent or the body could not be read.
    #[error("Avatar request failed: {0}")]
    Request(String),
    /// The server answered with a non-success status.
    #[error("Avatar server returned HTTP {0}")]
    Status(u16),
    /// The server answered with an empty body.
    #[error("Avatar response was empty")]
    Empty,
}

/// Source of avatar image bytes.
#[async_trait]
pub trait AvatarFetcher: Send + Sync {
    /// Download the image at `url`.
    ///
    /// # Errors
    ///
    /// Returns an `AvatarError` if this attempt failed.
    async fn fetch(&self, url: &str) -> Result<Bytes, AvatarError>;
}

/// Avatar fetcher backed by `reqwest`.
pub struct HttpAvatarFetcher {
    client: reqwest::Client,
}

impl HttpAvatarFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let client = match reqwest::Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(_) => reqwest::Client::new(),
        };
        Self { client }
    }
}

#[async_trait]
impl AvatarFetcher for HttpAvatarFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, AvatarError> {
        debug!(url = %url, "Avatar request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AvatarError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AvatarError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AvatarError::Request(e.to_string()))?;
        if bytes.is_empty() {
            return Err(AvatarError::Empty);
        }
        Ok(bytes)
    }
}

/// Infinite sequence of delays between attempts for `policy`.
#[must_use]
pub fn retry_delays(policy: AvatarRetryPolicy) -> Box<dyn Iterator<Item = Duration> + Send> {
    match policy {
        AvatarRetryPolicy::Fixed(delay) => Box::new(FixedInterval::new(delay)),
        AvatarRetryPolicy::Exponential { initial, max } => {
            let initial_ms = u64::try_from(initial.as_millis()).unwrap_or(u64::MAX);
            // ExponentialBackoff yields factor * 2^n starting at n = 1, so lead with the initial delay.
            let doubling = ExponentialBackoff::from_millis(2)
                .factor(initial_ms)
                .max_delay(max);
            Box::new(std::iter::once(initial.min(max)).chain(doubling))
        }
    }
}

/// Download the avatar at `url`, retrying forever until it succeeds.
///
/// Every attempt pushes a line to `logs`. Returns `None` only when `cancel`
/// fires before a download succeeded.
pub async fn download_avatar(
    fetcher: &dyn AvatarFetcher,
    url: &str,
    policy: AvatarRetryPolicy,
    logs: &LogBuffer,
    cancel: &CancellationToken,
) -> Option<Avatar> {
    let attempts = Retry::spawn(retry_delays(policy), move || async move {
        logs.push("[INFO] Loading avatar....");
        fetcher.fetch(url).await.map_err(|e| {
            warn!(url = %url, error = %e, "Avatar download failed, retrying");
            e
        })
    });

    tokio::select! {
        () = cancel.cancelled() => {
            debug!(url = %url, "Avatar download cancelled");
            None
        }
        result = attempts => match result {
            Ok(bytes) => Some(Avatar {
                url: url.to_string(),
                bytes,
            }),
            // Unreachable with an infinite delay sequence.
            Err(e) => {
                warn!(url = %url, error = %e, "Avatar download gave up");
                None
            }
        },
    }
}
