use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tracing::debug;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures that prevent any response from being obtained from the origin.
#[derive(Debug, Error)]
pub enum OriginError {
    #[error("invalid origin URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("origin unreachable for {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: BoxError,
    },
}

/// Retrieves the body stored at a fully resolved origin URL.
#[async_trait]
pub trait OriginFetcher: Send + Sync {
    /// Issues a GET for `url`. Any status code counts as a response; only
    /// failing to get one at all is an error.
    async fn fetch(&self, url: &str) -> Result<Bytes, OriginError>;
}

#[derive(Debug, Clone)]
pub struct HttpOrigin {
    client: reqwest::Client,
}

impl HttpOrigin {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        // The origin is addressed directly; proxy environment variables do not apply.
        let mut builder = reqwest::Client::builder().no_proxy();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build origin HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl OriginFetcher for HttpOrigin {
    async fn fetch(&self, url: &str) -> Result<Bytes, OriginError> {
        let mut response = self.client.get(url).send().await.map_err(|source| {
            if source.is_builder() {
                OriginError::InvalidUrl {
                    url: url.to_string(),
                    source: source.into(),
                }
            } else {
                OriginError::Unreachable {
                    url: url.to_string(),
                    source: source.into(),
                }
            }
        })?;

        let status = response.status();
        let mut body = BytesMut::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => body.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(err) => {
                    // Keep what arrived; a truncated body is still served and cached.
                    debug!(
                        url,
                        bytes_read = body.len(),
                        error = %err,
                        "origin body read failed"
                    );
                    break;
                }
            }
        }
        debug!(url, status = status.as_u16(), bytes = body.len(), "origin responded");
        Ok(body.freeze())
    }
}
