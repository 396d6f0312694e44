//! Request primitive consumed by the resolver.
//!
//! The resolver only depends on [`Fetcher`]; [`HttpFetcher`] is the
//! production implementation over `reqwest`. Tests substitute mock servers
//! or in-memory fetchers.

mod client;

pub use client::HttpFetcher;

use bytes::Bytes;
use thiserror::Error;
use vidresolve_common::ByteRange;

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

/// A request that did not produce a usable response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection, timeout or protocol failure.
    #[error("request failed: {0}")]
    Request(String),

    /// A ranged request was answered with a non-success status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

/// Common trait for HTTP request primitives
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// GET a URL. Any HTTP status is a response; only transport failures
    /// are errors.
    async fn fetch(&self, url: &str) -> Result<FetchResponse, TransportError>;

    /// GET an inclusive byte range of a URL.
    async fn fetch_range(&self, url: &str, range: ByteRange) -> Result<Bytes, TransportError>;
}
