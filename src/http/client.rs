use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RANGE};
use reqwest::Client;
use tracing::trace;
use vidresolve_common::ByteRange;

use super::{FetchResponse, Fetcher, TransportError};
use crate::config::HttpConfig;
use crate::error::{Error, Result};

type UrlTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// [`Fetcher`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    transform: Option<UrlTransform>,
}

impl HttpFetcher {
    /// Build a client with the configured timeout, user agent, headers and
    /// proxy.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::client(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::client(format!("invalid value for header {name}: {e}")))?;
            headers.insert(name, value);
        }

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .default_headers(headers);

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| Error::client(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| Error::client(e.to_string()))?;

        Ok(Self {
            client,
            transform: None,
        })
    }

    /// Wrap an existing client.
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            transform: None,
        }
    }

    /// Rewrite every request URL before it is sent, e.g. to route through a
    /// CORS or caching proxy.
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    fn target(&self, url: &str) -> String {
        match &self.transform {
            Some(transform) => transform(url),
            None => url.to_string(),
        }
    }
}

impl fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<FetchResponse, TransportError> {
        let target = self.target(url);
        trace!(url = %target, "GET");

        let response = self
            .client
            .get(&target)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(FetchResponse { status, body })
    }

    async fn fetch_range(
        &self,
        url: &str,
        range: ByteRange,
    ) -> std::result::Result<Bytes, TransportError> {
        let target = self.target(url);
        trace!(url = %target, range = %range, "GET range");

        let response = self
            .client
            .get(&target)
            .header(RANGE, range.header_value())
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }

        response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))
    }
}
