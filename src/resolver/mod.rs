//! Video resolution: the multi-endpoint retrieval state machine and the
//! steps that turn its raw metadata into a canonical format list.
//!
//! Endpoints are tried strictly in the order primary page, info endpoint,
//! embed page. Each endpoint is retried on transport errors and 5xx
//! responses with exponential back-off before escalating to the next one.
//! Escalation stops as soon as the merged metadata is complete, or when the
//! service reports the video as private or removed.

pub mod info;
pub mod metadata;
mod outcome;
pub mod page;
mod playability;
mod retry;

pub use metadata::{RawMetadata, VideoDetails};
pub use outcome::{AttemptLog, AttemptResult, Endpoint, FetchAttempt, RetrievalOutcome};
pub use playability::Unavailability;
pub use retry::RetryPolicy;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;
use vidresolve_cipher::{CipherEngine, ProgramCache, TransformProgram};
use vidresolve_common::{ByteRange, CodeBlobId, FormatDescriptor, VideoId};
use vidresolve_media::{build_segment_index, SegmentIndex};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::formats::{parse_dash_manifest, parse_hls_playlist, FormatNormalizer, FormatSources};
use crate::http::{FetchResponse, Fetcher, HttpFetcher};
use info::InfoBody;

/// Per-call options for [`InfoResolver::resolve`].
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Cancelling aborts the in-flight request and any back-off sleep.
    pub cancel: CancellationToken,
    /// Overrides the resolver's retry policy.
    pub retry: Option<RetryPolicy>,
    /// Overrides the resolver's interface language.
    pub language: Option<String>,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Result of a successful resolution.
#[derive(Debug, Clone, Serialize)]
pub struct VideoInfo {
    pub video_id: VideoId,
    pub details: VideoDetails,
    /// Canonical format list, best first.
    pub formats: Vec<FormatDescriptor>,
    /// Code blob whose program deciphered the formats, if any was needed.
    pub code_blob: Option<CodeBlobId>,
    /// Endpoint whose data first made the metadata usable.
    pub source: Option<Endpoint>,
    pub attempts: AttemptLog,
}

/// Resolves video references into playable formats.
pub struct InfoResolver {
    fetcher: Arc<dyn Fetcher>,
    engine: Arc<CipherEngine>,
    base_url: Url,
    language: String,
    retry: RetryPolicy,
}

impl InfoResolver {
    /// Create a resolver with an unbounded program cache and the default
    /// retry policy.
    pub fn new(fetcher: Arc<dyn Fetcher>, base_url: Url) -> Self {
        Self {
            fetcher,
            engine: Arc::new(CipherEngine::new()),
            base_url,
            language: "en".to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Build a resolver with an HTTP fetcher from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.http)?;
        let base_url = Url::parse(&config.origin.base_url)
            .map_err(|e| Error::client(format!("invalid origin URL: {e}")))?;
        let engine = CipherEngine::with_cache(ProgramCache::with_capacity(
            config.cipher.max_programs,
        ));

        Ok(Self {
            fetcher: Arc::new(fetcher),
            engine: Arc::new(engine),
            base_url,
            language: config.origin.language.clone(),
            retry: RetryPolicy::from(&config.retry),
        })
    }

    /// Share a cipher engine, and with it the program cache, with other
    /// resolvers.
    pub fn with_engine(mut self, engine: Arc<CipherEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn engine(&self) -> &Arc<CipherEngine> {
        &self.engine
    }

    /// Resolve a video reference (bare id or URL) into its formats.
    pub async fn resolve(&self, reference: &str, options: &ResolveOptions) -> Result<VideoInfo> {
        let video_id = VideoId::parse(reference)?;
        let policy = options.retry.as_ref().unwrap_or(&self.retry);
        let language = options.language.as_deref().unwrap_or(&self.language);

        let outcome = self
            .retrieve(&video_id, policy, language, &options.cancel)
            .await?;

        if !outcome.metadata.is_viable() {
            return Err(Error::Unavailable {
                reason: outcome.unavailability(),
                attempts: outcome.attempts,
            });
        }

        let dash = match &outcome.metadata.dash_manifest_url {
            Some(url) => {
                self.fetch_manifest("DASH manifest", url, &options.cancel, parse_dash_manifest)
                    .await?
            }
            None => Vec::new(),
        };
        let hls = match &outcome.metadata.hls_manifest_url {
            Some(url) => {
                self.fetch_manifest("HLS playlist", url, &options.cancel, parse_hls_playlist)
                    .await?
            }
            None => Vec::new(),
        };

        let RetrievalOutcome {
            metadata,
            attempts,
            signals,
            source,
            ..
        } = outcome;

        let live = metadata.is_live();
        let sources = FormatSources {
            inline: metadata.formats,
            dash,
            hls,
        };

        let mut normalizer = FormatNormalizer::new().live(live);
        let mut code_blob = None;
        if sources.needs_decipher() {
            if let Some(reference) = &metadata.code_blob_url {
                let (id, program) = self.load_program(reference, &options.cancel).await?;
                normalizer = normalizer.with_program(program);
                code_blob = Some(id);
            }
        }

        let formats = normalizer.normalize(sources)?;

        if formats.is_empty() {
            if let Some(reason) = signals.into_iter().next() {
                return Err(Error::Unavailable { reason, attempts });
            }
        }

        info!(
            video_id = %video_id,
            formats = formats.len(),
            source = ?source,
            attempts = attempts.len(),
            "Resolved video"
        );

        Ok(VideoInfo {
            video_id,
            details: metadata.details.unwrap_or_default(),
            formats,
            code_blob,
            source,
            attempts,
        })
    }

    /// Download the header and seek index of a format and build its segment
    /// index.
    pub async fn fetch_segment_index(
        &self,
        format: &FormatDescriptor,
        options: &ResolveOptions,
    ) -> Result<SegmentIndex> {
        let index = format.index_range.ok_or_else(|| {
            Error::malformed("format", format!("itag {} has no index range", format.itag))
        })?;
        let url = format.url().ok_or_else(|| {
            Error::malformed("format", format!("itag {} is still ciphered", format.itag))
        })?;

        let range = ByteRange::new(0, index.end)?;
        debug!(itag = format.itag, range = %range, "Fetching segment index bytes");
        let bytes = cancellable(self.fetcher.fetch_range(url, range), &options.cancel)
            .await?
            .map_err(|e| Error::fetch("segment index", e.to_string()))?;

        Ok(build_segment_index(&bytes, index)?)
    }

    /// Run the endpoint state machine.
    async fn retrieve(
        &self,
        video_id: &VideoId,
        policy: &RetryPolicy,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<RetrievalOutcome> {
        let mut outcome = RetrievalOutcome::default();

        for endpoint in Endpoint::ORDER {
            outcome.tried.push(endpoint);

            let metadata = match endpoint {
                Endpoint::PrimaryPage => {
                    let url = page::watch_url(&self.base_url, video_id, language)?;
                    self.fetch_page(endpoint, &url, policy, cancel, &mut outcome.attempts)
                        .await?
                }
                Endpoint::InfoEndpoint => {
                    let url = info::info_url(
                        &self.base_url,
                        video_id,
                        language,
                        outcome.metadata.sts,
                    )?;
                    self.fetch_info(&url, policy, cancel, &mut outcome.attempts)
                        .await?
                }
                Endpoint::EmbedPage => {
                    let url = page::embed_url(&self.base_url, video_id, language)?;
                    self.fetch_page(endpoint, &url, policy, cancel, &mut outcome.attempts)
                        .await?
                }
            };

            if let Some(metadata) = metadata {
                outcome.absorb(endpoint, metadata);
            }

            if outcome.metadata.is_complete() {
                debug!(endpoint = %endpoint, "Metadata complete");
                break;
            }
            if let Some(signal) = outcome.definitive_block() {
                info!(
                    endpoint = %endpoint,
                    reason = %signal,
                    "Video is unavailable, not escalating"
                );
                break;
            }
            if let Some(next) = next_endpoint(endpoint) {
                info!(from = %endpoint, to = %next, "Escalating to next endpoint");
            }
        }

        Ok(outcome)
    }

    async fn fetch_page(
        &self,
        endpoint: Endpoint,
        url: &Url,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
        attempts: &mut AttemptLog,
    ) -> Result<Option<RawMetadata>> {
        let Some(response) = self
            .fetch_with_retry(endpoint, url, policy, cancel, attempts)
            .await?
        else {
            return Ok(None);
        };
        attempts.record(endpoint, AttemptResult::Status(response.status));

        match page::parse_page(&response.body) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(err) => {
                warn!(endpoint = %endpoint, error = %err, "Could not parse page");
                Ok(None)
            }
        }
    }

    async fn fetch_info(
        &self,
        url: &Url,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
        attempts: &mut AttemptLog,
    ) -> Result<Option<RawMetadata>> {
        let endpoint = Endpoint::InfoEndpoint;
        let mut reloads = 0u32;

        loop {
            let Some(response) = self
                .fetch_with_retry(endpoint, url, policy, cancel, attempts)
                .await?
            else {
                return Ok(None);
            };

            match info::parse_info_body(&response.body) {
                Ok(InfoBody::Metadata(metadata)) => {
                    attempts.record(endpoint, AttemptResult::Status(response.status));
                    return Ok(Some(metadata));
                }
                Ok(InfoBody::Reload) => {
                    attempts.record(endpoint, AttemptResult::Reload);
                    if reloads >= policy.reload_retries {
                        info!(endpoint = %endpoint, reloads, "Reload budget exhausted");
                        return Ok(None);
                    }
                    let wait = policy.delay(reloads);
                    reloads += 1;
                    warn!(
                        endpoint = %endpoint,
                        retry = reloads,
                        wait_ms = wait.as_millis() as u64,
                        "Service asked for a reload, backing off"
                    );
                    sleep(wait, cancel).await?;
                }
                Err(err) => {
                    attempts.record(endpoint, AttemptResult::Status(response.status));
                    warn!(endpoint = %endpoint, error = %err, "Could not parse info response");
                    return Ok(None);
                }
            }
        }
    }

    /// GET with retries on transport errors and 5xx. Returns `None` once the
    /// endpoint should be given up on. Failed attempts are recorded here;
    /// the caller records the successful one.
    async fn fetch_with_retry(
        &self,
        endpoint: Endpoint,
        url: &Url,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
        attempts: &mut AttemptLog,
    ) -> Result<Option<FetchResponse>> {
        let mut retries = 0u32;

        loop {
            debug!(endpoint = %endpoint, attempt = retries + 1, url = %url, "Fetching");
            match cancellable(self.fetcher.fetch(url.as_str()), cancel).await? {
                Ok(response) if response.is_success() => return Ok(Some(response)),
                Ok(response) => {
                    attempts.record(endpoint, AttemptResult::Status(response.status));
                    if !policy.is_retryable_status(response.status) {
                        info!(endpoint = %endpoint, status = response.status, "Endpoint refused request");
                        return Ok(None);
                    }
                    debug!(endpoint = %endpoint, status = response.status, "Server error");
                }
                Err(err) => {
                    attempts.record(endpoint, AttemptResult::Transport(err.to_string()));
                    debug!(endpoint = %endpoint, error = %err, "Transport error");
                }
            }

            if retries >= policy.max_retries {
                info!(endpoint = %endpoint, attempts = retries + 1, "Retries exhausted");
                return Ok(None);
            }
            let wait = policy.delay(retries);
            retries += 1;
            warn!(
                endpoint = %endpoint,
                retry = retries,
                wait_ms = wait.as_millis() as u64,
                "Transient failure, backing off"
            );
            sleep(wait, cancel).await?;
        }
    }

    /// Fetch and extract the transform program of a code blob, sharing the
    /// work with concurrent resolutions of the same blob.
    async fn load_program(
        &self,
        reference: &str,
        cancel: &CancellationToken,
    ) -> Result<(CodeBlobId, Arc<TransformProgram>)> {
        let url = self
            .base_url
            .join(reference)
            .map_err(|e| Error::malformed("code blob reference", format!("{reference}: {e}")))?;
        let id = CodeBlobId::from_reference(reference);

        let program = self
            .engine
            .get_or_extract(&id, || async {
                let response = cancellable(self.fetcher.fetch(url.as_str()), cancel)
                    .await?
                    .map_err(|e| Error::fetch("code blob", e.to_string()))?;
                if !response.is_success() {
                    return Err(Error::fetch("code blob", format!("HTTP {}", response.status)));
                }
                Ok(response.body)
            })
            .await?;

        Ok((id, program))
    }

    /// Best-effort manifest download; failures are logged and yield no
    /// formats. Only cancellation is propagated.
    async fn fetch_manifest<F>(
        &self,
        what: &'static str,
        reference: &str,
        cancel: &CancellationToken,
        parse: F,
    ) -> Result<Vec<FormatDescriptor>>
    where
        F: FnOnce(&str) -> Result<Vec<FormatDescriptor>>,
    {
        let url = match self.base_url.join(reference) {
            Ok(url) => url,
            Err(e) => {
                warn!(manifest = what, error = %e, "Invalid manifest URL, skipping");
                return Ok(Vec::new());
            }
        };

        let response = match cancellable(self.fetcher.fetch(url.as_str()), cancel).await? {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                warn!(manifest = what, status = response.status, "Manifest unavailable, skipping");
                return Ok(Vec::new());
            }
            Err(err) => {
                warn!(manifest = what, error = %err, "Manifest fetch failed, skipping");
                return Ok(Vec::new());
            }
        };

        match parse(&response.body) {
            Ok(formats) => {
                debug!(manifest = what, formats = formats.len(), "Parsed manifest");
                Ok(formats)
            }
            Err(err) => {
                warn!(manifest = what, error = %err, "Manifest unparseable, skipping");
                Ok(Vec::new())
            }
        }
    }
}

impl std::fmt::Debug for InfoResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfoResolver")
            .field("base_url", &self.base_url.as_str())
            .field("language", &self.language)
            .field("retry", &self.retry)
            .finish()
    }
}

fn next_endpoint(endpoint: Endpoint) -> Option<Endpoint> {
    let pos = Endpoint::ORDER.iter().position(|e| *e == endpoint)?;
    Endpoint::ORDER.get(pos + 1).copied()
}

/// Race a future against cancellation.
async fn cancellable<F: Future>(future: F, cancel: &CancellationToken) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        output = future => Ok(output),
    }
}

async fn sleep(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    cancellable(tokio::time::sleep(duration), cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::TransportError;
    use assert_matches::assert_matches;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves queued responses per path, repeating the last one.
    #[derive(Default)]
    struct ScriptedFetcher {
        routes: Mutex<HashMap<String, Vec<std::result::Result<FetchResponse, TransportError>>>>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn route(
            self,
            path: &str,
            responses: Vec<std::result::Result<FetchResponse, TransportError>>,
        ) -> Self {
            self.routes
                .lock()
                .unwrap()
                .insert(path.to_string(), responses);
            self
        }

        fn requests_to(&self, path: &str) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.as_str() == path)
                .count()
        }
    }

    #[async_trait::async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> std::result::Result<FetchResponse, TransportError> {
            let path = Url::parse(url).unwrap().path().to_string();
            self.requests.lock().unwrap().push(path.clone());
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(&path) {
                Some(queue) if queue.len() > 1 => queue.remove(0),
                Some(queue) => queue[0].clone(),
                None => Ok(FetchResponse::new(404, "")),
            }
        }

        async fn fetch_range(
            &self,
            _url: &str,
            _range: ByteRange,
        ) -> std::result::Result<Bytes, TransportError> {
            Err(TransportError::Status(416))
        }
    }

    const ID: &str = "dQw4w9WgXcQ";

    fn ok(body: &str) -> std::result::Result<FetchResponse, TransportError> {
        Ok(FetchResponse::new(200, body))
    }

    fn status(code: u16) -> std::result::Result<FetchResponse, TransportError> {
        Ok(FetchResponse::new(code, ""))
    }

    fn resolver(fetcher: ScriptedFetcher) -> (Arc<ScriptedFetcher>, InfoResolver) {
        let fetcher = Arc::new(fetcher);
        let resolver = InfoResolver::new(
            fetcher.clone(),
            Url::parse("https://origin.test").unwrap(),
        )
        .with_retry(RetryPolicy::none().with_max_retries(1));
        (fetcher, resolver)
    }

    const PLAIN_PAGE: &str = r#"<script>var ytInitialPlayerResponse = {"playabilityStatus":{"status":"OK"},"videoDetails":{"videoId":"dQw4w9WgXcQ","title":"Plain"},"streamingData":{"formats":[{"itag":18,"url":"https://cdn/18","mimeType":"video/mp4; codecs=\"avc1.42001E, mp4a.40.2\""}]}};</script>"#;

    #[tokio::test]
    async fn test_primary_page_success() {
        let (fetcher, resolver) =
            resolver(ScriptedFetcher::default().route("/watch", vec![ok(PLAIN_PAGE)]));

        let info = resolver.resolve(ID, &ResolveOptions::new()).await.unwrap();
        assert_eq!(info.video_id.as_str(), ID);
        assert_eq!(info.details.title.as_deref(), Some("Plain"));
        assert_eq!(info.formats.len(), 1);
        assert_eq!(info.source, Some(Endpoint::PrimaryPage));
        assert_eq!(info.code_blob, None);
        assert_eq!(fetcher.requests_to("/get_video_info"), 0);
    }

    #[tokio::test]
    async fn test_exhausted_retries_escalate() {
        let info_body = "status=ok&url_encoded_fmt_stream_map=itag%3D18%26url%3Dhttps%253A%252F%252Fcdn%252F18";
        let (fetcher, resolver) = resolver(
            ScriptedFetcher::default()
                .route("/watch", vec![status(500), status(500), ok(PLAIN_PAGE)])
                .route("/get_video_info", vec![ok(info_body)]),
        );

        let info = resolver.resolve(ID, &ResolveOptions::new()).await.unwrap();
        assert_eq!(fetcher.requests_to("/watch"), 2);
        assert_eq!(info.source, Some(Endpoint::InfoEndpoint));
        assert_eq!(
            info.attempts.to_string(),
            "primary page [500, 500]; info endpoint [200]"
        );
    }

    #[tokio::test]
    async fn test_client_error_escalates_without_retry() {
        let (fetcher, resolver) = resolver(
            ScriptedFetcher::default()
                .route("/watch", vec![status(429)])
                .route("/embed/dQw4w9WgXcQ", vec![ok(PLAIN_PAGE)]),
        );

        let info = resolver.resolve(ID, &ResolveOptions::new()).await.unwrap();
        assert_eq!(fetcher.requests_to("/watch"), 1);
        assert_eq!(info.source, Some(Endpoint::EmbedPage));
    }

    #[tokio::test]
    async fn test_nothing_reachable_is_transient() {
        let (_, resolver) = resolver(
            ScriptedFetcher::default()
                .route("/watch", vec![Err(TransportError::Request("refused".into()))])
                .route("/get_video_info", vec![status(503)])
                .route("/embed/dQw4w9WgXcQ", vec![status(503)]),
        );

        let err = resolver.resolve(ID, &ResolveOptions::new()).await.unwrap_err();
        assert_matches!(
            err,
            Error::Unavailable {
                reason: Unavailability::Unreachable,
                ..
            }
        );
        assert_eq!(err.kind(), crate::ErrorKind::Transient);
    }

    #[tokio::test]
    async fn test_invalid_reference() {
        let (fetcher, resolver) = resolver(ScriptedFetcher::default());
        let err = resolver
            .resolve("https://example.com/nope", &ResolveOptions::new())
            .await
            .unwrap_err();
        assert_matches!(err, Error::Input(_));
        assert!(fetcher.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let (_, resolver) = resolver(ScriptedFetcher::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = resolver
            .resolve(ID, &ResolveOptions::new().with_cancel(cancel))
            .await
            .unwrap_err();
        assert_matches!(err, Error::Cancelled);
    }

    #[tokio::test]
    async fn test_segment_index_requires_index_range() {
        let (_, resolver) = resolver(ScriptedFetcher::default());
        let format = FormatDescriptor::new(
            248,
            vidresolve_common::StreamSource::Url {
                url: "https://cdn/248".into(),
            },
        );
        let err = resolver
            .fetch_segment_index(&format, &ResolveOptions::new())
            .await
            .unwrap_err();
        assert_matches!(err, Error::Malformed { what: "format", .. });
    }

    #[test]
    fn test_next_endpoint() {
        assert_eq!(next_endpoint(Endpoint::PrimaryPage), Some(Endpoint::InfoEndpoint));
        assert_eq!(next_endpoint(Endpoint::EmbedPage), None);
    }
}
