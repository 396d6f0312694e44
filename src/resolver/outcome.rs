//! Per-resolution retrieval state.

use std::fmt;

use serde::Serialize;

use super::metadata::RawMetadata;
use super::playability::Unavailability;

/// Metadata sources, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    PrimaryPage,
    InfoEndpoint,
    EmbedPage,
}

impl Endpoint {
    pub const ORDER: [Endpoint; 3] = [
        Endpoint::PrimaryPage,
        Endpoint::InfoEndpoint,
        Endpoint::EmbedPage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::PrimaryPage => "primary page",
            Endpoint::InfoEndpoint => "info endpoint",
            Endpoint::EmbedPage => "embed page",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single request produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum AttemptResult {
    Status(u16),
    Transport(String),
    /// A successful response carrying the reload sentinel.
    Reload,
}

impl fmt::Display for AttemptResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptResult::Status(status) => write!(f, "{status}"),
            AttemptResult::Transport(err) => write!(f, "transport error: {err}"),
            AttemptResult::Reload => write!(f, "reload"),
        }
    }
}

/// One request against one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchAttempt {
    pub endpoint: Endpoint,
    #[serde(flatten)]
    pub result: AttemptResult,
}

/// Ordered record of every request made during a resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttemptLog(Vec<FetchAttempt>);

impl AttemptLog {
    pub fn record(&mut self, endpoint: Endpoint, result: AttemptResult) {
        self.0.push(FetchAttempt { endpoint, result });
    }

    pub fn attempts(&self) -> &[FetchAttempt] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of requests made against one endpoint.
    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.0.iter().filter(|a| a.endpoint == endpoint).count()
    }

    /// Whether any endpoint answered with a successful status, reloads
    /// included.
    pub fn any_success(&self) -> bool {
        self.0.iter().any(|a| match a.result {
            AttemptResult::Status(s) => (200..300).contains(&s),
            AttemptResult::Reload => true,
            AttemptResult::Transport(_) => false,
        })
    }
}

impl fmt::Display for AttemptLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("none");
        }

        let mut current: Option<Endpoint> = None;
        for attempt in &self.0 {
            if current == Some(attempt.endpoint) {
                write!(f, ", {}", attempt.result)?;
            } else {
                if current.is_some() {
                    f.write_str("]; ")?;
                }
                write!(f, "{} [{}", attempt.endpoint, attempt.result)?;
                current = Some(attempt.endpoint);
            }
        }
        f.write_str("]")
    }
}

/// Accumulated state of one resolution call.
#[derive(Debug, Default)]
pub struct RetrievalOutcome {
    pub metadata: RawMetadata,
    pub attempts: AttemptLog,
    /// Endpoints whose step has run, in order.
    pub tried: Vec<Endpoint>,
    /// Playability signals seen so far, in order.
    pub signals: Vec<Unavailability>,
    /// The endpoint whose data first made the metadata viable.
    pub source: Option<Endpoint>,
}

impl RetrievalOutcome {
    /// Fold one endpoint's parsed data into the outcome.
    pub fn absorb(&mut self, endpoint: Endpoint, mut metadata: RawMetadata) {
        if let Some(signal) = metadata.playability.take() {
            self.signals.push(signal);
        }
        self.metadata.fill_from(metadata);
        if self.source.is_none() && self.metadata.is_viable() {
            self.source = Some(endpoint);
        }
    }

    /// A definitive signal that ends escalation: the video is private or
    /// removed and nothing usable has been found.
    pub fn definitive_block(&self) -> Option<&Unavailability> {
        if self.metadata.has_format_sources() {
            return None;
        }
        self.signals.iter().find(|s| s.is_definitive())
    }

    /// Classification for a resolution that produced nothing usable.
    pub fn unavailability(&self) -> Unavailability {
        if let Some(signal) = self.definitive_block() {
            return signal.clone();
        }
        if let Some(signal) = self.signals.first() {
            return signal.clone();
        }
        if !self.attempts.any_success() {
            return Unavailability::Unreachable;
        }
        Unavailability::NoFormats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_log_display_groups_endpoints() {
        let mut log = AttemptLog::default();
        log.record(Endpoint::PrimaryPage, AttemptResult::Status(500));
        log.record(Endpoint::PrimaryPage, AttemptResult::Transport("timed out".into()));
        log.record(Endpoint::InfoEndpoint, AttemptResult::Reload);
        log.record(Endpoint::InfoEndpoint, AttemptResult::Status(200));

        assert_eq!(
            log.to_string(),
            "primary page [500, transport error: timed out]; info endpoint [reload, 200]"
        );
        assert_eq!(log.count(Endpoint::PrimaryPage), 2);
        assert_eq!(log.count(Endpoint::EmbedPage), 0);
        assert!(log.any_success());
        assert_eq!(AttemptLog::default().to_string(), "none");
    }

    #[test]
    fn test_unavailability_prefers_definitive_signal() {
        let mut outcome = RetrievalOutcome::default();
        outcome.attempts.record(Endpoint::PrimaryPage, AttemptResult::Status(200));
        outcome.signals.push(Unavailability::LoginRequired);
        outcome.signals.push(Unavailability::Private);

        assert_eq!(outcome.definitive_block(), Some(&Unavailability::Private));
        assert_eq!(outcome.unavailability(), Unavailability::Private);
    }

    #[test]
    fn test_unavailability_fallbacks() {
        let mut outcome = RetrievalOutcome::default();
        outcome.attempts.record(Endpoint::PrimaryPage, AttemptResult::Status(503));
        assert_eq!(outcome.unavailability(), Unavailability::Unreachable);

        outcome.attempts.record(Endpoint::InfoEndpoint, AttemptResult::Status(200));
        assert_eq!(outcome.unavailability(), Unavailability::NoFormats);

        outcome.signals.push(Unavailability::RegionBlocked);
        assert_eq!(outcome.unavailability(), Unavailability::RegionBlocked);
    }

    #[test]
    fn test_absorb_records_source_and_signal() {
        let mut outcome = RetrievalOutcome::default();

        let blocked = RawMetadata {
            playability: Some(Unavailability::AgeRestricted),
            ..Default::default()
        };
        outcome.absorb(Endpoint::PrimaryPage, blocked);
        assert_eq!(outcome.signals, vec![Unavailability::AgeRestricted]);
        assert_eq!(outcome.source, None);

        let viable = RawMetadata {
            code_blob_url: Some("/s/player/abc/base.js".into()),
            ..Default::default()
        };
        outcome.absorb(Endpoint::EmbedPage, viable);
        assert_eq!(outcome.source, Some(Endpoint::EmbedPage));
    }
}
