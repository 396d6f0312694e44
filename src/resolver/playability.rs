//! Playability signals and unavailability classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a video could not be resolved into formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum Unavailability {
    Private,
    Removed,
    AgeRestricted,
    RegionBlocked,
    LoginRequired,
    /// Any other refusal, with the service's reason text.
    Unplayable(String),
    /// An upcoming or ended live stream.
    Offline,
    /// Every endpoint answered but none carried formats.
    NoFormats,
    /// No endpoint answered successfully within the retry budget.
    Unreachable,
}

impl Unavailability {
    /// Signals that end resolution immediately when no formats are known.
    pub fn is_definitive(&self) -> bool {
        matches!(self, Self::Private | Self::Removed)
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable)
    }

    /// Classify a `playabilityStatus` object. Returns `None` when playable.
    pub fn from_status(status: &str, reason: Option<&str>) -> Option<Self> {
        let reason_text = reason.unwrap_or_default();
        match status {
            "OK" => None,
            "LIVE_STREAM_OFFLINE" => Some(Self::Offline),
            "AGE_CHECK_REQUIRED" | "AGE_VERIFICATION_REQUIRED" | "CONTENT_CHECK_REQUIRED" => {
                Some(Self::AgeRestricted)
            }
            "LOGIN_REQUIRED" => Some(match Self::from_reason(reason_text) {
                Self::Unplayable(_) => Self::LoginRequired,
                other => other,
            }),
            "UNPLAYABLE" | "ERROR" => Some(Self::from_reason(reason_text)),
            other if reason_text.is_empty() => Some(Self::Unplayable(other.to_string())),
            _ => Some(Self::from_reason(reason_text)),
        }
    }

    /// Classify a free-text failure reason.
    pub fn from_reason(reason: &str) -> Self {
        let lower = reason.to_lowercase();
        let has = |needle: &str| lower.contains(needle);

        if has("private") {
            Self::Private
        } else if has("confirm your age") || has("age-restricted") || has("inappropriate") {
            Self::AgeRestricted
        } else if has("country") || has("your region") || has("your location") {
            Self::RegionBlocked
        } else if has("removed")
            || has("terminated")
            || has("does not exist")
            || has("no longer available")
            || has("video unavailable")
        {
            Self::Removed
        } else if has("sign in") || has("log in") {
            Self::LoginRequired
        } else {
            Self::Unplayable(reason.trim().to_string())
        }
    }
}

impl fmt::Display for Unavailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => write!(f, "private video"),
            Self::Removed => write!(f, "video removed"),
            Self::AgeRestricted => write!(f, "age restricted"),
            Self::RegionBlocked => write!(f, "blocked in this region"),
            Self::LoginRequired => write!(f, "login required"),
            Self::Unplayable(reason) => write!(f, "unplayable: {reason}"),
            Self::Offline => write!(f, "live stream offline"),
            Self::NoFormats => write!(f, "no formats found"),
            Self::Unreachable => write!(f, "origin unreachable"),
        }
    }
}
