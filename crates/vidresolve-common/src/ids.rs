//! Typed identifiers shared across vidresolve.
//!
//! [`VideoId`] is the validated form of a user-supplied video reference and
//! [`CodeBlobId`] keys the transform-program cache by player code version.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Length of every valid video identifier.
pub const VIDEO_ID_LEN: usize = 11;

/// Hosts that carry the identifier in the `v` query parameter.
const QUERY_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "gaming.youtube.com",
];

/// Hosts that carry the identifier as a path segment.
const PATH_HOSTS: &[&str] = &[
    "youtu.be",
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];

/// Path prefixes followed by the identifier on [`PATH_HOSTS`].
const PATH_PREFIXES: &[&str] = &["embed", "v", "e", "shorts", "live"];

/// Validated video identifier (`[A-Za-z0-9_-]{11}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

impl VideoId {
    /// Extract and validate an identifier from a bare ID or a video URL.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if Self::is_valid(input) {
            return Ok(Self(input.to_string()));
        }

        let url = Url::parse(input)
            .or_else(|_| Url::parse(&format!("https://{input}")))
            .map_err(|_| Error::invalid_reference(input))?;

        let candidate = Self::candidate_from_url(&url)
            .ok_or_else(|| Error::invalid_reference(format!("no video id found in {input}")))?;

        if Self::is_valid(&candidate) {
            Ok(Self(candidate))
        } else {
            Err(Error::invalid_reference(format!(
                "video id \"{candidate}\" does not match [A-Za-z0-9_-]{{11}}"
            )))
        }
    }

    /// Returns true if `s` is exactly an 11 character identifier.
    pub fn is_valid(s: &str) -> bool {
        s.len() == VIDEO_ID_LEN
            && s
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn candidate_from_url(url: &Url) -> Option<String> {
        let host = url.host_str()?.to_ascii_lowercase();
        let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

        if QUERY_HOSTS.contains(&host.as_str()) && url.path() == "/watch" {
            return url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned());
        }

        if host == "youtu.be" {
            return segments.next().map(str::to_string);
        }

        if PATH_HOSTS.contains(&host.as_str()) {
            let prefix = segments.next()?;
            if PATH_PREFIXES.contains(&prefix) {
                return segments.next().map(str::to_string);
            }
        }

        None
    }
}

impl TryFrom<String> for VideoId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        if Self::is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(Error::invalid_reference(value))
        }
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

impl std::str::FromStr for VideoId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an obfuscated player code blob.
///
/// Derived from the version token embedded in the code blob's path so that
/// two references to the same player build share one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeBlobId(String);

impl CodeBlobId {
    /// Wrap an already-derived identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the identifier from a code blob URL or path.
    ///
    /// `/s/player/3c3b0e66/player_ias.vflset/en_US/base.js` yields `3c3b0e66`,
    /// `/yts/jsbin/player-vfl3jJCkb/en_US/base.js` yields `vfl3jJCkb`. Paths
    /// without a recognisable version token are used whole.
    pub fn from_reference(reference: &str) -> Self {
        let path = reference
            .split(['?', '#'])
            .next()
            .unwrap_or(reference);
        let path = match path.find("://") {
            Some(idx) => {
                let rest = &path[idx + 3..];
                rest.find('/').map(|slash| &rest[slash..]).unwrap_or("/")
            }
            None => path,
        };

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        if let Some(pos) = segments.iter().position(|s| *s == "player") {
            if pos > 0 && segments[pos - 1] == "s" {
                if let Some(version) = segments.get(pos + 1) {
                    return Self(version.to_string());
                }
            }
        }

        for segment in &segments {
            if let Some(version) = segment
                .strip_prefix("player-")
                .or_else(|| segment.strip_prefix("player_"))
            {
                if !version.is_empty() && !version.ends_with(".js") {
                    return Self(version.to_string());
                }
            }
        }

        Self(path.to_string())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CodeBlobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_id() {
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
        assert_eq!(id.to_string(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_id_from_urls() {
        let cases = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://music.youtube.com/watch?v=dQw4w9WgXcQ&list=RD",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?t=42",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/live/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "www.youtube.com/watch?v=dQw4w9WgXcQ",
            "  dQw4w9WgXcQ  ",
        ];

        for case in cases {
            let id = VideoId::parse(case).unwrap_or_else(|e| panic!("{case}: {e}"));
            assert_eq!(id.as_str(), "dQw4w9WgXcQ", "{case}");
        }
    }

    #[test]
    fn test_rejects_invalid() {
        let cases = [
            "",
            "short",
            "dQw4w9WgXcQX",
            "dQw4w9WgXc!",
            "https://example.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=tooshort",
            "https://www.youtube.com/channel/UC38IQsAvIsxxjztdMZQtwHA",
        ];

        for case in cases {
            let err = VideoId::parse(case).unwrap_err();
            assert!(matches!(err, Error::InvalidReference(_)), "{case}");
        }
    }

    #[test]
    fn test_video_id_serde() {
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""dQw4w9WgXcQ""#);

        let back: VideoId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        assert!(serde_json::from_str::<VideoId>(r#""nope""#).is_err());
    }

    #[test]
    fn test_code_blob_id_modern_path() {
        let id = CodeBlobId::from_reference("/s/player/3c3b0e66/player_ias.vflset/en_US/base.js");
        assert_eq!(id.as_str(), "3c3b0e66");

        let id = CodeBlobId::from_reference(
            "https://www.youtube.com/s/player/3c3b0e66/player_ias.vflset/en_US/base.js?x=1",
        );
        assert_eq!(id.as_str(), "3c3b0e66");
    }

    #[test]
    fn test_code_blob_id_legacy_path() {
        let id = CodeBlobId::from_reference("/yts/jsbin/player-vfl3jJCkb/en_US/base.js");
        assert_eq!(id.as_str(), "vfl3jJCkb");
    }

    #[test]
    fn test_code_blob_id_fallback() {
        let id = CodeBlobId::from_reference("/static/base.js");
        assert_eq!(id.as_str(), "/static/base.js");
        assert_eq!(CodeBlobId::new("abc"), CodeBlobId::from_reference("/s/player/abc/base.js"));
    }
}
