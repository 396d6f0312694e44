//! Core type definitions for byte ranges and stream formats.
//!
//! A [`FormatDescriptor`] describes one encoding variant (identified by its
//! itag) of a video. Descriptors are produced by the format normaliser and
//! consumed by format selection and live-segment indexing.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Inclusive byte range `start..=end` within a media resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(Error::invalid_range(format!("{start}-{end}")));
        }
        Ok(Self { start, end })
    }

    /// Number of bytes covered by the range.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Returns true if `offset` falls inside the range.
    pub fn contains(&self, offset: u64) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Value for an HTTP `Range` header.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl std::str::FromStr for ByteRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| Error::invalid_range(s))?;
        let start = start
            .trim()
            .parse::<u64>()
            .map_err(|_| Error::invalid_range(s))?;
        let end = end
            .trim()
            .parse::<u64>()
            .map_err(|_| Error::invalid_range(s))?;
        Self::new(start, end)
    }
}

/// Where the media bytes of a format can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StreamSource {
    /// A directly usable media URL.
    Url { url: String },
    /// A signed token that must be deciphered and appended to `url` as the
    /// query parameter named `param`.
    Ciphered {
        token: String,
        param: String,
        url: String,
    },
}

/// Description of a single encoding variant of a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// Numeric variant identifier.
    pub itag: u32,
    pub source: StreamSource,
    /// Container name (`mp4`, `webm`, `ts`, ...).
    pub container: Option<String>,
    pub mime_type: Option<String>,
    pub codecs: Option<String>,
    /// Total bitrate in bits per second.
    pub bitrate: Option<u64>,
    /// Audio bitrate in kbit/s.
    pub audio_bitrate: Option<u32>,
    pub quality_label: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub content_length: Option<u64>,
    /// Byte range of the container header.
    pub init_range: Option<ByteRange>,
    /// Byte range of the seek index (Cues / sidx).
    pub index_range: Option<ByteRange>,
    pub has_video: bool,
    pub has_audio: bool,
    pub is_live: bool,
    pub is_dash: bool,
    pub is_hls: bool,
}

impl FormatDescriptor {
    /// Create a descriptor with only the itag and source set.
    pub fn new(itag: u32, source: StreamSource) -> Self {
        Self {
            itag,
            source,
            container: None,
            mime_type: None,
            codecs: None,
            bitrate: None,
            audio_bitrate: None,
            quality_label: None,
            width: None,
            height: None,
            fps: None,
            content_length: None,
            init_range: None,
            index_range: None,
            has_video: false,
            has_audio: false,
            is_live: false,
            is_dash: false,
            is_hls: false,
        }
    }

    /// The playable URL, if the format is not (or no longer) ciphered.
    pub fn url(&self) -> Option<&str> {
        match &self.source {
            StreamSource::Url { url } => Some(url),
            StreamSource::Ciphered { .. } => None,
        }
    }

    /// Returns true if the source still carries a signed token.
    pub fn needs_decipher(&self) -> bool {
        matches!(self.source, StreamSource::Ciphered { .. })
    }

    /// Returns true for audio-only formats.
    pub fn is_audio_only(&self) -> bool {
        self.has_audio && !self.has_video
    }

    /// Returns true for video-only formats.
    pub fn is_video_only(&self) -> bool {
        self.has_video && !self.has_audio
    }

    /// Overlay the fields carried by a more specific description of the same
    /// itag. Fields absent from `other` are kept, flags are combined.
    pub fn merge_from(&mut self, other: FormatDescriptor) {
        fn overlay<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        self.source = other.source;
        overlay(&mut self.container, other.container);
        overlay(&mut self.mime_type, other.mime_type);
        overlay(&mut self.codecs, other.codecs);
        overlay(&mut self.bitrate, other.bitrate);
        overlay(&mut self.audio_bitrate, other.audio_bitrate);
        overlay(&mut self.quality_label, other.quality_label);
        overlay(&mut self.width, other.width);
        overlay(&mut self.height, other.height);
        overlay(&mut self.fps, other.fps);
        overlay(&mut self.content_length, other.content_length);
        overlay(&mut self.init_range, other.init_range);
        overlay(&mut self.index_range, other.index_range);
        self.has_video |= other.has_video;
        self.has_audio |= other.has_audio;
        self.is_live |= other.is_live;
        self.is_dash |= other.is_dash;
        self.is_hls |= other.is_hls;
    }
}
