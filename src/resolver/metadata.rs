//! Raw metadata gathered from the origin's endpoints.

use serde::Serialize;
use vidresolve_common::FormatDescriptor;

use super::playability::Unavailability;
use crate::formats::raw::{PlayerResponse, RawVideoDetails};

/// Descriptive fields of a video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VideoDetails {
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub channel_id: Option<String>,
    pub length_seconds: Option<u64>,
    pub view_count: Option<u64>,
    pub is_live: bool,
    pub description: Option<String>,
}

impl VideoDetails {
    /// Keep existing values and take the rest from `other`.
    pub fn fill_from(&mut self, other: VideoDetails) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }

        fill(&mut self.video_id, other.video_id);
        fill(&mut self.title, other.title);
        fill(&mut self.author, other.author);
        fill(&mut self.channel_id, other.channel_id);
        fill(&mut self.length_seconds, other.length_seconds);
        fill(&mut self.view_count, other.view_count);
        fill(&mut self.description, other.description);
        self.is_live |= other.is_live;
    }
}

impl From<RawVideoDetails> for VideoDetails {
    fn from(raw: RawVideoDetails) -> Self {
        Self {
            video_id: raw.video_id,
            title: raw.title,
            author: raw.author,
            channel_id: raw.channel_id,
            length_seconds: raw.length_seconds.and_then(|s| s.parse().ok()),
            view_count: raw.view_count.and_then(|s| s.parse().ok()),
            is_live: raw.is_live.unwrap_or(false),
            description: raw.short_description,
        }
    }
}

/// What one or more endpoints revealed about a video.
#[derive(Debug, Clone, Default)]
pub struct RawMetadata {
    pub details: Option<VideoDetails>,
    /// Inline formats from the player response or legacy stream maps.
    pub formats: Vec<FormatDescriptor>,
    /// Reference to the player code blob, possibly relative.
    pub code_blob_url: Option<String>,
    pub dash_manifest_url: Option<String>,
    pub hls_manifest_url: Option<String>,
    /// Signature timestamp of the player, forwarded to the info endpoint.
    pub sts: Option<u64>,
    pub playability: Option<Unavailability>,
}

impl RawMetadata {
    /// Fold a player response into this metadata, keeping values already
    /// present.
    pub fn absorb_player_response(&mut self, response: PlayerResponse) {
        let mut other = RawMetadata::default();

        if let Some(status) = &response.playability_status {
            other.playability =
                Unavailability::from_status(&status.status, status.reason.as_deref());
        }
        if let Some(details) = response.video_details {
            other.details = Some(details.into());
        }
        if let Some(mut streaming) = response.streaming_data {
            other.dash_manifest_url = streaming.dash_manifest_url.take();
            other.hls_manifest_url = streaming.hls_manifest_url.take();
            other.formats = streaming.descriptors();
        }

        self.fill_from(other);
    }

    /// Keep existing values and take the rest from `other`. Formats are
    /// taken as a whole when none are known yet.
    pub fn fill_from(&mut self, other: RawMetadata) {
        if let Some(more) = other.details {
            if let Some(details) = &mut self.details {
                details.fill_from(more);
            } else {
                self.details = Some(more);
            }
        }
        if self.formats.is_empty() {
            self.formats = other.formats;
        }
        self.code_blob_url = self.code_blob_url.take().or(other.code_blob_url);
        self.dash_manifest_url = self.dash_manifest_url.take().or(other.dash_manifest_url);
        self.hls_manifest_url = self.hls_manifest_url.take().or(other.hls_manifest_url);
        self.sts = self.sts.or(other.sts);
        self.playability = self.playability.take().or(other.playability);
    }

    /// Inline formats or a manifest URL are known.
    pub fn has_format_sources(&self) -> bool {
        !self.formats.is_empty()
            || self.dash_manifest_url.is_some()
            || self.hls_manifest_url.is_some()
    }

    /// Whether any inline format carries a signed token. Manifest entries are
    /// only known after their fetch, see [`FormatSources::needs_decipher`].
    ///
    /// [`FormatSources::needs_decipher`]: crate::formats::FormatSources::needs_decipher
    pub fn needs_decipher(&self) -> bool {
        self.formats.iter().any(FormatDescriptor::needs_decipher)
    }

    /// Minimum usable result: some format source or a code blob reference.
    pub fn is_viable(&self) -> bool {
        self.has_format_sources() || self.code_blob_url.is_some()
    }

    /// Nothing further is needed from later endpoints.
    pub fn is_complete(&self) -> bool {
        self.has_format_sources() && (self.code_blob_url.is_some() || !self.needs_decipher())
    }

    pub fn is_live(&self) -> bool {
        self.details.as_ref().is_some_and(|d| d.is_live)
    }
}
