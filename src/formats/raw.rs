//! Raw format data as published by the origin service.
//!
//! Two shapes are understood: the JSON player response (`streamingData.formats`
//! and `streamingData.adaptiveFormats`) and the legacy comma-separated
//! query-string stream maps (`url_encoded_fmt_stream_map`, `adaptive_fmts`).

use serde::Deserialize;
use url::form_urlencoded;
use vidresolve_common::{ByteRange, FormatDescriptor, StreamSource};

/// Query parameter used for deciphered signatures when the source names none.
pub const DEFAULT_SIGNATURE_PARAM: &str = "signature";

const AUDIO_CODECS: &[&str] = &["mp4a", "opus", "vorbis", "ac-3", "ec-3", "flac", "mp3"];
const VIDEO_CODECS: &[&str] = &[
    "avc1", "avc3", "vp8", "vp9", "vp09", "av01", "hev1", "hvc1", "mp4v", "h263",
];

/// The embedded player response object.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerResponse {
    pub playability_status: Option<PlayabilityStatus>,
    pub video_details: Option<RawVideoDetails>,
    pub streaming_data: Option<StreamingData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayabilityStatus {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawVideoDetails {
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub channel_id: Option<String>,
    pub length_seconds: Option<String>,
    pub view_count: Option<String>,
    pub is_live: Option<bool>,
    pub is_live_content: Option<bool>,
    pub short_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamingData {
    pub formats: Vec<PlayerFormat>,
    pub adaptive_formats: Vec<PlayerFormat>,
    pub dash_manifest_url: Option<String>,
    pub hls_manifest_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerFormat {
    pub itag: u32,
    pub url: Option<String>,
    pub signature_cipher: Option<String>,
    pub cipher: Option<String>,
    pub mime_type: Option<String>,
    pub bitrate: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub quality_label: Option<String>,
    pub content_length: Option<String>,
    pub init_range: Option<RawRange>,
    pub index_range: Option<RawRange>,
}

/// `{"start": "0", "end": "219"}`; the service encodes offsets as strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawRange {
    pub start: String,
    pub end: String,
}

impl RawRange {
    fn to_byte_range(&self) -> Option<ByteRange> {
        let start = self.start.parse().ok()?;
        let end = self.end.parse().ok()?;
        ByteRange::new(start, end).ok()
    }
}

impl PlayerFormat {
    /// Convert into a descriptor. Formats with no URL and no cipher are
    /// dropped.
    pub fn into_descriptor(self) -> Option<FormatDescriptor> {
        let source = match (&self.url, self.signature_cipher.as_ref().or(self.cipher.as_ref())) {
            (Some(url), _) => StreamSource::Url { url: url.clone() },
            (None, Some(cipher)) => parse_cipher(cipher)?,
            (None, None) => return None,
        };

        let mut format = FormatDescriptor::new(self.itag, source);
        if let Some(mime) = self.mime_type.as_deref() {
            apply_mime_type(&mut format, mime);
        }
        format.bitrate = self.bitrate;
        format.width = self.width;
        format.height = self.height;
        format.fps = self.fps;
        format.quality_label = self.quality_label;
        format.content_length = self.content_length.and_then(|c| c.parse().ok());
        format.init_range = self.init_range.as_ref().and_then(RawRange::to_byte_range);
        format.index_range = self.index_range.as_ref().and_then(RawRange::to_byte_range);
        mark_live_url(&mut format);
        Some(format)
    }
}

impl StreamingData {
    /// All muxed and adaptive formats, muxed first.
    pub fn descriptors(self) -> Vec<FormatDescriptor> {
        self.formats
            .into_iter()
            .chain(self.adaptive_formats)
            .filter_map(PlayerFormat::into_descriptor)
            .collect()
    }
}

/// Parse a `signatureCipher` query string (`s=...&sp=sig&url=...`).
pub fn parse_cipher(cipher: &str) -> Option<StreamSource> {
    let mut token = None;
    let mut param = None;
    let mut url = None;
    for (key, value) in form_urlencoded::parse(cipher.as_bytes()) {
        match key.as_ref() {
            "s" => token = Some(value.into_owned()),
            "sp" => param = Some(value.into_owned()),
            "url" => url = Some(value.into_owned()),
            _ => {}
        }
    }

    let url = url?;
    Some(match token {
        Some(token) => StreamSource::Ciphered {
            token,
            param: param.unwrap_or_else(|| DEFAULT_SIGNATURE_PARAM.to_string()),
            url,
        },
        None => StreamSource::Url { url },
    })
}

/// Parsed form of a `video/mp4; codecs="avc1.4d401f, mp4a.40.2"` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeType {
    pub essence: String,
    pub container: String,
    pub codecs: Option<String>,
    pub has_video: bool,
    pub has_audio: bool,
}

pub fn parse_mime_type(value: &str) -> Option<MimeType> {
    let mut parts = value.split(';');
    let essence = parts.next()?.trim().to_ascii_lowercase();
    let (kind, subtype) = essence.split_once('/')?;

    let codecs = parts
        .filter_map(|p| p.trim().strip_prefix("codecs="))
        .map(|c| c.trim_matches('"').trim().to_string())
        .find(|c| !c.is_empty());

    let container = match subtype {
        "x-flv" => "flv",
        "3gpp" => "3gp",
        "mp2t" => "ts",
        other => other,
    }
    .to_string();

    let (has_video, has_audio) = match &codecs {
        Some(codecs) => {
            let names: Vec<String> = codecs
                .split(',')
                .map(|c| c.trim().to_ascii_lowercase())
                .collect();
            let matches =
                |list: &[&str]| names.iter().any(|n| list.iter().any(|p| n.starts_with(p)));
            (matches(VIDEO_CODECS), matches(AUDIO_CODECS))
        }
        None => (kind == "video", kind == "audio"),
    };

    Some(MimeType {
        essence,
        container,
        codecs,
        has_video,
        has_audio,
    })
}

fn apply_mime_type(format: &mut FormatDescriptor, value: &str) {
    if let Some(mime) = parse_mime_type(value) {
        format.mime_type = Some(mime.essence);
        format.container = Some(mime.container);
        format.codecs = mime.codecs;
        format.has_video = mime.has_video;
        format.has_audio = mime.has_audio;
    }
}

fn mark_live_url(format: &mut FormatDescriptor) {
    let url = match &format.source {
        StreamSource::Url { url } | StreamSource::Ciphered { url, .. } => url,
    };
    if url.contains("yt_live_broadcast") || url.contains("/source/yt_live") {
        format.is_live = true;
    }
}

/// Parse a legacy comma-separated stream map into descriptors.
///
/// Entries without an itag or a URL are skipped.
pub fn parse_stream_map(map: &str) -> Vec<FormatDescriptor> {
    map.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(parse_stream_map_entry)
        .collect()
}

fn parse_stream_map_entry(entry: &str) -> Option<FormatDescriptor> {
    let mut itag = None;
    let mut url = None;
    let mut token = None;
    let mut plain_signature = None;
    let mut param = None;
    let mut mime = None;
    let mut size = None;
    let mut bitrate = None;
    let mut clen = None;
    let mut init = None;
    let mut index = None;
    let mut fps = None;
    let mut quality_label = None;

    for (key, value) in form_urlencoded::parse(entry.trim().as_bytes()) {
        match key.as_ref() {
            "itag" => itag = value.parse::<u32>().ok(),
            "url" => url = Some(value.into_owned()),
            "s" => token = Some(value.into_owned()),
            "sig" | "signature" => plain_signature = Some(value.into_owned()),
            "sp" => param = Some(value.into_owned()),
            "type" => mime = Some(value.into_owned()),
            "size" => size = Some(value.into_owned()),
            "bitrate" => bitrate = value.parse::<u64>().ok(),
            "clen" => clen = value.parse::<u64>().ok(),
            "init" => init = value.parse::<ByteRange>().ok(),
            "index" => index = value.parse::<ByteRange>().ok(),
            "fps" => fps = value.parse::<u32>().ok(),
            "quality_label" => quality_label = Some(value.into_owned()),
            _ => {}
        }
    }

    let itag = itag?;
    let url = url?;
    let param = param.unwrap_or_else(|| DEFAULT_SIGNATURE_PARAM.to_string());
    let source = match (token, plain_signature) {
        (Some(token), _) => StreamSource::Ciphered { token, param, url },
        (None, Some(sig)) => StreamSource::Url {
            url: append_query(&url, &param, &sig),
        },
        (None, None) => StreamSource::Url { url },
    };

    let mut format = FormatDescriptor::new(itag, source);
    if let Some(mime) = mime.as_deref() {
        apply_mime_type(&mut format, mime);
    }
    if let Some((w, h)) = size.as_deref().and_then(|s| s.split_once('x')) {
        format.width = w.parse().ok();
        format.height = h.parse().ok();
    }
    format.bitrate = bitrate;
    format.content_length = clen;
    format.init_range = init;
    format.index_range = index;
    format.fps = fps;
    format.quality_label = quality_label;
    mark_live_url(&mut format);
    Some(format)
}

/// Append `name=value` to a URL, percent-encoding the value.
pub fn append_query(url: &str, name: &str, value: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    let encoded: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
    format!("{url}{separator}{name}={encoded}")
}
