//! Watch and embed page parsing.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use url::Url;
use vidresolve_common::VideoId;

use super::metadata::{RawMetadata, VideoDetails};
use crate::error::{Error, Result};
use crate::formats::raw::{parse_stream_map, PlayerResponse};

static PLAYER_RESPONSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ytInitialPlayerResponse\s*=\s*\{").unwrap());
static PLAYER_CONFIG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ytplayer\.config\s*=\s*\{").unwrap());
static EMBEDDED_RESPONSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""embedded_player_response"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap()
});
static JS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:jsUrl|PLAYER_JS_URL)"\s*:\s*"([^"]+)""#).unwrap()
});
static SCRIPT_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<script[^>]+src="([^"]+/base\.js)""#).unwrap()
});
static STS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""?(?:sts|STS|signatureTimestamp)"?\s*:\s*(\d+)"#).unwrap()
});

/// Primary page: `/watch?v=ID&hl=LANG&has_verified=1&bpctr=9999999999`.
pub fn watch_url(base: &Url, id: &VideoId, language: &str) -> Result<Url> {
    let mut url = base
        .join("watch")
        .map_err(|e| Error::client(format!("invalid origin URL: {e}")))?;
    url.query_pairs_mut()
        .append_pair("v", id.as_str())
        .append_pair("hl", language)
        .append_pair("has_verified", "1")
        .append_pair("bpctr", "9999999999");
    Ok(url)
}

/// Embed page: `/embed/ID?hl=LANG`.
pub fn embed_url(base: &Url, id: &VideoId, language: &str) -> Result<Url> {
    let mut url = base
        .join(&format!("embed/{id}"))
        .map_err(|e| Error::client(format!("invalid origin URL: {e}")))?;
    url.query_pairs_mut().append_pair("hl", language);
    Ok(url)
}

/// The balanced `{...}` object starting at byte `start`, skipping braces
/// inside string literals.
pub fn balanced_object(text: &str, start: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// JSON object assigned after a marker such as `ytInitialPlayerResponse =`.
fn assigned_object<'a>(text: &'a str, marker: &Regex) -> Option<&'a str> {
    let found = marker.find(text)?;
    balanced_object(text, found.end() - 1)
}

/// Undo the `\/` escaping used in inline script strings.
fn unescape_slashes(value: &str) -> String {
    value.replace("\\/", "/")
}

/// Parse a watch or embed page.
///
/// Missing pieces are not an error; a page may carry only part of the
/// metadata. Embedded JSON that fails to parse is.
pub fn parse_page(html: &str) -> Result<RawMetadata> {
    let mut metadata = RawMetadata::default();

    if let Some(json) = assigned_object(html, &PLAYER_RESPONSE) {
        let response: PlayerResponse = serde_json::from_str(json)
            .map_err(|e| Error::malformed("player response", e.to_string()))?;
        metadata.absorb_player_response(response);
    }

    if let Some(json) = assigned_object(html, &PLAYER_CONFIG) {
        let config: Value = serde_json::from_str(json)
            .map_err(|e| Error::malformed("player config", e.to_string()))?;
        absorb_player_config(&mut metadata, &config)?;
    }

    if let Some(caps) = EMBEDDED_RESPONSE.captures(html) {
        let raw: String = serde_json::from_str(&format!("\"{}\"", &caps[1]))
            .map_err(|e| Error::malformed("embedded player response", e.to_string()))?;
        let response: PlayerResponse = serde_json::from_str(&raw)
            .map_err(|e| Error::malformed("embedded player response", e.to_string()))?;
        metadata.absorb_player_response(response);
    }

    if metadata.code_blob_url.is_none() {
        metadata.code_blob_url = JS_URL
            .captures(html)
            .or_else(|| SCRIPT_SRC.captures(html))
            .map(|caps| unescape_slashes(&caps[1]));
    }
    if metadata.sts.is_none() {
        metadata.sts = STS.captures(html).and_then(|caps| caps[1].parse().ok());
    }

    Ok(metadata)
}

/// Legacy `ytplayer.config`: `args` holds the player response and the old
/// inline maps, `assets.js` the code blob and `sts` the signature timestamp.
fn absorb_player_config(metadata: &mut RawMetadata, config: &Value) -> Result<()> {
    let args = &config["args"];
    let text = |key: &str| args[key].as_str().filter(|s| !s.is_empty());

    if let Some(raw) = text("player_response") {
        let response: PlayerResponse = serde_json::from_str(raw)
            .map_err(|e| Error::malformed("player response", e.to_string()))?;
        metadata.absorb_player_response(response);
    }

    let mut legacy = RawMetadata::default();
    for key in ["url_encoded_fmt_stream_map", "adaptive_fmts"] {
        if let Some(map) = text(key) {
            legacy.formats.extend(parse_stream_map(map));
        }
    }
    legacy.dash_manifest_url = text("dashmpd").map(str::to_string);
    legacy.hls_manifest_url = text("hlsvp").map(str::to_string);
    legacy.code_blob_url = config["assets"]["js"].as_str().map(unescape_slashes);
    legacy.sts = config["sts"].as_u64();
    legacy.details = Some(VideoDetails {
        video_id: text("video_id").map(str::to_string),
        title: text("title").map(str::to_string),
        author: text("author").map(str::to_string),
        length_seconds: text("length_seconds").and_then(|s| s.parse().ok()),
        is_live: text("live_playback") == Some("1"),
        ..Default::default()
    });
    metadata.fill_from(legacy);
    Ok(())
}
