//! Info endpoint requests and response parsing.

use std::collections::HashMap;

use serde_json::Value;
use url::{form_urlencoded, Url};
use vidresolve_common::VideoId;

use super::metadata::{RawMetadata, VideoDetails};
use super::playability::Unavailability;
use crate::error::{Error, Result};
use crate::formats::raw::{parse_stream_map, PlayerResponse};

/// Value of the `reload` field that asks the client to try again.
pub const RELOAD_SENTINEL: &str = "now";

/// What the info endpoint answered.
#[derive(Debug)]
pub enum InfoBody {
    /// The service asked for the request to be repeated.
    Reload,
    Metadata(RawMetadata),
}

/// Info endpoint:
/// `/get_video_info?video_id=ID&eurl=...&ps=default&gl=US&hl=LANG&html5=1[&sts=N]`.
pub fn info_url(base: &Url, id: &VideoId, language: &str, sts: Option<u64>) -> Result<Url> {
    let mut url = base
        .join("get_video_info")
        .map_err(|e| Error::client(format!("invalid origin URL: {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("video_id", id.as_str())
            .append_pair("eurl", &format!("https://youtube.googleapis.com/v/{id}"))
            .append_pair("ps", "default")
            .append_pair("gl", "US")
            .append_pair("hl", language)
            .append_pair("html5", "1");
        if let Some(sts) = sts {
            query.append_pair("sts", &sts.to_string());
        }
    }
    Ok(url)
}

/// Parse an info endpoint body, either JSON or a query string.
pub fn parse_info_body(body: &str) -> Result<InfoBody> {
    let trimmed = body.trim();
    if trimmed.starts_with('{') {
        parse_json_body(trimmed)
    } else {
        parse_query_body(trimmed)
    }
}

fn parse_json_body(body: &str) -> Result<InfoBody> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| Error::malformed("info response", e.to_string()))?;
    if value["reload"].as_str() == Some(RELOAD_SENTINEL) {
        return Ok(InfoBody::Reload);
    }

    let response: PlayerResponse = match value.get("player_response").cloned() {
        Some(Value::String(raw)) => serde_json::from_str(&raw),
        Some(inner @ Value::Object(_)) => serde_json::from_value(inner),
        _ => serde_json::from_value(value),
    }
    .map_err(|e| Error::malformed("info response", e.to_string()))?;

    let mut metadata = RawMetadata::default();
    metadata.absorb_player_response(response);
    Ok(InfoBody::Metadata(metadata))
}

fn parse_query_body(body: &str) -> Result<InfoBody> {
    let fields: HashMap<String, String> = form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect();
    let text = |key: &str| fields.get(key).map(String::as_str).filter(|s| !s.is_empty());

    if text("reload") == Some(RELOAD_SENTINEL) {
        return Ok(InfoBody::Reload);
    }

    let mut metadata = RawMetadata::default();
    if text("status") == Some("fail") {
        metadata.playability = Some(Unavailability::from_reason(
            text("reason").unwrap_or("unknown failure"),
        ));
    }

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
    legacy.details = Some(VideoDetails {
        video_id: text("video_id").map(str::to_string),
        title: text("title").map(str::to_string),
        author: text("author").map(str::to_string),
        length_seconds: text("length_seconds").and_then(|s| s.parse().ok()),
        view_count: text("view_count").and_then(|s| s.parse().ok()),
        is_live: text("live_playback") == Some("1"),
        ..Default::default()
    });
    metadata.fill_from(legacy);

    Ok(InfoBody::Metadata(metadata))
}
