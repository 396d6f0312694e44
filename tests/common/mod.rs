//! Shared test harness for integration tests.
//!
//! Provides [`TestOrigin`], a `wiremock` server standing in for the origin
//! service, plus page and code blob fixtures.

#![allow(dead_code)]

use std::sync::Arc;

use url::Url;
use vidresolve::config::HttpConfig;
use vidresolve::{HttpFetcher, InfoResolver, RetryPolicy};
use vidresolve_common::ByteRange;
use vidresolve_media::ebml::ids;
use vidresolve_media::ebml::writer::{element, uint_element, unknown_size_element};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const VIDEO_ID: &str = "dQw4w9WgXcQ";
pub const WATCH: &str = "/watch";
pub const INFO: &str = "/get_video_info";
pub const EMBED: &str = "/embed/dQw4w9WgXcQ";
pub const CODE_BLOB: &str = "/s/player/4fcd6e4a/player_ias.vflset/en_US/base.js";

/// Decipher function reversing the token and dropping two characters.
pub const PLAYER_JS: &str = r#"var Xy={Ab:function(a){a.reverse()},cd:function(a,b){a.splice(0,b)}};
Gz=function(a){a=a.split("");Xy.Ab(a,0);Xy.cd(a,2);return a.join("")};"#;

/// Mock origin plus a resolver pointed at it.
pub struct TestOrigin {
    pub server: MockServer,
    pub resolver: InfoResolver,
}

impl TestOrigin {
    /// Start a mock origin with one retry per endpoint and no back-off delay.
    pub async fn start() -> Self {
        Self::with_retry(RetryPolicy::none().with_max_retries(1).with_reload_retries(1)).await
    }

    pub async fn with_retry(retry: RetryPolicy) -> Self {
        let server = MockServer::start().await;
        let fetcher = HttpFetcher::new(&HttpConfig::default()).expect("failed to build client");
        let base = Url::parse(&server.uri()).expect("mock server uri");
        let resolver = InfoResolver::new(Arc::new(fetcher), base).with_retry(retry);
        Self { server, resolver }
    }

    /// Answer GETs to `route` with `status` and `body`.
    pub async fn serve(&self, route: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Like [`serve`](Self::serve) but only for the first `times` requests.
    pub async fn serve_times(&self, route: &str, status: u16, body: &str, times: u64) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .up_to_n_times(times)
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// Fail the test on drop if `route` was requested other than `times` times.
    pub async fn expect(&self, route: &str, status: u16, body: &str, times: u64) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub fn url(&self, route: &str) -> String {
        format!("{}{}", self.server.uri(), route)
    }
}

/// A watch page embedding `player_response` as `ytInitialPlayerResponse`.
pub fn page_with(player_response: serde_json::Value, extra: &str) -> String {
    format!(
        "<html><head><script>var ytInitialPlayerResponse = {player_response};</script>{extra}</head></html>"
    )
}

/// Script tag publishing the code blob reference, as the watch page does.
pub fn js_url_script() -> String {
    format!(r#"<script>ytcfg.set({{"PLAYER_JS_URL":"{}","STS":19369}});</script>"#, CODE_BLOB.replace('/', "\\/"))
}

/// Player response with one muxed and one audio format, both plain URLs.
pub fn plain_response(cdn: &str) -> serde_json::Value {
    serde_json::json!({
        "playabilityStatus": {"status": "OK"},
        "videoDetails": {
            "videoId": VIDEO_ID,
            "title": "Fixture video",
            "author": "Fixture channel",
            "lengthSeconds": "212",
            "viewCount": "1000"
        },
        "streamingData": {
            "formats": [{
                "itag": 18,
                "url": format!("{cdn}/videoplayback?itag=18"),
                "mimeType": "video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"",
                "bitrate": 500000,
                "qualityLabel": "360p",
                "width": 640,
                "height": 360
            }],
            "adaptiveFormats": [{
                "itag": 140,
                "url": format!("{cdn}/videoplayback?itag=140"),
                "mimeType": "audio/mp4; codecs=\"mp4a.40.2\"",
                "bitrate": 130000
            }]
        }
    })
}

/// Player response whose only format carries a signed token.
pub fn ciphered_response(cdn: &str) -> serde_json::Value {
    let cipher: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("s", "abcdefg")
        .append_pair("sp", "sig")
        .append_pair("url", &format!("{cdn}/videoplayback?itag=22"))
        .finish();
    serde_json::json!({
        "playabilityStatus": {"status": "OK"},
        "videoDetails": {"videoId": VIDEO_ID, "title": "Signed video"},
        "streamingData": {
            "formats": [{
                "itag": 22,
                "signatureCipher": cipher,
                "mimeType": "video/mp4; codecs=\"avc1.64001F, mp4a.40.2\"",
                "qualityLabel": "720p"
            }]
        }
    })
}

/// Player response reporting the video as unplayable.
pub fn blocked_response(status: &str, reason: &str) -> serde_json::Value {
    serde_json::json!({
        "playabilityStatus": {"status": status, "reason": reason}
    })
}

/// A live WebM prefix: header, unknown-size Segment, cues, then a cluster.
/// Returns the bytes and the cue index range.
pub fn live_webm_prefix() -> (Vec<u8>, ByteRange) {
    let cue_point = |time: u64, position: u64| {
        let mut track = uint_element(ids::CUE_TRACK, 1);
        track.extend(uint_element(ids::CUE_CLUSTER_POSITION, position));
        let mut payload = uint_element(ids::CUE_TIME, time);
        payload.extend(element(ids::CUE_TRACK_POSITIONS, &track));
        element(ids::CUE_POINT, &payload)
    };

    let mut buf = element(ids::EBML, &uint_element(0x4286, 1));
    let cues = element(ids::CUES, &[cue_point(0, 0), cue_point(2000, 150)].concat());
    // 4-byte Segment ID plus the 1-byte unknown size.
    let cues_at = buf.len() + 5;

    let mut segment = cues.clone();
    segment.extend(element(ids::CLUSTER, &[0u8; 32]));
    buf.extend(unknown_size_element(ids::SEGMENT, &segment));

    let range = ByteRange::new(cues_at as u64, (cues_at + cues.len() - 1) as u64)
        .expect("valid cue range");
    (buf, range)
}
