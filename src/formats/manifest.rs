//! DASH and HLS manifest parsing into format descriptors.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use vidresolve_common::{ByteRange, FormatDescriptor, StreamSource};

use super::raw::parse_mime_type;
use crate::error::{Error, Result};

static ITAG_IN_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/itag/(\d+)(?:/|$)").unwrap());

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Default, Deserialize)]
struct MPD {
    #[serde(rename = "@type")]
    kind: Option<String>,
    #[serde(rename = "Period", default)]
    periods: Vec<Period>,
}

#[derive(Debug, Default, Deserialize)]
struct Period {
    #[serde(rename = "AdaptationSet", default)]
    adaptation_sets: Vec<AdaptationSet>,
}

#[derive(Debug, Default, Deserialize)]
struct AdaptationSet {
    #[serde(rename = "@mimeType")]
    mime_type: Option<String>,
    #[serde(rename = "@codecs")]
    codecs: Option<String>,
    #[serde(rename = "Representation", default)]
    representations: Vec<Representation>,
}

#[derive(Debug, Default, Deserialize)]
struct Representation {
    #[serde(rename = "@id")]
    id: Option<String>,
    #[serde(rename = "@mimeType")]
    mime_type: Option<String>,
    #[serde(rename = "@codecs")]
    codecs: Option<String>,
    #[serde(rename = "@bandwidth")]
    bandwidth: Option<u64>,
    #[serde(rename = "@width")]
    width: Option<u32>,
    #[serde(rename = "@height")]
    height: Option<u32>,
    #[serde(rename = "@frameRate")]
    frame_rate: Option<String>,
    #[serde(rename = "BaseURL")]
    base_url: Option<String>,
    #[serde(rename = "SegmentBase")]
    segment_base: Option<SegmentBase>,
}

#[derive(Debug, Default, Deserialize)]
struct SegmentBase {
    #[serde(rename = "@indexRange")]
    index_range: Option<String>,
    #[serde(rename = "Initialization")]
    initialization: Option<Initialization>,
}

#[derive(Debug, Default, Deserialize)]
struct Initialization {
    #[serde(rename = "@range")]
    range: Option<String>,
}

/// `"30"` or `"30000/1001"`, rounded to whole frames.
fn parse_frame_rate(value: &str) -> Option<u32> {
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.trim().parse().ok()?,
    };
    Some(rate.round() as u32)
}

fn codec_flags(format: &mut FormatDescriptor, mime: &str, codecs: Option<&str>) {
    let value = match codecs {
        Some(codecs) => format!("{mime}; codecs=\"{codecs}\""),
        None => mime.to_string(),
    };
    if let Some(mime) = parse_mime_type(&value) {
        format.mime_type = Some(mime.essence);
        format.container = Some(mime.container);
        format.codecs = mime.codecs;
        format.has_video = mime.has_video;
        format.has_audio = mime.has_audio;
    }
}

/// Parse a DASH MPD into one descriptor per Representation with a numeric
/// id and a BaseURL.
pub fn parse_dash_manifest(xml: &str) -> Result<Vec<FormatDescriptor>> {
    let mpd: MPD =
        quick_xml::de::from_str(xml).map_err(|e| Error::malformed("DASH manifest", e.to_string()))?;
    let live = mpd.kind.as_deref() == Some("dynamic");

    let mut formats = Vec::new();
    for set in mpd.periods.iter().flat_map(|p| &p.adaptation_sets) {
        for rep in &set.representations {
            let Some(itag) = rep.id.as_deref().and_then(|id| id.parse::<u32>().ok()) else {
                continue;
            };
            let Some(url) = rep.base_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
            else {
                continue;
            };

            let mut format = FormatDescriptor::new(itag, StreamSource::Url { url: url.to_string() });
            if let Some(mime) = rep.mime_type.as_deref().or(set.mime_type.as_deref()) {
                codec_flags(
                    &mut format,
                    mime,
                    rep.codecs.as_deref().or(set.codecs.as_deref()),
                );
            }
            format.bitrate = rep.bandwidth;
            format.width = rep.width;
            format.height = rep.height;
            format.fps = rep.frame_rate.as_deref().and_then(parse_frame_rate);
            if let Some(base) = &rep.segment_base {
                format.index_range = base.index_range.as_deref().and_then(|r| r.parse::<ByteRange>().ok());
                format.init_range = base
                    .initialization
                    .as_ref()
                    .and_then(|i| i.range.as_deref())
                    .and_then(|r| r.parse::<ByteRange>().ok());
            }
            format.is_dash = true;
            format.is_live = live;
            formats.push(format);
        }
    }

    Ok(formats)
}

/// Parse an HLS master playlist. The itag of each variant is taken from an
/// `/itag/N/` path segment of its URI; variants without one are skipped.
pub fn parse_hls_playlist(body: &str) -> Result<Vec<FormatDescriptor>> {
    let master = m3u8_rs::parse_master_playlist_res(body.as_bytes())
        .map_err(|e| Error::malformed("HLS playlist", format!("{e:?}")))?;

    let mut formats = Vec::new();
    for variant in master.variants.iter().filter(|v| !v.is_i_frame) {
        let Some(itag) = ITAG_IN_PATH
            .captures(&variant.uri)
            .and_then(|c| c[1].parse::<u32>().ok())
        else {
            continue;
        };

        let mut format = FormatDescriptor::new(
            itag,
            StreamSource::Url {
                url: variant.uri.clone(),
            },
        );
        codec_flags(&mut format, "video/mp2t", variant.codecs.as_deref());
        format.bitrate = Some(variant.bandwidth);
        if let Some(resolution) = &variant.resolution {
            format.width = u32::try_from(resolution.width).ok();
            format.height = u32::try_from(resolution.height).ok();
        }
        format.fps = variant.frame_rate.map(|f| f.round() as u32);
        format.is_hls = true;
        formats.push(format);
    }

    Ok(formats)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MPD_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static" mediaPresentationDuration="PT212S">
  <Period>
    <AdaptationSet mimeType="audio/mp4" subsegmentAlignment="true">
      <Representation id="140" codecs="mp4a.40.2" bandwidth="130904">
        <BaseURL>https://cdn.example/140/</BaseURL>
        <SegmentBase indexRange="592-859">
          <Initialization range="0-591"/>
        </SegmentBase>
      </Representation>
    </AdaptationSet>
    <AdaptationSet mimeType="video/mp4">
      <Representation id="137" codecs="avc1.640028" width="1920" height="1080" frameRate="30000/1001" bandwidth="4400000">
        <BaseURL>https://cdn.example/137/</BaseURL>
      </Representation>
      <Representation id="no-itag" codecs="avc1.640028" bandwidth="1">
        <BaseURL>https://cdn.example/other/</BaseURL>
      </Representation>
    </AdaptationSet>
  </Period>
</MPD>"#;

    const M3U8: &str = "#EXTM3U
#EXT-X-INDEPENDENT-SEGMENTS
#EXT-X-STREAM-INF:BANDWIDTH=290288,CODECS=\"avc1.4D400C,mp4a.40.5\",RESOLUTION=256x144,FRAME-RATE=30
https://manifest.example/api/manifest/hls_playlist/id/abc/itag/91/playlist/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2525744,CODECS=\"avc1.4D401F,mp4a.40.2\",RESOLUTION=1280x720,FRAME-RATE=30
https://manifest.example/api/manifest/hls_playlist/id/abc/itag/95/playlist/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=100,CODECS=\"mp4a.40.2\"
https://manifest.example/no-itag/index.m3u8
";

    #[test]
    fn test_parse_dash_manifest() {
        let formats = parse_dash_manifest(MPD_XML).unwrap();
        assert_eq!(formats.len(), 2);

        let audio = &formats[0];
        assert_eq!(audio.itag, 140);
        assert_eq!(audio.url(), Some("https://cdn.example/140/"));
        assert_eq!(audio.container.as_deref(), Some("mp4"));
        assert_eq!(audio.bitrate, Some(130_904));
        assert_eq!(audio.index_range, Some(ByteRange { start: 592, end: 859 }));
        assert_eq!(audio.init_range, Some(ByteRange { start: 0, end: 591 }));
        assert!(audio.is_audio_only());
        assert!(audio.is_dash);
        assert!(!audio.is_live);

        let video = &formats[1];
        assert_eq!(video.itag, 137);
        assert_eq!(video.height, Some(1080));
        assert_eq!(video.fps, Some(30));
        assert!(video.is_video_only());
    }

    #[test]
    fn test_dynamic_manifest_is_live() {
        let xml = MPD_XML.replace(r#"type="static""#, r#"type="dynamic""#);
        let formats = parse_dash_manifest(&xml).unwrap();
        assert!(formats.iter().all(|f| f.is_live));
    }

    #[test]
    fn test_parse_dash_manifest_rejects_garbage() {
        let err = parse_dash_manifest("<MPD><Period>").unwrap_err();
        assert!(err.to_string().starts_with("Malformed DASH manifest"));
    }

    #[test]
    fn test_parse_hls_playlist() {
        let formats = parse_hls_playlist(M3U8).unwrap();
        assert_eq!(formats.len(), 2);

        assert_eq!(formats[0].itag, 91);
        assert_eq!(formats[0].width, Some(256));
        assert_eq!(formats[0].height, Some(144));
        assert_eq!(formats[0].bitrate, Some(290_288));
        assert_eq!(formats[0].container.as_deref(), Some("ts"));
        assert!(formats[0].has_audio && formats[0].has_video);
        assert!(formats[0].is_hls);

        assert_eq!(formats[1].itag, 95);
        assert_eq!(formats[1].fps, Some(30));
    }

    #[test]
    fn test_frame_rate() {
        assert_eq!(parse_frame_rate("25"), Some(25));
        assert_eq!(parse_frame_rate("60000/1001"), Some(60));
        assert_eq!(parse_frame_rate("1/0"), None);
        assert_eq!(parse_frame_rate("x"), None);
    }
}
