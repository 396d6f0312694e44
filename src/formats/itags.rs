//! Static per-itag format metadata.

use vidresolve_common::FormatDescriptor;

use super::raw::parse_mime_type;

/// Known properties of an itag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItagInfo {
    pub itag: u32,
    pub mime_type: &'static str,
    pub quality_label: Option<&'static str>,
    /// Audio bitrate in kbit/s.
    pub audio_bitrate: Option<u32>,
}

const fn info(
    itag: u32,
    mime_type: &'static str,
    quality_label: Option<&'static str>,
    audio_bitrate: Option<u32>,
) -> ItagInfo {
    ItagInfo {
        itag,
        mime_type,
        quality_label,
        audio_bitrate,
    }
}

static ITAGS: &[ItagInfo] = &[
    // Muxed progressive
    info(5, r#"video/x-flv; codecs="h263, mp3""#, Some("240p"), Some(64)),
    info(17, r#"video/3gpp; codecs="mp4v.20.3, mp4a.40.2""#, Some("144p"), Some(24)),
    info(18, r#"video/mp4; codecs="avc1.42001E, mp4a.40.2""#, Some("360p"), Some(96)),
    info(22, r#"video/mp4; codecs="avc1.64001F, mp4a.40.2""#, Some("720p"), Some(192)),
    info(36, r#"video/3gpp; codecs="mp4v.20.3, mp4a.40.2""#, Some("240p"), Some(32)),
    info(43, r#"video/webm; codecs="vp8.0, vorbis""#, Some("360p"), Some(128)),
    // Live HLS
    info(91, r#"video/mp2t; codecs="avc1.4D400C, mp4a.40.5""#, Some("144p"), Some(48)),
    info(92, r#"video/mp2t; codecs="avc1.4D4015, mp4a.40.5""#, Some("240p"), Some(48)),
    info(93, r#"video/mp2t; codecs="avc1.4D401E, mp4a.40.2""#, Some("360p"), Some(128)),
    info(94, r#"video/mp2t; codecs="avc1.4D401F, mp4a.40.2""#, Some("480p"), Some(128)),
    info(95, r#"video/mp2t; codecs="avc1.4D401F, mp4a.40.2""#, Some("720p"), Some(256)),
    info(96, r#"video/mp2t; codecs="avc1.640028, mp4a.40.2""#, Some("1080p"), Some(256)),
    // DASH video, mp4
    info(133, r#"video/mp4; codecs="avc1.4d4015""#, Some("240p"), None),
    info(134, r#"video/mp4; codecs="avc1.4d401e""#, Some("360p"), None),
    info(135, r#"video/mp4; codecs="avc1.4d401f""#, Some("480p"), None),
    info(136, r#"video/mp4; codecs="avc1.4d401f""#, Some("720p"), None),
    info(137, r#"video/mp4; codecs="avc1.640028""#, Some("1080p"), None),
    info(160, r#"video/mp4; codecs="avc1.4d400c""#, Some("144p"), None),
    info(264, r#"video/mp4; codecs="avc1.640032""#, Some("1440p"), None),
    info(266, r#"video/mp4; codecs="avc1.640033""#, Some("2160p"), None),
    info(298, r#"video/mp4; codecs="avc1.4d4020""#, Some("720p60"), None),
    info(299, r#"video/mp4; codecs="avc1.64002a""#, Some("1080p60"), None),
    info(394, r#"video/mp4; codecs="av01.0.00M.08""#, Some("144p"), None),
    info(395, r#"video/mp4; codecs="av01.0.00M.08""#, Some("240p"), None),
    info(396, r#"video/mp4; codecs="av01.0.01M.08""#, Some("360p"), None),
    info(397, r#"video/mp4; codecs="av01.0.04M.08""#, Some("480p"), None),
    info(398, r#"video/mp4; codecs="av01.0.05M.08""#, Some("720p"), None),
    info(399, r#"video/mp4; codecs="av01.0.08M.08""#, Some("1080p"), None),
    // DASH audio
    info(139, r#"audio/mp4; codecs="mp4a.40.5""#, None, Some(48)),
    info(140, r#"audio/mp4; codecs="mp4a.40.2""#, None, Some(128)),
    info(141, r#"audio/mp4; codecs="mp4a.40.2""#, None, Some(256)),
    info(171, r#"audio/webm; codecs="vorbis""#, None, Some(128)),
    info(172, r#"audio/webm; codecs="vorbis""#, None, Some(192)),
    info(249, r#"audio/webm; codecs="opus""#, None, Some(48)),
    info(250, r#"audio/webm; codecs="opus""#, None, Some(64)),
    info(251, r#"audio/webm; codecs="opus""#, None, Some(160)),
    // DASH video, webm
    info(242, r#"video/webm; codecs="vp9""#, Some("240p"), None),
    info(243, r#"video/webm; codecs="vp9""#, Some("360p"), None),
    info(244, r#"video/webm; codecs="vp9""#, Some("480p"), None),
    info(247, r#"video/webm; codecs="vp9""#, Some("720p"), None),
    info(248, r#"video/webm; codecs="vp9""#, Some("1080p"), None),
    info(271, r#"video/webm; codecs="vp9""#, Some("1440p"), None),
    info(278, r#"video/webm; codecs="vp9""#, Some("144p"), None),
    info(302, r#"video/webm; codecs="vp9""#, Some("720p60"), None),
    info(303, r#"video/webm; codecs="vp9""#, Some("1080p60"), None),
    info(308, r#"video/webm; codecs="vp9""#, Some("1440p60"), None),
    info(313, r#"video/webm; codecs="vp9""#, Some("2160p"), None),
    info(315, r#"video/webm; codecs="vp9""#, Some("2160p60"), None),
];

/// Look up the static metadata for an itag.
pub fn lookup(itag: u32) -> Option<&'static ItagInfo> {
    ITAGS.iter().find(|info| info.itag == itag)
}

/// Leading pixel height of a label such as `1080p60`.
fn label_height(label: &str) -> Option<u32> {
    let digits: String = label.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Fill fields the sources left empty from the itag table.
///
/// Returns false when the itag is unknown.
pub fn enrich(format: &mut FormatDescriptor) -> bool {
    let Some(info) = lookup(format.itag) else {
        return false;
    };

    if let Some(mime) = parse_mime_type(info.mime_type) {
        if format.mime_type.is_none() {
            format.mime_type = Some(mime.essence);
        }
        if format.container.is_none() {
            format.container = Some(mime.container);
        }
        if format.codecs.is_none() {
            format.codecs = mime.codecs;
        }
        if !format.has_video && !format.has_audio {
            format.has_video = mime.has_video;
            format.has_audio = mime.has_audio;
        }
    }
    if format.quality_label.is_none() {
        format.quality_label = info.quality_label.map(str::to_string);
    }
    if format.height.is_none() {
        format.height = format.quality_label.as_deref().and_then(label_height);
    }
    if format.audio_bitrate.is_none() {
        format.audio_bitrate = info.audio_bitrate;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidresolve_common::StreamSource;

    fn bare(itag: u32) -> FormatDescriptor {
        FormatDescriptor::new(
            itag,
            StreamSource::Url {
                url: format!("https://cdn/{itag}"),
            },
        )
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(22).unwrap().quality_label, Some("720p"));
        assert_eq!(lookup(251).unwrap().audio_bitrate, Some(160));
        assert!(lookup(1).is_none());
    }

    #[test]
    fn test_itags_are_unique() {
        for (i, a) in ITAGS.iter().enumerate() {
            assert!(
                ITAGS[i + 1..].iter().all(|b| b.itag != a.itag),
                "duplicate itag {}",
                a.itag
            );
        }
    }

    #[test]
    fn test_enrich_fills_missing_fields() {
        let mut format = bare(140);
        assert!(enrich(&mut format));
        assert_eq!(format.container.as_deref(), Some("mp4"));
        assert_eq!(format.codecs.as_deref(), Some("mp4a.40.2"));
        assert_eq!(format.audio_bitrate, Some(128));
        assert!(format.is_audio_only());
        assert_eq!(format.height, None);

        let mut format = bare(299);
        enrich(&mut format);
        assert_eq!(format.height, Some(1080));
    }

    #[test]
    fn test_enrich_keeps_source_fields() {
        let mut format = bare(137);
        format.quality_label = Some("1080p HDR".into());
        format.codecs = Some("avc1.640029".into());
        format.has_video = true;
        enrich(&mut format);
        assert_eq!(format.quality_label.as_deref(), Some("1080p HDR"));
        assert_eq!(format.codecs.as_deref(), Some("avc1.640029"));
        assert!(format.is_video_only());
    }

    #[test]
    fn test_enrich_unknown_itag() {
        let mut format = bare(1);
        assert!(!enrich(&mut format));
        assert!(format.container.is_none());
    }
}
