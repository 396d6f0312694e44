//! Format selection.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use vidresolve_common::FormatDescriptor;

use crate::error::{Error, Result};

/// Quality tiers understood by [`choose_format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Highest,
    Lowest,
    HighestAudio,
    LowestAudio,
    HighestVideo,
    LowestVideo,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Highest => "highest",
            Quality::Lowest => "lowest",
            Quality::HighestAudio => "highestaudio",
            Quality::LowestAudio => "lowestaudio",
            Quality::HighestVideo => "highestvideo",
            Quality::LowestVideo => "lowestvideo",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "highest" => Ok(Quality::Highest),
            "lowest" => Ok(Quality::Lowest),
            "highestaudio" => Ok(Quality::HighestAudio),
            "lowestaudio" => Ok(Quality::LowestAudio),
            "highestvideo" => Ok(Quality::HighestVideo),
            "lowestvideo" => Ok(Quality::LowestVideo),
            other => Err(vidresolve_common::Error::invalid_input(format!(
                "unknown quality: {other}"
            ))
            .into()),
        }
    }
}

type FormatPredicate = Arc<dyn Fn(&FormatDescriptor) -> bool + Send + Sync>;

/// How to pick one format out of a canonical list.
#[derive(Clone)]
pub enum FormatCriteria {
    Itag(u32),
    /// First itag in list order that is present.
    Itags(Vec<u32>),
    Quality(Quality),
    /// First format matching the predicate.
    Filter(FormatPredicate),
}

impl FormatCriteria {
    pub fn filter<F>(predicate: F) -> Self
    where
        F: Fn(&FormatDescriptor) -> bool + Send + Sync + 'static,
    {
        FormatCriteria::Filter(Arc::new(predicate))
    }
}

impl Default for FormatCriteria {
    fn default() -> Self {
        FormatCriteria::Quality(Quality::Highest)
    }
}

impl fmt::Debug for FormatCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatCriteria::Itag(itag) => f.debug_tuple("Itag").field(itag).finish(),
            FormatCriteria::Itags(itags) => f.debug_tuple("Itags").field(itags).finish(),
            FormatCriteria::Quality(q) => f.debug_tuple("Quality").field(q).finish(),
            FormatCriteria::Filter(_) => f.write_str("Filter(..)"),
        }
    }
}

impl fmt::Display for FormatCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatCriteria::Itag(itag) => write!(f, "itag {itag}"),
            FormatCriteria::Itags(itags) => {
                let list: Vec<String> = itags.iter().map(u32::to_string).collect();
                write!(f, "itags [{}]", list.join(", "))
            }
            FormatCriteria::Quality(q) => write!(f, "quality {q}"),
            FormatCriteria::Filter(_) => write!(f, "custom filter"),
        }
    }
}

impl FromStr for FormatCriteria {
    type Err = Error;

    /// `"highest"`, `"137"` or `"137,22,18"`.
    fn from_str(s: &str) -> Result<Self> {
        if let Ok(quality) = s.parse::<Quality>() {
            return Ok(FormatCriteria::Quality(quality));
        }

        let itags = s
            .split(',')
            .map(|part| part.trim().parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| {
                vidresolve_common::Error::invalid_input(format!("unknown format criteria: {s}"))
            })?;

        match itags.as_slice() {
            [itag] => Ok(FormatCriteria::Itag(*itag)),
            _ => Ok(FormatCriteria::Itags(itags)),
        }
    }
}

/// First candidate whose key is strictly better than every earlier one.
fn pick<'a, K>(
    candidates: impl Iterator<Item = &'a FormatDescriptor>,
    key: impl Fn(&FormatDescriptor) -> K,
    better: impl Fn(&K, &K) -> bool,
) -> Option<&'a FormatDescriptor> {
    let mut best: Option<(&'a FormatDescriptor, K)> = None;
    for format in candidates {
        let k = key(format);
        let replace = match &best {
            Some((_, current)) => better(&k, current),
            None => true,
        };
        if replace {
            best = Some((format, k));
        }
    }
    best.map(|(format, _)| format)
}

fn audio_key(f: &FormatDescriptor) -> (u32, u64) {
    (f.audio_bitrate.unwrap_or(0), f.bitrate.unwrap_or(0))
}

fn video_key(f: &FormatDescriptor) -> (u32, u32, u64) {
    (f.height.unwrap_or(0), f.fps.unwrap_or(0), f.bitrate.unwrap_or(0))
}

/// Pick a format from a list in canonical order.
///
/// `highest` and `lowest` take the first and last entries. The audio and
/// video tiers compare the relevant metrics among formats carrying that
/// track; among equally good candidates the one carrying less of the other
/// track wins, then the earlier one.
pub fn choose_format<'a>(
    formats: &'a [FormatDescriptor],
    criteria: &FormatCriteria,
) -> Result<&'a FormatDescriptor> {
    let found = match criteria {
        FormatCriteria::Itag(itag) => formats.iter().find(|f| f.itag == *itag),
        FormatCriteria::Itags(itags) => itags
            .iter()
            .find_map(|itag| formats.iter().find(|f| f.itag == *itag)),
        FormatCriteria::Filter(predicate) => formats.iter().find(|f| predicate(f)),
        FormatCriteria::Quality(Quality::Highest) => formats.first(),
        FormatCriteria::Quality(Quality::Lowest) => formats.last(),
        FormatCriteria::Quality(Quality::HighestAudio) => pick(
            formats.iter().filter(|f| f.has_audio),
            |f| (audio_key(f), std::cmp::Reverse(video_key(f))),
            |a, b| a > b,
        ),
        FormatCriteria::Quality(Quality::LowestAudio) => pick(
            formats.iter().filter(|f| f.has_audio),
            |f| (audio_key(f), video_key(f)),
            |a, b| a < b,
        ),
        FormatCriteria::Quality(Quality::HighestVideo) => pick(
            formats.iter().filter(|f| f.has_video),
            |f| (video_key(f), std::cmp::Reverse(audio_key(f))),
            |a, b| a > b,
        ),
        FormatCriteria::Quality(Quality::LowestVideo) => pick(
            formats.iter().filter(|f| f.has_video),
            |f| (video_key(f), audio_key(f)),
            |a, b| a < b,
        ),
    };

    found.ok_or_else(|| Error::FormatNotFound(criteria.to_string()))
}
