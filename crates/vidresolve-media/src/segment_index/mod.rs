//! Segment index for live range retrieval.
//!
//! A segment index maps cue timestamps to absolute byte offsets of clusters
//! in the stream. It is rebuilt from scratch whenever the live window moves;
//! entries are never patched in place.

mod builder;

pub use builder::{build_segment_index, SegmentIndexBuilder};

use vidresolve_common::ByteRange;

use crate::ebml::ids::DEFAULT_TIMECODE_SCALE;

/// A single cue: where the cluster starting at `timestamp` begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentIndexEntry {
    /// Cue time in TimecodeScale ticks.
    pub timestamp: u64,
    /// Absolute offset in the stream, already adjusted by the Segment
    /// data origin.
    pub byte_offset: u64,
}

/// Byte range of one indexed segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentRange {
    pub timestamp: u64,
    pub start: u64,
    /// Inclusive end, `None` for the last segment which runs to the live edge.
    pub end: Option<u64>,
}

impl SegmentRange {
    /// Closed byte range, if the segment has a known end.
    pub fn byte_range(&self) -> Option<ByteRange> {
        self.end.and_then(|end| ByteRange::new(self.start, end).ok())
    }
}

/// Ordered cue index of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentIndex {
    /// Entries in ascending timestamp order.
    pub entries: Vec<SegmentIndexEntry>,
    /// Absolute offset of the Segment payload that cue positions are
    /// relative to.
    pub data_origin: u64,
    /// Nanoseconds per timestamp tick.
    pub timecode_scale: u64,
}

impl SegmentIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SegmentIndexEntry> {
        self.entries.iter()
    }

    /// Convert a tick timestamp to seconds.
    pub fn ticks_to_secs(&self, timestamp: u64) -> f64 {
        timestamp as f64 * self.timecode_scale as f64 / 1e9
    }

    /// Convert seconds to the nearest lower tick timestamp.
    pub fn secs_to_ticks(&self, secs: f64) -> u64 {
        if self.timecode_scale == 0 || secs <= 0.0 {
            return 0;
        }
        (secs * 1e9 / self.timecode_scale as f64) as u64
    }

    /// Byte ranges of consecutive segments.
    ///
    /// Entries sharing an offset collapse into the first of them. The final
    /// range is open-ended.
    pub fn ranges(&self) -> Vec<SegmentRange> {
        let mut distinct: Vec<&SegmentIndexEntry> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            match distinct.last() {
                Some(prev) if prev.byte_offset >= entry.byte_offset => {}
                _ => distinct.push(entry),
            }
        }

        distinct
            .iter()
            .enumerate()
            .map(|(i, entry)| SegmentRange {
                timestamp: entry.timestamp,
                start: entry.byte_offset,
                end: distinct.get(i + 1).map(|next| next.byte_offset - 1),
            })
            .collect()
    }

    /// Find the segment covering `timestamp` (in ticks).
    ///
    /// Returns `None` if the timestamp precedes the first entry.
    pub fn locate(&self, timestamp: u64) -> Option<SegmentRange> {
        self.ranges()
            .into_iter()
            .take_while(|range| range.timestamp <= timestamp)
            .last()
    }
}

impl Default for SegmentIndex {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            data_origin: 0,
            timecode_scale: DEFAULT_TIMECODE_SCALE,
        }
    }
}

impl<'a> IntoIterator for &'a SegmentIndex {
    type Item = &'a SegmentIndexEntry;
    type IntoIter = std::slice::Iter<'a, SegmentIndexEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
