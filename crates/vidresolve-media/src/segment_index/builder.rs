//! Segment index builder.

use tracing::{debug, trace};
use vidresolve_common::ByteRange;

use super::{SegmentIndex, SegmentIndexEntry};
use crate::ebml::{ids, EbmlCursor, Element};
use crate::error::{Error, Result};

/// Builds a [`SegmentIndex`] from a stream prefix.
///
/// The buffer must start at stream offset zero and cover at least the
/// header plus the index range.
pub struct SegmentIndexBuilder<'a> {
    buffer: &'a [u8],
}

impl<'a> SegmentIndexBuilder<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer }
    }

    /// Parse the header and the cue index found within `range`.
    pub fn build(&self, range: ByteRange) -> Result<SegmentIndex> {
        if range.end >= self.buffer.len() as u64 {
            return Err(Error::RangeOutOfBounds {
                end: range.end,
                len: self.buffer.len(),
            });
        }

        let root = EbmlCursor::new(self.buffer);
        let segment = self.locate_segment(root)?;
        let data_origin = root.absolute(segment.data_start);

        if range.start < data_origin {
            return Err(Error::invalid_range(format!(
                "index range {range} starts before segment data at {data_origin}"
            )));
        }

        let timecode_scale = read_timecode_scale(root.enter(&segment));

        let mut window = root.view(range.start as usize, range.end as usize + 1)?;
        let cues = window.expect(ids::CUES)?;
        let entries = read_cues(window.enter_complete(&cues)?, data_origin)?;

        debug!(
            entries = entries.len(),
            data_origin, timecode_scale, "built segment index"
        );

        Ok(SegmentIndex {
            entries,
            data_origin,
            timecode_scale,
        })
    }

    /// Find the EBML magic, step over the header, then find the Segment.
    fn locate_segment(&self, root: EbmlCursor<'a>) -> Result<Element> {
        let mut cursor = root;
        let magic_at = cursor.seek_id(ids::EBML).ok_or(Error::MagicNotFound)?;
        trace!(offset = magic_at, "found EBML magic");

        cursor.next_element()?;
        cursor.expect(ids::SEGMENT)
    }
}

/// Read `Info/TimecodeScale` from the Segment's leading children.
///
/// Falls back to the default scale when Info is absent, appears after the
/// first cluster, or is cut off by the end of the buffer.
fn read_timecode_scale(mut segment: EbmlCursor<'_>) -> u64 {
    loop {
        let element = match segment.next_element() {
            Ok(Some(element)) => element,
            Ok(None) | Err(_) => break,
        };
        match element.id {
            ids::INFO => {
                let mut info = segment.enter(&element);
                return match info.find(ids::TIMECODE_SCALE) {
                    Ok(Some(scale)) => info
                        .read_uint(&scale)
                        .ok()
                        .filter(|s| *s > 0)
                        .unwrap_or(ids::DEFAULT_TIMECODE_SCALE),
                    _ => ids::DEFAULT_TIMECODE_SCALE,
                };
            }
            ids::CLUSTER | ids::CUES => break,
            _ => {}
        }
    }
    ids::DEFAULT_TIMECODE_SCALE
}

/// Read every CuePoint. A point cut off by the end of the range fails the
/// whole index.
fn read_cues(mut cues: EbmlCursor<'_>, data_origin: u64) -> Result<Vec<SegmentIndexEntry>> {
    let mut entries = Vec::new();
    while let Some(point) = cues.find(ids::CUE_POINT)? {
        entries.push(read_cue_point(cues.enter_complete(&point)?, data_origin)?);
    }
    Ok(entries)
}

/// Read one CuePoint. When several cluster positions are present the last
/// one read wins. Without any the entry points at the start of segment data.
fn read_cue_point(mut point: EbmlCursor<'_>, data_origin: u64) -> Result<SegmentIndexEntry> {
    let mut timestamp = None;
    let mut relative = None;

    while let Some(child) = point.next_element()? {
        match child.id {
            ids::CUE_TIME => timestamp = Some(point.read_uint(&child)?),
            ids::CUE_TRACK_POSITIONS => {
                let mut positions = point.enter_complete(&child)?;
                while let Some(position) = positions.next_element()? {
                    if position.id == ids::CUE_CLUSTER_POSITION {
                        relative = Some(positions.read_uint(&position)?);
                    }
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(Error::MissingElement(ids::name(ids::CUE_TIME)))?;
    let relative = relative.unwrap_or(0);
    let byte_offset = data_origin.checked_add(relative).ok_or_else(|| {
        Error::invalid_range(format!(
            "cluster position {relative} overflows segment data at {data_origin}"
        ))
    })?;
    Ok(SegmentIndexEntry {
        timestamp,
        byte_offset,
    })
}

/// Build a segment index from a stream prefix and the index byte range.
pub fn build_segment_index(buffer: &[u8], range: ByteRange) -> Result<SegmentIndex> {
    SegmentIndexBuilder::new(buffer).build(range)
}
