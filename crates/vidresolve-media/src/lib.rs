//! Vidresolve-Media: EBML parsing and segment indexes for live streams
//!
//! Live WebM streams are served as a growing byte window. Retrieving a
//! segment by time requires the container's cue index, which maps
//! timestamps to cluster offsets relative to the start of the Segment
//! element. This crate parses just enough EBML to produce that mapping as
//! absolute byte offsets.
//!
//! # Modules
//!
//! - `ebml` - Variable-length integers, element IDs and a bounded cursor
//! - `segment_index` - Cue index extraction and time to byte range lookup
//!
//! # Example
//!
//! ```no_run
//! use vidresolve_common::ByteRange;
//! use vidresolve_media::build_segment_index;
//!
//! # fn run(prefix: &[u8]) -> vidresolve_media::Result<()> {
//! let index = build_segment_index(prefix, ByteRange::new(4_000, 4_811).unwrap())?;
//! for range in index.ranges() {
//!     println!("{} -> {}", range.timestamp, range.start);
//! }
//! # Ok(())
//! # }
//! ```

pub mod ebml;
pub mod error;
pub mod segment_index;

pub use ebml::EbmlCursor;
pub use error::{Error, Result};
pub use segment_index::{
    build_segment_index, SegmentIndex, SegmentIndexBuilder, SegmentIndexEntry, SegmentRange,
};
