//! EBML primitives.
//!
//! Only the subset needed to walk a WebM header and cue index: element
//! headers, unsigned payloads and bounded nested views.

mod cursor;
pub mod ids;
pub mod vint;
pub mod writer;

pub use cursor::{EbmlCursor, Element};
pub use vint::{read_element_id, read_signed_vint, read_vint};
