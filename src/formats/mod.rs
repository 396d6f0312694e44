//! Format descriptors: parsing from the origin's payloads, normalisation into
//! a canonical list, and selection.
//!
//! The flow is:
//!
//! 1. [`raw`] turns player responses and legacy stream maps into descriptors
//! 2. [`manifest`] does the same for DASH and HLS manifests
//! 3. [`FormatNormalizer`] merges the sources, enriches from [`itags`],
//!    deciphers signed tokens and orders the result
//! 4. [`choose_format`] picks one descriptor by criteria

pub mod choose;
pub mod itags;
pub mod manifest;
pub mod normalize;
pub mod raw;

pub use choose::{choose_format, FormatCriteria, Quality};
pub use manifest::{parse_dash_manifest, parse_hls_playlist};
pub use normalize::{canonical_order, FormatNormalizer, FormatSources};
pub use raw::{parse_stream_map, PlayerResponse};
