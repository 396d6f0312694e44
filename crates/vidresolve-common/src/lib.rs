//! Vidresolve-Common: Shared identifiers, format descriptors, and errors.
//!
//! This crate provides the vocabulary used across vidresolve:
//!
//! - **Identifiers**: [`VideoId`] (the validated video reference) and
//!   [`CodeBlobId`] (cache key for player code blobs)
//! - **Core Types**: [`FormatDescriptor`], [`StreamSource`] and [`ByteRange`]
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use vidresolve_common::{ByteRange, VideoId};
//!
//! let id = VideoId::parse("https://youtu.be/dQw4w9WgXcQ").unwrap();
//! assert_eq!(id.as_str(), "dQw4w9WgXcQ");
//!
//! let range: ByteRange = "0-4451".parse().unwrap();
//! assert_eq!(range.len(), 4452);
//! ```

pub mod error;
pub mod ids;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
