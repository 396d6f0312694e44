//! Vidresolve - Resolve video references into playable media streams
//!
//! The library walks the origin's metadata endpoints with retry and
//! fallback, deciphers signed stream URLs, and normalises everything it
//! found into one ordered list of formats.
//!
//! ```no_run
//! use vidresolve::{choose_format, FormatCriteria, InfoResolver, ResolveOptions};
//!
//! # async fn run(config: &vidresolve::config::Config) -> vidresolve::Result<()> {
//! let resolver = InfoResolver::from_config(config)?;
//! let info = resolver.resolve("dQw4w9WgXcQ", &ResolveOptions::new()).await?;
//! let best = choose_format(&info.formats, &FormatCriteria::default())?;
//! println!("{} {:?}", best.itag, best.url());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod formats;
pub mod http;
pub mod resolver;

pub use error::{Error, ErrorKind, Result};
pub use formats::{choose_format, FormatCriteria, FormatNormalizer, Quality};
pub use http::{FetchResponse, Fetcher, HttpFetcher, TransportError};
pub use resolver::{InfoResolver, ResolveOptions, RetryPolicy, Unavailability, VideoInfo};

pub use vidresolve_cipher as cipher;
pub use vidresolve_common as common;
pub use vidresolve_media as media;
