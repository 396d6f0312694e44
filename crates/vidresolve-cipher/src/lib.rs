//! Vidresolve-Cipher: recovers media URLs from signed tokens.
//!
//! The origin service ships an obfuscated player code blob containing a
//! function that scrambles signature tokens through a short chain of string
//! operations. This crate:
//!
//! - parses that chain into a [`TransformProgram`] ([`extract_transform_program`])
//! - executes a program over a token ([`decipher`])
//! - memoizes programs per [`CodeBlobId`](vidresolve_common::CodeBlobId) in a
//!   [`ProgramCache`], with [`CipherEngine`] coalescing concurrent population
//!
//! # Example
//!
//! ```
//! use vidresolve_cipher::{decipher, Op, TransformProgram};
//!
//! let program = TransformProgram::new(vec![Op::Reverse, Op::DropPrefix(2)]);
//! assert_eq!(decipher(&program, "abcdefg"), "edcba");
//! ```

pub mod cache;
pub mod engine;
pub mod error;
pub mod extract;
pub mod program;

pub use cache::ProgramCache;
pub use engine::CipherEngine;
pub use error::{Error, Result};
pub use extract::extract_transform_program;
pub use program::{decipher, Op, TransformProgram};
