// SPDX-License-Identifier: MIT OR Apache-2.0
//! Core value types for the CtxOpt context optimizer.
//!
//! Everything that flows through a compression pipeline is defined here:
//! [`Blob`] (the unit of work), [`ContentTag`] (the classification driving
//! pipeline selection), [`CompressionStats`] (before/after accounting), and
//! [`CompressOptions`] (caller knobs shared by every compressor).
//!
//! These are plain value types. They carry no behaviour beyond
//! construction, accounting arithmetic, and serde round-tripping; the
//! transformations themselves live in the sibling crates.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod blob;
pub mod cancel;
pub mod options;
pub mod stats;
pub mod tag;

pub use blob::{Blob, BlobHints};
pub use cancel::CancellationToken;
pub use options::{CompressOptions, DetailLevel};
pub use stats::{CompressedResult, CompressionStats};
pub use tag::ContentTag;
