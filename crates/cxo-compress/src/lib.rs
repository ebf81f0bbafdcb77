// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural compressors for the CtxOpt pipeline.
//!
//! Each compressor is an independently callable transformer satisfying one
//! capability shape: a name, the content tags it understands, a
//! `can_compress` probe, and `compress`. The family is indexed by name in
//! a [`CompressorRegistry`].
//!
//! Two rules bind every implementation:
//!
//! * stats come from the token oracle, computed on the actual input and
//!   output — never estimated;
//! * a compressor that would *expand* its input must return the input
//!   unchanged with the `identity` technique and zero reduction.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod diff;
pub mod logs;
pub mod semantic;
pub mod stack;

pub use config::ConfigCompact;
pub use diff::{parse_diff, DiffCompress, DiffFile, DiffHunk, DiffStatus, DiffStrategy};
pub use logs::LogDedupe;
pub use semantic::SemanticSelect;
pub use stack::StackDedupe;

use cxo_core::{Blob, CancellationToken, CompressOptions, CompressedResult, CompressionStats, ContentTag};
use regex::Regex;

/// Errors a compressor can surface.
#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    /// A `preserve` entry failed to compile as a regex.
    #[error("invalid preserve pattern `{pattern}`: {reason}")]
    InvalidPreservePattern {
        /// The offending pattern.
        pattern: String,
        /// Compiler detail.
        reason: String,
    },

    /// The input could not be parsed into the compressor's intermediate
    /// form (e.g. diff text with no hunks).
    #[error("input does not parse as {expected}")]
    UnparseableInput {
        /// What the compressor expected to find.
        expected: &'static str,
    },

    /// The operation was cancelled before completion.
    #[error("compression cancelled")]
    Cancelled,
}

/// Capability shape shared by every compressor.
pub trait Compressor: Send + Sync {
    /// Registry name (e.g. `"log_dedupe"`).
    fn name(&self) -> &'static str;

    /// Content tags this compressor is built for.
    fn content_types(&self) -> &'static [ContentTag];

    /// Cheap probe: is this blob worth handing to [`compress`](Self::compress)?
    fn can_compress(&self, blob: &Blob) -> bool;

    /// Transform the blob, producing new text plus accounting.
    fn compress(
        &self,
        blob: &Blob,
        options: &CompressOptions,
        cancel: &CancellationToken,
    ) -> Result<CompressedResult, CompressError>;
}

/// Name-indexed compressor family.
pub struct CompressorRegistry {
    compressors: Vec<Box<dyn Compressor>>,
}

impl CompressorRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            compressors: Vec::new(),
        }
    }

    /// Register a compressor under its own name.
    pub fn register(&mut self, compressor: impl Compressor + 'static) {
        self.compressors.push(Box::new(compressor));
    }

    /// Look up a compressor by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Compressor> {
        self.compressors
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    /// Compressors declaring support for the given tag, in registration
    /// order.
    #[must_use]
    pub fn for_tag(&self, tag: ContentTag) -> Vec<&dyn Compressor> {
        self.compressors
            .iter()
            .filter(|c| c.content_types().contains(&tag))
            .map(|c| c.as_ref())
            .collect()
    }

    /// Registered names.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.compressors.iter().map(|c| c.name()).collect()
    }
}

impl Default for CompressorRegistry {
    fn default() -> Self {
        default_registry()
    }
}

/// Registry with the built-in compressor family.
#[must_use]
pub fn default_registry() -> CompressorRegistry {
    let mut registry = CompressorRegistry::new();
    registry.register(LogDedupe);
    registry.register(StackDedupe);
    registry.register(DiffCompress);
    registry.register(SemanticSelect);
    registry.register(ConfigCompact);
    registry
}

/// Compile the caller's `preserve` patterns.
pub(crate) fn compile_preserve(options: &CompressOptions) -> Result<Vec<Regex>, CompressError> {
    options
        .preserve
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| CompressError::InvalidPreservePattern {
                pattern: p.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Whether a line matches any preserve pattern.
pub(crate) fn is_preserved(line: &str, preserve: &[Regex]) -> bool {
    preserve.iter().any(|re| re.is_match(line))
}

/// Wrap candidate output into a [`CompressedResult`], falling back to
/// identity when the candidate is not actually smaller.
pub(crate) fn finalize(blob: &Blob, candidate: String, technique: &str) -> CompressedResult {
    let original_lines = blob.line_count();
    let original_tokens = cxo_tokenizer::count(&blob.text);
    let compressed_tokens = cxo_tokenizer::count(&candidate);

    if compressed_tokens > original_tokens {
        tracing::debug!(
            target: "cxo.compress",
            technique,
            original_tokens,
            compressed_tokens,
            "candidate would expand input, returning identity"
        );
        return CompressedResult::identity(blob.text.clone(), original_lines, original_tokens);
    }

    let compressed_lines = if candidate.is_empty() {
        0
    } else {
        candidate.lines().count() as u64
    };
    CompressedResult {
        stats: CompressionStats::new(
            original_lines,
            compressed_lines,
            original_tokens,
            compressed_tokens,
            technique,
        ),
        text: candidate,
    }
}

/// Identity result for the blob as-is.
pub(crate) fn identity(blob: &Blob) -> CompressedResult {
    CompressedResult::identity(
        blob.text.clone(),
        blob.line_count(),
        cxo_tokenizer::count(&blob.text),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_the_full_family() {
        let registry = default_registry();
        assert_eq!(
            registry.names(),
            vec![
                "log_dedupe",
                "stack_dedupe",
                "diff_compress",
                "semantic_select",
                "config_compact"
            ]
        );
    }

    #[test]
    fn lookup_by_tag() {
        let registry = default_registry();
        let for_logs = registry.for_tag(ContentTag::Logs);
        assert!(for_logs.iter().any(|c| c.name() == "log_dedupe"));
        assert!(registry.get("log_dedupe").is_some());
        assert!(registry.get("zip").is_none());
    }

    #[test]
    fn invalid_preserve_pattern_is_reported() {
        let options = CompressOptions {
            preserve: vec!["[".into()],
            ..CompressOptions::default()
        };
        let err = compile_preserve(&options).unwrap_err();
        assert!(matches!(err, CompressError::InvalidPreservePattern { .. }));
    }

    #[test]
    fn finalize_falls_back_to_identity_on_expansion() {
        let blob = Blob::new("ab");
        let result = finalize(&blob, "a much longer replacement string".into(), "test");
        assert!(result.stats.is_identity());
        assert_eq!(result.text, "ab");
    }
}
