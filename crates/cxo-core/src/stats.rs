// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compression accounting.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Technique label used when a compressor returns its input unchanged.
pub const TECHNIQUE_IDENTITY: &str = "identity";

/// Technique label recorded for a stage that failed and was bypassed.
pub const TECHNIQUE_ERROR: &str = "error";

/// Before/after line and token counts for one transformation.
///
/// Stats are monotone composable: chaining two stages combines the first's
/// `original_*` with the last's `compressed_*` and recomputes the
/// reduction; percentages are never averaged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompressionStats {
    /// Line count of the input.
    pub original_lines: u64,
    /// Line count of the output.
    pub compressed_lines: u64,
    /// Token count of the input.
    pub original_tokens: u64,
    /// Token count of the output.
    pub compressed_tokens: u64,
    /// `(1 - compressed/original) * 100`, clamped at 0.
    pub reduction_percent: f64,
    /// Name of the technique that produced the output.
    pub technique: String,
}

impl CompressionStats {
    /// Build stats from raw counts, computing the reduction percentage.
    #[must_use]
    pub fn new(
        original_lines: u64,
        compressed_lines: u64,
        original_tokens: u64,
        compressed_tokens: u64,
        technique: impl Into<String>,
    ) -> Self {
        Self {
            original_lines,
            compressed_lines,
            original_tokens,
            compressed_tokens,
            reduction_percent: reduction_percent(original_tokens, compressed_tokens),
            technique: technique.into(),
        }
    }

    /// Identity stats: nothing changed, zero reduction.
    #[must_use]
    pub fn identity(lines: u64, tokens: u64) -> Self {
        Self {
            original_lines: lines,
            compressed_lines: lines,
            original_tokens: tokens,
            compressed_tokens: tokens,
            reduction_percent: 0.0,
            technique: TECHNIQUE_IDENTITY.to_string(),
        }
    }

    /// Whether this stage returned its input unchanged.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.technique == TECHNIQUE_IDENTITY
    }

    /// Combine the stats of two chained stages.
    ///
    /// Takes the `original_*` counts of `first` and the `compressed_*`
    /// counts of `last`; the reduction is recomputed from those.
    #[must_use]
    pub fn chain(first: &Self, last: &Self) -> Self {
        Self {
            original_lines: first.original_lines,
            compressed_lines: last.compressed_lines,
            original_tokens: first.original_tokens,
            compressed_tokens: last.compressed_tokens,
            reduction_percent: reduction_percent(first.original_tokens, last.compressed_tokens),
            technique: format!("{}+{}", first.technique, last.technique),
        }
    }

    /// Tokens saved by this transformation.
    #[must_use]
    pub fn tokens_saved(&self) -> u64 {
        self.original_tokens.saturating_sub(self.compressed_tokens)
    }
}

/// Reduction percentage, clamped so expansion reports 0 rather than a
/// negative value.
fn reduction_percent(original: u64, compressed: u64) -> f64 {
    if original == 0 || compressed >= original {
        return 0.0;
    }
    (1.0 - compressed as f64 / original as f64) * 100.0
}

/// Output of one compressor invocation: the new text plus its stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompressedResult {
    /// The transformed text.
    pub text: String,
    /// Accounting for the transformation.
    pub stats: CompressionStats,
}

impl CompressedResult {
    /// An identity result wrapping the input unchanged.
    #[must_use]
    pub fn identity(text: impl Into<String>, lines: u64, tokens: u64) -> Self {
        Self {
            text: text.into(),
            stats: CompressionStats::identity(lines, tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduction_is_computed_from_tokens() {
        let s = CompressionStats::new(100, 10, 1000, 250, "log_dedupe");
        assert!((s.reduction_percent - 75.0).abs() < f64::EPSILON);
        assert_eq!(s.tokens_saved(), 750);
    }

    #[test]
    fn expansion_clamps_to_zero() {
        let s = CompressionStats::new(10, 12, 100, 140, "oops");
        assert_eq!(s.reduction_percent, 0.0);
        assert_eq!(s.tokens_saved(), 0);
    }

    #[test]
    fn zero_original_is_zero_reduction() {
        let s = CompressionStats::new(0, 0, 0, 0, "x");
        assert_eq!(s.reduction_percent, 0.0);
    }

    #[test]
    fn chain_takes_first_original_last_compressed() {
        let a = CompressionStats::new(100, 40, 1000, 400, "a");
        let b = CompressionStats::new(40, 10, 400, 100, "b");
        let c = CompressionStats::chain(&a, &b);
        assert_eq!(c.original_tokens, 1000);
        assert_eq!(c.compressed_tokens, 100);
        assert_eq!(c.original_lines, 100);
        assert_eq!(c.compressed_lines, 10);
        assert!((c.reduction_percent - 90.0).abs() < 1e-9);
        assert_eq!(c.technique, "a+b");
    }

    #[test]
    fn chain_never_averages_percentages() {
        // 50% then 50% must chain to 75%, not 50%.
        let a = CompressionStats::new(10, 5, 200, 100, "a");
        let b = CompressionStats::new(5, 3, 100, 50, "b");
        let c = CompressionStats::chain(&a, &b);
        assert!((c.reduction_percent - 75.0).abs() < 1e-9);
    }

    #[test]
    fn identity_round_trip() {
        let s = CompressionStats::identity(5, 42);
        assert!(s.is_identity());
        assert_eq!(s.reduction_percent, 0.0);
        assert_eq!(s.original_tokens, s.compressed_tokens);
    }
}
