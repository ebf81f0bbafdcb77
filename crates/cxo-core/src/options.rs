// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared compressor options.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How aggressively a compressor collapses content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    /// Collapse everything, including singleton groups.
    Minimal,
    /// Balanced output.
    #[default]
    Normal,
    /// Keep singletons and full frame depth.
    Detailed,
}

/// Caller knobs shared by every compressor.
///
/// `preserve` entries are regular expressions; any line matching one is
/// copied to the output verbatim regardless of what the compressor would
/// otherwise decide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompressOptions {
    /// Output verbosity.
    #[serde(default)]
    pub detail: DetailLevel,
    /// Desired `compressed / original` token ratio, in `(0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ratio: Option<f64>,
    /// Token budget for budget-aware strategies (diff compression).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    /// Context lines kept around diff hunks.
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
    /// Regex patterns whose matching lines survive compression verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preserve: Vec<String>,
}

fn default_context_lines() -> usize {
    3
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            detail: DetailLevel::default(),
            target_ratio: None,
            max_tokens: None,
            context_lines: default_context_lines(),
            preserve: Vec::new(),
        }
    }
}

impl CompressOptions {
    /// Options with the given detail level, everything else default.
    #[must_use]
    pub fn with_detail(detail: DetailLevel) -> Self {
        Self {
            detail,
            ..Self::default()
        }
    }

    /// Set a token budget (builder pattern).
    #[must_use]
    pub fn max_tokens(mut self, budget: u64) -> Self {
        self.max_tokens = Some(budget);
        self
    }

    /// Set a target compression ratio (builder pattern).
    #[must_use]
    pub fn target_ratio(mut self, ratio: f64) -> Self {
        self.target_ratio = Some(ratio);
        self
    }
}
