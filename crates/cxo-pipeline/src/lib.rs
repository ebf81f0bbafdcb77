// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stage table and executor for CtxOpt compression pipelines.
//!
//! A pipeline is an ordered list of stage names selected by content tag.
//! The executor resolves each name through a [`StageResolver`] (in
//! production, the tool registry) and chains the blob through the stages.
//! A failing stage is recorded and bypassed — the next stage sees the
//! prior stage's output — so one bad stage never aborts the run.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use cxo_core::stats::TECHNIQUE_ERROR;
use cxo_core::{
    Blob, CancellationToken, CompressOptions, CompressedResult, CompressionStats, ContentTag,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Pipeline table
// ---------------------------------------------------------------------------

/// Ordered stage names for a content tag.
///
/// The table is part of the public contract; callers may only override it
/// by forcing a tag through `declared_type`.
#[must_use]
pub fn stages_for(tag: ContentTag) -> &'static [&'static str] {
    match tag {
        ContentTag::Build => &["analyze_build_output", "deduplicate_errors"],
        ContentTag::Logs => &["summarize_logs"],
        ContentTag::Stacktrace => &["deduplicate_errors", "semantic_compress"],
        ContentTag::Diff => &["diff_compress"],
        ContentTag::Config => &["compress_context"],
        ContentTag::Code | ContentTag::Generic => &["semantic_compress"],
    }
}

// ---------------------------------------------------------------------------
// Stage resolution
// ---------------------------------------------------------------------------

/// Resolves a stage name to an executable transformation.
///
/// Implemented by the tool registry; tests substitute lightweight fakes.
pub trait StageResolver {
    /// Whether a stage with this name exists.
    fn has_stage(&self, name: &str) -> bool;

    /// Execute the named stage against `blob` with the caller's options.
    ///
    /// Errors are returned as plain messages: the pipeline records them
    /// and moves on, so no structure is needed beyond the text.
    fn execute_stage(
        &self,
        name: &str,
        blob: &Blob,
        options: &CompressOptions,
        cancel: &CancellationToken,
    ) -> Result<CompressedResult, String>;
}

// ---------------------------------------------------------------------------
// Records & outcome
// ---------------------------------------------------------------------------

/// Accounting for one executed (or bypassed) stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StageRecord {
    /// Stage name from the pipeline table.
    pub stage: String,
    /// Stats for the stage. Failed stages carry identity counts with the
    /// `error` technique.
    pub stats: CompressionStats,
    /// Failure detail when the stage was bypassed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a full pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PipelineOutcome {
    /// The final blob after all executed stages.
    pub blob: Blob,
    /// Tag that selected the stage list.
    pub tag: ContentTag,
    /// Per-stage records, in execution order.
    pub stages: Vec<StageRecord>,
    /// Set when cancellation stopped the pipeline at a stage boundary;
    /// the blob holds the partial result computed so far.
    pub cancelled: bool,
}

impl PipelineOutcome {
    /// Combined stats across all successful stages.
    ///
    /// Takes the first stage's original counts and the last's compressed
    /// counts; the reduction percentage is recomputed, never averaged.
    /// `None` when no stage ran successfully.
    #[must_use]
    pub fn combined_stats(&self) -> Option<CompressionStats> {
        let mut successful = self.stages.iter().filter(|r| r.error.is_none());
        let first = successful.next()?.stats.clone();
        match successful.last() {
            Some(last) => Some(CompressionStats::chain(&first, &last.stats)),
            None => Some(first),
        }
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Run the pipeline selected by the blob's tag.
///
/// Empty input short-circuits to itself with no stages executed.
pub fn run(
    blob: &Blob,
    options: &CompressOptions,
    resolver: &dyn StageResolver,
    cancel: &CancellationToken,
) -> PipelineOutcome {
    let tag = cxo_detect::detect_blob(blob);

    if blob.text.is_empty() {
        return PipelineOutcome {
            blob: blob.clone(),
            tag,
            stages: Vec::new(),
            cancelled: false,
        };
    }

    let mut current = blob.clone();
    let mut stages = Vec::new();
    let mut cancelled = false;

    for &stage in stages_for(tag) {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }
        debug!(target: "cxo.pipeline", stage, tag = %tag, "executing stage");

        match resolver.execute_stage(stage, &current, options, cancel) {
            Ok(result) => {
                stages.push(StageRecord {
                    stage: stage.to_string(),
                    stats: result.stats,
                    error: None,
                });
                current = current.derive(result.text);
            }
            Err(message) => {
                warn!(target: "cxo.pipeline", stage, %message, "stage failed, bypassing");
                let lines = current.line_count();
                stages.push(StageRecord {
                    stage: stage.to_string(),
                    stats: CompressionStats::new(lines, lines, 0, 0, TECHNIQUE_ERROR),
                    error: Some(message),
                });
                // Next stage sees the prior blob untouched.
            }
        }
    }

    PipelineOutcome {
        blob: current,
        tag,
        stages,
        cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxo_core::CompressedResult;

    /// Fake resolver: `shrink` halves the text, `boom` always fails,
    /// anything else echoes the input.
    struct FakeResolver;

    impl StageResolver for FakeResolver {
        fn has_stage(&self, name: &str) -> bool {
            name != "missing"
        }

        fn execute_stage(
            &self,
            name: &str,
            blob: &Blob,
            _options: &CompressOptions,
            _cancel: &CancellationToken,
        ) -> Result<CompressedResult, String> {
            match name {
                "deduplicate_errors" => Err("boom".to_string()),
                _ => {
                    let half = blob.text.len() / 2;
                    let text: String = blob.text.chars().take(half.max(1)).collect();
                    let original = blob.text.len() as u64;
                    let compressed = text.len() as u64;
                    Ok(CompressedResult {
                        text,
                        stats: CompressionStats::new(
                            blob.line_count(),
                            1,
                            original,
                            compressed,
                            name,
                        ),
                    })
                }
            }
        }
    }

    #[test]
    fn table_matches_contract() {
        assert_eq!(
            stages_for(ContentTag::Build),
            ["analyze_build_output", "deduplicate_errors"]
        );
        assert_eq!(stages_for(ContentTag::Logs), ["summarize_logs"]);
        assert_eq!(
            stages_for(ContentTag::Stacktrace),
            ["deduplicate_errors", "semantic_compress"]
        );
        assert_eq!(stages_for(ContentTag::Diff), ["diff_compress"]);
        assert_eq!(stages_for(ContentTag::Config), ["compress_context"]);
        assert_eq!(stages_for(ContentTag::Code), ["semantic_compress"]);
        assert_eq!(stages_for(ContentTag::Generic), ["semantic_compress"]);
    }

    #[test]
    fn empty_input_short_circuits() {
        let outcome = run(&Blob::new(""), &CompressOptions::default(), &FakeResolver, &CancellationToken::new());
        assert!(outcome.stages.is_empty());
        assert!(!outcome.cancelled);
        assert_eq!(outcome.blob.text, "");
    }

    #[test]
    fn declared_type_selects_the_stage_list() {
        let blob = Blob::new("some generic prose here").with_declared_type(ContentTag::Logs);
        let outcome = run(&blob, &CompressOptions::default(), &FakeResolver, &CancellationToken::new());
        assert_eq!(outcome.tag, ContentTag::Logs);
        assert_eq!(outcome.stages.len(), 1);
        assert_eq!(outcome.stages[0].stage, "summarize_logs");
    }

    #[test]
    fn failed_stage_is_bypassed_not_fatal() {
        // Stacktrace pipeline: deduplicate_errors fails, semantic_compress
        // must still run against the untouched input.
        let blob = Blob::new("whatever text").with_declared_type(ContentTag::Stacktrace);
        let outcome = run(&blob, &CompressOptions::default(), &FakeResolver, &CancellationToken::new());
        assert_eq!(outcome.stages.len(), 2);
        assert_eq!(outcome.stages[0].error.as_deref(), Some("boom"));
        assert_eq!(outcome.stages[0].stats.technique, "error");
        assert!(outcome.stages[1].error.is_none());
        // Second stage halved the *original* text, not a failed result.
        assert_eq!(outcome.blob.text.len(), blob.text.len() / 2);
    }

    #[test]
    fn cancellation_stops_at_stage_boundary_with_partial_result() {
        let blob = Blob::new("whatever text").with_declared_type(ContentTag::Build);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = run(&blob, &CompressOptions::default(), &FakeResolver, &cancel);
        assert!(outcome.cancelled);
        assert!(outcome.stages.is_empty());
        assert_eq!(outcome.blob.text, blob.text);
    }

    #[test]
    fn combined_stats_chain_first_to_last() {
        let blob = Blob::new("0123456789abcdef").with_declared_type(ContentTag::Build);
        let outcome = run(&blob, &CompressOptions::default(), &FakeResolver, &CancellationToken::new());
        // analyze_build_output succeeded, deduplicate_errors failed.
        let combined = outcome.combined_stats().unwrap();
        assert_eq!(combined.original_tokens, 16);
        assert_eq!(combined.compressed_tokens, 8);
    }

    #[test]
    fn chained_stages_see_prior_output() {
        let blob = Blob::new("0123456789abcdef").with_declared_type(ContentTag::Code);
        let outcome = run(&blob, &CompressOptions::default(), &FakeResolver, &CancellationToken::new());
        assert_eq!(outcome.stages.len(), 1);
        assert_eq!(outcome.blob.text.len(), 8);
    }
}
