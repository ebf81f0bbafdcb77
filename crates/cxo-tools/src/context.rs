// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared state behind the tool registry, plus stage resolution.

use cxo_ast::FileStructure;
use cxo_build::ParserRegistry;
use cxo_cache::SmartCache;
use cxo_compress::{CompressError, Compressor, CompressorRegistry};
use cxo_core::stats::TECHNIQUE_IDENTITY;
use cxo_core::{
    Blob, CancellationToken, CompressOptions, CompressedResult, CompressionStats, ContentTag,
};
use cxo_pipeline::StageResolver;
use cxo_session::SessionTracker;
use std::path::PathBuf;
use std::time::Duration;

/// Default parse-cache capacity.
const PARSE_CACHE_CAPACITY: usize = 128;

/// Default parse-cache TTL.
const PARSE_CACHE_TTL: Duration = Duration::from_secs(300);

/// Stage names the resolver understands, in pipeline-table vocabulary.
pub const STAGE_NAMES: &[&str] = &[
    "analyze_build_output",
    "deduplicate_errors",
    "summarize_logs",
    "semantic_compress",
    "diff_compress",
    "compress_context",
];

/// Long-lived mutable roots and capability tables shared by every tool.
pub struct ToolContext {
    /// Per-session accumulators.
    pub sessions: SessionTracker,
    /// Memoized `FileStructure`s keyed by validated path.
    pub parse_cache: SmartCache<FileStructure>,
    /// The compressor family.
    pub compressors: CompressorRegistry,
    /// The build-parser family.
    pub parsers: ParserRegistry,
    /// Sandbox root for path validation.
    pub working_dir: PathBuf,
    /// TTL applied to parse-cache entries.
    pub cache_ttl: Duration,
}

impl ToolContext {
    /// Context with default capacity and the built-in families.
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions: SessionTracker::new(),
            parse_cache: SmartCache::new(PARSE_CACHE_CAPACITY),
            compressors: cxo_compress::default_registry(),
            parsers: cxo_build::default_registry(),
            working_dir: working_dir.into(),
            cache_ttl: PARSE_CACHE_TTL,
        }
    }

    fn compressor(&self, name: &str) -> Result<&dyn Compressor, String> {
        self.compressors
            .get(name)
            .ok_or_else(|| format!("compressor `{name}` not registered"))
    }

    /// Re-emit recognized diagnostics, dropping surrounding build noise.
    ///
    /// The output keeps the raw diagnostic lines, so a later
    /// `deduplicate_errors` stage can parse them again.
    pub(crate) fn analyze_build_output(
        &self,
        blob: &Blob,
        _cancel: &CancellationToken,
    ) -> Result<CompressedResult, String> {
        if !self.parsers.can_parse(&blob.text) {
            return Err("no build parser recognizes this output".to_string());
        }
        let errors = self.parsers.parse(&blob.text);
        if errors.is_empty() {
            return Err("build output contained no diagnostics".to_string());
        }
        let text: String = errors
            .iter()
            .map(|e| e.raw.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(stage_result(blob, text, "analyze_build_output"))
    }

    /// Group diagnostics by signature, or fold repeated stack traces.
    pub(crate) fn deduplicate_errors(
        &self,
        blob: &Blob,
        options: &CompressOptions,
        cancel: &CancellationToken,
    ) -> Result<CompressedResult, String> {
        if self.parsers.can_parse(&blob.text) {
            let errors = self.parsers.parse(&blob.text);
            if !errors.is_empty() {
                let groups = cxo_build::group_errors(&errors);
                let text = cxo_build::render_groups(&groups);
                // Grouping is kept even when a tiny input renders larger:
                // the deduplicated structure is the point of this stage.
                return Ok(structured_result(blob, text, "deduplicate_errors"));
            }
        }
        // Not build output; fall through to stack-trace folding.
        self.compressor("stack_dedupe")?
            .compress(blob, options, cancel)
            .map_err(stage_error)
    }

    /// Config-aware compaction for the `compress_context` stage.
    pub(crate) fn compress_context_stage(
        &self,
        blob: &Blob,
        options: &CompressOptions,
        cancel: &CancellationToken,
    ) -> Result<CompressedResult, String> {
        let name = if cxo_detect::detect(&blob.text) == ContentTag::Config {
            "config_compact"
        } else {
            "semantic_select"
        };
        self.compressor(name)?
            .compress(blob, options, cancel)
            .map_err(stage_error)
    }
}

impl StageResolver for ToolContext {
    fn has_stage(&self, name: &str) -> bool {
        STAGE_NAMES.contains(&name)
    }

    fn execute_stage(
        &self,
        name: &str,
        blob: &Blob,
        options: &CompressOptions,
        cancel: &CancellationToken,
    ) -> Result<CompressedResult, String> {
        match name {
            "analyze_build_output" => self.analyze_build_output(blob, cancel),
            "deduplicate_errors" => self.deduplicate_errors(blob, options, cancel),
            "summarize_logs" => self
                .compressor("log_dedupe")?
                .compress(blob, options, cancel)
                .map_err(stage_error),
            "semantic_compress" => self
                .compressor("semantic_select")?
                .compress(blob, options, cancel)
                .map_err(stage_error),
            "diff_compress" => self
                .compressor("diff_compress")?
                .compress(blob, options, cancel)
                .map_err(stage_error),
            "compress_context" => self.compress_context_stage(blob, options, cancel),
            other => Err(format!("unknown stage `{other}`")),
        }
    }
}

fn stage_error(error: CompressError) -> String {
    error.to_string()
}

/// Stats for a stage whose output is a restructuring rather than a strict
/// shrink. Reduction clamps at zero; the text is kept as produced.
fn structured_result(blob: &Blob, text: String, technique: &str) -> CompressedResult {
    let compressed_lines = if text.is_empty() {
        0
    } else {
        text.lines().count() as u64
    };
    CompressedResult {
        stats: CompressionStats::new(
            blob.line_count(),
            compressed_lines,
            cxo_tokenizer::count(&blob.text),
            cxo_tokenizer::count(&text),
            technique,
        ),
        text,
    }
}

/// Stats-bearing result for a stage that produced `text` from `blob`,
/// falling back to identity when the candidate is larger.
fn stage_result(blob: &Blob, text: String, technique: &str) -> CompressedResult {
    let original_lines = blob.line_count();
    let original_tokens = cxo_tokenizer::count(&blob.text);
    let compressed_tokens = cxo_tokenizer::count(&text);
    if compressed_tokens > original_tokens {
        return CompressedResult {
            text: blob.text.clone(),
            stats: CompressionStats::new(
                original_lines,
                original_lines,
                original_tokens,
                original_tokens,
                TECHNIQUE_IDENTITY,
            ),
        };
    }
    let compressed_lines = if text.is_empty() {
        0
    } else {
        text.lines().count() as u64
    };
    CompressedResult {
        stats: CompressionStats::new(
            original_lines,
            compressed_lines,
            original_tokens,
            compressed_tokens,
            technique,
        ),
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS_BUILD: &str = "src/a.ts(12,5): error TS2304: Cannot find name 'foo'.\nsrc/b.ts(3,1): error TS2304: Cannot find name 'bar'.";

    fn context() -> ToolContext {
        ToolContext::new("/work")
    }

    #[test]
    fn all_table_stages_resolve() {
        let ctx = context();
        for tag in ContentTag::ALL {
            for stage in cxo_pipeline::stages_for(tag) {
                assert!(ctx.has_stage(stage), "missing stage {stage}");
            }
        }
    }

    #[test]
    fn analyze_then_deduplicate_chains() {
        let ctx = context();
        let cancel = CancellationToken::new();
        let blob = Blob::new(TS_BUILD);

        let analyzed = ctx.execute_stage("analyze_build_output", &blob, &CompressOptions::default(), &cancel)
            .unwrap();
        let deduped = ctx
            .execute_stage(
                "deduplicate_errors",
                &blob.derive(analyzed.text),
                &CompressOptions::default(),
                &cancel,
            )
            .unwrap();
        assert!(deduped.text.contains("[2x] error TS2304"));
        assert!(deduped.text.contains("foo"));
    }

    #[test]
    fn deduplicate_handles_stack_traces_too() {
        let ctx = context();
        let cancel = CancellationToken::new();
        let trace = "TypeError: boom\n    at f (a.js:1:1)";
        let blob = Blob::new(format!("{trace}\n{trace}"));
        let result = ctx
            .execute_stage("deduplicate_errors", &blob, &CompressOptions::default(), &cancel)
            .unwrap();
        assert!(result.text.contains("[repeated 2x]"));
    }

    #[test]
    fn compress_context_routes_config_to_compaction() {
        let ctx = context();
        let cancel = CancellationToken::new();
        let blob = Blob::new("{\n  \"a\": 1,\n  \"b\": 2\n}");
        let result = ctx
            .execute_stage("compress_context", &blob, &CompressOptions::default(), &cancel)
            .unwrap();
        assert_eq!(result.text, r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn unknown_stage_is_an_error() {
        let ctx = context();
        let err = ctx
            .execute_stage(
                "transmogrify",
                &Blob::new("x"),
                &CompressOptions::default(),
                &CancellationToken::new(),
            )
            .unwrap_err();
        assert!(err.contains("unknown stage"));
    }

    #[test]
    fn non_build_input_fails_analyze_stage() {
        let ctx = context();
        let err = ctx
            .execute_stage(
                "analyze_build_output",
                &Blob::new("hello world"),
                &CompressOptions::default(),
                &CancellationToken::new(),
            )
            .unwrap_err();
        assert!(err.contains("no build parser"));
    }
}
