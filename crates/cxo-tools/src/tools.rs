// SPDX-License-Identifier: MIT OR Apache-2.0
//! The built-in tool set.

use crate::context::ToolContext;
use crate::ToolSpec;
use cxo_ast::{ExtractOptions, ExtractTarget, ElementKind, FileStructure};
use cxo_compress::{CompressError, Compressor, DiffCompress, DiffStrategy};
use cxo_core::{Blob, CancellationToken, CompressOptions, ContentTag, DetailLevel};
use cxo_error::{CxoError, ErrorCode};
use cxo_path::{PathError, ValidatedPath};
use schemars::JsonSchema;
use serde::Deserialize;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Argument shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct CompressContextArgs {
    /// The text to optimize.
    text: String,
    /// Force a content type instead of detection.
    #[serde(default, rename = "type")]
    content_type: Option<String>,
    /// Output verbosity.
    #[serde(default)]
    detail: Option<DetailLevel>,
    /// Desired compressed/original token ratio.
    #[serde(default)]
    target_ratio: Option<f64>,
    /// Token budget for budget-aware stages.
    #[serde(default)]
    max_tokens: Option<u64>,
    /// Regex patterns whose matching lines survive verbatim.
    #[serde(default)]
    preserve: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct TextArgs {
    /// The text to process.
    text: String,
    /// Output verbosity.
    #[serde(default)]
    detail: Option<DetailLevel>,
    /// Regex patterns whose matching lines survive verbatim.
    #[serde(default)]
    preserve: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct SemanticArgs {
    /// The text to compress.
    text: String,
    /// Desired compressed/original token ratio.
    #[serde(default)]
    target_ratio: Option<f64>,
    /// Regex patterns whose matching lines survive verbatim.
    #[serde(default)]
    preserve: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct DiffArgs {
    /// Unified diff text.
    text: String,
    /// Token budget for strategy auto-selection.
    #[serde(default)]
    max_tokens: Option<u64>,
    /// Explicit strategy override.
    #[serde(default)]
    strategy: Option<DiffStrategy>,
    /// Context lines kept around changes.
    #[serde(default)]
    context_lines: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SourceArgs {
    /// Path to a source file inside the working directory.
    #[serde(default)]
    path: Option<String>,
    /// Inline source text (alternative to `path`).
    #[serde(default)]
    content: Option<String>,
    /// Source language; inferred from the path extension when absent.
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchArgs {
    #[serde(flatten)]
    source: SourceArgs,
    /// Case-insensitive substring query.
    query: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ExtractArgs {
    #[serde(flatten)]
    source: SourceArgs,
    /// Kind of element to extract.
    kind: ElementKind,
    /// Declared name of the element.
    name: String,
    /// Extend the span through the adjacent documentation block.
    #[serde(default)]
    include_comments: bool,
    /// Append the import lines the element references.
    #[serde(default)]
    include_imports: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct StatsArgs {
    /// Return the compact view instead of the full one.
    #[serde(default)]
    brief: bool,
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn invalid_args(err: serde_json::Error) -> CxoError {
    CxoError::new(ErrorCode::InvalidArgs, err.to_string())
}

fn from_compress(err: CompressError) -> CxoError {
    match &err {
        CompressError::InvalidPreservePattern { .. } => {
            CxoError::new(ErrorCode::PatternInvalid, err.to_string())
        }
        CompressError::UnparseableInput { .. } => {
            CxoError::new(ErrorCode::ParseFailed, err.to_string())
        }
        CompressError::Cancelled => CxoError::new(ErrorCode::Cancelled, err.to_string()),
    }
}

fn from_path(err: PathError) -> CxoError {
    match &err {
        PathError::OutsideSandbox { .. } | PathError::Blocked { .. } => {
            CxoError::new(ErrorCode::PathValidation, err.to_string())
        }
        PathError::PatternNotAllowed { .. } | PathError::PatternInvalid { .. } => {
            CxoError::new(ErrorCode::PatternInvalid, err.to_string())
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(args: &serde_json::Value) -> Result<T, CxoError> {
    serde_json::from_value(args.clone()).map_err(invalid_args)
}

// ---------------------------------------------------------------------------
// Source resolution
// ---------------------------------------------------------------------------

fn language_for_extension(extension: &str) -> &str {
    match extension {
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "py" => "python",
        "php" => "php",
        other => other,
    }
}

/// Resolve a source argument pair into (content, language, validated path).
fn resolve_source(
    context: &ToolContext,
    source: &SourceArgs,
) -> Result<(String, String, Option<ValidatedPath>), CxoError> {
    if let Some(content) = &source.content {
        let language = source.language.clone().unwrap_or_else(|| "typescript".into());
        return Ok((content.clone(), language, None));
    }
    let Some(path) = &source.path else {
        return Err(CxoError::new(
            ErrorCode::InvalidArgs,
            "either `path` or `content` is required",
        ));
    };
    let validated = cxo_path::validate_path(path, &context.working_dir).map_err(from_path)?;
    let content = cxo_path::read_validated(&validated).map_err(|e| {
        CxoError::new(ErrorCode::InternalError, format!("read failed: {e}")).with_source(e)
    })?;
    let language = source.language.clone().unwrap_or_else(|| {
        let extension = validated
            .as_path()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        language_for_extension(extension).to_string()
    });
    Ok((content, language, Some(validated)))
}

/// Parse with path-keyed memoization; inline content skips the cache.
fn parse_cached(
    context: &ToolContext,
    validated: Option<&ValidatedPath>,
    content: &str,
    language: &str,
) -> FileStructure {
    let Some(validated) = validated else {
        return cxo_ast::parse(content, language);
    };
    let key = format!("parse:{language}:{validated}");
    if let Some(structure) = context.parse_cache.get(&key) {
        return structure;
    }
    let structure = cxo_ast::parse(content, language);
    context.parse_cache.put(
        key,
        structure.clone(),
        &[validated.as_path().to_path_buf()],
        context.cache_ttl,
    );
    structure
}

fn compressor<'a>(
    context: &'a ToolContext,
    name: &str,
) -> Result<&'a dyn Compressor, CxoError> {
    context.compressors.get(name).ok_or_else(|| {
        CxoError::new(
            ErrorCode::InternalError,
            format!("compressor `{name}` not registered"),
        )
    })
}

// ---------------------------------------------------------------------------
// Executors
// ---------------------------------------------------------------------------

fn compress_context(
    context: &ToolContext,
    session_id: &str,
    args: &serde_json::Value,
    cancel: &CancellationToken,
) -> Result<String, CxoError> {
    let args: CompressContextArgs = parse_args(args)?;

    let mut blob = Blob::new(&args.text);
    if let Some(type_name) = &args.content_type {
        let tag = ContentTag::from_str(type_name)
            .map_err(|e| CxoError::new(ErrorCode::InvalidArgs, e.to_string()))?;
        blob = blob.with_declared_type(tag);
    }
    let mut options = CompressOptions {
        detail: args.detail.unwrap_or_default(),
        target_ratio: args.target_ratio,
        max_tokens: args.max_tokens,
        preserve: args.preserve,
        ..CompressOptions::default()
    };
    options.target_ratio = options.target_ratio.filter(|r| *r > 0.0 && *r <= 1.0);

    let outcome = cxo_pipeline::run(&blob, &options, context, cancel);
    if outcome.cancelled {
        return Err(CxoError::new(
            ErrorCode::Cancelled,
            "pipeline cancelled at a stage boundary",
        )
        .with_context("completed_stages", outcome.stages.len()));
    }

    // Build-tagged input contributes its signatures to the session.
    if outcome.tag == ContentTag::Build {
        let signatures: Vec<String> = context
            .parsers
            .parse(&args.text)
            .into_iter()
            .map(|e| e.signature)
            .collect();
        context.sessions.note_signatures(session_id, signatures);
    }

    Ok(outcome.blob.text)
}

fn summarize_logs(
    context: &ToolContext,
    _session_id: &str,
    args: &serde_json::Value,
    cancel: &CancellationToken,
) -> Result<String, CxoError> {
    let args: TextArgs = parse_args(args)?;
    let options = CompressOptions {
        detail: args.detail.unwrap_or_default(),
        preserve: args.preserve,
        ..CompressOptions::default()
    };
    compressor(context, "log_dedupe")?
        .compress(&Blob::new(&args.text), &options, cancel)
        .map(|r| r.text)
        .map_err(from_compress)
}

fn analyze_build_output(
    context: &ToolContext,
    session_id: &str,
    args: &serde_json::Value,
    cancel: &CancellationToken,
) -> Result<String, CxoError> {
    let args: TextArgs = parse_args(args)?;
    let blob = Blob::new(&args.text);
    let errors = context.parsers.parse(&args.text);
    context
        .sessions
        .note_signatures(session_id, errors.iter().map(|e| e.signature.clone()));
    context
        .analyze_build_output(&blob, cancel)
        .map(|r| r.text)
        .map_err(|message| CxoError::new(ErrorCode::ParseFailed, message))
}

fn deduplicate_errors(
    context: &ToolContext,
    session_id: &str,
    args: &serde_json::Value,
    cancel: &CancellationToken,
) -> Result<String, CxoError> {
    let args: TextArgs = parse_args(args)?;
    let blob = Blob::new(&args.text);
    let options = CompressOptions {
        detail: args.detail.unwrap_or_default(),
        preserve: args.preserve,
        ..CompressOptions::default()
    };
    let errors = context.parsers.parse(&args.text);
    context
        .sessions
        .note_signatures(session_id, errors.iter().map(|e| e.signature.clone()));
    context
        .deduplicate_errors(&blob, &options, cancel)
        .map(|r| r.text)
        .map_err(|message| CxoError::new(ErrorCode::ParseFailed, message))
}

fn semantic_compress(
    context: &ToolContext,
    _session_id: &str,
    args: &serde_json::Value,
    cancel: &CancellationToken,
) -> Result<String, CxoError> {
    let args: SemanticArgs = parse_args(args)?;
    let options = CompressOptions {
        target_ratio: args.target_ratio.filter(|r| *r > 0.0 && *r <= 1.0),
        preserve: args.preserve,
        ..CompressOptions::default()
    };
    compressor(context, "semantic_select")?
        .compress(&Blob::new(&args.text), &options, cancel)
        .map(|r| r.text)
        .map_err(from_compress)
}

fn diff_compress(
    _context: &ToolContext,
    _session_id: &str,
    args: &serde_json::Value,
    cancel: &CancellationToken,
) -> Result<String, CxoError> {
    let args: DiffArgs = parse_args(args)?;
    let mut options = CompressOptions::default();
    options.max_tokens = args.max_tokens;
    if let Some(context_lines) = args.context_lines {
        options.context_lines = context_lines;
    }
    DiffCompress
        .compress_with_strategy(
            &Blob::new(&args.text),
            &options,
            args.strategy.unwrap_or_default(),
            cancel,
        )
        .map(|r| r.text)
        .map_err(from_compress)
}

fn parse_file(
    context: &ToolContext,
    _session_id: &str,
    args: &serde_json::Value,
    _cancel: &CancellationToken,
) -> Result<String, CxoError> {
    let args: SourceArgs = parse_args(args)?;
    let (content, language, validated) = resolve_source(context, &args)?;
    let structure = parse_cached(context, validated.as_ref(), &content, &language);
    serde_json::to_string_pretty(&structure)
        .map_err(|e| CxoError::new(ErrorCode::InternalError, e.to_string()))
}

fn search_code(
    context: &ToolContext,
    _session_id: &str,
    args: &serde_json::Value,
    _cancel: &CancellationToken,
) -> Result<String, CxoError> {
    let args: SearchArgs = parse_args(args)?;
    let (content, language, validated) = resolve_source(context, &args.source)?;
    let structure = parse_cached(context, validated.as_ref(), &content, &language);
    let matches = cxo_ast::search_structure(&structure, &args.query);
    serde_json::to_string_pretty(&matches)
        .map_err(|e| CxoError::new(ErrorCode::InternalError, e.to_string()))
}

fn extract_code(
    context: &ToolContext,
    _session_id: &str,
    args: &serde_json::Value,
    _cancel: &CancellationToken,
) -> Result<String, CxoError> {
    let args: ExtractArgs = parse_args(args)?;
    let (content, language, _validated) = resolve_source(context, &args.source)?;
    let registry = cxo_ast::default_registry();
    let Some(analyzer) = registry.resolve(&language) else {
        return Err(CxoError::new(
            ErrorCode::ParseFailed,
            format!("no analyzer for language `{language}`"),
        ));
    };
    let target = ExtractTarget {
        kind: args.kind,
        name: args.name.clone(),
    };
    let options = ExtractOptions {
        include_comments: args.include_comments,
        include_imports: args.include_imports,
    };
    let Some(extracted) = cxo_ast::extract(&content, analyzer, &target, &options) else {
        return Err(CxoError::new(
            ErrorCode::InvalidArgs,
            format!("no {:?} named `{}` found", args.kind, args.name),
        )
        .with_context("name", &args.name));
    };

    let mut out = String::new();
    if !extracted.imports.is_empty() {
        out.push_str(&extracted.imports.join("\n"));
        out.push_str("\n\n");
    }
    out.push_str(&extracted.text);
    Ok(out)
}

fn get_session_stats(
    context: &ToolContext,
    session_id: &str,
    args: &serde_json::Value,
    _cancel: &CancellationToken,
) -> Result<String, CxoError> {
    let args: StatsArgs = parse_args(args)?;
    context.sessions.begin(session_id);
    let text = if args.brief {
        serde_json::to_string_pretty(&context.sessions.brief_stats(session_id))
    } else {
        serde_json::to_string_pretty(&context.sessions.stats(session_id))
    };
    text.map_err(|e| CxoError::new(ErrorCode::InternalError, e.to_string()))
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// The built-in tool set, in registration order.
pub(crate) fn default_tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new::<CompressContextArgs>(
            "compress_context",
            "Detect the content type and run the full compression pipeline",
            Box::new(compress_context),
        ),
        ToolSpec::new::<TextArgs>(
            "summarize_logs",
            "Deduplicate repeated log lines into counted groups",
            Box::new(summarize_logs),
        ),
        ToolSpec::new::<TextArgs>(
            "analyze_build_output",
            "Extract structured diagnostics from compiler output",
            Box::new(analyze_build_output),
        ),
        ToolSpec::new::<TextArgs>(
            "deduplicate_errors",
            "Group diagnostics by signature, or fold repeated stack traces",
            Box::new(deduplicate_errors),
        ),
        ToolSpec::new::<SemanticArgs>(
            "semantic_compress",
            "Keep the highest-information lines under a target ratio",
            Box::new(semantic_compress),
        ),
        ToolSpec::new::<DiffArgs>(
            "diff_compress",
            "Compress a unified diff by hunks, summary, or semantic selection",
            Box::new(diff_compress),
        ),
        ToolSpec::new::<SourceArgs>(
            "parse_file",
            "Parse a source file into its uniform structure",
            Box::new(parse_file),
        ),
        ToolSpec::new::<SearchArgs>(
            "search_code",
            "Search parsed structure by name, signature, docs, and decorators",
            Box::new(search_code),
        ),
        ToolSpec::new::<ExtractArgs>(
            "extract_code",
            "Extract a named element with optional docs and referenced imports",
            Box::new(extract_code),
        ),
        ToolSpec::new::<StatsArgs>(
            "get_session_stats",
            "Session token accounting and command history",
            Box::new(get_session_stats),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ToolRegistry, ToolRequest, ToolResponse};

    fn registry_at(dir: &std::path::Path) -> ToolRegistry {
        ToolRegistry::with_defaults(ToolContext::new(dir))
    }

    fn call(registry: &ToolRegistry, tool: &str, args: serde_json::Value) -> ToolResponse {
        registry.invoke(
            &ToolRequest {
                tool: tool.to_string(),
                args,
                session_id: "s".to_string(),
            },
            &CancellationToken::new(),
        )
    }

    #[test]
    fn compress_context_runs_the_build_pipeline() {
        let registry = registry_at(std::path::Path::new("/work"));
        let text = "src/a.ts(12,5): error TS2304: Cannot find name 'foo'.\nsrc/b.ts(3,1): error TS2304: Cannot find name 'bar'.";
        let response = call(&registry, "compress_context", serde_json::json!({ "text": text }));
        let out = response.text().expect("success");
        assert!(out.contains("[2x] error TS2304"));
        assert!(out.contains("foo"));

        let stats = registry.context().sessions.stats("s").unwrap();
        assert_eq!(stats.unique_error_signatures, 1);
    }

    #[test]
    fn compress_context_rejects_unknown_type() {
        let registry = registry_at(std::path::Path::new("/work"));
        let response = call(
            &registry,
            "compress_context",
            serde_json::json!({ "text": "x", "type": "markdown" }),
        );
        match response {
            ToolResponse::Failure { error } => assert_eq!(error.code, ErrorCode::InvalidArgs),
            ToolResponse::Success { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn missing_required_args_fail_validation() {
        let registry = registry_at(std::path::Path::new("/work"));
        let response = call(&registry, "summarize_logs", serde_json::json!({}));
        match response {
            ToolResponse::Failure { error } => assert_eq!(error.code, ErrorCode::InvalidArgs),
            ToolResponse::Success { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn invalid_preserve_pattern_maps_to_pattern_invalid() {
        let registry = registry_at(std::path::Path::new("/work"));
        let response = call(
            &registry,
            "summarize_logs",
            serde_json::json!({ "text": "[INFO] a", "preserve": ["["] }),
        );
        match response {
            ToolResponse::Failure { error } => assert_eq!(error.code, ErrorCode::PatternInvalid),
            ToolResponse::Success { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn path_escape_maps_to_path_validation() {
        let registry = registry_at(std::path::Path::new("/work"));
        let response = call(
            &registry,
            "parse_file",
            serde_json::json!({ "path": "../../etc/passwd" }),
        );
        match response {
            ToolResponse::Failure { error } => assert_eq!(error.code, ErrorCode::PathValidation),
            ToolResponse::Success { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn parse_file_reads_validates_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("app.ts"),
            "export function main(): void {\n}\n",
        )
        .unwrap();
        let registry = registry_at(dir.path());

        let response = call(&registry, "parse_file", serde_json::json!({ "path": "app.ts" }));
        let out = response.text().expect("success");
        assert!(out.contains("\"main\""));

        // Second call hits the parse cache.
        let _ = call(&registry, "parse_file", serde_json::json!({ "path": "app.ts" }));
        assert!(registry.context().parse_cache.stats().hits >= 1);
    }

    #[test]
    fn extract_code_returns_referenced_imports_only() {
        let registry = registry_at(std::path::Path::new("/work"));
        let content = "import { A } from './a';\nimport { B } from './b';\n\nexport function f() {\n  return A();\n}\n";
        let response = call(
            &registry,
            "extract_code",
            serde_json::json!({
                "content": content,
                "language": "typescript",
                "kind": "function",
                "name": "f",
                "include_imports": true
            }),
        );
        let out = response.text().expect("success");
        assert!(out.contains("import { A } from './a';"));
        assert!(!out.contains("'./b'"));
        assert!(out.contains("return A();"));
    }

    #[test]
    fn extract_code_missing_element_is_invalid_args() {
        let registry = registry_at(std::path::Path::new("/work"));
        let response = call(
            &registry,
            "extract_code",
            serde_json::json!({
                "content": "export function g() {}\n",
                "language": "typescript",
                "kind": "function",
                "name": "missing"
            }),
        );
        match response {
            ToolResponse::Failure { error } => assert_eq!(error.code, ErrorCode::InvalidArgs),
            ToolResponse::Success { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn session_stats_round_trip() {
        let registry = registry_at(std::path::Path::new("/work"));
        let _ = call(
            &registry,
            "summarize_logs",
            serde_json::json!({ "text": "[INFO] a\n[INFO] a\n[INFO] a" }),
        );
        let response = call(&registry, "get_session_stats", serde_json::json!({}));
        let out = response.text().expect("success");
        assert!(out.contains("\"command_count\": 1"));

        let brief = call(&registry, "get_session_stats", serde_json::json!({ "brief": true }));
        assert!(brief.text().unwrap().contains("\"top_tool\""));
    }

    #[test]
    fn cancelled_pipeline_surfaces_cancelled_code() {
        let registry = registry_at(std::path::Path::new("/work"));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let response = registry.invoke(
            &ToolRequest {
                tool: "compress_context".to_string(),
                args: serde_json::json!({ "text": "fn main() {}\nfn other() {}" }),
                session_id: "s".to_string(),
            },
            &cancel,
        );
        match response {
            ToolResponse::Failure { error } => assert_eq!(error.code, ErrorCode::Cancelled),
            ToolResponse::Success { .. } => panic!("expected failure"),
        }
    }
}
