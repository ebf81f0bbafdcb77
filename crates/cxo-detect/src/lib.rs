// SPDX-License-Identifier: MIT OR Apache-2.0
//! Content-type detection for CtxOpt pipeline dispatch.
//!
//! [`detect`] classifies an opaque text blob into a [`ContentTag`]. The
//! decision order is fixed because the signals are not mutually exclusive
//! syntactically: diff → logs → build → stacktrace → config → code →
//! generic. Logs are checked before build output deliberately — a
//! timestamped build log is better served by log deduplication than by the
//! build parser.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use cxo_core::{Blob, ContentTag};
use regex::Regex;
use std::sync::LazyLock;

// ── Diff signals ────────────────────────────────────────────────────

static DIFF_GIT_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^diff --git ").expect("valid regex literal"));

static HUNK_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^@@ -\d+(,\d+)? \+\d+(,\d+)? @@").expect("valid regex literal"));

static OLD_FILE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^--- a/").expect("valid regex literal"));

static NEW_FILE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\+\+\+ b/").expect("valid regex literal"));

// ── Log signals ─────────────────────────────────────────────────────

static ISO_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}").expect("valid regex literal")
});

static BRACKETED_LEVEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(TRACE|DEBUG|INFO|WARN|WARNING|ERROR|FATAL)\]").expect("valid regex literal")
});

static LOGFMT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^.*time="[^"]*"\s+level="#).expect("valid regex literal"));

static JSON_LOG_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*\{"(level|time|timestamp|msg)":"#).expect("valid regex literal")
});

// ── Build-tool signals ──────────────────────────────────────────────

static BUILD_SIGNATURES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"error TS\d+:",
        r"error\[E\d+\]:",
        r"SyntaxError:",
        r"Cannot find module",
        r"npm ERR!",
        r"\(\d+,\d+\): error",
        r":\d+:\d+: error:",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex literal"))
    .collect()
});

// ── Stack-trace signals ─────────────────────────────────────────────

static ERROR_TYPE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:(?:[A-Za-z_][A-Za-z0-9_]*)?(?:Error|Exception)|panic):")
        .expect("valid regex literal")
});

static AT_FRAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s+at ").expect("valid regex literal"));

static PYTHON_TRACEBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Traceback \(most recent call last\):").expect("valid regex literal")
});

static RUST_PANIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^thread '[^']*' panicked at").expect("valid regex literal"));

// ── Config / code signals ───────────────────────────────────────────

static KEY_VALUE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*[A-Za-z0-9_."'\-]+\s*:\s+\S"#).expect("valid regex literal")
});

static LIST_ITEM_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*- \S").expect("valid regex literal"));

static CODE_OPENER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^\s*(import|export|const|function|class|def|from|fn|struct|impl|use|func|package|type)\b",
    )
    .expect("valid regex literal")
});

/// Classify a text blob.
///
/// Deterministic for identical input and insensitive to trailing
/// whitespace.
#[must_use]
pub fn detect(text: &str) -> ContentTag {
    let text = text.trim_end();
    if text.is_empty() {
        return ContentTag::Generic;
    }

    if is_diff(text) {
        return ContentTag::Diff;
    }
    if is_logs(text) {
        return ContentTag::Logs;
    }
    if is_build_output(text) {
        return ContentTag::Build;
    }
    if is_stacktrace(text) {
        return ContentTag::Stacktrace;
    }
    if is_config(text) {
        return ContentTag::Config;
    }
    if CODE_OPENER.is_match(text) {
        return ContentTag::Code;
    }
    ContentTag::Generic
}

/// Classify a [`Blob`], honoring a `declared_type` hint over detection.
#[must_use]
pub fn detect_blob(blob: &Blob) -> ContentTag {
    blob.hints.declared_type.unwrap_or_else(|| detect(&blob.text))
}

fn is_diff(text: &str) -> bool {
    DIFF_GIT_HEADER.is_match(text)
        || HUNK_HEADER.is_match(text)
        || OLD_FILE_MARKER.is_match(text)
        || NEW_FILE_MARKER.is_match(text)
}

fn is_logs(text: &str) -> bool {
    ISO_TIMESTAMP.is_match(text)
        || BRACKETED_LEVEL.is_match(text)
        || LOGFMT_LINE.is_match(text)
        || JSON_LOG_LINE.is_match(text)
}

fn is_build_output(text: &str) -> bool {
    BUILD_SIGNATURES.iter().any(|re| re.is_match(text))
}

fn is_stacktrace(text: &str) -> bool {
    if PYTHON_TRACEBACK.is_match(text) || RUST_PANIC.is_match(text) {
        return true;
    }
    ERROR_TYPE_PREFIX.is_match(text) && AT_FRAME.is_match(text)
}

fn is_config(text: &str) -> bool {
    let trimmed = text.trim_start();
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
    {
        return true;
    }
    let matching = text
        .lines()
        .take(10)
        .filter(|l| KEY_VALUE_LINE.is_match(l) || LIST_ITEM_LINE.is_match(l))
        .count();
    matching >= 3
}
