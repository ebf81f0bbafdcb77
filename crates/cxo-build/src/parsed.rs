// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structured build errors and signature normalization.

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Diagnostic severity, ordered most severe first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Compilation failed.
    Error,
    /// Suspicious but not fatal.
    Warning,
    /// Informational note.
    Info,
}

impl Severity {
    /// Parse a severity word as emitted by build tools.
    #[must_use]
    pub fn from_word(word: &str) -> Self {
        match word {
            "error" => Self::Error,
            "warning" | "warn" => Self::Warning,
            _ => Self::Info,
        }
    }
}

/// One structured diagnostic extracted from build output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ParsedError {
    /// Canonical grouping key: `{code}:{normalized message}`.
    pub signature: String,
    /// Tool-specific diagnostic code (e.g. `TS2304`, `E0308`).
    pub code: String,
    /// The raw diagnostic message.
    pub message: String,
    /// Source file the diagnostic points at, when known.
    pub file: String,
    /// 1-based line, 0 when unknown.
    pub line: u32,
    /// 1-based column, 0 when unknown.
    pub column: u32,
    /// Diagnostic severity.
    pub severity: Severity,
    /// The raw output line the diagnostic was parsed from.
    pub raw: String,
    /// Trailing context lines (e.g. a rustc span), when captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl ParsedError {
    /// Build a diagnostic, deriving its signature from code and message.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        file: impl Into<String>,
        line: u32,
        column: u32,
        severity: Severity,
        raw: impl Into<String>,
    ) -> Self {
        let code = code.into();
        let message = message.into();
        Self {
            signature: signature(&code, &message),
            code,
            message,
            file: file.into(),
            line,
            column,
            severity,
            raw: raw.into(),
            context: None,
        }
    }
}

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'[^']*'|"[^"]*"|`[^`]*`"#).expect("valid regex literal"));

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid regex literal"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex literal"));

/// Normalize a diagnostic message for grouping.
///
/// Quoted spans collapse to `'X'`, digit runs to `N`, whitespace runs to a
/// single space. Two diagnostics that differ only in identifier names or
/// literal values normalize identically.
#[must_use]
pub fn normalize_message(message: &str) -> String {
    let s = QUOTED.replace_all(message, "'X'");
    let s = DIGIT_RUN.replace_all(&s, "N");
    let s = WHITESPACE_RUN.replace_all(&s, " ");
    s.trim().to_string()
}

/// Canonical grouping key for a diagnostic.
#[must_use]
pub fn signature(code: &str, message: &str) -> String {
    format!("{code}:{}", normalize_message(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_identifiers_collapse() {
        assert_eq!(
            normalize_message("Cannot find name 'foo'."),
            "Cannot find name 'X'."
        );
        assert_eq!(
            normalize_message("Cannot find name \"bar\"."),
            "Cannot find name 'X'."
        );
        assert_eq!(
            normalize_message("unknown field `baz`"),
            "unknown field 'X'"
        );
    }

    #[test]
    fn digit_runs_collapse() {
        assert_eq!(
            normalize_message("expected 3 arguments, got 17"),
            "expected N arguments, got N"
        );
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(normalize_message("  a   b\t c  "), "a b c");
    }

    #[test]
    fn signatures_equal_iff_normalized_pairs_equal() {
        let a = ParsedError::new(
            "TS2304",
            "Cannot find name 'foo'.",
            "src/a.ts",
            12,
            5,
            Severity::Error,
            "raw-a",
        );
        let b = ParsedError::new(
            "TS2304",
            "Cannot find name 'bar'.",
            "src/b.ts",
            3,
            1,
            Severity::Error,
            "raw-b",
        );
        assert_eq!(a.signature, b.signature);
        assert_eq!(a.signature, "TS2304:Cannot find name 'X'.");

        let c = ParsedError::new(
            "TS2339",
            "Cannot find name 'foo'.",
            "src/a.ts",
            12,
            5,
            Severity::Error,
            "raw-c",
        );
        assert_ne!(a.signature, c.signature);
    }

    #[test]
    fn severity_ordering_puts_errors_first() {
        assert!(Severity::Error < Severity::Warning);
        assert!(Severity::Warning < Severity::Info);
    }

    #[test]
    fn severity_from_word() {
        assert_eq!(Severity::from_word("error"), Severity::Error);
        assert_eq!(Severity::from_word("warning"), Severity::Warning);
        assert_eq!(Severity::from_word("note"), Severity::Info);
    }
}
