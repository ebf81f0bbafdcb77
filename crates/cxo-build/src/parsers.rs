// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-tool output parsers and their registry.

use crate::parsed::{ParsedError, Severity};
use regex::Regex;
use std::sync::LazyLock;

/// Capability shape shared by every build-output parser.
///
/// Implementations are registered by name; the registry's `parse` walks
/// them in registration order and the first parser whose [`can_parse`]
/// probe accepts the output wins.
///
/// [`can_parse`]: ToolOutputParser::can_parse
pub trait ToolOutputParser: Send + Sync {
    /// Registry name (e.g. `"typescript"`).
    fn name(&self) -> &'static str;

    /// Build tools this parser understands (e.g. `["tsc"]`).
    fn supported_tools(&self) -> &'static [&'static str];

    /// Cheap probe: does any line of `output` look like this tool?
    fn can_parse(&self, output: &str) -> bool;

    /// Extract all diagnostics from `output`.
    fn parse(&self, output: &str) -> Vec<ParsedError>;
}

// ── TypeScript ──────────────────────────────────────────────────────

static TS_PAREN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\((\d+),(\d+)\):\s*(error|warning)\s+(TS\d+):\s*(.+)$")
        .expect("valid regex literal")
});

static TS_COLON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?):(\d+):(\d+)\s*-\s*(error|warning)\s+(TS\d+):\s*(.+)$")
        .expect("valid regex literal")
});

static FOUND_ERRORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Found \d+ errors?").expect("valid regex literal"));

/// `tsc` diagnostics in either of its two location formats.
pub struct TypeScriptParser;

impl ToolOutputParser for TypeScriptParser {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn supported_tools(&self) -> &'static [&'static str] {
        &["tsc"]
    }

    fn can_parse(&self, output: &str) -> bool {
        output
            .lines()
            .any(|l| TS_PAREN.is_match(l) || TS_COLON.is_match(l))
            || FOUND_ERRORS.is_match(output)
    }

    fn parse(&self, output: &str) -> Vec<ParsedError> {
        let mut errors = Vec::new();
        for line in output.lines() {
            // First matching pattern wins for a given line.
            let caps = TS_PAREN.captures(line).or_else(|| TS_COLON.captures(line));
            let Some(caps) = caps else { continue };
            errors.push(ParsedError::new(
                &caps[5],
                &caps[6],
                &caps[1],
                caps[2].parse().unwrap_or(0),
                caps[3].parse().unwrap_or(0),
                Severity::from_word(&caps[4]),
                line,
            ));
        }
        errors
    }
}

// ── Rust ────────────────────────────────────────────────────────────

static RUSTC_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(error|warning)(?:\[(E\d+)\])?:\s*(.+)$").expect("valid regex literal")
});

static RUSTC_LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*-->\s*(.+?):(\d+):(\d+)\s*$").expect("valid regex literal"));

/// `rustc` / `cargo` diagnostics: a header line followed by a `-->`
/// location line.
pub struct RustParser;

impl ToolOutputParser for RustParser {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn supported_tools(&self) -> &'static [&'static str] {
        &["rustc", "cargo"]
    }

    fn can_parse(&self, output: &str) -> bool {
        output.lines().any(|l| RUSTC_HEADER.is_match(l))
            && output.lines().any(|l| RUSTC_LOCATION.is_match(l))
    }

    fn parse(&self, output: &str) -> Vec<ParsedError> {
        let mut errors: Vec<ParsedError> = Vec::new();
        for line in output.lines() {
            if let Some(caps) = RUSTC_HEADER.captures(line) {
                let code = caps.get(2).map_or("rustc", |m| m.as_str());
                errors.push(ParsedError::new(
                    code,
                    &caps[3],
                    "",
                    0,
                    0,
                    Severity::from_word(&caps[1]),
                    line,
                ));
            } else if let Some(caps) = RUSTC_LOCATION.captures(line) {
                // Location lines attach to the most recent diagnostic
                // that has no file yet.
                if let Some(last) = errors.last_mut() {
                    if last.file.is_empty() {
                        last.file = caps[1].to_string();
                        last.line = caps[2].parse().unwrap_or(0);
                        last.column = caps[3].parse().unwrap_or(0);
                        last.context = Some(line.trim().to_string());
                    }
                }
            }
        }
        errors
    }
}

// ── Go ──────────────────────────────────────────────────────────────

static GO_DIAGNOSTIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+\.go):(\d+):(\d+):\s*(.+)$").expect("valid regex literal"));

static GO_VET_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^vet:\s*(.+\.go):(\d+):(\d+):\s*(.+)$").expect("valid regex literal"));

/// `go build` / `go vet` diagnostics. Everything the Go toolchain prints
/// at a location is fatal, so severity is always `error`.
pub struct GoParser;

impl ToolOutputParser for GoParser {
    fn name(&self) -> &'static str {
        "go"
    }

    fn supported_tools(&self) -> &'static [&'static str] {
        &["go", "gopls"]
    }

    fn can_parse(&self, output: &str) -> bool {
        output
            .lines()
            .any(|l| GO_DIAGNOSTIC.is_match(l) || GO_VET_PREFIX.is_match(l))
    }

    fn parse(&self, output: &str) -> Vec<ParsedError> {
        let mut errors = Vec::new();
        for line in output.lines() {
            let caps = GO_VET_PREFIX
                .captures(line)
                .or_else(|| GO_DIAGNOSTIC.captures(line));
            let Some(caps) = caps else { continue };
            errors.push(ParsedError::new(
                "go",
                &caps[4],
                &caps[1],
                caps[2].parse().unwrap_or(0),
                caps[3].parse().unwrap_or(0),
                Severity::Error,
                line,
            ));
        }
        errors
    }
}

// ── Generic ─────────────────────────────────────────────────────────

static GENERIC_DIAGNOSTIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?):(\d+):(\d+):\s*(error|warning|info|note):\s*(.+)$")
        .expect("valid regex literal")
});

static GENERIC_NO_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?):(\d+):\s*(error|warning):\s*(.+)$").expect("valid regex literal")
});

/// Fallback for gcc/clang-style `file:line:col: severity: message` lines.
pub struct GenericParser;

impl ToolOutputParser for GenericParser {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn supported_tools(&self) -> &'static [&'static str] {
        &["gcc", "clang", "make"]
    }

    fn can_parse(&self, output: &str) -> bool {
        output
            .lines()
            .any(|l| GENERIC_DIAGNOSTIC.is_match(l) || GENERIC_NO_COLUMN.is_match(l))
    }

    fn parse(&self, output: &str) -> Vec<ParsedError> {
        let mut errors = Vec::new();
        for line in output.lines() {
            if let Some(caps) = GENERIC_DIAGNOSTIC.captures(line) {
                errors.push(ParsedError::new(
                    "generic",
                    &caps[5],
                    &caps[1],
                    caps[2].parse().unwrap_or(0),
                    caps[3].parse().unwrap_or(0),
                    Severity::from_word(&caps[4]),
                    line,
                ));
            } else if let Some(caps) = GENERIC_NO_COLUMN.captures(line) {
                errors.push(ParsedError::new(
                    "generic",
                    &caps[4],
                    &caps[1],
                    caps[2].parse().unwrap_or(0),
                    0,
                    Severity::from_word(&caps[3]),
                    line,
                ));
            }
        }
        errors
    }
}

// ── Registry ────────────────────────────────────────────────────────

/// Name-indexed collection of [`ToolOutputParser`]s, tried in
/// registration order.
pub struct ParserRegistry {
    parsers: Vec<Box<dyn ToolOutputParser>>,
}

impl ParserRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { parsers: Vec::new() }
    }

    /// Register a parser, appending it to the probe order.
    pub fn register(&mut self, parser: impl ToolOutputParser + 'static) {
        self.parsers.push(Box::new(parser));
    }

    /// Look up a parser by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn ToolOutputParser> {
        self.parsers
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    /// Registered parser names, in probe order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }

    /// Whether any registered parser accepts this output.
    #[must_use]
    pub fn can_parse(&self, output: &str) -> bool {
        self.parsers.iter().any(|p| p.can_parse(output))
    }

    /// Parse `output` with the first parser that accepts it.
    ///
    /// Returns an empty vector when nothing matches; callers distinguish
    /// "no diagnostics" from "unparseable" via [`can_parse`](Self::can_parse).
    #[must_use]
    pub fn parse(&self, output: &str) -> Vec<ParsedError> {
        for parser in &self.parsers {
            if parser.can_parse(output) {
                return parser.parse(output);
            }
        }
        Vec::new()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        default_registry()
    }
}

/// Registry with the built-in parser family, most specific first.
#[must_use]
pub fn default_registry() -> ParserRegistry {
    let mut registry = ParserRegistry::new();
    registry.register(TypeScriptParser);
    registry.register(RustParser);
    registry.register(GoParser);
    registry.register(GenericParser);
    registry
}
