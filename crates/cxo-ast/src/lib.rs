// SPDX-License-Identifier: MIT OR Apache-2.0
//! Multi-language source-structure facade.
//!
//! One analyzer exists per supported language family (TS/JS, Python,
//! PHP); all produce the same uniform [`FileStructure`], so the search
//! and extraction paths are written once. Analyzers are deliberately
//! line-oriented and heuristic: malformed input degrades to an empty
//! structure rather than an error, and the caller detects that case via
//! the empty lists.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod scan;

pub mod extract;
pub mod php;
pub mod python;
pub mod search;
pub mod structure;
pub mod ts;

pub use extract::{extract, ExtractOptions, ExtractTarget, ExtractedContent};
pub use php::PhpAnalyzer;
pub use python::PythonAnalyzer;
pub use search::search_structure;
pub use structure::{CodeElement, ElementKind, FileStructure, ImportEntry, Visibility};
pub use ts::TsAnalyzer;

/// One language family's parser.
///
/// The doc/decorator line probes let the generic extraction path extend an
/// element's span upward without knowing the language's comment syntax.
pub trait LanguageAnalyzer: Send + Sync {
    /// Canonical language name (e.g. `"typescript"`).
    fn name(&self) -> &'static str;

    /// Alternate names accepted for this analyzer (e.g. `"ts"`, `"js"`).
    fn aliases(&self) -> &'static [&'static str];

    /// Whether a trimmed line belongs to a documentation block.
    fn is_doc_line(&self, line: &str) -> bool;

    /// Whether a trimmed line is a decorator / annotation.
    fn is_decorator_line(&self, line: &str) -> bool;

    /// Parse source text into the uniform structure. Never fails;
    /// unparseable content yields an empty structure.
    fn parse(&self, content: &str) -> FileStructure;
}

/// Name-indexed analyzer family with an extensible registration slot.
pub struct AnalyzerRegistry {
    analyzers: Vec<Box<dyn LanguageAnalyzer>>,
}

impl AnalyzerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            analyzers: Vec::new(),
        }
    }

    /// Register an analyzer.
    pub fn register(&mut self, analyzer: impl LanguageAnalyzer + 'static) {
        self.analyzers.push(Box::new(analyzer));
    }

    /// Resolve a language name or alias, case-insensitively.
    #[must_use]
    pub fn resolve(&self, language: &str) -> Option<&dyn LanguageAnalyzer> {
        let wanted = language.to_ascii_lowercase();
        self.analyzers
            .iter()
            .find(|a| a.name() == wanted || a.aliases().contains(&wanted.as_str()))
            .map(|a| a.as_ref())
    }

    /// Registered canonical names.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        default_registry()
    }
}

/// Registry with the built-in language family.
#[must_use]
pub fn default_registry() -> AnalyzerRegistry {
    let mut registry = AnalyzerRegistry::new();
    registry.register(TsAnalyzer);
    registry.register(PythonAnalyzer);
    registry.register(PhpAnalyzer);
    registry
}

/// Parse `content` as `language`.
///
/// Unknown languages produce an empty structure tagged with the requested
/// name, matching the degrade-to-empty contract for malformed input.
#[must_use]
pub fn parse(content: &str, language: &str) -> FileStructure {
    match default_registry().resolve(language) {
        Some(analyzer) => analyzer.parse(content),
        None => FileStructure::empty(language),
    }
}

/// Parse and search in one step.
#[must_use]
pub fn search(content: &str, language: &str, query: &str) -> Vec<CodeElement> {
    search_structure(&parse(content, language), query)
}
