// SPDX-License-Identifier: MIT OR Apache-2.0
//! Named-element extraction.

use crate::structure::{CodeElement, ElementKind, FileStructure};
use crate::LanguageAnalyzer;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("valid regex literal"));

/// What to pull out of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractTarget {
    /// Kind of element wanted.
    pub kind: ElementKind,
    /// Declared name to match exactly.
    pub name: String,
}

/// Extraction knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractOptions {
    /// Extend the span upward through the adjacent documentation block.
    #[serde(default)]
    pub include_comments: bool,
    /// Append the import lines the element actually references.
    #[serde(default)]
    pub include_imports: bool,
}

/// An extracted element with its source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedContent {
    /// Element name.
    pub name: String,
    /// Element kind.
    pub kind: ElementKind,
    /// 1-based first line included.
    pub start_line: u32,
    /// 1-based last line included.
    pub end_line: u32,
    /// The extracted source text.
    pub text: String,
    /// Referenced import lines, in original order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
}

/// Find an element of the requested kind and name.
///
/// Member kinds (constructor, method, property, getter, setter) are looked
/// up inside each class's `children` in declaration order; everything else
/// searches the matching top-level list.
fn find_element<'a>(structure: &'a FileStructure, target: &ExtractTarget) -> Option<&'a CodeElement> {
    if target.kind.is_member() {
        return structure
            .classes
            .iter()
            .flat_map(|c| &c.children)
            .find(|m| m.kind == target.kind && m.name == target.name);
    }
    let list = match target.kind {
        ElementKind::Function => &structure.functions,
        ElementKind::Class => &structure.classes,
        ElementKind::Interface => &structure.interfaces,
        ElementKind::Type => &structure.types,
        ElementKind::Variable => &structure.variables,
        ElementKind::Enum => &structure.enums,
        _ => unreachable!("member kinds handled above"),
    };
    list.iter().find(|e| e.name == target.name)
}

/// Extract a named element from source text.
///
/// Returns `None` iff no element of the requested kind and name exists.
#[must_use]
pub fn extract(
    content: &str,
    analyzer: &dyn LanguageAnalyzer,
    target: &ExtractTarget,
    options: &ExtractOptions,
) -> Option<ExtractedContent> {
    let structure = analyzer.parse(content);
    let element = find_element(&structure, target)?;
    let lines: Vec<&str> = content.lines().collect();

    let mut start = (element.start_line as usize).saturating_sub(1);
    let end = ((element.end_line as usize).saturating_sub(1)).min(lines.len().saturating_sub(1));

    // Decorators sit immediately above the declaration.
    while start > 0 && analyzer.is_decorator_line(lines[start - 1].trim()) {
        start -= 1;
    }

    // The documentation block sits above the decorators; blank lines are
    // permitted inside the block but not between block and declaration.
    if options.include_comments {
        let mut cursor = start;
        let mut block_start = None;
        while cursor > 0 {
            let above = lines[cursor - 1].trim();
            if analyzer.is_doc_line(above) {
                block_start = Some(cursor - 1);
                cursor -= 1;
            } else if above.is_empty() && block_start.is_some() {
                cursor -= 1;
            } else {
                break;
            }
        }
        if let Some(block_start) = block_start {
            start = block_start;
        }
    }

    let text = lines[start..=end].join("\n");

    let imports = if options.include_imports {
        let referenced: HashSet<&str> = IDENTIFIER
            .find_iter(&text)
            .map(|m| m.as_str())
            .collect();
        structure
            .imports
            .iter()
            .filter(|import| import.names.iter().any(|n| referenced.contains(n.as_str())))
            .map(|import| import.text.clone())
            .collect()
    } else {
        Vec::new()
    };

    Some(ExtractedContent {
        name: element.name.clone(),
        kind: element.kind,
        start_line: (start + 1) as u32,
        end_line: (end + 1) as u32,
        text,
        imports,
    })
}
