// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural search.

use crate::structure::{CodeElement, FileStructure};

/// Case-insensitive substring search over a parsed structure.
///
/// The query is matched against each element's name, signature,
/// documentation, and decorators. All matches across functions, classes,
/// interfaces, types, variables, enums, and class children are returned
/// in structural order.
#[must_use]
pub fn search_structure(structure: &FileStructure, query: &str) -> Vec<CodeElement> {
    let needle = query.to_lowercase();
    let mut matches = Vec::new();
    for element in structure.top_level() {
        collect(element, &needle, &mut matches);
    }
    matches
}

fn collect(element: &CodeElement, needle: &str, out: &mut Vec<CodeElement>) {
    if matches_query(element, needle) {
        out.push(element.clone());
    }
    for child in &element.children {
        collect(child, needle, out);
    }
}

fn matches_query(element: &CodeElement, needle: &str) -> bool {
    if element.name.to_lowercase().contains(needle)
        || element.signature.to_lowercase().contains(needle)
    {
        return true;
    }
    if element
        .documentation
        .as_ref()
        .is_some_and(|d| d.to_lowercase().contains(needle))
    {
        return true;
    }
    element
        .decorators
        .iter()
        .any(|d| d.to_lowercase().contains(needle))
}
