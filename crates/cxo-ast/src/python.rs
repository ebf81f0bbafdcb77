// SPDX-License-Identifier: MIT OR Apache-2.0
//! Python analyzer.

use crate::scan::{block_end_by_indent, docs_and_decorators_above, leading_spaces};
use crate::structure::{CodeElement, ElementKind, FileStructure, ImportEntry, Visibility};
use crate::LanguageAnalyzer;
use regex::Regex;
use std::sync::LazyLock;

static IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^import\s+([\w.,\s]+)$").expect("valid regex literal"));

static FROM_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^from\s+([\w.]+)\s+import\s+(.+)$").expect("valid regex literal")
});

static DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)(async\s+)?def\s+(\w+)\s*\(([^)]*)\)\s*(?:->\s*([^:]+))?:")
        .expect("valid regex literal")
});

static CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^class\s+(\w+)\s*(\([^)]*\))?\s*:").expect("valid regex literal"));

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w+)\s*(?::\s*[\w\[\], .]+)?\s*=\s*\S").expect("valid regex literal")
});

/// Bind one import-list entry, honoring `as` aliases.
fn bound_name(spec: &str) -> Option<String> {
    let spec = spec.trim();
    if spec.is_empty() || spec == "*" {
        return None;
    }
    let name = match spec.split_once(" as ") {
        Some((_, alias)) => alias.trim(),
        // `import a.b.c` binds the top-level package name.
        None => spec.split('.').next().unwrap_or(spec).trim(),
    };
    Some(name.to_string())
}

/// Names bound by a `from x import a, b as c` list.
fn from_bound_names(list: &str) -> Vec<String> {
    list.trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .filter_map(|spec| {
            let spec = spec.trim();
            if spec.is_empty() || spec == "*" {
                return None;
            }
            Some(match spec.split_once(" as ") {
                Some((_, alias)) => alias.trim().to_string(),
                None => spec.to_string(),
            })
        })
        .collect()
}

fn python_visibility(name: &str) -> Visibility {
    if name.starts_with("__") && !name.ends_with("__") || name.starts_with('_') && !name.starts_with("__") {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

/// First docstring line(s) directly under a `def` / `class` line.
fn docstring_below(lines: &[&str], decl_index: usize, end: usize) -> Option<String> {
    let first_body = lines
        .get(decl_index + 1..=end.min(lines.len().saturating_sub(1)))?
        .iter()
        .position(|l| !l.trim().is_empty())?;
    let index = decl_index + 1 + first_body;
    let trimmed = lines[index].trim();
    if !(trimmed.starts_with("\"\"\"") || trimmed.starts_with("'''")) {
        return None;
    }
    let quote = &trimmed[..3];
    // Single-line docstring.
    if trimmed.len() > 3 && trimmed.ends_with(quote) {
        return Some(trimmed.to_string());
    }
    let mut collected = vec![trimmed.to_string()];
    for line in &lines[index + 1..=end.min(lines.len().saturating_sub(1))] {
        collected.push(line.trim().to_string());
        if line.trim().ends_with(quote) {
            break;
        }
    }
    Some(collected.join("\n"))
}

fn element_from_def(
    lines: &[&str],
    index: usize,
    caps: &regex::Captures<'_>,
    kind: ElementKind,
) -> CodeElement {
    let indent = caps[1].len();
    let end = block_end_by_indent(lines, index, indent);
    let name = caps[3].to_string();
    let mut el = CodeElement::new(
        &name,
        kind,
        (index + 1) as u32,
        (end + 1) as u32,
        lines[index].trim(),
    );
    if caps.get(2).is_some() {
        el.modifiers.push("async".to_string());
    }
    el.parameters = caps[4]
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty() && *p != "self" && *p != "cls")
        .map(str::to_string)
        .collect();
    el.return_type = caps.get(5).map(|m| m.as_str().trim().to_string());
    el.visibility = Some(python_visibility(&name));
    el.documentation = docstring_below(lines, index, end);
    el
}

/// The Python analyzer.
pub struct PythonAnalyzer;

impl LanguageAnalyzer for PythonAnalyzer {
    fn name(&self) -> &'static str {
        "python"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["py", "python3"]
    }

    fn is_doc_line(&self, line: &str) -> bool {
        line.starts_with('#') && !line.starts_with("#!")
    }

    fn is_decorator_line(&self, line: &str) -> bool {
        line.starts_with('@')
    }

    fn parse(&self, content: &str) -> FileStructure {
        let mut structure = FileStructure::empty(self.name());
        let lines: Vec<&str> = content.lines().collect();

        let mut index = 0usize;
        while index < lines.len() {
            let raw = lines[index];
            let line = raw.trim_end();
            let lineno = (index + 1) as u32;

            if let Some(caps) = FROM_IMPORT.captures(line) {
                structure.imports.push(ImportEntry {
                    line: lineno,
                    text: raw.to_string(),
                    names: from_bound_names(&caps[2]),
                    module: Some(caps[1].to_string()),
                });
                index += 1;
                continue;
            }
            if let Some(caps) = IMPORT.captures(line) {
                structure.imports.push(ImportEntry {
                    line: lineno,
                    text: raw.to_string(),
                    names: caps[1].split(',').filter_map(bound_name).collect(),
                    module: None,
                });
                index += 1;
                continue;
            }

            if let Some(caps) = CLASS.captures(line) {
                let end = block_end_by_indent(&lines, index, 0);
                let (doc_above, decorators) = docs_and_decorators_above(
                    &lines,
                    index,
                    |l| self.is_doc_line(l),
                    |l| self.is_decorator_line(l),
                );
                let name = caps[1].to_string();
                let mut el = CodeElement::new(
                    &name,
                    ElementKind::Class,
                    lineno,
                    (end + 1) as u32,
                    line,
                );
                el.visibility = Some(python_visibility(&name));
                el.decorators = decorators;
                el.documentation = docstring_below(&lines, index, end).or(doc_above);

                // Methods: defs indented inside the class block.
                let mut member_index = index + 1;
                while member_index <= end {
                    if let Some(member_caps) = DEF.captures(lines[member_index]) {
                        if !member_caps[1].is_empty() {
                            let kind = if &member_caps[3] == "__init__" {
                                ElementKind::Constructor
                            } else {
                                ElementKind::Method
                            };
                            let mut member =
                                element_from_def(&lines, member_index, &member_caps, kind);
                            let (_, member_decorators) = docs_and_decorators_above(
                                &lines,
                                member_index,
                                |l| self.is_doc_line(l),
                                |l| self.is_decorator_line(l),
                            );
                            if member_decorators.iter().any(|d| d.starts_with("@property")) {
                                member.kind = ElementKind::Getter;
                            } else if member_decorators.iter().any(|d| d.ends_with(".setter")) {
                                member.kind = ElementKind::Setter;
                            }
                            member.decorators = member_decorators;
                            let member_end = (member.end_line - 1) as usize;
                            el.children.push(member);
                            member_index = member_end + 1;
                            continue;
                        }
                    }
                    member_index += 1;
                }
                structure.classes.push(el);
                index = end + 1;
                continue;
            }

            if let Some(caps) = DEF.captures(line) {
                if caps[1].is_empty() {
                    let (_, decorators) = docs_and_decorators_above(
                        &lines,
                        index,
                        |l| self.is_doc_line(l),
                        |l| self.is_decorator_line(l),
                    );
                    let mut el = element_from_def(&lines, index, &caps, ElementKind::Function);
                    el.decorators = decorators;
                    let end = (el.end_line - 1) as usize;
                    structure.functions.push(el);
                    index = end + 1;
                    continue;
                }
            }

            if leading_spaces(raw) == 0 {
                if let Some(caps) = ASSIGNMENT.captures(line) {
                    let name = caps[1].to_string();
                    let mut el =
                        CodeElement::new(&name, ElementKind::Variable, lineno, lineno, line);
                    el.visibility = Some(python_visibility(&name));
                    structure.variables.push(el);
                }
            }
            index += 1;
        }
        structure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"import os
import json as j
from typing import List, Optional

MAX_RETRIES = 3

def fetch(url, timeout=30):
    """Fetch a URL with retries."""
    return os.popen(url)

@cached
async def fetch_async(url) -> Optional[str]:
    return None

class Store:
    """Key-value store."""

    def __init__(self, path):
        self.path = path

    @property
    def size(self):
        return 0

    def _load(self):
        return json.loads("{}")

    def save(self, data: dict) -> None:
        pass
"#;

    #[test]
    fn parses_imports() {
        let s = PythonAnalyzer.parse(SAMPLE);
        assert_eq!(s.imports.len(), 3);
        assert_eq!(s.imports[0].names, vec!["os"]);
        assert_eq!(s.imports[1].names, vec!["j"]);
        assert_eq!(s.imports[2].names, vec!["List", "Optional"]);
        assert_eq!(s.imports[2].module.as_deref(), Some("typing"));
    }

    #[test]
    fn parses_functions_with_docstrings_and_decorators() {
        let s = PythonAnalyzer.parse(SAMPLE);
        let names: Vec<&str> = s.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["fetch", "fetch_async"]);
        let fetch = &s.functions[0];
        assert_eq!(
            fetch.documentation.as_deref(),
            Some(r#""""Fetch a URL with retries.""""#)
        );
        assert_eq!(fetch.parameters, vec!["url", "timeout=30"]);
        let asynced = &s.functions[1];
        assert!(asynced.modifiers.contains(&"async".to_string()));
        assert_eq!(asynced.decorators, vec!["@cached"]);
        assert_eq!(asynced.return_type.as_deref(), Some("Optional[str]"));
    }

    #[test]
    fn parses_class_members_in_declaration_order() {
        let s = PythonAnalyzer.parse(SAMPLE);
        assert_eq!(s.classes.len(), 1);
        let class = &s.classes[0];
        assert_eq!(class.name, "Store");
        assert_eq!(
            class.documentation.as_deref(),
            Some(r#""""Key-value store.""""#)
        );
        let kinds: Vec<(String, ElementKind)> = class
            .children
            .iter()
            .map(|c| (c.name.clone(), c.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("__init__".to_string(), ElementKind::Constructor),
                ("size".to_string(), ElementKind::Getter),
                ("_load".to_string(), ElementKind::Method),
                ("save".to_string(), ElementKind::Method),
            ]
        );
        let load = class.children.iter().find(|c| c.name == "_load").unwrap();
        assert_eq!(load.visibility, Some(Visibility::Private));
    }

    #[test]
    fn self_parameter_is_dropped() {
        let s = PythonAnalyzer.parse(SAMPLE);
        let save = s.classes[0].children.iter().find(|c| c.name == "save").unwrap();
        assert_eq!(save.parameters, vec!["data: dict"]);
    }

    #[test]
    fn parses_module_variables() {
        let s = PythonAnalyzer.parse(SAMPLE);
        assert_eq!(s.variables.len(), 1);
        assert_eq!(s.variables[0].name, "MAX_RETRIES");
    }

    #[test]
    fn malformed_input_degrades_to_empty() {
        let s = PythonAnalyzer.parse(")))) ???");
        assert!(s.is_empty());
    }
}
