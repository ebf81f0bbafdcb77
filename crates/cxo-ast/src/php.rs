// SPDX-License-Identifier: MIT OR Apache-2.0
//! PHP analyzer.

use crate::scan::{block_end_by_braces, brace_depths, docs_and_decorators_above};
use crate::structure::{CodeElement, ElementKind, FileStructure, ImportEntry, Visibility};
use crate::LanguageAnalyzer;
use regex::Regex;
use std::sync::LazyLock;

static USE_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^use\s+([\w\\]+)(?:\s+as\s+(\w+))?\s*;").expect("valid regex literal")
});

static FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^function\s+(\w+)\s*\(([^)]*)\)\s*(?::\s*(\??[\w\\|]+))?")
        .expect("valid regex literal")
});

static CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(abstract\s+|final\s+)?(class|trait)\s+(\w+)").expect("valid regex literal")
});

static INTERFACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^interface\s+(\w+)").expect("valid regex literal"));

static ENUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^enum\s+(\w+)").expect("valid regex literal"));

static METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(public|private|protected)?\s*(static\s+)?(abstract\s+)?function\s+(\w+)\s*\(([^)]*)\)\s*(?::\s*(\??[\w\\|]+))?",
    )
    .expect("valid regex literal")
});

static PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(public|private|protected)\s+(static\s+)?(?:\??[\w\\|]+\s+)?\$(\w+)")
        .expect("valid regex literal")
});

static CONSTANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:const|define\s*\()\s*'?(\w+)'?").expect("valid regex literal")
});

fn visibility_of(word: Option<&str>) -> Option<Visibility> {
    match word.map(str::trim) {
        Some("public") => Some(Visibility::Public),
        Some("private") => Some(Visibility::Private),
        Some("protected") => Some(Visibility::Protected),
        _ => None,
    }
}

fn split_params(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// The PHP analyzer.
pub struct PhpAnalyzer;

impl PhpAnalyzer {
    fn parse_members(&self, lines: &[&str], class_start: usize, class_end: usize) -> Vec<CodeElement> {
        let depths = brace_depths(lines);
        let base_depth = depths[class_start];
        let mut members = Vec::new();

        let mut index = class_start + 1;
        while index <= class_end.min(lines.len().saturating_sub(1)) {
            if depths[index] != base_depth + 1 {
                index += 1;
                continue;
            }
            let line = lines[index].trim();
            let lineno = (index + 1) as u32;

            if let Some(caps) = METHOD.captures(line) {
                let end = block_end_by_braces(lines, index);
                let name = caps[4].to_string();
                let kind = if name == "__construct" {
                    ElementKind::Constructor
                } else {
                    ElementKind::Method
                };
                let mut el = CodeElement::new(&name, kind, lineno, (end + 1) as u32, line);
                el.visibility = visibility_of(caps.get(1).map(|m| m.as_str()));
                if caps.get(2).is_some() {
                    el.modifiers.push("static".to_string());
                }
                if caps.get(3).is_some() {
                    el.modifiers.push("abstract".to_string());
                }
                el.parameters = split_params(caps.get(5).map_or("", |m| m.as_str()));
                el.return_type = caps.get(6).map(|m| m.as_str().to_string());
                let (doc, decorators) = docs_and_decorators_above(
                    lines,
                    index,
                    |l| self.is_doc_line(l),
                    |l| self.is_decorator_line(l),
                );
                el.documentation = doc;
                el.decorators = decorators;
                members.push(el);
                index = end + 1;
                continue;
            }
            if let Some(caps) = PROPERTY.captures(line) {
                let mut el = CodeElement::new(
                    &caps[3],
                    ElementKind::Property,
                    lineno,
                    lineno,
                    line,
                );
                el.visibility = visibility_of(caps.get(1).map(|m| m.as_str()));
                if caps.get(2).is_some() {
                    el.modifiers.push("static".to_string());
                }
                members.push(el);
            }
            index += 1;
        }
        members
    }
}

impl LanguageAnalyzer for PhpAnalyzer {
    fn name(&self) -> &'static str {
        "php"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["php7", "php8"]
    }

    fn is_doc_line(&self, line: &str) -> bool {
        line.starts_with("/**")
            || line.starts_with('*')
            || line.starts_with("*/")
            || line.starts_with("//")
    }

    fn is_decorator_line(&self, line: &str) -> bool {
        line.starts_with("#[")
    }

    fn parse(&self, content: &str) -> FileStructure {
        let mut structure = FileStructure::empty(self.name());
        let lines: Vec<&str> = content.lines().collect();
        let depths = brace_depths(&lines);

        let mut index = 0usize;
        while index < lines.len() {
            let line = lines[index].trim();
            let lineno = (index + 1) as u32;
            if depths[index] != 0 {
                index += 1;
                continue;
            }

            if let Some(caps) = USE_IMPORT.captures(line) {
                let path = caps[1].to_string();
                let bound = caps.get(2).map_or_else(
                    || path.rsplit('\\').next().unwrap_or(&path).to_string(),
                    |m| m.as_str().to_string(),
                );
                structure.imports.push(ImportEntry {
                    line: lineno,
                    text: lines[index].to_string(),
                    names: vec![bound],
                    module: Some(path),
                });
                index += 1;
                continue;
            }

            let (doc, decorators) = docs_and_decorators_above(
                &lines,
                index,
                |l| self.is_doc_line(l),
                |l| self.is_decorator_line(l),
            );

            if let Some(caps) = CLASS.captures(line) {
                let end = block_end_by_braces(&lines, index);
                let mut el = CodeElement::new(
                    &caps[3],
                    ElementKind::Class,
                    lineno,
                    (end + 1) as u32,
                    line.trim_end_matches('{').trim_end(),
                );
                if let Some(modifier) = caps.get(1) {
                    el.modifiers.push(modifier.as_str().trim().to_string());
                }
                el.documentation = doc;
                el.decorators = decorators;
                el.children = self.parse_members(&lines, index, end);
                structure.classes.push(el);
                index = end + 1;
                continue;
            }
            if let Some(caps) = INTERFACE.captures(line) {
                let end = block_end_by_braces(&lines, index);
                let mut el = CodeElement::new(
                    &caps[1],
                    ElementKind::Interface,
                    lineno,
                    (end + 1) as u32,
                    line.trim_end_matches('{').trim_end(),
                );
                el.documentation = doc;
                structure.interfaces.push(el);
                index = end + 1;
                continue;
            }
            if let Some(caps) = ENUM.captures(line) {
                let end = block_end_by_braces(&lines, index);
                let mut el = CodeElement::new(
                    &caps[1],
                    ElementKind::Enum,
                    lineno,
                    (end + 1) as u32,
                    line.trim_end_matches('{').trim_end(),
                );
                el.documentation = doc;
                structure.enums.push(el);
                index = end + 1;
                continue;
            }
            if let Some(caps) = FUNCTION.captures(line) {
                let end = block_end_by_braces(&lines, index);
                let mut el = CodeElement::new(
                    &caps[1],
                    ElementKind::Function,
                    lineno,
                    (end + 1) as u32,
                    line.trim_end_matches('{').trim_end(),
                );
                el.parameters = split_params(caps.get(2).map_or("", |m| m.as_str()));
                el.return_type = caps.get(3).map(|m| m.as_str().to_string());
                el.documentation = doc;
                el.decorators = decorators;
                structure.functions.push(el);
                index = end + 1;
                continue;
            }
            if let Some(caps) = CONSTANT.captures(line) {
                structure
                    .variables
                    .push(CodeElement::new(&caps[1], ElementKind::Variable, lineno, lineno, line));
            }
            index += 1;
        }
        structure
    }
}
