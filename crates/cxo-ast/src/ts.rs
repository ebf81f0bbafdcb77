// SPDX-License-Identifier: MIT OR Apache-2.0
//! TypeScript / JavaScript analyzer.

use crate::scan::{block_end_by_braces, brace_depths, docs_and_decorators_above};
use crate::structure::{CodeElement, ElementKind, FileStructure, ImportEntry, Visibility};
use crate::LanguageAnalyzer;
use regex::Regex;
use std::sync::LazyLock;

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^import\s+(?:(.+?)\s+from\s+)?['"]([^'"]+)['"]"#).expect("valid regex literal")
});

static REQUIRE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:const|let|var)\s+(\{[^}]*\}|\w+)\s*=\s*require\(\s*['"]([^'"]+)['"]\s*\)"#)
        .expect("valid regex literal")
});

static FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(export\s+)?(default\s+)?(async\s+)?function\s*\*?\s*(\w+)\s*(<[^>]+>)?\s*\(([^)]*)\)\s*(?::\s*([^{]+?))?\s*\{?\s*$",
    )
    .expect("valid regex literal")
});

static ARROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(export\s+)?const\s+(\w+)\s*(?::[^=]+)?=\s*(async\s+)?(?:\(([^)]*)\)|\w+)\s*(?::\s*[^=]+)?=>")
        .expect("valid regex literal")
});

static CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(export\s+)?(default\s+)?(abstract\s+)?class\s+(\w+)\s*(<[^>]+>)?")
        .expect("valid regex literal")
});

static INTERFACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(export\s+)?interface\s+(\w+)\s*(<[^>]+>)?").expect("valid regex literal")
});

static TYPE_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(export\s+)?type\s+(\w+)\s*(<[^>]+>)?\s*=").expect("valid regex literal")
});

static ENUM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(export\s+)?(const\s+)?enum\s+(\w+)").expect("valid regex literal")
});

static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(export\s+)?(const|let|var)\s+(\w+)").expect("valid regex literal")
});

static CONSTRUCTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(public\s+|private\s+|protected\s+)?constructor\s*\(([^)]*)\)?")
        .expect("valid regex literal")
});

static ACCESSOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(public\s+|private\s+|protected\s+)?(static\s+)?(get|set)\s+(\w+)\s*\(([^)]*)\)")
        .expect("valid regex literal")
});

static METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(public\s+|private\s+|protected\s+)?(static\s+)?(async\s+)?(\w+)\s*(<[^>]+>)?\(([^)]*)\)\s*(?::\s*([^{]+?))?\s*\{",
    )
    .expect("valid regex literal")
});

static PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(public\s+|private\s+|protected\s+)?(static\s+)?(readonly\s+)?(\w+)\s*[?!]?\s*[:=]")
        .expect("valid regex literal")
});

/// Control keywords that the method pattern would otherwise swallow.
const KEYWORDS: &[&str] = &["if", "for", "while", "switch", "catch", "return", "new", "else", "do", "typeof"];

/// Split an import clause into the names it binds.
fn import_names(clause: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = clause.trim();

    // `* as ns`
    if let Some(ns) = rest.strip_prefix("* as ") {
        names.push(ns.trim().trim_end_matches(',').to_string());
        return names;
    }

    // Default import before any braces.
    if !rest.starts_with('{') {
        let default = rest.split(&[',', '{'][..]).next().unwrap_or("").trim();
        if !default.is_empty() {
            names.push(default.to_string());
        }
        rest = rest.split_once('{').map_or("", |(_, tail)| tail);
    } else {
        rest = &rest[1..];
    }

    // Named specifiers: `A, B as C`.
    let inner = rest.trim_end_matches(['}', ' ']);
    for spec in inner.split(',') {
        let spec = spec.trim();
        if spec.is_empty() {
            continue;
        }
        let bound = match spec.split_once(" as ") {
            Some((_, alias)) => alias.trim(),
            None => spec,
        };
        names.push(bound.to_string());
    }
    names
}

fn visibility_of(caps_text: Option<&str>) -> Option<Visibility> {
    match caps_text.map(str::trim) {
        Some("public") => Some(Visibility::Public),
        Some("private") => Some(Visibility::Private),
        Some("protected") => Some(Visibility::Protected),
        _ => None,
    }
}

fn split_params(raw: &str) -> Vec<String> {
    // Naive split: enough for flat parameter lists, which is what the
    // selection and extraction paths need.
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// The TS/JS analyzer.
pub struct TsAnalyzer;

impl TsAnalyzer {
    fn parse_members(&self, lines: &[&str], class_start: usize, class_end: usize) -> Vec<CodeElement> {
        let depths = brace_depths(lines);
        let base_depth = depths[class_start];
        let mut members = Vec::new();

        let mut index = class_start + 1;
        while index <= class_end.min(lines.len().saturating_sub(1)) {
            // Members live directly inside the class body.
            if depths[index] != base_depth + 1 {
                index += 1;
                continue;
            }
            let line = lines[index].trim();
            let lineno = (index + 1) as u32;

            if let Some(caps) = CONSTRUCTOR.captures(line) {
                let end = block_end_by_braces(lines, index);
                let mut el = CodeElement::new(
                    "constructor",
                    ElementKind::Constructor,
                    lineno,
                    (end + 1) as u32,
                    line,
                );
                el.visibility = visibility_of(caps.get(1).map(|m| m.as_str()));
                el.parameters = split_params(caps.get(2).map_or("", |m| m.as_str()));
                members.push(el);
                index = end + 1;
                continue;
            }
            if let Some(caps) = ACCESSOR.captures(line) {
                let end = block_end_by_braces(lines, index);
                let kind = if &caps[3] == "get" {
                    ElementKind::Getter
                } else {
                    ElementKind::Setter
                };
                let mut el =
                    CodeElement::new(&caps[4], kind, lineno, (end + 1) as u32, line);
                el.visibility = visibility_of(caps.get(1).map(|m| m.as_str()));
                if caps.get(2).is_some() {
                    el.modifiers.push("static".to_string());
                }
                members.push(el);
                index = end + 1;
                continue;
            }
            if let Some(caps) = METHOD.captures(line) {
                let name = caps[4].to_string();
                if !KEYWORDS.contains(&name.as_str()) {
                    let end = block_end_by_braces(lines, index);
                    let mut el = CodeElement::new(
                        &name,
                        ElementKind::Method,
                        lineno,
                        (end + 1) as u32,
                        line,
                    );
                    el.visibility = visibility_of(caps.get(1).map(|m| m.as_str()));
                    if caps.get(2).is_some() {
                        el.modifiers.push("static".to_string());
                    }
                    if caps.get(3).is_some() {
                        el.modifiers.push("async".to_string());
                    }
                    el.type_parameters = caps.get(5).map(|m| m.as_str().to_string());
                    el.parameters = split_params(caps.get(6).map_or("", |m| m.as_str()));
                    el.return_type = caps.get(7).map(|m| m.as_str().trim().to_string());
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
            }
            if let Some(caps) = PROPERTY.captures(line) {
                let name = caps[4].to_string();
                if !KEYWORDS.contains(&name.as_str()) {
                    let mut el = CodeElement::new(
                        &name,
                        ElementKind::Property,
                        lineno,
                        lineno,
                        line,
                    );
                    el.visibility = visibility_of(caps.get(1).map(|m| m.as_str()));
                    if caps.get(2).is_some() {
                        el.modifiers.push("static".to_string());
                    }
                    if caps.get(3).is_some() {
                        el.modifiers.push("readonly".to_string());
                    }
                    members.push(el);
                }
            }
            index += 1;
        }
        members
    }
}

impl LanguageAnalyzer for TsAnalyzer {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["ts", "tsx", "js", "jsx", "javascript"]
    }

    fn is_doc_line(&self, line: &str) -> bool {
        line.starts_with("///")
            || line.starts_with("/**")
            || line.starts_with("//")
            || line.starts_with('*')
            || line.starts_with("*/")
    }

    fn is_decorator_line(&self, line: &str) -> bool {
        line.starts_with('@')
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

            if let Some(caps) = IMPORT.captures(line) {
                structure.imports.push(ImportEntry {
                    line: lineno,
                    text: lines[index].to_string(),
                    names: caps.get(1).map_or_else(Vec::new, |m| import_names(m.as_str())),
                    module: Some(caps[2].to_string()),
                });
                index += 1;
                continue;
            }
            if let Some(caps) = REQUIRE.captures(line) {
                structure.imports.push(ImportEntry {
                    line: lineno,
                    text: lines[index].to_string(),
                    names: import_names(&caps[1]),
                    module: Some(caps[2].to_string()),
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

            if let Some(caps) = FUNCTION.captures(line) {
                let end = block_end_by_braces(&lines, index);
                let mut el = CodeElement::new(
                    &caps[4],
                    ElementKind::Function,
                    lineno,
                    (end + 1) as u32,
                    line.trim_end_matches('{').trim_end(),
                );
                if caps.get(1).is_some() {
                    el.modifiers.push("export".to_string());
                }
                if caps.get(3).is_some() {
                    el.modifiers.push("async".to_string());
                }
                el.type_parameters = caps.get(5).map(|m| m.as_str().to_string());
                el.parameters = split_params(caps.get(6).map_or("", |m| m.as_str()));
                el.return_type = caps.get(7).map(|m| m.as_str().trim().to_string());
                el.documentation = doc;
                el.decorators = decorators;
                structure.functions.push(el);
                index = end + 1;
                continue;
            }
            if let Some(caps) = ARROW.captures(line) {
                let end = block_end_by_braces(&lines, index);
                let mut el = CodeElement::new(
                    &caps[2],
                    ElementKind::Function,
                    lineno,
                    (end + 1) as u32,
                    line,
                );
                if caps.get(1).is_some() {
                    el.modifiers.push("export".to_string());
                }
                if caps.get(3).is_some() {
                    el.modifiers.push("async".to_string());
                }
                el.parameters = split_params(caps.get(4).map_or("", |m| m.as_str()));
                el.documentation = doc;
                el.decorators = decorators;
                structure.functions.push(el);
                index = end + 1;
                continue;
            }
            if let Some(caps) = CLASS.captures(line) {
                let end = block_end_by_braces(&lines, index);
                let mut el = CodeElement::new(
                    &caps[4],
                    ElementKind::Class,
                    lineno,
                    (end + 1) as u32,
                    line.trim_end_matches('{').trim_end(),
                );
                if caps.get(1).is_some() {
                    el.modifiers.push("export".to_string());
                }
                if caps.get(3).is_some() {
                    el.modifiers.push("abstract".to_string());
                }
                el.type_parameters = caps.get(5).map(|m| m.as_str().to_string());
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
                    &caps[2],
                    ElementKind::Interface,
                    lineno,
                    (end + 1) as u32,
                    line.trim_end_matches('{').trim_end(),
                );
                if caps.get(1).is_some() {
                    el.modifiers.push("export".to_string());
                }
                el.type_parameters = caps.get(3).map(|m| m.as_str().to_string());
                el.documentation = doc;
                structure.interfaces.push(el);
                index = end + 1;
                continue;
            }
            if let Some(caps) = TYPE_ALIAS.captures(line) {
                let end = block_end_by_braces(&lines, index);
                let mut el = CodeElement::new(
                    &caps[2],
                    ElementKind::Type,
                    lineno,
                    (end + 1) as u32,
                    line,
                );
                if caps.get(1).is_some() {
                    el.modifiers.push("export".to_string());
                }
                el.type_parameters = caps.get(3).map(|m| m.as_str().to_string());
                el.documentation = doc;
                structure.types.push(el);
                index = end + 1;
                continue;
            }
            if let Some(caps) = ENUM.captures(line) {
                let end = block_end_by_braces(&lines, index);
                let mut el = CodeElement::new(
                    &caps[3],
                    ElementKind::Enum,
                    lineno,
                    (end + 1) as u32,
                    line.trim_end_matches('{').trim_end(),
                );
                if caps.get(1).is_some() {
                    el.modifiers.push("export".to_string());
                }
                el.documentation = doc;
                structure.enums.push(el);
                index = end + 1;
                continue;
            }
            if let Some(caps) = VARIABLE.captures(line) {
                let mut el = CodeElement::new(
                    &caps[3],
                    ElementKind::Variable,
                    lineno,
                    lineno,
                    line,
                );
                if caps.get(1).is_some() {
                    el.modifiers.push("export".to_string());
                }
                el.modifiers.push(caps[2].to_string());
                el.documentation = doc;
                structure.variables.push(el);
            }
            index += 1;
        }
        structure
    }
}
