// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error grouping and per-code suggestions.

use crate::parsed::{ParsedError, Severity};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Maximum raw sample lines kept per group.
const MAX_SAMPLES: usize = 3;

/// An equivalence class of diagnostics sharing a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorGroup {
    /// The shared signature.
    pub signature: String,
    /// How many diagnostics fold into this group.
    pub count: usize,
    /// Severity of the group (taken from the first occurrence).
    pub severity: Severity,
    /// The first diagnostic seen with this signature.
    pub first: ParsedError,
    /// Affected files, deduplicated in insertion order.
    pub files: Vec<String>,
    /// Up to three raw sample lines.
    pub samples: Vec<String>,
    /// Fix hint for recognized diagnostic codes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Fold diagnostics into groups keyed by signature.
///
/// Output ordering: errors first, then warnings, then the rest; ties are
/// broken by first occurrence.
#[must_use]
pub fn group_errors(errors: &[ParsedError]) -> Vec<ErrorGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, ErrorGroup> = HashMap::new();

    for error in errors {
        if let Some(group) = groups.get_mut(&error.signature) {
            group.count += 1;
            if !error.file.is_empty() && !group.files.contains(&error.file) {
                group.files.push(error.file.clone());
            }
            if group.samples.len() < MAX_SAMPLES {
                group.samples.push(error.raw.clone());
            }
        } else {
            order.push(error.signature.clone());
            let mut files = Vec::new();
            if !error.file.is_empty() {
                files.push(error.file.clone());
            }
            groups.insert(
                error.signature.clone(),
                ErrorGroup {
                    signature: error.signature.clone(),
                    count: 1,
                    severity: error.severity,
                    first: error.clone(),
                    files,
                    samples: vec![error.raw.clone()],
                    suggestion: suggestion_for(&error.code, &error.message),
                },
            );
        }
    }

    let mut result: Vec<ErrorGroup> = order
        .into_iter()
        .map(|sig| groups.remove(&sig).expect("group recorded for signature"))
        .collect();
    // Stable sort keeps first-occurrence order within a severity band.
    result.sort_by_key(|g| g.severity);
    result
}

/// Render groups as a deduplicated report.
#[must_use]
pub fn render_groups(groups: &[ErrorGroup]) -> String {
    let mut out = String::new();
    let total: usize = groups.iter().map(|g| g.count).sum();
    out.push_str(&format!(
        "{} diagnostics in {} groups\n",
        total,
        groups.len()
    ));
    for group in groups {
        let severity = match group.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        out.push_str(&format!(
            "\n[{}x] {} {}: {}\n",
            group.count, severity, group.first.code, group.first.message
        ));
        if !group.files.is_empty() {
            out.push_str(&format!("  files: {}\n", group.files.join(", ")));
        }
        if let Some(ref suggestion) = group.suggestion {
            out.push_str(&format!("  hint: {suggestion}\n"));
        }
    }
    out
}

static FIRST_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'([^']+)'|"([^"]+)""#).expect("valid regex literal"));

/// Fix hint for a recognized diagnostic code. Unknown codes get none.
#[must_use]
pub fn suggestion_for(code: &str, message: &str) -> Option<String> {
    let subject = FIRST_QUOTED
        .captures(message)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str());

    let text = match code {
        "TS2304" => match subject {
            Some(name) => format!("'{name}' is not in scope; declare it or add the missing import"),
            None => "name is not in scope; declare it or add the missing import".to_string(),
        },
        "TS2339" => match subject {
            Some(name) => format!("property '{name}' does not exist; check the spelling or extend the type"),
            None => "property does not exist; check the spelling or extend the type".to_string(),
        },
        "TS2345" => "argument type mismatch; check the parameter types at the call site".to_string(),
        "TS2322" => "value is not assignable; adjust the annotation or the value".to_string(),
        "TS7006" => "parameter implicitly has type 'any'; add an explicit annotation".to_string(),
        "TS2307" => match subject {
            Some(name) => format!("module '{name}' not found; verify the path or install the package"),
            None => "module not found; verify the path or install the package".to_string(),
        },
        "TS1005" => "a token is missing; check the syntax near the reported position".to_string(),
        "TS2551" => "probable typo; use the name suggested by the compiler".to_string(),
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::{ToolOutputParser, TypeScriptParser};

    fn err(code: &str, msg: &str, file: &str, severity: Severity) -> ParsedError {
        ParsedError::new(code, msg, file, 1, 1, severity, format!("{file}: {msg}"))
    }

    #[test]
    fn same_signature_folds_into_one_group() {
        let errors = vec![
            err("TS2304", "Cannot find name 'foo'.", "src/a.ts", Severity::Error),
            err("TS2304", "Cannot find name 'bar'.", "src/b.ts", Severity::Error),
        ];
        let groups = group_errors(&errors);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[0].files, vec!["src/a.ts", "src/b.ts"]);
        assert_eq!(groups[0].first.message, "Cannot find name 'foo'.");
        let suggestion = groups[0].suggestion.as_deref().unwrap();
        assert!(suggestion.contains("foo"), "suggestion should mention the first subject: {suggestion}");
    }

    #[test]
    fn errors_sort_before_warnings() {
        let errors = vec![
            err("TS6133", "unused variable 'a'", "w.ts", Severity::Warning),
            err("TS2304", "Cannot find name 'b'.", "e.ts", Severity::Error),
        ];
        let groups = group_errors(&errors);
        assert_eq!(groups[0].severity, Severity::Error);
        assert_eq!(groups[1].severity, Severity::Warning);
    }

    #[test]
    fn ties_break_by_first_occurrence() {
        let errors = vec![
            err("TS2304", "Cannot find name 'a'.", "1.ts", Severity::Error),
            err("TS2339", "Property 'x' does not exist on type 'Y'.", "2.ts", Severity::Error),
        ];
        let groups = group_errors(&errors);
        assert_eq!(groups[0].first.code, "TS2304");
        assert_eq!(groups[1].first.code, "TS2339");
    }

    #[test]
    fn files_deduplicate_in_insertion_order() {
        let errors = vec![
            err("TS2304", "Cannot find name 'a'.", "x.ts", Severity::Error),
            err("TS2304", "Cannot find name 'b'.", "x.ts", Severity::Error),
            err("TS2304", "Cannot find name 'c'.", "y.ts", Severity::Error),
        ];
        let groups = group_errors(&errors);
        assert_eq!(groups[0].files, vec!["x.ts", "y.ts"]);
    }

    #[test]
    fn samples_cap_at_three() {
        let errors: Vec<ParsedError> = (0..5)
            .map(|i| err("TS2304", &format!("Cannot find name 'v{i}'."), "f.ts", Severity::Error))
            .collect();
        let groups = group_errors(&errors);
        assert_eq!(groups[0].count, 5);
        assert_eq!(groups[0].samples.len(), 3);
    }

    #[test]
    fn unknown_codes_emit_no_suggestion() {
        assert!(suggestion_for("TS9999", "whatever").is_none());
        assert!(suggestion_for("E0308", "mismatched types").is_none());
    }

    #[test]
    fn all_known_codes_emit_suggestions() {
        for code in ["TS2304", "TS2339", "TS2345", "TS2322", "TS7006", "TS2307", "TS1005", "TS2551"] {
            assert!(suggestion_for(code, "msg 'thing'").is_some(), "missing suggestion for {code}");
        }
    }

    #[test]
    fn end_to_end_dedupe_scenario() {
        let output = "src/a.ts(12,5): error TS2304: Cannot find name 'foo'.\nsrc/b.ts(3,1): error TS2304: Cannot find name 'bar'.";
        let errors = TypeScriptParser.parse(output);
        let groups = group_errors(&errors);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[0].signature, "TS2304:Cannot find name 'X'.");
        let rendered = render_groups(&groups);
        assert!(rendered.contains("[2x] error TS2304"));
        assert!(rendered.contains("src/a.ts, src/b.ts"));
    }
}
