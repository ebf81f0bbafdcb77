// SPDX-License-Identifier: MIT OR Apache-2.0
//! Log deduplication.
//!
//! Lines are normalized (timestamps, digits, and quoted spans become
//! placeholders) and grouped by the normalized key. Each group emits its
//! first-seen sample plus a repeat count; groups carrying errors sort
//! before warnings, which sort before the rest.

use crate::{compile_preserve, finalize, identity, is_preserved, CompressError, Compressor};
use cxo_core::{Blob, CancellationToken, CompressOptions, CompressedResult, ContentTag, DetailLevel};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static ISO_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:?\d{2})?")
        .expect("valid regex literal")
});

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'[^']*'|"[^"]*""#).expect("valid regex literal"));

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid regex literal"));

static ERROR_MARK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(error|fatal|panic)\b").expect("valid regex literal"));

static WARN_MARK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bwarn(ing)?\b").expect("valid regex literal"));

/// Normalize one log line for grouping. Timestamps collapse first so
/// their digits never survive into the key.
fn normalize_line(line: &str) -> String {
    let s = ISO_TIMESTAMP.replace_all(line, "TS");
    let s = QUOTED.replace_all(&s, "'X'");
    let s = DIGIT_RUN.replace_all(&s, "N");
    s.trim().to_string()
}

struct LineGroup {
    sample: String,
    first_index: usize,
    count: usize,
    has_error: bool,
    has_warning: bool,
    preserved: Vec<String>,
}

impl LineGroup {
    fn band(&self) -> u8 {
        if self.has_error {
            0
        } else if self.has_warning {
            1
        } else {
            2
        }
    }
}

/// Deduplicating log summarizer.
pub struct LogDedupe;

impl Compressor for LogDedupe {
    fn name(&self) -> &'static str {
        "log_dedupe"
    }

    fn content_types(&self) -> &'static [ContentTag] {
        &[ContentTag::Logs, ContentTag::Build]
    }

    fn can_compress(&self, blob: &Blob) -> bool {
        !blob.is_blank()
    }

    fn compress(
        &self,
        blob: &Blob,
        options: &CompressOptions,
        cancel: &CancellationToken,
    ) -> Result<CompressedResult, CompressError> {
        if blob.is_blank() {
            return Ok(identity(blob));
        }
        let preserve = compile_preserve(options)?;

        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, LineGroup> = HashMap::new();

        for (index, line) in blob.text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let preserved_line = is_preserved(line, &preserve);
            // Preserved lines must survive verbatim, so they are never
            // folded into a shared group.
            let key = if preserved_line {
                format!("\u{0}preserved:{index}")
            } else {
                normalize_line(line)
            };
            let group = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key.clone());
                LineGroup {
                    sample: line.to_string(),
                    first_index: index,
                    count: 0,
                    has_error: false,
                    has_warning: false,
                    preserved: Vec::new(),
                }
            });
            group.count += 1;
            // Flags come from the raw, unnormalized lines.
            group.has_error |= ERROR_MARK.is_match(line);
            group.has_warning |= WARN_MARK.is_match(line);
            if preserved_line {
                group.preserved.push(line.to_string());
            }
        }

        if cancel.is_cancelled() {
            return Err(CompressError::Cancelled);
        }

        let mut sorted: Vec<&LineGroup> = order
            .iter()
            .map(|k| &groups[k])
            .collect();
        sorted.sort_by_key(|g| (g.band(), g.first_index));

        let mut out_lines: Vec<String> = Vec::new();
        let mut collapsed_singletons: usize = 0;
        for group in sorted {
            if !group.preserved.is_empty() {
                out_lines.extend(group.preserved.iter().cloned());
            } else if group.count > 1 {
                out_lines.push(format!("{}  [x{}]", group.sample, group.count));
            } else if options.detail == DetailLevel::Minimal && !group.has_error {
                collapsed_singletons += 1;
            } else {
                out_lines.push(group.sample.clone());
            }
        }
        if collapsed_singletons > 0 {
            out_lines.push(format!("... {collapsed_singletons} unique lines omitted"));
        }

        Ok(finalize(blob, out_lines.join("\n"), self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, options: &CompressOptions) -> CompressedResult {
        LogDedupe
            .compress(&Blob::new(text), options, &CancellationToken::new())
            .unwrap()
    }

    #[test]
    fn normalization_collapses_timestamps_digits_and_quotes() {
        assert_eq!(
            normalize_line("2024-03-01T10:00:00Z [ERROR] Connection refused to 10.0.0.7:8080"),
            "TS [ERROR] Connection refused to N.N.N.N:N"
        );
        assert_eq!(
            normalize_line("loaded module 'auth' in 35 ms"),
            "loaded module 'X' in N ms"
        );
    }

    #[test]
    fn repeated_lines_fold_into_one_group_with_count() {
        let mut lines: Vec<String> = (0..90)
            .map(|i| format!("[ERROR] Connection refused to 10.0.0.{i}:{}", 8000 + i))
            .collect();
        lines.push("[INFO] server started".to_string());
        lines.push("unrelated singleton".to_string());
        let text = lines.join("\n");

        let result = run(&text, &CompressOptions::default());
        let out: Vec<&str> = result.text.lines().collect();
        assert_eq!(out.len(), 3);
        assert!(out[0].contains("[x90]"), "first line: {}", out[0]);
        assert!(out[0].contains("Connection refused"));
        // Error group first, then the two singletons in original order.
        assert!(out[1].contains("server started"));
        assert!(out[2].contains("unrelated singleton"));
        assert!(result.stats.compressed_tokens <= result.stats.original_tokens);
    }

    #[test]
    fn error_groups_sort_before_warning_groups() {
        let text = "[INFO] a\n[WARN] disk low\n[WARN] disk low\n[ERROR] boom\n[ERROR] boom\n";
        let result = run(text, &CompressOptions::default());
        let out: Vec<&str> = result.text.lines().collect();
        assert!(out[0].contains("[ERROR] boom"));
        assert!(out[1].contains("[WARN] disk low"));
        assert!(out[2].contains("[INFO] a"));
    }

    #[test]
    fn minimal_detail_collapses_singletons() {
        let text = "[INFO] one\n[INFO] two\n[INFO] three\n[ERROR] kept\n";
        let options = CompressOptions::with_detail(DetailLevel::Minimal);
        let result = run(text, &options);
        assert!(result.text.contains("[ERROR] kept"));
        assert!(result.text.contains("3 unique lines omitted"));
        assert!(!result.text.contains("[INFO] one"));
    }

    #[test]
    fn detailed_keeps_singletons_verbatim() {
        let text = "[INFO] one\n[INFO] two\n";
        let options = CompressOptions::with_detail(DetailLevel::Detailed);
        let result = run(text, &options);
        assert!(result.text.contains("[INFO] one"));
        assert!(result.text.contains("[INFO] two"));
    }

    #[test]
    fn preserved_lines_survive_verbatim() {
        let mut lines: Vec<String> = (0..20)
            .map(|i| format!("[INFO] request {i} served"))
            .collect();
        lines.insert(7, "[INFO] request 999 served trace_id=abc".to_string());
        let text = lines.join("\n");
        let options = CompressOptions {
            preserve: vec!["trace_id=".into()],
            ..CompressOptions::default()
        };
        let result = run(&text, &options);
        assert!(result.text.contains("trace_id=abc"));
    }

    #[test]
    fn cancelled_token_aborts() {
        let token = CancellationToken::new();
        token.cancel();
        let err = LogDedupe
            .compress(&Blob::new("[INFO] x"), &CompressOptions::default(), &token)
            .unwrap_err();
        assert!(matches!(err, CompressError::Cancelled));
    }

    #[test]
    fn identity_when_output_would_expand() {
        // Two distinct short lines cannot shrink; dedupe emits them as-is,
        // so the stats must never report expansion.
        let result = run("a\nb", &CompressOptions::default());
        assert!(result.stats.compressed_tokens <= result.stats.original_tokens);
    }
}
