// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration compaction.

use crate::{finalize, identity, CompressError, Compressor};
use cxo_core::{Blob, CancellationToken, CompressOptions, CompressedResult, ContentTag};

/// Whitespace and comment stripper for configuration content.
///
/// JSON is re-emitted without insignificant whitespace, preserving key
/// order. Anything else is treated as YAML-ish: full-line comments and
/// blank lines are dropped, structure is left untouched.
pub struct ConfigCompact;

impl Compressor for ConfigCompact {
    fn name(&self) -> &'static str {
        "config_compact"
    }

    fn content_types(&self) -> &'static [ContentTag] {
        &[ContentTag::Config]
    }

    fn can_compress(&self, blob: &Blob) -> bool {
        !blob.is_blank()
    }

    fn compress(
        &self,
        blob: &Blob,
        _options: &CompressOptions,
        cancel: &CancellationToken,
    ) -> Result<CompressedResult, CompressError> {
        if blob.is_blank() {
            return Ok(identity(blob));
        }
        if cancel.is_cancelled() {
            return Err(CompressError::Cancelled);
        }

        let trimmed = blob.text.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
                let compact = serde_json::to_string(&value)
                    .expect("a parsed Value re-serializes");
                return Ok(finalize(blob, compact, "json_compact"));
            }
        }

        let kept: Vec<&str> = blob
            .text
            .lines()
            .filter(|line| {
                let t = line.trim();
                !t.is_empty() && !t.starts_with('#')
            })
            .collect();
        Ok(finalize(blob, kept.join("\n"), self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> CompressedResult {
        ConfigCompact
            .compress(
                &Blob::new(text),
                &CompressOptions::default(),
                &CancellationToken::new(),
            )
            .unwrap()
    }

    #[test]
    fn json_loses_insignificant_whitespace() {
        let text = "{\n  \"name\": \"demo\",\n  \"nested\": {\n    \"a\": 1\n  }\n}";
        let result = run(text);
        assert_eq!(result.text, r#"{"name":"demo","nested":{"a":1}}"#);
        assert_eq!(result.stats.technique, "json_compact");
    }

    #[test]
    fn json_key_order_is_preserved() {
        let text = r#"{"zebra": 1, "alpha": 2, "middle": 3}"#;
        let result = run(text);
        let z = result.text.find("zebra").unwrap();
        let a = result.text.find("alpha").unwrap();
        let m = result.text.find("middle").unwrap();
        assert!(z < a && a < m, "key order changed: {}", result.text);
    }

    #[test]
    fn yaml_loses_comments_and_blank_lines() {
        let text = "# top comment\nname: demo\n\n# section\nversion: 1.0.0\n  # indented comment\nport: 8080\n";
        let result = run(text);
        assert_eq!(result.text, "name: demo\nversion: 1.0.0\nport: 8080");
    }

    #[test]
    fn malformed_json_falls_back_to_line_stripping() {
        let text = "{not json\n# comment\nkey: value";
        let result = run(text);
        assert!(result.text.contains("key: value"));
        assert!(!result.text.contains("# comment"));
    }

    #[test]
    fn already_compact_json_is_identity_shaped() {
        let text = r#"{"a":1}"#;
        let result = run(text);
        assert_eq!(result.text, text);
        assert_eq!(result.stats.reduction_percent, 0.0);
    }
}
