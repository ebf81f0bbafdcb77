// SPDX-License-Identifier: MIT OR Apache-2.0
//! TF-IDF line selection for code and free-form text.
//!
//! Each line is scored by summed TF-IDF over its whitespace-separated
//! terms, with a large boost for lines matching a preserve pattern. The
//! highest-scoring lines are kept, in original order, until the target
//! token ratio is met.

use crate::{compile_preserve, finalize, identity, is_preserved, CompressError, Compressor};
use cxo_core::{Blob, CancellationToken, CompressOptions, CompressedResult, ContentTag};
use std::collections::HashMap;

/// Ratio assumed when the caller does not provide one.
const DEFAULT_TARGET_RATIO: f64 = 0.3;

/// Score boost for preserve-pattern matches; large enough to outrank any
/// realistic TF-IDF sum.
const PRESERVE_BOOST: f64 = 1e6;

/// TF-IDF line selector.
pub struct SemanticSelect;

impl Compressor for SemanticSelect {
    fn name(&self) -> &'static str {
        "semantic_select"
    }

    fn content_types(&self) -> &'static [ContentTag] {
        &[ContentTag::Code, ContentTag::Generic, ContentTag::Stacktrace]
    }

    fn can_compress(&self, blob: &Blob) -> bool {
        blob.line_count() > 1
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
        let lines: Vec<&str> = blob.text.lines().collect();
        if lines.len() <= 1 {
            return Ok(identity(blob));
        }

        // Document frequency over lines.
        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        let term_rows: Vec<Vec<&str>> = lines
            .iter()
            .map(|line| {
                let terms: Vec<&str> = line.split_whitespace().collect();
                let mut seen: Vec<&str> = Vec::new();
                for &term in &terms {
                    if !seen.contains(&term) {
                        seen.push(term);
                        *document_frequency.entry(term).or_default() += 1;
                    }
                }
                terms
            })
            .collect();

        if cancel.is_cancelled() {
            return Err(CompressError::Cancelled);
        }

        let line_total = lines.len() as f64;
        let scores: Vec<f64> = term_rows
            .iter()
            .zip(&lines)
            .map(|(terms, line)| {
                if is_preserved(line, &preserve) {
                    return PRESERVE_BOOST;
                }
                if terms.is_empty() {
                    return 0.0;
                }
                let mut term_frequency: HashMap<&str, f64> = HashMap::new();
                for &term in terms {
                    *term_frequency.entry(term).or_default() += 1.0;
                }
                term_frequency
                    .iter()
                    .map(|(term, tf)| {
                        let df = document_frequency[term] as f64;
                        tf / terms.len() as f64 * (line_total / (1.0 + df)).ln()
                    })
                    .sum()
            })
            .collect();

        // Rank by score, ties broken toward the earlier line.
        let mut ranked: Vec<usize> = (0..lines.len()).collect();
        ranked.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });

        let original_tokens = cxo_tokenizer::count(&blob.text);
        let ratio = options.target_ratio.unwrap_or(DEFAULT_TARGET_RATIO);
        let budget = (original_tokens as f64 * ratio).ceil() as u64;

        let mut selected = vec![false; lines.len()];
        let mut spent: u64 = 0;
        for &index in &ranked {
            let cost = cxo_tokenizer::count(lines[index]);
            if spent + cost > budget && spent > 0 {
                // Preserved lines are exempt from the budget.
                if scores[index] < PRESERVE_BOOST {
                    continue;
                }
            }
            selected[index] = true;
            spent += cost;
        }

        let candidate: Vec<&str> = lines
            .iter()
            .enumerate()
            .filter(|(i, _)| selected[*i])
            .map(|(_, l)| *l)
            .collect();
        Ok(finalize(blob, candidate.join("\n"), self.name()))
    }
}
