// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stack-trace deduplication.
//!
//! Input text is split into individual traces (JS `at` frames, Python
//! tracebacks, Rust panics). Traces whose canonical top-of-stack frames
//! match fold into one group; each group emits a single representative
//! trace plus a repeat count.

use crate::{finalize, identity, CompressError, Compressor};
use cxo_core::{Blob, CancellationToken, CompressOptions, CompressedResult, ContentTag, DetailLevel};
use regex::Regex;
use std::sync::LazyLock;

/// Frames compared when deciding whether two traces are the same failure.
const CANONICAL_DEPTH: usize = 3;

/// Frames kept per emitted trace below `detailed`.
const MAX_EMITTED_FRAMES: usize = 10;

static JS_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[A-Za-z_][A-Za-z0-9_]*)?(?:Error|Exception):").expect("valid regex literal")
});

static JS_FRAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+at\s+(.+)$").expect("valid regex literal"));

static PY_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Traceback \(most recent call last\):").expect("valid regex literal")
});

static PY_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s+File "(.+)", line (\d+), in (.+)$"#).expect("valid regex literal")
});

static RUST_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^thread '[^']*' panicked at").expect("valid regex literal"));

static RUST_FRAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+:\s+(.+)$").expect("valid regex literal"));

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid regex literal"));

#[derive(Debug)]
struct Trace {
    /// Every line of the trace, in input order.
    lines: Vec<String>,
    /// Line indices (into `lines`) that are stack frames.
    frame_indices: Vec<usize>,
    /// Canonical frame texts, most-recent call first.
    canonical: Vec<String>,
    /// Whether the trace opened with a recognized header line.
    has_header: bool,
}

impl Trace {
    fn key(&self) -> String {
        self.canonical
            .iter()
            .take(CANONICAL_DEPTH)
            .cloned()
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Normalize a frame for grouping: line/column numbers collapse so two
/// runs of the same failure with shifted line numbers still match.
fn canonical_frame(frame: &str) -> String {
    DIGIT_RUN.replace_all(frame.trim(), "N").to_string()
}

/// Split raw text into traces. A trace starts at a recognized header (or
/// at a leading orphan frame block) and extends until the next header.
fn split_traces(text: &str) -> Vec<Trace> {
    let mut traces: Vec<Trace> = Vec::new();
    let mut current: Option<Trace> = None;

    // Python frames are listed outermost-first, so their canonical
    // orientation is reversed at flush time.
    let mut current_is_python = false;

    let mut flush = |trace: Option<Trace>, is_python: bool, out: &mut Vec<Trace>| {
        if let Some(mut t) = trace {
            if is_python {
                t.canonical.reverse();
            }
            if !t.lines.is_empty() {
                out.push(t);
            }
        }
    };

    for line in text.lines() {
        let is_header =
            JS_HEADER.is_match(line) || PY_HEADER.is_match(line) || RUST_HEADER.is_match(line);
        if is_header {
            // A python traceback terminates with its exception line
            // (`ValueError: ...`); that line belongs to the current trace
            // rather than opening a new one.
            if current_is_python && !PY_HEADER.is_match(line) && !RUST_HEADER.is_match(line) {
                if let Some(trace) = current.as_mut() {
                    trace.lines.push(line.to_string());
                }
                flush(current.take(), true, &mut traces);
                current_is_python = false;
                continue;
            }
            flush(current.take(), current_is_python, &mut traces);
            current_is_python = PY_HEADER.is_match(line);
            current = Some(Trace {
                lines: vec![line.to_string()],
                frame_indices: Vec::new(),
                canonical: Vec::new(),
                has_header: true,
            });
            continue;
        }

        let frame = JS_FRAME
            .captures(line)
            .map(|c| c[1].to_string())
            .or_else(|| PY_FRAME.captures(line).map(|c| format!("{} in {}", &c[1], &c[3])))
            .or_else(|| RUST_FRAME.captures(line).map(|c| c[1].to_string()));

        match current.as_mut() {
            Some(trace) => {
                if let Some(frame) = frame {
                    trace.frame_indices.push(trace.lines.len());
                    trace.canonical.push(canonical_frame(&frame));
                }
                trace.lines.push(line.to_string());
            }
            None => {
                if line.trim().is_empty() {
                    continue;
                }
                // Orphan content before any header starts an anonymous trace.
                let mut trace = Trace {
                    lines: Vec::new(),
                    frame_indices: Vec::new(),
                    canonical: Vec::new(),
                    has_header: false,
                };
                if let Some(frame) = frame {
                    trace.frame_indices.push(0);
                    trace.canonical.push(canonical_frame(&frame));
                }
                trace.lines.push(line.to_string());
                current = Some(trace);
                current_is_python = false;
            }
        }
    }
    flush(current.take(), current_is_python, &mut traces);
    traces
}

/// Render one representative trace, trimming frame depth below `detailed`.
fn render_trace(trace: &Trace, count: usize, detail: DetailLevel) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let keep_all = detail == DetailLevel::Detailed;
    let mut emitted_frames = 0usize;
    let mut dropped_frames = 0usize;
    let mut in_dropped_region = false;

    for (index, line) in trace.lines.iter().enumerate() {
        if trace.frame_indices.contains(&index) {
            if keep_all || emitted_frames < MAX_EMITTED_FRAMES {
                lines.push(line.clone());
                emitted_frames += 1;
                in_dropped_region = false;
            } else {
                dropped_frames += 1;
                in_dropped_region = true;
            }
        } else if !in_dropped_region {
            lines.push(line.clone());
        }
    }
    if dropped_frames > 0 {
        lines.push(format!("    ... {dropped_frames} more frames"));
        // A python trace ends with its exception line; restore it if the
        // drop region swallowed it.
        let last_index = trace.lines.len() - 1;
        if !trace.frame_indices.contains(&last_index) && in_dropped_region {
            if let Some(last) = trace.lines.last() {
                lines.push(last.clone());
            }
        }
    }
    if count > 1 {
        lines.push(format!("[repeated {count}x]"));
    }
    lines
}

/// Deduplicating stack-trace summarizer.
pub struct StackDedupe;

impl Compressor for StackDedupe {
    fn name(&self) -> &'static str {
        "stack_dedupe"
    }

    fn content_types(&self) -> &'static [ContentTag] {
        &[ContentTag::Stacktrace]
    }

    fn can_compress(&self, blob: &Blob) -> bool {
        JS_FRAME.is_match(&blob.text)
            || PY_HEADER.is_match(&blob.text)
            || RUST_HEADER.is_match(&blob.text)
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
        let traces = split_traces(&blob.text);
        let recognizable = traces
            .iter()
            .any(|t| t.has_header || !t.canonical.is_empty());
        if traces.is_empty() || !recognizable {
            return Err(CompressError::UnparseableInput {
                expected: "stack traces",
            });
        }

        if cancel.is_cancelled() {
            return Err(CompressError::Cancelled);
        }

        // Group by canonical key, insertion-ordered.
        let mut order: Vec<String> = Vec::new();
        let mut representative: Vec<&Trace> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();
        for trace in &traces {
            let key = trace.key();
            match order.iter().position(|k| *k == key) {
                Some(i) => counts[i] += 1,
                None => {
                    order.push(key);
                    representative.push(trace);
                    counts.push(1);
                }
            }
        }

        let mut out_lines: Vec<String> = Vec::new();
        for (i, trace) in representative.iter().enumerate() {
            if i > 0 {
                out_lines.push(String::new());
            }
            out_lines.extend(render_trace(trace, counts[i], options.detail));
        }

        Ok(finalize(blob, out_lines.join("\n"), self.name()))
    }
}
