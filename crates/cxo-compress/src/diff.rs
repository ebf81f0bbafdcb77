// SPDX-License-Identifier: MIT OR Apache-2.0
//! Unified-diff parsing and compression.
//!
//! Diffs are parsed into [`DiffFile`]s with git-style metadata, then
//! compressed by one of three strategies. Auto-selection degrades with
//! input size: a diff that fits the token budget passes through verbatim,
//! a moderately oversized one keeps hunk bodies, and anything larger
//! collapses to a per-file summary.

use crate::{finalize, identity, CompressError, Compressor};
use cxo_core::{Blob, CancellationToken, CompressOptions, CompressedResult, ContentTag};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Token budget assumed when the caller does not provide one.
const DEFAULT_MAX_TOKENS: u64 = 1500;

static DIFF_GIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^diff --git a/(.+) b/(.+)$").expect("valid regex literal"));

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("valid regex literal")
});

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]{2,}").expect("valid regex literal"));

/// Git-style file status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    /// Content changed in place.
    Modified,
    /// File is new.
    Added,
    /// File was removed.
    Deleted,
    /// File moved; content may also have changed.
    Renamed,
}

impl DiffStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Modified => "modified",
            Self::Added => "added",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
        }
    }
}

/// One contiguous change range within a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    /// Start line in the old file.
    pub old_start: u32,
    /// Line count in the old file.
    pub old_count: u32,
    /// Start line in the new file.
    pub new_start: u32,
    /// Line count in the new file.
    pub new_count: u32,
    /// Hunk body in unified format (`+`/`-`/space prefixes).
    pub content: String,
    /// Added-line count.
    pub additions: u32,
    /// Removed-line count.
    pub deletions: u32,
}

/// One file's worth of changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffFile {
    /// Path on the old side.
    pub old_path: String,
    /// Path on the new side.
    pub new_path: String,
    /// Change kind.
    pub status: DiffStatus,
    /// Whether git flagged the content as binary.
    pub is_binary: bool,
    /// Ordered hunks.
    pub hunks: Vec<DiffHunk>,
}

impl DiffFile {
    /// Display path: the new side, unless the file was deleted.
    #[must_use]
    pub fn path(&self) -> &str {
        if self.status == DiffStatus::Deleted {
            &self.old_path
        } else {
            &self.new_path
        }
    }

    /// Total added lines across hunks.
    #[must_use]
    pub fn additions(&self) -> u32 {
        self.hunks.iter().map(|h| h.additions).sum()
    }

    /// Total removed lines across hunks.
    #[must_use]
    pub fn deletions(&self) -> u32 {
        self.hunks.iter().map(|h| h.deletions).sum()
    }
}

/// Parse unified-diff text into per-file structures.
///
/// Tolerates both full `diff --git` output and bare `---`/`+++` diffs.
/// Unrecognized prose between files is skipped.
#[must_use]
pub fn parse_diff(text: &str) -> Vec<DiffFile> {
    let mut files: Vec<DiffFile> = Vec::new();

    fn push_line(files: &mut [DiffFile], line: &str) {
        if let Some(file) = files.last_mut() {
            if let Some(hunk) = file.hunks.last_mut() {
                match line.as_bytes().first() {
                    Some(b'+') => hunk.additions += 1,
                    Some(b'-') => hunk.deletions += 1,
                    _ => {}
                }
                if !hunk.content.is_empty() {
                    hunk.content.push('\n');
                }
                hunk.content.push_str(line);
            }
        }
    }

    for line in text.lines() {
        if let Some(caps) = DIFF_GIT.captures(line) {
            files.push(DiffFile {
                old_path: caps[1].to_string(),
                new_path: caps[2].to_string(),
                status: DiffStatus::Modified,
                is_binary: false,
                hunks: Vec::new(),
            });
            continue;
        }
        if let Some(caps) = HUNK_HEADER.captures(line) {
            if files.is_empty() {
                // Bare hunk with no file header at all.
                files.push(DiffFile {
                    old_path: String::new(),
                    new_path: String::new(),
                    status: DiffStatus::Modified,
                    is_binary: false,
                    hunks: Vec::new(),
                });
            }
            let parse = |m: Option<regex::Match<'_>>, default: u32| {
                m.map_or(default, |m| m.as_str().parse().unwrap_or(default))
            };
            if let Some(file) = files.last_mut() {
                file.hunks.push(DiffHunk {
                    old_start: parse(caps.get(1), 0),
                    old_count: parse(caps.get(2), 1),
                    new_start: parse(caps.get(3), 0),
                    new_count: parse(caps.get(4), 1),
                    content: String::new(),
                    additions: 0,
                    deletions: 0,
                });
            }
            continue;
        }

        if let Some(file) = files.last_mut() {
            if line.starts_with("new file mode") {
                file.status = DiffStatus::Added;
                continue;
            }
            if line.starts_with("deleted file mode") {
                file.status = DiffStatus::Deleted;
                continue;
            }
            if let Some(rest) = line.strip_prefix("rename from ") {
                file.status = DiffStatus::Renamed;
                file.old_path = rest.to_string();
                continue;
            }
            if let Some(rest) = line.strip_prefix("rename to ") {
                file.status = DiffStatus::Renamed;
                file.new_path = rest.to_string();
                continue;
            }
            if line.starts_with("Binary files ") && line.ends_with(" differ") {
                file.is_binary = true;
                continue;
            }
        }

        if let Some(rest) = line.strip_prefix("--- ") {
            let in_hunk = files
                .last()
                .and_then(|f| f.hunks.last())
                .is_some_and(|h| hunk_is_open(h));
            if in_hunk {
                push_line(&mut files, line);
                continue;
            }
            let path = rest.strip_prefix("a/").unwrap_or(rest);
            let needs_new_file = files.last().is_none_or(|f| !f.hunks.is_empty());
            if needs_new_file {
                files.push(DiffFile {
                    old_path: String::new(),
                    new_path: String::new(),
                    status: DiffStatus::Modified,
                    is_binary: false,
                    hunks: Vec::new(),
                });
            }
            if let Some(file) = files.last_mut() {
                if file.old_path.is_empty() {
                    if rest == "/dev/null" {
                        file.status = DiffStatus::Added;
                    } else {
                        file.old_path = path.to_string();
                    }
                }
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("+++ ") {
            let path = rest.strip_prefix("b/").unwrap_or(rest);
            if let Some(file) = files.last_mut() {
                if file.hunks.is_empty() {
                    if rest == "/dev/null" {
                        file.status = DiffStatus::Deleted;
                    } else if file.new_path.is_empty() {
                        file.new_path = path.to_string();
                    }
                    continue;
                }
            }
            push_line(&mut files, line);
            continue;
        }

        match line.as_bytes().first() {
            Some(b' ') | Some(b'+') | Some(b'-') | Some(b'\\') => push_line(&mut files, line),
            _ => {}
        }
    }

    files.retain(|f| !f.hunks.is_empty() || f.is_binary || f.status != DiffStatus::Modified);
    files
}

/// An open hunk still expects more body lines.
fn hunk_is_open(hunk: &DiffHunk) -> bool {
    let seen = hunk.content.lines().count() as u32;
    seen < hunk.old_count + hunk.new_count
}

/// Compression strategy for diffs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum DiffStrategy {
    /// Pick by token budget.
    #[default]
    Auto,
    /// Keep hunk bodies, trim context.
    HunksOnly,
    /// One line per file plus totals.
    Summary,
    /// Keep hunks with identifiers unique to them, budget-bounded.
    Semantic,
}

/// Budget-aware diff compressor.
pub struct DiffCompress;

impl DiffCompress {
    /// Compress with an explicit strategy instead of auto-selection.
    pub fn compress_with_strategy(
        &self,
        blob: &Blob,
        options: &CompressOptions,
        strategy: DiffStrategy,
        cancel: &CancellationToken,
    ) -> Result<CompressedResult, CompressError> {
        if blob.is_blank() {
            return Ok(identity(blob));
        }
        let files = parse_diff(&blob.text);
        if files.is_empty() {
            return Err(CompressError::UnparseableInput {
                expected: "a unified diff",
            });
        }
        if cancel.is_cancelled() {
            return Err(CompressError::Cancelled);
        }

        let budget = options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        let original_tokens = cxo_tokenizer::count(&blob.text);

        let strategy = match strategy {
            DiffStrategy::Auto => {
                if original_tokens <= budget {
                    return Ok(identity(blob));
                } else if original_tokens <= budget.saturating_mul(3) {
                    DiffStrategy::HunksOnly
                } else {
                    DiffStrategy::Summary
                }
            }
            other => other,
        };

        let candidate = match strategy {
            DiffStrategy::HunksOnly => render_hunks(&files, options.context_lines),
            DiffStrategy::Summary => render_summary(&files),
            DiffStrategy::Semantic => {
                let selected = select_semantic(&files, budget);
                match selected {
                    Some(text) => text,
                    // Even the unique-identifier hunks blow the budget.
                    None => render_summary(&files),
                }
            }
            DiffStrategy::Auto => unreachable!("auto resolved above"),
        };
        let technique = match strategy {
            DiffStrategy::HunksOnly => "diff_hunks",
            DiffStrategy::Summary => "diff_summary",
            DiffStrategy::Semantic => "diff_semantic",
            DiffStrategy::Auto => unreachable!("auto resolved above"),
        };
        Ok(finalize(blob, candidate, technique))
    }
}

impl Compressor for DiffCompress {
    fn name(&self) -> &'static str {
        "diff_compress"
    }

    fn content_types(&self) -> &'static [ContentTag] {
        &[ContentTag::Diff]
    }

    fn can_compress(&self, blob: &Blob) -> bool {
        !parse_diff(&blob.text).is_empty()
    }

    fn compress(
        &self,
        blob: &Blob,
        options: &CompressOptions,
        cancel: &CancellationToken,
    ) -> Result<CompressedResult, CompressError> {
        self.compress_with_strategy(blob, options, DiffStrategy::Auto, cancel)
    }
}

/// Keep hunk bodies, trimming context to `context_lines` around changes.
fn render_hunks(files: &[DiffFile], context_lines: usize) -> String {
    let mut out: Vec<String> = Vec::new();
    for file in files {
        out.push(format!("{} ({}):", file.path(), file.status.as_str()));
        if file.is_binary {
            out.push("  (binary)".to_string());
            continue;
        }
        for hunk in &file.hunks {
            out.push(format!(
                "@@ -{},{} +{},{} @@",
                hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
            ));
            out.extend(trim_context(&hunk.content, context_lines));
        }
    }
    out.join("\n")
}

/// Keep changed lines plus `context_lines` of surrounding context; elide
/// the rest with a gap marker.
fn trim_context(content: &str, context_lines: usize) -> Vec<String> {
    let lines: Vec<&str> = content.lines().collect();
    let changed: Vec<bool> = lines
        .iter()
        .map(|l| l.starts_with('+') || l.starts_with('-'))
        .collect();

    let mut keep = vec![false; lines.len()];
    for (i, &is_changed) in changed.iter().enumerate() {
        if is_changed {
            let lo = i.saturating_sub(context_lines);
            let hi = (i + context_lines + 1).min(lines.len());
            for flag in &mut keep[lo..hi] {
                *flag = true;
            }
        }
    }

    let mut out = Vec::new();
    let mut in_gap = false;
    for (i, line) in lines.iter().enumerate() {
        if keep[i] {
            out.push((*line).to_string());
            in_gap = false;
        } else if !in_gap {
            out.push("  ...".to_string());
            in_gap = true;
        }
    }
    out
}

/// One line per file plus aggregate totals.
fn render_summary(files: &[DiffFile]) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut total_additions: u64 = 0;
    let mut total_deletions: u64 = 0;
    for file in files {
        let additions = file.additions();
        let deletions = file.deletions();
        total_additions += u64::from(additions);
        total_deletions += u64::from(deletions);
        out.push(format!(
            "{} +{} -{} ({})",
            file.path(),
            additions,
            deletions,
            file.status.as_str()
        ));
    }
    out.push(format!(
        "{} files changed, +{} -{}",
        files.len(),
        total_additions,
        total_deletions
    ));
    out.join("\n")
}

/// Keep hunks carrying identifiers that appear nowhere else in the diff,
/// under the token budget. Returns `None` when the selection itself
/// exceeds the budget.
fn select_semantic(files: &[DiffFile], budget: u64) -> Option<String> {
    // Count identifier occurrences across every hunk's changed lines.
    let mut global: HashMap<&str, usize> = HashMap::new();
    let mut per_hunk: Vec<(usize, usize, HashMap<&str, usize>)> = Vec::new();

    for (fi, file) in files.iter().enumerate() {
        for (hi, hunk) in file.hunks.iter().enumerate() {
            let mut local: HashMap<&str, usize> = HashMap::new();
            for line in hunk.content.lines() {
                if !(line.starts_with('+') || line.starts_with('-')) {
                    continue;
                }
                for m in IDENTIFIER.find_iter(line) {
                    *local.entry(m.as_str()).or_default() += 1;
                    *global.entry(m.as_str()).or_default() += 1;
                }
            }
            per_hunk.push((fi, hi, local));
        }
    }

    let mut out: Vec<String> = Vec::new();
    let mut spent: u64 = 0;
    let mut last_file: Option<usize> = None;
    for (fi, hi, local) in &per_hunk {
        let unique = local.iter().any(|(ident, n)| global[ident] == *n);
        if !unique {
            continue;
        }
        let file = &files[*fi];
        let hunk = &file.hunks[*hi];
        let mut piece = String::new();
        if last_file != Some(*fi) {
            piece.push_str(&format!("{} ({}):\n", file.path(), file.status.as_str()));
        }
        piece.push_str(&format!(
            "@@ -{},{} +{},{} @@\n{}",
            hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count, hunk.content
        ));
        let cost = cxo_tokenizer::count(&piece);
        if spent + cost > budget {
            return None;
        }
        spent += cost;
        last_file = Some(*fi);
        out.push(piece);
    }
    if out.is_empty() {
        return None;
    }
    Some(out.join("\n"))
}
