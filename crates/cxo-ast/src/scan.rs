// SPDX-License-Identifier: MIT OR Apache-2.0
//! Line-scanning helpers shared by the analyzers.
//!
//! Brace and indent tracking here is deliberately heuristic: braces inside
//! string literals or comments can skew a block end. That trade-off buys a
//! parser that never fails — malformed input degrades to fewer or shorter
//! elements, not an error.

/// Brace depth at the start of every line.
///
/// `depths[i]` is the nesting depth before any character of line `i` is
/// consumed.
#[must_use]
pub(crate) fn brace_depths(lines: &[&str]) -> Vec<i32> {
    let mut depths = Vec::with_capacity(lines.len());
    let mut depth = 0i32;
    for line in lines {
        depths.push(depth);
        for b in line.bytes() {
            match b {
                b'{' => depth += 1,
                b'}' => depth -= 1,
                _ => {}
            }
        }
    }
    depths
}

/// Index of the line that closes the block opened at `start`.
///
/// Scans forward from `start` for the first `{`, then returns the line on
/// which the matching `}` appears. Declarations with no block at all
/// (type aliases, one-line statements) end on their own line.
#[must_use]
pub(crate) fn block_end_by_braces(lines: &[&str], start: usize) -> usize {
    let mut depth = 0i32;
    let mut opened = false;
    for (offset, line) in lines[start..].iter().enumerate() {
        for b in line.bytes() {
            match b {
                b'{' => {
                    depth += 1;
                    opened = true;
                }
                b'}' => depth -= 1,
                _ => {}
            }
        }
        if opened && depth <= 0 {
            return start + offset;
        }
        // Statement-style declaration: no block before the terminator.
        if !opened && line.trim_end().ends_with(';') {
            return start + offset;
        }
    }
    if opened {
        lines.len().saturating_sub(1)
    } else {
        start
    }
}

/// Index of the last line belonging to an indentation block.
///
/// The block starts at `start` (a `def`/`class` line) with the given
/// indent; it extends through every following line that is blank or
/// indented deeper.
#[must_use]
pub(crate) fn block_end_by_indent(lines: &[&str], start: usize, indent: usize) -> usize {
    let mut end = start;
    for (offset, line) in lines[start + 1..].iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if leading_spaces(line) <= indent {
            break;
        }
        end = start + 1 + offset;
    }
    end
}

/// Number of leading space characters (tabs count as one).
#[must_use]
pub(crate) fn leading_spaces(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

/// Collect documentation and decorators immediately above `index`.
///
/// Decorator lines sit closest to the declaration; the doc block sits
/// above them. Returns `(documentation, decorators)` with decorators in
/// source order.
pub(crate) fn docs_and_decorators_above(
    lines: &[&str],
    index: usize,
    is_doc: impl Fn(&str) -> bool,
    is_decorator: impl Fn(&str) -> bool,
) -> (Option<String>, Vec<String>) {
    let mut cursor = index;
    let mut decorators: Vec<String> = Vec::new();
    while cursor > 0 && is_decorator(lines[cursor - 1].trim()) {
        decorators.push(lines[cursor - 1].trim().to_string());
        cursor -= 1;
    }
    decorators.reverse();

    let mut doc_lines: Vec<&str> = Vec::new();
    while cursor > 0 && is_doc(lines[cursor - 1].trim()) {
        doc_lines.push(lines[cursor - 1].trim());
        cursor -= 1;
    }
    doc_lines.reverse();

    let documentation = if doc_lines.is_empty() {
        None
    } else {
        Some(doc_lines.join("\n"))
    };
    (documentation, decorators)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brace_depths_track_nesting() {
        let lines = vec!["class A {", "  fn b() {", "  }", "}"];
        assert_eq!(brace_depths(&lines), vec![0, 1, 2, 1]);
    }

    #[test]
    fn block_end_finds_matching_brace() {
        let lines = vec!["function f() {", "  body();", "}", "after();"];
        assert_eq!(block_end_by_braces(&lines, 0), 2);
    }

    #[test]
    fn block_end_for_statement_is_terminator_line() {
        let lines = vec!["type X = string;", "next()"];
        assert_eq!(block_end_by_braces(&lines, 0), 0);
    }

    #[test]
    fn block_end_for_unclosed_block_is_last_line() {
        let lines = vec!["function f() {", "  body();"];
        assert_eq!(block_end_by_braces(&lines, 0), 1);
    }

    #[test]
    fn indent_block_spans_nested_lines_and_blanks() {
        let lines = vec!["def f():", "    a()", "", "    b()", "done()"];
        assert_eq!(block_end_by_indent(&lines, 0, 0), 3);
    }

    #[test]
    fn docs_and_decorators_collect_upward() {
        let lines = vec!["# doc line one", "# doc line two", "@wrap", "def f():"];
        let (doc, decorators) = docs_and_decorators_above(
            &lines,
            3,
            |l| l.starts_with('#') && !l.starts_with("#["),
            |l| l.starts_with('@'),
        );
        assert_eq!(doc.unwrap(), "# doc line one\n# doc line two");
        assert_eq!(decorators, vec!["@wrap"]);
    }
}
