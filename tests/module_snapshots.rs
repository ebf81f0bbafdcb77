// SPDX-License-Identifier: MIT OR Apache-2.0
//! Inline snapshots of rendered, user-visible output.

use cxo_compress::{DiffCompress, DiffStrategy};
use cxo_core::{Blob, CancellationToken, CompressOptions};
use cxo_tools::{ToolContext, ToolRegistry};

#[test]
fn deduplicated_build_report_snapshot() {
    let output = "src/a.ts(12,5): error TS2304: Cannot find name 'foo'.\nsrc/b.ts(3,1): error TS2304: Cannot find name 'bar'.";
    let errors = cxo_build::default_registry().parse(output);
    let rendered = cxo_build::render_groups(&cxo_build::group_errors(&errors));
    insta::assert_snapshot!(rendered.trim_end(), @r"
2 diagnostics in 1 groups

[2x] error TS2304: Cannot find name 'foo'.
  files: src/a.ts, src/b.ts
  hint: 'foo' is not in scope; declare it or add the missing import
");
}

#[test]
fn diff_summary_snapshot() {
    let diff = "diff --git a/src/app.rs b/src/app.rs\n--- a/src/app.rs\n+++ b/src/app.rs\n@@ -1,2 +1,3 @@\n fn keep() {}\n+fn added() {}\n-fn removed() {}\ndiff --git a/src/gone.rs b/src/gone.rs\ndeleted file mode 100644\n--- a/src/gone.rs\n+++ /dev/null\n@@ -1,1 +0,0 @@\n-fn old() {}\n";
    let result = DiffCompress
        .compress_with_strategy(
            &Blob::new(diff),
            &CompressOptions::default(),
            DiffStrategy::Summary,
            &CancellationToken::new(),
        )
        .unwrap();
    insta::assert_snapshot!(result.text, @r"
src/app.rs +1 -1 (modified)
src/gone.rs +0 -1 (deleted)
2 files changed, +1 -2
");
}

#[test]
fn tool_listing_snapshot() {
    let registry = ToolRegistry::with_defaults(ToolContext::new("/work"));
    let listing: Vec<String> = registry
        .list()
        .iter()
        .map(|t| t.name.clone())
        .collect();
    insta::assert_snapshot!(listing.join("\n"), @r"
analyze_build_output
compress_context
deduplicate_errors
diff_compress
extract_code
get_session_stats
parse_file
search_code
semantic_compress
summarize_logs
");
}
