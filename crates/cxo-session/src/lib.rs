// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-session token accounting and command history.
//!
//! A [`SessionTracker`] owns every live session. All mutation goes
//! through it, one locked call at a time, so concurrent tool invocations
//! sharing a session serialize their updates; sessions never observe each
//! other.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use tracing::debug;

/// How many trailing commands are scanned for retry detection.
const RETRY_WINDOW: usize = 3;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One recorded tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CommandRecord {
    /// Tool that ran.
    pub tool: String,
    /// When it ran.
    pub at: DateTime<Utc>,
    /// Tokens entering the tool.
    pub tokens_in: u64,
    /// Tokens leaving the tool.
    pub tokens_out: u64,
    /// Tokens removed by compression.
    pub tokens_saved: u64,
    /// Whether output was filtered / truncated.
    pub was_filtered: bool,
}

/// Project a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProjectBinding {
    /// Display name.
    pub name: String,
    /// Project root path.
    pub root: String,
}

/// Accumulated state for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SessionState {
    /// Caller-supplied (or generated) id.
    pub session_id: String,
    /// Session start time.
    pub started_at: DateTime<Utc>,
    /// Every recorded command, oldest first.
    pub commands: Vec<CommandRecord>,
    /// Running input-token total.
    pub tokens_in: u64,
    /// Running output-token total.
    pub tokens_out: u64,
    /// Running saved-token total.
    pub tokens_saved: u64,
    /// Distinct build-error signatures seen this session.
    pub unique_error_signatures: BTreeSet<String>,
    /// Times the same tool re-ran within the trailing window.
    pub retry_pattern_count: u64,
    /// Bound project, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectBinding>,
    /// Registered model id, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl SessionState {
    fn new(session_id: String) -> Self {
        Self {
            session_id,
            started_at: Utc::now(),
            commands: Vec::new(),
            tokens_in: 0,
            tokens_out: 0,
            tokens_saved: 0,
            unique_error_signatures: BTreeSet::new(),
            retry_pattern_count: 0,
            project: None,
            model: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Stats views
// ---------------------------------------------------------------------------

/// Full statistics view over a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SessionStats {
    /// Session id.
    pub session_id: String,
    /// Session start time.
    pub started_at: DateTime<Utc>,
    /// Number of commands recorded.
    pub command_count: usize,
    /// Total input tokens.
    pub tokens_in: u64,
    /// Total output tokens.
    pub tokens_out: u64,
    /// Total tokens saved.
    pub tokens_saved: u64,
    /// Overall saved/in ratio as a percentage.
    pub savings_percent: f64,
    /// Distinct error signatures seen.
    pub unique_error_signatures: usize,
    /// Retry patterns observed.
    pub retry_pattern_count: u64,
    /// Per-tool invocation counts (deterministic ordering).
    pub tool_counts: BTreeMap<String, usize>,
    /// Bound project name, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Registered model, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Compact statistics view; a second, intentionally distinct contract
/// over the same underlying state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SessionStatsBrief {
    /// Number of commands recorded.
    pub command_count: usize,
    /// Total tokens saved.
    pub tokens_saved: u64,
    /// Most-used tool, when any command has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_tool: Option<String>,
}

/// Result of a [`SessionTracker::recent`] query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RecentCommands {
    /// The last `n` records, newest first.
    pub records: Vec<CommandRecord>,
    /// Whether older records exist beyond this page, computed from the
    /// authoritative per-session count.
    pub has_more: bool,
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Thread-safe owner of all session state.
#[derive(Default)]
pub struct SessionTracker {
    sessions: Mutex<BTreeMap<String, SessionState>>,
}

impl SessionTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh id for callers that did not bring one.
    #[must_use]
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Start (or return) the session with this id.
    pub fn begin(&self, session_id: impl Into<String>) -> SessionState {
        let session_id = session_id.into();
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        sessions
            .entry(session_id.clone())
            .or_insert_with(|| {
                debug!(target: "cxo.session", %session_id, "session started");
                SessionState::new(session_id.clone())
            })
            .clone()
    }

    /// Record one tool invocation. Atomic with respect to every other
    /// `record` on the same tracker.
    pub fn record(
        &self,
        session_id: &str,
        tool: &str,
        tokens_in: u64,
        tokens_out: u64,
        tokens_saved: u64,
        was_filtered: bool,
    ) {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionState::new(session_id.to_string()));

        let is_retry = session
            .commands
            .iter()
            .rev()
            .take(RETRY_WINDOW)
            .any(|c| c.tool == tool);
        if is_retry {
            session.retry_pattern_count += 1;
        }

        session.commands.push(CommandRecord {
            tool: tool.to_string(),
            at: Utc::now(),
            tokens_in,
            tokens_out,
            tokens_saved,
            was_filtered,
        });
        session.tokens_in += tokens_in;
        session.tokens_out += tokens_out;
        session.tokens_saved += tokens_saved;
    }

    /// Fold build-error signatures into the session's distinct set.
    pub fn note_signatures<I, S>(&self, session_id: &str, signatures: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        if let Some(session) = sessions.get_mut(session_id) {
            for signature in signatures {
                session.unique_error_signatures.insert(signature.into());
            }
        }
    }

    /// Register the model this session sizes requests for.
    pub fn set_model(&self, session_id: &str, model: impl Into<String>) {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        if let Some(session) = sessions.get_mut(session_id) {
            session.model = Some(model.into());
        }
    }

    /// Bind the session to a project.
    pub fn bind_project(&self, session_id: &str, project: ProjectBinding) {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        if let Some(session) = sessions.get_mut(session_id) {
            session.project = Some(project);
        }
    }

    /// Full statistics for a session.
    #[must_use]
    pub fn stats(&self, session_id: &str) -> Option<SessionStats> {
        let sessions = self.sessions.lock().expect("session lock poisoned");
        let session = sessions.get(session_id)?;

        let mut tool_counts: BTreeMap<String, usize> = BTreeMap::new();
        for command in &session.commands {
            *tool_counts.entry(command.tool.clone()).or_default() += 1;
        }
        let savings_percent = if session.tokens_in == 0 {
            0.0
        } else {
            session.tokens_saved as f64 / session.tokens_in as f64 * 100.0
        };

        Some(SessionStats {
            session_id: session.session_id.clone(),
            started_at: session.started_at,
            command_count: session.commands.len(),
            tokens_in: session.tokens_in,
            tokens_out: session.tokens_out,
            tokens_saved: session.tokens_saved,
            savings_percent,
            unique_error_signatures: session.unique_error_signatures.len(),
            retry_pattern_count: session.retry_pattern_count,
            tool_counts,
            project: session.project.as_ref().map(|p| p.name.clone()),
            model: session.model.clone(),
        })
    }

    /// Compact statistics for a session.
    #[must_use]
    pub fn brief_stats(&self, session_id: &str) -> Option<SessionStatsBrief> {
        let stats = self.stats(session_id)?;
        let top_tool = stats
            .tool_counts
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(tool, _)| tool.clone());
        Some(SessionStatsBrief {
            command_count: stats.command_count,
            tokens_saved: stats.tokens_saved,
            top_tool,
        })
    }

    /// The last `n` commands, newest first.
    #[must_use]
    pub fn recent(&self, session_id: &str, n: usize) -> Option<RecentCommands> {
        let sessions = self.sessions.lock().expect("session lock poisoned");
        let session = sessions.get(session_id)?;
        let records: Vec<CommandRecord> =
            session.commands.iter().rev().take(n).cloned().collect();
        Some(RecentCommands {
            has_more: session.commands.len() > n,
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_is_idempotent() {
        let tracker = SessionTracker::new();
        let a = tracker.begin("s1");
        tracker.record("s1", "summarize_logs", 100, 40, 60, false);
        let b = tracker.begin("s1");
        assert_eq!(a.session_id, b.session_id);
        assert_eq!(b.commands.len(), 1);
    }

    #[test]
    fn record_accumulates_totals() {
        let tracker = SessionTracker::new();
        tracker.begin("s");
        tracker.record("s", "semantic_compress", 1000, 300, 700, false);
        tracker.record("s", "diff_compress", 500, 100, 400, true);
        let stats = tracker.stats("s").unwrap();
        assert_eq!(stats.command_count, 2);
        assert_eq!(stats.tokens_in, 1500);
        assert_eq!(stats.tokens_out, 400);
        assert_eq!(stats.tokens_saved, 1100);
        assert!((stats.savings_percent - 73.333).abs() < 0.01);
    }

    #[test]
    fn retry_pattern_detected_within_window() {
        let tracker = SessionTracker::new();
        tracker.begin("s");
        tracker.record("s", "analyze_build_output", 10, 5, 5, false);
        tracker.record("s", "analyze_build_output", 10, 5, 5, false);
        tracker.record("s", "summarize_logs", 10, 5, 5, false);
        tracker.record("s", "analyze_build_output", 10, 5, 5, false);
        let stats = tracker.stats("s").unwrap();
        assert_eq!(stats.retry_pattern_count, 2);
    }

    #[test]
    fn signatures_deduplicate() {
        let tracker = SessionTracker::new();
        tracker.begin("s");
        tracker.note_signatures("s", ["TS2304:a", "TS2304:a", "TS2322:b"]);
        tracker.note_signatures("s", ["TS2304:a"]);
        assert_eq!(tracker.stats("s").unwrap().unique_error_signatures, 2);
    }

    #[test]
    fn model_and_project_binding() {
        let tracker = SessionTracker::new();
        tracker.begin("s");
        tracker.set_model("s", "gpt-4o");
        tracker.bind_project(
            "s",
            ProjectBinding {
                name: "demo".into(),
                root: "/work/demo".into(),
            },
        );
        let stats = tracker.stats("s").unwrap();
        assert_eq!(stats.model.as_deref(), Some("gpt-4o"));
        assert_eq!(stats.project.as_deref(), Some("demo"));
    }

    #[test]
    fn recent_is_reverse_chronological_with_accurate_has_more() {
        let tracker = SessionTracker::new();
        tracker.begin("s");
        for i in 0..5 {
            tracker.record("s", &format!("tool{i}"), 1, 1, 0, false);
        }
        let page = tracker.recent("s", 2).unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].tool, "tool4");
        assert_eq!(page.records[1].tool, "tool3");
        assert!(page.has_more);

        let all = tracker.recent("s", 5).unwrap();
        assert!(!all.has_more);
    }

    #[test]
    fn sessions_are_isolated() {
        let tracker = SessionTracker::new();
        tracker.begin("a");
        tracker.begin("b");
        tracker.record("a", "x", 10, 1, 9, false);
        assert_eq!(tracker.stats("a").unwrap().command_count, 1);
        assert_eq!(tracker.stats("b").unwrap().command_count, 0);
        assert!(tracker.stats("missing").is_none());
    }

    #[test]
    fn brief_view_reports_top_tool() {
        let tracker = SessionTracker::new();
        tracker.begin("s");
        tracker.record("s", "a", 1, 1, 0, false);
        tracker.record("s", "b", 1, 1, 0, false);
        tracker.record("s", "b", 1, 1, 0, false);
        let brief = tracker.brief_stats("s").unwrap();
        assert_eq!(brief.command_count, 3);
        assert_eq!(brief.top_tool.as_deref(), Some("b"));
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(SessionTracker::generate_id(), SessionTracker::generate_id());
    }

    #[test]
    fn stats_serializes_cleanly() {
        let tracker = SessionTracker::new();
        tracker.begin("s");
        let json = serde_json::to_string(&tracker.stats("s").unwrap()).unwrap();
        assert!(json.contains("\"command_count\":0"));
        assert!(!json.contains("\"model\""));
    }
}
