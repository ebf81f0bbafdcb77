// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tool registry and JSON invocation surface.
//!
//! Tools are capability records — a name, a description, a JSON input
//! schema, and an executor function — indexed by name in a
//! [`ToolRegistry`]. The registry speaks the JSON contract of the outside
//! world: requests are `{tool, args, session_id}`, responses are either
//! `{content: [{type: "text", text}]}` or `{error: {code, message}}`.
//! Every successful invocation is recorded in the session tracker.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
mod tools;

pub use context::{ToolContext, STAGE_NAMES};

use cxo_core::CancellationToken;
use cxo_error::{CxoError, CxoErrorDto, ErrorCode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

// ---------------------------------------------------------------------------
// Wire envelopes
// ---------------------------------------------------------------------------

/// An incoming tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ToolRequest {
    /// Tool name.
    pub tool: String,
    /// Tool-specific arguments; validation is delegated to the tool.
    #[serde(default)]
    pub args: serde_json::Value,
    /// Session the invocation is accounted under.
    pub session_id: String,
}

/// One piece of response content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ContentItem {
    /// Content kind; always `"text"` today.
    #[serde(rename = "type")]
    pub kind: String,
    /// The payload.
    pub text: String,
}

/// A tool response: success content or a coded error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResponse {
    /// Successful invocation.
    Success {
        /// Response content items.
        content: Vec<ContentItem>,
    },
    /// Failed invocation.
    Failure {
        /// The coded error.
        error: CxoErrorDto,
    },
}

impl ToolResponse {
    /// Build a single-item text success.
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self::Success {
            content: vec![ContentItem {
                kind: "text".to_string(),
                text: text.into(),
            }],
        }
    }

    /// Build a failure from a [`CxoError`].
    #[must_use]
    pub fn failure(error: &CxoError) -> Self {
        Self::Failure {
            error: CxoErrorDto::from(error),
        }
    }

    /// Whether this is the success variant.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The first text item, when successful.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Success { content } => content.first().map(|c| c.text.as_str()),
            Self::Failure { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tool specs
// ---------------------------------------------------------------------------

type Executor = Box<
    dyn Fn(
            &ToolContext,
            &str,
            &serde_json::Value,
            &CancellationToken,
        ) -> Result<String, CxoError>
        + Send
        + Sync,
>;

/// A registered tool: metadata plus its executor.
pub struct ToolSpec {
    /// Registry name.
    pub name: &'static str,
    /// One-line description shown in listings.
    pub description: &'static str,
    /// JSON schema of the tool's arguments.
    pub input_schema: serde_json::Value,
    executor: Executor,
}

impl ToolSpec {
    /// Build a spec whose schema is derived from the args type.
    pub fn new<Args: JsonSchema>(
        name: &'static str,
        description: &'static str,
        executor: Executor,
    ) -> Self {
        let schema = schemars::schema_for!(Args);
        Self {
            name,
            description,
            input_schema: serde_json::to_value(schema).unwrap_or(serde_json::Value::Null),
            executor,
        }
    }
}

/// Listing entry for one tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// JSON input schema.
    pub input_schema: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Name-indexed tool dispatch over a shared [`ToolContext`].
pub struct ToolRegistry {
    context: ToolContext,
    tools: BTreeMap<&'static str, ToolSpec>,
}

impl ToolRegistry {
    /// Registry with the built-in tool set.
    #[must_use]
    pub fn with_defaults(context: ToolContext) -> Self {
        let mut registry = Self {
            context,
            tools: BTreeMap::new(),
        };
        for spec in tools::default_tools() {
            registry.register(spec);
        }
        registry
    }

    /// Register (or replace) a tool.
    pub fn register(&mut self, spec: ToolSpec) {
        self.tools.insert(spec.name, spec);
    }

    /// The shared context.
    #[must_use]
    pub fn context(&self) -> &ToolContext {
        &self.context
    }

    /// Sorted listing of registered tools.
    #[must_use]
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|spec| ToolDescriptor {
                name: spec.name.to_string(),
                description: spec.description.to_string(),
                input_schema: spec.input_schema.clone(),
            })
            .collect()
    }

    /// Whether a tool with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Dispatch one request.
    ///
    /// Unknown tools, argument failures, and executor errors all surface
    /// as the `error` envelope; successful invocations are recorded in
    /// the session tracker with their token accounting.
    pub fn invoke(&self, request: &ToolRequest, cancel: &CancellationToken) -> ToolResponse {
        let Some(spec) = self.tools.get(request.tool.as_str()) else {
            let err = CxoError::new(
                ErrorCode::UnknownTool,
                format!("unknown tool `{}`", request.tool),
            )
            .with_context("tool", &request.tool);
            return ToolResponse::failure(&err);
        };

        debug!(target: "cxo.tools", tool = spec.name, session = %request.session_id, "invoking");
        match (spec.executor)(&self.context, &request.session_id, &request.args, cancel) {
            Ok(text) => {
                let tokens_in = input_tokens(&request.args);
                let tokens_out = cxo_tokenizer::count(&text);
                self.context.sessions.record(
                    &request.session_id,
                    spec.name,
                    tokens_in,
                    tokens_out,
                    tokens_in.saturating_sub(tokens_out),
                    false,
                );
                ToolResponse::success(text)
            }
            Err(err) => ToolResponse::failure(&err),
        }
    }
}

/// Token count of the textual argument fields, the "before" side of the
/// session accounting.
fn input_tokens(args: &serde_json::Value) -> u64 {
    ["text", "content"]
        .iter()
        .filter_map(|key| args.get(key).and_then(|v| v.as_str()))
        .map(cxo_tokenizer::count)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ToolRegistry {
        ToolRegistry::with_defaults(ToolContext::new("/work"))
    }

    fn request(tool: &str, args: serde_json::Value) -> ToolRequest {
        ToolRequest {
            tool: tool.to_string(),
            args,
            session_id: "test-session".to_string(),
        }
    }

    #[test]
    fn unknown_tool_yields_coded_error() {
        let response = registry().invoke(
            &request("frobnicate", serde_json::json!({})),
            &CancellationToken::new(),
        );
        match response {
            ToolResponse::Failure { error } => {
                assert_eq!(error.code, ErrorCode::UnknownTool);
                assert!(error.message.contains("frobnicate"));
            }
            ToolResponse::Success { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn listing_is_sorted_and_carries_schemas() {
        let listing = registry().list();
        let names: Vec<&str> = listing.iter().map(|t| t.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert!(names.contains(&"compress_context"));
        assert!(listing.iter().all(|t| t.input_schema.is_object()));
    }

    #[test]
    fn success_response_serializes_to_the_wire_shape() {
        let response = ToolResponse::success("hello");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][0]["text"], "hello");
    }

    #[test]
    fn failure_response_serializes_to_the_wire_shape() {
        let err = CxoError::new(ErrorCode::InvalidArgs, "missing `text`");
        let json = serde_json::to_value(ToolResponse::failure(&err)).unwrap();
        assert_eq!(json["error"]["code"], "INVALID_ARGS");
        assert_eq!(json["error"]["message"], "missing `text`");
    }

    #[test]
    fn successful_invocation_is_recorded_in_the_session() {
        let registry = registry();
        let args = serde_json::json!({
            "text": "[ERROR] boom\n[ERROR] boom\n[ERROR] boom\n[INFO] ok"
        });
        let response = registry.invoke(&request("summarize_logs", args), &CancellationToken::new());
        assert!(response.is_success(), "unexpected failure: {response:?}");

        let stats = registry.context().sessions.stats("test-session").unwrap();
        assert_eq!(stats.command_count, 1);
        assert_eq!(stats.tool_counts["summarize_logs"], 1);
        assert!(stats.tokens_in > 0);
    }
}
