// SPDX-License-Identifier: MIT OR Apache-2.0
//! Consistency of the error taxonomy across the tool surface.

use cxo_core::CancellationToken;
use cxo_error::{CxoError, ErrorCode};
use cxo_tools::{ToolContext, ToolRegistry, ToolRequest, ToolResponse};

const ALL_CODES: &[ErrorCode] = &[
    ErrorCode::InvalidArgs,
    ErrorCode::PathValidation,
    ErrorCode::PatternInvalid,
    ErrorCode::ParseFailed,
    ErrorCode::CompressionFailed,
    ErrorCode::UnknownTool,
    ErrorCode::Cancelled,
    ErrorCode::InternalError,
];

fn call(tool: &str, args: serde_json::Value) -> ToolResponse {
    let registry = ToolRegistry::with_defaults(ToolContext::new("/work"));
    registry.invoke(
        &ToolRequest {
            tool: tool.to_string(),
            args,
            session_id: "err".to_string(),
        },
        &CancellationToken::new(),
    )
}

fn expect_code(response: ToolResponse, expected: ErrorCode) {
    match response {
        ToolResponse::Failure { error } => assert_eq!(error.code, expected),
        ToolResponse::Success { .. } => panic!("expected {expected:?} failure"),
    }
}

#[test]
fn codes_have_stable_wire_strings() {
    let expected = [
        "INVALID_ARGS",
        "PATH_VALIDATION",
        "PATTERN_INVALID",
        "PARSE_FAILED",
        "COMPRESSION_FAILED",
        "UNKNOWN_TOOL",
        "CANCELLED",
        "INTERNAL_ERROR",
    ];
    for (code, wire) in ALL_CODES.iter().zip(expected) {
        assert_eq!(code.as_str(), wire);
        assert_eq!(serde_json::to_string(code).unwrap(), format!("\"{wire}\""));
    }
}

#[test]
fn unknown_tool_code() {
    expect_code(call("does_not_exist", serde_json::json!({})), ErrorCode::UnknownTool);
}

#[test]
fn invalid_args_code() {
    expect_code(call("summarize_logs", serde_json::json!({"no_text": 1})), ErrorCode::InvalidArgs);
    expect_code(
        call("diff_compress", serde_json::json!({"text": 42})),
        ErrorCode::InvalidArgs,
    );
}

#[test]
fn path_validation_code() {
    expect_code(
        call("parse_file", serde_json::json!({"path": "../escape.ts"})),
        ErrorCode::PathValidation,
    );
    expect_code(
        call("parse_file", serde_json::json!({"path": ".env"})),
        ErrorCode::PathValidation,
    );
}

#[test]
fn pattern_invalid_code() {
    expect_code(
        call("semantic_compress", serde_json::json!({"text": "a\nb", "preserve": ["("]})),
        ErrorCode::PatternInvalid,
    );
}

#[test]
fn parse_failed_code() {
    expect_code(
        call("diff_compress", serde_json::json!({"text": "not a diff at all"})),
        ErrorCode::ParseFailed,
    );
    expect_code(
        call("analyze_build_output", serde_json::json!({"text": "all tests passed"})),
        ErrorCode::ParseFailed,
    );
}

#[test]
fn cancelled_code() {
    let registry = ToolRegistry::with_defaults(ToolContext::new("/work"));
    let cancel = CancellationToken::new();
    cancel.cancel();
    let response = registry.invoke(
        &ToolRequest {
            tool: "compress_context".to_string(),
            args: serde_json::json!({"text": "some generic text\nspread over lines"}),
            session_id: "err".to_string(),
        },
        &cancel,
    );
    expect_code(response, ErrorCode::Cancelled);
}

#[test]
fn error_display_carries_code_and_context() {
    let err = CxoError::new(ErrorCode::PathValidation, "escapes sandbox")
        .with_context("path", "../x");
    let text = err.to_string();
    assert!(text.starts_with("[PATH_VALIDATION] escapes sandbox"));
    assert!(text.contains("../x"));
}

#[test]
fn failure_envelope_shape_is_exact() {
    let response = call("nope", serde_json::json!({}));
    let value = serde_json::to_value(&response).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.keys().collect::<Vec<_>>(), vec!["error"]);
    assert!(object["error"]["code"].is_string());
    assert!(object["error"]["message"].is_string());
}
