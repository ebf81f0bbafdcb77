// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared cl100k BPE token-counting oracle.
//!
//! The encoder is the same vocabulary used to size outgoing LLM requests,
//! built once per process and shared read-only afterwards. Counting never
//! fails: invalid UTF-8 falls back to byte-wise counting.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::sync::LazyLock;
use tiktoken_rs::CoreBPE;

/// Process-wide encoder. The vocabulary is embedded in the binary, so the
/// one-shot initializer cannot fail at runtime.
static ENCODER: LazyLock<CoreBPE> =
    LazyLock::new(|| tiktoken_rs::cl100k_base().expect("embedded cl100k vocabulary"));

/// Count BPE tokens in `text` under the cl100k vocabulary.
///
/// Identical input always yields an identical count.
#[must_use]
pub fn count(text: &str) -> u64 {
    if text.is_empty() {
        return 0;
    }
    ENCODER.encode_with_special_tokens(text).len() as u64
}

/// Count tokens in a byte string.
///
/// Valid UTF-8 goes through the BPE encoder; anything else is counted
/// byte-wise.
#[must_use]
pub fn count_bytes(bytes: &[u8]) -> u64 {
    match std::str::from_utf8(bytes) {
        Ok(text) => count(text),
        Err(_) => bytes.len() as u64,
    }
}
