// SPDX-License-Identifier: MIT OR Apache-2.0
//! The unit of work flowing through a pipeline.

use crate::tag::ContentTag;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Caller-supplied hints accompanying a [`Blob`].
///
/// `declared_type` is binding — it overrides detection entirely. The other
/// hints are advisory and may be consulted by individual stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BlobHints {
    /// Force this tag instead of running detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<ContentTag>,
    /// Path the content came from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    /// Source language, when known (e.g. `"typescript"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Opaque UTF-8 text processed as one unit.
///
/// Blobs are immutable through a pipeline: each stage produces a new blob
/// rather than mutating its input, so a failed stage can be bypassed by
/// handing the prior blob to the next stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Blob {
    /// The text content.
    pub text: String,
    /// Optional caller hints.
    #[serde(default)]
    pub hints: BlobHints,
}

impl Blob {
    /// Create a blob with no hints.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hints: BlobHints::default(),
        }
    }

    /// Attach hints (builder pattern).
    #[must_use]
    pub fn with_hints(mut self, hints: BlobHints) -> Self {
        self.hints = hints;
        self
    }

    /// Force a declared content type.
    #[must_use]
    pub fn with_declared_type(mut self, tag: ContentTag) -> Self {
        self.hints.declared_type = Some(tag);
        self
    }

    /// Number of lines in the content.
    #[must_use]
    pub fn line_count(&self) -> u64 {
        if self.text.is_empty() {
            0
        } else {
            self.text.lines().count() as u64
        }
    }

    /// Whether the content is empty or whitespace-only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Derive a new blob carrying this blob's hints but different text.
    #[must_use]
    pub fn derive(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hints: self.hints.clone(),
        }
    }
}

impl From<String> for Blob {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for Blob {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}
