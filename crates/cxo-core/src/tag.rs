// SPDX-License-Identifier: MIT OR Apache-2.0
//! Content classification tags.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification label assigned to a [`Blob`](crate::Blob).
///
/// The tag drives pipeline selection: each tag maps to a fixed, ordered
/// list of compression stages. The set is closed — content that matches
/// none of the recognizers falls back to [`ContentTag::Generic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentTag {
    /// Timestamped or structured application log output.
    Logs,
    /// An error with stack frames (JS, Python, or Rust style).
    Stacktrace,
    /// Configuration content (JSON or key/value-shaped text).
    Config,
    /// Source code in any recognized language family.
    Code,
    /// A unified diff.
    Diff,
    /// Compiler / build-tool output.
    Build,
    /// Anything that matched no other recognizer.
    Generic,
}

impl ContentTag {
    /// Stable lowercase name, matching the serde representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Logs => "logs",
            Self::Stacktrace => "stacktrace",
            Self::Config => "config",
            Self::Code => "code",
            Self::Diff => "diff",
            Self::Build => "build",
            Self::Generic => "generic",
        }
    }

    /// All tags, in detector decision order.
    pub const ALL: [ContentTag; 7] = [
        Self::Diff,
        Self::Logs,
        Self::Build,
        Self::Stacktrace,
        Self::Config,
        Self::Code,
        Self::Generic,
    ];
}

impl fmt::Display for ContentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown tag name.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown content tag: {0}")]
pub struct UnknownTag(pub String);

impl FromStr for ContentTag {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logs" => Ok(Self::Logs),
            "stacktrace" => Ok(Self::Stacktrace),
            "config" => Ok(Self::Config),
            "code" => Ok(Self::Code),
            "diff" => Ok(Self::Diff),
            "build" => Ok(Self::Build),
            "generic" => Ok(Self::Generic),
            other => Err(UnknownTag(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_round_trips_through_from_str() {
        for tag in ContentTag::ALL {
            assert_eq!(tag.as_str().parse::<ContentTag>(), Ok(tag));
        }
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&ContentTag::Stacktrace).unwrap();
        assert_eq!(json, r#""stacktrace""#);
        let back: ContentTag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ContentTag::Stacktrace);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = "markdown".parse::<ContentTag>().unwrap_err();
        assert_eq!(err, UnknownTag("markdown".into()));
    }
}
