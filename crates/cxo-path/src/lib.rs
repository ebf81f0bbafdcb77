// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sandbox path and pattern validation.
//!
//! User-supplied paths and globs are branded as [`ValidatedPath`] /
//! [`SafePattern`] before any I/O happens. The constructors are private to
//! this crate, so downstream file helpers can accept nothing else: a path
//! that escapes the working directory or names secret material never
//! reaches the filesystem layer.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

/// Basenames and path shapes that must never be read, regardless of
/// containment. Secret stores, key material, and credential files.
const BLOCKED_PATTERNS: &[&str] = &[
    ".env",
    ".env.*",
    "*.pem",
    "*.key",
    "*.p12",
    "*.pfx",
    "*.jks",
    "*.keystore",
    "id_rsa",
    "id_rsa.*",
    "id_dsa",
    "id_ecdsa",
    "id_ed25519",
    "id_ed25519.*",
    "*_history",
    "credentials",
    "credentials.*",
    ".htpasswd",
    ".netrc",
    ".npmrc",
    ".pypirc",
    "**/.ssh/**",
    "**/.aws/**",
    "**/.gnupg/**",
];

static BLOCKLIST: LazyLock<GlobSet> = LazyLock::new(|| {
    let mut builder = GlobSetBuilder::new();
    for pattern in BLOCKED_PATTERNS {
        builder.add(Glob::new(pattern).expect("valid blocklist glob literal"));
    }
    builder.build().expect("blocklist globs compile")
});

/// Why a path or pattern was rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
    /// The resolved path leaves the working directory.
    #[error("path escapes the working directory: {path}")]
    OutsideSandbox {
        /// The offending (resolved) path.
        path: String,
    },

    /// The path matches the secret block-list.
    #[error("path is blocked: {path}")]
    Blocked {
        /// The offending path.
        path: String,
    },

    /// A pattern contained `..` or was absolute.
    #[error("pattern not allowed: {pattern}")]
    PatternNotAllowed {
        /// The offending pattern.
        pattern: String,
    },

    /// The pattern failed to compile as a glob.
    #[error("invalid pattern `{pattern}`: {reason}")]
    PatternInvalid {
        /// The offending pattern.
        pattern: String,
        /// Compiler detail.
        reason: String,
    },
}

/// A path proven absolute, inside the sandbox, and off the block-list.
///
/// Only [`validate_path`] constructs these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ValidatedPath(PathBuf);

impl ValidatedPath {
    /// The validated absolute path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl std::fmt::Display for ValidatedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// A glob pattern proven relative, `..`-free, and off the block-list.
///
/// Only [`validate_pattern`] constructs these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SafePattern(String);

impl SafePattern {
    /// The validated pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SafePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lexically normalize a path: resolve `.` and `..` components without
/// touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    // Preserve the escape attempt so containment fails.
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Containment check: `candidate` must live under `working_dir`.
fn is_contained(candidate: &Path, working_dir: &Path) -> bool {
    match candidate.strip_prefix(working_dir) {
        Ok(relative) => !relative
            .components()
            .any(|c| matches!(c, Component::ParentDir)),
        Err(_) => false,
    }
}

/// Whether the basename or full path matches the secret block-list.
fn is_blocked(path: &Path) -> bool {
    if BLOCKLIST.is_match(path) {
        return true;
    }
    path.file_name()
        .map(Path::new)
        .is_some_and(|basename| BLOCKLIST.is_match(basename))
}

/// Validate a user-supplied path against a working directory.
///
/// Relative input resolves against `working_dir`; the result must stay
/// inside it (checked again after symlink resolution when the file
/// exists) and must not match the block-list.
pub fn validate_path(
    user_path: impl AsRef<Path>,
    working_dir: impl AsRef<Path>,
) -> Result<ValidatedPath, PathError> {
    let working_dir = normalize(working_dir.as_ref());
    let user_path = user_path.as_ref();

    let absolute = if user_path.is_absolute() {
        normalize(user_path)
    } else {
        normalize(&working_dir.join(user_path))
    };

    if !is_contained(&absolute, &working_dir) {
        return Err(PathError::OutsideSandbox {
            path: absolute.display().to_string(),
        });
    }

    // A symlink can point anywhere; re-apply containment on the real path.
    let resolved = if absolute.exists() {
        let canonical = absolute
            .canonicalize()
            .unwrap_or_else(|_| absolute.clone());
        let canonical_working = working_dir
            .canonicalize()
            .unwrap_or_else(|_| working_dir.clone());
        if !is_contained(&canonical, &canonical_working) {
            return Err(PathError::OutsideSandbox {
                path: canonical.display().to_string(),
            });
        }
        canonical
    } else {
        absolute
    };

    if is_blocked(&resolved) {
        return Err(PathError::Blocked {
            path: resolved.display().to_string(),
        });
    }

    Ok(ValidatedPath(resolved))
}

/// Validate a user-supplied glob pattern.
///
/// Patterns may not contain `..`, may not be absolute, and may not match
/// the block-list themselves.
pub fn validate_pattern(pattern: &str) -> Result<SafePattern, PathError> {
    if pattern.contains("..") || Path::new(pattern).is_absolute() {
        return Err(PathError::PatternNotAllowed {
            pattern: pattern.to_string(),
        });
    }
    // Reject unparseable globs up front.
    Glob::new(pattern).map_err(|e| PathError::PatternInvalid {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;
    if is_blocked(Path::new(pattern)) {
        return Err(PathError::Blocked {
            path: pattern.to_string(),
        });
    }
    Ok(SafePattern(pattern.to_string()))
}

/// Read a validated file. The branded argument is the whole point: no
/// unvalidated path can reach this call.
pub fn read_validated(path: &ValidatedPath) -> std::io::Result<String> {
    std::fs::read_to_string(path.as_path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_is_rejected() {
        let err = validate_path("../../etc/passwd", "/work").unwrap_err();
        assert!(matches!(err, PathError::OutsideSandbox { .. }));
    }

    #[test]
    fn absolute_path_outside_working_dir_is_rejected() {
        let err = validate_path("/etc/passwd", "/work").unwrap_err();
        assert!(matches!(err, PathError::OutsideSandbox { .. }));
    }

    #[test]
    fn blocked_basenames_are_rejected() {
        for name in [".env", "server.pem", "id_rsa", ".npmrc", "credentials.json"] {
            let err = validate_path(name, "/work").unwrap_err();
            assert!(
                matches!(err, PathError::Blocked { .. }),
                "{name} should be blocked, got {err:?}"
            );
        }
    }

    #[test]
    fn blocked_directories_are_rejected_anywhere() {
        let err = validate_path("home/user/.ssh/known_hosts", "/work").unwrap_err();
        assert!(matches!(err, PathError::Blocked { .. }));
    }

    #[test]
    fn contained_relative_path_validates() {
        let validated = validate_path("src/x.ts", "/work").unwrap();
        assert_eq!(validated.as_path(), Path::new("/work/src/x.ts"));
        assert!(validated.as_path().is_absolute());
    }

    #[test]
    fn contained_absolute_path_validates() {
        let validated = validate_path("/work/src/lib.rs", "/work").unwrap();
        assert_eq!(validated.as_path(), Path::new("/work/src/lib.rs"));
    }

    #[test]
    fn dot_segments_normalize_before_containment() {
        let validated = validate_path("src/./a/../x.ts", "/work").unwrap();
        assert_eq!(validated.as_path(), Path::new("/work/src/x.ts"));
    }

    #[test]
    fn symlink_escape_is_rejected() {
        let outside = tempfile::tempdir().unwrap();
        let sandbox = tempfile::tempdir().unwrap();
        let secret = outside.path().join("secret.txt");
        std::fs::write(&secret, "s").unwrap();
        let link = sandbox.path().join("link.txt");
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(&secret, &link).unwrap();
            let err = validate_path("link.txt", sandbox.path()).unwrap_err();
            assert!(matches!(err, PathError::OutsideSandbox { .. }));
        }
    }

    #[test]
    fn patterns_with_traversal_or_absolute_are_rejected() {
        assert!(matches!(
            validate_pattern("../**/*.ts").unwrap_err(),
            PathError::PatternNotAllowed { .. }
        ));
        assert!(matches!(
            validate_pattern("/etc/**").unwrap_err(),
            PathError::PatternNotAllowed { .. }
        ));
    }

    #[test]
    fn blocked_pattern_is_rejected() {
        assert!(matches!(
            validate_pattern(".env").unwrap_err(),
            PathError::Blocked { .. }
        ));
    }

    #[test]
    fn invalid_glob_is_rejected() {
        assert!(matches!(
            validate_pattern("src/[").unwrap_err(),
            PathError::PatternInvalid { .. }
        ));
    }

    #[test]
    fn reasonable_pattern_validates() {
        let pattern = validate_pattern("src/**/*.ts").unwrap();
        assert_eq!(pattern.as_str(), "src/**/*.ts");
    }

    #[test]
    fn read_requires_the_brand() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), "content").unwrap();
        let validated = validate_path("f.txt", dir.path()).unwrap();
        assert_eq!(read_validated(&validated).unwrap(), "content");
    }
}
