// SPDX-License-Identifier: MIT OR Apache-2.0
//! CLI configuration file support.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Default config filename probed in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "cxo.toml";

/// Optional settings loaded from a TOML file.
///
/// Everything here has a flag or built-in default; the file only
/// overrides. Unknown keys are rejected so typos fail loudly.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CxoConfig {
    /// Default detail level: `minimal`, `normal`, or `detailed`.
    #[serde(default)]
    pub detail: Option<String>,
    /// Working directory used as the path-validation sandbox root.
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Log level override (e.g. `"debug"`, `"info"`, `"warn"`).
    #[serde(default)]
    pub log_level: Option<String>,
    /// Extra preserve patterns applied to every compression.
    #[serde(default)]
    pub preserve: Vec<String>,
}

impl CxoConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    /// Load the default config file if it exists, else defaults.
    pub fn load_default() -> Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
