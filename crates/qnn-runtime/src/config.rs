// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! backend = "auto"
//! scratch_budget = "64K"
//! enable_profiling = true
//! ```

use crate::RuntimeError;
use qnn_core::Backend;
use scratch_arena::ArenaBudget;
use std::path::Path;

/// Configuration for an inference session.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// Kernel backend: `"auto"`, `"scalar"` or `"lanes"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Ceiling for the scratch arena (human-readable, e.g. `"64K"`).
    pub scratch_budget: String,
    /// Whether to record per-kernel metrics.
    #[serde(default = "default_true")]
    pub enable_profiling: bool,
}

fn default_backend() -> String {
    "auto".to_string()
}

fn default_true() -> bool {
    true
}

impl RuntimeConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RuntimeError::ConfigError(format!("cannot read config '{}': {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        toml::from_str(toml_str).map_err(|e| RuntimeError::ConfigError(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self).map_err(|e| RuntimeError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Parses the scratch budget string.
    pub fn parse_budget(&self) -> Result<ArenaBudget, RuntimeError> {
        ArenaBudget::parse(&self.scratch_budget)
            .map_err(|e| RuntimeError::ConfigError(format!("invalid scratch budget: {e}")))
    }

    /// Resolves the backend name; `"auto"` defers to [`Backend::detect`].
    pub fn resolve_backend(&self) -> Result<Backend, RuntimeError> {
        match self.backend.to_lowercase().as_str() {
            "auto" => Ok(Backend::detect()),
            "scalar" => Ok(Backend::Scalar),
            "lanes" => Ok(Backend::Lanes),
            other => Err(RuntimeError::ConfigError(format!(
                "unknown backend '{other}'; expected 'auto', 'scalar' or 'lanes'"
            ))),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            scratch_budget: "64K".to_string(),
            enable_profiling: true,
        }
    }
}
