// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Planner configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! profile_path = "./profiles/gpt2__mb4.json"
//! num_gpus_per_node = 4
//! node_counts = [1, 2, 4]
//! num_threads = 8
//!
//! [cost_model]
//! activation_memory_multiplier = 6
//! ```

use crate::SearchError;
use cost_model::CostModelConfig;
use std::path::{Path, PathBuf};

/// Configuration for a template search run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PlannerConfig {
    /// Path to the JSON layer profile.
    pub profile_path: Option<PathBuf>,
    /// GPUs available on every node.
    #[serde(default = "default_gpus_per_node")]
    pub num_gpus_per_node: u32,
    /// Node counts to generate templates for.
    #[serde(default)]
    pub node_counts: Vec<u32>,
    /// Number of worker threads (defaults to number of online CPU cores).
    pub num_threads: Option<usize>,
    /// Stage aggregation settings.
    #[serde(default)]
    pub cost_model: CostModelConfig,
}

fn default_gpus_per_node() -> u32 {
    1
}

impl PlannerConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, SearchError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SearchError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, SearchError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| SearchError::ConfigError(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, SearchError> {
        toml::to_string_pretty(self)
            .map_err(|e| SearchError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Rejects values the search cannot work with.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.num_gpus_per_node == 0 {
            return Err(SearchError::ConfigError(
                "num_gpus_per_node must be at least 1".into(),
            ));
        }
        if self.node_counts.contains(&0) {
            return Err(SearchError::ConfigError(
                "node_counts must not contain 0".into(),
            ));
        }
        if self.num_threads == Some(0) {
            return Err(SearchError::ConfigError("num_threads must be at least 1".into()));
        }
        Ok(())
    }

    /// Resolves the number of worker threads.
    pub fn resolve_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            profile_path: None,
            num_gpus_per_node: default_gpus_per_node(),
            node_counts: vec![1],
            num_threads: None,
            cost_model: CostModelConfig::default(),
        }
    }
}
