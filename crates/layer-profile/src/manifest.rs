// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON profile manifest parsing.
//!
//! # Format
//! ```json
//! {
//!   "model": "gpt2",
//!   "tag": "mb4",
//!   "microbatch_size": 4,
//!   "layers": [
//!     {
//!       "name": "transformer.wte",
//!       "forward": 0.8,
//!       "backward": 1.6,
//!       "allreduce_in_node": { "1": 0.12, "3": 0.2 },
//!       "allreduce_cross_nodes": { "2": 0.9, "4": 1.4 },
//!       "mem_required": [1024, 4096]
//!     }
//!   ]
//! }
//! ```
//!
//! Layer indices are not stored; they follow array order.

use crate::{LayerMetrics, ProfileError};
use std::collections::BTreeMap;
use std::path::Path;

/// Top-level profile manifest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProfileManifest {
    /// Model name.
    pub model: String,
    /// Profiling tag.
    #[serde(default)]
    pub tag: String,
    /// Microbatch size the profile was taken with, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microbatch_size: Option<u32>,
    /// Layer records in execution order.
    pub layers: Vec<ManifestLayer>,
}

/// A single layer entry in the manifest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub forward: f64,
    pub backward: f64,
    #[serde(default)]
    pub allreduce_in_node: BTreeMap<u32, f64>,
    #[serde(default)]
    pub allreduce_cross_nodes: BTreeMap<u32, f64>,
    /// `[activation, parameter]` memory units.
    pub mem_required: (u64, u64),
}

impl ProfileManifest {
    /// Loads a manifest from a JSON file path.
    pub fn from_file(path: &Path) -> Result<Self, ProfileError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ProfileError> {
        let manifest: Self = serde_json::from_str(json)?;
        Ok(manifest)
    }

    /// Serialises the manifest to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ProfileError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks structural consistency before conversion.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.layers.is_empty() {
            return Err(ProfileError::EmptyProfile {
                model: self.model.clone(),
            });
        }
        Ok(())
    }

    /// Converts manifest entries into [`LayerMetrics`], indexed by position.
    pub fn to_layer_metrics(&self) -> Vec<LayerMetrics> {
        self.layers
            .iter()
            .enumerate()
            .map(|(i, l)| {
                let metrics = LayerMetrics::new(
                    i,
                    l.forward,
                    l.backward,
                    l.allreduce_in_node.clone(),
                    l.allreduce_cross_nodes.clone(),
                    l.mem_required,
                );
                match &l.name {
                    Some(name) => metrics.with_name(name.clone()),
                    None => metrics,
                }
            })
            .collect()
    }
}
