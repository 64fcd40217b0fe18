// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the template search.

/// Errors that can occur while searching for pipeline templates.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Building a stage failed (missing profile data, bad range).
    #[error("cost model error: {0}")]
    CostModel(#[from] cost_model::CostModelError),

    /// The layer profile could not be loaded or sliced.
    #[error("profile error: {0}")]
    Profile(#[from] layer_profile::ProfileError),

    /// More nodes were requested than there are layers to place on them.
    #[error("{num_nodes} node(s) requested but the model has only {num_layers} layer(s)")]
    TooManyNodes { num_nodes: u32, num_layers: usize },

    /// `create_pipeline_templates` was called with no node counts.
    #[error("no node counts given")]
    NoNodeCounts,

    /// No stage count yields a valid pipeline for this topology.
    #[error("no feasible template for {num_nodes} node(s) x {num_gpus_per_node} GPU(s)")]
    NoFeasibleTemplate { num_nodes: u32, num_gpus_per_node: u32 },

    /// A template was requested from an infeasible estimate.
    #[error("cannot materialize a template from an invalid estimate")]
    InvalidEstimate,

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
