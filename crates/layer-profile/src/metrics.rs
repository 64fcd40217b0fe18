// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Profiled execution record for a single layer.
//!
//! A [`LayerMetrics`] is created once from profiling input and never
//! mutated afterwards. Stage aggregation reads scalar sums out of it; it
//! never takes ownership of the layer list.

use std::collections::BTreeMap;

/// Profiled costs for one network layer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayerMetrics {
    layer_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    forward_time: f64,
    backward_time: f64,
    /// Keyed by number of peer devices (replication degree − 1).
    intra_node_allreduce_cost: BTreeMap<u32, f64>,
    /// Keyed by node-group size.
    cross_node_allreduce_cost: BTreeMap<u32, f64>,
    /// `(activation units, parameter units)`.
    memory_required: (u64, u64),
}

impl LayerMetrics {
    /// Creates a layer record from profiled values.
    pub fn new(
        layer_index: usize,
        forward_time: f64,
        backward_time: f64,
        intra_node_allreduce_cost: BTreeMap<u32, f64>,
        cross_node_allreduce_cost: BTreeMap<u32, f64>,
        memory_required: (u64, u64),
    ) -> Self {
        Self {
            layer_index,
            name: None,
            forward_time,
            backward_time,
            intra_node_allreduce_cost,
            cross_node_allreduce_cost,
            memory_required,
        }
    }

    /// Attaches a human-readable layer name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn layer_index(&self) -> usize {
        self.layer_index
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn forward_time(&self) -> f64 {
        self.forward_time
    }

    pub fn backward_time(&self) -> f64 {
        self.backward_time
    }

    /// Forward plus backward time for one microbatch.
    pub fn compute_time(&self) -> f64 {
        self.forward_time + self.backward_time
    }

    /// Intra-node allreduce time when `peers` other devices synchronize.
    ///
    /// Returns `None` when the profile has no entry for that peer count.
    pub fn intra_node_allreduce(&self, peers: u32) -> Option<f64> {
        self.intra_node_allreduce_cost.get(&peers).copied()
    }

    pub fn intra_node_allreduce_cost(&self) -> &BTreeMap<u32, f64> {
        &self.intra_node_allreduce_cost
    }

    pub fn cross_node_allreduce_cost(&self) -> &BTreeMap<u32, f64> {
        &self.cross_node_allreduce_cost
    }

    pub fn memory_required(&self) -> (u64, u64) {
        self.memory_required
    }

    pub fn activation_memory(&self) -> u64 {
        self.memory_required.0
    }

    pub fn parameter_memory(&self) -> u64 {
        self.memory_required.1
    }

    /// Returns a concise summary string for display.
    pub fn summary(&self) -> String {
        format!(
            "[{}] {} fwd {:.3} bwd {:.3}, act {} param {}, {} in-node / {} cross-node allreduce entries",
            self.layer_index,
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.forward_time,
            self.backward_time,
            self.memory_required.0,
            self.memory_required.1,
            self.intra_node_allreduce_cost.len(),
            self.cross_node_allreduce_cost.len(),
        )
    }

    /// Checks that profiled times are finite and non-negative.
    pub(crate) fn check_times(&self) -> Result<(), String> {
        let times = [
            ("forward", self.forward_time),
            ("backward", self.backward_time),
        ];
        for (what, t) in times {
            if !t.is_finite() || t < 0.0 {
                return Err(format!("{what} time must be finite and non-negative, got {t}"));
            }
        }
        let allreduce = self
            .intra_node_allreduce_cost
            .iter()
            .map(|(k, v)| ("in-node", *k, *v))
            .chain(
                self.cross_node_allreduce_cost
                    .iter()
                    .map(|(k, v)| ("cross-node", *k, *v)),
            );
        for (what, key, t) in allreduce {
            if !t.is_finite() || t < 0.0 {
                return Err(format!("{what} allreduce cost for key {key} is invalid: {t}"));
            }
        }
        Ok(())
    }
}
