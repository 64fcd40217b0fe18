// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Stage aggregation: a contiguous run of layers replicated on a fixed
//! number of devices.

use crate::{CostModelConfig, CostModelError};
use layer_profile::LayerMetrics;
use std::collections::BTreeMap;
use std::fmt;

/// Cost and memory profile of one pipeline stage.
///
/// Built once by [`StageAggregate::build`] and immutable afterwards. Forward
/// and backward totals already include the intra-node allreduce cost for
/// the stage's replication degree.
#[derive(Debug, Clone, PartialEq)]
pub struct StageAggregate {
    device_num: u32,
    layer_indices: Vec<usize>,
    forward_total: f64,
    backward_total: f64,
    cross_node_allreduce_total: BTreeMap<u32, f64>,
    memory_total: u64,
}

impl StageAggregate {
    /// Aggregates `layers` into a stage replicated on `device_num` devices,
    /// using the default [`CostModelConfig`].
    pub fn build(layers: &[LayerMetrics], device_num: u32) -> Result<Self, CostModelError> {
        Self::build_with_config(layers, device_num, &CostModelConfig::default())
    }

    /// Aggregates `layers` into a stage in a single pass.
    ///
    /// # Errors
    /// - [`CostModelError::InvalidDeviceCount`] if `device_num == 0`.
    /// - [`CostModelError::EmptyLayerRange`] if `layers` is empty.
    /// - [`CostModelError::NonContiguousLayers`] if layer indices skip or
    ///   repeat.
    /// - [`CostModelError::MissingProfileData`] if `device_num > 1` and a
    ///   layer lacks the intra-node allreduce entry for `device_num - 1`.
    /// - [`CostModelError::MemoryOverflow`] if the memory units exceed `u64`.
    pub fn build_with_config(
        layers: &[LayerMetrics],
        device_num: u32,
        config: &CostModelConfig,
    ) -> Result<Self, CostModelError> {
        if device_num == 0 {
            return Err(CostModelError::InvalidDeviceCount { device_num });
        }
        let first = layers.first().ok_or(CostModelError::EmptyLayerRange)?;

        let mut layer_indices = Vec::with_capacity(layers.len());
        let mut forward_total = 0.0;
        let mut backward_total = 0.0;
        let mut cross_node_allreduce_total = BTreeMap::new();
        let mut memory_total = 0u64;

        for (offset, layer) in layers.iter().enumerate() {
            let expected = first.layer_index() + offset;
            if layer.layer_index() != expected {
                return Err(CostModelError::NonContiguousLayers {
                    expected,
                    found: layer.layer_index(),
                });
            }
            layer_indices.push(layer.layer_index());

            forward_total += layer.forward_time();
            backward_total += layer.backward_time();

            if device_num > 1 {
                let peers = device_num - 1;
                let allreduce = layer.intra_node_allreduce(peers).ok_or(
                    CostModelError::MissingProfileData {
                        layer: layer.layer_index(),
                        peers,
                    },
                )?;
                // Replicas synchronize in both passes.
                forward_total += allreduce;
                backward_total += allreduce;
            }

            for (&key, &cost) in layer.cross_node_allreduce_cost() {
                *cross_node_allreduce_total.entry(key).or_insert(0.0) += cost;
            }

            let (activation, parameter) = layer.memory_required();
            memory_total = config
                .layer_memory(activation, parameter)
                .and_then(|m| memory_total.checked_add(m))
                .ok_or(CostModelError::MemoryOverflow {
                    layer: layer.layer_index(),
                })?;
        }

        tracing::trace!(
            "built stage {}..={} on {} device(s): fwd {:.3}, bwd {:.3}, mem {}",
            first.layer_index(),
            first.layer_index() + layers.len() - 1,
            device_num,
            forward_total,
            backward_total,
            memory_total,
        );

        Ok(Self {
            device_num,
            layer_indices,
            forward_total,
            backward_total,
            cross_node_allreduce_total,
            memory_total,
        })
    }

    /// Returns the number of devices the stage is replicated on.
    pub fn device_num(&self) -> u32 {
        self.device_num
    }

    /// Memory units each replica holds.
    ///
    /// Integer division: the remainder of `memory_total / device_num` is
    /// dropped, so this slightly underestimates uneven splits.
    pub fn memory_per_device(&self) -> u64 {
        self.memory_total / u64::from(self.device_num)
    }

    /// Returns the memory units of the whole stage, before replication.
    pub fn memory_total(&self) -> u64 {
        self.memory_total
    }

    /// Returns the number of layers in this stage.
    pub fn num_layers(&self) -> usize {
        self.layer_indices.len()
    }

    /// Returns the forward time, including intra-node allreduce.
    pub fn forward_total(&self) -> f64 {
        self.forward_total
    }

    /// Returns the backward time, including intra-node allreduce.
    pub fn backward_total(&self) -> f64 {
        self.backward_total
    }

    /// Forward plus backward time of one microbatch through this stage.
    pub fn latency(&self) -> f64 {
        self.forward_total + self.backward_total
    }

    /// Returns the indices of the layers in this stage.
    pub fn layer_indices(&self) -> &[usize] {
        &self.layer_indices
    }

    /// Returns the first layer index in this stage.
    pub fn first_layer_index(&self) -> usize {
        self.layer_indices[0]
    }

    /// Returns the last layer index in this stage.
    pub fn last_layer_index(&self) -> usize {
        self.layer_indices[self.layer_indices.len() - 1]
    }

    /// Returns the summed cross-node allreduce cost per node-group key.
    pub fn cross_node_allreduce_total(&self) -> &BTreeMap<u32, f64> {
        &self.cross_node_allreduce_total
    }
}

impl fmt::Display for StageAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stage[{}-{}]x{}",
            self.first_layer_index(),
            self.last_layer_index(),
            self.device_num
        )
    }
}
