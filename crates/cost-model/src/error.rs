// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for stage aggregation.

/// Errors raised while building a [`crate::StageAggregate`].
///
/// These are configuration problems in the caller's input; an infeasible
/// pipeline shape is never an error (see [`crate::PipelineEstimate::invalid`]).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CostModelError {
    /// A layer has no intra-node allreduce entry for the requested peer count.
    #[error("layer {layer} has no intra-node allreduce cost for {peers} peer(s)")]
    MissingProfileData { layer: usize, peers: u32 },

    /// The layer slice passed to the builder is empty.
    #[error("cannot build a stage from an empty layer range")]
    EmptyLayerRange,

    /// A stage must run on at least one device.
    #[error("invalid device count {device_num}: a stage needs at least one device")]
    InvalidDeviceCount { device_num: u32 },

    /// Layer indices in the slice are not consecutive.
    #[error("non-contiguous layers: expected index {expected}, found {found}")]
    NonContiguousLayers { expected: usize, found: usize },

    /// The stage's memory units do not fit in a `u64`.
    #[error("memory units overflow at layer {layer}")]
    MemoryOverflow { layer: usize },
}
