// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Whole-pipeline latency estimates.
//!
//! # Latency Model
//!
//! A pipeline of `S` stages processing microbatches has three phases:
//!
//! ```text
//! fill    ─ every stage runs once while the pipe ramps up
//! steady  ─ n microbatch slots at the pace of the bottleneck stage k*
//! drain   ─ stages after (and including) k* empty out
//! ```
//!
//! A single stage with latency `L = f + b` costs `L + 2L + L`. Two adjacent
//! estimates combine as:
//!
//! - `t_fill = left.t_fill + right.t_fill`
//! - `k*` stays in `left` if left's bottleneck is strictly slower, else it
//!   moves to `right` (offset by `left.num_stages()`)
//! - `n = 2·(S_left + S_right) + k* + 1`, `t_steady = n · L(k*)`
//! - `t_drain` sums stage latencies from `k*` to the end of the pipeline
//!
//! # Validity
//!
//! An infeasible candidate carries `t_fill = +∞` and no stages. Combining
//! with an invalid estimate on either side yields an invalid estimate.

use crate::StageAggregate;
use std::fmt;
use std::sync::Arc;

// ── MemoKey ────────────────────────────────────────────────────────

/// Shape of a pipeline estimate, used for memoization.
///
/// `last_layer_index` is inclusive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct MemoKey {
    pub num_stages: usize,
    pub first_layer_index: usize,
    pub last_layer_index: usize,
    pub num_nodes: u32,
    pub num_gpus_per_node: u32,
}

impl MemoKey {
    pub fn new(
        num_stages: usize,
        first_layer_index: usize,
        last_layer_index: usize,
        num_nodes: u32,
        num_gpus_per_node: u32,
    ) -> Self {
        Self {
            num_stages,
            first_layer_index,
            last_layer_index,
            num_nodes,
            num_gpus_per_node,
        }
    }

    /// The key reported by an estimate with no stages.
    pub const EMPTY: MemoKey = MemoKey {
        num_stages: 0,
        first_layer_index: 0,
        last_layer_index: 0,
        num_nodes: 0,
        num_gpus_per_node: 0,
    };
}

impl fmt::Display for MemoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {})",
            self.num_stages,
            self.first_layer_index,
            self.last_layer_index,
            self.num_nodes,
            self.num_gpus_per_node
        )
    }
}

// ── PipelineEstimate ───────────────────────────────────────────────

/// Latency estimate for a chain of stages over a contiguous layer range.
#[derive(Debug, Clone)]
pub struct PipelineEstimate {
    t_fill: f64,
    t_steady: f64,
    t_drain: f64,
    kstar: usize,
    num_nodes: u32,
    num_gpus_per_node: u32,
    stages: Vec<Arc<StageAggregate>>,
}

impl PipelineEstimate {
    /// Wraps one stage as a one-stage pipeline.
    pub fn from_single_stage(
        stage: impl Into<Arc<StageAggregate>>,
        num_nodes: u32,
        num_gpus_per_node: u32,
    ) -> Self {
        let stage = stage.into();
        let latency = stage.latency();
        Self {
            t_fill: latency,
            t_steady: 2.0 * latency,
            t_drain: latency,
            kstar: 0,
            num_nodes,
            num_gpus_per_node,
            stages: vec![stage],
        }
    }

    /// An infeasible candidate for the given topology.
    pub fn invalid(num_nodes: u32, num_gpus_per_node: u32) -> Self {
        Self {
            t_fill: f64::INFINITY,
            t_steady: f64::INFINITY,
            t_drain: f64::INFINITY,
            kstar: 0,
            num_nodes,
            num_gpus_per_node,
            stages: Vec::new(),
        }
    }

    /// Appends `right` after `left`.
    ///
    /// `left` must cover the layers immediately before `right`. Both inputs
    /// are consumed; the result owns a fresh stage list sharing the same
    /// `Arc`ed stages.
    pub fn combine(
        left: PipelineEstimate,
        right: PipelineEstimate,
        num_nodes: u32,
        num_gpus_per_node: u32,
    ) -> Self {
        if !left.is_valid() || !right.is_valid() {
            return Self::invalid(num_nodes, num_gpus_per_node);
        }
        debug_assert_eq!(
            left.key().last_layer_index + 1,
            right.key().first_layer_index,
            "combined estimates must cover adjacent layer ranges",
        );

        let num_left = left.num_stages();
        let num_right = right.num_stages();
        let left_bottleneck = left.bottleneck_latency();
        let right_bottleneck = right.bottleneck_latency();

        let (kstar, bottleneck, t_drain) = if left_bottleneck > right_bottleneck {
            let drain = left.stages[left.kstar..]
                .iter()
                .chain(right.stages.iter())
                .map(|s| s.latency())
                .sum::<f64>();
            (left.kstar, left_bottleneck, drain)
        } else {
            let drain = right.stages[right.kstar..]
                .iter()
                .map(|s| s.latency())
                .sum::<f64>();
            (right.kstar + num_left, right_bottleneck, drain)
        };

        let n = 2 * (num_left + num_right) + kstar + 1;
        let t_fill = left.t_fill + right.t_fill;
        let t_steady = n as f64 * bottleneck;

        let mut stages = left.stages;
        stages.extend(right.stages);

        Self {
            t_fill,
            t_steady,
            t_drain,
            kstar,
            num_nodes,
            num_gpus_per_node,
            stages,
        }
    }

    /// Returns `true` unless this is an infeasible candidate.
    pub fn is_valid(&self) -> bool {
        self.t_fill != f64::INFINITY
    }

    /// `t_fill + t_steady + t_drain`, or `+∞` for an invalid estimate.
    pub fn total_latency(&self) -> f64 {
        if !self.is_valid() {
            return f64::INFINITY;
        }
        self.t_fill + self.t_steady + self.t_drain
    }

    /// Returns the pipeline fill time.
    pub fn t_fill(&self) -> f64 {
        self.t_fill
    }

    /// Returns the steady-state time.
    pub fn t_steady(&self) -> f64 {
        self.t_steady
    }

    /// Returns the pipeline drain time.
    pub fn t_drain(&self) -> f64 {
        self.t_drain
    }

    /// Index of the bottleneck stage in [`Self::stages`].
    pub fn kstar(&self) -> usize {
        self.kstar
    }

    /// Latency of the stage at `kstar`, or 0 when there are no stages.
    pub fn bottleneck_latency(&self) -> f64 {
        self.stages.get(self.kstar).map_or(0.0, |s| s.latency())
    }

    /// Returns the number of nodes this estimate was evaluated against.
    pub fn num_nodes(&self) -> u32 {
        self.num_nodes
    }

    /// Returns the GPUs per node this estimate was evaluated against.
    pub fn num_gpus_per_node(&self) -> u32 {
        self.num_gpus_per_node
    }

    /// Returns the number of stages (0 when invalid).
    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    /// Returns the stages in pipeline order.
    pub fn stages(&self) -> &[Arc<StageAggregate>] {
        &self.stages
    }

    /// Largest per-device memory among the stages, `None` when invalid.
    pub fn peak_memory_per_device(&self) -> Option<u64> {
        self.stages.iter().map(|s| s.memory_per_device()).max()
    }

    /// Memoization key; [`MemoKey::EMPTY`] when there are no stages.
    pub fn key(&self) -> MemoKey {
        match (self.stages.first(), self.stages.last()) {
            (Some(first), Some(last)) => MemoKey::new(
                self.stages.len(),
                first.first_layer_index(),
                last.last_layer_index(),
                self.num_nodes,
                self.num_gpus_per_node,
            ),
            _ => MemoKey::EMPTY,
        }
    }

    /// One-line description of the estimate.
    pub fn summary(&self) -> String {
        if !self.is_valid() {
            return format!(
                "invalid pipeline ({} node(s) x {} GPU(s))",
                self.num_nodes, self.num_gpus_per_node
            );
        }
        let stages: Vec<String> = self.stages.iter().map(|s| s.to_string()).collect();
        format!(
            "{} stage(s) [{}], k*={}, fill {:.3} + steady {:.3} + drain {:.3} = {:.3}",
            self.num_stages(),
            stages.join(", "),
            self.kstar,
            self.t_fill,
            self.t_steady,
            self.t_drain,
            self.total_latency(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layer_profile::LayerMetrics;
    use std::collections::BTreeMap;

    fn make_layers(times: &[(f64, f64)]) -> Vec<LayerMetrics> {
        times
            .iter()
            .enumerate()
            .map(|(i, &(f, b))| {
                LayerMetrics::new(i, f, b, BTreeMap::new(), BTreeMap::new(), (1, 2))
            })
            .collect()
    }

    fn single(layers: &[LayerMetrics], i: usize) -> PipelineEstimate {
        let stage = StageAggregate::build(&layers[i..i + 1], 1).unwrap();
        PipelineEstimate::from_single_stage(stage, 1, 4)
    }

    /// f = [1, 2, 1], b = [2, 3, 2] → stage latencies 3, 5, 3.
    fn fixture() -> Vec<LayerMetrics> {
        make_layers(&[(1.0, 2.0), (2.0, 3.0), (1.0, 2.0)])
    }

    #[test]
    fn test_single_stage() {
        let layers = fixture();
        let p = single(&layers, 1);
        assert!(p.is_valid());
        assert_eq!(p.t_fill(), 5.0);
        assert_eq!(p.t_steady(), 10.0);
        assert_eq!(p.t_drain(), 5.0);
        assert_eq!(p.total_latency(), 20.0);
        assert_eq!(p.kstar(), 0);
        assert_eq!(p.bottleneck_latency(), 5.0);
        assert_eq!(p.key(), MemoKey::new(1, 1, 1, 1, 4));
    }

    #[test]
    fn test_combine_bottleneck_on_right() {
        let layers = fixture();
        let p = PipelineEstimate::combine(single(&layers, 0), single(&layers, 1), 1, 4);
        // 3 vs 5: right wins, k* = 0 + 1, n = 2*2 + 1 + 1 = 6
        assert_eq!(p.kstar(), 1);
        assert_eq!(p.t_fill(), 8.0);
        assert_eq!(p.t_steady(), 30.0);
        assert_eq!(p.t_drain(), 5.0);
        assert_eq!(p.total_latency(), 43.0);
    }

    #[test]
    fn test_canonical_fixture_total() {
        let layers = fixture();
        let left = PipelineEstimate::combine(single(&layers, 0), single(&layers, 1), 1, 4);
        let p = PipelineEstimate::combine(left, single(&layers, 2), 1, 4);
        // 5 > 3: k* stays at 1, n = 2*3 + 1 + 1 = 8,
        // drain = left stages from k* (5) + all of right (3).
        assert_eq!(p.kstar(), 1);
        assert_eq!(p.t_fill(), 11.0);
        assert_eq!(p.t_steady(), 40.0);
        assert_eq!(p.t_drain(), 8.0);
        assert_eq!(p.total_latency(), 59.0);
        assert_eq!(p.num_stages(), 3);
        assert_eq!(p.key(), MemoKey::new(3, 0, 2, 1, 4));
    }

    #[test]
    fn test_equal_bottlenecks_pick_right() {
        let layers = make_layers(&[(1.0, 1.0), (1.0, 1.0)]);
        let p = PipelineEstimate::combine(single(&layers, 0), single(&layers, 1), 1, 2);
        assert_eq!(p.kstar(), 1);
        // n = 2*2 + 1 + 1 = 6
        assert_eq!(p.t_steady(), 12.0);
        assert_eq!(p.t_drain(), 2.0);
    }

    #[test]
    fn test_right_kstar_offset_by_left_stages() {
        // latencies 2, 2, 1, 9, 1
        let layers = make_layers(&[(1.0, 1.0), (1.0, 1.0), (0.5, 0.5), (4.0, 5.0), (0.5, 0.5)]);
        let left = PipelineEstimate::combine(single(&layers, 0), single(&layers, 1), 1, 8);
        let mid = PipelineEstimate::combine(single(&layers, 2), single(&layers, 3), 1, 8);
        let right = PipelineEstimate::combine(mid, single(&layers, 4), 1, 8);
        assert_eq!(right.kstar(), 1);

        let p = PipelineEstimate::combine(left, right, 1, 8);
        assert_eq!(p.kstar(), 3);
        assert_eq!(p.bottleneck_latency(), 9.0);
        // n = 2*5 + 3 + 1 = 14 ; drain = 9 + 1
        assert_eq!(p.t_steady(), 14.0 * 9.0);
        assert_eq!(p.t_drain(), 10.0);
    }

    #[test]
    fn test_invalid_propagation_is_symmetric() {
        let layers = fixture();
        let bad = || PipelineEstimate::invalid(1, 4);

        let p = PipelineEstimate::combine(bad(), single(&layers, 1), 1, 4);
        assert!(!p.is_valid());
        assert_eq!(p.total_latency(), f64::INFINITY);

        let p = PipelineEstimate::combine(single(&layers, 0), bad(), 1, 4);
        assert!(!p.is_valid());
        assert_eq!(p.total_latency(), f64::INFINITY);
        assert_eq!(p.num_stages(), 0);
        assert_eq!(p.kstar(), 0);

        let p = PipelineEstimate::combine(bad(), bad(), 1, 4);
        assert!(!p.is_valid());
    }

    #[test]
    fn test_invalid_state() {
        let p = PipelineEstimate::invalid(2, 8);
        assert!(!p.is_valid());
        assert_eq!(p.key(), MemoKey::EMPTY);
        assert_eq!(p.bottleneck_latency(), 0.0);
        assert_eq!(p.peak_memory_per_device(), None);
        assert!(p.summary().contains("invalid"));
    }

    #[test]
    fn test_key_and_latency_idempotent() {
        let layers = fixture();
        let p = PipelineEstimate::combine(single(&layers, 0), single(&layers, 1), 1, 4);
        assert_eq!(p.key(), p.key());
        assert_eq!(p.total_latency(), p.total_latency());
    }

    #[test]
    fn test_clone_shares_stages() {
        let layers = fixture();
        let p = PipelineEstimate::combine(single(&layers, 0), single(&layers, 1), 1, 4);
        let q = p.clone();
        assert!(Arc::ptr_eq(&p.stages()[0], &q.stages()[0]));

        let combined = PipelineEstimate::combine(q, single(&layers, 2), 1, 4);
        assert!(Arc::ptr_eq(&p.stages()[1], &combined.stages()[1]));
        assert_eq!(p.num_stages(), 2);
    }

    #[test]
    fn test_peak_memory() {
        let layers = fixture();
        let s0 = StageAggregate::build(&layers[0..2], 1).unwrap();
        let s1 = StageAggregate::build(&layers[2..3], 1).unwrap();
        let p = PipelineEstimate::combine(
            PipelineEstimate::from_single_stage(s0, 1, 2),
            PipelineEstimate::from_single_stage(s1, 1, 2),
            1,
            2,
        );
        // 2 layers * (6*1 + 2) = 16
        assert_eq!(p.peak_memory_per_device(), Some(16));
    }

    #[test]
    fn test_types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PipelineEstimate>();
        assert_send_sync::<StageAggregate>();
        assert_send_sync::<MemoKey>();
    }

    #[test]
    fn test_memo_key_serde() {
        let key = MemoKey::new(3, 0, 11, 2, 4);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(serde_json::from_str::<MemoKey>(&json).unwrap(), key);
        assert_eq!(key.to_string(), "(3, 0, 11, 2, 4)");
    }
}
