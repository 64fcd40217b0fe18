// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Divide-and-conquer template search.
//!
//! # Algorithm
//!
//! For a layer range, a stage count and a topology, the best pipeline is
//! either a single stage on all of the node's GPUs or the best combination
//! of two sub-pipelines over a split of the range:
//!
//! ```text
//! dc(range, S, nodes, gpus) = min over k, S_left, share:
//!     combine(dc(start..k, S_left, share_left), dc(k..end, S - S_left, share_right))
//! ```
//!
//! On one node the GPUs are shared out between the halves; on several nodes
//! whole nodes are. A stage never spans nodes, so a sub-problem with more
//! nodes than stages is infeasible.
//!
//! Results, including infeasible ones, are memoized in a concurrent map
//! keyed by [`MemoKey`]. Split points are evaluated in parallel with rayon.

use crate::{PipelineTemplate, SearchError};
use cost_model::{CostModelConfig, MemoKey, PipelineEstimate, StageAggregate};
use dashmap::DashMap;
use layer_profile::profile::Validated;
use layer_profile::LayerProfile;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

/// Searches for the fastest pipeline template per node count.
///
/// Safe to share across threads; all caches are concurrent maps.
pub struct TemplateGenerator {
    profile: LayerProfile<Validated>,
    config: CostModelConfig,
    /// Keyed by `(start, end, device_num)`, `end` exclusive.
    stage_cache: DashMap<(usize, usize, u32), Arc<StageAggregate>>,
    estimate_cache: DashMap<MemoKey, PipelineEstimate>,
}

impl TemplateGenerator {
    pub fn new(profile: LayerProfile<Validated>, config: CostModelConfig) -> Self {
        tracing::debug!(
            "template generator for '{}' with {} layers",
            profile.model,
            profile.num_layers()
        );
        Self {
            profile,
            config,
            stage_cache: DashMap::new(),
            estimate_cache: DashMap::new(),
        }
    }

    pub fn profile(&self) -> &LayerProfile<Validated> {
        &self.profile
    }

    pub fn num_layers(&self) -> usize {
        self.profile.num_layers()
    }

    /// Number of memoized estimates (valid and invalid).
    pub fn cached_estimates(&self) -> usize {
        self.estimate_cache.len()
    }

    /// Number of distinct stages built so far.
    pub fn cached_stages(&self) -> usize {
        self.stage_cache.len()
    }

    /// Best pipeline of `num_stages` stages over `layers` on the given topology.
    ///
    /// Returns an invalid estimate when the shape cannot be realized. Fails
    /// only on bad input (range outside the profile, missing allreduce data).
    pub fn divide_and_conquer(
        &self,
        layers: Range<usize>,
        num_stages: usize,
        num_nodes: u32,
        num_gpus_per_node: u32,
    ) -> Result<PipelineEstimate, SearchError> {
        // Bounds check up front so the key below is well formed.
        self.profile.layer_range(layers.clone())?;

        let key = MemoKey::new(
            num_stages,
            layers.start,
            layers.end - 1,
            num_nodes,
            num_gpus_per_node,
        );
        let cached = self.estimate_cache.get(&key).map(|e| e.value().clone());
        if let Some(estimate) = cached {
            return Ok(estimate);
        }

        let num_layers = layers.end - layers.start;
        let infeasible = num_stages == 0
            || num_nodes == 0
            || num_gpus_per_node == 0
            || num_stages > num_layers
            || (num_nodes == 1 && (num_gpus_per_node as usize) < num_stages)
            || num_nodes as usize > num_stages;
        if infeasible {
            return Ok(self.memoize(key, PipelineEstimate::invalid(num_nodes, num_gpus_per_node)));
        }

        if num_stages == 1 {
            let stage = self.stage(layers.clone(), num_gpus_per_node)?;
            let estimate = PipelineEstimate::from_single_stage(stage, num_nodes, num_gpus_per_node);
            return Ok(self.memoize(key, estimate));
        }

        // Best per split point, then best overall. Both passes keep the
        // earliest candidate on ties, so the result does not depend on
        // thread scheduling.
        let per_split: Vec<Option<PipelineEstimate>> = (layers.start + 1..layers.end)
            .into_par_iter()
            .map(|k| self.best_split_at(&layers, k, num_stages, num_nodes, num_gpus_per_node))
            .collect::<Result<_, _>>()?;

        let best = pick_fastest(per_split.into_iter().flatten())
            .unwrap_or_else(|| PipelineEstimate::invalid(num_nodes, num_gpus_per_node));

        tracing::trace!("dc{} -> {}", key, best.total_latency());
        Ok(self.memoize(key, best))
    }

    /// Best combination with the range split before layer `k`.
    fn best_split_at(
        &self,
        layers: &Range<usize>,
        k: usize,
        num_stages: usize,
        num_nodes: u32,
        num_gpus_per_node: u32,
    ) -> Result<Option<PipelineEstimate>, SearchError> {
        let mut candidates = Vec::new();

        for num_stages_left in 1..num_stages {
            let num_stages_right = num_stages - num_stages_left;

            // (left nodes, left gpus, right nodes, right gpus)
            let shares: Vec<(u32, u32, u32, u32)> = if num_nodes == 1 {
                (1..num_gpus_per_node)
                    .map(|g| (1, g, 1, num_gpus_per_node - g))
                    .collect()
            } else {
                (1..num_nodes)
                    .map(|n| (n, num_gpus_per_node, num_nodes - n, num_gpus_per_node))
                    .collect()
            };

            for (nodes_left, gpus_left, nodes_right, gpus_right) in shares {
                let left =
                    self.divide_and_conquer(layers.start..k, num_stages_left, nodes_left, gpus_left)?;
                if !left.is_valid() {
                    continue;
                }
                let right = self.divide_and_conquer(
                    k..layers.end,
                    num_stages_right,
                    nodes_right,
                    gpus_right,
                )?;
                if !right.is_valid() {
                    continue;
                }
                candidates.push(PipelineEstimate::combine(
                    left,
                    right,
                    num_nodes,
                    num_gpus_per_node,
                ));
            }
        }

        Ok(pick_fastest(candidates.into_iter()))
    }

    /// Searches every node count and returns the fastest template for each.
    ///
    /// For `n` nodes, stage counts from `n` up to
    /// `min(n * num_gpus_per_node, num_layers)` are tried over the whole model.
    pub fn create_pipeline_templates(
        &self,
        node_counts: &[u32],
        num_gpus_per_node: u32,
    ) -> Result<BTreeMap<u32, PipelineTemplate>, SearchError> {
        let mut node_counts = node_counts.to_vec();
        node_counts.sort_unstable();
        node_counts.dedup();

        let num_layers = self.num_layers();
        let max_nodes = *node_counts.last().ok_or(SearchError::NoNodeCounts)?;
        if max_nodes as usize > num_layers {
            return Err(SearchError::TooManyNodes {
                num_nodes: max_nodes,
                num_layers,
            });
        }

        let mut templates = BTreeMap::new();
        for num_nodes in node_counts {
            let max_stages = (num_nodes as usize * num_gpus_per_node as usize).min(num_layers);

            let mut estimates = Vec::new();
            for num_stages in num_nodes as usize..=max_stages {
                let estimate =
                    self.divide_and_conquer(0..num_layers, num_stages, num_nodes, num_gpus_per_node)?;
                tracing::debug!(
                    "{} node(s), {} stage(s): latency {}",
                    num_nodes,
                    num_stages,
                    estimate.total_latency()
                );
                estimates.push(estimate);
            }

            let best = pick_fastest(estimates.into_iter()).ok_or(SearchError::NoFeasibleTemplate {
                num_nodes,
                num_gpus_per_node,
            })?;
            let template = PipelineTemplate::from_estimate(&best, &self.profile)?;
            tracing::info!("{}", template.summary());
            templates.insert(num_nodes, template);
        }

        Ok(templates)
    }

    /// Cached stage over `layers` replicated on `device_num` GPUs.
    fn stage(&self, layers: Range<usize>, device_num: u32) -> Result<Arc<StageAggregate>, SearchError> {
        let key = (layers.start, layers.end, device_num);
        let cached = self.stage_cache.get(&key).map(|s| Arc::clone(s.value()));
        if let Some(stage) = cached {
            return Ok(stage);
        }

        let slice = self.profile.layer_range(layers)?;
        let stage = Arc::new(StageAggregate::build_with_config(slice, device_num, &self.config)?);
        Ok(Arc::clone(self.stage_cache.entry(key).or_insert(stage).value()))
    }

    /// Inserts `estimate` unless another thread got there first, and returns
    /// the cached value.
    fn memoize(&self, key: MemoKey, estimate: PipelineEstimate) -> PipelineEstimate {
        self.estimate_cache
            .entry(key)
            .or_insert(estimate)
            .value()
            .clone()
    }
}

/// Fastest valid estimate; the first one wins ties.
fn pick_fastest(estimates: impl Iterator<Item = PipelineEstimate>) -> Option<PipelineEstimate> {
    estimates
        .filter(PipelineEstimate::is_valid)
        .min_by_key(|e| OrderedFloat(e.total_latency()))
}
