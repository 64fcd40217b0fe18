// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pipeline templates: the chosen plan for one node count, in the form the
//! training engine consumes.

use crate::SearchError;
use cost_model::{MemoKey, PipelineEstimate};
use layer_profile::profile::Validated;
use layer_profile::LayerProfile;

/// One stage of a materialized template.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StageTemplate {
    /// Indices of the layers in this stage (into the profile).
    pub layer_indices: Vec<usize>,
    /// Layer names, in the same order as `layer_indices`.
    pub layer_names: Vec<String>,
    /// Number of GPUs the stage is replicated on.
    pub device_num: u32,
    /// Memory units each replica holds.
    pub memory_per_device: u64,
}

/// The best plan found for a given number of nodes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PipelineTemplate {
    pub num_nodes: u32,
    pub num_gpus_per_node: u32,
    /// Estimated iteration latency.
    pub latency: f64,
    pub key: MemoKey,
    pub stages: Vec<StageTemplate>,
}

impl PipelineTemplate {
    /// Materializes a valid estimate, resolving layer names from `profile`.
    pub fn from_estimate(
        estimate: &PipelineEstimate,
        profile: &LayerProfile<Validated>,
    ) -> Result<Self, SearchError> {
        if !estimate.is_valid() {
            return Err(SearchError::InvalidEstimate);
        }

        let stages = estimate
            .stages()
            .iter()
            .map(|stage| StageTemplate {
                layer_indices: stage.layer_indices().to_vec(),
                layer_names: stage
                    .layer_indices()
                    .iter()
                    .map(|&i| profile.layer_name(i))
                    .collect(),
                device_num: stage.device_num(),
                memory_per_device: stage.memory_per_device(),
            })
            .collect();

        Ok(Self {
            num_nodes: estimate.num_nodes(),
            num_gpus_per_node: estimate.num_gpus_per_node(),
            latency: estimate.total_latency(),
            key: estimate.key(),
            stages,
        })
    }

    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    /// Layer names grouped by stage.
    pub fn modules_per_stage(&self) -> Vec<Vec<String>> {
        self.stages.iter().map(|s| s.layer_names.clone()).collect()
    }

    /// GPUs used across all stages.
    pub fn total_devices(&self) -> u32 {
        self.stages.iter().map(|s| s.device_num).sum()
    }

    /// Largest per-device memory among the stages.
    pub fn peak_memory_per_device(&self) -> u64 {
        self.stages
            .iter()
            .map(|s| s.memory_per_device)
            .max()
            .unwrap_or(0)
    }

    /// Returns a human-readable one-line summary.
    pub fn summary(&self) -> String {
        let shape: Vec<String> = self
            .stages
            .iter()
            .map(|s| {
                format!(
                    "{}-{}x{}",
                    s.layer_indices.first().copied().unwrap_or(0),
                    s.layer_indices.last().copied().unwrap_or(0),
                    s.device_num
                )
            })
            .collect();
        format!(
            "{} node(s) x {} GPU(s): {} stage(s) [{}], latency {:.3}, peak mem/device {}",
            self.num_nodes,
            self.num_gpus_per_node,
            self.num_stages(),
            shape.join(", "),
            self.latency,
            self.peak_memory_per_device(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cost_model::StageAggregate;
    use layer_profile::LayerMetrics;
    use std::collections::BTreeMap;

    fn profile() -> LayerProfile<Validated> {
        let layers = (0..3)
            .map(|i| {
                let l = LayerMetrics::new(
                    i,
                    1.0,
                    1.0,
                    BTreeMap::from([(1, 0.5)]),
                    BTreeMap::new(),
                    (1, 4),
                );
                if i == 1 {
                    l
                } else {
                    l.with_name(format!("block{i}"))
                }
            })
            .collect();
        LayerProfile::new("m".into(), "t".into(), layers)
            .validate()
            .unwrap()
    }

    #[test]
    fn test_from_estimate() {
        let p = profile();
        let s0 = StageAggregate::build(p.layer_range(0..2).unwrap(), 1).unwrap();
        let s1 = StageAggregate::build(p.layer_range(2..3).unwrap(), 2).unwrap();
        let est = PipelineEstimate::combine(
            PipelineEstimate::from_single_stage(s0, 1, 3),
            PipelineEstimate::from_single_stage(s1, 1, 3),
            1,
            3,
        );

        let t = PipelineTemplate::from_estimate(&est, &p).unwrap();
        assert_eq!(t.num_stages(), 2);
        assert_eq!(t.latency, est.total_latency());
        assert_eq!(t.key, est.key());
        assert_eq!(t.total_devices(), 3);
        assert_eq!(
            t.modules_per_stage(),
            vec![
                vec!["block0".to_string(), "layer1".to_string()],
                vec!["block2".to_string()],
            ]
        );
        // (6*1 + 4) / 2
        assert_eq!(t.stages[1].memory_per_device, 5);
        assert_eq!(t.peak_memory_per_device(), 20);
        assert!(t.summary().contains("2 stage(s)"));
    }

    #[test]
    fn test_from_invalid_estimate() {
        let p = profile();
        let est = PipelineEstimate::invalid(1, 1);
        assert!(matches!(
            PipelineTemplate::from_estimate(&est, &p),
            Err(SearchError::InvalidEstimate)
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let p = profile();
        let s = StageAggregate::build(p.layers(), 1).unwrap();
        let est = PipelineEstimate::from_single_stage(s, 1, 1);
        let t = PipelineTemplate::from_estimate(&est, &p).unwrap();

        let json = serde_json::to_string(&t).unwrap();
        let back: PipelineTemplate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
