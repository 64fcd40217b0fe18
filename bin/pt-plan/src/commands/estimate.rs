// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `pt-plan estimate` command: cost one explicit stage layout.
//!
//! Builds each listed stage, chains them left to right and prints the
//! fill / steady / drain terms along with per-stage memory.

use cost_model::{PipelineEstimate, StageAggregate};
use std::path::PathBuf;
use template_search::PlannerConfig;

pub fn execute(
    config: &PlannerConfig,
    profile: Option<PathBuf>,
    stages: &str,
    num_nodes: u32,
    gpus_per_node: Option<u32>,
) -> anyhow::Result<()> {
    let profile = super::load_profile(config, profile)?;
    let specs = super::parse_stage_specs(stages)?;
    let num_gpus_per_node = gpus_per_node.unwrap_or(config.num_gpus_per_node);

    let mut estimate: Option<PipelineEstimate> = None;
    for spec in &specs {
        let layers = profile.layer_range(spec.start..spec.end + 1)?;
        let stage = StageAggregate::build_with_config(layers, spec.device_num, &config.cost_model)?;
        tracing::debug!("{stage}: latency {:.3}", stage.latency());

        let single = PipelineEstimate::from_single_stage(stage, num_nodes, num_gpus_per_node);
        estimate = Some(match estimate {
            Some(left) => PipelineEstimate::combine(left, single, num_nodes, num_gpus_per_node),
            None => single,
        });
    }
    let estimate = estimate.ok_or_else(|| anyhow::anyhow!("no stages given"))?;

    println!("  Model: {} ({})", profile.model, profile.tag);
    println!(
        "  Topology: {} node(s) x {} GPU(s)",
        num_nodes, num_gpus_per_node
    );
    println!();

    println!(
        "  {:<4} {:<16} {:>8} {:>10} {:>10} {:>10} {:>12}",
        "#", "Layers", "Devices", "Fwd", "Bwd", "Latency", "Mem/device",
    );
    println!("  {}", "-".repeat(76));
    for (i, stage) in estimate.stages().iter().enumerate() {
        let marker = if i == estimate.kstar() { "*" } else { "" };
        println!(
            "  {:<4} {:<16} {:>8} {:>10.3} {:>10.3} {:>10.3} {:>12}",
            format!("{i}{marker}"),
            format!("{}-{}", stage.first_layer_index(), stage.last_layer_index()),
            stage.device_num(),
            stage.forward_total(),
            stage.backward_total(),
            stage.latency(),
            stage.memory_per_device(),
        );
    }
    println!();

    println!("  Fill:    {:.3}", estimate.t_fill());
    println!("  Steady:  {:.3}", estimate.t_steady());
    println!("  Drain:   {:.3}", estimate.t_drain());
    println!("  Total:   {:.3}", estimate.total_latency());
    println!("  Key:     {}", estimate.key());
    println!();

    Ok(())
}
