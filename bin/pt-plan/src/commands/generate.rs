// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `pt-plan generate` command: search templates for a set of node counts.

use super::truncate;
use std::path::PathBuf;
use std::time::Instant;
use template_search::{PlannerConfig, TemplateGenerator};

pub fn execute(
    config: &PlannerConfig,
    profile: Option<PathBuf>,
    nodes: Option<&str>,
    gpus_per_node: Option<u32>,
    json: bool,
) -> anyhow::Result<()> {
    let profile = super::load_profile(config, profile)?;
    let node_counts = match nodes {
        Some(s) => super::parse_node_counts(s)?,
        None => config.node_counts.clone(),
    };
    let num_gpus_per_node = gpus_per_node.unwrap_or(config.num_gpus_per_node);
    if num_gpus_per_node == 0 {
        anyhow::bail!("--gpus-per-node must be at least 1");
    }

    let model = format!("{} ({})", profile.model, profile.tag);
    let generator = TemplateGenerator::new(profile, config.cost_model);
    let pool = super::build_pool(config)?;

    let start = Instant::now();
    let templates =
        pool.install(|| generator.create_pipeline_templates(&node_counts, num_gpus_per_node))?;
    let elapsed = start.elapsed();
    tracing::info!(
        "search finished in {:.2?}: {} estimates, {} stages cached",
        elapsed,
        generator.cached_estimates(),
        generator.cached_stages(),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&templates)?);
        return Ok(());
    }

    println!("  Model: {model}");
    println!("  GPUs per node: {num_gpus_per_node}");
    println!("  Search time: {elapsed:.2?}");
    println!();

    for template in templates.values() {
        println!("  {}", template.summary());
        for (i, stage) in template.stages.iter().enumerate() {
            let first = stage.layer_names.first().map(String::as_str).unwrap_or("");
            let last = stage.layer_names.last().map(String::as_str).unwrap_or("");
            println!(
                "    stage {:<3} {:>3} layer(s) x{:<2} mem/device {:>10}  {} .. {}",
                i,
                stage.layer_indices.len(),
                stage.device_num,
                stage.memory_per_device,
                truncate(first, 24),
                truncate(last, 24),
            );
        }
        println!();
    }

    Ok(())
}
