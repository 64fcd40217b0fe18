// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `pt-plan inspect` command: display per-layer profile data.

use super::truncate;
use std::path::PathBuf;
use template_search::PlannerConfig;

pub fn execute(config: &PlannerConfig, profile: Option<PathBuf>) -> anyhow::Result<()> {
    let profile = super::load_profile(config, profile)?;

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║             pt-plan · Profile Inspector              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Summary ────────────────────────────────────────────────
    let (act, param) = profile.total_memory_units();
    println!("  Model: {} ({})", profile.model, profile.tag);
    println!("  Layers: {}", profile.num_layers());
    println!("  Total forward:  {:.3}", profile.total_forward_time());
    println!("  Total backward: {:.3}", profile.total_backward_time());
    println!("  Memory units:   act {act} / param {param}");
    println!();

    // ── Per-Layer Detail ───────────────────────────────────────
    println!(
        "  {:<4} {:<28} {:>9} {:>9} {:>9} {:>9} {:>12}",
        "Idx", "Name", "Fwd", "Bwd", "Act", "Param", "Allreduce",
    );
    println!("  {}", "-".repeat(86));

    for (i, layer) in profile.iter_layers().enumerate() {
        let peers: Vec<String> = layer
            .intra_node_allreduce_cost()
            .keys()
            .map(|k| k.to_string())
            .collect();
        println!(
            "  {:<4} {:<28} {:>9.3} {:>9.3} {:>9} {:>9} {:>12}",
            i,
            truncate(&profile.layer_name(i), 28),
            layer.forward_time(),
            layer.backward_time(),
            layer.activation_memory(),
            layer.parameter_memory(),
            truncate(&peers.join(","), 12),
        );
    }
    println!();

    Ok(())
}
