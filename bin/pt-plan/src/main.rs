// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # pt-plan
//!
//! Command-line interface for the pipeline template planner.
//!
//! ## Usage
//! ```bash
//! # Inspect a layer profile
//! pt-plan inspect --profile ./profiles/gpt2__mb4.json
//!
//! # Estimate one hand-written plan: layers 0-5 on 1 GPU, 6-11 on 2 GPUs
//! pt-plan estimate --profile ./profiles/gpt2__mb4.json --stages 0-5:1,6-11:2 --gpus-per-node 4
//!
//! # Search templates for several node counts
//! pt-plan generate --profile ./profiles/gpt2__mb4.json --nodes 1,2,4 --gpus-per-node 4 --json
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pt-plan",
    about = "Pipeline-parallel template planner for layered training workloads",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file (CLI arguments override it).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print per-layer profile data and totals.
    Inspect {
        /// Path to the JSON layer profile.
        #[arg(short, long)]
        profile: Option<PathBuf>,
    },

    /// Estimate the latency of an explicit stage layout.
    Estimate {
        /// Path to the JSON layer profile.
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Stages as inclusive layer ranges with device counts (e.g., "0-2:1,3-5:2").
        #[arg(short, long)]
        stages: String,

        /// Number of nodes the plan runs on.
        #[arg(short, long, default_value_t = 1)]
        nodes: u32,

        /// GPUs per node.
        #[arg(short, long)]
        gpus_per_node: Option<u32>,
    },

    /// Search the fastest template for each node count.
    Generate {
        /// Path to the JSON layer profile.
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Comma-separated node counts (e.g., "1,2,4").
        #[arg(short, long)]
        nodes: Option<String>,

        /// GPUs per node.
        #[arg(short, long)]
        gpus_per_node: Option<u32>,

        /// Print templates as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect { profile } => commands::inspect::execute(&config, profile),
        Commands::Estimate {
            profile,
            stages,
            nodes,
            gpus_per_node,
        } => commands::estimate::execute(&config, profile, &stages, nodes, gpus_per_node),
        Commands::Generate {
            profile,
            nodes,
            gpus_per_node,
            json,
        } => commands::generate::execute(&config, profile, nodes.as_deref(), gpus_per_node, json),
    }
}
