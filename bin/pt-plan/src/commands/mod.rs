// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommands and the helpers they share.

pub mod estimate;
pub mod generate;
pub mod inspect;

use anyhow::Context;
use layer_profile::{profile::Validated, LayerProfile, ProfileLoader};
use std::path::{Path, PathBuf};
use template_search::PlannerConfig;

/// Installs a `fmt` subscriber; `RUST_LOG` wins over the `-v` count.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the planner config from `path`, or the defaults when none is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<PlannerConfig> {
    match path {
        Some(path) => {
            let config = PlannerConfig::from_file(path)?;
            tracing::debug!("loaded config from {}", path.display());
            Ok(config)
        }
        None => Ok(PlannerConfig::default()),
    }
}

/// Loads the profile named on the command line, falling back to the config.
pub fn load_profile(
    config: &PlannerConfig,
    flag: Option<PathBuf>,
) -> anyhow::Result<LayerProfile<Validated>> {
    let path = flag
        .or_else(|| config.profile_path.clone())
        .ok_or_else(|| anyhow::anyhow!("no profile given: pass --profile or set profile_path"))?;
    ProfileLoader::load(&path)
        .with_context(|| format!("failed to load profile from '{}'", path.display()))
}

/// Builds the worker pool the search runs in.
pub fn build_pool(config: &PlannerConfig) -> anyhow::Result<rayon::ThreadPool> {
    let threads = config.resolve_threads();
    tracing::debug!("search pool with {threads} thread(s)");
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("failed to build thread pool")
}

/// Parses `"1,2,4"` into node counts.
pub fn parse_node_counts(s: &str) -> anyhow::Result<Vec<u32>> {
    s.split(',')
        .map(|part| {
            let part = part.trim();
            match part.parse::<u32>() {
                Ok(0) => Err(anyhow::anyhow!("node count must be at least 1")),
                Ok(n) => Ok(n),
                Err(e) => Err(anyhow::anyhow!("invalid node count '{part}': {e}")),
            }
        })
        .collect()
}

/// One `start-end:devices` entry of `--stages`, with `end` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSpec {
    pub start: usize,
    pub end: usize,
    pub device_num: u32,
}

/// Parses `"0-2:1,3-5:2"` and checks the ranges are in order and adjacent.
pub fn parse_stage_specs(s: &str) -> anyhow::Result<Vec<StageSpec>> {
    let specs = s
        .split(',')
        .map(|part| parse_stage_spec(part.trim()))
        .collect::<anyhow::Result<Vec<_>>>()?;

    for pair in specs.windows(2) {
        if pair[1].start != pair[0].end + 1 {
            anyhow::bail!(
                "stage {}-{} does not start right after stage {}-{}",
                pair[1].start,
                pair[1].end,
                pair[0].start,
                pair[0].end
            );
        }
    }
    Ok(specs)
}

fn parse_stage_spec(part: &str) -> anyhow::Result<StageSpec> {
    let (range, devices) = part.split_once(':').unwrap_or((part, "1"));
    let (start, end) = match range.split_once('-') {
        Some((a, b)) => (a.trim(), b.trim()),
        None => (range.trim(), range.trim()),
    };
    let start: usize = start
        .parse()
        .with_context(|| format!("invalid stage start in '{part}'"))?;
    let end: usize = end
        .parse()
        .with_context(|| format!("invalid stage end in '{part}'"))?;
    let device_num: u32 = devices
        .trim()
        .parse()
        .with_context(|| format!("invalid device count in '{part}'"))?;
    if end < start {
        anyhow::bail!("stage '{part}' ends before it starts");
    }
    if end == usize::MAX {
        anyhow::bail!("stage end in '{part}' is out of range");
    }
    Ok(StageSpec {
        start,
        end,
        device_num,
    })
}

/// Shortens `s` to at most `max` characters for table output.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
