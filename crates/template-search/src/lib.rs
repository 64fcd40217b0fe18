// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # template-search
//!
//! Finds the fastest pipeline-parallel plan ("pipeline template") for each
//! requested node count, using the latency model from `cost-model`.
//!
//! - [`TemplateGenerator`]: memoized divide-and-conquer search over layer
//!   splits, stage counts and GPU/node shares, parallelized with rayon.
//! - [`PipelineTemplate`]: the chosen plan, with per-stage layer names,
//!   replication and memory.
//! - [`PlannerConfig`]: TOML configuration for a search run.
//!
//! # Example
//! ```no_run
//! use cost_model::CostModelConfig;
//! use layer_profile::ProfileLoader;
//! use std::path::Path;
//! use template_search::TemplateGenerator;
//!
//! let profile = ProfileLoader::load(Path::new("./profiles/gpt2__mb4.json")).unwrap();
//! let generator = TemplateGenerator::new(profile, CostModelConfig::default());
//! let templates = generator.create_pipeline_templates(&[1, 2, 4], 4).unwrap();
//! for template in templates.values() {
//!     println!("{}", template.summary());
//! }
//! ```

mod config;
mod error;
mod generator;
mod template;

pub use config::PlannerConfig;
pub use error::SearchError;
pub use generator::TemplateGenerator;
pub use template::{PipelineTemplate, StageTemplate};
