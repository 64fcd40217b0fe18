// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # cost-model
//!
//! Latency and memory estimates for pipeline-parallel training plans.
//!
//! Three levels of aggregation:
//!
//! ```text
//! LayerMetrics ──build──▶ StageAggregate ──from_single_stage──▶ PipelineEstimate
//!                                                                 │      ▲
//!                                                                 └──────┘
//!                                                                  combine
//! ```
//!
//! - [`StageAggregate`]: a contiguous run of layers replicated on
//!   `device_num` devices, with intra-node allreduce folded into its times.
//! - [`PipelineEstimate`]: fill / steady-state / drain latency of a chain
//!   of stages, built by combining two adjacent sub-pipelines.
//! - [`MemoKey`]: the shape of an estimate, for caller-side memoization.
//!
//! An infeasible candidate is a value, not an error: its latency is `+∞`
//! and [`PipelineEstimate::is_valid`] returns `false`. Bad input (missing
//! profile data, empty ranges, zero devices) is reported as
//! [`CostModelError`] at build time.
//!
//! # Example
//! ```
//! use cost_model::{PipelineEstimate, StageAggregate};
//! use layer_profile::LayerMetrics;
//! use std::collections::BTreeMap;
//!
//! let layers: Vec<LayerMetrics> = [(1.0, 2.0), (2.0, 3.0)]
//!     .iter()
//!     .enumerate()
//!     .map(|(i, &(f, b))| LayerMetrics::new(i, f, b, BTreeMap::new(), BTreeMap::new(), (1, 1)))
//!     .collect();
//!
//! let s0 = StageAggregate::build(&layers[0..1], 1).unwrap();
//! let s1 = StageAggregate::build(&layers[1..2], 1).unwrap();
//! let p = PipelineEstimate::combine(
//!     PipelineEstimate::from_single_stage(s0, 1, 2),
//!     PipelineEstimate::from_single_stage(s1, 1, 2),
//!     1,
//!     2,
//! );
//! assert_eq!(p.total_latency(), 43.0);
//! ```

mod config;
mod error;
mod pipeline;
mod stage;

pub use config::{CostModelConfig, DEFAULT_ACTIVATION_MEMORY_MULTIPLIER};
pub use error::CostModelError;
pub use pipeline::{MemoKey, PipelineEstimate};
pub use stage::StageAggregate;
