// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # layer-profile
//!
//! Per-layer profiling records consumed by the pipeline cost model.
//!
//! - [`LayerMetrics`]: one profiled layer: forward/backward time,
//!   allreduce costs within and across nodes, and memory units.
//! - [`LayerProfile`]: the whole model as an ordered run of layers, with a
//!   **type-state pattern** (`Loaded` → `Validated`).
//! - [`ProfileLoader`]: loads a profile from a JSON manifest.
//! - [`ProfileManifest`]: the JSON profile descriptor.
//!
//! # Profile Format
//! Profiles are stored as `<model>__<tag>.json` inside a profile directory.
//! See [`ProfileManifest`] for the schema.
//!
//! # Example
//! ```no_run
//! use layer_profile::ProfileLoader;
//! use std::path::Path;
//!
//! let profile = ProfileLoader::load(Path::new("./profiles/gpt2__test.json")).unwrap();
//! println!("{}", profile.summary());
//! for layer in profile.iter_layers() {
//!     println!("  {}", layer.summary());
//! }
//! ```

mod error;
mod loader;
pub(crate) mod manifest;
mod metrics;
pub mod profile;

pub use error::ProfileError;
pub use loader::ProfileLoader;
pub use manifest::{ManifestLayer, ProfileManifest};
pub use metrics::LayerMetrics;
pub use profile::LayerProfile;
