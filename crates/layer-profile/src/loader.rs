// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Profile loading from JSON manifests.
//!
//! Profiles live in a directory as `<model>__<tag>.json`, one per profiled
//! model/microbatch configuration.

use crate::profile::Validated;
use crate::{LayerProfile, ProfileError, ProfileManifest};
use std::path::{Path, PathBuf};

/// Loads layer profiles into a validated [`LayerProfile`].
pub struct ProfileLoader;

impl ProfileLoader {
    /// Loads and validates a profile from a JSON file.
    pub fn load(path: &Path) -> Result<LayerProfile<Validated>, ProfileError> {
        let manifest = ProfileManifest::from_file(path)?;
        tracing::debug!(
            "loaded profile manifest '{}' with {} layers from {}",
            manifest.model,
            manifest.layers.len(),
            path.display(),
        );
        Self::from_manifest(&manifest)
    }

    /// Loads `<dir>/<model>__<tag>.json`.
    pub fn load_named(
        dir: &Path,
        model: &str,
        tag: &str,
    ) -> Result<LayerProfile<Validated>, ProfileError> {
        Self::load(&Self::profile_path(dir, model, tag))
    }

    /// Parses and validates a profile from a JSON string.
    pub fn from_json(json: &str) -> Result<LayerProfile<Validated>, ProfileError> {
        let manifest = ProfileManifest::from_json(json)?;
        Self::from_manifest(&manifest)
    }

    /// Builds a validated profile from an in-memory manifest.
    pub fn from_manifest(
        manifest: &ProfileManifest,
    ) -> Result<LayerProfile<Validated>, ProfileError> {
        manifest.validate()?;
        LayerProfile::new(
            manifest.model.clone(),
            manifest.tag.clone(),
            manifest.to_layer_metrics(),
        )
        .validate()
    }

    /// Conventional location of a profile file.
    pub fn profile_path(dir: &Path, model: &str, tag: &str) -> PathBuf {
        dir.join(format!("{model}__{tag}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json(n: usize) -> String {
        let layers: Vec<String> = (0..n)
            .map(|i| {
                format!(
                    r#"{{ "name": "layer{i}", "forward": {f}, "backward": {b}, "allreduce_in_node": {{ "1": 0.1 }}, "mem_required": [{i}, 4] }}"#,
                    f = i + 1,
                    b = 2 * (i + 1),
                )
            })
            .collect();
        format!(
            r#"{{ "model": "gpt2", "tag": "test", "layers": [{}] }}"#,
            layers.join(",")
        )
    }

    #[test]
    fn test_from_json() {
        let p = ProfileLoader::from_json(&sample_json(4)).unwrap();
        assert_eq!(p.num_layers(), 4);
        assert_eq!(p.model, "gpt2");
        assert_eq!(p.layer(3).unwrap().forward_time(), 4.0);
    }

    #[test]
    fn test_from_json_empty() {
        let err = ProfileLoader::from_json(r#"{ "model": "m", "layers": [] }"#);
        assert!(matches!(err, Err(ProfileError::EmptyProfile { .. })));
    }

    #[test]
    fn test_profile_path() {
        let p = ProfileLoader::profile_path(Path::new("/tmp/profiles"), "gpt2", "test");
        assert_eq!(p, PathBuf::from("/tmp/profiles/gpt2__test.json"));
    }

    #[test]
    fn test_load_named_from_disk() {
        let dir = std::env::temp_dir().join(format!("layer-profile-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = ProfileLoader::profile_path(&dir, "gpt2", "disk");
        std::fs::write(&path, sample_json(3)).unwrap();

        let p = ProfileLoader::load_named(&dir, "gpt2", "disk").unwrap();
        assert_eq!(p.num_layers(), 3);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let err = ProfileLoader::load(Path::new("/nonexistent/profile.json"));
        assert!(matches!(err, Err(ProfileError::ReadError(_))));
    }
}
