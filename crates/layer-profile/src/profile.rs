// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layer profile: the model as an ordered run of profiled layers.
//!
//! # Type-State Pattern
//!
//! ```text
//! LayerProfile<Loaded>     : records parsed, not yet checked.
//!       │  .validate()
//!       ▼
//! LayerProfile<Validated>  : indices and times verified, ready for planning.
//! ```
//!
//! Stage aggregation and the template search only accept a validated
//! profile, so contiguous `0..N` indexing can be relied upon downstream.

use crate::{LayerMetrics, ProfileError};
use std::fmt;
use std::ops::Range;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: profile has been loaded but not validated.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: profile has been validated.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for profile states.
pub trait ProfileState: fmt::Debug + Clone {}
impl ProfileState for Loaded {}
impl ProfileState for Validated {}

// ── LayerProfile ───────────────────────────────────────────────────

/// Profiled layers of one model, in execution order.
#[derive(Debug, Clone)]
pub struct LayerProfile<S: ProfileState = Loaded> {
    /// Model name (e.g., `"gpt2"`).
    pub model: String,
    /// Profiling tag (e.g., microbatch size or hardware label).
    pub tag: String,
    layers: Vec<LayerMetrics>,
    _state: std::marker::PhantomData<S>,
}

// ── Loaded state ───────────────────────────────────────────────────

impl LayerProfile<Loaded> {
    /// Creates a new profile in the `Loaded` state.
    pub fn new(model: String, tag: String, layers: Vec<LayerMetrics>) -> Self {
        Self {
            model,
            tag,
            layers,
            _state: std::marker::PhantomData,
        }
    }

    /// Validates the profile and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - The profile is non-empty.
    /// - Layer indices are consecutive starting from 0.
    /// - All times are finite and non-negative.
    pub fn validate(self) -> Result<LayerProfile<Validated>, ProfileError> {
        if self.layers.is_empty() {
            return Err(ProfileError::EmptyProfile { model: self.model });
        }

        for (i, layer) in self.layers.iter().enumerate() {
            if layer.layer_index() != i {
                return Err(ProfileError::InvalidLayer {
                    layer: layer.layer_index(),
                    detail: format!("expected index {i}, got {}", layer.layer_index()),
                });
            }
            layer
                .check_times()
                .map_err(|detail| ProfileError::InvalidLayer { layer: i, detail })?;

            if layer.compute_time() == 0.0 {
                tracing::warn!(
                    "layer {} of '{}' has zero forward+backward time; profile may be incomplete",
                    i,
                    self.model,
                );
            }
        }

        Ok(LayerProfile {
            model: self.model,
            tag: self.tag,
            layers: self.layers,
            _state: std::marker::PhantomData,
        })
    }
}

// ── Validated state ────────────────────────────────────────────────

impl LayerProfile<Validated> {
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[LayerMetrics] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&LayerMetrics> {
        self.layers.get(index)
    }

    /// Returns the contiguous slice of layers `range.start..range.end`.
    pub fn layer_range(&self, range: Range<usize>) -> Result<&[LayerMetrics], ProfileError> {
        if range.start >= range.end || range.end > self.layers.len() {
            return Err(ProfileError::RangeOutOfBounds {
                start: range.start,
                end: range.end,
                num_layers: self.layers.len(),
            });
        }
        Ok(&self.layers[range])
    }

    pub fn iter_layers(&self) -> impl Iterator<Item = &LayerMetrics> {
        self.layers.iter()
    }

    /// Sum of forward times over all layers.
    pub fn total_forward_time(&self) -> f64 {
        self.layers.iter().map(|l| l.forward_time()).sum()
    }

    /// Sum of backward times over all layers.
    pub fn total_backward_time(&self) -> f64 {
        self.layers.iter().map(|l| l.backward_time()).sum()
    }

    /// Sum of `(activation, parameter)` memory units over all layers,
    /// saturating at `u64::MAX`.
    pub fn total_memory_units(&self) -> (u64, u64) {
        self.layers.iter().fold((0, 0), |(a, p), l| {
            (
                a.saturating_add(l.activation_memory()),
                p.saturating_add(l.parameter_memory()),
            )
        })
    }

    /// Layer name, falling back to `layer{index}` for unnamed layers.
    pub fn layer_name(&self, index: usize) -> String {
        self.layers
            .get(index)
            .and_then(|l| l.name())
            .map(str::to_string)
            .unwrap_or_else(|| format!("layer{index}"))
    }

    /// Returns a summary string describing the profile.
    pub fn summary(&self) -> String {
        let (act, param) = self.total_memory_units();
        format!(
            "Profile '{}' ({}): {} layers, fwd {:.3}, bwd {:.3}, memory units act {} / param {}",
            self.model,
            self.tag,
            self.num_layers(),
            self.total_forward_time(),
            self.total_backward_time(),
            act,
            param,
        )
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<S: ProfileState> fmt::Display for LayerProfile<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "LayerProfile '{}__{}' ({} layers):",
            self.model,
            self.tag,
            self.layers.len()
        )?;
        for layer in &self.layers {
            writeln!(f, "  {}", layer.summary())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn make_layers(n: usize) -> Vec<LayerMetrics> {
        (0..n)
            .map(|i| {
                LayerMetrics::new(
                    i,
                    (i + 1) as f64,
                    2.0 * (i + 1) as f64,
                    BTreeMap::from([(1, 0.5)]),
                    BTreeMap::new(),
                    (i as u64, 10),
                )
                .with_name(format!("layer.{i}"))
            })
            .collect()
    }

    fn validated(n: usize) -> LayerProfile<Validated> {
        LayerProfile::new("gpt2".into(), "test".into(), make_layers(n))
            .validate()
            .unwrap()
    }

    #[test]
    fn test_validate_ok() {
        assert_eq!(validated(4).num_layers(), 4);
    }

    #[test]
    fn test_validate_empty() {
        let p = LayerProfile::new("empty".into(), "t".into(), vec![]);
        assert!(matches!(p.validate(), Err(ProfileError::EmptyProfile { .. })));
    }

    #[test]
    fn test_validate_bad_index() {
        let mut layers = make_layers(3);
        layers[1] = LayerMetrics::new(5, 1.0, 1.0, BTreeMap::new(), BTreeMap::new(), (0, 0));
        let p = LayerProfile::new("bad".into(), "t".into(), layers);
        assert!(matches!(p.validate(), Err(ProfileError::InvalidLayer { .. })));
    }

    #[test]
    fn test_validate_negative_time() {
        let mut layers = make_layers(2);
        layers[1] = LayerMetrics::new(1, -0.1, 1.0, BTreeMap::new(), BTreeMap::new(), (0, 0));
        let p = LayerProfile::new("neg".into(), "t".into(), layers);
        assert!(matches!(
            p.validate(),
            Err(ProfileError::InvalidLayer { layer: 1, .. })
        ));
    }

    #[test]
    fn test_validate_zero_time_is_only_a_warning() {
        let layers = vec![LayerMetrics::new(0, 0.0, 0.0, BTreeMap::new(), BTreeMap::new(), (0, 0))];
        let p = LayerProfile::new("zero".into(), "t".into(), layers);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_layer_range() {
        let p = validated(5);
        let slice = p.layer_range(1..4).unwrap();
        assert_eq!(slice.len(), 3);
        assert_eq!(slice[0].layer_index(), 1);
        assert_eq!(slice[2].layer_index(), 3);

        assert!(p.layer_range(3..3).is_err());
        assert!(p.layer_range(2..6).is_err());
    }

    #[test]
    fn test_totals() {
        let p = validated(3);
        assert_eq!(p.total_forward_time(), 1.0 + 2.0 + 3.0);
        assert_eq!(p.total_backward_time(), 2.0 + 4.0 + 6.0);
        assert_eq!(p.total_memory_units(), (3, 30));
    }

    #[test]
    fn test_total_memory_units_saturates() {
        let layers = (0..2)
            .map(|i| {
                LayerMetrics::new(i, 1.0, 1.0, BTreeMap::new(), BTreeMap::new(), (u64::MAX, 1))
            })
            .collect();
        let p = LayerProfile::new("big".into(), "t".into(), layers)
            .validate()
            .unwrap();
        assert_eq!(p.total_memory_units(), (u64::MAX, 2));
    }

    #[test]
    fn test_layer_name_fallback() {
        let layers = vec![LayerMetrics::new(0, 1.0, 1.0, BTreeMap::new(), BTreeMap::new(), (0, 0))];
        let p = LayerProfile::new("m".into(), "t".into(), layers)
            .validate()
            .unwrap();
        assert_eq!(p.layer_name(0), "layer0");
        assert_eq!(validated(2).layer_name(1), "layer.1");
    }

    #[test]
    fn test_summary_and_display() {
        let p = validated(2);
        let s = p.summary();
        assert!(s.contains("gpt2"));
        assert!(s.contains("2 layers"));

        let display = format!("{p}");
        assert!(display.contains("layer.0"));
        assert!(display.contains("layer.1"));
    }
}
