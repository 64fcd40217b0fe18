// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Cost model tuning knobs.

/// Weight of activation memory relative to parameter memory.
///
/// Activations are kept for every in-flight microbatch, so each
/// activation unit counts six times against a stage's footprint.
pub const DEFAULT_ACTIVATION_MEMORY_MULTIPLIER: u64 = 6;

/// Configuration for stage aggregation.
///
/// Usually embedded as the `[cost_model]` table of the planner config:
///
/// ```toml
/// [cost_model]
/// activation_memory_multiplier = 6
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CostModelConfig {
    /// Multiplier applied to each layer's activation memory units.
    pub activation_memory_multiplier: u64,
}

impl Default for CostModelConfig {
    fn default() -> Self {
        Self {
            activation_memory_multiplier: DEFAULT_ACTIVATION_MEMORY_MULTIPLIER,
        }
    }
}

impl CostModelConfig {
    /// Memory units one layer contributes to its stage, `None` on overflow.
    pub fn layer_memory(&self, activation: u64, parameter: u64) -> Option<u64> {
        self.activation_memory_multiplier
            .checked_mul(activation)?
            .checked_add(parameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_multiplier() {
        assert_eq!(CostModelConfig::default().activation_memory_multiplier, 6);
    }

    #[test]
    fn test_layer_memory() {
        let c = CostModelConfig::default();
        assert_eq!(c.layer_memory(2, 5), Some(17));

        let c = CostModelConfig {
            activation_memory_multiplier: 1,
        };
        assert_eq!(c.layer_memory(2, 5), Some(7));
    }

    #[test]
    fn test_layer_memory_overflow() {
        let c = CostModelConfig::default();
        assert_eq!(c.layer_memory(u64::MAX / 4, 0), None);
        assert_eq!(c.layer_memory(0, u64::MAX), Some(u64::MAX));
        assert_eq!(c.layer_memory(1, u64::MAX), None);
    }

    #[test]
    fn test_toml_missing_field_uses_default() {
        let c: CostModelConfig = toml::from_str("").unwrap();
        assert_eq!(c, CostModelConfig::default());

        let c: CostModelConfig = toml::from_str("activation_memory_multiplier = 4").unwrap();
        assert_eq!(c.activation_memory_multiplier, 4);
    }
}
