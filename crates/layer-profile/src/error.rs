// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for profile loading and validation.

/// Errors that can occur when reading or validating layer profiles.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// The profile file could not be read.
    #[error("failed to read profile: {0}")]
    ReadError(#[from] std::io::Error),

    /// The profile JSON is malformed.
    #[error("failed to parse profile: {0}")]
    ParseError(#[from] serde_json::Error),

    /// The profile contains no layers.
    #[error("profile '{model}' contains no layers")]
    EmptyProfile { model: String },

    /// A layer record is invalid (e.g., negative or non-finite time).
    #[error("invalid layer {layer}: {detail}")]
    InvalidLayer { layer: usize, detail: String },

    /// A requested layer range falls outside the profile.
    #[error("layer range {start}..{end} is out of bounds for {num_layers} layers")]
    RangeOutOfBounds {
        start: usize,
        end: usize,
        num_layers: usize,
    },
}
