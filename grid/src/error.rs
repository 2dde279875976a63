// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Errors module
//!

use thiserror::Error;

/// Error type for the patch grid.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    /// The grid configuration cannot describe a patch grid.
    #[error("Invalid grid configuration: {0}")]
    InvalidConfig(String),
    /// Coordinates outside of the grid.
    #[error("Patch ({x}, {y}) is outside of the grid.")]
    UnknownPatch {
        /// Column.
        x: usize,
        /// Row.
        y: usize,
    },
    /// A group of ranks cannot be empty.
    #[error("Cannot distribute patches over zero ranks.")]
    NoRanks,
    /// Failure of the actor runtime while wiring the grid.
    #[error("Actor error: {0}")]
    Actor(#[from] actor::Error),
}
