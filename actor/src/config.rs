// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Graph configuration
//!

use serde::Deserialize;

/// Tuning of the scheduler loop of an [`ActorGraph`](crate::ActorGraph).
///
/// Passed by value to [`ActorGraph::new`](crate::ActorGraph::new). Missing fields take their
/// default value when deserialized.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GraphConfig {
    /// Consecutive scheduler passes without any runnable actor after which a possible deadlock
    /// is reported. Reported again every further multiple of this value.
    pub idle_warning_passes: u64,
    /// Productive scheduler passes between two cooperative yields to the executor. Idle passes
    /// always yield. Zero behaves as one.
    pub yield_interval: u32,
}

impl GraphConfig {
    pub(crate) fn yield_every(&self) -> u64 {
        u64::from(self.yield_interval.max(1))
    }

    pub(crate) fn warn_after(&self) -> u64 {
        self.idle_warning_passes.max(1)
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            idle_warning_passes: 1_000_000,
            yield_interval: 64,
        }
    }
}
