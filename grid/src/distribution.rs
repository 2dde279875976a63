// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Patch distribution
//!

use crate::{Error, Patch, PatchGrid};

use actor::Rank;

/// Contiguous row-major placement of patches onto ranks.
///
/// The first `len % world_size` ranks get one patch more than the others. With more ranks than
/// patches the last ranks get none.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockDistribution {
    grid: PatchGrid,
    world_size: usize,
}

impl BlockDistribution {
    pub fn new(grid: PatchGrid, world_size: usize) -> Result<Self, Error> {
        if world_size == 0 {
            return Err(Error::NoRanks);
        }
        Ok(Self { grid, world_size })
    }

    /// Rank owning `patch`.
    pub fn rank_of(&self, patch: Patch) -> Result<Rank, Error> {
        let index = self.grid.index_of(patch)?;
        let base = self.grid.len() / self.world_size;
        let larger = self.grid.len() % self.world_size;
        let boundary = larger * (base + 1);
        Ok(if index < boundary {
            index / (base + 1)
        } else {
            larger + (index - boundary) / base
        })
    }

    /// Patches owned by `rank`, in row-major order.
    pub fn local_patches(&self, rank: Rank) -> Vec<Patch> {
        self.grid
            .patches()
            .filter(|patch| matches!(self.rank_of(*patch), Ok(owner) if owner == rank))
            .collect()
    }
}
