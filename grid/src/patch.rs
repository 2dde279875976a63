// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Patch grid
//!
//! The domain is cut into `actors_x` × `actors_y` square patches, one actor each. Patch
//! `(x, y)` is named `patch-<x>-<y>`; its left neighbour is `(x - 1, y)` and its bottom
//! neighbour `(x, y - 1)`.
//!

use crate::{BoundaryEdge, BoundaryType, Error, GridConfig, Scenario};

use std::fmt::{Display, Formatter};

/// Coordinates of one patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Patch {
    pub x: usize,
    pub y: usize,
}

impl Patch {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Name of the actor owning the patch.
    pub fn name(&self) -> String {
        format!("patch-{}-{}", self.x, self.y)
    }
}

impl Display for Patch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "patch-{}-{}", self.x, self.y)
    }
}

/// What an edge of a patch is wired to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeWiring {
    /// An interior edge, exchanged with this neighbour.
    Neighbor(Patch),
    /// A domain edge, handled by the solver as told by the scenario.
    Boundary(BoundaryType),
}

/// Layout of the patches of a domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchGrid {
    actors_x: usize,
    actors_y: usize,
    patch_size: usize,
}

impl PatchGrid {
    /// Builds the grid described by `config`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] when the configuration does not validate.
    pub fn new(config: &GridConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            actors_x: config.x_size / config.patch_size,
            actors_y: config.y_size / config.patch_size,
            patch_size: config.patch_size,
        })
    }

    /// Patches along the x axis.
    pub fn actors_x(&self) -> usize {
        self.actors_x
    }

    /// Patches along the y axis.
    pub fn actors_y(&self) -> usize {
        self.actors_y
    }

    pub fn patch_size(&self) -> usize {
        self.patch_size
    }

    /// Number of patches.
    pub fn len(&self) -> usize {
        self.actors_x * self.actors_y
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every patch in row-major order: `(0, 0), (1, 0), ..., (0, 1), ...`.
    pub fn patches(&self) -> impl Iterator<Item = Patch> + '_ {
        (0..self.actors_y)
            .flat_map(move |y| (0..self.actors_x).map(move |x| Patch::new(x, y)))
    }

    pub fn contains(&self, patch: Patch) -> bool {
        patch.x < self.actors_x && patch.y < self.actors_y
    }

    /// Row-major position of `patch`.
    pub fn index_of(&self, patch: Patch) -> Result<usize, Error> {
        if !self.contains(patch) {
            return Err(Error::UnknownPatch {
                x: patch.x,
                y: patch.y,
            });
        }
        Ok(patch.y * self.actors_x + patch.x)
    }

    /// Patch at row-major position `index`.
    pub fn patch_at(&self, index: usize) -> Option<Patch> {
        (index < self.len())
            .then(|| Patch::new(index % self.actors_x, index / self.actors_x))
    }

    /// The patch across `edge`, if `edge` is interior.
    pub fn neighbor(&self, patch: Patch, edge: BoundaryEdge) -> Option<Patch> {
        let Patch { x, y } = patch;
        let neighbor = match edge {
            BoundaryEdge::Left => Patch::new(x.checked_sub(1)?, y),
            BoundaryEdge::Right => Patch::new(x + 1, y),
            BoundaryEdge::Bottom => Patch::new(x, y.checked_sub(1)?),
            BoundaryEdge::Top => Patch::new(x, y + 1),
        };
        self.contains(neighbor).then_some(neighbor)
    }

    /// True when `edge` of `patch` faces another patch. Patch actors create the `BND_*` ports
    /// of interior edges only.
    pub fn is_interior(&self, patch: Patch, edge: BoundaryEdge) -> bool {
        self.neighbor(patch, edge).is_some()
    }

    /// What `edge` of `patch` is wired to. Domain edges ask `scenario`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPatch`] when `patch` is outside of the grid.
    pub fn edge_wiring(
        &self,
        patch: Patch,
        edge: BoundaryEdge,
        scenario: &dyn Scenario,
    ) -> Result<EdgeWiring, Error> {
        self.index_of(patch)?;
        Ok(match self.neighbor(patch, edge) {
            Some(neighbor) => EdgeWiring::Neighbor(neighbor),
            None => EdgeWiring::Boundary(scenario.boundary_type(edge)),
        })
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::UniformScenario;

    fn grid(x: usize, y: usize) -> PatchGrid {
        PatchGrid::new(&GridConfig::new(x * 8, y * 8, 8)).unwrap()
    }

    #[test]
    fn test_row_major_order() {
        let grid = grid(3, 2);
        let names: Vec<String> = grid.patches().map(|p| p.name()).collect();
        assert_eq!(
            names,
            vec![
                "patch-0-0", "patch-1-0", "patch-2-0", "patch-0-1", "patch-1-1",
                "patch-2-1"
            ]
        );
        for (index, patch) in grid.patches().enumerate() {
            assert_eq!(grid.index_of(patch), Ok(index));
            assert_eq!(grid.patch_at(index), Some(patch));
        }
        assert_eq!(grid.patch_at(6), None);
    }

    #[test]
    fn test_corner_wiring() {
        let grid = grid(2, 2);
        let scenario = UniformScenario(BoundaryType::Outflow);
        let corner = Patch::new(0, 0);
        assert_eq!(
            grid.edge_wiring(corner, BoundaryEdge::Left, &scenario),
            Ok(EdgeWiring::Boundary(BoundaryType::Outflow))
        );
        assert_eq!(
            grid.edge_wiring(corner, BoundaryEdge::Bottom, &scenario),
            Ok(EdgeWiring::Boundary(BoundaryType::Outflow))
        );
        assert_eq!(
            grid.edge_wiring(corner, BoundaryEdge::Right, &scenario),
            Ok(EdgeWiring::Neighbor(Patch::new(1, 0)))
        );
        assert_eq!(
            grid.edge_wiring(corner, BoundaryEdge::Top, &scenario),
            Ok(EdgeWiring::Neighbor(Patch::new(0, 1)))
        );
        assert_eq!(
            grid.edge_wiring(Patch::new(2, 0), BoundaryEdge::Top, &scenario),
            Err(Error::UnknownPatch { x: 2, y: 0 })
        );
    }

    #[test]
    fn test_single_patch_has_no_interior_edge() {
        let grid = grid(1, 1);
        for edge in BoundaryEdge::ALL {
            assert!(!grid.is_interior(Patch::new(0, 0), edge));
        }
    }
}
