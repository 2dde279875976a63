// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Scenario
//!
//! The part of a simulation scenario the grid needs: how each edge of the whole domain behaves.
//! Everything else a scenario knows (bathymetry, initial water height, ...) belongs to the
//! solver and stays out of here.
//!

use serde::{Deserialize, Serialize};

use std::fmt::{Display, Formatter};

/// One of the four edges of a patch or of the domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BoundaryEdge {
    Left,
    Right,
    Bottom,
    Top,
}

impl BoundaryEdge {
    /// Every edge, in port creation order.
    pub const ALL: [BoundaryEdge; 4] = [
        BoundaryEdge::Left,
        BoundaryEdge::Right,
        BoundaryEdge::Bottom,
        BoundaryEdge::Top,
    ];

    /// Name of the in and out ports a patch actor creates for this edge.
    pub fn port_name(&self) -> &'static str {
        match self {
            BoundaryEdge::Left => "BND_LEFT",
            BoundaryEdge::Right => "BND_RIGHT",
            BoundaryEdge::Bottom => "BND_BOTTOM",
            BoundaryEdge::Top => "BND_TOP",
        }
    }

    /// The edge of the neighbour facing this one.
    pub fn opposite(&self) -> BoundaryEdge {
        match self {
            BoundaryEdge::Left => BoundaryEdge::Right,
            BoundaryEdge::Right => BoundaryEdge::Left,
            BoundaryEdge::Bottom => BoundaryEdge::Top,
            BoundaryEdge::Top => BoundaryEdge::Bottom,
        }
    }
}

impl Display for BoundaryEdge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.port_name())
    }
}

/// Behaviour of an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryType {
    Outflow,
    Wall,
    Inflow,
    Connect,
    /// Filled by a neighbouring patch.
    Passive,
}

/// Boundary classification of the domain edges.
pub trait Scenario: Send + Sync {
    /// Behaviour of the domain edge `edge`. Walls unless overridden.
    fn boundary_type(&self, edge: BoundaryEdge) -> BoundaryType {
        let _ = edge;
        BoundaryType::Wall
    }
}

/// A scenario whose four domain edges all behave the same.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformScenario(pub BoundaryType);

impl Scenario for UniformScenario {
    fn boundary_type(&self, _edge: BoundaryEdge) -> BoundaryType {
        self.0
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    struct Closed;

    impl Scenario for Closed {}

    #[test]
    fn test_opposite_edges() {
        for edge in BoundaryEdge::ALL {
            assert_ne!(edge, edge.opposite());
            assert_eq!(edge, edge.opposite().opposite());
        }
        assert_eq!(BoundaryEdge::Left.to_string(), "BND_LEFT");
    }

    #[test]
    fn test_default_boundary_is_wall() {
        assert_eq!(Closed.boundary_type(BoundaryEdge::Top), BoundaryType::Wall);
        assert_eq!(
            UniformScenario(BoundaryType::Outflow).boundary_type(BoundaryEdge::Left),
            BoundaryType::Outflow
        );
    }
}
