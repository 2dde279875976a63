// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Patch grid orchestration
//!
//! Cuts a rectangular simulation domain into square patches, one actor per patch, places the
//! patches onto the ranks of the group and connects neighbouring patches through their
//! `BND_LEFT`, `BND_RIGHT`, `BND_BOTTOM` and `BND_TOP` ports.
//!
//! ```ignore
//! let config = GridConfig::new(1024, 1024, 128);
//! let grid = PatchGrid::new(&config)?;
//! let distribution = BlockDistribution::new(grid, graph.world_size())?;
//! let patches = distribution.local_patches(graph.rank());
//! for patch in &patches {
//!     graph.add_actor(SimulationActor::new(&grid, *patch)?)?;
//! }
//! graph.synchronize_actors().await?;
//! connect_patches(&mut graph, &grid, &scenario, &patches).await?;
//! graph.barrier().await?;
//! graph.run().await?;
//! ```
//!

mod config;
mod connect;
mod distribution;
mod error;
mod patch;
mod scenario;

pub use config::GridConfig;
pub use connect::connect_patches;
pub use distribution::BlockDistribution;
pub use error::Error;
pub use patch::{EdgeWiring, Patch, PatchGrid};
pub use scenario::{BoundaryEdge, BoundaryType, Scenario, UniformScenario};
