// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Distributed SPMD actor runtime.
//! Re-exports the actor runtime and the patch grid orchestration built on top of it.

pub use actor::{
    Actor, ActorCell, ActorGraph, ActorLifecycle, ActorLocation, BoundedChannel,
    ClusterTransport, Element, Error as ActorError, GraphConfig, InPort, LocalCluster,
    OutPort, Rank, RunReport, Runtime, Step, Transport, compute_tag, qualified_name,
};

pub use grid::{
    BlockDistribution, BoundaryEdge, BoundaryType, EdgeWiring, Error as GridError,
    GridConfig, Patch, PatchGrid, Scenario, UniformScenario, connect_patches,
};
