// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # SPMD Actor Runtime
//!
//! A distributed actor runtime for SPMD-style parallel simulation. Independent computational
//! units (actors), one or more per process, communicate exclusively through typed, bounded,
//! directional ports wired into a static graph. Every process (rank) of the group runs the same
//! program, owns a subset of the actors and drives them with a single cooperative scheduler.
//! Actor code never knows whether the peer of a port lives in the same process or on another
//! rank.
//!
//! ## Overview
//!
//! - An [`Actor`] embeds an [`ActorCell`] holding its name, its ports and its trigger counter.
//!   The scheduler calls [`Actor::act`] once for every trigger the actor has received.
//! - An [`OutPort`] is connected to exactly one [`InPort`] with the same element type and the
//!   same capacity. Local writes go straight into the reader's [`BoundedChannel`]; remote writes
//!   are encoded and posted to the reader's rank under a tag derived from the reader port's
//!   name, and are flow-controlled with credits.
//! - The [`ActorGraph`] of each rank registers the local actors, exchanges the actor directory
//!   with the other ranks, wires ports across ranks and runs the local actors until the whole
//!   group is quiescent.
//! - The [`Transport`] trait is the only seam with the messaging layer. [`LocalCluster`]
//!   provides a group of ranks living in one process.
//!
//! ## Getting Started
//!
//! ```ignore
//! use actor::{
//!     Actor, ActorCell, ActorGraph, Error, GraphConfig, InPort, LocalCluster, OutPort, Step,
//! };
//!
//! struct Producer {
//!     cell: ActorCell,
//!     out: OutPort<u32, 2>,
//!     next: u32,
//! }
//!
//! impl Actor for Producer {
//!     fn cell(&self) -> &ActorCell {
//!         &self.cell
//!     }
//!
//!     fn act(&mut self) -> Result<Step, Error> {
//!         if self.next == 4 {
//!             return Ok(Step::Terminate);
//!         }
//!         if self.out.free_capacity() > 0 {
//!             self.out.write(self.next)?;
//!             self.next += 1;
//!         }
//!         self.cell.trigger();
//!         Ok(Step::Continue)
//!     }
//! }
//!
//! struct Consumer {
//!     cell: ActorCell,
//!     input: InPort<u32, 2>,
//!     seen: Vec<u32>,
//! }
//!
//! impl Actor for Consumer {
//!     fn cell(&self) -> &ActorCell {
//!         &self.cell
//!     }
//!
//!     fn act(&mut self) -> Result<Step, Error> {
//!         while self.input.available() > 0 {
//!             self.seen.push(self.input.read()?);
//!         }
//!         if self.seen.len() == 4 {
//!             Ok(Step::Terminate)
//!         } else {
//!             Ok(Step::Continue)
//!         }
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Error> {
//!     let transport = LocalCluster::create(1).pop().expect("one rank");
//!     let mut graph = ActorGraph::new(transport, GraphConfig::default());
//!     graph.add_actor(producer)?;
//!     graph.add_actor(consumer)?;
//!     graph.synchronize_actors().await?;
//!     graph.connect_ports("producer", "out", "consumer", "in").await?;
//!     graph.barrier().await?;
//!     let report = graph.run().await?;
//!     println!("{} invocations", report.invocations);
//!     Ok(())
//! }
//! ```
//!
//! ## Distributed execution
//!
//! Each rank builds its own [`ActorGraph`] from its own [`Transport`] and goes through the same
//! collective steps: [`ActorGraph::synchronize_actors`], the connections, a
//! [`ActorGraph::barrier`], then [`ActorGraph::run`]. Any rank may connect any pair of ports.
//! The ranks owning the endpoints serve the binding requests while they wait in a collective
//! operation.
//!
//! ## Termination
//!
//! `run()` returns on a rank once all of its actors have returned [`Step::Terminate`], every
//! message it posted has been handled by its target, every message it received has been applied
//! to its port, and every rank has reached the same point.
//!
//! ## Logging
//!
//! The runtime logs with [`tracing`] and never installs a subscriber. Fields carry the rank of
//! the process emitting the event.
//!

mod actor;
mod channel;
mod config;
mod error;
mod graph;
mod identity;
mod port;
mod runtime;
mod transport;

//
// Actors
//

/// A named unit of computation owning typed ports.
///
/// See [`ActorCell`] for port creation and [`ActorGraph`] for execution.
pub use actor::Actor;

/// Name, trigger counter and ports of one actor.
pub use actor::ActorCell;

/// `Created`, `Running` or `Terminated`.
pub use actor::ActorLifecycle;

/// Outcome of one `act()` invocation.
pub use actor::Step;

/// Saturating counter of owed `act()` invocations.
pub use actor::Trigger;

//
// Ports and channels
//

/// Fixed-capacity FIFO buffer backing every in port.
pub use channel::BoundedChannel;

/// Receiving end of a connection.
///
/// Reads fail fast on an unconnected port or an empty channel; check
/// [`InPort::available`] first.
pub use port::InPort;

/// Sending end of a connection.
///
/// Writes fail fast on an unconnected port or when no slot is free; check
/// [`OutPort::free_capacity`] first.
pub use port::OutPort;

/// Element types a port can carry.
pub use port::Element;

/// Peer identity of a port.
pub use identity::PortIdentity;

/// Rank and tag of a remote peer.
pub use identity::RemoteEndpoint;

/// Stream identifier derived from a port name.
pub use identity::Tag;

/// Tag of a logical port name.
pub use identity::compute_tag;

/// `"<actor>.<port>"`.
pub use identity::qualified_name;

//
// Graph
//

/// Registry, connection protocol and scheduler of the actors of one rank.
pub use graph::ActorGraph;

/// Where an actor lives.
pub use graph::ActorLocation;

/// Summary of a completed run.
pub use graph::RunReport;

/// Scheduler tuning.
pub use config::GraphConfig;

/// Process-local bookkeeping of asynchronous operations.
pub use runtime::Runtime;

/// Transport side of a remotely connected port.
pub use runtime::RemoteLink;

//
// Transport
//

/// Rank-to-rank messaging with completion polling.
pub use transport::Transport;

/// In-process group of ranks.
pub use transport::LocalCluster;

/// One rank of a [`LocalCluster`].
pub use transport::ClusterTransport;

pub use transport::{
    BindRequest, Completion, ConnectRequest, Delivery, Envelope, PortDirection, Rank,
    Reply, Responder, operation,
};

//
// Error Handling
//

/// Error type for every runtime operation.
pub use error::Error;
