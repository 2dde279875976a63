// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Errors module
//!
//! Every failure in the runtime is fail-fast: the error is raised at the point of misuse and
//! propagated with `?` up to [`ActorGraph::run`](crate::ActorGraph::run) or to the setup call
//! that caused it. Nothing here is retried. The type is serializable so a rank can send a
//! rejection back to the rank that asked it to bind a port.
//!

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for the actor runtime.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// An actor with the same name is already registered somewhere in the group.
    #[error("Actor {0} already exists.")]
    DuplicateActor(String),
    /// An actor already owns a port with this name.
    #[error("Actor {actor} already has a port named {port}.")]
    DuplicatePort {
        /// Owning actor.
        actor: String,
        /// Port name.
        port: String,
    },
    /// No actor with this name is known to the graph.
    #[error("Unable to find actor named {0}.")]
    UnknownActor(String),
    /// The actor exists but has no port with this name and direction.
    #[error("Actor {actor} has no {direction} named {port}.")]
    UnknownPort {
        /// Owning actor.
        actor: String,
        /// Port name.
        port: String,
        /// `InPort` or `OutPort`.
        direction: String,
    },
    /// The actor registry was closed by the synchronization phase.
    #[error("Cannot add actor {0}, actors have already been synchronized.")]
    RegistryClosed(String),
    /// An operation that needs the global actor map ran before synchronization.
    #[error("Actors have not been synchronized yet.")]
    NotSynchronized,
    /// Synchronization is a one-time collective operation.
    #[error("Actors have already been synchronized.")]
    AlreadySynchronized,
    /// Read or write on a port whose peer identity is not set.
    #[error("Unable to use port {0}, channel not connected.")]
    NotConnected(String),
    /// A port identity may only be bound once.
    #[error("Port {0} is already connected.")]
    AlreadyConnected(String),
    /// Both ends of a connection must have the same capacity.
    #[error("Capacity mismatch on port {port}: expected {expected}, found {found}.")]
    CapacityMismatch {
        /// Port that rejected the connection.
        port: String,
        /// Capacity requested by the peer.
        expected: usize,
        /// Capacity of the port itself.
        found: usize,
    },
    /// Both ends of a connection must carry the same element type.
    #[error("Element type mismatch when connecting port {0}.")]
    TypeMismatch(String),
    /// Two ports on one rank hash to the same tag.
    #[error("Tag {tag} of port {second} collides with port {first}.")]
    TagCollision {
        /// Colliding tag.
        tag: u64,
        /// Port already registered under the tag.
        first: String,
        /// Port that tried to register.
        second: String,
    },
    /// Rank outside of the group.
    #[error("Rank {rank} is outside of a group of size {world_size}.")]
    InvalidRank {
        /// Offending rank.
        rank: usize,
        /// Size of the group.
        world_size: usize,
    },
    /// Enqueue into a channel with no free slot.
    #[error("Channel is full.")]
    ChannelFull,
    /// Dequeue or peek on a channel with no element.
    #[error("Channel is empty.")]
    ChannelEmpty,
    /// Write on an out port whose slots are all in use.
    #[error("No free space in channel of port {0}.")]
    NoFreeSpace(String),
    /// The transport could not post or complete an operation.
    #[error("Transport error: {0}")]
    Transport(String),
    /// An element could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(String),
    /// A peer broke the runtime protocol (unexpected message, credit underflow, ...).
    #[error("Protocol error: {0}")]
    Protocol(String),
    /// A remote rank rejected a request.
    #[error("Rank {rank} rejected request: {reason}")]
    Remote {
        /// Rejecting rank.
        rank: usize,
        /// The rejection as reported by the remote rank.
        reason: Box<Error>,
    },
    /// Error raised by application code inside `act()`.
    #[error("Error: {0}")]
    Functional(String),
}

impl From<bincode::Error> for Error {
    fn from(error: bincode::Error) -> Self {
        Error::Codec(error.to_string())
    }
}
