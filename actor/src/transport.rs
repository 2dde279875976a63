// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Transport
//!
//! Thin layer over rank-to-rank asynchronous messaging. A [`Transport`] can post an
//! [`Envelope`] to a rank and hand back a [`Completion`] that the caller polls; the receiving
//! rank pulls [`Delivery`] values out of its mailbox with the non-blocking [`Transport::poll`]
//! and answers each one through its [`Responder`]. The answer is the completion of the
//! operation on the posting side, so the continuation always runs on the target rank first.
//!
//! [`LocalCluster`] wires up a group of ranks living in one OS process, each rank driven by
//! its own task. It is the transport used by the tests and by the demos.
//!

use crate::{Error, identity::RemoteEndpoint};

use serde::{Deserialize, Serialize};
use tokio::sync::{
    mpsc::{self, error::TryRecvError as MailboxError},
    oneshot::{self, error::TryRecvError},
};
use tracing::debug;

use std::sync::Mutex;

/// Process identifier inside the group.
pub type Rank = usize;

/// Direction of a port, as seen from its owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// An `InPort`.
    In,
    /// An `OutPort`.
    Out,
}

impl std::fmt::Display for PortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortDirection::In => write!(f, "InPort"),
            PortDirection::Out => write!(f, "OutPort"),
        }
    }
}

/// Asks the owner of a port to bind it to a remote peer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BindRequest {
    /// Actor owning the port on the target rank.
    pub actor: String,
    /// Port name.
    pub port: String,
    /// Direction of the port to bind.
    pub direction: PortDirection,
    /// Where the peer lives.
    pub peer: RemoteEndpoint,
    /// Capacity of the peer, when already known. The target rejects a mismatch.
    pub capacity: Option<usize>,
    /// Element type of the peer, when already known. The target rejects a mismatch.
    pub element: Option<String>,
    /// Validate the port without binding it.
    pub check_only: bool,
}

/// Asks a rank that owns both endpoints to connect them locally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub source_actor: String,
    pub source_port: String,
    pub destination_actor: String,
    pub destination_port: String,
}

/// Everything that travels between ranks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Envelope {
    /// One encoded element for the in port registered under `tag`.
    Data { tag: u64, payload: Vec<u8> },
    /// Capacity update: the reader freed `slots` slots of the stream `tag`.
    Credit { tag: u64, slots: usize },
    /// All-gather contribution: names of the actors living on the sender.
    Directory { actors: Vec<String> },
    /// Arrival of the sender at barrier number `epoch`.
    Barrier { epoch: u64 },
    /// Bind one port to a remote peer.
    Bind(BindRequest),
    /// Connect two ports both owned by the target.
    Connect(ConnectRequest),
}

impl Envelope {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::Data { .. } => "data",
            Envelope::Credit { .. } => "credit",
            Envelope::Directory { .. } => "directory",
            Envelope::Barrier { .. } => "barrier",
            Envelope::Bind(_) => "bind",
            Envelope::Connect(_) => "connect",
        }
    }
}

/// Answer of the target rank, resolving the sender's [`Completion`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    /// Handled.
    Ack,
    /// Port bound, or found bindable for a `check_only` request; carries the capacity and the
    /// element type of the port.
    Bound { capacity: usize, element: String },
    /// The request was refused.
    Rejected(Error),
}

/// Posting side of an asynchronous operation.
#[derive(Debug)]
pub struct Completion {
    receiver: oneshot::Receiver<Reply>,
}

impl Completion {
    /// Polls the operation without blocking. `Ok(None)` means still in flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] when the target dropped the operation without answering.
    pub fn try_complete(&mut self) -> Result<Option<Reply>, Error> {
        match self.receiver.try_recv() {
            Ok(reply) => Ok(Some(reply)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => Err(Error::Transport(
                "operation dropped before completion".to_owned(),
            )),
        }
    }
}

/// Receiving side of an asynchronous operation.
#[derive(Debug)]
pub struct Responder {
    sender: oneshot::Sender<Reply>,
}

impl Responder {
    /// Completes the operation on the posting rank.
    pub fn reply(self, reply: Reply) {
        if self.sender.send(reply).is_err() {
            debug!("Requester is gone, reply discarded.");
        }
    }
}

/// Creates the two halves of one asynchronous operation.
pub fn operation() -> (Responder, Completion) {
    let (sender, receiver) = oneshot::channel();
    (Responder { sender }, Completion { receiver })
}

/// An envelope received by this rank, together with the way to answer it.
#[derive(Debug)]
pub struct Delivery {
    pub from: Rank,
    pub envelope: Envelope,
    pub responder: Responder,
}

/// Rank-to-rank messaging with completion polling.
///
/// Implementations must deliver the envelopes posted by one rank to another rank in posting
/// order. Both methods are non-blocking.
pub trait Transport: Send + Sync {
    /// Rank of this process.
    fn rank(&self) -> Rank;

    /// Number of ranks in the group.
    fn world_size(&self) -> usize;

    /// Posts `envelope` to rank `to`.
    fn post(&self, to: Rank, envelope: Envelope) -> Result<Completion, Error>;

    /// Takes the next delivery addressed to this rank, if any.
    fn poll(&self) -> Result<Option<Delivery>, Error>;
}

/// Factory for a group of in-process ranks.
pub struct LocalCluster;

impl LocalCluster {
    /// Creates `world_size` connected transports, indexed by rank.
    pub fn create(world_size: usize) -> Vec<ClusterTransport> {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..world_size).map(|_| mpsc::unbounded_channel()).unzip();
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, mailbox)| ClusterTransport {
                rank,
                peers: senders.clone(),
                mailbox: Mutex::new(mailbox),
            })
            .collect()
    }
}

/// One rank of a [`LocalCluster`].
pub struct ClusterTransport {
    rank: Rank,
    peers: Vec<mpsc::UnboundedSender<Delivery>>,
    mailbox: Mutex<mpsc::UnboundedReceiver<Delivery>>,
}

impl Transport for ClusterTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.peers.len()
    }

    fn post(&self, to: Rank, envelope: Envelope) -> Result<Completion, Error> {
        let peer = self.peers.get(to).ok_or(Error::InvalidRank {
            rank: to,
            world_size: self.peers.len(),
        })?;
        let (responder, completion) = operation();
        let delivery = Delivery {
            from: self.rank,
            envelope,
            responder,
        };
        peer.send(delivery)
            .map_err(|_| Error::Transport(format!("rank {} is gone", to)))?;
        Ok(completion)
    }

    fn poll(&self) -> Result<Option<Delivery>, Error> {
        let mut mailbox = self
            .mailbox
            .lock()
            .map_err(|_| Error::Transport("mailbox lock poisoned".to_owned()))?;
        match mailbox.try_recv() {
            Ok(delivery) => Ok(Some(delivery)),
            Err(MailboxError::Empty) => Ok(None),
            Err(MailboxError::Disconnected) => {
                Err(Error::Transport("mailbox closed".to_owned()))
            }
        }
    }
}
