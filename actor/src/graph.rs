// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor graph
//!
//! The `graph` module provides [`ActorGraph`], the per-rank owner of the local actors. Every
//! rank of the group builds one graph and goes through the same phases, in the same order:
//!
//! 1. **Registration**: [`ActorGraph::add_actor`] for every actor living on this rank.
//! 2. **Synchronization**: [`ActorGraph::synchronize_actors`], a collective all-gather that
//!    builds the global actor name → rank map and closes the registry.
//! 3. **Wiring**: [`ActorGraph::connect_ports`] for the connections this rank is responsible
//!    for, followed by a collective [`ActorGraph::barrier`] so no rank starts running against a
//!    half-wired graph. Any rank may connect any pair of ports; the ranks owning the endpoints
//!    answer the binding requests while they drive progress in their own barrier.
//! 4. **Execution**: [`ActorGraph::run`], the cooperative scheduler loop and the termination
//!    protocol. It returns once every local actor has terminated, every asynchronous operation
//!    of this rank has completed, and every rank of the group has reached the same point.
//!
//! Collective operations must be called by every rank, or the group hangs.
//!

use crate::{
    Actor, ActorLifecycle, Error, GraphConfig, Step,
    identity::{RemoteEndpoint, compute_tag, qualified_name},
    port::{AbstractInPort, AbstractOutPort},
    runtime::{LocalCallback, RemoteCall, RemoteLink, Runtime},
    transport::{
        BindRequest, ConnectRequest, Delivery, Envelope, PortDirection, Rank,
        Reply, Transport,
    },
};

use tracing::{debug, error, info, warn};

use std::{
    collections::{BTreeMap, HashMap},
    fmt::{Display, Formatter},
    sync::Arc,
    time::{Duration, Instant},
};

/// Where an actor lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorLocation {
    /// Owned by this rank's graph.
    Local,
    /// Owned by the graph of another rank.
    Remote(Rank),
}

/// Summary of a completed [`ActorGraph::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Wall time between the opening barrier and the drain of this rank.
    pub elapsed: Duration,
    /// Scheduler passes.
    pub passes: u64,
    /// `act()` invocations on this rank.
    pub invocations: u64,
}

struct LocalActor {
    actor: Box<dyn Actor>,
    state: ActorLifecycle,
}

/// Registry and scheduler of the actors of one rank.
pub struct ActorGraph {
    runtime: Runtime,
    config: GraphConfig,
    actors: Vec<LocalActor>,
    index: HashMap<String, usize>,
    /// Global name → rank map, set by the synchronization phase.
    directory: Option<BTreeMap<String, Rank>>,
    /// Directory contributions received from the other ranks.
    gathered: BTreeMap<Rank, Vec<String>>,
    /// Barrier arrivals received, by epoch.
    arrivals: HashMap<u64, usize>,
    epoch: u64,
}

impl ActorGraph {
    /// Creates the graph of the rank served by `transport`.
    pub fn new(transport: impl Transport + 'static, config: GraphConfig) -> Self {
        Self {
            runtime: Runtime::new(transport),
            config,
            actors: Vec::new(),
            index: HashMap::new(),
            directory: None,
            gathered: BTreeMap::new(),
            arrivals: HashMap::new(),
            epoch: 0,
        }
    }

    /// Registers a local actor. The graph owns it from now on.
    ///
    /// # Errors
    ///
    /// [`Error::RegistryClosed`] after [`ActorGraph::synchronize_actors`],
    /// [`Error::DuplicateActor`] if this rank already has an actor with the same name.
    pub fn add_actor<A: Actor>(&mut self, actor: A) -> Result<(), Error> {
        let name = actor.name().to_owned();
        if self.directory.is_some() {
            error!(rank = self.rank(), "Actor '{}' registered too late!", &name);
            return Err(Error::RegistryClosed(name));
        }
        if self.index.contains_key(&name) {
            error!(rank = self.rank(), "Actor '{}' already exists!", &name);
            return Err(Error::DuplicateActor(name));
        }
        debug!(rank = self.rank(), "{} registered.", actor.cell());
        self.index.insert(name, self.actors.len());
        self.actors.push(LocalActor {
            actor: Box::new(actor),
            state: ActorLifecycle::Created,
        });
        Ok(())
    }

    /// Collective all-gather of the actor names of every rank.
    ///
    /// Closes the registry. Must run once, after every local actor has been added and before
    /// the first [`ActorGraph::connect_ports`].
    ///
    /// # Errors
    ///
    /// [`Error::AlreadySynchronized`] on a second call, [`Error::DuplicateActor`] if two ranks
    /// registered the same name. Every rank detects the same duplicate.
    pub async fn synchronize_actors(&mut self) -> Result<(), Error> {
        if self.directory.is_some() {
            return Err(Error::AlreadySynchronized);
        }
        let rank = self.rank();
        let names: Vec<String> =
            self.actors.iter().map(|a| a.actor.name().to_owned()).collect();

        let mut calls = Vec::new();
        for peer in (0..self.world_size()).filter(|peer| *peer != rank) {
            calls.push(self.runtime.call(
                peer,
                Envelope::Directory {
                    actors: names.clone(),
                },
            )?);
        }
        let world_size = self.world_size();
        self.settle(calls, |graph| graph.gathered.len() + 1 >= world_size)
            .await?;

        let mut directory = BTreeMap::new();
        let contributions = std::iter::once((rank, names))
            .chain(std::mem::take(&mut self.gathered));
        for (owner, actors) in contributions {
            for name in actors {
                if let Some(first) = directory.insert(name.clone(), owner) {
                    error!(
                        rank,
                        "Actor '{}' exists on ranks {} and {}!", &name, first, owner
                    );
                    return Err(Error::DuplicateActor(name));
                }
            }
        }
        info!(
            rank,
            actors = directory.len(),
            local = self.actors.len(),
            "Actors synchronized."
        );
        self.directory = Some(directory);
        Ok(())
    }

    /// Connects the out port `src_port` of `src_actor` to the in port `dst_port` of
    /// `dst_actor`, wherever both actors live.
    ///
    /// Returns once both endpoints are bound. The ranks owning the endpoints must be driving
    /// progress meanwhile (inside [`ActorGraph::barrier`], [`ActorGraph::connect_ports`] or
    /// [`ActorGraph::synchronize_actors`]).
    ///
    /// Capacity and element type are compared on both ends, wherever they live. When neither
    /// actor is local and they live on different ranks, the source is validated before the
    /// destination is bound.
    ///
    /// # Errors
    ///
    /// [`Error::NotSynchronized`], [`Error::UnknownActor`], [`Error::UnknownPort`],
    /// [`Error::AlreadyConnected`], [`Error::CapacityMismatch`], [`Error::TypeMismatch`],
    /// [`Error::TagCollision`], or [`Error::Remote`] wrapping one of those when an endpoint
    /// owner rejected its binding.
    pub async fn connect_ports(
        &mut self,
        src_actor: &str,
        src_port: &str,
        dst_actor: &str,
        dst_port: &str,
    ) -> Result<(), Error> {
        let src_rank = self.directory_rank(src_actor)?;
        let dst_rank = self.directory_rank(dst_actor)?;
        let rank = self.rank();
        let tag = compute_tag(&qualified_name(dst_actor, dst_port));
        debug!(
            rank,
            tag,
            "Connecting {}.{} (rank {}) to {}.{} (rank {}).",
            src_actor,
            src_port,
            src_rank,
            dst_actor,
            dst_port,
            dst_rank
        );

        match (src_rank == rank, dst_rank == rank) {
            (true, true) => {
                self.connect_local(src_actor, src_port, dst_actor, dst_port)
            }
            (true, false) => {
                let out = self.cell_out_port(src_actor, src_port)?;
                if out.is_connected() {
                    return Err(Error::AlreadyConnected(out.qualified_name()));
                }
                let peer = self
                    .bind_remote_port(
                        dst_rank,
                        BindRequest {
                            actor: dst_actor.to_owned(),
                            port: dst_port.to_owned(),
                            direction: PortDirection::In,
                            peer: RemoteEndpoint { rank, tag },
                            capacity: Some(out.capacity()),
                            element: Some(out.element_type().to_owned()),
                            check_only: false,
                        },
                    )
                    .await?;
                check_capacity(&out.qualified_name(), out.capacity(), peer.capacity)?;
                check_element(&out.qualified_name(), out.element_type(), &peer.element)?;
                out.bind_remote(RemoteLink::new(
                    RemoteEndpoint {
                        rank: dst_rank,
                        tag,
                    },
                    self.runtime.clone(),
                ))?;
                self.runtime.register_outbound(tag, out)
            }
            (false, true) => {
                let input = self.cell_in_port(dst_actor, dst_port)?;
                if input.is_connected() {
                    return Err(Error::AlreadyConnected(input.qualified_name()));
                }
                let peer = self
                    .bind_remote_port(
                        src_rank,
                        BindRequest {
                            actor: src_actor.to_owned(),
                            port: src_port.to_owned(),
                            direction: PortDirection::Out,
                            peer: RemoteEndpoint { rank, tag },
                            capacity: Some(input.capacity()),
                            element: Some(input.element_type().to_owned()),
                            check_only: false,
                        },
                    )
                    .await?;
                check_capacity(&input.qualified_name(), input.capacity(), peer.capacity)?;
                check_element(&input.qualified_name(), input.element_type(), &peer.element)?;
                input.bind_remote(RemoteLink::new(
                    RemoteEndpoint {
                        rank: src_rank,
                        tag,
                    },
                    self.runtime.clone(),
                ))?;
                self.runtime.register_inbound(input.tag(), input)
            }
            (false, false) if src_rank == dst_rank => {
                let call = self.runtime.call(
                    src_rank,
                    Envelope::Connect(ConnectRequest {
                        source_actor: src_actor.to_owned(),
                        source_port: src_port.to_owned(),
                        destination_actor: dst_actor.to_owned(),
                        destination_port: dst_port.to_owned(),
                    }),
                )?;
                self.await_call(call).await.map(|_| ())
            }
            (false, false) => {
                let source_request = BindRequest {
                    actor: src_actor.to_owned(),
                    port: src_port.to_owned(),
                    direction: PortDirection::Out,
                    peer: RemoteEndpoint {
                        rank: dst_rank,
                        tag,
                    },
                    capacity: None,
                    element: None,
                    check_only: true,
                };
                // The source is validated first so a rejected source never leaves the
                // destination bound.
                let source = self
                    .bind_remote_port(src_rank, source_request.clone())
                    .await?;
                let destination = self
                    .bind_remote_port(
                        dst_rank,
                        BindRequest {
                            actor: dst_actor.to_owned(),
                            port: dst_port.to_owned(),
                            direction: PortDirection::In,
                            peer: RemoteEndpoint {
                                rank: src_rank,
                                tag,
                            },
                            capacity: Some(source.capacity),
                            element: Some(source.element),
                            check_only: false,
                        },
                    )
                    .await?;
                self.bind_remote_port(
                    src_rank,
                    BindRequest {
                        capacity: Some(destination.capacity),
                        element: Some(destination.element),
                        check_only: false,
                        ..source_request
                    },
                )
                .await
                .map(|_| ())
            }
        }
    }

    /// Collective barrier.
    ///
    /// Drives progress while waiting, so requests from other ranks are served. Returns once
    /// every rank has entered the same barrier and has recorded this rank's arrival.
    pub async fn barrier(&mut self) -> Result<(), Error> {
        let epoch = self.epoch;
        self.epoch += 1;
        let rank = self.rank();
        let world_size = self.world_size();
        debug!(rank, epoch, "Entering barrier.");

        let mut calls = Vec::new();
        for peer in (0..world_size).filter(|peer| *peer != rank) {
            calls.push(self.runtime.call(peer, Envelope::Barrier { epoch })?);
        }
        self.settle(calls, |graph| {
            graph.arrivals.get(&epoch).copied().unwrap_or(0) + 1 >= world_size
        })
        .await?;
        self.arrivals.remove(&epoch);
        debug!(rank, epoch, "Leaving barrier.");
        Ok(())
    }

    /// Runs the local actors to completion.
    ///
    /// Opens with a barrier, gives every local actor one initial trigger, then loops: drive
    /// progress, apply received deliveries, invoke `act()` once for each consumed trigger. The
    /// loop ends when every local actor has terminated and no asynchronous operation of this
    /// rank is outstanding, confirmed after one more progress pass. A closing barrier follows.
    ///
    /// # Errors
    ///
    /// The first error returned by an `act()` invocation or by the transport. Fatal: the other
    /// ranks hang at their closing barrier.
    pub async fn run(&mut self) -> Result<RunReport, Error> {
        if self.directory.is_none() {
            return Err(Error::NotSynchronized);
        }
        self.barrier().await?;
        let rank = self.rank();
        info!(rank, actors = self.actors.len(), "Running actor graph.");

        let start = Instant::now();
        for entry in self.actors.iter_mut() {
            if entry.state == ActorLifecycle::Created {
                entry.state = ActorLifecycle::Running;
                entry.actor.cell().trigger_handle().trigger();
            }
        }

        let yield_every = self.config.yield_every();
        let warn_after = self.config.warn_after();
        let mut passes: u64 = 0;
        let mut invocations: u64 = 0;
        let mut idle: u64 = 0;
        let mut productive: u64 = 0;
        loop {
            passes += 1;
            let mut active = self.progress()?;
            for entry in self.actors.iter_mut() {
                if entry.state != ActorLifecycle::Running
                    || !entry.actor.cell().trigger_handle().consume()
                {
                    continue;
                }
                invocations += 1;
                active = true;
                match entry.actor.act() {
                    Ok(Step::Continue) => {}
                    Ok(Step::Terminate) => {
                        entry.state = ActorLifecycle::Terminated;
                        entry.actor.cell().trigger_handle().close();
                        debug!(rank, "Actor {} is terminated.", entry.actor.name());
                    }
                    Err(e) => {
                        error!(rank, "Actor '{}' failed: {}", entry.actor.name(), e);
                        return Err(e);
                    }
                }
            }

            if self.all_terminated() && self.runtime.is_drained() {
                self.progress()?;
                if self.runtime.is_drained() {
                    break;
                }
                continue;
            }

            if active {
                idle = 0;
                productive += 1;
                if productive % yield_every == 0 {
                    tokio::task::yield_now().await;
                }
            } else {
                idle += 1;
                if idle % warn_after == 0 {
                    warn!(
                        rank,
                        idle,
                        rpcs = self.runtime.rpcs_in_flight(),
                        lpcs = self.runtime.lpcs_in_flight(),
                        running = %self.running_actors().join(", "),
                        "No runnable actor, the graph may be deadlocked."
                    );
                }
                tokio::task::yield_now().await;
            }
        }

        let elapsed = start.elapsed();
        debug!(rank, passes, invocations, "Local actors drained.");
        self.barrier().await?;
        info!(rank, ?elapsed, passes, invocations, "Actor graph stopped.");
        Ok(RunReport {
            elapsed,
            passes,
            invocations,
        })
    }

    /// Number of actors in the whole group, or on this rank before synchronization.
    pub fn num_actors(&self) -> usize {
        self.directory
            .as_ref()
            .map_or(self.actors.len(), BTreeMap::len)
    }

    pub fn num_local_actors(&self) -> usize {
        self.actors.len()
    }

    /// Rank owning the actor `name`.
    ///
    /// Local actors resolve at any time; remote ones only after synchronization.
    pub fn rank_of(&self, name: &str) -> Result<Rank, Error> {
        if self.index.contains_key(name) {
            return Ok(self.rank());
        }
        self.directory_rank(name)
    }

    pub fn locate(&self, name: &str) -> Result<ActorLocation, Error> {
        let owner = self.rank_of(name)?;
        if owner == self.rank() {
            Ok(ActorLocation::Local)
        } else {
            Ok(ActorLocation::Remote(owner))
        }
    }

    /// Lifecycle state of the local actor `name`.
    pub fn actor_state(&self, name: &str) -> Option<ActorLifecycle> {
        self.index
            .get(name)
            .and_then(|index| self.actors.get(*index))
            .map(|entry| entry.state)
    }

    pub fn rank(&self) -> Rank {
        self.runtime.rank()
    }

    pub fn world_size(&self) -> usize {
        self.runtime.world_size()
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    fn directory_rank(&self, name: &str) -> Result<Rank, Error> {
        let directory = self.directory.as_ref().ok_or(Error::NotSynchronized)?;
        directory
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownActor(name.to_owned()))
    }

    fn local_actor(&self, name: &str) -> Result<&dyn Actor, Error> {
        self.index
            .get(name)
            .and_then(|index| self.actors.get(*index))
            .map(|entry| entry.actor.as_ref())
            .ok_or_else(|| Error::UnknownActor(name.to_owned()))
    }

    fn cell_out_port(
        &self,
        actor: &str,
        port: &str,
    ) -> Result<Arc<dyn AbstractOutPort>, Error> {
        self.local_actor(actor)?.cell().abstract_out_port(port)
    }

    fn cell_in_port(
        &self,
        actor: &str,
        port: &str,
    ) -> Result<Arc<dyn AbstractInPort>, Error> {
        self.local_actor(actor)?.cell().abstract_in_port(port)
    }

    fn all_terminated(&self) -> bool {
        self.actors
            .iter()
            .all(|entry| entry.state == ActorLifecycle::Terminated)
    }

    fn running_actors(&self) -> Vec<&str> {
        self.actors
            .iter()
            .filter(|entry| entry.state != ActorLifecycle::Terminated)
            .map(|entry| entry.actor.name())
            .collect()
    }

    /// Binds two ports owned by this rank to each other.
    fn connect_local(
        &self,
        src_actor: &str,
        src_port: &str,
        dst_actor: &str,
        dst_port: &str,
    ) -> Result<(), Error> {
        let out = self.cell_out_port(src_actor, src_port)?;
        let input = self.cell_in_port(dst_actor, dst_port)?;
        if input.is_connected() {
            return Err(Error::AlreadyConnected(input.qualified_name()));
        }
        out.bind_local(input.local_link())?;
        input.bind_local(out.qualified_name(), out.owner())?;
        debug!(
            rank = self.rank(),
            "{} connected to {}.",
            out.qualified_name(),
            input.qualified_name()
        );
        Ok(())
    }

    /// Serves a bind request from another rank. Returns the capacity and element type of the
    /// port, bound unless the request is `check_only`.
    fn bind_requested(&self, request: BindRequest) -> Result<BoundPort, Error> {
        let actor = self.local_actor(&request.actor)?;
        let (name, bound) = match request.direction {
            PortDirection::In => {
                let input = actor.cell().abstract_in_port(&request.port)?;
                if input.is_connected() {
                    return Err(Error::AlreadyConnected(input.qualified_name()));
                }
                let bound = BoundPort {
                    capacity: input.capacity(),
                    element: input.element_type().to_owned(),
                };
                (input.qualified_name(), bound)
            }
            PortDirection::Out => {
                let out = actor.cell().abstract_out_port(&request.port)?;
                if out.is_connected() {
                    return Err(Error::AlreadyConnected(out.qualified_name()));
                }
                let bound = BoundPort {
                    capacity: out.capacity(),
                    element: out.element_type().to_owned(),
                };
                (out.qualified_name(), bound)
            }
        };
        if let Some(expected) = request.capacity {
            check_capacity(&name, expected, bound.capacity)?;
        }
        if let Some(expected) = &request.element {
            check_element(&name, expected, &bound.element)?;
        }
        if request.check_only {
            return Ok(bound);
        }

        let link = RemoteLink::new(request.peer, self.runtime.clone());
        match request.direction {
            PortDirection::In => {
                let input = actor.cell().abstract_in_port(&request.port)?;
                input.bind_remote(link)?;
                self.runtime.register_inbound(input.tag(), input)?;
            }
            PortDirection::Out => {
                let out = actor.cell().abstract_out_port(&request.port)?;
                out.bind_remote(link)?;
                self.runtime.register_outbound(request.peer.tag, out)?;
            }
        }
        Ok(bound)
    }

    async fn bind_remote_port(
        &mut self,
        owner: Rank,
        request: BindRequest,
    ) -> Result<BoundPort, Error> {
        let call = self.runtime.call(owner, Envelope::Bind(request))?;
        match self.await_call(call).await? {
            Reply::Bound { capacity, element } => Ok(BoundPort { capacity, element }),
            other => Err(Error::Protocol(format!(
                "unexpected answer to bind request from rank {}: {:?}",
                owner, other
            ))),
        }
    }

    async fn await_call(&mut self, call: RemoteCall) -> Result<Reply, Error> {
        let mut replies = self.settle(vec![call], |_| true).await?;
        replies
            .pop()
            .ok_or_else(|| Error::Protocol("remote call lost its reply".to_owned()))
    }

    /// Drives progress until every call in `calls` is answered and `done` holds.
    async fn settle<F>(
        &mut self,
        mut calls: Vec<RemoteCall>,
        done: F,
    ) -> Result<Vec<Reply>, Error>
    where
        F: Fn(&Self) -> bool,
    {
        let mut replies: Vec<Option<Reply>> = calls.iter().map(|_| None).collect();
        loop {
            let mut active = self.progress()?;
            for (call, reply) in calls.iter_mut().zip(replies.iter_mut()) {
                if reply.is_none() {
                    if let Some(answer) = call.poll()? {
                        *reply = Some(answer);
                        active = true;
                    }
                }
            }
            if replies.iter().all(Option::is_some) && done(self) {
                return Ok(replies.into_iter().flatten().collect());
            }
            if !active {
                tokio::task::yield_now().await;
            }
        }
    }

    /// One progress pass: collects completions, serves every received envelope and applies
    /// the queued deliveries. Returns whether anything happened.
    fn progress(&mut self) -> Result<bool, Error> {
        let mut active = self.runtime.poll_completions()? > 0;
        while let Some(delivery) = self.runtime.receive()? {
            active = true;
            self.dispatch(delivery)?;
        }
        active |= self.runtime.run_local_callbacks()? > 0;
        Ok(active)
    }

    fn dispatch(&mut self, delivery: Delivery) -> Result<(), Error> {
        let Delivery {
            from,
            envelope,
            responder,
        } = delivery;
        match envelope {
            Envelope::Data { tag, payload } => {
                self.runtime.schedule(LocalCallback::Deliver {
                    tag,
                    payload,
                    responder,
                });
            }
            Envelope::Credit { tag, slots } => {
                self.runtime.schedule(LocalCallback::Credit {
                    tag,
                    slots,
                    responder,
                });
            }
            Envelope::Directory { actors } => {
                if self.directory.is_some() || self.gathered.contains_key(&from) {
                    let e = Error::Protocol(format!(
                        "unexpected actor directory from rank {}",
                        from
                    ));
                    responder.reply(Reply::Rejected(e.clone()));
                    return Err(e);
                }
                self.gathered.insert(from, actors);
                responder.reply(Reply::Ack);
            }
            Envelope::Barrier { epoch } => {
                *self.arrivals.entry(epoch).or_insert(0) += 1;
                responder.reply(Reply::Ack);
            }
            Envelope::Bind(request) => {
                debug!(
                    rank = self.rank(),
                    from,
                    "Bind request for {} {}.{}.",
                    request.direction,
                    &request.actor,
                    &request.port
                );
                match self.bind_requested(request) {
                    Ok(BoundPort { capacity, element }) => {
                        responder.reply(Reply::Bound { capacity, element })
                    }
                    Err(e) => {
                        warn!(rank = self.rank(), from, "Bind request rejected: {}", e);
                        responder.reply(Reply::Rejected(e));
                    }
                }
            }
            Envelope::Connect(request) => {
                let result = self.connect_local(
                    &request.source_actor,
                    &request.source_port,
                    &request.destination_actor,
                    &request.destination_port,
                );
                match result {
                    Ok(()) => responder.reply(Reply::Ack),
                    Err(e) => {
                        warn!(rank = self.rank(), from, "Connect request rejected: {}", e);
                        responder.reply(Reply::Rejected(e));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Shape of a port bound or validated on its owner's rank.
struct BoundPort {
    capacity: usize,
    element: String,
}

fn check_element(port: &str, expected: &str, found: &str) -> Result<(), Error> {
    if expected != found {
        return Err(Error::TypeMismatch(port.to_owned()));
    }
    Ok(())
}

fn check_capacity(port: &str, expected: usize, found: usize) -> Result<(), Error> {
    if expected != found {
        return Err(Error::CapacityMismatch {
            port: port.to_owned(),
            expected,
            found,
        });
    }
    Ok(())
}

impl Display for ActorGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "ActorGraph {{")?;
        writeln!(f, "  Actors {{")?;
        match &self.directory {
            Some(directory) => {
                for (name, rank) in directory {
                    writeln!(f, "    {} {}", name, rank)?;
                }
            }
            None => {
                for entry in &self.actors {
                    writeln!(f, "    {} {}", entry.actor.name(), self.rank())?;
                }
            }
        }
        writeln!(f, "  }}")?;
        write!(f, "}}")
    }
}

impl Drop for ActorGraph {
    fn drop(&mut self) {
        self.runtime.clear_routes();
    }
}
