// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor
//!
//! The `actor` module provides the [`Actor`] trait, the [`ActorCell`] every actor embeds to own
//! its ports, and the [`Trigger`] counter the scheduler uses to decide when to call an actor.
//!
//! ## Execution model
//!
//! All actors of one rank are driven by a single cooperative scheduler. An actor never runs
//! concurrently with itself or with any other actor of its rank. `act()` performs a bounded slice
//! of work and returns; it is called again once per pending trigger. Triggers come from:
//!
//! - a local peer writing into one of the actor's in ports,
//! - data or credits arriving from a peer on another rank,
//! - the actor itself, through [`ActorCell::trigger`], to ask for one more invocation.
//!
//! The actor decides when it is logically done by returning [`Step::Terminate`]; the scheduler
//! decides when to call it.
//!
//! ```ignore
//! use actor::{Actor, ActorCell, Error, OutPort, Step};
//!
//! struct Source {
//!     cell: ActorCell,
//!     out: OutPort<u64, 2>,
//!     next: u64,
//! }
//!
//! impl Source {
//!     fn new(name: &str) -> Result<Self, Error> {
//!         let mut cell = ActorCell::new(name);
//!         let out = cell.out_port("out")?;
//!         Ok(Self { cell, out, next: 0 })
//!     }
//! }
//!
//! impl Actor for Source {
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
//! ```
//!

use crate::{
    Error,
    port::{AbstractInPort, AbstractOutPort, Element, InPort, OutPort},
    transport::PortDirection,
};

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

/// Outcome of one `act()` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep the actor running; it is invoked again on its next trigger.
    Continue,
    /// The actor is logically done and enters the terminated state.
    Terminate,
}

/// Lifecycle of an actor inside a graph.
///
/// `Created` → `Running` → `Terminated`. `Terminated` is final: a terminated actor is never
/// invoked again and triggers addressed to it are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorLifecycle {
    /// Registered, the graph has not started running.
    Created,
    /// Invoked whenever its trigger count is positive.
    Running,
    /// Done.
    Terminated,
}

#[derive(Debug, Default)]
struct TriggerState {
    pending: AtomicUsize,
    closed: AtomicBool,
}

/// Saturating counter of owed `act()` invocations.
///
/// Cloned into every port of the actor so a write can mark the reading actor dirty in the same
/// step as the enqueue.
#[derive(Debug, Clone, Default)]
pub struct Trigger {
    inner: Arc<TriggerState>,
}

impl Trigger {
    /// Owes the actor one more invocation. No-op once the actor has terminated.
    pub fn trigger(&self) {
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }
        let mut pending = self.inner.pending.load(Ordering::Acquire);
        while pending < usize::MAX {
            match self.inner.pending.compare_exchange_weak(
                pending,
                pending + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(current) => pending = current,
            }
        }
    }

    /// Number of owed invocations.
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// True once the actor has terminated.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Takes one owed invocation, if any.
    pub(crate) fn consume(&self) -> bool {
        self.inner
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| {
                pending.checked_sub(1)
            })
            .is_ok()
    }

    /// Marks the actor terminated and forgets owed invocations.
    pub(crate) fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.pending.store(0, Ordering::Release);
    }
}

/// Identity and ports of one actor.
///
/// Ports are created through the cell while the actor is being constructed. The cell keeps a
/// type-erased handle to each of them for the graph to wire; the actor keeps the typed handle
/// returned by [`ActorCell::in_port`] / [`ActorCell::out_port`] to do its I/O.
pub struct ActorCell {
    name: String,
    trigger: Trigger,
    in_ports: BTreeMap<String, Arc<dyn AbstractInPort>>,
    out_ports: BTreeMap<String, Arc<dyn AbstractOutPort>>,
}

impl ActorCell {
    /// Creates a cell for an actor named `name`. Names must be unique in the whole group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            trigger: Trigger::default(),
            in_ports: BTreeMap::new(),
            out_ports: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requests one more invocation of this actor.
    pub fn trigger(&self) {
        self.trigger.trigger();
    }

    /// Number of invocations currently owed to this actor.
    pub fn pending_triggers(&self) -> usize {
        self.trigger.pending()
    }

    pub(crate) fn trigger_handle(&self) -> &Trigger {
        &self.trigger
    }

    /// Creates an in port of capacity `CAPACITY` named `name`.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicatePort`] if the actor already has an in port with this name,
    /// [`Error::Protocol`] if `CAPACITY` is zero.
    pub fn in_port<T: Element, const CAPACITY: usize>(
        &mut self,
        name: &str,
    ) -> Result<InPort<T, CAPACITY>, Error> {
        check_capacity(&self.name, name, CAPACITY)?;
        if self.in_ports.contains_key(name) {
            return Err(Error::DuplicatePort {
                actor: self.name.clone(),
                port: name.to_owned(),
            });
        }
        let port = InPort::new(&self.name, name, self.trigger.clone());
        self.in_ports.insert(name.to_owned(), port.as_abstract());
        Ok(port)
    }

    /// Creates an out port of capacity `CAPACITY` named `name`.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicatePort`] if the actor already has an out port with this name,
    /// [`Error::Protocol`] if `CAPACITY` is zero.
    pub fn out_port<T: Element, const CAPACITY: usize>(
        &mut self,
        name: &str,
    ) -> Result<OutPort<T, CAPACITY>, Error> {
        check_capacity(&self.name, name, CAPACITY)?;
        if self.out_ports.contains_key(name) {
            return Err(Error::DuplicatePort {
                actor: self.name.clone(),
                port: name.to_owned(),
            });
        }
        let port = OutPort::new(&self.name, name, self.trigger.clone());
        self.out_ports.insert(name.to_owned(), port.as_abstract());
        Ok(port)
    }

    pub(crate) fn abstract_in_port(
        &self,
        name: &str,
    ) -> Result<Arc<dyn AbstractInPort>, Error> {
        self.in_ports
            .get(name)
            .cloned()
            .ok_or_else(|| self.unknown_port(name, PortDirection::In))
    }

    pub(crate) fn abstract_out_port(
        &self,
        name: &str,
    ) -> Result<Arc<dyn AbstractOutPort>, Error> {
        self.out_ports
            .get(name)
            .cloned()
            .ok_or_else(|| self.unknown_port(name, PortDirection::Out))
    }

    fn unknown_port(&self, port: &str, direction: PortDirection) -> Error {
        Error::UnknownPort {
            actor: self.name.clone(),
            port: port.to_owned(),
            direction: direction.to_string(),
        }
    }
}

fn check_capacity(actor: &str, port: &str, capacity: usize) -> Result<(), Error> {
    if capacity == 0 {
        return Err(Error::Protocol(format!(
            "port {}.{} must have a capacity of at least one",
            actor, port
        )));
    }
    Ok(())
}

impl Display for ActorCell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Actor( {} ) {{ ", self.name)?;
        for port in self.in_ports.values() {
            write!(f, "{} ", port.describe())?;
        }
        for port in self.out_ports.values() {
            write!(f, "{} ", port.describe())?;
        }
        write!(f, "}}")
    }
}

/// A named unit of computation owning typed ports.
///
/// Implementors embed an [`ActorCell`] and expose it through [`Actor::cell`]. Once added to an
/// [`ActorGraph`](crate::ActorGraph), the graph owns the actor and calls [`Actor::act`] once for
/// every trigger, starting with one unconditional invocation when the graph runs.
///
/// Any error returned by `act()` is fatal: the graph stops and returns it from `run()`.
pub trait Actor: Send + 'static {
    /// The cell holding the actor's name, trigger and ports.
    fn cell(&self) -> &ActorCell;

    /// Performs one bounded slice of work.
    fn act(&mut self) -> Result<Step, Error>;

    /// Name of the actor.
    fn name(&self) -> &str {
        self.cell().name()
    }
}
