// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Process-local runtime
//!
//! The [`Runtime`] is the bookkeeping object every rank owns exactly once. It wraps the
//! [`Transport`] and tracks every asynchronous operation issued by this rank:
//!
//! - **Remote calls** (`rpcs_in_flight`): envelopes posted to another rank. The counter is
//!   incremented right before posting and decremented when the completion is observed, that is
//!   once the target rank has handled the envelope.
//! - **Local callbacks** (`lpcs_in_flight`): data and credit envelopes received from the
//!   transport and queued for delivery into this rank's ports. The counter is incremented when
//!   the callback is queued and decremented once it has run.
//!
//! The scheduler may only declare termination when both counters are zero.
//!
//! The runtime also keeps the route tables mapping a stream tag to the in port that receives
//! data under that tag, and to the out port that receives the credits for it.
//!

use crate::{
    Error,
    identity::{RemoteEndpoint, Tag},
    port::{AbstractInPort, AbstractOutPort},
    transport::{Completion, Delivery, Envelope, Rank, Reply, Responder, Transport},
};

use tracing::{debug, error};

use std::{
    collections::{HashMap, VecDeque, hash_map::Entry},
    fmt::Debug,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Locks `mutex`, recovering the guard if a previous holder panicked.
///
/// No user code ever runs while one of the runtime's locks is held, so a poisoned lock still
/// guards consistent data.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A received data or credit envelope waiting to be applied to a local port.
pub(crate) enum LocalCallback {
    Deliver {
        tag: Tag,
        payload: Vec<u8>,
        responder: Responder,
    },
    Credit {
        tag: Tag,
        slots: usize,
        responder: Responder,
    },
}

/// A fire-and-forget remote call whose completion has not been observed yet.
struct PendingCall {
    to: Rank,
    kind: &'static str,
    completion: Completion,
}

struct RuntimeInner {
    transport: Box<dyn Transport>,
    rpcs_in_flight: AtomicUsize,
    lpcs_in_flight: AtomicUsize,
    pending: Mutex<Vec<PendingCall>>,
    callbacks: Mutex<VecDeque<LocalCallback>>,
    inbound: Mutex<HashMap<Tag, Arc<dyn AbstractInPort>>>,
    outbound: Mutex<HashMap<Tag, Arc<dyn AbstractOutPort>>>,
}

/// Process-local runtime shared by the graph and by every remotely connected port.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Wraps `transport`.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                transport: Box::new(transport),
                rpcs_in_flight: AtomicUsize::new(0),
                lpcs_in_flight: AtomicUsize::new(0),
                pending: Mutex::new(Vec::new()),
                callbacks: Mutex::new(VecDeque::new()),
                inbound: Mutex::new(HashMap::new()),
                outbound: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn rank(&self) -> Rank {
        self.inner.transport.rank()
    }

    pub fn world_size(&self) -> usize {
        self.inner.transport.world_size()
    }

    /// Remote calls posted by this rank and not yet completed.
    pub fn rpcs_in_flight(&self) -> usize {
        self.inner.rpcs_in_flight.load(Ordering::Acquire)
    }

    /// Received deliveries not yet applied to their port.
    pub fn lpcs_in_flight(&self) -> usize {
        self.inner.lpcs_in_flight.load(Ordering::Acquire)
    }

    /// True when no asynchronous operation of this rank is outstanding.
    pub fn is_drained(&self) -> bool {
        self.rpcs_in_flight() == 0 && self.lpcs_in_flight() == 0
    }

    fn register_rpc(&self) {
        self.inner.rpcs_in_flight.fetch_add(1, Ordering::AcqRel);
    }

    fn deregister_rpc(&self) {
        self.inner.rpcs_in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    fn register_lpc(&self) {
        self.inner.lpcs_in_flight.fetch_add(1, Ordering::AcqRel);
    }

    fn deregister_lpc(&self) {
        self.inner.lpcs_in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    /// Posts `envelope` to `to` without waiting for it. The completion is collected by
    /// [`Runtime::poll_completions`].
    pub(crate) fn post(&self, to: Rank, envelope: Envelope) -> Result<(), Error> {
        let kind = envelope.kind();
        self.register_rpc();
        match self.inner.transport.post(to, envelope) {
            Ok(completion) => {
                lock(&self.inner.pending).push(PendingCall {
                    to,
                    kind,
                    completion,
                });
                Ok(())
            }
            Err(e) => {
                self.deregister_rpc();
                error!(rank = self.rank(), to, kind, "Failed to post: {}", e);
                Err(e)
            }
        }
    }

    /// Posts `envelope` to `to` and returns a handle the caller polls for the reply.
    pub(crate) fn call(
        &self,
        to: Rank,
        envelope: Envelope,
    ) -> Result<RemoteCall, Error> {
        self.register_rpc();
        match self.inner.transport.post(to, envelope) {
            Ok(completion) => Ok(RemoteCall {
                to,
                completion,
                runtime: self.clone(),
                finished: false,
            }),
            Err(e) => {
                self.deregister_rpc();
                Err(e)
            }
        }
    }

    /// Collects the completions of fire-and-forget calls. Returns how many completed.
    ///
    /// # Errors
    ///
    /// A call rejected by its target, or lost by the transport, is fatal.
    pub(crate) fn poll_completions(&self) -> Result<usize, Error> {
        let mut pending = lock(&self.inner.pending);
        let mut completed = 0;
        let mut index = 0;
        while index < pending.len() {
            let reply = match pending.get_mut(index) {
                Some(call) => call.completion.try_complete(),
                None => break,
            };
            match reply {
                Ok(None) => index += 1,
                Ok(Some(reply)) => {
                    let call = pending.swap_remove(index);
                    self.deregister_rpc();
                    completed += 1;
                    if let Reply::Rejected(reason) = reply {
                        error!(
                            rank = self.rank(),
                            to = call.to,
                            kind = call.kind,
                            "Remote call rejected: {}",
                            reason
                        );
                        return Err(Error::Remote {
                            rank: call.to,
                            reason: Box::new(reason),
                        });
                    }
                }
                Err(e) => {
                    let call = pending.swap_remove(index);
                    self.deregister_rpc();
                    error!(
                        rank = self.rank(),
                        to = call.to,
                        kind = call.kind,
                        "Remote call lost: {}",
                        e
                    );
                    return Err(e);
                }
            }
        }
        Ok(completed)
    }

    /// Takes the next envelope addressed to this rank.
    pub(crate) fn receive(&self) -> Result<Option<Delivery>, Error> {
        self.inner.transport.poll()
    }

    /// Queues a received data or credit envelope for delivery.
    pub(crate) fn schedule(&self, callback: LocalCallback) {
        self.register_lpc();
        lock(&self.inner.callbacks).push_back(callback);
    }

    /// Applies every queued delivery to its port, triggering the owning actors.
    ///
    /// Returns how many callbacks ran.
    pub(crate) fn run_local_callbacks(&self) -> Result<usize, Error> {
        let mut executed = 0;
        loop {
            let next = lock(&self.inner.callbacks).pop_front();
            let Some(callback) = next else {
                return Ok(executed);
            };
            let result = self.execute(callback);
            self.deregister_lpc();
            result?;
            executed += 1;
        }
    }

    fn execute(&self, callback: LocalCallback) -> Result<(), Error> {
        let (result, responder) = match callback {
            LocalCallback::Deliver {
                tag,
                payload,
                responder,
            } => {
                let port = lock(&self.inner.inbound).get(&tag).cloned();
                let result = match port {
                    Some(port) => port.deliver(&payload),
                    None => Err(Error::Protocol(format!(
                        "no in port registered for tag {}",
                        tag
                    ))),
                };
                (result, responder)
            }
            LocalCallback::Credit {
                tag,
                slots,
                responder,
            } => {
                let port = lock(&self.inner.outbound).get(&tag).cloned();
                let result = match port {
                    Some(port) => port.return_credit(slots),
                    None => Err(Error::Protocol(format!(
                        "no out port registered for tag {}",
                        tag
                    ))),
                };
                (result, responder)
            }
        };
        match result {
            Ok(()) => {
                responder.reply(Reply::Ack);
                Ok(())
            }
            Err(e) => {
                error!(rank = self.rank(), "Local delivery failed: {}", e);
                responder.reply(Reply::Rejected(e.clone()));
                Err(e)
            }
        }
    }

    /// Routes data arriving under `tag` to `port`.
    pub(crate) fn register_inbound(
        &self,
        tag: Tag,
        port: Arc<dyn AbstractInPort>,
    ) -> Result<(), Error> {
        match lock(&self.inner.inbound).entry(tag) {
            Entry::Occupied(entry) => Err(Error::TagCollision {
                tag,
                first: entry.get().qualified_name(),
                second: port.qualified_name(),
            }),
            Entry::Vacant(entry) => {
                debug!(rank = self.rank(), tag, port = %port.qualified_name(), "Inbound route registered.");
                entry.insert(port);
                Ok(())
            }
        }
    }

    /// Routes credits arriving under `tag` to `port`.
    pub(crate) fn register_outbound(
        &self,
        tag: Tag,
        port: Arc<dyn AbstractOutPort>,
    ) -> Result<(), Error> {
        match lock(&self.inner.outbound).entry(tag) {
            Entry::Occupied(entry) => Err(Error::TagCollision {
                tag,
                first: entry.get().qualified_name(),
                second: port.qualified_name(),
            }),
            Entry::Vacant(entry) => {
                debug!(rank = self.rank(), tag, port = %port.qualified_name(), "Outbound route registered.");
                entry.insert(port);
                Ok(())
            }
        }
    }

    /// Drops the route tables, breaking the reference cycle between the runtime and the
    /// remotely bound ports.
    pub(crate) fn clear_routes(&self) {
        lock(&self.inner.inbound).clear();
        lock(&self.inner.outbound).clear();
    }
}

impl Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("rank", &self.rank())
            .field("world_size", &self.world_size())
            .field("rpcs_in_flight", &self.rpcs_in_flight())
            .field("lpcs_in_flight", &self.lpcs_in_flight())
            .finish()
    }
}

/// An awaited remote call. Counted as in flight until its reply has been observed or the call
/// is dropped.
pub(crate) struct RemoteCall {
    to: Rank,
    completion: Completion,
    runtime: Runtime,
    finished: bool,
}

impl RemoteCall {
    /// Polls for the reply. A rejection is returned as [`Error::Remote`].
    pub(crate) fn poll(&mut self) -> Result<Option<Reply>, Error> {
        if self.finished {
            return Err(Error::Protocol(format!(
                "call to rank {} polled after completion",
                self.to
            )));
        }
        let reply = self.completion.try_complete();
        if !matches!(reply, Ok(None)) {
            self.finished = true;
            self.runtime.deregister_rpc();
        }
        match reply? {
            Some(Reply::Rejected(reason)) => Err(Error::Remote {
                rank: self.to,
                reason: Box::new(reason),
            }),
            other => Ok(other),
        }
    }
}

impl Drop for RemoteCall {
    fn drop(&mut self) {
        if !self.finished {
            debug!(rank = self.runtime.rank(), to = self.to, "Remote call abandoned.");
            self.runtime.deregister_rpc();
        }
    }
}

/// The transport side of a port bound to a peer on another rank.
#[derive(Clone)]
pub struct RemoteLink {
    endpoint: RemoteEndpoint,
    runtime: Runtime,
}

impl RemoteLink {
    pub(crate) fn new(endpoint: RemoteEndpoint, runtime: Runtime) -> Self {
        Self { endpoint, runtime }
    }

    /// Rank and tag of the peer.
    pub fn endpoint(&self) -> RemoteEndpoint {
        self.endpoint
    }

    pub(crate) fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Posts `envelope` to the peer's rank.
    pub(crate) fn post(&self, envelope: Envelope) -> Result<(), Error> {
        self.runtime.post(self.endpoint.rank, envelope)
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{InPort, OutPort, Trigger, transport::LocalCluster};

    #[test]
    fn test_post_counts_until_completion() {
        let mut ranks = LocalCluster::create(2);
        let peer = ranks.pop().unwrap();
        let runtime = Runtime::new(ranks.pop().unwrap());

        runtime.post(1, Envelope::Barrier { epoch: 0 }).unwrap();
        runtime.post(1, Envelope::Barrier { epoch: 1 }).unwrap();
        assert_eq!(runtime.rpcs_in_flight(), 2);
        assert_eq!(runtime.poll_completions().unwrap(), 0);

        let first = peer.poll().unwrap().unwrap();
        first.responder.reply(Reply::Ack);
        assert_eq!(runtime.poll_completions().unwrap(), 1);
        assert_eq!(runtime.rpcs_in_flight(), 1);

        let second = peer.poll().unwrap().unwrap();
        second.responder.reply(Reply::Ack);
        assert_eq!(runtime.poll_completions().unwrap(), 1);
        assert!(runtime.is_drained());
    }

    #[test]
    fn test_rejected_post_is_fatal() {
        let mut ranks = LocalCluster::create(2);
        let peer = ranks.pop().unwrap();
        let runtime = Runtime::new(ranks.pop().unwrap());

        runtime
            .post(1, Envelope::Credit { tag: 1, slots: 1 })
            .unwrap();
        let delivery = peer.poll().unwrap().unwrap();
        delivery
            .responder
            .reply(Reply::Rejected(Error::Protocol("credit underflow".to_owned())));

        let error = runtime.poll_completions().unwrap_err();
        assert!(matches!(error, Error::Remote { rank: 1, .. }));
        assert_eq!(runtime.rpcs_in_flight(), 0);
    }

    #[test]
    fn test_remote_call_reply() {
        let mut ranks = LocalCluster::create(2);
        let peer = ranks.pop().unwrap();
        let runtime = Runtime::new(ranks.pop().unwrap());

        let mut call = runtime.call(1, Envelope::Barrier { epoch: 9 }).unwrap();
        assert_eq!(call.poll(), Ok(None));
        assert_eq!(runtime.rpcs_in_flight(), 1);

        peer.poll()
            .unwrap()
            .unwrap()
            .responder
            .reply(Reply::Bound {
                capacity: 4,
                element: "u8".to_owned(),
            });
        assert_eq!(
            call.poll(),
            Ok(Some(Reply::Bound {
                capacity: 4,
                element: "u8".to_owned()
            }))
        );
        assert_eq!(runtime.rpcs_in_flight(), 0);
        assert!(call.poll().is_err());
    }

    #[test]
    fn test_abandoned_call_is_not_in_flight() {
        let mut ranks = LocalCluster::create(2);
        let _peer = ranks.pop().unwrap();
        let runtime = Runtime::new(ranks.pop().unwrap());

        let call = runtime.call(1, Envelope::Barrier { epoch: 0 }).unwrap();
        assert_eq!(runtime.rpcs_in_flight(), 1);
        drop(call);
        assert_eq!(runtime.rpcs_in_flight(), 0);
        assert!(runtime.is_drained());
    }

    #[test]
    fn test_tag_collision_keeps_first_route() {
        let mut ranks = LocalCluster::create(2);
        let _peer = ranks.pop().unwrap();
        let runtime = Runtime::new(ranks.pop().unwrap());

        let first = InPort::<u8, 1>::new("A", "in", Trigger::default());
        let second = InPort::<u8, 1>::new("B", "in", Trigger::default());
        runtime.register_inbound(7, first.as_abstract()).unwrap();
        assert_eq!(
            runtime.register_inbound(7, second.as_abstract()),
            Err(Error::TagCollision {
                tag: 7,
                first: "A.in".to_owned(),
                second: "B.in".to_owned(),
            })
        );

        let sender = OutPort::<u8, 1>::new("C", "out", Trigger::default());
        let other = OutPort::<u8, 1>::new("D", "out", Trigger::default());
        runtime.register_outbound(7, sender.as_abstract()).unwrap();
        assert!(matches!(
            runtime.register_outbound(7, other.as_abstract()),
            Err(Error::TagCollision { tag: 7, .. })
        ));

        // Data under the colliding tag still reaches the first port. Delivery does not require
        // the port to be bound.
        let (responder, _completion) = crate::transport::operation();
        runtime.schedule(LocalCallback::Deliver {
            tag: 7,
            payload: bincode::serialize(&5u8).unwrap(),
            responder,
        });
        assert_eq!(runtime.run_local_callbacks(), Ok(1));
        assert_eq!(first.available(), 1);
        assert_eq!(second.available(), 0);
    }

    #[test]
    fn test_unrouted_delivery_is_rejected() {
        let mut ranks = LocalCluster::create(2);
        let _peer = ranks.pop().unwrap();
        let runtime = Runtime::new(ranks.pop().unwrap());

        let (responder, mut completion) = crate::transport::operation();
        runtime.schedule(LocalCallback::Deliver {
            tag: 42,
            payload: Vec::new(),
            responder,
        });
        assert_eq!(runtime.lpcs_in_flight(), 1);
        assert!(matches!(
            runtime.run_local_callbacks(),
            Err(Error::Protocol(_))
        ));
        assert_eq!(runtime.lpcs_in_flight(), 0);
        assert!(matches!(
            completion.try_complete(),
            Ok(Some(Reply::Rejected(Error::Protocol(_))))
        ));
    }
}
