// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Ports
//!
//! Typed, directional, bounded connection endpoints. An [`OutPort`] is connected to exactly one
//! [`InPort`] of the same element type and capacity, once, while the graph is being wired.
//!
//! The buffer always lives on the reading side. A local [`OutPort`] writes straight into the
//! reader's [`BoundedChannel`] and triggers the reading actor in the same step. A remote
//! [`OutPort`] encodes the element and posts it to the reader's rank, consuming one of its
//! `CAPACITY` send slots; the reader gives the slot back with a credit message each time it
//! removes an element from its channel. Either way, removing an element triggers the writing
//! actor, so a writer waiting for free capacity is woken whether its reader is local or remote.
//!

use crate::{
    BoundedChannel, Error,
    actor::Trigger,
    identity::{PortIdentity, RemoteEndpoint, Tag, compute_tag, qualified_name},
    runtime::{RemoteLink, lock},
    transport::Envelope,
};

use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use std::{
    any::Any,
    fmt::{Debug, Formatter},
    sync::{
        Arc, Mutex, OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Element type a port can carry.
pub trait Element: Serialize + DeserializeOwned + Send + 'static {}

impl<T> Element for T where T: Serialize + DeserializeOwned + Send + 'static {}

/// Handle on the channel of a local in port, captured by the out port at connection time.
pub(crate) struct LocalLink<T> {
    channel: Arc<Mutex<BoundedChannel<T>>>,
    owner: Trigger,
    port: String,
    capacity: usize,
}

/// Writing side of a locally connected in port.
pub(crate) struct LocalWriter {
    source: String,
    owner: Trigger,
}

/// Type-erased in port, as seen by the graph and the runtime.
pub(crate) trait AbstractInPort: Send + Sync {
    /// `"<actor>.<port>"`, the logical name of the stream feeding the port.
    fn qualified_name(&self) -> String;

    fn capacity(&self) -> usize;

    /// Name of the element type, compared when the peer lives on another rank.
    fn element_type(&self) -> &'static str;

    fn is_connected(&self) -> bool;

    /// Tag of the stream feeding the port.
    fn tag(&self) -> Tag;

    /// A `LocalLink<T>` on the port's channel.
    fn local_link(&self) -> Box<dyn Any + Send>;

    /// Records that the port is fed by the local out port `source`, owned by the actor behind
    /// `writer`.
    fn bind_local(&self, source: String, writer: Trigger) -> Result<(), Error>;

    /// Records that the port is fed from another rank.
    fn bind_remote(&self, link: RemoteLink) -> Result<(), Error>;

    /// Decodes one element received from the transport into the channel.
    fn deliver(&self, payload: &[u8]) -> Result<(), Error>;

    fn describe(&self) -> String;
}

/// Type-erased out port, as seen by the graph and the runtime.
pub(crate) trait AbstractOutPort: Send + Sync {
    fn qualified_name(&self) -> String;

    fn capacity(&self) -> usize;

    fn element_type(&self) -> &'static str;

    fn is_connected(&self) -> bool;

    /// Trigger of the owning actor.
    fn owner(&self) -> Trigger;

    /// Binds the port to the channel of a local in port. `link` must be the value returned by
    /// [`AbstractInPort::local_link`].
    fn bind_local(&self, link: Box<dyn Any + Send>) -> Result<(), Error>;

    fn bind_remote(&self, link: RemoteLink) -> Result<(), Error>;

    /// Gives back `slots` send slots freed by the remote reader.
    fn return_credit(&self, slots: usize) -> Result<(), Error>;

    fn describe(&self) -> String;
}

struct InPortInner<T> {
    name: String,
    qualified: String,
    tag: Tag,
    capacity: usize,
    owner: Trigger,
    channel: Arc<Mutex<BoundedChannel<T>>>,
    /// The local writer, or the link to the remote one.
    identity: OnceLock<PortIdentity<LocalWriter>>,
}

impl<T> InPortInner<T> {
    fn identity(&self) -> Result<&PortIdentity<LocalWriter>, Error> {
        self.identity
            .get()
            .ok_or_else(|| Error::NotConnected(self.qualified.clone()))
    }

    fn bind(&self, identity: PortIdentity<LocalWriter>) -> Result<(), Error> {
        self.identity
            .set(identity)
            .map_err(|_| Error::AlreadyConnected(self.qualified.clone()))
    }
}

impl<T: Element> AbstractInPort for InPortInner<T> {
    fn qualified_name(&self) -> String {
        self.qualified.clone()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn element_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn is_connected(&self) -> bool {
        self.identity.get().is_some()
    }

    fn tag(&self) -> Tag {
        self.tag
    }

    fn local_link(&self) -> Box<dyn Any + Send> {
        Box::new(LocalLink {
            channel: self.channel.clone(),
            owner: self.owner.clone(),
            port: self.qualified.clone(),
            capacity: self.capacity,
        })
    }

    fn bind_local(&self, source: String, writer: Trigger) -> Result<(), Error> {
        self.bind(PortIdentity::Local(LocalWriter {
            source,
            owner: writer,
        }))
    }

    fn bind_remote(&self, link: RemoteLink) -> Result<(), Error> {
        self.bind(PortIdentity::Remote(link))
    }

    fn deliver(&self, payload: &[u8]) -> Result<(), Error> {
        let value: T = bincode::deserialize(payload)?;
        let mut channel = lock(&self.channel);
        channel.enqueue(value).map_err(|_| {
            Error::Protocol(format!(
                "credit overrun on {}, channel already holds {} elements",
                self.qualified,
                channel.available()
            ))
        })?;
        self.owner.trigger();
        Ok(())
    }

    fn describe(&self) -> String {
        format!("[IP-{} ID: {}]", self.capacity, self.name)
    }
}

/// Receiving end of a connection.
///
/// Cheap to clone: every clone refers to the same channel.
pub struct InPort<T, const CAPACITY: usize> {
    inner: Arc<InPortInner<T>>,
}

impl<T, const CAPACITY: usize> Clone for InPort<T, CAPACITY> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Element, const CAPACITY: usize> InPort<T, CAPACITY> {
    pub(crate) fn new(actor: &str, name: &str, owner: Trigger) -> Self {
        let qualified = qualified_name(actor, name);
        Self {
            inner: Arc::new(InPortInner {
                name: name.to_owned(),
                tag: compute_tag(&qualified),
                qualified,
                capacity: CAPACITY,
                owner,
                channel: Arc::new(Mutex::new(BoundedChannel::new(CAPACITY))),
                identity: OnceLock::new(),
            }),
        }
    }

    pub(crate) fn as_abstract(&self) -> Arc<dyn AbstractInPort> {
        self.inner.clone()
    }

    /// Removes and returns the oldest element.
    ///
    /// The freed slot triggers the writing actor. On a remotely fed port, deliveries already
    /// received by this rank are applied first and the slot travels back to the writer as a
    /// credit.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`] before the port is connected, [`Error::ChannelEmpty`] when there
    /// is nothing to read.
    pub fn read(&self) -> Result<T, Error> {
        match self.inner.identity()? {
            PortIdentity::Local(writer) => {
                let value = lock(&self.inner.channel).dequeue()?;
                writer.owner.trigger();
                Ok(value)
            }
            PortIdentity::Remote(link) => {
                link.runtime().run_local_callbacks()?;
                let value = lock(&self.inner.channel).dequeue()?;
                link.post(Envelope::Credit {
                    tag: self.inner.tag,
                    slots: 1,
                })?;
                Ok(value)
            }
        }
    }

    /// Returns a copy of the oldest element without removing it.
    pub fn peek(&self) -> Result<T, Error>
    where
        T: Clone,
    {
        if let PortIdentity::Remote(link) = self.inner.identity()? {
            link.runtime().run_local_callbacks()?;
        }
        lock(&self.inner.channel).peek().cloned()
    }

    /// Number of elements ready to be read.
    pub fn available(&self) -> usize {
        lock(&self.inner.channel).available()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    /// Rank and tag of the writer when it lives on another rank.
    pub fn peer(&self) -> Option<RemoteEndpoint> {
        self.inner.identity.get().and_then(PortIdentity::endpoint)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn capacity(&self) -> usize {
        CAPACITY
    }
}

impl<T, const CAPACITY: usize> Debug for InPort<T, CAPACITY> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let source = match self.inner.identity.get() {
            Some(PortIdentity::Local(writer)) => Some(writer.source.clone()),
            Some(PortIdentity::Remote(link)) => Some(link.endpoint().to_string()),
            None => None,
        };
        f.debug_struct("InPort")
            .field("name", &self.inner.qualified)
            .field("capacity", &CAPACITY)
            .field("source", &source)
            .finish()
    }
}

struct OutPortInner<T> {
    name: String,
    qualified: String,
    capacity: usize,
    owner: Trigger,
    identity: OnceLock<PortIdentity<LocalLink<T>>>,
    /// Remote send slots in use.
    in_flight: AtomicUsize,
}

impl<T> OutPortInner<T> {
    fn identity(&self) -> Result<&PortIdentity<LocalLink<T>>, Error> {
        self.identity
            .get()
            .ok_or_else(|| Error::NotConnected(self.qualified.clone()))
    }

    fn bind(&self, identity: PortIdentity<LocalLink<T>>) -> Result<(), Error> {
        self.identity
            .set(identity)
            .map_err(|_| Error::AlreadyConnected(self.qualified.clone()))
    }

    fn free_capacity(&self) -> usize {
        match self.identity.get() {
            None => 0,
            Some(PortIdentity::Local(link)) => lock(&link.channel).free(),
            Some(PortIdentity::Remote(_)) => self
                .capacity
                .saturating_sub(self.in_flight.load(Ordering::Acquire)),
        }
    }
}

impl<T: Element> AbstractOutPort for OutPortInner<T> {
    fn qualified_name(&self) -> String {
        self.qualified.clone()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn element_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn is_connected(&self) -> bool {
        self.identity.get().is_some()
    }

    fn owner(&self) -> Trigger {
        self.owner.clone()
    }

    fn bind_local(&self, link: Box<dyn Any + Send>) -> Result<(), Error> {
        let link = link
            .downcast::<LocalLink<T>>()
            .map_err(|_| Error::TypeMismatch(self.qualified.clone()))?;
        if link.capacity != self.capacity {
            return Err(Error::CapacityMismatch {
                port: link.port.clone(),
                expected: self.capacity,
                found: link.capacity,
            });
        }
        debug!(source = %self.qualified, destination = %link.port, "Port bound locally.");
        self.bind(PortIdentity::Local(*link))
    }

    fn bind_remote(&self, link: RemoteLink) -> Result<(), Error> {
        debug!(source = %self.qualified, peer = %link.endpoint(), "Port bound remotely.");
        self.bind(PortIdentity::Remote(link))
    }

    fn return_credit(&self, slots: usize) -> Result<(), Error> {
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |in_flight| {
                in_flight.checked_sub(slots)
            })
            .map_err(|in_flight| {
                Error::Protocol(format!(
                    "credit underflow on {}: {} slots returned, {} in flight",
                    self.qualified, slots, in_flight
                ))
            })?;
        self.owner.trigger();
        Ok(())
    }

    fn describe(&self) -> String {
        format!("[OP-{} ID: {}]", self.capacity, self.name)
    }
}

/// Sending end of a connection.
///
/// Cheap to clone: every clone refers to the same connection.
pub struct OutPort<T, const CAPACITY: usize> {
    inner: Arc<OutPortInner<T>>,
}

impl<T, const CAPACITY: usize> Clone for OutPort<T, CAPACITY> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Element, const CAPACITY: usize> OutPort<T, CAPACITY> {
    pub(crate) fn new(actor: &str, name: &str, owner: Trigger) -> Self {
        Self {
            inner: Arc::new(OutPortInner {
                name: name.to_owned(),
                qualified: qualified_name(actor, name),
                capacity: CAPACITY,
                owner,
                identity: OnceLock::new(),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    pub(crate) fn as_abstract(&self) -> Arc<dyn AbstractOutPort> {
        self.inner.clone()
    }

    /// Sends `value` to the connected in port.
    ///
    /// A local write enqueues into the reader's channel and triggers the reading actor before
    /// returning. A remote write posts the encoded element and consumes one send slot until the
    /// reader returns the matching credit.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`] before the port is connected, [`Error::NoFreeSpace`] when
    /// [`OutPort::free_capacity`] is zero. Nothing is written in either case.
    pub fn write(&self, value: T) -> Result<(), Error> {
        let inner = &self.inner;
        match inner.identity()? {
            PortIdentity::Local(link) => {
                let mut channel = lock(&link.channel);
                if channel.is_full() {
                    return Err(Error::NoFreeSpace(inner.qualified.clone()));
                }
                channel.enqueue(value)?;
                link.owner.trigger();
                Ok(())
            }
            PortIdentity::Remote(link) => {
                let payload = bincode::serialize(&value)?;
                inner
                    .in_flight
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |in_flight| {
                        (in_flight < inner.capacity).then_some(in_flight + 1)
                    })
                    .map_err(|_| Error::NoFreeSpace(inner.qualified.clone()))?;
                let tag = link.endpoint().tag;
                if let Err(e) = link.post(Envelope::Data { tag, payload }) {
                    inner.in_flight.fetch_sub(1, Ordering::AcqRel);
                    return Err(e);
                }
                Ok(())
            }
        }
    }

    /// Number of elements that can be written right now. Zero while not connected.
    pub fn free_capacity(&self) -> usize {
        self.inner.free_capacity()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    /// Rank and tag of the reader when it lives on another rank.
    pub fn peer(&self) -> Option<RemoteEndpoint> {
        self.inner.identity.get().and_then(PortIdentity::endpoint)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn capacity(&self) -> usize {
        CAPACITY
    }
}

impl<T, const CAPACITY: usize> Debug for OutPort<T, CAPACITY> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutPort")
            .field("name", &self.inner.qualified)
            .field("capacity", &CAPACITY)
            .finish()
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{
        runtime::{LocalCallback, Runtime},
        transport::LocalCluster,
    };

    fn connect_local<T: Element, const N: usize>(
        out: &OutPort<T, N>,
        input: &InPort<T, N>,
    ) {
        out.as_abstract()
            .bind_local(input.as_abstract().local_link())
            .unwrap();
        input
            .as_abstract()
            .bind_local(out.as_abstract().qualified_name(), out.as_abstract().owner())
            .unwrap();
    }

    /// Moves every data and credit envelope waiting for `runtime` into its callback queue.
    fn pump(runtime: &Runtime) {
        while let Some(delivery) = runtime.receive().unwrap() {
            let callback = match delivery.envelope {
                Envelope::Data { tag, payload } => LocalCallback::Deliver {
                    tag,
                    payload,
                    responder: delivery.responder,
                },
                Envelope::Credit { tag, slots } => LocalCallback::Credit {
                    tag,
                    slots,
                    responder: delivery.responder,
                },
                other => panic!("unexpected envelope {:?}", other),
            };
            runtime.schedule(callback);
        }
    }

    #[test]
    fn test_local_write_triggers_reader() {
        let reader = Trigger::default();
        let out = OutPort::<u32, 2>::new("A", "out", Trigger::default());
        let input = InPort::<u32, 2>::new("B", "in", reader.clone());
        connect_local(&out, &input);

        assert_eq!(out.free_capacity(), 2);
        out.write(10).unwrap();
        assert_eq!(reader.pending(), 1);
        out.write(11).unwrap();
        assert_eq!(reader.pending(), 2);
        assert_eq!(out.free_capacity(), 0);
        assert_eq!(input.available(), 2);

        assert_eq!(input.peek(), Ok(10));
        assert_eq!(input.read(), Ok(10));
        assert_eq!(input.read(), Ok(11));
        assert_eq!(input.read(), Err(Error::ChannelEmpty));
        assert!(out.peer().is_none());
    }

    #[test]
    fn test_local_read_triggers_writer() {
        let writer = Trigger::default();
        let out = OutPort::<u32, 1>::new("A", "out", writer.clone());
        let input = InPort::<u32, 1>::new("B", "in", Trigger::default());
        connect_local(&out, &input);

        out.write(1).unwrap();
        assert_eq!(out.free_capacity(), 0);
        assert_eq!(writer.pending(), 0);

        assert_eq!(input.read(), Ok(1));
        assert_eq!(out.free_capacity(), 1);
        assert_eq!(writer.pending(), 1);

        // Nothing was freed.
        assert_eq!(input.read(), Err(Error::ChannelEmpty));
        assert_eq!(writer.pending(), 1);
    }

    #[test]
    fn test_element_types() {
        let out = OutPort::<f32, 1>::new("A", "out", Trigger::default());
        let input = InPort::<u32, 1>::new("B", "in", Trigger::default());
        assert_eq!(out.as_abstract().element_type(), "f32");
        assert_eq!(input.as_abstract().element_type(), "u32");
    }

    #[test]
    fn test_full_port_rejects_without_losing_data() {
        let out = OutPort::<u8, 1>::new("A", "out", Trigger::default());
        let input = InPort::<u8, 1>::new("B", "in", Trigger::default());
        connect_local(&out, &input);

        out.write(1).unwrap();
        assert_eq!(out.write(2), Err(Error::NoFreeSpace("A.out".to_owned())));
        assert_eq!(input.read(), Ok(1));
        assert_eq!(input.available(), 0);
    }

    #[test]
    fn test_unconnected_ports() {
        let out = OutPort::<u8, 1>::new("A", "out", Trigger::default());
        let input = InPort::<u8, 1>::new("B", "in", Trigger::default());
        assert_eq!(out.free_capacity(), 0);
        assert_eq!(out.write(1), Err(Error::NotConnected("A.out".to_owned())));
        assert_eq!(input.read(), Err(Error::NotConnected("B.in".to_owned())));
    }

    #[test]
    fn test_rebinding_is_rejected() {
        let out = OutPort::<u8, 1>::new("A", "out", Trigger::default());
        let input = InPort::<u8, 1>::new("B", "in", Trigger::default());
        let other = InPort::<u8, 1>::new("C", "in", Trigger::default());
        connect_local(&out, &input);

        let error = out
            .as_abstract()
            .bind_local(other.as_abstract().local_link())
            .unwrap_err();
        assert_eq!(error, Error::AlreadyConnected("A.out".to_owned()));

        // The original binding is untouched.
        out.write(3).unwrap();
        assert_eq!(input.read(), Ok(3));
        assert_eq!(other.available(), 0);
    }

    #[test]
    fn test_type_and_capacity_mismatch() {
        let out = OutPort::<u8, 2>::new("A", "out", Trigger::default());
        let floats = InPort::<f32, 2>::new("B", "in", Trigger::default());
        let small = InPort::<u8, 1>::new("C", "in", Trigger::default());

        assert_eq!(
            out.as_abstract()
                .bind_local(floats.as_abstract().local_link())
                .unwrap_err(),
            Error::TypeMismatch("A.out".to_owned())
        );
        assert_eq!(
            out.as_abstract()
                .bind_local(small.as_abstract().local_link())
                .unwrap_err(),
            Error::CapacityMismatch {
                port: "C.in".to_owned(),
                expected: 2,
                found: 1
            }
        );
        assert!(!out.is_connected());
    }

    #[test]
    fn test_describe() {
        let out = OutPort::<u8, 3>::new("A", "out", Trigger::default());
        let input = InPort::<u8, 5>::new("A", "in", Trigger::default());
        assert_eq!(out.as_abstract().describe(), "[OP-3 ID: out]");
        assert_eq!(input.as_abstract().describe(), "[IP-5 ID: in]");
    }

    #[test]
    fn test_remote_credit_flow() {
        let mut ranks = LocalCluster::create(2);
        let reader_rt = Runtime::new(ranks.pop().unwrap());
        let writer_rt = Runtime::new(ranks.pop().unwrap());

        let writer = Trigger::default();
        let reader = Trigger::default();
        let out = OutPort::<i64, 2>::new("A", "out", writer.clone());
        let input = InPort::<i64, 2>::new("B", "in", reader.clone());
        let tag = input.as_abstract().tag();

        out.as_abstract()
            .bind_remote(RemoteLink::new(
                RemoteEndpoint { rank: 1, tag },
                writer_rt.clone(),
            ))
            .unwrap();
        writer_rt.register_outbound(tag, out.as_abstract()).unwrap();
        input
            .as_abstract()
            .bind_remote(RemoteLink::new(
                RemoteEndpoint { rank: 0, tag },
                reader_rt.clone(),
            ))
            .unwrap();
        reader_rt.register_inbound(tag, input.as_abstract()).unwrap();

        out.write(-1).unwrap();
        out.write(-2).unwrap();
        assert_eq!(out.free_capacity(), 0);
        assert!(matches!(out.write(-3), Err(Error::NoFreeSpace(_))));
        assert_eq!(writer_rt.rpcs_in_flight(), 2);

        pump(&reader_rt);
        assert_eq!(reader_rt.lpcs_in_flight(), 2);
        // Reading applies the received deliveries first.
        assert_eq!(input.read(), Ok(-1));
        assert_eq!(reader_rt.lpcs_in_flight(), 0);
        assert_eq!(reader.pending(), 2);
        assert_eq!(input.available(), 1);

        assert_eq!(writer_rt.poll_completions().unwrap(), 2);
        pump(&writer_rt);
        writer_rt.run_local_callbacks().unwrap();
        assert_eq!(out.free_capacity(), 1);
        assert_eq!(writer.pending(), 1);
        assert_eq!(out.peer(), Some(RemoteEndpoint { rank: 1, tag }));

        assert_eq!(input.read(), Ok(-2));
        assert_eq!(reader_rt.poll_completions().unwrap(), 1);
        pump(&writer_rt);
        writer_rt.run_local_callbacks().unwrap();
        assert_eq!(out.free_capacity(), 2);
    }

    #[test]
    fn test_credit_underflow_is_protocol_error() {
        let mut ranks = LocalCluster::create(2);
        let _peer = ranks.pop().unwrap();
        let runtime = Runtime::new(ranks.pop().unwrap());
        let out = OutPort::<u8, 1>::new("A", "out", Trigger::default());
        out.as_abstract()
            .bind_remote(RemoteLink::new(RemoteEndpoint { rank: 1, tag: 9 }, runtime))
            .unwrap();
        assert!(matches!(
            out.as_abstract().return_credit(1),
            Err(Error::Protocol(_))
        ));
    }
}
