//! In-process pair transport.
//!
//! A registry of named endpoints pairs sockets one-to-one: `bind` claims an
//! endpoint, `connect` attaches to it. Each socket owns a bounded inbound
//! pipe of whole messages; a send moves the message directly into the peer's
//! pipe. The pipe capacity is the sender's `SndHwm` plus the receiver's
//! `RcvHwm`, the combined-watermark rule for in-process pipes.
//!
//! Every state change that can affect a peer's readiness (message enqueued,
//! message drained, peer attached or detached) raises the affected socket's
//! installed [`Signal`]. The signal is coarse: receivers re-validate with
//! [`TransportSocket::poll_ready`] before trusting it.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use bytes::Bytes;

use crate::error::{SocketError, SocketResult};
use crate::message::Message;
use crate::options::{OptionId, OptionValue};
use crate::reactor::Signal;
use crate::transport::{
    Direction, Readiness, RecvStatus, SendStatus, SocketKind, Transport, TransportSocket,
};

/// Tuning knobs for the in-process transport.
#[derive(Debug, Clone)]
pub struct InprocConfig {
    /// Default outbound high-water mark for new sockets.
    pub default_snd_hwm: usize,
    /// Default inbound high-water mark for new sockets.
    pub default_rcv_hwm: usize,
}

impl Default for InprocConfig {
    fn default() -> Self {
        Self {
            default_snd_hwm: 1000,
            default_rcv_hwm: 1000,
        }
    }
}

struct TransportInner {
    io_threads: usize,
    config: InprocConfig,
    endpoints: HashMap<String, Weak<RefCell<SocketState>>>,
}

/// Handle to the shared in-process messaging resource.
///
/// Cloning shares the endpoint registry (the "native" resource) by
/// refcount; it is freed when the last clone drops, no matter which side
/// drops it.
#[derive(Clone)]
pub struct InprocTransport {
    inner: Rc<RefCell<TransportInner>>,
}

impl InprocTransport {
    /// Creates a transport with default configuration.
    ///
    /// `io_threads` mirrors the worker-thread count a native transport would
    /// spawn; the in-process transport records it for introspection only.
    pub fn new(io_threads: usize) -> Self {
        Self::with_config(io_threads, InprocConfig::default())
    }

    /// Creates a transport with explicit configuration.
    pub fn with_config(io_threads: usize, config: InprocConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TransportInner {
                io_threads,
                config,
                endpoints: HashMap::new(),
            })),
        }
    }
}

impl Transport for InprocTransport {
    type Socket = InprocSocket;

    fn open(&self, kind: SocketKind) -> SocketResult<Self::Socket> {
        let inner = self.inner.borrow();
        let state = SocketState {
            kind,
            closed: false,
            snd_hwm: inner.config.default_snd_hwm,
            rcv_hwm: inner.config.default_rcv_hwm,
            max_msg_size: -1,
            identity: Bytes::new(),
            extra: HashMap::new(),
            incoming: VecDeque::new(),
            peer: None,
            signal: None,
            bound_endpoint: None,
            last_endpoint: None,
        };
        tracing::debug!(?kind, "opened inproc socket");
        Ok(InprocSocket {
            transport: Rc::clone(&self.inner),
            state: Rc::new(RefCell::new(state)),
        })
    }

    fn io_threads(&self) -> usize {
        self.inner.borrow().io_threads
    }
}

struct SocketState {
    kind: SocketKind,
    closed: bool,
    snd_hwm: usize,
    rcv_hwm: usize,
    max_msg_size: i64,
    identity: Bytes,
    // Pass-through storage for the purely mechanical options.
    extra: HashMap<OptionId, OptionValue>,
    incoming: VecDeque<Message>,
    peer: Option<Weak<RefCell<SocketState>>>,
    signal: Option<Signal>,
    bound_endpoint: Option<String>,
    last_endpoint: Option<String>,
}

impl SocketState {
    fn peer_state(&self) -> Option<Rc<RefCell<SocketState>>> {
        self.peer.as_ref().and_then(Weak::upgrade)
    }
}

fn can_send(kind: SocketKind) -> bool {
    !matches!(kind, SocketKind::Sub | SocketKind::Pull)
}

fn can_recv(kind: SocketKind) -> bool {
    !matches!(kind, SocketKind::Pub | SocketKind::Push)
}

/// One endpoint of an in-process pipe.
pub struct InprocSocket {
    transport: Rc<RefCell<TransportInner>>,
    state: Rc<RefCell<SocketState>>,
}

impl InprocSocket {
    /// Number of messages currently queued in the inbound pipe.
    pub fn inbound_len(&self) -> usize {
        self.state.borrow().incoming.len()
    }

    fn raise(state: &Rc<RefCell<SocketState>>) {
        let signal = state.borrow().signal.clone();
        if let Some(signal) = signal {
            signal.raise();
        }
    }
}

impl TransportSocket for InprocSocket {
    fn kind(&self) -> SocketKind {
        self.state.borrow().kind
    }

    fn bind(&self, endpoint: &str) -> SocketResult<()> {
        {
            let state = self.state.borrow();
            if state.closed {
                return Err(SocketError::Closed);
            }
        }
        let mut transport = self.transport.borrow_mut();
        if let Some(existing) = transport.endpoints.get(endpoint) {
            let live = existing
                .upgrade()
                .is_some_and(|state| !state.borrow().closed);
            if live {
                return Err(SocketError::AddressInUse {
                    endpoint: endpoint.to_string(),
                });
            }
        }
        transport
            .endpoints
            .insert(endpoint.to_string(), Rc::downgrade(&self.state));
        let mut state = self.state.borrow_mut();
        state.bound_endpoint = Some(endpoint.to_string());
        state.last_endpoint = Some(endpoint.to_string());
        tracing::debug!(endpoint, "bound inproc endpoint");
        Ok(())
    }

    fn connect(&self, endpoint: &str) -> SocketResult<()> {
        let target = {
            let transport = self.transport.borrow();
            transport
                .endpoints
                .get(endpoint)
                .and_then(Weak::upgrade)
                .ok_or_else(|| SocketError::AddressNotFound {
                    endpoint: endpoint.to_string(),
                })?
        };
        if Rc::ptr_eq(&target, &self.state) {
            return Err(SocketError::transport("cannot connect a socket to itself"));
        }
        {
            let mut state = self.state.borrow_mut();
            let mut peer = target.borrow_mut();
            if state.closed {
                return Err(SocketError::Closed);
            }
            if peer.closed {
                return Err(SocketError::AddressNotFound {
                    endpoint: endpoint.to_string(),
                });
            }
            if peer.peer_state().is_some() {
                return Err(SocketError::transport("endpoint already has a peer"));
            }
            if state.peer_state().is_some() {
                return Err(SocketError::transport("socket is already connected"));
            }
            state.peer = Some(Rc::downgrade(&target));
            peer.peer = Some(Rc::downgrade(&self.state));
            state.last_endpoint = Some(endpoint.to_string());
        }
        tracing::debug!(endpoint, "connected inproc endpoint");
        // Attachment can create readiness on both sides at once.
        Self::raise(&self.state);
        Self::raise(&target);
        Ok(())
    }

    fn try_send(&self, message: Message) -> SendStatus {
        let peer = {
            let state = self.state.borrow();
            if state.closed {
                return SendStatus::Failed(SocketError::Closed);
            }
            if !can_send(state.kind) {
                return SendStatus::Failed(SocketError::transport(format!(
                    "{:?} sockets cannot send",
                    state.kind
                )));
            }
            if state.max_msg_size >= 0 && message.len() as i64 > state.max_msg_size {
                return SendStatus::Failed(SocketError::transport(format!(
                    "message of {} bytes exceeds maximum size {}",
                    message.len(),
                    state.max_msg_size
                )));
            }
            match state.peer_state() {
                // No peer attached: the send cannot complete yet.
                None => return SendStatus::Full(message),
                Some(peer) => peer,
            }
        };
        {
            let snd_hwm = self.state.borrow().snd_hwm;
            let mut peer_state = peer.borrow_mut();
            if peer_state.closed {
                return SendStatus::Full(message);
            }
            let capacity = snd_hwm + peer_state.rcv_hwm;
            if peer_state.incoming.len() >= capacity {
                tracing::trace!(capacity, "inproc pipe at high-water mark");
                return SendStatus::Full(message);
            }
            peer_state.incoming.push_back(message);
        }
        Self::raise(&peer);
        SendStatus::Accepted
    }

    fn try_recv(&self) -> RecvStatus {
        let (message, peer) = {
            let mut state = self.state.borrow_mut();
            if state.closed {
                return RecvStatus::Failed(SocketError::Closed);
            }
            if !can_recv(state.kind) {
                return RecvStatus::Failed(SocketError::transport(format!(
                    "{:?} sockets cannot receive",
                    state.kind
                )));
            }
            match state.incoming.pop_front() {
                Some(message) => (message, state.peer_state()),
                None => return RecvStatus::Empty,
            }
        };
        // Draining frees pipe space: the peer may have become writable.
        if let Some(peer) = peer {
            Self::raise(&peer);
        }
        RecvStatus::Received(message)
    }

    fn poll_ready(&self, interest: Readiness) -> Readiness {
        let state = self.state.borrow();
        if state.closed {
            return Readiness::EMPTY;
        }
        let readable =
            interest.contains(Direction::Recv) && can_recv(state.kind) && !state.incoming.is_empty();
        let writable = interest.contains(Direction::Send) && can_send(state.kind)
            && state.peer_state().is_some_and(|peer| {
                let peer = peer.borrow();
                !peer.closed && peer.incoming.len() < state.snd_hwm + peer.rcv_hwm
            });
        Readiness { readable, writable }
    }

    fn install_signal(&self, signal: Signal) {
        self.state.borrow_mut().signal = Some(signal);
    }

    fn clear_signal(&self) {
        self.state.borrow_mut().signal = None;
    }

    fn get_option(&self, id: OptionId) -> SocketResult<OptionValue> {
        let state = self.state.borrow();
        let value = match id {
            OptionId::Type => OptionValue::Int(state.kind.code()),
            // Bit 0: readable, bit 1: writable.
            OptionId::Events => {
                drop(state);
                let ready = self.poll_ready(Readiness::BOTH);
                OptionValue::Int((ready.readable as i32) | ((ready.writable as i32) << 1))
            }
            // No multi-part reassembly in this transport.
            OptionId::ReceiveMore => OptionValue::Bool(false),
            OptionId::LastEndpoint => OptionValue::Bytes(
                state
                    .last_endpoint
                    .as_deref()
                    .map(|endpoint| Bytes::copy_from_slice(endpoint.as_bytes()))
                    .unwrap_or_default(),
            ),
            OptionId::SndHwm => OptionValue::Int(state.snd_hwm as i32),
            OptionId::RcvHwm => OptionValue::Int(state.rcv_hwm as i32),
            OptionId::MaxMsgSize => OptionValue::Long(state.max_msg_size),
            OptionId::Identity => OptionValue::Bytes(state.identity.clone()),
            other => state.extra.get(&other).cloned().unwrap_or(match other.kind() {
                crate::options::OptionKind::Int => OptionValue::Int(0),
                crate::options::OptionKind::Long => OptionValue::Long(0),
                crate::options::OptionKind::Ulong => OptionValue::Ulong(0),
                crate::options::OptionKind::Bool => OptionValue::Bool(false),
                crate::options::OptionKind::Bytes => OptionValue::Bytes(Bytes::new()),
            }),
        };
        Ok(value)
    }

    fn set_option(&self, id: OptionId, value: OptionValue) -> SocketResult<()> {
        let mut state = self.state.borrow_mut();
        match (id, value) {
            (OptionId::SndHwm, OptionValue::Int(v)) => state.snd_hwm = v.max(0) as usize,
            (OptionId::RcvHwm, OptionValue::Int(v)) => state.rcv_hwm = v.max(0) as usize,
            (OptionId::MaxMsgSize, OptionValue::Long(v)) => state.max_msg_size = v,
            (OptionId::Identity, OptionValue::Bytes(v)) => state.identity = v,
            // Subscription filters are accepted and ignored: the in-process
            // transport delivers everything to its single peer.
            (OptionId::Subscribe, OptionValue::Bytes(_))
            | (OptionId::Unsubscribe, OptionValue::Bytes(_)) => {}
            (other, value) => {
                state.extra.insert(other, value);
            }
        }
        Ok(())
    }

    fn close(&self) {
        let (peer, bound) = {
            let mut state = self.state.borrow_mut();
            if state.closed {
                return;
            }
            state.closed = true;
            state.signal = None;
            state.incoming.clear();
            (state.peer.take().and_then(|weak| weak.upgrade()), state.bound_endpoint.take())
        };
        if let Some(peer) = peer {
            peer.borrow_mut().peer = None;
            // The peer's writability just vanished; let its bridge re-validate.
            Self::raise(&peer);
        }
        if let Some(endpoint) = bound {
            self.transport.borrow_mut().endpoints.remove(&endpoint);
        }
        tracing::debug!("closed inproc socket");
    }
}
