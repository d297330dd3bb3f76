//! The native message-bus interface.
//!
//! The bridge is written against these traits rather than a concrete
//! library: a transport supplies non-blocking send/receive primitives, a
//! zero-timeout readiness poll keyed by a direction mask, typed option
//! pass-through, and an edge signal it raises whenever the socket's internal
//! state may have changed. Readiness signals are coarse: a raised signal
//! proves "something changed", not "a message can now move". That is why
//! the bridge always re-validates with [`TransportSocket::poll_ready`].

use crate::error::SocketResult;
use crate::message::Message;
use crate::options::{OptionId, OptionValue};
use crate::reactor::Signal;

pub mod inproc;

/// One direction of transfer on a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Moving a message into the socket's outbound pipe.
    Send,
    /// Moving a message out of the socket's inbound pipe.
    Recv,
}

/// A readiness mask over the two transfer directions.
///
/// Used both as an interest mask (what to poll for) and as a poll result
/// (what is truly ready at message level, right now).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    /// A message can be dequeued without blocking.
    pub readable: bool,
    /// A message can be enqueued without blocking.
    pub writable: bool,
}

impl Readiness {
    /// Neither direction ready.
    pub const EMPTY: Readiness = Readiness {
        readable: false,
        writable: false,
    };

    /// Interest in both directions.
    ///
    /// The transport multiplexes send- and receive-readiness onto a single
    /// coarse signal, so registrations always carry both interests and the
    /// zero-timeout poll disambiguates.
    pub const BOTH: Readiness = Readiness {
        readable: true,
        writable: true,
    };

    /// Whether the mask covers the given direction.
    pub fn contains(self, direction: Direction) -> bool {
        match direction {
            Direction::Recv => self.readable,
            Direction::Send => self.writable,
        }
    }

    /// Whether any direction is set.
    pub fn any(self) -> bool {
        self.readable || self.writable
    }
}

/// Socket kinds understood by the transport.
///
/// The bridge attaches the same semantics to all of them: kind-specific
/// routing behavior (fan-out, request matching) belongs to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketKind {
    /// Exclusive pair.
    Pair,
    /// Publish side of pub/sub.
    Pub,
    /// Subscribe side of pub/sub.
    Sub,
    /// Request side of req/rep.
    Req,
    /// Reply side of req/rep.
    Rep,
    /// Asynchronous request routing.
    Dealer,
    /// Asynchronous reply routing.
    Router,
    /// Fan-out pipeline upstream.
    Push,
    /// Fan-in pipeline downstream.
    Pull,
}

impl SocketKind {
    /// The wire-level kind code, as reported by the `Type` option.
    pub fn code(self) -> i32 {
        match self {
            SocketKind::Pair => 0,
            SocketKind::Pub => 1,
            SocketKind::Sub => 2,
            SocketKind::Req => 3,
            SocketKind::Rep => 4,
            SocketKind::Dealer => 5,
            SocketKind::Router => 6,
            SocketKind::Pull => 7,
            SocketKind::Push => 8,
        }
    }
}

/// Result of one non-blocking send primitive.
#[derive(Debug)]
pub enum SendStatus {
    /// The message was accepted into the outbound pipe; ownership
    /// transferred.
    Accepted,
    /// The pipe is at its high-water mark or no peer is attached; the
    /// message is handed back untouched.
    Full(Message),
    /// The transfer failed for a reason other than would-block.
    Failed(crate::error::SocketError),
}

/// Result of one non-blocking receive primitive.
#[derive(Debug)]
pub enum RecvStatus {
    /// A message was dequeued; ownership transferred to the caller.
    Received(Message),
    /// No message is available.
    Empty,
    /// The transfer failed for a reason other than would-block.
    Failed(crate::error::SocketError),
}

/// A handle to a native messaging resource that can open sockets.
///
/// Cloning shares the underlying native resource (reference-counted); the
/// resource is released when the last clone drops. This is what context
/// duplication across independent reactors builds on.
pub trait Transport: Clone {
    /// The socket type this transport produces.
    type Socket: TransportSocket;

    /// Opens a new socket of the given kind.
    fn open(&self, kind: SocketKind) -> SocketResult<Self::Socket>;

    /// Number of native I/O worker threads configured at creation.
    fn io_threads(&self) -> usize;
}

/// One native message-queue socket endpoint.
///
/// All methods are non-blocking and run on the single reactor thread; the
/// transport never suspends a caller.
pub trait TransportSocket: 'static {
    /// The kind this socket was opened as.
    fn kind(&self) -> SocketKind;

    /// Accepts incoming peers at an endpoint. Synchronous.
    fn bind(&self, endpoint: &str) -> SocketResult<()>;

    /// Attaches to a bound endpoint. Synchronous.
    fn connect(&self, endpoint: &str) -> SocketResult<()>;

    /// Attempts to enqueue a message without blocking.
    fn try_send(&self, message: Message) -> SendStatus;

    /// Attempts to dequeue a message without blocking.
    fn try_recv(&self) -> RecvStatus;

    /// Zero-timeout poll of true message-level readiness, masked by
    /// `interest`. Returns immediately; never waits.
    fn poll_ready(&self, interest: Readiness) -> Readiness;

    /// Installs the edge signal to raise on internal state changes.
    fn install_signal(&self, signal: Signal);

    /// Removes a previously installed signal.
    fn clear_signal(&self);

    /// Reads a typed option value. Callers have already validated access
    /// and kind against the registry.
    fn get_option(&self, id: OptionId) -> SocketResult<OptionValue>;

    /// Writes a typed option value. Callers have already validated access
    /// and kind against the registry.
    fn set_option(&self, id: OptionId, value: OptionValue) -> SocketResult<()>;

    /// Releases the native socket. Idempotent.
    fn close(&self);
}
