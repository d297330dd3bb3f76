//! The socket handle exposed to callers.

use std::rc::Rc;

use crate::bridge::{RecvFuture, SendFuture, SocketCore};
use crate::error::SocketResult;
use crate::message::Message;
use crate::options::{self, OptionId, OptionValue};
use crate::transport::{Direction, SocketKind, Transport, TransportSocket};

/// One message-queue endpoint.
///
/// Handles are cheap to clone and share one underlying socket; the socket
/// closes when explicitly asked to or when the last reference to it goes
/// away, and both paths produce identical observable state.
///
/// `send` and `recv` look blocking but are not: on a full or empty pipe the
/// returned future suspends only the calling context while the reactor
/// keeps servicing everything else.
pub struct Socket<T: Transport> {
    core: Rc<SocketCore<T::Socket>>,
}

impl<T: Transport> Clone for Socket<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: Transport> Socket<T> {
    pub(crate) fn new(core: Rc<SocketCore<T::Socket>>) -> Self {
        Self { core }
    }

    /// The kind this socket was opened as.
    pub fn kind(&self) -> SocketKind {
        self.core.kind()
    }

    /// Whether the socket is still open.
    pub fn is_open(&self) -> bool {
        self.core.is_open()
    }

    /// Accepts peers at an endpoint. Synchronous; never suspends.
    pub fn bind(&self, endpoint: &str) -> SocketResult<()> {
        self.core.with_socket(|socket| socket.bind(endpoint))
    }

    /// Attaches to a bound endpoint. Synchronous; never suspends.
    pub fn connect(&self, endpoint: &str) -> SocketResult<()> {
        self.core.with_socket(|socket| socket.connect(endpoint))
    }

    /// Sends a message, suspending the calling context if the outbound
    /// pipe is at its high-water mark. On success the payload's ownership
    /// has transferred to the transport.
    pub fn send(&self, message: impl Into<Message>) -> SendFuture<T::Socket> {
        SendFuture::new(Rc::clone(&self.core), message.into())
    }

    /// Receives the next message, suspending the calling context while the
    /// inbound pipe is empty.
    pub fn recv(&self) -> RecvFuture<T::Socket> {
        RecvFuture::new(Rc::clone(&self.core))
    }

    /// Closes the socket. Idempotent; every context suspended on this
    /// socket resumes with [`crate::SocketError::Closed`].
    pub fn close(&self) {
        self.core.close();
    }

    /// Number of contexts currently suspended on the given direction.
    pub fn waiting(&self, direction: Direction) -> usize {
        self.core.waiting(direction)
    }

    /// Reads a socket option, validated against the static registry.
    pub fn get_option(&self, id: OptionId) -> SocketResult<OptionValue> {
        options::validate_get(id)?;
        self.core.with_socket(|socket| socket.get_option(id))
    }

    /// Writes a socket option, validated against the static registry.
    pub fn set_option(&self, id: OptionId, value: OptionValue) -> SocketResult<()> {
        options::validate_set(id, &value)?;
        self.core.with_socket(|socket| socket.set_option(id, value))
    }
}

impl<T: Transport> std::fmt::Debug for Socket<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Socket")
            .field("kind", &self.kind())
            .field("open", &self.is_open())
            .finish()
    }
}
