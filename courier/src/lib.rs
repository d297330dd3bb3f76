//! # Courier
//!
//! Blocking-style messaging over non-blocking queue sockets on a
//! single-threaded cooperative reactor.
//!
//! A [`Context`] opens [`Socket`]s over a [`Transport`]. Calling
//! [`Socket::send`] or [`Socket::recv`] attempts the transfer immediately;
//! if it would block, only the calling context suspends: it is parked in a
//! FIFO wait queue while the socket registers readiness interest with the
//! [`Reactor`]. When the transport signals, the bridge re-validates true
//! message-level readiness with a zero-timeout poll and resumes waiters in
//! strict FIFO order, each with its own result.
//!
//! The crate ships an in-process transport ([`InprocTransport`]) with named
//! endpoints and bounded, high-water-marked pipes; other transports plug in
//! through the [`Transport`] and [`TransportSocket`] traits.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Readiness bridge: wait queues, transfer attempts, send/recv futures.
mod bridge;
/// Socket factory and lifecycle owner.
pub mod context;
/// Error types and result aliases.
pub mod error;
/// Opaque message payloads.
pub mod message;
/// Static socket-option registry and typed option values.
pub mod options;
/// Single-threaded readiness reactor.
pub mod reactor;
/// Socket handles.
pub mod socket;
/// Transport traits and the in-process implementation.
pub mod transport;

/// Commonly used types, importable in one line.
pub mod prelude;

// Public API exports
pub use bridge::{RecvFuture, SendFuture};
pub use context::{Context, InprocContext};
pub use error::{SocketError, SocketResult};
pub use message::Message;
pub use options::{OptionAccess, OptionId, OptionKind, OptionValue};
pub use reactor::{Reactor, ReadyHandler, Registration, Signal};
pub use socket::Socket;
pub use transport::inproc::{InprocConfig, InprocTransport};
pub use transport::{Direction, Readiness, SocketKind, Transport, TransportSocket};
