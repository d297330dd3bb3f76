//! Socket factory and lifecycle owner.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::bridge::SocketCore;
use crate::error::{SocketError, SocketResult};
use crate::reactor::Reactor;
use crate::socket::Socket;
use crate::transport::inproc::InprocTransport;
use crate::transport::{SocketKind, Transport};

/// A context created over the in-process transport.
pub type InprocContext = Context<InprocTransport>;

struct ContextInner<T: Transport> {
    transport: T,
    reactor: Reactor,
    sockets: RefCell<Vec<Weak<SocketCore<T::Socket>>>>,
    terminated: Cell<bool>,
}

/// Owner of a native messaging resource and factory for sockets.
///
/// A context pairs the native transport handle with the reactor instance
/// that will drive readiness for every socket it creates. Terminating the
/// context (explicitly or by dropping it) closes all of them; sockets
/// cannot be created afterwards.
pub struct Context<T: Transport> {
    inner: Rc<ContextInner<T>>,
}

impl Context<InprocTransport> {
    /// Creates a context over the in-process transport.
    ///
    /// `io_threads` is the native I/O worker-thread count, recorded at
    /// creation the way a native transport would spawn its pool.
    pub fn new(io_threads: usize) -> Self {
        Self::with_transport(InprocTransport::new(io_threads))
    }
}

impl<T: Transport> Context<T> {
    /// Creates a context over an explicit transport handle.
    pub fn with_transport(transport: T) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                transport,
                reactor: Reactor::new(),
                sockets: RefCell::new(Vec::new()),
                terminated: Cell::new(false),
            }),
        }
    }

    /// Opens a new socket of the given kind.
    pub fn socket(&self, kind: SocketKind) -> SocketResult<Socket<T>> {
        if self.inner.terminated.get() {
            return Err(SocketError::Terminated);
        }
        let native = self.inner.transport.open(kind)?;
        let core = SocketCore::new(native, kind, self.inner.reactor.clone());
        self.inner.sockets.borrow_mut().push(Rc::downgrade(&core));
        Ok(Socket::new(core))
    }

    /// The reactor driving readiness for this context's sockets.
    pub fn reactor(&self) -> Reactor {
        self.inner.reactor.clone()
    }

    /// Native I/O worker-thread count configured at creation.
    pub fn io_threads(&self) -> usize {
        self.inner.transport.io_threads()
    }

    /// Creates a second context over the same native resource, for driving
    /// from an independent scheduler instance.
    ///
    /// The native transport is shared by refcount; reactor registrations
    /// are per scheduler, so the duplicate gets a fresh reactor and its own
    /// bookkeeping. The native resource is released when the last sharing
    /// context drops, from whichever side that happens.
    pub fn duplicate(&self) -> Context<T> {
        tracing::debug!("duplicating context");
        Context {
            inner: Rc::new(ContextInner {
                transport: self.inner.transport.clone(),
                reactor: Reactor::new(),
                sockets: RefCell::new(Vec::new()),
                terminated: Cell::new(false),
            }),
        }
    }

    /// Terminates the context: every socket created from it is closed
    /// (resuming its suspended callers with [`SocketError::Closed`]) and
    /// further socket creation fails with [`SocketError::Terminated`].
    /// Idempotent.
    pub fn terminate(&self) {
        if self.inner.terminated.replace(true) {
            return;
        }
        let sockets: Vec<_> = self.inner.sockets.borrow_mut().drain(..).collect();
        for weak in sockets {
            if let Some(core) = weak.upgrade() {
                core.close();
            }
        }
        tracing::debug!("context terminated");
    }

    /// Whether the context has been terminated.
    pub fn is_terminated(&self) -> bool {
        self.inner.terminated.get()
    }
}

impl<T: Transport> Drop for ContextInner<T> {
    fn drop(&mut self) {
        // Explicit terminate and drop converge on the same close logic.
        for weak in self.sockets.borrow_mut().drain(..) {
            if let Some(core) = weak.upgrade() {
                core.close();
            }
        }
    }
}

impl<T: Transport> std::fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("io_threads", &self.io_threads())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}
