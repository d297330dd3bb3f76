//! Single-threaded readiness reactor.
//!
//! The reactor owns a table of registrations and a FIFO ready queue. A
//! transport raises a [`Signal`] whenever a registered socket's internal
//! state may have changed; raises are coalesced per registration until the
//! next dispatch. [`Reactor::turn`] drains the ready queue and invokes each
//! registration's handler, which is where the bridge re-validates true
//! message-level readiness.
//!
//! Registration and unregistration are idempotent and safe to call from
//! within a dispatch callback. Dropping a [`Registration`] unregisters it.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use tracing::instrument;

use crate::transport::Readiness;

/// Receiver of coarse readiness dispatches.
///
/// Implementors re-validate actual readiness themselves; a dispatch only
/// means "something may have changed".
pub trait ReadyHandler {
    /// Called once per coalesced signal raise during [`Reactor::turn`].
    fn on_ready(&self);
}

struct Entry {
    handler: Weak<dyn ReadyHandler>,
    interest: Readiness,
    queued: bool,
}

#[derive(Default)]
struct ReactorInner {
    next_id: u64,
    entries: HashMap<u64, Entry>,
    ready: VecDeque<u64>,
}

/// Handle to the readiness-dispatch loop for one scheduler instance.
///
/// Cloning shares the same loop. The reactor never blocks: [`Reactor::turn`]
/// dispatches whatever is pending and returns, and [`Reactor::run`] is a
/// cooperative pump that turns and yields.
#[derive(Clone, Default)]
pub struct Reactor {
    inner: Rc<RefCell<ReactorInner>>,
}

/// An active registration token.
///
/// The registration stays armed for as long as the token lives; dropping it
/// (or calling [`Reactor::unregister`]) disarms it.
pub struct Registration {
    inner: Weak<RefCell<ReactorInner>>,
    id: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(cell) = self.inner.upgrade() {
            cell.borrow_mut().entries.remove(&self.id);
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration").field("id", &self.id).finish()
    }
}

/// Edge notification handle raised by a transport on state changes.
///
/// Raising is cheap and coalesced: raising an already-queued registration is
/// a no-op, and raising after unregistration is a no-op.
#[derive(Clone)]
pub struct Signal {
    inner: Weak<RefCell<ReactorInner>>,
    id: u64,
}

impl Signal {
    /// Queues the owning registration for dispatch on the next turn.
    pub fn raise(&self) {
        let Some(cell) = self.inner.upgrade() else {
            return;
        };
        let mut guard = cell.borrow_mut();
        let inner = &mut *guard;
        if let Some(entry) = inner.entries.get_mut(&self.id) {
            if !entry.queued {
                entry.queued = true;
                inner.ready.push_back(self.id);
                tracing::trace!(id = self.id, "readiness signal raised");
            }
        }
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal").field("id", &self.id).finish()
    }
}

impl Reactor {
    /// Creates a new, empty reactor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler with the given interest mask.
    ///
    /// The handler is held weakly; a dispatch to a dropped handler is
    /// silently skipped.
    pub fn register(&self, handler: Weak<dyn ReadyHandler>, interest: Readiness) -> Registration {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.insert(
            id,
            Entry {
                handler,
                interest,
                queued: false,
            },
        );
        tracing::debug!(id, ?interest, "registered readiness interest");
        Registration {
            inner: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Creates the signal a transport raises for `registration`.
    pub fn signal(&self, registration: &Registration) -> Signal {
        Signal {
            inner: Rc::downgrade(&self.inner),
            id: registration.id,
        }
    }

    /// Removes a registration. Idempotent; safe from within a dispatch.
    pub fn unregister(&self, registration: &Registration) {
        self.inner.borrow_mut().entries.remove(&registration.id);
    }

    /// Number of currently armed registrations.
    pub fn registered_count(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Number of registrations queued for dispatch.
    pub fn pending(&self) -> usize {
        self.inner.borrow().ready.len()
    }

    /// Dispatches every registration queued at this point, including any
    /// re-queued by the handlers themselves. Returns the dispatch count.
    #[instrument(skip(self))]
    pub fn turn(&self) -> usize {
        let mut dispatched = 0;
        loop {
            // Pop under the borrow, dispatch outside it: handlers are free
            // to raise signals or (un)register while they run.
            let handler = {
                let mut guard = self.inner.borrow_mut();
                let inner = &mut *guard;
                let Some(id) = inner.ready.pop_front() else {
                    break;
                };
                match inner.entries.get_mut(&id) {
                    Some(entry) => {
                        entry.queued = false;
                        tracing::trace!(id, interest = ?entry.interest, "dispatching readiness");
                        entry.handler.clone()
                    }
                    // Unregistered while queued.
                    None => continue,
                }
            };
            if let Some(handler) = handler.upgrade() {
                handler.on_ready();
                dispatched += 1;
            }
        }
        dispatched
    }

    /// Cooperative pump: turns, then yields to the scheduler, forever.
    ///
    /// Spawn this on the executor driving the sockets and abort it when the
    /// workload completes.
    pub async fn run(&self) {
        loop {
            self.turn();
            tokio::task::yield_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        hits: RefCell<usize>,
    }

    impl ReadyHandler for Counter {
        fn on_ready(&self) {
            *self.hits.borrow_mut() += 1;
        }
    }

    #[test]
    fn raise_is_coalesced_until_dispatch() {
        let reactor = Reactor::new();
        let counter = Rc::new(Counter {
            hits: RefCell::new(0),
        });
        let registration =
            reactor.register(Rc::downgrade(&counter) as Weak<dyn ReadyHandler>, Readiness::BOTH);
        let signal = reactor.signal(&registration);

        signal.raise();
        signal.raise();
        signal.raise();
        assert_eq!(reactor.pending(), 1);
        assert_eq!(reactor.turn(), 1);
        assert_eq!(*counter.hits.borrow(), 1);

        // A fresh raise after dispatch queues again.
        signal.raise();
        assert_eq!(reactor.turn(), 1);
        assert_eq!(*counter.hits.borrow(), 2);
    }

    #[test]
    fn unregister_is_idempotent_and_drops_queued_dispatch() {
        let reactor = Reactor::new();
        let counter = Rc::new(Counter {
            hits: RefCell::new(0),
        });
        let registration =
            reactor.register(Rc::downgrade(&counter) as Weak<dyn ReadyHandler>, Readiness::BOTH);
        let signal = reactor.signal(&registration);

        signal.raise();
        reactor.unregister(&registration);
        reactor.unregister(&registration);
        assert_eq!(reactor.registered_count(), 0);
        assert_eq!(reactor.turn(), 0);
        assert_eq!(*counter.hits.borrow(), 0);

        // Raising a dead registration is a no-op.
        signal.raise();
        assert_eq!(reactor.turn(), 0);
    }

    #[test]
    fn dropping_registration_disarms() {
        let reactor = Reactor::new();
        let counter = Rc::new(Counter {
            hits: RefCell::new(0),
        });
        let registration =
            reactor.register(Rc::downgrade(&counter) as Weak<dyn ReadyHandler>, Readiness::BOTH);
        assert_eq!(reactor.registered_count(), 1);
        drop(registration);
        assert_eq!(reactor.registered_count(), 0);
    }
}
