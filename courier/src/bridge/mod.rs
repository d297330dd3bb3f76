//! The readiness bridge.
//!
//! Callers issue what look like blocking send/receive calls; the bridge
//! turns them into non-blocking attempts against the native socket. An
//! attempt that would block suspends exactly the calling context: the
//! caller is captured in a FIFO wait queue for its direction and the socket
//! is registered with the reactor. When the transport signals readiness,
//! the bridge re-validates with a zero-timeout poll, since the coarse
//! signal does not correspond 1:1 to message-level readiness, and then
//! drains each truly-ready queue head-first, performing the transfer on
//! the waiter's behalf and resuming it with the result.
//!
//! Per (socket, direction) the bridge moves between three states: Idle
//! (queue empty, no registration), Watching (queue non-empty, registration
//! armed), and the transient Dispatching inside the readiness callback.
//! One registration is shared by both directions because the transport
//! multiplexes their readiness onto a single coarse signal.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

use tracing::instrument;

use crate::error::{SocketError, SocketResult};
use crate::message::Message;
use crate::reactor::{Reactor, ReadyHandler, Registration};
use crate::transport::{Direction, Readiness, SocketKind, TransportSocket};

pub(crate) mod transfer;
pub(crate) mod wait_queue;

use transfer::{attempt, Attempt, Op};
use wait_queue::{WaitQueue, Waiter, WaiterCell};

struct BridgeState<S> {
    kind: SocketKind,
    /// `None` once closed. The native reference is never touched again
    /// after the transition.
    socket: Option<S>,
    send_waiters: WaitQueue,
    recv_waiters: WaitQueue,
    /// Armed iff `send_waiters` or `recv_waiters` is non-empty.
    registration: Option<Registration>,
}

impl<S> BridgeState<S> {
    fn queue_mut(&mut self, direction: Direction) -> &mut WaitQueue {
        match direction {
            Direction::Send => &mut self.send_waiters,
            Direction::Recv => &mut self.recv_waiters,
        }
    }
}

enum RequestOutcome {
    Ready(SocketResult<Option<Message>>),
    Suspended(WaiterCell),
}

/// Shared per-socket bridge state: the native socket, the two wait queues,
/// and the reactor registration.
pub(crate) struct SocketCore<S: TransportSocket> {
    reactor: Reactor,
    state: RefCell<BridgeState<S>>,
}

impl<S: TransportSocket> SocketCore<S> {
    pub(crate) fn new(socket: S, kind: SocketKind, reactor: Reactor) -> Rc<Self> {
        Rc::new(Self {
            reactor,
            state: RefCell::new(BridgeState {
                kind,
                socket: Some(socket),
                send_waiters: WaitQueue::default(),
                recv_waiters: WaitQueue::default(),
                registration: None,
            }),
        })
    }

    pub(crate) fn kind(&self) -> SocketKind {
        self.state.borrow().kind
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state.borrow().socket.is_some()
    }

    /// Number of contexts suspended on the given direction.
    pub(crate) fn waiting(&self, direction: Direction) -> usize {
        let state = self.state.borrow();
        match direction {
            Direction::Send => state.send_waiters.len(),
            Direction::Recv => state.recv_waiters.len(),
        }
    }

    /// Runs `f` against the native socket, failing fast if closed.
    pub(crate) fn with_socket<R>(
        &self,
        f: impl FnOnce(&S) -> SocketResult<R>,
    ) -> SocketResult<R> {
        let state = self.state.borrow();
        match state.socket.as_ref() {
            Some(socket) => f(socket),
            None => Err(SocketError::Closed),
        }
    }

    /// One blocking-style request: fast path or suspension.
    fn request(core: &Rc<Self>, op: Op, waker: &Waker) -> RequestOutcome {
        let mut state = core.state.borrow_mut();
        let direction = op.direction();
        let Some(socket) = state.socket.as_ref() else {
            return RequestOutcome::Ready(Err(SocketError::Closed));
        };
        match attempt(socket, op) {
            // Fast path: returns synchronously, never touches the reactor.
            Attempt::Fulfilled(value) => RequestOutcome::Ready(Ok(value)),
            Attempt::Failed(error) => RequestOutcome::Ready(Err(error)),
            Attempt::WouldBlock(payload) => {
                let waiter = Rc::new(RefCell::new(Waiter::new(
                    direction,
                    payload,
                    waker.clone(),
                )));
                state.queue_mut(direction).push_tail(Rc::clone(&waiter));
                Self::arm(core, &mut state);
                tracing::debug!(
                    ?direction,
                    queued = state.queue_mut(direction).len(),
                    "caller suspended"
                );
                RequestOutcome::Suspended(waiter)
            }
        }
    }

    /// Idle → Watching: register shared interest in both directions.
    fn arm(core: &Rc<Self>, state: &mut BridgeState<S>) {
        if state.registration.is_some() {
            return;
        }
        let Some(socket) = state.socket.as_ref() else {
            return;
        };
        let strong: Rc<dyn ReadyHandler> = (*core).clone();
        let handler: Weak<dyn ReadyHandler> = Rc::downgrade(&strong);
        let registration = core.reactor.register(handler, Readiness::BOTH);
        let signal = core.reactor.signal(&registration);
        socket.install_signal(signal.clone());
        // An edge that fired between the failed attempt and this
        // registration was never delivered; re-validate and self-raise so
        // it cannot be lost.
        if socket.poll_ready(Readiness::BOTH).any() {
            signal.raise();
        }
        state.registration = Some(registration);
        tracing::debug!("registration armed");
    }

    /// Watching → Idle once both queues are empty.
    fn disarm_if_idle(state: &mut BridgeState<S>) {
        if state.registration.is_some()
            && state.send_waiters.is_empty()
            && state.recv_waiters.is_empty()
        {
            state.registration = None;
            if let Some(socket) = state.socket.as_ref() {
                socket.clear_signal();
            }
            tracing::debug!("registration disarmed");
        }
    }

    /// Readiness dispatch: re-validate, then drain each ready direction.
    #[instrument(skip(self))]
    fn dispatch(&self) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let Some(socket) = state.socket.as_ref() else {
            // Raced with close; the close path already resumed everyone.
            return;
        };
        // The coarse signal only proves "something changed". Trusting it
        // without this zero-timeout poll would resume waiters that still
        // cannot make progress.
        let ready = socket.poll_ready(Readiness::BOTH);
        tracing::trace!(?ready, "revalidated readiness");
        if ready.readable {
            Self::drain(socket, &mut state.recv_waiters, Direction::Recv);
        }
        if ready.writable {
            Self::drain(socket, &mut state.send_waiters, Direction::Send);
        }
        Self::disarm_if_idle(state);
    }

    /// Resumes queue heads, in FIFO order, for as long as transfers keep
    /// completing. A transient would-block requeues the head with its
    /// payload restored; it is never surfaced as a failure.
    fn drain(socket: &S, queue: &mut WaitQueue, direction: Direction) {
        while let Some(cell) = queue.pop_head() {
            let op = match direction {
                Direction::Recv => Op::Recv,
                Direction::Send => {
                    let payload = cell.borrow_mut().payload.take();
                    match payload {
                        Some(message) => Op::Send(message),
                        // A queued send waiter always holds its payload;
                        // this arm is unreachable unless the invariant is
                        // broken.
                        None => {
                            cell.borrow_mut().complete(Err(SocketError::transport(
                                "send waiter lost its payload",
                            )));
                            continue;
                        }
                    }
                }
            };
            match attempt(socket, op) {
                Attempt::Fulfilled(value) => {
                    tracing::debug!(?direction, "waiter resumed");
                    cell.borrow_mut().complete(Ok(value));
                }
                Attempt::WouldBlock(payload) => {
                    cell.borrow_mut().payload = payload;
                    queue.push_head(cell);
                    break;
                }
                Attempt::Failed(error) => {
                    tracing::debug!(?direction, %error, "waiter resumed with failure");
                    cell.borrow_mut().complete(Err(error));
                }
            }
        }
    }

    /// Removes a cancelled waiter from its queue.
    ///
    /// This is the removal primitive layered timeout policies need: a
    /// dropped future takes its queue entry with it.
    fn cancel(&self, cell: &WaiterCell) {
        let mut state = self.state.borrow_mut();
        let direction = cell.borrow().direction();
        if state.queue_mut(direction).remove(cell) {
            tracing::debug!(?direction, "suspended caller cancelled");
            Self::disarm_if_idle(&mut state);
        }
    }

    /// Closes the socket, resuming every queued waiter with
    /// [`SocketError::Closed`]. Idempotent; explicit close and drop-based
    /// collection both land here.
    #[instrument(skip(self))]
    pub(crate) fn close(&self) {
        let (socket, drained) = {
            let mut state = self.state.borrow_mut();
            let Some(socket) = state.socket.take() else {
                return;
            };
            state.registration = None;
            let mut drained = state.recv_waiters.drain_all();
            drained.extend(state.send_waiters.drain_all());
            (socket, drained)
        };
        socket.clear_signal();
        socket.close();
        // No caller may hang across a close.
        for cell in drained {
            cell.borrow_mut().complete(Err(SocketError::Closed));
        }
        tracing::debug!("socket closed");
    }
}

impl<S: TransportSocket> ReadyHandler for SocketCore<S> {
    fn on_ready(&self) {
        self.dispatch();
    }
}

impl<S: TransportSocket> Drop for SocketCore<S> {
    fn drop(&mut self) {
        // Suspended callers hold an Rc to the core, so by the time the core
        // drops both queues are empty; only the native socket needs closing.
        if let Some(socket) = self.state.borrow_mut().socket.take() {
            socket.clear_signal();
            socket.close();
        }
    }
}

enum Stage {
    Start(Op),
    Waiting(WaiterCell),
    Done,
}

fn poll_request<S: TransportSocket>(
    core: &Rc<SocketCore<S>>,
    stage: &mut Stage,
    cx: &mut Context<'_>,
) -> Poll<SocketResult<Option<Message>>> {
    match std::mem::replace(stage, Stage::Done) {
        Stage::Start(op) => match SocketCore::request(core, op, cx.waker()) {
            RequestOutcome::Ready(result) => Poll::Ready(result),
            RequestOutcome::Suspended(cell) => {
                *stage = Stage::Waiting(cell);
                Poll::Pending
            }
        },
        Stage::Waiting(cell) => {
            let mut waiter = cell.borrow_mut();
            match waiter.outcome.take() {
                Some(result) => {
                    drop(waiter);
                    Poll::Ready(result)
                }
                None => {
                    waiter.update_waker(cx.waker());
                    drop(waiter);
                    *stage = Stage::Waiting(cell);
                    Poll::Pending
                }
            }
        }
        Stage::Done => Poll::Ready(Err(SocketError::transport(
            "operation polled after completion",
        ))),
    }
}

fn cancel_stage<S: TransportSocket>(core: &Rc<SocketCore<S>>, stage: &mut Stage) {
    if let Stage::Waiting(cell) = std::mem::replace(stage, Stage::Done) {
        // Completed-but-unobserved waiters are already off the queue;
        // only a still-queued waiter needs removal.
        if cell.borrow().outcome.is_none() {
            core.cancel(&cell);
        }
    }
}

/// A send in flight. Resolves once the message is accepted by the
/// transport, failing fast on closed sockets and suspending on a full pipe.
#[must_use = "futures do nothing unless awaited"]
pub struct SendFuture<S: TransportSocket> {
    core: Rc<SocketCore<S>>,
    stage: Stage,
}

impl<S: TransportSocket> SendFuture<S> {
    pub(crate) fn new(core: Rc<SocketCore<S>>, message: Message) -> Self {
        Self {
            core,
            stage: Stage::Start(Op::Send(message)),
        }
    }
}

impl<S: TransportSocket> Future for SendFuture<S> {
    type Output = SocketResult<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        poll_request(&this.core, &mut this.stage, cx).map(|result| result.map(|_| ()))
    }
}

impl<S: TransportSocket> Drop for SendFuture<S> {
    fn drop(&mut self) {
        cancel_stage(&self.core, &mut self.stage);
    }
}

/// A receive in flight. Resolves with the next queued message, failing
/// fast on closed sockets and suspending on an empty pipe.
#[must_use = "futures do nothing unless awaited"]
pub struct RecvFuture<S: TransportSocket> {
    core: Rc<SocketCore<S>>,
    stage: Stage,
}

impl<S: TransportSocket> RecvFuture<S> {
    pub(crate) fn new(core: Rc<SocketCore<S>>) -> Self {
        Self {
            core,
            stage: Stage::Start(Op::Recv),
        }
    }
}

impl<S: TransportSocket> Future for RecvFuture<S> {
    type Output = SocketResult<Message>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        poll_request(&this.core, &mut this.stage, cx)
            .map(|result| result.map(Option::unwrap_or_default))
    }
}

impl<S: TransportSocket> Drop for RecvFuture<S> {
    fn drop(&mut self) {
        cancel_stage(&self.core, &mut self.stage);
    }
}
