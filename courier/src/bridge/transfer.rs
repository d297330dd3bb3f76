//! One non-blocking transfer attempt.
//!
//! The transfer operation moves a single message into or out of a native
//! socket and classifies the result. It never suspends, never touches the
//! wait queues, and never talks to the reactor; suspension is the bridge's
//! job.

use crate::error::SocketError;
use crate::message::Message;
use crate::transport::{Direction, RecvStatus, SendStatus, TransportSocket};

/// The operation to attempt. Carrying the payload inside the variant keeps
/// "send without a message" unrepresentable.
#[derive(Debug)]
pub(crate) enum Op {
    Send(Message),
    Recv,
}

impl Op {
    pub(crate) fn direction(&self) -> Direction {
        match self {
            Op::Send(_) => Direction::Send,
            Op::Recv => Direction::Recv,
        }
    }
}

/// Classified outcome of one attempt.
#[derive(Debug)]
pub(crate) enum Attempt {
    /// The transfer completed. Holds the received message for receives,
    /// `None` for sends.
    Fulfilled(Option<Message>),
    /// The transfer cannot complete without waiting. Holds the payload back
    /// for sends so it can be captured in a waiter.
    WouldBlock(Option<Message>),
    /// The transfer failed for a reason other than would-block.
    Failed(SocketError),
}

/// Performs one non-blocking attempt against the native socket.
pub(crate) fn attempt<S: TransportSocket>(socket: &S, op: Op) -> Attempt {
    match op {
        Op::Send(message) => match socket.try_send(message) {
            SendStatus::Accepted => Attempt::Fulfilled(None),
            SendStatus::Full(message) => Attempt::WouldBlock(Some(message)),
            SendStatus::Failed(error) => Attempt::Failed(error),
        },
        Op::Recv => match socket.try_recv() {
            RecvStatus::Received(message) => Attempt::Fulfilled(Some(message)),
            RecvStatus::Empty => Attempt::WouldBlock(None),
            RecvStatus::Failed(error) => Attempt::Failed(error),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::inproc::InprocTransport;
    use crate::transport::{SocketKind, Transport};

    #[test]
    fn attempts_classify_without_side_effects() {
        let transport = InprocTransport::new(1);
        let a = transport.open(SocketKind::Pair).expect("open");
        let b = transport.open(SocketKind::Pair).expect("open");
        a.bind("inproc://transfer").expect("bind");
        b.connect("inproc://transfer").expect("connect");

        // Empty pipe: receive would block and hands nothing back.
        assert!(matches!(attempt(&b, Op::Recv), Attempt::WouldBlock(None)));

        // Successful send fulfills with no value.
        assert!(matches!(
            attempt(&a, Op::Send(Message::from("x"))),
            Attempt::Fulfilled(None)
        ));

        // The queued message is fulfilled on the receive side.
        match attempt(&b, Op::Recv) {
            Attempt::Fulfilled(Some(msg)) => assert_eq!(msg.as_slice(), b"x"),
            other => panic!("expected fulfilled receive, got {:?}", other),
        }
    }

    #[test]
    fn would_block_hands_the_payload_back() {
        let transport = InprocTransport::new(1);
        let lonely = transport.open(SocketKind::Push).expect("open");
        match attempt(&lonely, Op::Send(Message::from("kept"))) {
            Attempt::WouldBlock(Some(msg)) => assert_eq!(msg.as_slice(), b"kept"),
            other => panic!("expected would-block with payload, got {:?}", other),
        }
    }
}
