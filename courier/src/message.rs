//! Opaque message payloads.

use bytes::Bytes;

/// An immutable byte sequence carried through a socket.
///
/// Messages are opaque to the bridge: no framing, no multi-part structure.
/// A zero-length message is a valid, distinct payload and round-trips
/// exactly. Cloning is cheap (refcounted); ownership of the payload
/// transfers to the receiving side on a successful send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    payload: Bytes,
}

impl Message {
    /// Creates a message from an owned byte buffer.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// The empty message.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Length of the payload in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is zero-length.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Borrows the payload bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.payload
    }

    /// Consumes the message, returning the payload.
    pub fn into_bytes(self) -> Bytes {
        self.payload
    }
}

impl From<Vec<u8>> for Message {
    fn from(payload: Vec<u8>) -> Self {
        Self::new(payload)
    }
}

impl From<&[u8]> for Message {
    fn from(payload: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(payload))
    }
}

impl From<&str> for Message {
    fn from(payload: &str) -> Self {
        Self::new(Bytes::copy_from_slice(payload.as_bytes()))
    }
}

impl From<Bytes> for Message {
    fn from(payload: Bytes) -> Self {
        Self::new(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_is_valid_and_distinct() {
        let empty = Message::empty();
        assert_eq!(empty.len(), 0);
        assert!(empty.is_empty());
        assert_ne!(empty, Message::from("a"));
        assert_eq!(empty, Message::from(Vec::new()));
    }

    #[test]
    fn payload_round_trips_through_bytes() {
        let msg = Message::from("hello");
        assert_eq!(msg.as_slice(), b"hello");
        assert_eq!(msg.clone().into_bytes(), Bytes::from_static(b"hello"));
    }
}
