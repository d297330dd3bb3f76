//! Static socket-option registry and typed option values.
//!
//! Option get/set is pure mechanical marshaling: every option identifier
//! carries its expected value kind and access mode, fixed at compile time.
//! Validation happens against this registry before the transport is ever
//! touched, so the transport only sees well-typed writes to writable
//! options. There is no mutable global state behind option handling.

use bytes::Bytes;

use crate::error::{SocketError, SocketResult};

/// Identifiers for socket options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionId {
    /// I/O-thread affinity mask for newly created connections.
    Affinity,
    /// Socket identity used by routing socket kinds.
    Identity,
    /// Establish a message filter (write-only).
    Subscribe,
    /// Remove a message filter (write-only).
    Unsubscribe,
    /// Multicast data rate.
    Rate,
    /// Multicast recovery interval.
    RecoveryIvl,
    /// Kernel transmit buffer size.
    SndBuf,
    /// Kernel receive buffer size.
    RcvBuf,
    /// Whether more parts of a multi-part message follow (read-only).
    ReceiveMore,
    /// Current readiness event mask (read-only).
    Events,
    /// The socket kind code (read-only).
    Type,
    /// Linger period for pending messages on close.
    Linger,
    /// Reconnection interval.
    ReconnectIvl,
    /// Maximum reconnection interval.
    ReconnectIvlMax,
    /// Maximum length of the queue of outstanding connections.
    Backlog,
    /// Maximum acceptable inbound message size; -1 means no limit.
    MaxMsgSize,
    /// Outbound high-water mark.
    SndHwm,
    /// Inbound high-water mark.
    RcvHwm,
    /// Maximum network hops for multicast packets.
    MulticastHops,
    /// Receive timeout hint for the transport.
    RcvTimeo,
    /// Send timeout hint for the transport.
    SndTimeo,
    /// Restrict the socket to IPv4.
    Ipv4Only,
    /// The last endpoint this socket was bound or connected to (read-only).
    LastEndpoint,
}

impl OptionId {
    /// The value kind this option expects.
    pub fn kind(self) -> OptionKind {
        match self {
            OptionId::Affinity => OptionKind::Ulong,
            OptionId::Identity
            | OptionId::Subscribe
            | OptionId::Unsubscribe
            | OptionId::LastEndpoint => OptionKind::Bytes,
            OptionId::MaxMsgSize => OptionKind::Long,
            OptionId::ReceiveMore | OptionId::Ipv4Only => OptionKind::Bool,
            OptionId::Rate
            | OptionId::RecoveryIvl
            | OptionId::SndBuf
            | OptionId::RcvBuf
            | OptionId::Events
            | OptionId::Type
            | OptionId::Linger
            | OptionId::ReconnectIvl
            | OptionId::ReconnectIvlMax
            | OptionId::Backlog
            | OptionId::SndHwm
            | OptionId::RcvHwm
            | OptionId::MulticastHops
            | OptionId::RcvTimeo
            | OptionId::SndTimeo => OptionKind::Int,
        }
    }

    /// The access mode of this option.
    pub fn access(self) -> OptionAccess {
        match self {
            OptionId::ReceiveMore
            | OptionId::Events
            | OptionId::Type
            | OptionId::LastEndpoint => OptionAccess::ReadOnly,
            OptionId::Subscribe | OptionId::Unsubscribe => OptionAccess::WriteOnly,
            _ => OptionAccess::ReadWrite,
        }
    }
}

/// A typed option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// A 32-bit signed integer.
    Int(i32),
    /// A 64-bit signed integer.
    Long(i64),
    /// A 64-bit unsigned integer.
    Ulong(u64),
    /// A boolean flag.
    Bool(bool),
    /// An opaque byte string.
    Bytes(Bytes),
}

impl OptionValue {
    /// The kind of this value.
    pub fn kind(&self) -> OptionKind {
        match self {
            OptionValue::Int(_) => OptionKind::Int,
            OptionValue::Long(_) => OptionKind::Long,
            OptionValue::Ulong(_) => OptionKind::Ulong,
            OptionValue::Bool(_) => OptionKind::Bool,
            OptionValue::Bytes(_) => OptionKind::Bytes,
        }
    }

    /// Extracts a 32-bit integer, if that is what this value holds.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            OptionValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Extracts a 64-bit integer, if that is what this value holds.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            OptionValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Extracts a byte string, if that is what this value holds.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            OptionValue::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

/// Expected value kind for an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 64-bit unsigned integer.
    Ulong,
    /// Boolean flag.
    Bool,
    /// Opaque byte string.
    Bytes,
}

impl OptionKind {
    /// Human-readable kind name, used in validation errors.
    pub fn name(self) -> &'static str {
        match self {
            OptionKind::Int => "i32",
            OptionKind::Long => "i64",
            OptionKind::Ulong => "u64",
            OptionKind::Bool => "bool",
            OptionKind::Bytes => "bytes",
        }
    }
}

/// Access mode for an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionAccess {
    /// Readable and writable.
    ReadWrite,
    /// Readable only.
    ReadOnly,
    /// Writable only.
    WriteOnly,
}

/// Validates a write against the registry.
pub(crate) fn validate_set(id: OptionId, value: &OptionValue) -> SocketResult<()> {
    if id.access() == OptionAccess::ReadOnly {
        return Err(SocketError::ReadOnlyOption { option: id });
    }
    if value.kind() != id.kind() {
        return Err(SocketError::OptionType {
            option: id,
            expected: id.kind().name(),
        });
    }
    Ok(())
}

/// Validates a read against the registry.
pub(crate) fn validate_get(id: OptionId) -> SocketResult<()> {
    if id.access() == OptionAccess::WriteOnly {
        return Err(SocketError::WriteOnlyOption { option: id });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_options_reject_writes() {
        let err = validate_set(OptionId::Events, &OptionValue::Int(0));
        assert_eq!(
            err,
            Err(SocketError::ReadOnlyOption {
                option: OptionId::Events
            })
        );
    }

    #[test]
    fn write_only_options_reject_reads() {
        let err = validate_get(OptionId::Subscribe);
        assert_eq!(
            err,
            Err(SocketError::WriteOnlyOption {
                option: OptionId::Subscribe
            })
        );
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let err = validate_set(OptionId::SndHwm, &OptionValue::Bool(true));
        assert_eq!(
            err,
            Err(SocketError::OptionType {
                option: OptionId::SndHwm,
                expected: "i32",
            })
        );
    }

    #[test]
    fn writable_int_option_passes() {
        assert_eq!(validate_set(OptionId::SndHwm, &OptionValue::Int(5)), Ok(()));
        assert_eq!(validate_get(OptionId::SndHwm), Ok(()));
    }
}
