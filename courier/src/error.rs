//! Error types for socket and bridge operations.

use thiserror::Error;

use crate::options::OptionId;

/// Errors surfaced to callers of socket operations.
///
/// A would-block condition is never an error: it suspends the caller inside
/// the bridge and does not appear here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocketError {
    /// The socket has been closed; the operation fails fast without suspending.
    #[error("socket is closed")]
    Closed,

    /// The owning context has been terminated.
    #[error("context has been terminated")]
    Terminated,

    /// A transport-level failure. The caller may retry the operation.
    #[error("transport failure: {message}")]
    Transport {
        /// Details about the transport failure.
        message: String,
    },

    /// A resource-allocation failure. Retrying cannot help.
    #[error("allocation failure: {message}")]
    Allocation {
        /// Details about the allocation failure.
        message: String,
    },

    /// No socket is bound at the requested endpoint.
    #[error("no endpoint bound at {endpoint}")]
    AddressNotFound {
        /// The endpoint that was looked up.
        endpoint: String,
    },

    /// Another socket is already bound at the requested endpoint.
    #[error("endpoint already in use: {endpoint}")]
    AddressInUse {
        /// The contested endpoint.
        endpoint: String,
    },

    /// Attempted to write a read-only socket option.
    #[error("option {option:?} is read-only")]
    ReadOnlyOption {
        /// The rejected option.
        option: OptionId,
    },

    /// Attempted to read a write-only socket option.
    #[error("option {option:?} is write-only")]
    WriteOnlyOption {
        /// The rejected option.
        option: OptionId,
    },

    /// The supplied value does not match the option's registered kind.
    #[error("option {option:?} expects a {expected} value")]
    OptionType {
        /// The option being set.
        option: OptionId,
        /// Human-readable name of the expected value kind.
        expected: &'static str,
    },
}

/// A type alias for `Result<T, SocketError>`.
pub type SocketResult<T> = Result<T, SocketError>;

impl SocketError {
    /// Builds a [`SocketError::Transport`] from anything displayable.
    pub fn transport(message: impl std::fmt::Display) -> Self {
        SocketError::Transport {
            message: message.to_string(),
        }
    }

    /// Builds a [`SocketError::Allocation`] from anything displayable.
    pub fn allocation(message: impl std::fmt::Display) -> Self {
        SocketError::Allocation {
            message: message.to_string(),
        }
    }

    /// Whether retrying the failed operation can possibly succeed.
    ///
    /// Allocation failures and closed handles are terminal; transport
    /// failures are left to the caller's retry policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SocketError::Transport { .. })
    }
}
