//! Prelude module for common courier imports.
//!
//! ```rust
//! use courier::prelude::*;
//!
//! let context = Context::new(1);
//! let socket = context.socket(SocketKind::Pair)?;
//! # Ok::<(), courier::SocketError>(())
//! ```

pub use crate::context::{Context, InprocContext};
pub use crate::error::{SocketError, SocketResult};
pub use crate::message::Message;
pub use crate::options::{OptionId, OptionValue};
pub use crate::reactor::Reactor;
pub use crate::socket::Socket;
pub use crate::transport::inproc::InprocTransport;
pub use crate::transport::{Direction, SocketKind};
