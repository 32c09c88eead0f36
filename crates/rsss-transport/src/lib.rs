//! Byte-stream transport abstraction for RSSS.
//!
//! The framing layer only needs three things from a link: how many bytes can
//! be read right now, a non-blocking read, and a non-blocking write. This
//! crate defines that contract ([`Transport`]) and ships implementations:
//! - [`MemoryTransport`]: connected in-memory ends with partial-I/O knobs
//! - [`StreamTransport`]: non-blocking Unix sockets and serial devices

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(unix)]
pub mod stream;
#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use traits::Transport;

#[cfg(unix)]
pub use stream::{SerialTransport, StreamTransport, UnixTransport};
#[cfg(unix)]
pub use uds::UnixSocketListener;
