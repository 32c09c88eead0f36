//! Resynchronizing serial stream sync.
//!
//! RSSS carries variable-length packets over links that have no message
//! boundaries of their own and may drop or garble bytes. A receiver can start
//! listening mid-stream and still find the next packet.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte-stream transports (in-memory, Unix sockets, serial devices)
//! - [`frame`]: header/trailer codec, sync scanner, resumable reader and writer
//! - [`peer`]: threaded packet queues over a transport (behind `peer` feature)

/// Re-export transport types.
pub mod transport {
    pub use rsss_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use rsss_frame::*;
}

/// Re-export peer types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use rsss_peer::*;
}
