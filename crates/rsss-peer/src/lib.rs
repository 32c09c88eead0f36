//! Threaded packet assembler on top of RSSS framing.
//!
//! A [`PacketPeer`] turns a byte-stream transport into a packet queue: one
//! worker thread reassembles inbound frames, another drains the outbound
//! queue. Applications only ever touch the queues.

pub mod config;
pub mod error;
pub mod peer;
pub mod stats;

pub use config::{PeerConfig, DEFAULT_SYNC_TIMEOUT, MAX_SYNC_TIMEOUT};
pub use error::{PeerError, Result};
pub use peer::PacketPeer;
pub use rsss_frame::Packet;
pub use stats::PeerStats;
