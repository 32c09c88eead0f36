//! Resynchronizing, checksummed framing over unstructured byte streams.
//!
//! Every payload is preceded by a 4-byte header:
//! - a `0xAA` marker
//! - a 2-byte little-endian payload length
//! - a CRC-8 over the first three bytes
//!
//! In tail mode a CRC-16 trailer follows the payload. A receiver that starts
//! mid-stream, or loses bytes, slides a 4-byte window over the input until
//! it sees a valid header again.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod crc;
pub mod error;
pub mod reader;
pub mod scanner;
pub mod stream;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::RsssCodec;
pub use codec::{
    encode_frame, FrameConfig, Header, Packet, CRC16_SEED, CRC8_SEED, DEFAULT_POLL_INTERVAL,
    HEADER_SIZE, MARKER, MAX_PAYLOAD, TRAILER_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::{FrameReader, ReadPhase};
pub use scanner::SyncScanner;
pub use stream::FrameStream;
pub use writer::{FrameWriter, WritePhase};
