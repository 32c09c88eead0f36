use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::crc::{crc16, crc8};
use crate::error::{FrameError, Result};

/// Frame header: marker (1) + length (2) + crc8 (1) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// First byte of every header.
pub const MARKER: u8 = 0xAA;

/// Payload trailer in tail mode: CRC-16, little-endian.
pub const TRAILER_SIZE: usize = 2;

/// Largest payload the 16-bit length field can announce.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// Seed of the header CRC-8.
pub const CRC8_SEED: u8 = 0x78;

/// Seed of the payload CRC-16.
pub const CRC16_SEED: u16 = 0x8795;

/// Default pause between sync attempts while waiting for a header.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A decoded frame header.
///
/// Wire format:
/// ```text
/// ┌──────────┬─────────────┬──────────┐
/// │ Marker   │ Length      │ CRC-8    │
/// │ 0xAA     │ (2B LE)     │ seed 0x78│
/// └──────────┴─────────────┴──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Number of payload bytes that follow the header.
    pub length: u16,
}

impl Header {
    pub fn new(length: u16) -> Self {
        Self { length }
    }

    /// Serialize the header, checksum included.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let [lo, hi] = self.length.to_le_bytes();
        let crc = crc8::calc(&[MARKER, lo, hi], CRC8_SEED);
        [MARKER, lo, hi, crc]
    }

    /// Parse a header; `None` unless the marker and checksum both match.
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Option<Self> {
        if bytes[0] != MARKER || !crc8::validate(bytes, CRC8_SEED) {
            return None;
        }
        Some(Self {
            length: u16::from_le_bytes([bytes[1], bytes[2]]),
        })
    }
}

/// A complete payload recovered from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// The payload bytes.
    pub payload: Bytes,
    /// Trailer check result. Always `true` when tail mode is off.
    pub crc_valid: bool,
}

impl Packet {
    pub fn new(payload: impl Into<Bytes>, crc_valid: bool) -> Self {
        Self {
            payload: payload.into(),
            crc_valid,
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Encode a whole frame into `dst`.
///
/// Wire format:
/// ```text
/// ┌──────────────┬───────────────────┬──────────────────────┐
/// │ Header (4B)  │ Payload           │ CRC-16 (2B LE)       │
/// │              │ (Length bytes)    │ tail mode only       │
/// └──────────────┴───────────────────┴──────────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], tail_mode: bool, dst: &mut BytesMut) -> Result<()> {
    let length = u16::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: MAX_PAYLOAD,
    })?;

    dst.reserve(HEADER_SIZE + payload.len() + TRAILER_SIZE);
    dst.put_slice(&Header::new(length).encode());
    dst.put_slice(payload);
    if tail_mode {
        dst.put_u16_le(crc16::calc(payload, CRC16_SEED));
    }
    Ok(())
}

/// Configuration shared by the frame reader and writer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Append and check a CRC-16 trailer after every payload.
    pub tail_mode: bool,
    /// Pause between sync attempts in [`FrameReader::wait_for_sync`](crate::FrameReader::wait_for_sync).
    pub poll_interval: Duration,
}

impl FrameConfig {
    /// Default configuration with tail mode switched on.
    pub fn with_tail() -> Self {
        Self {
            tail_mode: true,
            ..Self::default()
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            tail_mode: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}
