//! `tokio_util` codec for the same wire format.
//!
//! The decoder resynchronizes exactly like [`FrameReader`](crate::FrameReader):
//! bytes outside a frame are scanned and discarded, a header with a bad
//! checksum is just noise, and a bad trailer yields a packet with
//! `crc_valid == false`. Zero-length frames come out as empty packets.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::codec::{encode_frame, Packet, CRC16_SEED, TRAILER_SIZE};
use crate::crc::crc16;
use crate::error::FrameError;
use crate::scanner::SyncScanner;

#[derive(Debug, Clone, Default)]
pub struct RsssCodec {
    tail_mode: bool,
    scanner: SyncScanner,
    pending: Option<u16>,
}

impl RsssCodec {
    pub fn new(tail_mode: bool) -> Self {
        Self {
            tail_mode,
            ..Self::default()
        }
    }

    pub fn tail_mode(&self) -> bool {
        self.tail_mode
    }

    fn scan(&mut self, src: &mut BytesMut) -> Option<u16> {
        let mut consumed = 0;
        let mut found = None;
        for &byte in src.iter() {
            consumed += 1;
            if let Some(length) = self.scanner.push(byte) {
                found = Some(length);
                break;
            }
        }
        src.advance(consumed);
        found
    }
}

impl Decoder for RsssCodec {
    type Item = Packet;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>, FrameError> {
        let length = match self.pending {
            Some(length) => length,
            None => match self.scan(src) {
                Some(length) => {
                    debug!(length, "sync point found");
                    self.pending = Some(length);
                    length
                }
                None => return Ok(None),
            },
        };

        let payload_len = usize::from(length);
        let frame_len = payload_len + if self.tail_mode { TRAILER_SIZE } else { 0 };
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        self.pending = None;
        let payload = src.split_to(payload_len).freeze();
        let crc_valid = if self.tail_mode {
            let received = src.get_u16_le();
            received == crc16::calc(&payload, CRC16_SEED)
        } else {
            true
        };
        Ok(Some(Packet::new(payload, crc_valid)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Packet>, FrameError> {
        match self.decode(src)? {
            Some(packet) => Ok(Some(packet)),
            None => {
                // Truncated frame or trailing noise.
                if !src.is_empty() || self.pending.is_some() {
                    debug!(discarded = src.len(), "stream ended mid-frame");
                }
                src.clear();
                self.pending = None;
                self.scanner.reset();
                Ok(None)
            }
        }
    }
}

impl Encoder<Bytes> for RsssCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(&item, self.tail_mode, dst)
    }
}

impl<'a> Encoder<&'a [u8]> for RsssCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &'a [u8], dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(item, self.tail_mode, dst)
    }
}
