use rsss_transport::Transport;
use tracing::{debug, warn};

use crate::codec::{FrameConfig, Header, CRC16_SEED, HEADER_SIZE, MAX_PAYLOAD, TRAILER_SIZE};
use crate::crc::crc16;
use crate::error::Result;

/// Where the write side currently is within the frame sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePhase {
    /// No frame in flight.
    Idle,
    /// Header bytes still being written.
    Announcing,
    /// Payload bytes of the announced frame still owed.
    Draining,
    /// Trailer bytes still being written.
    Sealing,
    /// The last write hit a fatal transport error; the next write starts a new frame.
    Failed,
}

#[derive(Debug, Clone, Copy)]
enum WriteState {
    Idle,
    Announcing {
        header: [u8; HEADER_SIZE],
        sent: usize,
        length: u16,
    },
    Draining {
        remaining: u16,
    },
    Sealing {
        trailer: [u8; TRAILER_SIZE],
        sent: usize,
    },
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Yield,
}

/// Writes payload bytes to a [`Transport`], announcing frames as needed.
///
/// A call may be only partially satisfied when the transport is short on
/// capacity; callers pass the unsent remainder on the next call. The first
/// byte of a fresh chunk announces a frame covering the whole chunk (up to
/// 65535 bytes), so a caller that keeps passing "what is left" gets exactly
/// one frame per chunk.
pub struct FrameWriter<T> {
    inner: T,
    config: FrameConfig,
    state: WriteState,
    crc: u16,
    trailer_failures: u64,
}

impl<T: Transport> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            config,
            state: WriteState::Idle,
            crc: CRC16_SEED,
            trailer_failures: 0,
        }
    }

    /// Write as much of `src` as the transport accepts.
    ///
    /// Returns the number of payload bytes accepted; `Ok(0)` means "try again
    /// later". A fatal transport error is returned as `Err` unless payload was
    /// already accepted during this call and only the next header failed, in
    /// which case the partial count is returned and the header is re-emitted
    /// on the next call.
    pub fn write(&mut self, src: &[u8]) -> Result<usize> {
        let mut accepted = 0;
        loop {
            let step = match self.state {
                WriteState::Idle | WriteState::Failed => self.announce(src.len() - accepted),
                WriteState::Announcing { .. } => self.send_header(accepted)?,
                WriteState::Draining { .. } => self.drain(&src[accepted..], &mut accepted)?,
                WriteState::Sealing { .. } => self.seal(),
            };
            if step == Step::Yield {
                return Ok(accepted);
            }
        }
    }

    /// Push out any header or trailer bytes still owed without new payload.
    ///
    /// Returns `Ok(true)` once nothing but payload (if anything) is pending.
    pub fn flush(&mut self) -> Result<bool> {
        loop {
            let step = match self.state {
                WriteState::Announcing { .. } => self.send_header(0)?,
                WriteState::Sealing { .. } => self.seal(),
                WriteState::Idle | WriteState::Failed | WriteState::Draining { .. } => {
                    return Ok(true)
                }
            };
            if step == Step::Yield {
                return Ok(false);
            }
        }
    }

    fn announce(&mut self, pending: usize) -> Step {
        if pending == 0 {
            return Step::Yield;
        }
        let length = pending.min(MAX_PAYLOAD) as u16;
        self.state = WriteState::Announcing {
            header: Header::new(length).encode(),
            sent: 0,
            length,
        };
        Step::Continue
    }

    fn send_header(&mut self, accepted: usize) -> Result<Step> {
        let WriteState::Announcing {
            header,
            sent,
            length,
        } = self.state
        else {
            return Ok(Step::Yield);
        };

        match self.inner.write(&header[sent..]) {
            Ok(0) => Ok(Step::Yield),
            Ok(n) if sent + n < HEADER_SIZE => {
                self.state = WriteState::Announcing {
                    header,
                    sent: sent + n,
                    length,
                };
                Ok(Step::Continue)
            }
            Ok(_) => {
                debug!(length, "frame announced");
                self.crc = CRC16_SEED;
                self.state = WriteState::Draining { remaining: length };
                Ok(Step::Continue)
            }
            Err(err) if accepted > 0 => {
                warn!(error = %err, "header write failed; deferring to next call");
                self.state = WriteState::Idle;
                Ok(Step::Yield)
            }
            Err(err) => {
                self.state = WriteState::Failed;
                Err(err.into())
            }
        }
    }

    fn drain(&mut self, rest: &[u8], accepted: &mut usize) -> Result<Step> {
        let WriteState::Draining { remaining } = self.state else {
            return Ok(Step::Yield);
        };
        if rest.is_empty() {
            return Ok(Step::Yield);
        }

        let want = rest.len().min(usize::from(remaining));
        match self.inner.write(&rest[..want]) {
            Ok(0) => Ok(Step::Yield),
            Ok(n) => {
                let n = n.min(want);
                if self.config.tail_mode {
                    self.crc = crc16::calc(&rest[..n], self.crc);
                }
                *accepted += n;

                let remaining = remaining - n as u16;
                self.state = if remaining > 0 {
                    WriteState::Draining { remaining }
                } else if self.config.tail_mode {
                    WriteState::Sealing {
                        trailer: self.crc.to_le_bytes(),
                        sent: 0,
                    }
                } else {
                    WriteState::Idle
                };
                Ok(Step::Continue)
            }
            Err(err) => {
                warn!(error = %err, remaining, "payload write failed");
                self.state = WriteState::Failed;
                Err(err.into())
            }
        }
    }

    fn seal(&mut self) -> Step {
        let WriteState::Sealing { trailer, sent } = self.state else {
            return Step::Yield;
        };

        match self.inner.write(&trailer[sent..]) {
            Ok(0) => Step::Yield,
            Ok(n) if sent + n < TRAILER_SIZE => {
                self.state = WriteState::Sealing {
                    trailer,
                    sent: sent + n,
                };
                Step::Continue
            }
            Ok(_) => {
                self.state = WriteState::Idle;
                Step::Continue
            }
            Err(err) => {
                // Not part of the byte count; surfaced through `trailer_failures`.
                self.trailer_failures += 1;
                warn!(error = %err, "trailer write failed");
                self.state = WriteState::Idle;
                Step::Continue
            }
        }
    }

    /// Payload bytes the transport can take right now, net of framing overhead.
    ///
    /// Room for the header (and trailer in tail mode) that has not gone out
    /// yet is held back. When the link only has room to finish the announced
    /// frame, that frame's remaining payload is reported instead.
    pub fn available_for_write(&mut self) -> Result<usize> {
        let capacity = self.inner.available_for_write()?;
        let owed = self.sync_remaining() as usize;
        if capacity < owed {
            return Ok(capacity);
        }

        let overhead = self.pending_overhead();
        if capacity - owed >= overhead {
            Ok(capacity - overhead)
        } else {
            Ok(owed)
        }
    }

    fn pending_overhead(&self) -> usize {
        let trailer = if self.config.tail_mode { TRAILER_SIZE } else { 0 };
        match self.state {
            WriteState::Idle | WriteState::Failed | WriteState::Draining { .. } => {
                HEADER_SIZE + trailer
            }
            WriteState::Announcing { sent, .. } => HEADER_SIZE - sent + trailer,
            WriteState::Sealing { sent, .. } => TRAILER_SIZE - sent + HEADER_SIZE,
        }
    }

    /// Payload bytes still owed for the announced frame.
    pub fn sync_remaining(&self) -> u32 {
        match self.state {
            WriteState::Announcing { length, .. } => u32::from(length),
            WriteState::Draining { remaining } => u32::from(remaining),
            _ => 0,
        }
    }

    /// Current write-side state.
    pub fn phase(&self) -> WritePhase {
        match self.state {
            WriteState::Idle => WritePhase::Idle,
            WriteState::Announcing { .. } => WritePhase::Announcing,
            WriteState::Draining { .. } => WritePhase::Draining,
            WriteState::Sealing { .. } => WritePhase::Sealing,
            WriteState::Failed => WritePhase::Failed,
        }
    }

    /// Number of trailers lost to transport errors.
    pub fn trailer_failures(&self) -> u64 {
        self.trailer_failures
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
