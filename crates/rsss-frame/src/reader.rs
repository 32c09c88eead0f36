use std::time::{Duration, Instant};

use rsss_transport::Transport;
use tracing::{debug, warn};

use crate::codec::{FrameConfig, CRC16_SEED, TRAILER_SIZE};
use crate::crc::crc16;
use crate::error::Result;
use crate::scanner::SyncScanner;

/// Where the read side currently is within the frame sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPhase {
    /// No active frame; the next read scans for a header.
    NeedSync,
    /// Payload bytes of the current frame still to be delivered.
    Synced { remaining: u32 },
    /// Payload consumed, trailer bytes still to arrive.
    TrailerPending { missing: usize },
}

#[derive(Debug, Clone, Copy)]
struct PendingTrailer {
    bytes: [u8; TRAILER_SIZE],
    filled: usize,
    /// Last payload byte, withheld until the trailer has been checked.
    held: Option<u8>,
}

impl PendingTrailer {
    fn new(held: Option<u8>) -> Self {
        Self {
            bytes: [0; TRAILER_SIZE],
            filled: 0,
            held,
        }
    }
}

/// Reads framed payload bytes from a [`Transport`], resynchronizing as needed.
///
/// `read` is resumable: it can be called with any buffer size, any number of
/// times, while the transport delivers bytes in arbitrarily small pieces. It
/// never returns bytes that are not inside a frame.
///
/// In tail mode the last payload byte of each frame is held back until the
/// CRC-16 trailer has arrived and been checked, so by the time a caller sees
/// the final byte, [`crc_valid`](FrameReader::crc_valid) describes that frame.
pub struct FrameReader<T> {
    inner: T,
    config: FrameConfig,
    scanner: SyncScanner,
    sync_remaining: u32,
    crc: u16,
    trailer: Option<PendingTrailer>,
    valid: bool,
}

impl<T: Transport> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        let valid = !config.tail_mode;
        Self {
            inner,
            config,
            scanner: SyncScanner::new(),
            sync_remaining: 0,
            crc: CRC16_SEED,
            trailer: None,
            valid,
        }
    }

    /// Scan the bytes that are already available for the next header.
    ///
    /// Consumes at most what `available` reported on entry, so a link that
    /// never goes quiet still hands control back. Returns the announced
    /// payload length, or `None` once that snapshot is used up (the partial
    /// window is kept for the next call). Finding a header abandons any frame
    /// still in progress.
    pub fn find_sync(&mut self) -> Result<Option<u16>> {
        let available = self.inner.available()?;
        for _ in 0..available {
            let mut byte = [0u8; 1];
            if self.inner.read(&mut byte)? == 0 {
                return Ok(None);
            }
            if let Some(length) = self.scanner.push(byte[0]) {
                self.begin_frame(length);
                return Ok(Some(length));
            }
        }
        Ok(None)
    }

    /// Keep scanning until a header shows up or `timeout` elapses.
    ///
    /// Returns immediately with the remaining payload length if a frame is
    /// already active. A timeout too large to represent waits indefinitely.
    pub fn wait_for_sync(&mut self, timeout: Duration) -> Result<Option<u16>> {
        if self.frame_active() {
            return Ok(Some(self.remaining_u16()));
        }

        let deadline = Instant::now().checked_add(timeout);
        loop {
            if let Some(length) = self.find_sync()? {
                return Ok(Some(length));
            }
            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    self.config.poll_interval.min(deadline - now)
                }
                None => self.config.poll_interval,
            };
            std::thread::sleep(pause);
        }
    }

    /// Payload bytes of the current frame that can be read right now.
    ///
    /// Scans for a header first when no frame is active. The result is
    /// `min(sync_remaining, transport available)`; in tail mode the final
    /// byte of a frame also waits for its trailer, so a read may return one
    /// byte less.
    pub fn available(&mut self) -> Result<usize> {
        if let Some(pending) = self.trailer {
            let missing = TRAILER_SIZE - pending.filled;
            let ready = pending.held.is_some() && self.inner.available()? >= missing;
            return Ok(usize::from(ready));
        }
        if self.sync_remaining == 0 && self.find_sync()?.is_none() {
            return Ok(0);
        }
        if self.sync_remaining == 0 {
            return Ok(0);
        }
        let available = self.inner.available()?;
        Ok(available.min(self.sync_remaining as usize))
    }

    /// Read payload bytes of the current frame into `dest`.
    ///
    /// `Ok(0)` means no progress right now (no sync, no data, or trailer still
    /// incomplete). A transport error abandons the current frame.
    pub fn read(&mut self, dest: &mut [u8]) -> Result<usize> {
        match self.read_frame_bytes(dest) {
            Ok(count) => Ok(count),
            Err(err) => {
                warn!(error = %err, "read failed; abandoning frame");
                self.sync_remaining = 0;
                self.trailer = None;
                Err(err)
            }
        }
    }

    fn read_frame_bytes(&mut self, dest: &mut [u8]) -> Result<usize> {
        if self.trailer.is_some() {
            return self.complete_trailer(dest);
        }

        if self.sync_remaining == 0 {
            if self.find_sync()?.is_none() {
                return Ok(0);
            }
            if self.trailer.is_some() {
                // zero-length frame in tail mode
                return self.complete_trailer(dest);
            }
            if self.sync_remaining == 0 {
                return Ok(0);
            }
        }

        let want = dest.len().min(self.sync_remaining as usize);
        if want == 0 {
            return Ok(0);
        }

        let count = self.inner.read(&mut dest[..want])?;
        if count == 0 {
            return Ok(0);
        }

        if self.config.tail_mode {
            self.crc = crc16::calc(&dest[..count], self.crc);
        }
        self.sync_remaining -= count as u32;

        if self.sync_remaining > 0 || !self.config.tail_mode {
            return Ok(count);
        }

        self.trailer = Some(PendingTrailer::new(Some(dest[count - 1])));
        let delivered = self.complete_trailer(&mut dest[count - 1..])?;
        Ok(count - 1 + delivered)
    }

    fn complete_trailer(&mut self, dest: &mut [u8]) -> Result<usize> {
        let Some(pending) = self.trailer.as_mut() else {
            return Ok(0);
        };
        if pending.held.is_some() && dest.is_empty() {
            return Ok(0);
        }

        while pending.filled < TRAILER_SIZE {
            let n = self.inner.read(&mut pending.bytes[pending.filled..])?;
            if n == 0 {
                return Ok(0);
            }
            pending.filled += n;
        }

        let received = u16::from_le_bytes(pending.bytes);
        let held = pending.held;
        self.trailer = None;
        self.valid = received == self.crc;
        if !self.valid {
            debug!(expected = self.crc, received, "payload trailer mismatch");
        }

        match held {
            Some(byte) => {
                dest[0] = byte;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn begin_frame(&mut self, length: u16) {
        self.sync_remaining = u32::from(length);
        self.crc = CRC16_SEED;
        self.valid = !self.config.tail_mode;
        self.trailer = (self.config.tail_mode && length == 0).then(|| PendingTrailer::new(None));
        debug!(length, "sync point found");
    }

    fn frame_active(&self) -> bool {
        self.sync_remaining > 0 || self.trailer.is_some()
    }

    fn remaining_u16(&self) -> u16 {
        u16::try_from(self.sync_remaining).unwrap_or(u16::MAX)
    }

    /// Trailer check result of the most recent frame (always `true` outside tail mode).
    pub fn crc_valid(&self) -> bool {
        self.valid
    }

    /// Payload bytes of the current frame not yet read from the transport.
    pub fn sync_remaining(&self) -> u32 {
        self.sync_remaining
    }

    /// Whether the current frame still waits for trailer bytes (or a held byte).
    pub fn tail_pending(&self) -> bool {
        self.trailer.is_some()
    }

    /// Current read-side state.
    pub fn phase(&self) -> ReadPhase {
        match (self.trailer, self.sync_remaining) {
            (Some(pending), _) => ReadPhase::TrailerPending {
                missing: TRAILER_SIZE - pending.filled,
            },
            (None, 0) => ReadPhase::NeedSync,
            (None, remaining) => ReadPhase::Synced { remaining },
        }
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
