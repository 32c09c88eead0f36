use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

#[derive(Debug, Default)]
struct Pipe {
    buf: VecDeque<u8>,
    capacity: Option<usize>,
    closed: bool,
}

/// One end of an in-memory duplex link.
///
/// Bytes written on one end of a [`pair`](MemoryTransport::pair) are read
/// from the other. Per-call limits let tests reproduce a slow serial line:
/// with a read limit of 1 every `read` returns at most one byte.
///
/// Clones share the same pipes (like a cloned socket) but keep their own
/// per-call limits.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    inbound: Arc<Mutex<Pipe>>,
    outbound: Arc<Mutex<Pipe>>,
    read_limit: Option<usize>,
    write_limit: Option<usize>,
}

impl MemoryTransport {
    /// Create two connected ends.
    pub fn pair() -> (Self, Self) {
        let a_to_b = Arc::new(Mutex::new(Pipe::default()));
        let b_to_a = Arc::new(Mutex::new(Pipe::default()));
        let a = Self::from_pipes(Arc::clone(&b_to_a), Arc::clone(&a_to_b));
        let b = Self::from_pipes(a_to_b, b_to_a);
        (a, b)
    }

    /// Create a single end whose writes come back on its own reads.
    pub fn loopback() -> Self {
        let pipe = Arc::new(Mutex::new(Pipe::default()));
        Self::from_pipes(Arc::clone(&pipe), pipe)
    }

    fn from_pipes(inbound: Arc<Mutex<Pipe>>, outbound: Arc<Mutex<Pipe>>) -> Self {
        Self {
            inbound,
            outbound,
            read_limit: None,
            write_limit: None,
        }
    }

    /// Cap the number of bytes a single `read` call returns.
    pub fn set_read_limit(&mut self, limit: Option<usize>) {
        self.read_limit = limit;
    }

    /// Cap the number of bytes a single `write` call accepts.
    pub fn set_write_limit(&mut self, limit: Option<usize>) {
        self.write_limit = limit;
    }

    /// Bound the bytes buffered on the outbound side; writes return `Ok(0)` when full.
    pub fn set_outbound_capacity(&self, capacity: Option<usize>) {
        lock(&self.outbound).capacity = capacity;
    }

    /// Append raw bytes to this end's inbound side, as if they arrived on the wire.
    pub fn inject(&self, bytes: &[u8]) {
        lock(&self.inbound).buf.extend(bytes);
    }

    /// Remove and return everything waiting on this end's inbound side.
    pub fn drain(&self) -> Vec<u8> {
        lock(&self.inbound).buf.drain(..).collect()
    }

    /// Bytes waiting on this end's inbound side.
    pub fn pending(&self) -> usize {
        lock(&self.inbound).buf.len()
    }

    /// Close both directions. Every later operation on either end fails.
    pub fn close(&self) {
        lock(&self.inbound).closed = true;
        lock(&self.outbound).closed = true;
    }
}

impl Transport for MemoryTransport {
    fn available(&mut self) -> Result<usize> {
        let pipe = lock(&self.inbound);
        if pipe.closed {
            return Err(TransportError::Closed);
        }
        Ok(pipe.buf.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut pipe = lock(&self.inbound);
        if pipe.closed {
            return Err(TransportError::Closed);
        }

        let mut count = buf.len().min(pipe.buf.len());
        if let Some(limit) = self.read_limit {
            count = count.min(limit);
        }
        for (slot, byte) in buf.iter_mut().zip(pipe.buf.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut pipe = lock(&self.outbound);
        if pipe.closed {
            return Err(TransportError::Closed);
        }

        let mut count = buf.len();
        if let Some(limit) = self.write_limit {
            count = count.min(limit);
        }
        if let Some(capacity) = pipe.capacity {
            count = count.min(capacity.saturating_sub(pipe.buf.len()));
        }
        pipe.buf.extend(&buf[..count]);
        Ok(count)
    }

    fn available_for_write(&mut self) -> Result<usize> {
        let pipe = lock(&self.outbound);
        if pipe.closed {
            return Err(TransportError::Closed);
        }

        let mut room = pipe
            .capacity
            .map_or(usize::MAX, |capacity| capacity.saturating_sub(pipe.buf.len()));
        if let Some(limit) = self.write_limit {
            room = room.min(limit);
        }
        Ok(room)
    }

    fn try_clone(&self) -> Result<Self> {
        Ok(self.clone())
    }
}

fn lock(pipe: &Mutex<Pipe>) -> MutexGuard<'_, Pipe> {
    pipe.lock().unwrap_or_else(PoisonError::into_inner)
}
