use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use rsss_frame::{FrameError, FrameReader, FrameWriter, Packet};
use rsss_transport::Transport;
use tracing::{debug, info, warn};

use crate::config::{clamp_packet_size, PeerConfig};
use crate::error::{PeerError, Result};
use crate::stats::{Counters, PeerStats};

/// State shared between the handle and both workers.
struct Shared {
    inbound: Mutex<VecDeque<Packet>>,
    inbound_ready: Condvar,
    outbound: Mutex<VecDeque<Bytes>>,
    outbound_ready: Condvar,
    stop: AtomicBool,
    max_packet_size: AtomicUsize,
    counters: Counters,
}

impl Shared {
    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    fn push_inbound(&self, packet: Packet) {
        lock(&self.inbound).push_back(packet);
        self.inbound_ready.notify_all();
    }

    /// Clone of the oldest outbound packet, waiting up to `timeout` for one.
    fn peek_outbound(&self, timeout: Duration) -> Option<Bytes> {
        let queue = lock(&self.outbound);
        let (queue, _) = self
            .outbound_ready
            .wait_timeout_while(queue, timeout, |queue| {
                queue.is_empty() && !self.stopped()
            })
            .unwrap_or_else(PoisonError::into_inner);
        queue.front().cloned()
    }

    fn pop_outbound(&self) {
        lock(&self.outbound).pop_front();
    }
}

struct Workers {
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// Packet-oriented endpoint over a byte-stream transport.
///
/// Packets are delivered in the order they were framed, in both directions.
/// Queue locks are only held to push or pop, never across transport I/O.
pub struct PacketPeer {
    shared: Arc<Shared>,
    config: PeerConfig,
    workers: Option<Workers>,
}

impl PacketPeer {
    /// Create a detached peer. Outbound packets queue up until [`attach`](Self::attach).
    pub fn new(config: PeerConfig) -> Self {
        let max_packet_size = clamp_packet_size(config.max_packet_size);
        Self {
            shared: Arc::new(Shared {
                inbound: Mutex::new(VecDeque::new()),
                inbound_ready: Condvar::new(),
                outbound: Mutex::new(VecDeque::new()),
                outbound_ready: Condvar::new(),
                stop: AtomicBool::new(false),
                max_packet_size: AtomicUsize::new(max_packet_size),
                counters: Counters::default(),
            }),
            config,
            workers: None,
        }
    }

    /// Create a peer and attach it to `transport` in one step.
    pub fn wrap<T: Transport + 'static>(transport: T, config: PeerConfig) -> Result<Self> {
        let mut peer = Self::new(config);
        peer.attach(transport)?;
        Ok(peer)
    }

    /// Start the read and write workers on `transport`.
    pub fn attach<T: Transport + 'static>(&mut self, transport: T) -> Result<()> {
        if self.workers.is_some() {
            return Err(PeerError::AlreadyAttached);
        }

        let write_half = transport.try_clone()?;
        let frame_reader = FrameReader::with_config(transport, self.config.frame.clone());
        let frame_writer = FrameWriter::with_config(write_half, self.config.frame.clone());
        self.shared.stop.store(false, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        let config = self.config.clone();
        let reader = thread::Builder::new()
            .name("rsss-read".into())
            .spawn(move || read_loop(frame_reader, &shared, &config))
            .map_err(PeerError::Spawn)?;

        let shared = Arc::clone(&self.shared);
        let config = self.config.clone();
        let writer = match thread::Builder::new()
            .name("rsss-write".into())
            .spawn(move || write_loop(frame_writer, &shared, &config))
        {
            Ok(handle) => handle,
            Err(err) => {
                self.shared.stop.store(true, Ordering::Release);
                let _ = reader.join();
                return Err(PeerError::Spawn(err));
            }
        };

        self.workers = Some(Workers { reader, writer });
        info!(tail_mode = self.config.frame.tail_mode, "peer attached");
        Ok(())
    }

    /// Stop both workers and wait for them to exit.
    ///
    /// Queued packets stay queued; a frame in flight is abandoned.
    pub fn detach(&mut self) {
        let Some(workers) = self.workers.take() else {
            return;
        };

        self.shared.stop.store(true, Ordering::Release);
        self.shared.outbound_ready.notify_all();
        self.shared.inbound_ready.notify_all();

        if workers.reader.join().is_err() {
            warn!("read worker panicked");
        }
        if workers.writer.join().is_err() {
            warn!("write worker panicked");
        }
        info!("peer detached");
    }

    pub fn is_attached(&self) -> bool {
        self.workers.is_some()
    }

    /// Queue a packet for sending.
    pub fn enqueue_outbound(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(PeerError::EmptyPacket);
        }
        let max = self.max_packet_size();
        if data.len() > max {
            return Err(PeerError::PacketTooLarge {
                size: data.len(),
                max,
            });
        }

        let mut queue = lock(&self.shared.outbound);
        if let Some(capacity) = self.config.outbound_capacity {
            if queue.len() >= capacity {
                return Err(PeerError::QueueFull { capacity });
            }
        }
        queue.push_back(Bytes::copy_from_slice(data));
        drop(queue);

        self.shared.outbound_ready.notify_one();
        Ok(())
    }

    /// Take the oldest received packet, if any.
    pub fn dequeue_inbound(&self) -> Option<Packet> {
        lock(&self.shared.inbound).pop_front()
    }

    /// Take the oldest received packet, waiting up to `timeout` for one.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Packet> {
        let queue = lock(&self.shared.inbound);
        let (mut queue, _) = self
            .shared
            .inbound_ready
            .wait_timeout_while(queue, timeout, |queue| queue.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        queue.pop_front()
    }

    pub fn available_inbound_count(&self) -> usize {
        lock(&self.shared.inbound).len()
    }

    /// Packets queued for sending, including the one being written.
    pub fn pending_outbound_count(&self) -> usize {
        lock(&self.shared.outbound).len()
    }

    pub fn max_packet_size(&self) -> usize {
        self.shared.max_packet_size.load(Ordering::Relaxed)
    }

    /// Change the outbound size limit (clamped to 1..=65535).
    pub fn set_max_packet_size(&self, size: usize) {
        self.shared
            .max_packet_size
            .store(clamp_packet_size(size), Ordering::Relaxed);
    }

    pub fn stats(&self) -> PeerStats {
        self.shared.counters.snapshot()
    }

    pub fn config(&self) -> &PeerConfig {
        &self.config
    }
}

impl Drop for PacketPeer {
    fn drop(&mut self) {
        self.detach();
    }
}

fn read_loop<T: Transport>(mut reader: FrameReader<T>, shared: &Shared, config: &PeerConfig) {
    debug!("read worker started");
    let poll = config.frame.poll_interval;
    let mut link_down = false;

    while !shared.stopped() {
        let length = match reader.wait_for_sync(config.worker_wait()) {
            Ok(Some(length)) => length,
            Ok(None) => continue,
            Err(err) => {
                // Only the first error of a run is worth a warning.
                if link_down {
                    debug!(error = %err, "sync failed");
                } else {
                    warn!(error = %err, "sync failed");
                    link_down = true;
                }
                thread::sleep(poll);
                continue;
            }
        };
        link_down = false;

        match assemble(&mut reader, length, shared, poll) {
            Ok(Some(packet)) if packet.is_empty() => {
                shared.counters.empty_frame(packet.crc_valid);
            }
            Ok(Some(packet)) => {
                if !packet.crc_valid {
                    warn!(len = packet.len(), "packet failed trailer check");
                }
                shared.counters.packet_received(packet.crc_valid);
                shared.push_inbound(packet);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, length, "dropping partial inbound packet");
                shared.counters.inbound_dropped();
                thread::sleep(poll);
            }
        }
    }
    debug!("read worker stopped");
}

/// Read one whole frame. `Ok(None)` when stopped mid-frame.
fn assemble<T: Transport>(
    reader: &mut FrameReader<T>,
    length: u16,
    shared: &Shared,
    poll: Duration,
) -> std::result::Result<Option<Packet>, FrameError> {
    let mut buf = vec![0u8; usize::from(length)];
    let mut filled = 0;

    while filled < buf.len() || reader.tail_pending() {
        if shared.stopped() {
            return Ok(None);
        }
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            thread::sleep(poll);
        }
        filled += n;
    }

    Ok(Some(Packet::new(buf, reader.crc_valid())))
}

fn write_loop<T: Transport>(mut writer: FrameWriter<T>, shared: &Shared, config: &PeerConfig) {
    debug!("write worker started");
    let poll = config.frame.poll_interval;

    while !shared.stopped() {
        let Some(packet) = shared.peek_outbound(config.worker_wait()) else {
            continue;
        };

        let trailer_failures = writer.trailer_failures();
        match send(&mut writer, &packet, shared, poll) {
            Ok(true) if writer.trailer_failures() > trailer_failures => {
                warn!(len = packet.len(), "packet sent without trailer");
                shared.counters.outbound_dropped();
            }
            Ok(true) => shared.counters.packet_sent(),
            // Stopped mid-packet; it stays queued.
            Ok(false) => break,
            Err(err) => {
                warn!(error = %err, len = packet.len(), "dropping outbound packet");
                shared.counters.outbound_dropped();
                thread::sleep(poll);
            }
        }
        shared.pop_outbound();
    }
    debug!("write worker stopped");
}

/// Write one whole packet. `Ok(false)` when stopped mid-packet.
fn send<T: Transport>(
    writer: &mut FrameWriter<T>,
    packet: &[u8],
    shared: &Shared,
    poll: Duration,
) -> std::result::Result<bool, FrameError> {
    let mut sent = 0;
    while sent < packet.len() {
        if shared.stopped() {
            return Ok(false);
        }
        let n = writer.write(&packet[sent..])?;
        if n == 0 {
            thread::sleep(poll);
        }
        sent += n;
    }

    while !writer.flush()? {
        if shared.stopped() {
            return Ok(false);
        }
        thread::sleep(poll);
    }
    Ok(true)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
