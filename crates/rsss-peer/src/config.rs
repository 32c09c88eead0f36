use std::time::Duration;

use rsss_frame::{FrameConfig, MAX_PAYLOAD};

/// Default bound on how long a worker waits before re-checking the stop flag.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_millis(100);

/// Longest a worker ever waits between stop-flag checks, whatever `sync_timeout` says.
pub const MAX_SYNC_TIMEOUT: Duration = Duration::from_secs(1);

/// Peer behavior configuration.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Framing options shared by both directions.
    pub frame: FrameConfig,
    /// Largest packet accepted by [`enqueue_outbound`](crate::PacketPeer::enqueue_outbound).
    pub max_packet_size: usize,
    /// Maximum number of queued outbound packets. `None` = unbounded.
    pub outbound_capacity: Option<usize>,
    /// How long the read worker waits for a header (and the write worker for
    /// a packet) before looking at the stop flag again.
    pub sync_timeout: Duration,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            max_packet_size: MAX_PAYLOAD,
            outbound_capacity: None,
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
        }
    }
}

impl PeerConfig {
    /// Switch the CRC-16 payload trailer on.
    pub fn with_tail(mut self) -> Self {
        self.frame.tail_mode = true;
        self
    }

    /// Override the maximum packet size (clamped to 1..=65535).
    pub fn with_max_packet_size(mut self, size: usize) -> Self {
        self.max_packet_size = clamp_packet_size(size);
        self
    }

    /// Bound the outbound queue.
    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = Some(capacity);
        self
    }

    /// Override the worker wait bound (capped at [`MAX_SYNC_TIMEOUT`] when used).
    pub fn with_sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = timeout;
        self
    }

    pub(crate) fn worker_wait(&self) -> Duration {
        self.sync_timeout.min(MAX_SYNC_TIMEOUT)
    }
}

pub(crate) fn clamp_packet_size(size: usize) -> usize {
    size.clamp(1, MAX_PAYLOAD)
}
