use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Live counters shared between the peer handle and its workers.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    packets_received: AtomicU64,
    packets_sent: AtomicU64,
    crc_failures: AtomicU64,
    dropped_inbound: AtomicU64,
    dropped_outbound: AtomicU64,
    empty_frames: AtomicU64,
}

impl Counters {
    pub(crate) fn packet_received(&self, crc_valid: bool) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        if !crc_valid {
            self.crc_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn packet_sent(&self) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inbound_dropped(&self) {
        self.dropped_inbound.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn outbound_dropped(&self) {
        self.dropped_outbound.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn empty_frame(&self, crc_valid: bool) {
        self.empty_frames.fetch_add(1, Ordering::Relaxed);
        if !crc_valid {
            self.crc_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self) -> PeerStats {
        PeerStats {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            crc_failures: self.crc_failures.load(Ordering::Relaxed),
            dropped_inbound: self.dropped_inbound.load(Ordering::Relaxed),
            dropped_outbound: self.dropped_outbound.load(Ordering::Relaxed),
            empty_frames: self.empty_frames.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of peer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PeerStats {
    /// Packets pushed to the inbound queue.
    pub packets_received: u64,
    /// Packets fully written (trailer included in tail mode).
    pub packets_sent: u64,
    /// Frames whose CRC-16 trailer did not match.
    pub crc_failures: u64,
    /// Partially received packets discarded after a transport error.
    pub dropped_inbound: u64,
    /// Outbound packets discarded after a transport error.
    pub dropped_outbound: u64,
    /// Zero-length frames consumed without being queued.
    pub empty_frames: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let counters = Counters::default();
        counters.packet_received(true);
        counters.packet_received(false);
        counters.packet_sent();
        counters.inbound_dropped();
        counters.outbound_dropped();
        counters.empty_frame(true);

        assert_eq!(
            counters.snapshot(),
            PeerStats {
                packets_received: 2,
                packets_sent: 1,
                crc_failures: 1,
                dropped_inbound: 1,
                dropped_outbound: 1,
                empty_frames: 1,
            }
        );
    }
}
