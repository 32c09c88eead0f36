use std::thread;
use std::time::{Duration, Instant};

use rsss_peer::PacketPeer;
use tracing::info;

use crate::cmd::{attach, parse_duration, peer_config, SendArgs};
use crate::exit::{peer_error, CliError, CliResult, SUCCESS, TIMEOUT, TRANSPORT_ERROR, USAGE};
use crate::output::{print_stats, OutputFormat};

const DRAIN_POLL: Duration = Duration::from_millis(10);

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    if args.repeat == 0 {
        return Err(CliError::new(USAGE, "--repeat must be at least 1"));
    }
    let payload = args.payload.resolve()?;

    let mut peer =
        PacketPeer::new(peer_config(args.tail).with_max_packet_size(args.max_packet_size));
    for _ in 0..args.repeat {
        peer.enqueue_outbound(&payload)
            .map_err(|err| peer_error("enqueue failed", err))?;
    }

    let _listener = attach(&mut peer, &args.transport)?;
    let endpoint = args.transport.describe();
    info!(%endpoint, packets = args.repeat, size = payload.len(), "sending");

    let drained = wait_for_drain(&peer, timeout);
    peer.detach();
    let stats = peer.stats();

    if !drained {
        return Err(CliError::new(
            TIMEOUT,
            format!(
                "timed out after {timeout:?} with {} packets still queued",
                peer.pending_outbound_count()
            ),
        ));
    }
    if stats.dropped_outbound > 0 {
        return Err(CliError::new(
            TRANSPORT_ERROR,
            format!("{} of {} packets were dropped", stats.dropped_outbound, args.repeat),
        ));
    }

    print_stats(&stats, &endpoint, format);
    Ok(SUCCESS)
}

fn wait_for_drain(peer: &PacketPeer, timeout: Duration) -> bool {
    // A timeout past the end of the clock means no deadline.
    let deadline = Instant::now().checked_add(timeout);
    loop {
        if peer.pending_outbound_count() == 0 {
            return true;
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return false;
        }
        thread::sleep(DRAIN_POLL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_wait_accepts_unbounded_timeout() {
        let peer = PacketPeer::new(peer_config(false));
        assert!(wait_for_drain(&peer, Duration::MAX));
    }

    #[test]
    fn drain_wait_gives_up_on_stalled_queue() {
        let peer = PacketPeer::new(peer_config(false));
        peer.enqueue_outbound(b"stuck").expect("enqueue should succeed");
        assert!(!wait_for_drain(&peer, Duration::from_millis(20)));
    }
}
