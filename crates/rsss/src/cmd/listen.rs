use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rsss_peer::PacketPeer;
use tracing::{info, warn};

use crate::cmd::{attach, peer_config, ListenArgs};
use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_packet, OutputFormat};

const RECV_POLL: Duration = Duration::from_millis(100);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut peer = PacketPeer::new(peer_config(args.tail));
    let _listener = attach(&mut peer, &args.transport)?;
    let endpoint = args.transport.describe();
    info!(%endpoint, tail_mode = args.tail, "listening");

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let Some(packet) = peer.recv_timeout(RECV_POLL) else {
            continue;
        };
        if !packet.crc_valid {
            warn!(index = printed, "packet failed trailer check");
        }

        print_packet(&packet, printed, &endpoint, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    peer.detach();
    let stats = peer.stats();
    info!(
        received = stats.packets_received,
        crc_failures = stats.crc_failures,
        dropped = stats.dropped_inbound,
        "listener stopped"
    );
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
