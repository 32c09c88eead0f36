use std::time::Duration;

use rsss_peer::{PacketPeer, PeerConfig};
use rsss_transport::MemoryTransport;

const WAIT: Duration = Duration::from_secs(10);

fn config(tail_mode: bool) -> PeerConfig {
    let config = PeerConfig::default().with_sync_timeout(Duration::from_millis(10));
    if tail_mode {
        config.with_tail()
    } else {
        config
    }
}

fn payload(seed: usize) -> Vec<u8> {
    let len = 1 + (seed * 97) % 700;
    (0..len).map(|i| (i * 13 + seed) as u8).collect()
}

#[test]
fn bidirectional_exchange_preserves_order() {
    for tail_mode in [false, true] {
        let (mut a, mut b) = MemoryTransport::pair();
        a.set_write_limit(Some(7));
        b.set_read_limit(Some(3));
        let left = PacketPeer::wrap(a, config(tail_mode)).expect("left should attach");
        let right = PacketPeer::wrap(b, config(tail_mode)).expect("right should attach");

        for i in 0..50 {
            left.enqueue_outbound(&payload(i)).expect("left enqueue");
            right.enqueue_outbound(&payload(1000 + i)).expect("right enqueue");
        }

        for i in 0..50 {
            let packet = right.recv_timeout(WAIT).expect("right should receive");
            assert_eq!(packet.payload.as_ref(), payload(i).as_slice(), "left->right #{i}");
            assert!(packet.crc_valid);

            let packet = left.recv_timeout(WAIT).expect("left should receive");
            assert_eq!(packet.payload.as_ref(), payload(1000 + i).as_slice(), "right->left #{i}");
            assert!(packet.crc_valid);
        }

        assert_eq!(left.stats().packets_received, 50);
        assert_eq!(right.stats().packets_received, 50);
    }
}

#[test]
fn receiver_joining_mid_stream_resyncs() {
    let (a, b) = MemoryTransport::pair();
    let line = b.clone();
    let tx = PacketPeer::wrap(a, config(true)).expect("tx should attach");

    tx.enqueue_outbound(b"missed").expect("enqueue");
    let deadline = std::time::Instant::now() + WAIT;
    while tx.pending_outbound_count() > 0 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }

    // Lose the start of the first frame, as if the receiver came up late.
    let mut tail = line.drain();
    tail.drain(..3);
    line.inject(&tail);

    let rx = PacketPeer::wrap(b, config(true)).expect("rx should attach");
    tx.enqueue_outbound(b"caught").expect("enqueue");

    let packet = rx.recv_timeout(WAIT).expect("rx should resync");
    assert_eq!(packet.payload.as_ref(), b"caught");
    assert!(packet.crc_valid);
}

#[cfg(unix)]
mod unix {
    use std::path::PathBuf;
    use std::thread;

    use rsss_transport::UnixSocketListener;

    use super::*;

    fn make_sock_path(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/rsss-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("peer.sock")
    }

    #[test]
    fn peers_exchange_over_unix_socket() {
        let sock_path = make_sock_path("peer");
        let listener = UnixSocketListener::bind(&sock_path).expect("listener should bind");

        let server = thread::spawn(move || {
            let transport = listener.accept().expect("listener should accept");
            let peer = PacketPeer::wrap(transport, config(true)).expect("server should attach");
            let packet = peer.recv_timeout(WAIT).expect("server should receive");
            peer.enqueue_outbound(&packet.payload).expect("echo enqueue");
            while peer.pending_outbound_count() > 0 {
                thread::sleep(Duration::from_millis(5));
            }
        });

        let transport = UnixSocketListener::connect(&sock_path).expect("client should connect");
        let client = PacketPeer::wrap(transport, config(true)).expect("client should attach");
        client.enqueue_outbound(b"over the socket").expect("enqueue");

        let echoed = client.recv_timeout(WAIT).expect("client should receive echo");
        assert_eq!(echoed.payload.as_ref(), b"over the socket");
        assert!(echoed.crc_valid);
        server.join().expect("server thread should finish");

        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }
}
