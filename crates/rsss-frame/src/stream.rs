use std::time::Duration;

use rsss_transport::Transport;

use crate::codec::{FrameConfig, MAX_PAYLOAD};
use crate::error::Result;
use crate::reader::FrameReader;
use crate::writer::FrameWriter;

/// Both directions of the framing protocol over one transport.
///
/// The reader and writer own independent clones of the transport, so the
/// stream can be split and driven from two threads.
pub struct FrameStream<T> {
    reader: FrameReader<T>,
    writer: FrameWriter<T>,
}

impl<T: Transport> FrameStream<T> {
    /// Wrap a transport with default configuration.
    pub fn new(transport: T) -> Result<Self> {
        Self::with_config(transport, FrameConfig::default())
    }

    /// Wrap a transport; both directions share `config`.
    pub fn with_config(transport: T, config: FrameConfig) -> Result<Self> {
        let write_half = transport.try_clone()?;
        Ok(Self {
            reader: FrameReader::with_config(transport, config.clone()),
            writer: FrameWriter::with_config(write_half, config),
        })
    }

    /// Reassemble a stream from halves produced by [`into_split`](Self::into_split).
    pub fn from_parts(reader: FrameReader<T>, writer: FrameWriter<T>) -> Self {
        Self { reader, writer }
    }

    pub fn read(&mut self, dest: &mut [u8]) -> Result<usize> {
        self.reader.read(dest)
    }

    pub fn write(&mut self, src: &[u8]) -> Result<usize> {
        self.writer.write(src)
    }

    pub fn flush(&mut self) -> Result<bool> {
        self.writer.flush()
    }

    pub fn find_sync(&mut self) -> Result<Option<u16>> {
        self.reader.find_sync()
    }

    pub fn wait_for_sync(&mut self, timeout: Duration) -> Result<Option<u16>> {
        self.reader.wait_for_sync(timeout)
    }

    pub fn crc_valid(&self) -> bool {
        self.reader.crc_valid()
    }

    /// Payload bytes readable right now; see [`FrameReader::available`].
    pub fn available(&mut self) -> Result<usize> {
        self.reader.available()
    }

    /// Payload bytes writable right now; see [`FrameWriter::available_for_write`].
    pub fn available_for_write(&mut self) -> Result<usize> {
        self.writer.available_for_write()
    }

    pub fn read_sync_remaining(&self) -> u32 {
        self.reader.sync_remaining()
    }

    pub fn write_sync_remaining(&self) -> u32 {
        self.writer.sync_remaining()
    }

    /// Largest payload a single frame can carry.
    pub fn max_payload_size(&self) -> usize {
        MAX_PAYLOAD
    }

    pub fn reader(&mut self) -> &mut FrameReader<T> {
        &mut self.reader
    }

    pub fn writer(&mut self) -> &mut FrameWriter<T> {
        &mut self.writer
    }

    /// Split into independently owned halves.
    pub fn into_split(self) -> (FrameReader<T>, FrameWriter<T>) {
        (self.reader, self.writer)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use rsss_transport::MemoryTransport;

    use super::*;
    use crate::writer::WritePhase;

    const LENGTHS: [usize; 6] = [1, 2, 255, 256, 4096, 65535];

    fn config(tail_mode: bool) -> FrameConfig {
        FrameConfig {
            tail_mode,
            ..FrameConfig::default()
        }
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 + 7) as u8).collect()
    }

    fn send_all(stream: &mut FrameStream<MemoryTransport>, data: &[u8]) {
        let mut sent = 0;
        while sent < data.len() || !stream.flush().unwrap() {
            sent += stream.write(&data[sent..]).unwrap();
        }
    }

    fn recv_exact(stream: &mut FrameStream<MemoryTransport>, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        let mut filled = 0;
        while filled < len || stream.reader().tail_pending() {
            let n = stream.read(&mut out[filled..]).unwrap();
            if n == 0 {
                thread::yield_now();
            }
            filled += n;
        }
        out
    }

    #[test]
    fn roundtrip_sampled_lengths() {
        for tail_mode in [false, true] {
            for len in LENGTHS {
                let (a, b) = MemoryTransport::pair();
                let mut tx = FrameStream::with_config(a, config(tail_mode)).unwrap();
                let mut rx = FrameStream::with_config(b, config(tail_mode)).unwrap();

                let data = payload(len);
                send_all(&mut tx, &data);
                assert_eq!(recv_exact(&mut rx, len), data, "len={len} tail={tail_mode}");
                assert!(rx.crc_valid());
                assert_eq!(rx.read_sync_remaining(), 0);
            }
        }
    }

    #[test]
    fn roundtrip_with_one_byte_io() {
        for tail_mode in [false, true] {
            let (mut a, mut b) = MemoryTransport::pair();
            a.set_write_limit(Some(1));
            b.set_read_limit(Some(1));
            let mut tx = FrameStream::with_config(a, config(tail_mode)).unwrap();
            let mut rx = FrameStream::with_config(b, config(tail_mode)).unwrap();

            let data = payload(4096);
            send_all(&mut tx, &data);
            assert_eq!(recv_exact(&mut rx, data.len()), data);
            assert!(rx.crc_valid());
        }
    }

    #[test]
    fn split_halves_run_on_separate_threads() {
        let (a, b) = MemoryTransport::pair();
        a.set_outbound_capacity(Some(64));
        let tx = FrameStream::with_config(a, FrameConfig::with_tail()).unwrap();
        let mut rx = FrameStream::with_config(b, FrameConfig::with_tail()).unwrap();

        let data = payload(20_000);
        let expected = data.clone();
        let (_, mut writer) = tx.into_split();
        let sender = thread::spawn(move || {
            let mut sent = 0;
            while sent < data.len() || !writer.flush().unwrap() {
                let n = writer.write(&data[sent..]).unwrap();
                if n == 0 {
                    thread::yield_now();
                }
                sent += n;
            }
            writer.phase()
        });

        assert_eq!(recv_exact(&mut rx, expected.len()), expected);
        assert!(rx.crc_valid());
        assert_eq!(sender.join().unwrap(), WritePhase::Idle);
    }

    #[test]
    fn write_side_tracks_announced_frame() {
        let (a, _b) = MemoryTransport::pair();
        a.set_outbound_capacity(Some(6));
        let mut tx = FrameStream::new(a).unwrap();

        assert_eq!(tx.write(b"Hello").unwrap(), 2);
        assert_eq!(tx.write_sync_remaining(), 3);
        assert_eq!(tx.max_payload_size(), 65535);
    }

    #[test]
    fn availability_on_both_sides() {
        let (a, b) = MemoryTransport::pair();
        a.set_outbound_capacity(Some(16));
        let mut tx = FrameStream::new(a).unwrap();
        let mut rx = FrameStream::new(b).unwrap();

        assert_eq!(tx.available_for_write().unwrap(), 12);
        assert_eq!(rx.available().unwrap(), 0);

        send_all(&mut tx, b"Hi");
        assert_eq!(tx.available_for_write().unwrap(), 6);
        assert_eq!(rx.available().unwrap(), 2);
        assert_eq!(recv_exact(&mut rx, 2), b"Hi");
    }

    #[test]
    fn from_parts_reassembles() {
        let (a, b) = MemoryTransport::pair();
        let (reader, writer) = FrameStream::new(a).unwrap().into_split();
        let mut tx = FrameStream::from_parts(reader, writer);
        let mut rx = FrameStream::new(b).unwrap();

        send_all(&mut tx, b"again");
        assert_eq!(rx.wait_for_sync(Duration::from_millis(50)).unwrap(), Some(5));
        assert_eq!(recv_exact(&mut rx, 5), b"again");
    }
}
