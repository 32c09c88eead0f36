use std::fs;
use std::io::Read;

use rsss_frame::{FrameConfig, FrameReader, Packet};
use rsss_transport::MemoryTransport;
use tracing::debug;

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::hex;
use crate::output::{print_packet, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input = read_input(&args)?;
    let config = FrameConfig {
        tail_mode: args.tail,
        ..FrameConfig::default()
    };

    let packets = decode_all(&input, config).map_err(|err| frame_error("decode failed", err))?;
    if packets.is_empty() {
        return Err(CliError::new(
            DATA_INVALID,
            format!("no frames found in {} input bytes", input.len()),
        ));
    }

    for (index, packet) in packets.iter().enumerate() {
        print_packet(packet, index, "input", format);
    }

    if packets.iter().any(|packet| !packet.crc_valid) {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

fn read_input(args: &DecodeArgs) -> CliResult<Vec<u8>> {
    if let Some(text) = &args.hex {
        return hex::decode(text)
            .map_err(|err| CliError::new(USAGE, format!("--hex is not valid hex: {err}")));
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    let mut buf = Vec::new();
    std::io::stdin()
        .read_to_end(&mut buf)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok(buf)
}

/// Run a captured stream through the frame reader and collect every complete frame.
///
/// Bytes outside frames are skipped. A frame cut off by the end of the input
/// is dropped.
pub fn decode_all(input: &[u8], config: FrameConfig) -> rsss_frame::Result<Vec<Packet>> {
    let link = MemoryTransport::loopback();
    link.inject(input);
    let mut reader = FrameReader::with_config(link, config);
    let mut packets = Vec::new();

    while let Some(length) = reader.find_sync()? {
        let mut buf = vec![0u8; usize::from(length)];
        let mut filled = 0;
        while filled < buf.len() || reader.tail_pending() {
            let n = reader.read(&mut buf[filled..])?;
            filled += n;
            if n == 0 && (filled < buf.len() || reader.tail_pending()) {
                debug!(length, filled, "input ends mid-frame");
                return Ok(packets);
            }
        }
        packets.push(Packet::new(buf, reader.crc_valid()));
    }

    Ok(packets)
}
