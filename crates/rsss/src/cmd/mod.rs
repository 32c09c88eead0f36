use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use rsss_frame::FrameConfig;
use rsss_peer::{PacketPeer, PeerConfig};
use tracing::info;

use crate::exit::{io_error, peer_error, transport_error, CliError, CliResult, USAGE};
use crate::hex;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Frame a payload and print the wire bytes.
    Encode(EncodeArgs),
    /// Find and print every frame in a captured byte stream.
    Decode(DecodeArgs),
    /// Send packets over a socket or serial device.
    Send(SendArgs),
    /// Print packets received over a socket or serial device.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: Option<OutputFormat>) -> CliResult<i32> {
    let format_or_default = || format.unwrap_or_else(OutputFormat::default_for_stdout);
    match command {
        Command::Encode(args) => encode::run(args, format.unwrap_or(OutputFormat::Hex)),
        Command::Decode(args) => decode::run(args, format_or_default()),
        Command::Send(args) => send::run(args, format_or_default()),
        Command::Listen(args) => listen::run(args, format_or_default()),
        Command::Version(args) => version::run(args),
    }
}

/// Where the byte stream comes from. Exactly one must be given.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct TransportArgs {
    /// Connect to a Unix domain socket.
    #[arg(long, value_name = "PATH")]
    pub socket: Option<PathBuf>,
    /// Bind a Unix domain socket and wait for one connection.
    #[arg(long, value_name = "PATH")]
    pub bind: Option<PathBuf>,
    /// Open a serial or tty device (configure baud rate with stty beforehand).
    #[arg(long, value_name = "PATH")]
    pub device: Option<PathBuf>,
}

impl TransportArgs {
    pub fn describe(&self) -> String {
        match (&self.socket, &self.bind, &self.device) {
            (Some(path), _, _) => format!("socket:{}", path.display()),
            (_, Some(path), _) => format!("bind:{}", path.display()),
            (_, _, Some(path)) => format!("device:{}", path.display()),
            _ => "none".to_string(),
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct PayloadArgs {
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex payload (whitespace ignored).
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    /// The selected payload; stdin when no source flag is given.
    pub fn resolve(&self) -> CliResult<Vec<u8>> {
        if let Some(data) = &self.data {
            return Ok(data.as_bytes().to_vec());
        }
        if let Some(text) = &self.hex {
            return hex::decode(text)
                .map_err(|err| CliError::new(USAGE, format!("--hex is not valid hex: {err}")));
        }
        if let Some(path) = &self.file {
            return fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
        }
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|err| io_error("failed reading stdin", err))?;
        Ok(buf)
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Append the CRC-16 payload trailer.
    #[arg(long)]
    pub tail: bool,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Captured stream as hex (whitespace ignored).
    #[arg(long, conflicts_with = "file")]
    pub hex: Option<String>,
    /// Read the captured stream from a file. Stdin when neither flag is given.
    #[arg(long, conflicts_with = "hex")]
    pub file: Option<PathBuf>,
    /// Expect a CRC-16 trailer after every payload.
    #[arg(long)]
    pub tail: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub transport: TransportArgs,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Append the CRC-16 payload trailer.
    #[arg(long)]
    pub tail: bool,
    /// Send the payload N times.
    #[arg(long, default_value = "1")]
    pub repeat: usize,
    /// Refuse payloads larger than this (clamped to 1..=65535).
    #[arg(long, value_name = "BYTES", default_value_t = rsss_frame::MAX_PAYLOAD)]
    pub max_packet_size: usize,
    /// Give up if the queue has not drained in time (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub transport: TransportArgs,
    /// Expect a CRC-16 trailer after every payload.
    #[arg(long)]
    pub tail: bool,
    /// Exit after receiving N packets.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn peer_config(tail_mode: bool) -> PeerConfig {
    PeerConfig {
        frame: FrameConfig {
            tail_mode,
            ..FrameConfig::default()
        },
        ..PeerConfig::default()
    }
}

/// Open the selected transport and start the peer's workers on it.
///
/// A bound listener is returned so the socket file outlives the connection.
pub fn attach(
    peer: &mut PacketPeer,
    args: &TransportArgs,
) -> CliResult<Option<rsss_transport::UnixSocketListener>> {
    use rsss_transport::{SerialTransport, UnixSocketListener};

    if let Some(path) = &args.socket {
        let transport = UnixSocketListener::connect(path)
            .map_err(|err| transport_error("connect failed", err))?;
        peer.attach(transport)
            .map_err(|err| peer_error("attach failed", err))?;
        return Ok(None);
    }

    if let Some(path) = &args.bind {
        let listener =
            UnixSocketListener::bind(path).map_err(|err| transport_error("bind failed", err))?;
        info!(path = %path.display(), "waiting for connection");
        let transport = listener
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        peer.attach(transport)
            .map_err(|err| peer_error("attach failed", err))?;
        return Ok(Some(listener));
    }

    if let Some(path) = &args.device {
        let transport =
            SerialTransport::open(path).map_err(|err| transport_error("open failed", err))?;
        peer.attach(transport)
            .map_err(|err| peer_error("attach failed", err))?;
        return Ok(None);
    }

    Err(CliError::new(
        USAGE,
        "one of --socket, --bind or --device is required",
    ))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("  ").is_err());
    }

    #[test]
    fn payload_from_hex_and_data() {
        let args = PayloadArgs {
            hex: Some("48 69".into()),
            ..PayloadArgs::default()
        };
        assert_eq!(args.resolve().unwrap(), b"Hi");

        let args = PayloadArgs {
            data: Some("Hi".into()),
            ..PayloadArgs::default()
        };
        assert_eq!(args.resolve().unwrap(), b"Hi");

        let args = PayloadArgs {
            hex: Some("4".into()),
            ..PayloadArgs::default()
        };
        assert_eq!(args.resolve().unwrap_err().code, USAGE);
    }

    #[test]
    fn describes_selected_transport() {
        let args = TransportArgs {
            socket: None,
            bind: Some("/tmp/rsss.sock".into()),
            device: None,
        };
        assert_eq!(args.describe(), "bind:/tmp/rsss.sock");
    }
}
