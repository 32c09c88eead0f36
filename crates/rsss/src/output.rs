use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rsss_frame::Packet;
use rsss_peer::PeerStats;
use serde::Serialize;

use crate::hex;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
    Hex,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PacketOutput<'a> {
    index: usize,
    source: &'a str,
    payload_size: usize,
    crc_valid: bool,
    payload: String,
    payload_hex: String,
    timestamp: String,
}

pub fn print_packet(packet: &Packet, index: usize, source: &str, format: OutputFormat) {
    let payload = packet.payload.as_ref();
    match format {
        OutputFormat::Json => {
            let out = PacketOutput {
                index,
                source,
                payload_size: payload.len(),
                crc_valid: packet.crc_valid,
                payload: payload_preview(payload),
                payload_hex: hex::encode(payload),
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "SIZE", "CRC", "SOURCE", "PAYLOAD"])
                .add_row(vec![
                    index.to_string(),
                    payload.len().to_string(),
                    crc_label(packet.crc_valid).to_string(),
                    source.to_string(),
                    payload_preview(payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "#{} size={} crc={} source={} payload={}",
                index,
                payload.len(),
                crc_label(packet.crc_valid),
                source,
                payload_preview(payload)
            );
        }
        OutputFormat::Raw => print_raw(payload),
        OutputFormat::Hex => println!("{}", hex::encode(payload)),
    }
}

#[derive(Serialize)]
struct EncodedOutput {
    payload_size: usize,
    frame_size: usize,
    tail_mode: bool,
    frame_hex: String,
}

pub fn print_encoded(frame: &[u8], payload_size: usize, tail_mode: bool, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&EncodedOutput {
            payload_size,
            frame_size: frame.len(),
            tail_mode,
            frame_hex: hex::encode(frame),
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PAYLOAD", "FRAME", "TAIL", "HEX"])
                .add_row(vec![
                    payload_size.to_string(),
                    frame.len().to_string(),
                    tail_mode.to_string(),
                    hex::encode(frame),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "payload={} frame={} tail={} hex={}",
                payload_size,
                frame.len(),
                tail_mode,
                hex::encode(frame)
            );
        }
        OutputFormat::Raw => print_raw(frame),
        OutputFormat::Hex => println!("{}", hex::encode(frame)),
    }
}

#[derive(Serialize)]
struct StatsOutput<'a> {
    endpoint: &'a str,
    #[serde(flatten)]
    stats: &'a PeerStats,
}

pub fn print_stats(stats: &PeerStats, endpoint: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&StatsOutput { endpoint, stats }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ENDPOINT", "SENT", "RECEIVED", "CRC FAIL", "DROPPED"])
                .add_row(vec![
                    endpoint.to_string(),
                    stats.packets_sent.to_string(),
                    stats.packets_received.to_string(),
                    stats.crc_failures.to_string(),
                    (stats.dropped_inbound + stats.dropped_outbound).to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "endpoint={} sent={} received={} crc_failures={} dropped_in={} dropped_out={}",
                endpoint,
                stats.packets_sent,
                stats.packets_received,
                stats.crc_failures,
                stats.dropped_inbound,
                stats.dropped_outbound
            );
        }
        // Byte-oriented formats carry no summary.
        OutputFormat::Raw | OutputFormat::Hex => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json(value: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn crc_label(valid: bool) -> &'static str {
    if valid {
        "ok"
    } else {
        "BAD"
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
