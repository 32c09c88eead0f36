#![cfg(all(unix, feature = "cli"))]

use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn rsss(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rsss"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("rsss should run")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/rsss-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

#[test]
fn encode_prints_hex_frame() {
    let output = rsss(&["encode", "--data", "Hello"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout_lines(&output), vec!["aa0500b848656c6c6f"]);
}

#[test]
fn encode_with_tail_appends_trailer() {
    let output = rsss(&["encode", "--data", "Hello", "--tail"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout_lines(&output), vec!["aa0500b848656c6c6f775a"]);
}

#[test]
fn encode_json_reports_sizes() {
    let output = rsss(&["encode", "--hex", "0102", "--format", "json"]);
    assert_eq!(output.status.code(), Some(0));
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("encode output should be JSON");
    assert_eq!(value["payload_size"], 2);
    assert_eq!(value["frame_size"], 6);
    assert_eq!(value["tail_mode"], false);
}

#[test]
fn decode_skips_noise_and_reports_frames() {
    let output = rsss(&[
        "decode",
        "--hex",
        "13 37 aa0500b848656c6c6f ff",
        "--format",
        "json",
    ]);
    assert_eq!(output.status.code(), Some(0));

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    let value: serde_json::Value = serde_json::from_str(&lines[0]).expect("line should be JSON");
    assert_eq!(value["payload"], "Hello");
    assert_eq!(value["payload_size"], 5);
    assert_eq!(value["crc_valid"], true);
}

#[test]
fn decode_flags_bad_trailer_with_data_invalid() {
    let output = rsss(&[
        "decode",
        "--tail",
        "--hex",
        "aa0500b848656c6c6f775b",
        "--format",
        "hex",
    ]);
    assert_eq!(output.status.code(), Some(60));
    assert_eq!(stdout_lines(&output), vec!["48656c6c6f"]);
}

#[test]
fn decode_without_frames_fails() {
    let output = rsss(&["decode", "--hex", "00 11 22 33"]);
    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no frames found"));
}

#[test]
fn invalid_hex_is_a_usage_error() {
    let output = rsss(&["encode", "--hex", "abc"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn send_to_missing_socket_is_a_transport_error() {
    let dir = unique_temp_dir("missing");
    let sock_path = dir.join("nobody.sock");
    let output = rsss(&[
        "send",
        "--socket",
        sock_path.to_str().expect("utf-8 path"),
        "--data",
        "ping",
    ]);
    assert_eq!(output.status.code(), Some(3));
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn send_rejects_payload_over_max_packet_size() {
    let output = rsss(&[
        "send",
        "--socket",
        "/tmp/rsss-unused.sock",
        "--max-packet-size",
        "2",
        "--data",
        "ping",
    ]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn send_and_listen_over_unix_socket() {
    let dir = unique_temp_dir("pair");
    let sock_path = dir.join("link.sock");
    let sock = sock_path.to_str().expect("utf-8 path").to_string();

    let listener = Command::new(env!("CARGO_BIN_EXE_rsss"))
        .args(["--log-level", "error", "--format", "json"])
        .args(["listen", "--bind", &sock, "--tail", "--count", "3"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("listen should start");

    let start = Instant::now();
    while !sock_path.exists() {
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "listener never bound"
        );
        thread::sleep(Duration::from_millis(20));
    }

    let sent = rsss(&[
        "send", "--socket", &sock, "--tail", "--data", "ping", "--repeat", "3", "--format",
        "json",
    ]);
    assert_eq!(sent.status.code(), Some(0));
    let summary: serde_json::Value =
        serde_json::from_slice(&sent.stdout).expect("send summary should be JSON");
    assert_eq!(summary["packets_sent"], 3);

    let received = listener
        .wait_with_output()
        .expect("listener should exit after --count packets");
    assert_eq!(received.status.code(), Some(0));

    let lines = stdout_lines(&received);
    assert_eq!(lines.len(), 3);
    for line in lines {
        let value: serde_json::Value = serde_json::from_str(&line).expect("line should be JSON");
        assert_eq!(value["payload"], "ping");
        assert_eq!(value["crc_valid"], true);
    }

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn version_prints_package_version() {
    let output = rsss(&["version"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stdout_lines(&output),
        vec![format!("rsss {}", env!("CARGO_PKG_VERSION"))]
    );
}
