#![cfg(feature = "cli")]

use std::net::UdpSocket;
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

struct Emulator {
    child: Child,
    addr: String,
}

impl Drop for Emulator {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn free_loopback_addr() -> String {
    let probe = UdpSocket::bind("127.0.0.1:0").expect("probe socket should bind");
    probe
        .local_addr()
        .expect("probe socket should have an address")
        .to_string()
}

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "x32comm-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn x32comm(dest: &str, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_x32comm"))
        .args(["--log-level", "error", "--dest", dest, "--port", "0", "--no-audit"])
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("x32comm should run")
}

fn start_emulator() -> Emulator {
    let addr = free_loopback_addr();
    let child = Command::new(env!("CARGO_BIN_EXE_x32comm"))
        .args(["--log-level", "error", "emulate", "--bind", &addr])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("emulate command should start");
    let emulator = Emulator { child, addr };

    // Poll until the emulator answers.
    let start = Instant::now();
    loop {
        let out = x32comm(&emulator.addr, &["get-fader", "99", "--wait", "200ms"]);
        if out.status.success() {
            return emulator;
        }
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "emulator did not come up: {}",
            String::from_utf8_lossy(&out.stderr)
        );
        thread::sleep(Duration::from_millis(25));
    }
}

fn level_of(out: &Output) -> f64 {
    assert!(
        out.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let json: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("stdout should be json");
    json["level"].as_f64().expect("level should be a number")
}

#[test]
fn set_fader_then_get_fader() {
    let emu = start_emulator();

    let out = x32comm(&emu.addr, &["set-fader", "3", "50"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let out = x32comm(&emu.addr, &["get-fader", "3", "--format", "json"]);
    assert_eq!(level_of(&out), 0.5);
}

#[test]
fn set_message_then_get_message() {
    let emu = start_emulator();

    let out = x32comm(&emu.addr, &["set", "-m", "/ch/08/mix/fader", "-f", "0.25"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let out = x32comm(&emu.addr, &["get", "-m", "/ch/08/mix/fader", "--format", "json"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["address"], "/ch/08/mix/fader");
    assert_eq!(json["tags"], "f");
    assert_eq!(json["args"], serde_json::json!([0.25]));
}

#[test]
fn fade_reports_steps() {
    let emu = start_emulator();

    let out = x32comm(
        &emu.addr,
        &["fade", "--ch", "2", "--start", "0", "--stop", "10", "--duration", "100ms", "--format", "json"],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["outcome"], "converged");
    assert_eq!(json["steps"], 101);

    let out = x32comm(&emu.addr, &["get-fader", "2", "--format", "json"]);
    assert_eq!(level_of(&out), 100.0 / 1024.0);
}

#[test]
fn get_times_out_against_silent_peer() {
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = silent.local_addr().unwrap().to_string();

    let out = x32comm(&addr, &["get-fader", "1", "--wait", "100ms"]);
    assert_eq!(out.status.code(), Some(124));
}

#[test]
fn missing_dest_is_a_usage_error() {
    let out = Command::new(env!("CARGO_BIN_EXE_x32comm"))
        .args(["--log-level", "error", "get-fader", "1"])
        .env_remove("X32COMM_DEST")
        .output()
        .expect("x32comm should run");
    assert_eq!(out.status.code(), Some(64));
}

#[test]
fn audit_dir_receives_session_log() {
    let emu = start_emulator();
    let dir = unique_temp_dir("audit");

    let out = Command::new(env!("CARGO_BIN_EXE_x32comm"))
        .args(["--log-level", "error", "--dest", &emu.addr, "--port", "0"])
        .arg("--audit-dir")
        .arg(&dir)
        .args(["set-fader", "4", "20"])
        .output()
        .expect("x32comm should run");
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let logs: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .collect();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].extension().and_then(|e| e.to_str()), Some("jsonl"));
    let contents = std::fs::read_to_string(&logs[0]).unwrap();
    assert!(contents.contains(r#""kind":"write""#));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_prints_name() {
    let out = Command::new(env!("CARGO_BIN_EXE_x32comm"))
        .arg("version")
        .output()
        .expect("x32comm should run");
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("x32comm "));
}
