#![forbid(unsafe_code)]

//! End-to-end runs of the `dice` binary.
//!
//! Run:
//!   cargo test -p dice-cli --test cli_integration

use std::io::Write;
use std::net::SocketAddr;
use std::process::{Command, Output, Stdio};
use std::sync::mpsc;
use std::thread;

fn dice(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dice"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .output()
        .expect("dice binary should run")
}

fn config_file(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
}

fn spawn_provider() -> SocketAddr {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, dice_cli::serve::app()).await.unwrap();
        });
    });
    rx.recv().unwrap()
}

fn events(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each stdout line is a JSON event"))
        .collect()
}

const FAST: &str = "[timing]\nmin_spin_duration_ms = 50\ncooldown_ms = 100\n";

#[test]
fn check_config_accepts_valid_file() {
    let file = config_file(FAST);
    let out = dice(&["check-config", file.path().to_str().unwrap()]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("cooldown_ms = 100"), "{stdout}");
}

#[test]
fn check_config_rejects_invalid_file() {
    let file = config_file("[timing]\ncooldown_ms = 0\n");
    let out = dice(&["check-config", file.path().to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("timing.cooldown_ms must be > 0"), "{stderr}");
    assert!(out.stdout.is_empty());
}

#[test]
fn check_config_missing_file_exits_with_config_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.toml");
    let out = dice(&["check-config", path.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn json_log_format_reports_errors_as_json() {
    let file = config_file("[spin]\nquarter_turn_probability = 2.0\n");
    let out = dice(&[
        "--log-format",
        "json",
        "check-config",
        file.path().to_str().unwrap(),
    ]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    let report = stderr
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .find(|value| value["status"] == "error")
        .expect("error report on stderr");
    assert_eq!(report["exit_code"], 2);
    assert!(
        report["error"]
            .as_str()
            .is_some_and(|e| e.contains("quarter_turn_probability"))
    );
}

#[test]
fn counted_rolls_commit_against_provider() {
    let addr = spawn_provider();
    let file = config_file(FAST);
    let url = format!("http://{addr}/roll");
    let out = dice(&[
        "roll",
        "--config",
        file.path().to_str().unwrap(),
        "--url",
        &url,
        "--count",
        "2",
        "--seed",
        "9",
        "--format",
        "json",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let events = events(&out.stdout);
    let committed: Vec<&serde_json::Value> = events
        .iter()
        .filter(|e| e["event"] == "committed")
        .collect();
    assert_eq!(committed.len(), 2, "{events:?}");
    for event in committed {
        let face = event["face"].as_u64().unwrap();
        assert!((1..=6).contains(&face));
    }
    assert_eq!(
        events.iter().filter(|e| e["event"] == "session_started").count(),
        2
    );
}

#[test]
fn unreachable_provider_reverts_and_exits_cleanly() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let file = config_file(FAST);
    let url = format!("http://{addr}/roll");
    let out = dice(&[
        "roll",
        "--config",
        file.path().to_str().unwrap(),
        "--url",
        &url,
        "--count",
        "1",
        "--format",
        "json",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let events = events(&out.stdout);
    let reverted = events
        .iter()
        .find(|e| e["event"] == "reverted")
        .expect("failed roll is reported");
    assert_eq!(reverted["face"], 1);
    assert!(!events.iter().any(|e| e["event"] == "committed"));
}
