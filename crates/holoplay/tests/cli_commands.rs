#![cfg(feature = "cli")]

use std::process::Command;

fn holoplay() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_holoplay"));
    command.env_remove("HOLOPLAY_URL").arg("--log-level").arg("off");
    command
}

#[test]
fn version_prints_package_version() {
    let output = holoplay().arg("version").output().expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("holoplay {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn extended_version_as_json() {
    let output = holoplay()
        .args(["--format", "json", "version", "--extended"])
        .output()
        .expect("version should run");
    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be json");
    assert_eq!(json["subprotocol"], "rep.sp.nanomsg.org");
    assert_eq!(json["default_url"], "ws://localhost:11222/driver");
}

#[test]
fn send_rejects_bad_json_before_connecting() {
    let output = holoplay()
        .args(["send", "--json", "{nope", "--url", "ws://127.0.0.1:1/driver"])
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--json is not valid JSON"));
}

#[test]
fn unreachable_driver_is_transport_error() {
    let output = holoplay()
        .args(["info", "--url", "ws://127.0.0.1:1/driver", "--timeout", "3s"])
        .output()
        .expect("info should run");
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("connect failed"));
}

#[test]
fn show_reports_missing_file() {
    let output = holoplay()
        .args(["show", "/nonexistent/quilt.png"])
        .output()
        .expect("show should run");
    assert_eq!(output.status.code(), Some(60));
}
