//! Integration tests for the `sluice` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const GOOD: &str = "namespace demo;
    type T = tuple<int32 a, rstring b>;
    composite Pass(input stream<T> In; output stream<T> Out) {
        graph stream<T> Out = Functor(In) { param filter: a > 0; }
    }
    composite Main {
        graph
            stream<T> Src = Beacon() { }
            stream<T> Kept = Pass(Src) { }
    }";

const BAD: &str = "namespace demo;
    type T = tuple<int32 a>;
    composite Main {
        graph stream<T> Out = Functor(Nowhere) { }
    }";

fn sluice(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sluice"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to run sluice")
}

// ────────────────────────────────────────────────────────────────────────────
// check
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_check_clean_sources() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.spl"), GOOD).unwrap();

    let output = sluice(&["check", "."], dir.path());
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("no problems"), "{}", stdout);
}

#[test]
fn test_check_reports_errors() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.spl"), BAD).unwrap();

    let output = sluice(&["check", "main.spl"], dir.path());
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("E2006"), "{}", stderr);
    assert!(stderr.contains("Nowhere"), "{}", stderr);
}

#[test]
fn test_check_json() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.spl"), BAD).unwrap();

    let output = sluice(&["check", "--json", "main.spl"], dir.path());
    assert!(!output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let items = parsed.as_array().unwrap();
    let unknown = items.iter().find(|d| d["code"] == "E2006").unwrap();
    assert_eq!(unknown["severity"], "error");
    assert_eq!(unknown["labels"][0]["file"], "main.spl");
}

#[test]
fn test_unknown_main_composite() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.spl"), GOOD).unwrap();

    let output = sluice(&["check", "--main", "demo::Missing", "main.spl"], dir.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("E2029"));
}

// ────────────────────────────────────────────────────────────────────────────
// symbols
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_symbols_lists_instance_streams() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.spl"), GOOD).unwrap();

    let output = sluice(&["symbols", "--all", "main.spl"], dir.path());
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("namespace demo"), "{}", stdout);
    assert!(stdout.contains("instance <main> of Main"), "{}", stdout);
    assert!(stdout.contains("instance Kept of Pass"), "{}", stdout);
    assert!(stdout.contains("tuple<int32 a, rstring b>"), "{}", stdout);
}
