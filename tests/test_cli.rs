//! Tests for the `pagesim` binary

use std::path::Path;
use std::process::{Command, Output};

fn pagesim(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pagesim"))
        .args(args)
        .current_dir(dir)
        .env_remove("PAGESIM_LOG")
        .output()
        .expect("failed to run pagesim")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_read_faults_then_reuses_mapping() {
    let dir = tempfile::tempdir().unwrap();

    let output = pagesim(dir.path(), &["read", "4096"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("page fault: page 1 loaded into frame 0"), "{}", text);
    assert!(text.contains("physical address 0, value 0"), "{}", text);

    // Second run finds the page resident
    let output = pagesim(dir.path(), &["read", "0x1001"]);
    let text = stdout(&output);
    assert!(!text.contains("page fault"), "{}", text);
    assert!(text.contains("physical address 1, value 0"), "{}", text);

    assert!(dir.path().join("page_table.dat").is_file());
    assert!(dir.path().join("physical_memory.dat").is_file());
    assert!(dir.path().join("pages/page_1.bin").is_file());
}

#[test]
fn test_write_then_read() {
    let dir = tempfile::tempdir().unwrap();

    let output = pagesim(dir.path(), &["write", "0", "65"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("wrote 65 to physical address 0"));

    let output = pagesim(dir.path(), &["read", "0"]);
    assert!(stdout(&output).contains("value 65"));
}

#[test]
fn test_sync_and_status() {
    let dir = tempfile::tempdir().unwrap();
    pagesim(dir.path(), &["write", "8192", "7"]);

    let output = pagesim(dir.path(), &["sync"]);
    assert!(stdout(&output).contains("synced 1 resident pages"));
    let page = std::fs::read(dir.path().join("pages/page_2.bin")).unwrap();
    assert_eq!(page[0], 7);

    let output = pagesim(dir.path(), &["status"]);
    let text = stdout(&output);
    assert!(text.contains("resident pages: 1"), "{}", text);
    assert!(text.contains("free frames:    63 of 64"), "{}", text);
    assert!(text.contains("page 2 -> frame 0"), "{}", text);
}

#[test]
fn test_state_dir_option() {
    let dir = tempfile::tempdir().unwrap();
    let output = pagesim(dir.path(), &["--state-dir", "vm", "read", "0"]);
    assert!(output.status.success());
    assert!(dir.path().join("vm/page_table.dat").is_file());
    assert!(dir.path().join("vm/pages/page_0.bin").is_file());
}

#[test]
fn test_config_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("pagesim.toml"),
        "state_dir = \"snap\"\nbacking_dir = \"backing\"\n",
    )
    .unwrap();

    let output = pagesim(dir.path(), &["write", "12288", "1"]);
    assert!(output.status.success());
    assert!(dir.path().join("snap/physical_memory.dat").is_file());
    assert!(dir.path().join("backing/page_3.bin").is_file());
}

#[test]
fn test_out_of_range_address_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = pagesim(dir.path(), &["read", "1048576"]);

    assert_eq!(output.status.code(), Some(1));
    let err = String::from_utf8_lossy(&output.stderr);
    assert!(err.contains("out of range"), "{}", err);
    assert!(!dir.path().join("page_table.dat").exists());
}

#[test]
fn test_usage_errors() {
    let dir = tempfile::tempdir().unwrap();

    for args in [
        &["write", "0"][..],
        &["write", "0", "300"][..],
        &["erase", "0"][..],
        &["read", "zero"][..],
    ] {
        let output = pagesim(dir.path(), args);
        assert!(!output.status.success(), "{:?} should fail", args);
        assert_ne!(output.status.code(), Some(1), "{:?}", args);
    }
}

#[test]
fn test_bad_log_level() {
    let dir = tempfile::tempdir().unwrap();
    let output = pagesim(dir.path(), &["--log-level", "loud", "status"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid log level"));
}
