//! End-to-end scenarios for the `vigil-splice` binary, observed through a
//! payload that reports its argument list.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const SPLICE: &str = env!("CARGO_BIN_EXE_vigil-splice");

/// Scratch path under the temp dir. Names must be unique per test; tests
/// run in parallel.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("vigil-splice-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

/// A payload that prints each of its arguments followed by `|`, making
/// argument boundaries visible.
fn reporter(name: &str) -> PathBuf {
    let path = scratch(name);
    fs::write(
        &path,
        "#!/bin/sh\nfor a in \"$@\"; do printf '%s|' \"$a\"; done\n",
    )
    .unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn arg_file(name: &str, contents: &[u8]) -> PathBuf {
    let path = scratch(name);
    fs::write(&path, contents).unwrap();
    path
}

fn splice_cmd(file: &Path, program: &Path, template: &[&str]) -> Output {
    Command::new(SPLICE)
        .arg("%")
        .arg(file)
        .arg(program)
        .args(template)
        .output()
        .unwrap()
}

#[test]
fn expands_the_placeholder_in_place() {
    let file = arg_file("two-entries.nul", b"x\0y z\0");
    let output = splice_cmd(&file, &reporter("expand.sh"), &["a", "%", "b"]);

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "a|x|y z|b|");
    assert!(output.stderr.is_empty(), "{output:?}");
}

#[test]
fn warns_when_the_placeholder_is_absent() {
    let file = arg_file("unused.nul", b"x\0");
    let output = splice_cmd(&file, &reporter("warn.sh"), &["a", "b"]);

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "a|b|");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("warning"), "stderr: {stderr}");
}

#[test]
fn empty_file_removes_the_placeholder() {
    let file = arg_file("empty.nul", b"");
    let output = splice_cmd(&file, &reporter("empty.sh"), &["a", "%", "b"]);

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "a|b|");
}

#[test]
fn hyphen_arguments_pass_through() {
    let file = arg_file("hyphen.nul", b"v\0");
    let output = splice_cmd(&file, &reporter("hyphen.sh"), &["-n", "--x", "%"]);

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "-n|--x|v|");
}

#[test]
fn unterminated_file_is_an_error() {
    let file = arg_file("broken.nul", b"broken");
    let output = splice_cmd(&file, &reporter("broken.sh"), &["a", "%"]);

    assert_eq!(output.status.code(), Some(1), "{output:?}");
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("NUL"), "stderr: {stderr}");
}

#[test]
fn missing_file_is_an_error() {
    let missing = scratch("never-written.nul");
    let output = splice_cmd(&missing, &reporter("missing.sh"), &["%"]);

    assert_eq!(output.status.code(), Some(1), "{output:?}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("read"), "stderr: {stderr}");
}

#[test]
fn exec_failure_is_reported() {
    let file = arg_file("exec-fail.nul", b"x\0");
    let output = splice_cmd(&file, Path::new("/vigil/not/a/program"), &["%"]);

    assert_eq!(output.status.code(), Some(1), "{output:?}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("exec"), "stderr: {stderr}");
}

#[test]
fn missing_operands_are_a_usage_error() {
    let output = Command::new(SPLICE).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "{output:?}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "stderr: {stderr}");
}
