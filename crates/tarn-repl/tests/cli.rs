//! Tests for the `tarn` binary.
//!
//! These run the real executable with piped stdio, so standard input is never
//! a terminal and the console is never opened.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn tarn(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_tarn"))
        .args(args)
        .env_remove("LUA_PATH")
        .env_remove("LUA_CPATH")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn tarn");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("Failed to write stdin");
    child.wait_with_output().expect("Failed to wait for tarn")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn empty_stdin_succeeds() {
    let out = tarn(&[], "");
    assert!(out.status.success(), "stderr: {}", stderr(&out));
}

#[test]
fn stdin_script_runs() {
    let out = tarn(&[], "print('hello from stdin')");
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "hello from stdin\n");
}

#[test]
fn eval_runs_before_script() {
    let out = tarn(&["-e", "greeting = 'hi'", "-"], "print(greeting)");
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "hi\n");
}

#[test]
fn raising_eval_fails() {
    let out = tarn(&["-e", "error('bad snippet')"], "");
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("bad snippet"), "stderr: {}", stderr(&out));
}

#[test]
fn raising_script_fails_with_message() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("init.lua");
    std::fs::write(&script, "error('startup exploded')\n").unwrap();

    let out = tarn(&[script.to_str().unwrap()], "");
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("error: "), "stderr: {err}");
    assert!(err.contains("startup exploded"), "stderr: {err}");
}

#[test]
fn script_sees_arg_and_varargs() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("args.lua");
    std::fs::write(
        &script,
        "print(select('#', ...), table.concat({...}, ','), arg[0] ~= nil, arg[1])\n",
    )
    .unwrap();

    let out = tarn(&[script.to_str().unwrap(), "alpha", "beta"], "");
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "2\talpha,beta\ttrue\talpha\n");
}

#[test]
fn os_exit_sets_status() {
    let out = tarn(&["-e", "print('bye') os.exit(3)"], "print('never')");
    assert_eq!(out.status.code(), Some(3));
    assert_eq!(stdout(&out), "bye\n");
}

#[test]
fn preloaded_module_is_global() {
    let out = tarn(&["-l", "fio", "-"], "print(fio.basename('/a/b/c.lua'))");
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "c.lua\n");
}

#[test]
fn missing_module_fails() {
    let out = tarn(&["-l", "no_such_module_here"], "");
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("no_such_module_here"));
}

#[test]
fn version_prints_package() {
    let out = tarn(&["--version"], "");
    assert!(out.status.success());
    assert!(stdout(&out).starts_with("tarn "), "stdout: {}", stdout(&out));
}

#[test]
fn build_info_is_json() {
    let out = tarn(&["--build-info"], "");
    assert!(out.status.success());
    let info: serde_json::Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert!(info.get("target").is_some());
    assert!(info.get("mod_format").is_some());
}

#[test]
fn unknown_option_fails() {
    let out = tarn(&["--bogus"], "");
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("unrecognized option"));
}
