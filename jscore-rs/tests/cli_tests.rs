//! Run the `jscore` binary and check what it prints.

use std::io::Write;
use std::process::{Command, Output, Stdio};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_jscore"))
}

fn run(args: &[&str]) -> Output {
    binary().args(args).output().expect("spawn jscore")
}

fn run_stdin(args: &[&str], input: &str) -> Output {
    let mut child = binary()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn jscore");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(input.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait jscore")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn eval_flags_share_one_scope() {
    let out = run(&["-e", "x = 20*20*20", "-e", "x + 1"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "8000\n8001\n");
}

#[test]
fn set_seeds_string_variables() {
    let out = run(&["-s", "S=5", "-e", "S+1", "-e", "+S+1"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "51\n6\n");
}

#[test]
fn json_output_is_compact() {
    let out = run(&["--json", "-e", "o = {a: [1, 2]}; o"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "{\"a\":[1,2]}\n");
}

#[test]
fn errors_go_to_stderr_with_failure_status() {
    let out = run(&["-e", "if x=5 {x=7}"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("Expected ( but found x"), "{}", stderr(&out));
}

#[test]
fn logical_dialect_prints_booleans() {
    let out = run(&["--logical", "-s", "name=bob", "-e", "name", "-e", "other"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "true\nfalse\n");
}

#[test]
fn file_and_config() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("prog.js");
    std::fs::write(&script, "function sq(n) { return n * n };\nsq(cfg.n)").unwrap();
    let rc = dir.path().join("engine.rc");
    std::fs::write(&rc, "# limits\nset max_depth=64\ncfg={\"n\": 7}\n").unwrap();

    let out = run(&["-c", rc.to_str().unwrap(), "-f", script.to_str().unwrap()]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "49\n");
}

#[test]
fn repl_reads_lines_from_stdin() {
    let out = run_stdin(&[], "a = 2\n\na * 21\nnope\n'done'\n");
    assert_eq!(stdout(&out), "2\n42\ndone\n");
    assert!(stderr(&out).contains("nope is not defined"), "{}", stderr(&out));
}
