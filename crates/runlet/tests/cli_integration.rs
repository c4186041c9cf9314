//! End-to-end tests for the runlet binary.
//!
//! These drive the real process: stdin/argument plumbing, the one-line
//! stdout contract, the `Error: <message>` stderr contract, and exit
//! statuses for every fault class.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

/// Get a command for the runlet binary.
fn runlet() -> Command {
    Command::cargo_bin("runlet").unwrap()
}

fn script_file(code: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(code.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// ─────────────────────────────────────────────────────────────────────────────
// Help
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    runlet()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("invocation harness"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_version_displays() {
    runlet()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("runlet"));
}

// ─────────────────────────────────────────────────────────────────────────────
// File mode
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_return_input_roundtrip() {
    let script = script_file("return input");
    runlet()
        .arg("run")
        .arg(script.path())
        .write_stdin(r#"{"a":[1,2,3]}"#)
        .assert()
        .success()
        .stdout("{\"a\":[1,2,3]}\n")
        .stderr("");
}

#[test]
fn test_input_flag_instead_of_stdin() {
    let script = script_file("return input");
    runlet()
        .arg("run")
        .arg(script.path())
        .args(["--input", "[true,null]"])
        .assert()
        .success()
        .stdout("[true,null]\n");
}

#[test]
fn test_input_flag_is_inline_json_text() {
    // The flag carries the document itself, not a path to one: a file name
    // is rejected as malformed JSON rather than opened.
    let script = script_file("return input");
    let doc = script_file(r#"{"name":"Ada"}"#);
    runlet()
        .arg("run")
        .arg(script.path())
        .arg("--input")
        .arg(doc.path())
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("Error: invalid input JSON"));
}

#[test]
fn test_input_flag_blank_defaults_to_empty_object() {
    let script = script_file("return input");
    runlet()
        .arg("run")
        .arg(script.path())
        .args(["--input", ""])
        .assert()
        .success()
        .stdout("{}\n");
}

#[test]
fn test_hello_example() {
    let script = script_file(r#"return {"message": "Hello " + input["name"]}"#);
    runlet()
        .arg("run")
        .arg(script.path())
        .write_stdin(r#"{"name":"Ada"}"#)
        .assert()
        .success()
        .stdout("{\"message\":\"Hello Ada\"}\n");
}

#[test]
fn test_result_binding_without_return() {
    let script = script_file("result = input");
    runlet()
        .arg("run")
        .arg(script.path())
        .write_stdin("42")
        .assert()
        .success()
        .stdout("42\n");
}

#[test]
fn test_empty_input_defaults_to_empty_object() {
    let script = script_file("return event");
    runlet()
        .arg("run")
        .arg(script.path())
        .write_stdin("")
        .assert()
        .success()
        .stdout("{}\n");
}

#[test]
fn test_no_result_is_silent_success() {
    let script = script_file("x = 1");
    runlet()
        .arg("run")
        .arg(script.path())
        .write_stdin("{}")
        .assert()
        .success()
        .stdout("")
        .stderr("");
}

#[test]
fn test_print_side_channel_precedes_result() {
    let script = script_file("print(\"working\")\nreturn 1");
    runlet()
        .arg("run")
        .arg(script.path())
        .write_stdin("{}")
        .assert()
        .success()
        .stdout("working\n1\n");
}

// ─────────────────────────────────────────────────────────────────────────────
// Fault paths
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_syntax_error_exits_1() {
    let script = script_file("return ][");
    runlet()
        .arg("run")
        .arg(script.path())
        .write_stdin("{}")
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(predicate::str::is_match("^Error: .*").unwrap());
}

#[test]
fn test_runtime_fault_exits_1() {
    let script = script_file("return 1 / 0");
    runlet()
        .arg("run")
        .arg(script.path())
        .write_stdin("{}")
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("Error: ").and(predicate::str::contains("division by zero")));
}

#[test]
fn test_malformed_input_exits_1_without_running_code() {
    // The print must not execute: decode happens before the script runs.
    let script = script_file("print(\"ran\")");
    runlet()
        .arg("run")
        .arg(script.path())
        .write_stdin("{malformed")
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("Error: invalid input JSON"));
}

#[test]
fn test_unserializable_result_is_silent_success() {
    let script = script_file("a = []\npush(a, a)\nreturn a");
    runlet()
        .arg("run")
        .arg(script.path())
        .write_stdin("{}")
        .assert()
        .success()
        .stdout("");
}

#[test]
fn test_missing_script_file_exits_1() {
    runlet()
        .arg("run")
        .arg("/nonexistent/script.rl")
        .args(["--input", "{}"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: failed to read script"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Payload mode
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_payload_mode() {
    runlet()
        .arg("run")
        .write_stdin(r#"{"code": "return input.n * 2", "input": "{\"n\": 21}"}"#)
        .assert()
        .success()
        .stdout("42\n");
}

#[test]
fn test_payload_blank_input_defaults() {
    runlet()
        .arg("run")
        .write_stdin(r#"{"code": "return input"}"#)
        .assert()
        .success()
        .stdout("{}\n");
}

#[test]
fn test_malformed_payload_exits_1() {
    runlet()
        .arg("run")
        .write_stdin("not a payload")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: invalid payload"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Check mode
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_check_valid_script() {
    let script = script_file("return 1 + 1");
    runlet()
        .arg("check")
        .arg(script.path())
        .assert()
        .success()
        .stdout("")
        .stderr("");
}

#[test]
fn test_check_invalid_script() {
    let script = script_file("return ][");
    runlet()
        .arg("check")
        .arg(script.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: syntax error"));
}

#[test]
fn test_check_does_not_execute() {
    // A script that would fault at runtime still checks clean.
    let script = script_file("return 1 / 0");
    runlet().arg("check").arg(script.path()).assert().success();
}
