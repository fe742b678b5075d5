//! Process-level tests for the command surface (C11): these drive the built binary directly,
//! exercising argument parsing and the error paths that don't require a live accessibility
//! session so they run the same on every host this is compiled on.

use assert_cmd::Command;
use std::io::Write;

fn axctl() -> Command {
    Command::cargo_bin("axctl").unwrap()
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be a single JSON value")
}

#[test]
fn help_lists_verbs() {
    let output = axctl().arg("--help").output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("Accessibility-tree inspector"));
    assert!(text.contains("read"));
    assert!(text.contains("click"));
}

#[test]
fn unknown_verb_is_a_clap_usage_error() {
    let output = axctl().arg("not-a-real-verb").output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"));
}

#[test]
fn open_without_app_or_url_fails_before_touching_the_platform() {
    // `open` validates its own args before ever calling into the provider, so this is
    // deterministic on every OS.
    let output = axctl().arg("open").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["ok"], false);
    assert_eq!(json["action"], "open");
    assert!(json["error"].as_str().unwrap().contains("requires an app name or --url"));
}

#[test]
fn drag_with_unknown_button_fails_before_touching_the_platform() {
    let output = axctl()
        .args(["drag", "--from-x", "0", "--from-y", "0", "--to-x", "10", "--to-y", "10", "--button", "banana"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["ok"], false);
    assert!(json["error"].as_str().unwrap().contains("unknown button"));
}

#[test]
fn screenshot_with_unknown_format_fails_before_capturing() {
    let output = axctl().args(["screenshot", "--format", "tiff"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["ok"], false);
    assert!(json["error"].as_str().unwrap().contains("unknown image format"));
}

#[test]
fn do_with_malformed_yaml_reports_a_yaml_error_without_touching_the_platform() {
    let mut cmd = axctl();
    cmd.arg("do");
    cmd.write_stdin("- click:\n  text: [unterminated\n");
    let output = cmd.output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["ok"], false);
    assert!(json["error"].as_str().unwrap().to_lowercase().contains("yaml"));
}

#[test]
fn do_with_no_steps_succeeds_trivially() {
    let mut cmd = axctl();
    cmd.arg("do");
    cmd.write_stdin("[]");
    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["ok"], true);
    assert_eq!(json["total"], 0);
    assert_eq!(json["completed"], 0);
}

#[test]
fn do_runs_a_sleep_only_batch_end_to_end() {
    // `sleep` never touches the provider, so a batch made only of `sleep` steps is a
    // deterministic, fast end-to-end exercise of the YAML-to-BatchResult path.
    let mut cmd = axctl();
    cmd.arg("do");
    cmd.write_stdin("- sleep:\n    ms: 1\n- sleep:\n    ms: 1\n");
    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["ok"], true);
    assert_eq!(json["total"], 2);
    assert_eq!(json["completed"], 2);
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["action"], "sleep");
    assert_eq!(results[0]["ok"], true);
}

#[test]
fn list_without_a_running_target_fails_cleanly_with_structured_output() {
    // On a host with no accessibility session (or on non-macOS) this can't succeed, but it
    // must never panic: it has to come back as exit 1 with a single well-formed JSON object.
    let output = axctl().args(["list", "--app", "definitely-not-a-real-app-xyz"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["ok"], false);
    assert!(json["error"].is_string());
}

#[test]
fn clipboard_help_documents_the_grab_alias() {
    let output = axctl().args(["clipboard", "--help"]).output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("grab"));
}
