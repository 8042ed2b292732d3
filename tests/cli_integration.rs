//! CLI integration tests using assert_cmd to exercise the actual binary.

use std::path::Path;
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn traybridge(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("traybridge").unwrap();
    cmd.env("TRAYBRIDGE_DIR", root);
    cmd
}

fn start_session(root: &Path, session_id: &str) {
    traybridge(root)
        .args(["hook", "session-start"])
        .write_stdin(format!(
            r#"{{"session_id": "{session_id}", "cwd": "/tmp/demo"}}"#
        ))
        .assert()
        .success();
}

// ---------------------------------------------------------------------------
// Session lifecycle hooks
// ---------------------------------------------------------------------------

#[test]
fn cli_session_start_registers_and_sessions_lists_it() {
    let tmp = TempDir::new().unwrap();
    start_session(tmp.path(), "sess-1");

    assert!(tmp.path().join("sessions/sess-1/info.json").exists());
    assert!(tmp.path().join("sessions/sess-1/pending").is_dir());

    traybridge(tmp.path())
        .arg("sessions")
        .assert()
        .success()
        .stdout(predicate::str::contains("sess-1"))
        .stdout(predicate::str::contains("Status: working"));
}

#[test]
fn cli_session_end_removes_the_subtree() {
    let tmp = TempDir::new().unwrap();
    start_session(tmp.path(), "sess-2");

    traybridge(tmp.path())
        .args(["hook", "session-end"])
        .write_stdin(r#"{"session_id": "sess-2"}"#)
        .assert()
        .success();

    assert!(!tmp.path().join("sessions/sess-2").exists());
    traybridge(tmp.path())
        .arg("sessions")
        .assert()
        .success()
        .stdout(predicate::str::contains("No tracked sessions."));
}

#[test]
fn cli_traversal_session_id_registers_nothing() {
    let tmp = TempDir::new().unwrap();

    traybridge(tmp.path())
        .args(["hook", "session-start"])
        .write_stdin(r#"{"session_id": "../evil", "cwd": "/tmp"}"#)
        .assert()
        .success();

    assert!(!tmp.path().join("evil").exists());
    let sessions = std::fs::read_dir(tmp.path().join("sessions"))
        .map(|d| d.count())
        .unwrap_or(0);
    assert_eq!(sessions, 0);
}

#[test]
fn cli_activity_after_stop_keeps_done() {
    let tmp = TempDir::new().unwrap();
    start_session(tmp.path(), "sess-3");

    traybridge(tmp.path())
        .args(["hook", "stop"])
        .write_stdin(r#"{"session_id": "sess-3"}"#)
        .assert()
        .success();
    traybridge(tmp.path())
        .args(["hook", "activity"])
        .write_stdin(r#"{"session_id": "sess-3", "tool_name": "Bash"}"#)
        .assert()
        .success();

    traybridge(tmp.path())
        .arg("sessions")
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: done"));
}

#[test]
fn cli_prompt_restarts_a_done_session() {
    let tmp = TempDir::new().unwrap();
    start_session(tmp.path(), "sess-4");

    traybridge(tmp.path())
        .args(["hook", "stop"])
        .write_stdin(r#"{"session_id": "sess-4"}"#)
        .assert()
        .success();
    traybridge(tmp.path())
        .args(["hook", "prompt"])
        .write_stdin(r#"{"session_id": "sess-4", "prompt": "next task"}"#)
        .assert()
        .success();

    traybridge(tmp.path())
        .arg("sessions")
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: working"));
}

#[test]
fn cli_hook_with_garbage_stdin_exits_clean() {
    let tmp = TempDir::new().unwrap();

    // Status hook: swallow the error, proceed.
    traybridge(tmp.path())
        .args(["hook", "stop"])
        .write_stdin("not json at all")
        .assert()
        .code(0);

    // Blocking hook: fall back to the native prompt.
    traybridge(tmp.path())
        .args(["hook", "permission"])
        .write_stdin("not json at all")
        .assert()
        .code(1);
}

// ---------------------------------------------------------------------------
// Permission handshake
// ---------------------------------------------------------------------------

#[test]
fn cli_permission_for_unregistered_session_falls_back() {
    let tmp = TempDir::new().unwrap();

    traybridge(tmp.path())
        .args(["hook", "permission"])
        .write_stdin(r#"{"session_id": "nobody", "tool_name": "Bash", "tool_input": {"command": "ls"}}"#)
        .assert()
        .code(1);
}

#[test]
fn cli_permission_denied_via_queue_round_trip() {
    let tmp = TempDir::new().unwrap();
    start_session(tmp.path(), "sess-5");

    // Answer as the tray would: watch for the pending file, then deny it.
    let root = tmp.path().to_path_buf();
    let answerer = std::thread::spawn(move || {
        let pending_dir = root.join("sessions/sess-5/pending");
        for _ in 0..200 {
            if let Ok(entries) = std::fs::read_dir(&pending_dir) {
                if let Some(entry) = entries.filter_map(|e| e.ok()).find(|e| {
                    e.path().extension().and_then(|x| x.to_str()) == Some("json")
                }) {
                    let id = entry
                        .path()
                        .file_stem()
                        .unwrap()
                        .to_string_lossy()
                        .into_owned();
                    traybridge(&root)
                        .args(["deny", &id])
                        .assert()
                        .success()
                        .stderr(predicate::str::contains("denied"));
                    return;
                }
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        panic!("no pending request ever appeared");
    });

    traybridge(tmp.path())
        .args(["hook", "permission"])
        .write_stdin(
            r#"{"session_id": "sess-5", "tool_name": "Bash", "tool_input": {"command": "rm -rf target"}}"#,
        )
        .timeout(Duration::from_secs(30))
        .assert()
        .code(0)
        .stdout(predicate::str::contains(r#""permissionDecision":"deny""#));
    answerer.join().unwrap();

    // Handshake residue is gone and the session settled back to working.
    let pending = std::fs::read_dir(tmp.path().join("sessions/sess-5/pending"))
        .unwrap()
        .count();
    assert_eq!(pending, 0);
    let responses = std::fs::read_dir(tmp.path().join("responses"))
        .unwrap()
        .count();
    assert_eq!(responses, 0);
    traybridge(tmp.path())
        .arg("sessions")
        .assert()
        .stdout(predicate::str::contains("Status: working"));
}

// ---------------------------------------------------------------------------
// Elicitation and the answer command
// ---------------------------------------------------------------------------

#[test]
fn cli_elicitation_publishes_and_answer_merges() {
    let tmp = TempDir::new().unwrap();
    start_session(tmp.path(), "sess-6");

    // Default (terminal) mode: the hook proceeds and leaves the request up.
    traybridge(tmp.path())
        .args(["hook", "elicitation"])
        .write_stdin(
            r#"{"session_id": "sess-6", "tool_name": "AskUserQuestion",
                "tool_input": {"questions": [
                    {"question": "Deploy?", "options": ["Yes", "No"]}
                ]}}"#,
        )
        .assert()
        .code(0);

    let queue_output = traybridge(tmp.path())
        .arg("queue")
        .assert()
        .success()
        .stdout(predicate::str::contains("Kind: elicitation"))
        .stdout(predicate::str::contains("Deploy?"))
        .get_output()
        .stdout
        .clone();

    let text = String::from_utf8(queue_output).unwrap();
    let id = text
        .lines()
        .find_map(|l| l.strip_prefix("ID: "))
        .unwrap()
        .to_string();

    traybridge(tmp.path())
        .args(["answer", &id, "--question", "0", "--option", "Yes"])
        .assert()
        .success()
        .stderr(predicate::str::contains("answered question 0"));

    let response: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(tmp.path().join(format!("responses/{id}.json"))).unwrap(),
    )
    .unwrap();
    assert_eq!(response["answers"]["0"], "Yes");

    // An option that was never offered is rejected.
    traybridge(tmp.path())
        .args(["answer", &id, "--question", "0", "--option", "Maybe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an option"));
}

#[test]
fn cli_elicitation_cleanup_clears_requests() {
    let tmp = TempDir::new().unwrap();
    start_session(tmp.path(), "sess-7");

    traybridge(tmp.path())
        .args(["hook", "elicitation"])
        .write_stdin(
            r#"{"session_id": "sess-7", "tool_name": "AskUserQuestion",
                "tool_input": {"questions": [{"question": "Pick", "options": ["A"]}]}}"#,
        )
        .assert()
        .code(0);

    traybridge(tmp.path())
        .args(["hook", "elicitation-cleanup"])
        .write_stdin(r#"{"session_id": "sess-7", "tool_name": "AskUserQuestion"}"#)
        .assert()
        .code(0);

    traybridge(tmp.path())
        .arg("queue")
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending requests."));
    traybridge(tmp.path())
        .arg("sessions")
        .assert()
        .stdout(predicate::str::contains("Status: working"));
}

// ---------------------------------------------------------------------------
// Queue commands on bad ids
// ---------------------------------------------------------------------------

#[test]
fn cli_approve_unknown_id_fails() {
    let tmp = TempDir::new().unwrap();

    traybridge(tmp.path())
        .args(["approve", "no-such-id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no pending request"));
}

// ---------------------------------------------------------------------------
// install-hooks
// ---------------------------------------------------------------------------

#[test]
fn cli_install_hooks_merges_and_preserves_settings() {
    let tmp = TempDir::new().unwrap();
    let settings_path = tmp.path().join("settings.json");
    std::fs::write(
        &settings_path,
        r#"{"model": "opus", "hooks": {"PreCompact": [{"matcher": "", "hooks": []}]}}"#,
    )
    .unwrap();

    traybridge(tmp.path())
        .args(["install-hooks", "--settings"])
        .arg(&settings_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("hooks merged"));

    let settings: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&settings_path).unwrap()).unwrap();
    assert_eq!(settings["model"], "opus");
    assert!(settings["hooks"]["PreCompact"].is_array());
    for event in [
        "SessionStart",
        "SessionEnd",
        "UserPromptSubmit",
        "PreToolUse",
        "PostToolUse",
        "PermissionRequest",
        "Notification",
        "Stop",
    ] {
        assert!(
            settings["hooks"][event].is_array(),
            "missing hook event {event}"
        );
    }
    let permission_cmd = settings["hooks"]["PermissionRequest"][0]["hooks"][0]["command"]
        .as_str()
        .unwrap();
    assert!(permission_cmd.ends_with("hook permission"));
}

#[test]
fn cli_install_hooks_refuses_malformed_settings() {
    let tmp = TempDir::new().unwrap();
    let settings_path = tmp.path().join("settings.json");
    std::fs::write(&settings_path, "{half a json").unwrap();

    traybridge(tmp.path())
        .args(["install-hooks", "--settings"])
        .arg(&settings_path)
        .assert()
        .failure();

    // The unreadable file was left untouched.
    assert_eq!(
        std::fs::read_to_string(&settings_path).unwrap(),
        "{half a json"
    );
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn cli_config_prints_and_sets_elicitation_mode() {
    let tmp = TempDir::new().unwrap();

    traybridge(tmp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Elicitation mode: Terminal"));

    traybridge(tmp.path())
        .args(["config", "--elicitation-mode", "menubar"])
        .assert()
        .success()
        .stderr(predicate::str::contains("elicitation mode set"));

    traybridge(tmp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Elicitation mode: Menubar"));
}
