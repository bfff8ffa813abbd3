#![allow(deprecated)]
use assert_cmd::Command;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

fn backlog(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("backlog").unwrap();
    cmd.current_dir(dir.path())
        .env("BACKLOG_ROOT", dir.path())
        .env_remove("BACKLOG_LOG_FILE")
        .env_remove("RUST_LOG");
    cmd
}

/// Config pointing every role at a local mock server, one attempt per call.
fn write_mock_config(dir: &TempDir, base_url: &str, max_iterations: u32) {
    let yaml = format!(
        r#"version: 1
convergence:
  max_iterations: {max_iterations}
generation:
  provider: mock
  providers:
    mock:
      type: ollama
      base_url: {base_url}
      model: test-model
  retry:
    max_attempts: 1
    base_delay_ms: 1
    timeout_secs: 10
"#
    );
    std::fs::create_dir_all(dir.path().join(".backlog")).unwrap();
    std::fs::write(dir.path().join(".backlog/config.yaml"), yaml).unwrap();
}

fn chat_reply(content: &str) -> String {
    json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
    .to_string()
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

const BACKLOG_B0: &str =
    r#"{"product_backlog":{"epics":[{"epic_name":"Accounts","user_stories":[{"story_id":"US-1","title":"Sign up"}]}]}}"#;
const EMPTY_REVIEW: &str = r#"{"feedback":{"required_changes":[]}}"#;

fn mock_llm(server: &mut Server) {
    server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::Regex("PROJECT NAME:".into()))
        .with_header("content-type", "application/json")
        .with_body(chat_reply("1. PROJECT OVERVIEW\nA customer portal."))
        .create();
    server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::Regex("INPUT DOCUMENT:".into()))
        .with_header("content-type", "application/json")
        .with_body(chat_reply(&format!("```json\n{BACKLOG_B0}\n```")))
        .create();
    server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::Regex("FEEDBACK STRUCTURE:".into()))
        .with_header("content-type", "application/json")
        .with_body(chat_reply(EMPTY_REVIEW))
        .create();
}

// ---------------------------------------------------------------------------
// backlog init
// ---------------------------------------------------------------------------

#[test]
fn init_writes_default_config() {
    let dir = TempDir::new().unwrap();
    backlog(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: .backlog/config.yaml"));

    let config = std::fs::read_to_string(dir.path().join(".backlog/config.yaml")).unwrap();
    assert!(config.contains("provider: deepseek"));
    assert!(config.contains("DEEPSEEK_API_KEY"));
    assert!(config.contains("type: ollama"));
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    backlog(&dir).arg("init").assert().success();
    std::fs::write(dir.path().join(".backlog/config.yaml"), "version: 1\n").unwrap();
    backlog(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:"));
    let config = std::fs::read_to_string(dir.path().join(".backlog/config.yaml")).unwrap();
    assert_eq!(config, "version: 1\n");
}

// ---------------------------------------------------------------------------
// backlog config
// ---------------------------------------------------------------------------

#[test]
fn commands_require_init() {
    let dir = TempDir::new().unwrap();
    backlog(&dir)
        .args(["show", "backlog"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn config_validate_accepts_local_provider() {
    let dir = TempDir::new().unwrap();
    write_mock_config(&dir, "http://127.0.0.1:9", 5);
    backlog(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_rejects_unknown_provider() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".backlog")).unwrap();
    std::fs::write(
        dir.path().join(".backlog/config.yaml"),
        "generation:\n  provider: nowhere\n",
    )
    .unwrap();
    backlog(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("nowhere"));
}

#[test]
fn config_show_json() {
    let dir = TempDir::new().unwrap();
    write_mock_config(&dir, "http://127.0.0.1:9", 7);
    let output = backlog(&dir)
        .args(["--json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value = stdout_json(&output);
    assert_eq!(value["convergence"]["max_iterations"], 7);
    assert_eq!(value["generation"]["providers"]["mock"]["type"], "ollama");
}

// ---------------------------------------------------------------------------
// backlog resume / show on an empty store
// ---------------------------------------------------------------------------

#[test]
fn resume_without_backlog_fails() {
    let dir = TempDir::new().unwrap();
    write_mock_config(&dir, "http://127.0.0.1:9", 5);
    let output = backlog(&dir).args(["--json", "resume"]).output().unwrap();
    assert!(!output.status.success());
    let value = stdout_json(&output);
    assert_eq!(value["status"], "failed");
    assert_eq!(value["error"], "no backlog found to continue");
    assert!(String::from_utf8_lossy(&output.stderr).contains("error: no backlog found to continue"));
}

#[test]
fn show_backlog_without_any_fails() {
    let dir = TempDir::new().unwrap();
    write_mock_config(&dir, "http://127.0.0.1:9", 5);
    backlog(&dir)
        .args(["show", "backlog"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no backlog found"));
}

#[test]
fn run_requires_name_and_requirements() {
    let dir = TempDir::new().unwrap();
    write_mock_config(&dir, "http://127.0.0.1:9", 5);
    backlog(&dir)
        .args(["run", "--description", "only a description"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// End to end against a mocked completion endpoint
// ---------------------------------------------------------------------------

#[test]
fn run_then_resume_against_mock_llm() {
    let mut server = Server::new();
    mock_llm(&mut server);
    let dir = TempDir::new().unwrap();
    write_mock_config(&dir, &server.url(), 5);

    let output = backlog(&dir)
        .args([
            "--json",
            "run",
            "--name",
            "P1",
            "--requirements",
            "Customers can sign up",
            "--tech-stack",
            r#"{"backend": "Rust"}"#,
        ])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let run = stdout_json(&output);
    assert_eq!(run["status"], "success");
    assert_eq!(run["project_name"], "P1");
    assert_eq!(run["rounds_run"], 1);
    assert_eq!(run["feedback_cycles"], 1);
    assert_eq!(run["total_feedback_items"], 0);
    assert_eq!(run["termination"], "converged");
    let product_backlog = run["product_backlog"].as_str().unwrap();
    assert!(product_backlog.contains("US-1"));
    let backlog_id = run["backlog_id"].as_u64().unwrap();

    // Resuming picks up after round 1.
    let output = backlog(&dir).args(["--json", "resume"]).output().unwrap();
    assert!(output.status.success());
    let resumed = stdout_json(&output);
    assert_eq!(resumed["backlog_id"], backlog_id);
    assert_eq!(resumed["resumed_after_round"], 1);
    assert_eq!(resumed["feedback_cycles"], 2);

    // Both review rounds are on record for the project.
    let output = backlog(&dir)
        .args(["--json", "feedback", "list", "--project", "1", "--status", "open"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let records = stdout_json(&output);
    let rounds: Vec<u64> = records
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["iteration_id"].as_u64().unwrap())
        .collect();
    assert_eq!(rounds, vec![1, 2]);

    backlog(&dir)
        .args(["show", "backlog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"story_id\": \"US-1\""));

    backlog(&dir)
        .args(["show", "project", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Project 1: P1"))
        .stdout(predicate::str::contains("A customer portal."));
}

#[test]
fn run_reports_provider_failure() {
    let mut server = Server::new();
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(500)
        .with_body("upstream unavailable")
        .create();
    let dir = TempDir::new().unwrap();
    write_mock_config(&dir, &server.url(), 5);

    let output = backlog(&dir)
        .args(["--json", "run", "--name", "P1", "--requirements", "r"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let value = stdout_json(&output);
    assert_eq!(value["status"], "failed");
    assert_eq!(value["kind"], "generation");
}

#[test]
fn run_reads_project_from_input_file() {
    let mut server = Server::new();
    mock_llm(&mut server);
    let dir = TempDir::new().unwrap();
    write_mock_config(&dir, &server.url(), 5);
    let input = dir.path().join("project.yaml");
    std::fs::write(
        &input,
        "project_name: Portal\ndescription: d\nuser_requirements: Customers can sign up\ntech_stack:\n  frontend: React\n",
    )
    .unwrap();

    let output = backlog(&dir)
        .args(["--json", "run", "--input"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["project_name"], "Portal");
}

#[test]
fn log_file_receives_run_logs() {
    let mut server = Server::new();
    mock_llm(&mut server);
    let dir = TempDir::new().unwrap();
    write_mock_config(&dir, &server.url(), 5);
    let log = dir.path().join("run.log");

    backlog(&dir)
        .args(["--json", "--log-file"])
        .arg(&log)
        .args(["run", "--name", "P1", "--requirements", "r"])
        .assert()
        .success();
    let text = std::fs::read_to_string(&log).unwrap();
    assert!(text.contains("starting run"));
    assert!(text.contains("backlog converged"));
}
