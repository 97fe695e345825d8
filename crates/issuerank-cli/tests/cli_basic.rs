//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own config file and database
//! in a temporary directory.

use std::process::Command;

use chrono::{Duration, SecondsFormat, Utc};
use serde_json::Value;
use tempfile::TempDir;

struct Cli {
    dir: TempDir,
}

impl Cli {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Run a CLI command and return (stdout, stderr, exit code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = Command::new(env!("CARGO_BIN_EXE_issuerank"))
            .arg("--config")
            .arg(self.dir.path().join("config.toml"))
            .arg("--db")
            .arg(self.dir.path().join("issuerank.db"))
            .args(args)
            .env("HOME", self.dir.path())
            .env("RUST_LOG", "warn")
            .output()
            .expect("Failed to execute CLI command");

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);
        (stdout, stderr, code)
    }

    fn ok(&self, args: &[&str]) -> String {
        let (stdout, stderr, code) = self.run(args);
        assert_eq!(code, 0, "CLI command failed: {args:?}\n{stderr}");
        stdout
    }

    fn json(&self, args: &[&str]) -> Value {
        serde_json::from_str(&self.ok(args)).expect("Failed to parse JSON output")
    }
}

#[test]
fn test_report_initializes_score() {
    let cli = Cli::new();
    let reaction = cli.json(&[
        "problem", "report", "Pothole on Main St", "--category", "road", "--reported-by", "alice",
        "--id", "p1",
    ]);
    assert_eq!(reaction["reaction"], "initialized");
    assert_eq!(reaction["priority_score"], 20);

    let problem = cli.json(&["problem", "show", "p1"]);
    assert_eq!(problem["status"], "pending");
    assert_eq!(problem["voteCount"], 0);
    assert_eq!(problem["priorityScore"], 20);
}

#[test]
fn test_duplicate_vote_is_removed() {
    let cli = Cli::new();
    cli.ok(&["problem", "report", "No water", "--category", "water", "--reported-by", "a", "--id", "p1"]);

    let first = cli.json(&["vote", "cast", "p1", "--user", "bob", "--id", "v1"]);
    assert_eq!(first["reaction"], "vote_counted");
    assert_eq!(first["priority_score"], 35);

    let second = cli.json(&["vote", "cast", "p1", "--user", "bob", "--id", "v2"]);
    assert_eq!(second["reaction"], "duplicate_vote_removed");
    assert_eq!(second["kept_vote_id"], "v1");

    let problem = cli.json(&["problem", "show", "p1"]);
    assert_eq!(problem["voteCount"], 1);
}

#[test]
fn test_replayed_vote_is_not_counted_twice() {
    let cli = Cli::new();
    cli.ok(&["problem", "report", "Dark street", "--category", "electricity", "--reported-by", "a", "--id", "p1"]);
    cli.ok(&["vote", "cast", "p1", "--user", "bob", "--id", "v1"]);

    let replay = cli.json(&["vote", "replay", "v1"]);
    assert_eq!(replay["reaction"], "vote_already_counted");
    assert_eq!(cli.json(&["problem", "show", "p1"])["voteCount"], 1);
}

#[test]
fn test_status_change_notifies_through_log_dispatcher() {
    let cli = Cli::new();
    cli.ok(&["user", "register", "alice", "--token", "device-1"]);
    cli.ok(&["problem", "report", "Overflowing bin", "--category", "garbage", "--reported-by", "alice", "--id", "p1"]);

    let reaction = cli.json(&["problem", "status", "p1", "resolved"]);
    assert_eq!(reaction["reaction"], "notified");
    assert_eq!(reaction["status"], "resolved");
    assert_eq!(reaction["outcome"]["outcome"], "logged");

    let unchanged = cli.json(&["problem", "status", "p1", "resolved"]);
    assert_eq!(unchanged["reaction"], "status_unchanged");
}

#[test]
fn test_status_change_without_reporter_is_skipped() {
    let cli = Cli::new();
    cli.ok(&["problem", "report", "Blocked drain", "--category", "drainage", "--reported-by", "ghost", "--id", "p1"]);

    let reaction = cli.json(&["problem", "status", "p1", "approved"]);
    assert_eq!(reaction["reaction"], "notification_skipped");
    assert_eq!(reaction["reason"], "reporter_missing");
}

#[test]
fn test_decay_run_rescores_open_problems() {
    let cli = Cli::new();
    cli.ok(&["problem", "report", "Burst main", "--category", "water", "--reported-by", "a", "--id", "open"]);
    cli.ok(&["problem", "report", "Fixed light", "--category", "electricity", "--reported-by", "a", "--id", "done"]);
    cli.ok(&["problem", "status", "done", "resolved"]);

    let at = (Utc::now() + Duration::weeks(3) + Duration::hours(1))
        .to_rfc3339_opts(SecondsFormat::Secs, true);
    let report = cli.json(&["decay", "run", "--at", &at]);
    assert_eq!(report["examined"], 1);
    assert_eq!(report["committed"], 1);

    assert_eq!(cli.json(&["problem", "show", "open"])["priorityScore"], 24);
    assert_eq!(cli.json(&["problem", "show", "done"])["priorityScore"], 30);
}

#[test]
fn test_score_breakdown() {
    let cli = Cli::new();
    cli.ok(&["problem", "report", "Flooded road", "--category", "drainage", "--reported-by", "a", "--id", "p1"]);
    cli.ok(&["vote", "cast", "p1", "--user", "u1"]);
    cli.ok(&["vote", "cast", "p1", "--user", "u2"]);

    let out = cli.json(&["score", "p1"]);
    assert_eq!(out["storedScore"], 30);
    assert_eq!(out["breakdown"]["base"], 30);
    assert_eq!(out["breakdown"]["severity"], 2);
    assert_eq!(out["breakdown"]["total"], 30);
}

#[test]
fn test_list_json_is_ranked() {
    let cli = Cli::new();
    cli.ok(&["problem", "report", "Litter", "--category", "garbage", "--reported-by", "a", "--id", "low"]);
    cli.ok(&["problem", "report", "Outage", "--category", "electricity", "--reported-by", "a", "--id", "high"]);
    cli.ok(&["problem", "report", "Graffiti", "--category", "vandalism", "--reported-by", "a", "--id", "other"]);
    cli.ok(&["problem", "status", "low", "rejected"]);

    let all = cli.json(&["problem", "list", "--json"]);
    let ids: Vec<&str> = all.as_array().unwrap().iter().map(|p| p["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["high", "low", "other"]);

    let open = cli.json(&["problem", "list", "--open", "--json"]);
    let ids: Vec<&str> = open.as_array().unwrap().iter().map(|p| p["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["high", "other"]);
}

#[test]
fn test_unknown_problem_fails() {
    let cli = Cli::new();
    let (_, stderr, code) = cli.run(&["problem", "show", "missing"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("problem not found"));
}

#[test]
fn test_config_set_get_roundtrip() {
    let cli = Cli::new();
    assert_eq!(cli.ok(&["config", "get", "decay.interval_days"]).trim(), "7");

    cli.ok(&["config", "set", "decay.interval_days", "1"]);
    assert_eq!(cli.ok(&["config", "get", "decay.interval_days"]).trim(), "1");

    cli.ok(&["config", "reset"]);
    assert_eq!(cli.ok(&["config", "get", "decay.interval_days"]).trim(), "7");
}

#[test]
fn test_config_unknown_key_fails() {
    let cli = Cli::new();
    let (_, _, code) = cli.run(&["config", "set", "no.such.key", "1"]);
    assert_ne!(code, 0);
    let (_, _, code) = cli.run(&["config", "get", "no.such.key"]);
    assert_ne!(code, 0);
}
