//! Integration tests for the sql-ask binary.

use std::io::Write;

use assert_cmd::{Command, cargo::cargo_bin_cmd};
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn cmd() -> Command {
    let mut cmd = cargo_bin_cmd!("sql-ask");
    cmd.env_remove("LLM_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("LLM_PROVIDER")
        .env_remove("LLM_BASE_URL");
    cmd
}

fn schema_file() -> NamedTempFile {
    let mut schema = NamedTempFile::new().unwrap();
    writeln!(
        schema,
        "CREATE TABLE users (id INT NOT NULL, email VARCHAR(255));"
    )
    .unwrap();
    schema
}

#[test]
fn test_missing_question() {
    cmd()
        .arg("--no-color")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_blank_question() {
    cmd()
        .args(["--no-color", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_dry_run_with_schema_file() {
    let schema = schema_file();

    cmd()
        .args([
            "--schema-file",
            schema.path().to_str().unwrap(),
            "--dry-run",
            "--no-color",
            "how many users?"
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY RUN"))
        .stdout(predicate::str::contains("CREATE TABLE users"))
        .stdout(predicate::str::contains("how many users?"));
}

#[test]
fn test_dry_run_json_format() {
    let schema = schema_file();

    cmd()
        .args([
            "--schema-file",
            schema.path().to_str().unwrap(),
            "--dry-run",
            "-f",
            "json",
            "--no-color",
            "count users"
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"user\":\"count users\""));
}

#[test]
fn test_schema_file_not_found() {
    cmd()
        .args([
            "--schema-file",
            "/nonexistent/schema.sql",
            "--dry-run",
            "--no-color",
            "anything"
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_unreachable_model_is_logged_not_fatal() {
    let schema = schema_file();

    cmd()
        .args([
            "--schema-file",
            schema.path().to_str().unwrap(),
            "--provider",
            "ollama",
            "--base-url",
            "http://127.0.0.1:9",
            "--no-color",
            "how many users?"
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("pipeline aborted"));
}

#[test]
fn test_hosted_provider_without_key() {
    let schema = schema_file();

    cmd()
        .args([
            "--schema-file",
            schema.path().to_str().unwrap(),
            "--provider",
            "anthropic",
            "--no-color",
            "how many users?"
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_unknown_provider() {
    cmd()
        .args(["--provider", "gemini", "q"])
        .assert()
        .failure();
}

#[test]
fn test_help() {
    cmd().arg("--help").assert().success();
}

#[test]
fn test_version() {
    cmd().arg("--version").assert().success();
}
