//! End-to-end tests for the docflow binary
//!
//! These tests run the real CLI against a mock processing server:
//! - Batch upload through to completion
//! - Per-file rejections and local validation
//! - Polling timeouts
//! - One-off status queries
//! - Configuration output

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const DOCFLOW_VARS: &[&str] = &[
    "DOCFLOW_SERVER_URL",
    "DOCFLOW_TOKEN",
    "DOCFLOW_API_TIMEOUT_SECS",
    "DOCFLOW_MAX_FILE_SIZE",
    "DOCFLOW_MAX_FILES",
    "DOCFLOW_ACCEPTED_TYPES",
    "DOCFLOW_POLL_INTERVAL_SECS",
    "DOCFLOW_POLL_MAX_ATTEMPTS",
    "DOCFLOW_POLL_INITIAL_DELAY_MS",
    "LOG_LEVEL",
    "LOG_OUTPUT",
];

/// Helper to create a file with some content in the temp dir
fn create_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let file_path = dir.path().join(name);
    fs::write(&file_path, content).expect("Failed to create test file");
    file_path
}

/// Helper to build a docflow command isolated from the host environment
fn docflow(dir: &TempDir, server: &MockServer) -> Command {
    let mut cmd = Command::cargo_bin("docflow").unwrap();
    for var in DOCFLOW_VARS {
        cmd.env_remove(var);
    }
    cmd.current_dir(dir.path())
        .env("DOCFLOW_POLL_INITIAL_DELAY_MS", "0")
        .env("DOCFLOW_POLL_INTERVAL_SECS", "0")
        .arg("--server-url")
        .arg(server.uri());
    cmd
}

async fn mount_health(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})),
        )
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, correlation_id: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/documents/status/{}", correlation_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_upload_batch_completes() {
    let mock_server = MockServer::start().await;
    mount_health(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/documents/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "message": "2 files accepted",
            "uploads": [
                {"correlationId": "cid-invoice", "filename": "invoice.pdf", "status": "queued"},
                {"correlationId": "cid-scan", "filename": "scan.png", "status": "queued"}
            ],
            "failedUploads": []
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_status(&mock_server, "cid-invoice", serde_json::json!({"status": "completed"})).await;
    mount_status(&mock_server, "cid-scan", serde_json::json!({"status": "completed"})).await;

    let dir = TempDir::new().unwrap();
    let invoice = create_file(&dir, "invoice.pdf", b"%PDF-1.7 invoice");
    let scan = create_file(&dir, "scan.png", b"\x89PNG\r\n\x1a\n");

    docflow(&dir, &mock_server)
        .arg("upload")
        .arg(&invoice)
        .arg(&scan)
        .arg("--no-progress")
        .assert()
        .success()
        .stdout(predicate::str::contains("Uploading 2 file(s)"))
        .stdout(predicate::str::contains("cid-invoice"))
        .stdout(predicate::str::contains("cid-scan"))
        .stdout(predicate::str::contains("All 2 file(s) processed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_upload_sends_bearer_token() {
    let mock_server = MockServer::start().await;
    mount_health(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/documents/upload"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "uploads": [{"correlationId": "c-1", "filename": "a.pdf"}],
            "failedUploads": []
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/documents/status/c-1"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "completed"})),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = create_file(&dir, "a.pdf", b"%PDF");

    docflow(&dir, &mock_server)
        .env("DOCFLOW_TOKEN", "s3cret")
        .arg("upload")
        .arg(&file)
        .assert()
        .success();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_upload_partial_rejection_fails_command() {
    let mock_server = MockServer::start().await;
    mount_health(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/documents/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "uploads": [{"correlationId": "c-1", "filename": "good.pdf"}],
            "failedUploads": [{"bad.pdf": "corrupt document"}]
        })))
        .mount(&mock_server)
        .await;

    mount_status(&mock_server, "c-1", serde_json::json!({"status": "completed"})).await;

    let dir = TempDir::new().unwrap();
    let good = create_file(&dir, "good.pdf", b"%PDF good");
    let bad = create_file(&dir, "bad.pdf", b"%PDF bad");

    docflow(&dir, &mock_server)
        .arg("upload")
        .arg(&good)
        .arg(&bad)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Upload rejected: corrupt document"))
        .stderr(predicate::str::contains("1 of 2 file(s) failed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unsupported_files_never_reach_server() {
    let mock_server = MockServer::start().await;
    mount_health(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/documents/upload"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let exe = create_file(&dir, "setup.exe", b"MZ");

    docflow(&dir, &mock_server)
        .arg("upload")
        .arg(&exe)
        .assert()
        .failure()
        .stdout(predicate::str::contains("setup.exe skipped"))
        .stderr(predicate::str::contains("No files to upload"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_too_many_files_rejects_whole_submission() {
    let mock_server = MockServer::start().await;
    mount_health(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/documents/upload"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "a.pdf", b"%PDF a");
    let b = create_file(&dir, "b.pdf", b"%PDF b");

    docflow(&dir, &mock_server)
        .env("DOCFLOW_MAX_FILES", "1")
        .arg("upload")
        .arg(&a)
        .arg(&b)
        .assert()
        .failure()
        .stderr(predicate::str::contains("too many files"))
        .stderr(predicate::str::contains("'b.pdf'"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_polling_times_out() {
    let mock_server = MockServer::start().await;
    mount_health(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/documents/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "uploads": [{"correlationId": "c-slow", "filename": "slow.pdf"}],
            "failedUploads": []
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/documents/status/c-slow"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "extracting"})),
        )
        .expect(3)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = create_file(&dir, "slow.pdf", b"%PDF slow");

    docflow(&dir, &mock_server)
        .env("DOCFLOW_POLL_MAX_ATTEMPTS", "3")
        .arg("upload")
        .arg(&file)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Processing timed out after 3 status checks"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remote_processing_failure() {
    let mock_server = MockServer::start().await;
    mount_health(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/documents/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "uploads": [{"correlationId": "c-broken", "filename": "locked.pdf"}],
            "failedUploads": []
        })))
        .mount(&mock_server)
        .await;

    mount_status(
        &mock_server,
        "c-broken",
        serde_json::json!({"status": "failed", "error": "PDF is password protected"}),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let file = create_file(&dir, "locked.pdf", b"%PDF locked");

    docflow(&dir, &mock_server)
        .arg("upload")
        .arg(&file)
        .assert()
        .failure()
        .stdout(predicate::str::contains("PDF is password protected"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_upload_auth_failure() {
    let mock_server = MockServer::start().await;
    mount_health(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/documents/upload"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = create_file(&dir, "a.pdf", b"%PDF");

    docflow(&dir, &mock_server)
        .arg("upload")
        .arg(&file)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Authentication required"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_upload_missing_file() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    docflow(&dir, &mock_server)
        .arg("upload")
        .arg("does-not-exist.pdf")
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_upload_server_unreachable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = create_file(&dir, "a.pdf", b"%PDF");

    docflow(&dir, &mock_server)
        .arg("upload")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot connect to processing server"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_command() {
    let mock_server = MockServer::start().await;
    mount_status(&mock_server, "cid-42", serde_json::json!({"status": "parsing"})).await;

    let dir = TempDir::new().unwrap();

    docflow(&dir, &mock_server)
        .arg("status")
        .arg("cid-42")
        .assert()
        .success()
        .stdout(predicate::str::contains("cid-42"))
        .stdout(predicate::str::contains("parsing"))
        .stdout(predicate::str::contains("40%"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_command_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/documents/status/missing"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(serde_json::json!({"message": "lookup failed"})),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();

    docflow(&dir, &mock_server)
        .arg("status")
        .arg("missing")
        .assert()
        .failure()
        .stderr(predicate::str::contains("HTTP 500"))
        .stderr(predicate::str::contains("lookup failed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_config_show_and_get() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    docflow(&dir, &mock_server)
        .env("DOCFLOW_MAX_FILES", "7")
        .arg("config")
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("max_files:"))
        .stdout(predicate::str::contains("DOCFLOW_POLL_MAX_ATTEMPTS"));

    docflow(&dir, &mock_server)
        .env("DOCFLOW_MAX_FILES", "7")
        .arg("config")
        .arg("get")
        .arg("max_files")
        .assert()
        .success()
        .stdout(predicate::str::diff("7\n"));

    docflow(&dir, &mock_server)
        .env("DOCFLOW_MAX_FILES", "many")
        .arg("config")
        .arg("show")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DOCFLOW_MAX_FILES"));
}
