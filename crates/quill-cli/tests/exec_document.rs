//! Integration tests for `exec` editing the document through tool calls.


use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use assert_cmd::cargo::cargo_bin_cmd;
use fixtures::{CHAT_COMPLETIONS_PATH, sse_response, text_response, tool_call_sse};
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Mounts a tool call on the first request and `reply` on the next one.
/// Returns the captured body of the second request.
async fn mount_tool_then_text(
    server: &MockServer,
    tool_name: &str,
    arguments: &str,
    reply: &str,
) -> Arc<Mutex<String>> {
    let call_count = Arc::new(AtomicUsize::new(0));
    let second_body = Arc::new(Mutex::new(String::new()));
    let second_body_clone = Arc::clone(&second_body);
    let first = tool_call_sse("call_1", tool_name, arguments);
    let second = fixtures::text_sse(reply);

    Mock::given(method("POST"))
        .and(path(CHAT_COMPLETIONS_PATH))
        .respond_with(move |req: &Request| {
            if call_count.fetch_add(1, Ordering::SeqCst) == 0 {
                sse_response(&first)
            } else {
                *second_body_clone.lock().unwrap() = String::from_utf8_lossy(&req.body).to_string();
                sse_response(&second)
            }
        })
        .expect(2)
        .mount(server)
        .await;

    second_body
}

#[tokio::test]
async fn test_exec_append_persists_to_document() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let doc = home.path().join("list.md");
    fs::write(&doc, "# Groceries\n\n- eggs\n\n").unwrap();
    let server = MockServer::start().await;

    let second_body = mount_tool_then_text(
        &server,
        "append_to_document",
        r#"{"content_to_add":"- buy milk"}"#,
        "Added milk.",
    )
    .await;

    cargo_bin_cmd!("quill")
        .env("QUILL_HOME", home.path())
        .env("OPENAI_API_KEY", "test-api-key")
        .env("OPENAI_BASE_URL", server.uri())
        .args([
            "--document",
            doc.to_str().unwrap(),
            "exec",
            "-p",
            "Add milk",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added milk."))
        .stderr(predicate::str::contains("append_to_document"));

    assert_eq!(
        fs::read_to_string(&doc).unwrap(),
        "# Groceries\n\n- eggs\n\n- buy milk"
    );

    let body = second_body.lock().unwrap().clone();
    assert!(body.contains("call_1"), "tool result missing: {body}");
    assert!(body.contains("revision"), "tool result missing: {body}");
}

#[tokio::test]
async fn test_exec_print_document_after_replace() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let doc = home.path().join("note.md");
    fs::write(&doc, "# Note\n\nThe sky is red.\n").unwrap();
    let server = MockServer::start().await;

    mount_tool_then_text(
        &server,
        "replace_text",
        r#"{"old_text":"red","new_text":"blue"}"#,
        "Fixed.",
    )
    .await;

    cargo_bin_cmd!("quill")
        .env("QUILL_HOME", home.path())
        .env("OPENAI_API_KEY", "test-api-key")
        .env("OPENAI_BASE_URL", server.uri())
        .args([
            "--document",
            doc.to_str().unwrap(),
            "exec",
            "--print-document",
            "-p",
            "Fix the color",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("The sky is blue."));

    assert_eq!(
        fs::read_to_string(&doc).unwrap(),
        "# Note\n\nThe sky is blue.\n"
    );
}

#[tokio::test]
async fn test_exec_text_only_leaves_document_untouched() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let doc = home.path().join("untouched.md");
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(CHAT_COMPLETIONS_PATH))
        .respond_with(text_response("Nothing to change."))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("quill")
        .env("QUILL_HOME", home.path())
        .env("OPENAI_API_KEY", "test-api-key")
        .env("OPENAI_BASE_URL", server.uri())
        .args(["--document", doc.to_str().unwrap(), "exec", "-p", "Hi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to change."));

    assert!(!doc.exists());
}

#[tokio::test]
async fn test_exec_http_error_exits_nonzero() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(CHAT_COMPLETIONS_PATH))
        .respond_with(wiremock::ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    cargo_bin_cmd!("quill")
        .env("QUILL_HOME", home.path())
        .env("OPENAI_API_KEY", "test-api-key")
        .env("OPENAI_BASE_URL", server.uri())
        .args(["exec", "-p", "Hi"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("500"));
}
