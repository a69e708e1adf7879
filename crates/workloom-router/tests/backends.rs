// crates/workloom-router/tests/backends.rs
// ============================================================================
// Module: Built-In Backend Integration Tests
// Description: End-to-end tests for the HTTP text and process harness backends.
// Purpose: Exercise real sockets and real child processes.
// Dependencies: tiny_http, workloom-core, workloom-router
// ============================================================================

//! Router backend integration tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::process::Command;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use std::io::Write as _;

use workloom_core::BackendId;
use workloom_router::BackendError;
use workloom_router::BackendRegistry;
use workloom_router::HarnessBackend;
use workloom_router::HarnessRequest;
use workloom_router::HttpTextBackend;
use workloom_router::HttpTextBackendConfig;
use workloom_router::LocalProcessHarness;
use workloom_router::LocalProcessHarnessConfig;
use workloom_router::ResourceKind;
use workloom_router::RouteOptions;
use workloom_router::Router;
use workloom_router::RouterConfig;
use workloom_router::RoutingConfig;
use workloom_router::TextBackend;
use workloom_router::TextRequest;
use workloom_router::process::ProcessError;
use workloom_router::process::run_with_timeout;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Starts a one-shot completion server answering health probes and echoing
/// the prompt back as generated text.
fn spawn_completion_server() -> (String, thread::JoinHandle<()>) {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}/generate", server.server_addr());
    let handle = thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            let Ok(Some(mut request)) = server.recv_timeout(Duration::from_millis(100)) else {
                continue;
            };
            if request.url().ends_with("/health") {
                let _ = request.respond(tiny_http::Response::from_string("ok"));
                continue;
            }
            let mut body = String::new();
            let _ = std::io::Read::read_to_string(request.as_reader(), &mut body);
            let decoded: serde_json::Value = serde_json::from_str(&body).unwrap();
            let prompt = decoded["prompt"].as_str().unwrap_or_default();
            let reply = serde_json::json!({ "text": format!("echo: {prompt}") });
            let response = tiny_http::Response::from_string(reply.to_string()).with_header(
                tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                    .unwrap(),
            );
            let _ = request.respond(response);
            break;
        }
    });
    (endpoint, handle)
}

fn shell_harness(timeout_ms: u64) -> LocalProcessHarness {
    LocalProcessHarness::new(LocalProcessHarnessConfig {
        program: "sh".to_string(),
        base_args: vec!["-c".to_string()],
        timeout_ms,
        grace_ms: 200,
    })
}

// ============================================================================
// SECTION: HTTP Text Backend Tests
// ============================================================================

#[test]
fn http_backend_routes_a_generation_through_a_live_server() {
    let (endpoint, handle) = spawn_completion_server();
    let backend = HttpTextBackend::new(HttpTextBackendConfig {
        endpoint,
        model: Some("test-model".to_string()),
        timeout_ms: 5_000,
        health_path: "/health".to_string(),
    })
    .unwrap();

    let mut registry: BackendRegistry<dyn TextBackend> = BackendRegistry::new();
    registry.register(BackendId::new("live"), Arc::new(backend)).unwrap();
    let config = RouterConfig {
        fallback: vec![BackendId::new("live")],
        ..RouterConfig::default()
    };
    let router = Router::new(ResourceKind::TextGeneration, registry, config);

    let routed = router
        .generate(&TextRequest::prompt("hello"), &RouteOptions::default())
        .unwrap();
    assert_eq!(routed.backend_id, BackendId::new("live"));
    assert_eq!(routed.text, "echo: hello");
    handle.join().unwrap();
}

#[test]
fn http_backend_probe_fails_for_unreachable_endpoint() {
    let backend = HttpTextBackend::new(HttpTextBackendConfig {
        endpoint: "http://127.0.0.1:1/generate".to_string(),
        model: None,
        timeout_ms: 500,
        health_path: "/health".to_string(),
    })
    .unwrap();
    assert!(!backend.available());
}

// ============================================================================
// SECTION: Process Harness Tests
// ============================================================================

#[test]
fn harness_reports_nonzero_exit_as_an_outcome() {
    let harness = shell_harness(5_000);
    assert!(harness.available());
    let outcome = harness
        .execute(&HarnessRequest {
            tool: "printf hi >&2; exit 7".to_string(),
            args: Vec::new(),
            stdin: None,
            timeout_ms: None,
            apply: false,
        })
        .unwrap();
    assert_eq!(outcome.exit_code, 7);
    assert_eq!(outcome.stderr, "hi");
}

#[test]
fn harness_pipes_stdin_to_the_child() {
    let harness = shell_harness(5_000);
    let outcome = harness
        .execute(&HarnessRequest {
            tool: "cat".to_string(),
            args: Vec::new(),
            stdin: Some("payload".to_string()),
            timeout_ms: None,
            apply: false,
        })
        .unwrap();
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.stdout, "payload");
}

#[test]
fn harness_times_out_a_hung_child() {
    let harness = shell_harness(200);
    let err = harness
        .execute(&HarnessRequest {
            tool: "sleep 30".to_string(),
            args: Vec::new(),
            stdin: None,
            timeout_ms: None,
            apply: false,
        })
        .unwrap_err();
    assert!(matches!(err, BackendError::TimedOut { timeout_ms: 200 }));
}

// ============================================================================
// SECTION: Timed Execution Tests
// ============================================================================

#[test]
fn stdin_heavy_payload_does_not_defeat_the_timeout() {
    // Larger than any pipe buffer, against a child that never reads it.
    let payload = "x".repeat(4 * 1024 * 1024);
    let mut command = Command::new("sh");
    command.arg("-c").arg("sleep 30");

    let started = Instant::now();
    let err = run_with_timeout(
        &mut command,
        Some(&payload),
        Duration::from_millis(200),
        Duration::from_millis(100),
    )
    .unwrap_err();

    assert!(matches!(err, ProcessError::TimedOut { timeout_ms: 200 }));
    assert!(started.elapsed() < Duration::from_secs(5), "timeout did not fire promptly");
}

#[test]
fn child_exiting_without_reading_stdin_reports_its_own_outcome() {
    let payload = "y".repeat(1024 * 1024);
    let mut command = Command::new("sh");
    command.arg("-c").arg("exit 5");

    let output = run_with_timeout(
        &mut command,
        Some(&payload),
        Duration::from_secs(10),
        Duration::from_millis(100),
    )
    .unwrap();
    assert_eq!(output.exit_code, 5);
}

// ============================================================================
// SECTION: Config Loading Tests
// ============================================================================

#[test]
fn routing_config_loads_from_a_file_on_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[harness]\ndefault_profile = \"tools\"\n[harness.profiles]\ntools = [\"cli\"]"
    )
    .unwrap();
    let config = RoutingConfig::load(file.path()).unwrap();
    assert_eq!(config.harness.default_profile, "tools");
    assert_eq!(config.harness.profiles["tools"], vec![BackendId::new("cli")]);
}

#[test]
fn harness_is_unavailable_when_the_program_is_missing() {
    let harness = LocalProcessHarness::new(LocalProcessHarnessConfig {
        program: "definitely-not-a-real-binary-name".to_string(),
        base_args: Vec::new(),
        timeout_ms: 1_000,
        grace_ms: 200,
    });
    assert!(!harness.available());
}
