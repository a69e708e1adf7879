// crates/workloom-router/src/tests.rs
// ============================================================================
// Module: Router Unit Tests
// Description: In-crate tests for candidate resolution and routing walks.
// Purpose: Verify fallback, probe, and provenance semantics with fakes.
// Dependencies: workloom-core
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use workloom_core::BackendId;

use crate::config::RouterConfig;
use crate::config::RoutingConfig;
use crate::registry::BackendRegistry;
use crate::router::RouteError;
use crate::router::RouteOptions;
use crate::router::Router;
use crate::runtime::BackendError;
use crate::runtime::EmbeddingBackend;
use crate::runtime::EmbeddingRequest;
use crate::runtime::HarnessBackend;
use crate::runtime::HarnessOutcome;
use crate::runtime::HarnessRequest;
use crate::runtime::ResourceKind;
use crate::runtime::TextBackend;
use crate::runtime::TextRequest;

// ============================================================================
// SECTION: Fakes
// ============================================================================

/// Text backend fake with scripted availability and result.
struct FakeText {
    /// Availability probe result.
    available: bool,
    /// Generation result: text on success, error message on failure.
    result: Result<String, String>,
    /// Number of probe invocations observed.
    probes: AtomicUsize,
    /// Number of generate invocations observed.
    calls: AtomicUsize,
}

impl FakeText {
    fn ok(text: &str) -> Arc<Self> {
        Arc::new(Self {
            available: true,
            result: Ok(text.to_string()),
            probes: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        })
    }

    fn broken(message: &str) -> Arc<Self> {
        Arc::new(Self {
            available: true,
            result: Err(message.to_string()),
            probes: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        })
    }

    fn offline() -> Arc<Self> {
        Arc::new(Self {
            available: false,
            result: Err("offline".to_string()),
            probes: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        })
    }
}

impl TextBackend for FakeText {
    fn available(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.available
    }

    fn generate(&self, _request: &TextRequest) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(BackendError::Call)
    }
}

/// Embedding backend fake returning fixed vectors.
struct FakeEmbed {
    /// Availability probe result.
    available: bool,
    /// True when the embed call should fail.
    fail: bool,
}

impl EmbeddingBackend for FakeEmbed {
    fn available(&self) -> bool {
        self.available
    }

    fn embed(&self, request: &EmbeddingRequest) -> Result<Vec<Vec<f32>>, BackendError> {
        if self.fail {
            return Err(BackendError::Call("embed failed".to_string()));
        }
        Ok(request.inputs.iter().map(|_| vec![0.5, 0.5]).collect())
    }
}

/// Harness backend fake with scripted outcome.
struct FakeHarness {
    /// Availability probe result.
    available: bool,
    /// Execution result: exit code on success, error message on failure.
    result: Result<i32, String>,
    /// Number of execute invocations observed.
    calls: AtomicUsize,
}

impl FakeHarness {
    fn exiting(code: i32) -> Arc<Self> {
        Arc::new(Self {
            available: true,
            result: Ok(code),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            available: true,
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }
}

impl HarnessBackend for FakeHarness {
    fn available(&self) -> bool {
        self.available
    }

    fn execute(&self, _request: &HarnessRequest) -> Result<HarnessOutcome, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Ok(code) => Ok(HarnessOutcome {
                exit_code: *code,
                stdout: String::new(),
                stderr: String::new(),
            }),
            Err(message) => Err(BackendError::Call(message.clone())),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn id(name: &str) -> BackendId {
    BackendId::new(name)
}

fn profile_config(profile: &str, ids: &[&str], fallback: &[&str]) -> RouterConfig {
    let mut config = RouterConfig {
        default_profile: profile.to_string(),
        ..RouterConfig::default()
    };
    config
        .profiles
        .insert(profile.to_string(), ids.iter().map(|name| id(name)).collect());
    config.fallback = fallback.iter().map(|name| id(name)).collect();
    config
}

fn harness_request() -> HarnessRequest {
    HarnessRequest {
        tool: "fmt".to_string(),
        args: vec!["--check".to_string()],
        stdin: None,
        timeout_ms: None,
        apply: false,
    }
}

// ============================================================================
// SECTION: Registry Tests
// ============================================================================

#[test]
fn registry_rejects_duplicate_ids() {
    let mut registry: BackendRegistry<dyn TextBackend> = BackendRegistry::new();
    registry.register(id("a"), FakeText::ok("one")).unwrap();
    let err = registry.register(id("a"), FakeText::ok("two")).unwrap_err();
    assert!(matches!(err, RouteError::DuplicateBackend { backend_id } if backend_id == id("a")));
}

#[test]
fn registry_lists_ids_sorted() {
    let mut registry: BackendRegistry<dyn TextBackend> = BackendRegistry::new();
    registry.register(id("zeta"), FakeText::ok("z")).unwrap();
    registry.register(id("alpha"), FakeText::ok("a")).unwrap();
    assert_eq!(registry.ids(), vec![id("alpha"), id("zeta")]);
}

// ============================================================================
// SECTION: Text Routing Tests
// ============================================================================

#[test]
fn broken_backend_falls_through_to_next_candidate() {
    let mut registry: BackendRegistry<dyn TextBackend> = BackendRegistry::new();
    let broken = FakeText::broken("upstream 500");
    let ok = FakeText::ok("routed");
    registry.register(id("broken"), Arc::clone(&broken) as Arc<dyn TextBackend>).unwrap();
    registry.register(id("ok"), Arc::clone(&ok) as Arc<dyn TextBackend>).unwrap();

    let config = profile_config("default", &["broken", "ok"], &[]);
    let router = Router::new(ResourceKind::TextGeneration, registry, config);

    let routed = router.generate(&TextRequest::prompt("hi"), &RouteOptions::default()).unwrap();
    assert_eq!(routed.backend_id, id("ok"));
    assert_eq!(routed.text, "routed");
    assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
    assert_eq!(router.fallbacks_observed(), 1);
}

#[test]
fn unavailable_backend_is_skipped_without_a_call() {
    let mut registry: BackendRegistry<dyn TextBackend> = BackendRegistry::new();
    let offline = FakeText::offline();
    let ok = FakeText::ok("up");
    registry.register(id("offline"), Arc::clone(&offline) as Arc<dyn TextBackend>).unwrap();
    registry.register(id("ok"), Arc::clone(&ok) as Arc<dyn TextBackend>).unwrap();

    let config = profile_config("default", &["offline", "ok"], &[]);
    let router = Router::new(ResourceKind::TextGeneration, registry, config);

    let routed = router.generate(&TextRequest::prompt("hi"), &RouteOptions::default()).unwrap();
    assert_eq!(routed.backend_id, id("ok"));
    assert_eq!(offline.calls.load(Ordering::SeqCst), 0);
    assert_eq!(router.fallbacks_observed(), 0);
}

#[test]
fn probes_are_re_evaluated_per_call() {
    let mut registry: BackendRegistry<dyn TextBackend> = BackendRegistry::new();
    let ok = FakeText::ok("up");
    registry.register(id("ok"), Arc::clone(&ok) as Arc<dyn TextBackend>).unwrap();

    let config = profile_config("default", &["ok"], &[]);
    let router = Router::new(ResourceKind::TextGeneration, registry, config);

    router.generate(&TextRequest::prompt("one"), &RouteOptions::default()).unwrap();
    router.generate(&TextRequest::prompt("two"), &RouteOptions::default()).unwrap();
    assert_eq!(ok.probes.load(Ordering::SeqCst), 2);
}

#[test]
fn exhausted_candidates_raise_kind_tagged_error() {
    let mut registry: BackendRegistry<dyn TextBackend> = BackendRegistry::new();
    registry.register(id("broken"), FakeText::broken("down")).unwrap();

    let config = profile_config("default", &["broken", "missing"], &[]);
    let router = Router::new(ResourceKind::TextGeneration, registry, config);

    let err = router.generate(&TextRequest::prompt("hi"), &RouteOptions::default()).unwrap_err();
    match err {
        RouteError::NoAvailableBackend {
            kind,
            attempted,
        } => {
            assert_eq!(kind, ResourceKind::TextGeneration);
            assert_eq!(attempted, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn explicit_backend_takes_precedence_over_profile() {
    let mut registry: BackendRegistry<dyn TextBackend> = BackendRegistry::new();
    let preferred = FakeText::ok("preferred");
    let profile_member = FakeText::ok("profile");
    registry
        .register(id("preferred"), Arc::clone(&preferred) as Arc<dyn TextBackend>)
        .unwrap();
    registry
        .register(id("profile"), Arc::clone(&profile_member) as Arc<dyn TextBackend>)
        .unwrap();

    let config = profile_config("default", &["profile"], &[]);
    let router = Router::new(ResourceKind::TextGeneration, registry, config);

    let routed = router
        .generate(&TextRequest::prompt("hi"), &RouteOptions::backend(id("preferred")))
        .unwrap();
    assert_eq!(routed.backend_id, id("preferred"));
    assert_eq!(profile_member.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn fallback_list_is_appended_after_profile() {
    let mut registry: BackendRegistry<dyn TextBackend> = BackendRegistry::new();
    let last_resort = FakeText::ok("fallback");
    registry
        .register(id("fallback"), Arc::clone(&last_resort) as Arc<dyn TextBackend>)
        .unwrap();

    // Profile names only unregistered ids; the fallback must still win.
    let config = profile_config("default", &["missing-a", "missing-b"], &["fallback"]);
    let router = Router::new(ResourceKind::TextGeneration, registry, config);

    let routed = router.generate(&TextRequest::prompt("hi"), &RouteOptions::default()).unwrap();
    assert_eq!(routed.backend_id, id("fallback"));
}

// ============================================================================
// SECTION: Embedding Routing Tests
// ============================================================================

#[test]
fn embedding_result_carries_one_vector_per_input() {
    let mut registry: BackendRegistry<dyn EmbeddingBackend> = BackendRegistry::new();
    registry
        .register(
            id("embed"),
            Arc::new(FakeEmbed {
                available: true,
                fail: false,
            }),
        )
        .unwrap();

    let config = profile_config("default", &["embed"], &[]);
    let router = Router::new(ResourceKind::EmbeddingGeneration, registry, config);

    let request = EmbeddingRequest {
        inputs: vec!["one".to_string(), "two".to_string(), "three".to_string()],
        model: None,
    };
    let routed = router.embed(&request, &RouteOptions::default()).unwrap();
    assert_eq!(routed.backend_id, id("embed"));
    assert_eq!(routed.vectors.len(), 3);
}

#[test]
fn embedding_failure_falls_through_like_text() {
    let mut registry: BackendRegistry<dyn EmbeddingBackend> = BackendRegistry::new();
    registry
        .register(
            id("flaky"),
            Arc::new(FakeEmbed {
                available: true,
                fail: true,
            }),
        )
        .unwrap();
    registry
        .register(
            id("steady"),
            Arc::new(FakeEmbed {
                available: true,
                fail: false,
            }),
        )
        .unwrap();

    let config = profile_config("default", &["flaky", "steady"], &[]);
    let router = Router::new(ResourceKind::EmbeddingGeneration, registry, config);

    let request = EmbeddingRequest {
        inputs: vec!["x".to_string()],
        model: None,
    };
    let routed = router.embed(&request, &RouteOptions::default()).unwrap();
    assert_eq!(routed.backend_id, id("steady"));
    assert_eq!(router.fallbacks_observed(), 1);
}

// ============================================================================
// SECTION: Harness Routing Tests
// ============================================================================

#[test]
fn harness_error_propagates_without_cross_backend_retry() {
    let mut registry: BackendRegistry<dyn HarnessBackend> = BackendRegistry::new();
    let failing = FakeHarness::failing("spawn denied");
    let spare = FakeHarness::exiting(0);
    registry.register(id("failing"), Arc::clone(&failing) as Arc<dyn HarnessBackend>).unwrap();
    registry.register(id("spare"), Arc::clone(&spare) as Arc<dyn HarnessBackend>).unwrap();

    let config = profile_config("default", &["failing", "spare"], &[]);
    let router = Router::new(ResourceKind::HarnessExecution, registry, config);

    let err = router.execute(&harness_request(), &RouteOptions::default()).unwrap_err();
    match err {
        RouteError::Backend {
            kind,
            backend_id,
            ..
        } => {
            assert_eq!(kind, ResourceKind::HarnessExecution);
            assert_eq!(backend_id, id("failing"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(spare.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn harness_nonzero_exit_is_an_outcome() {
    let mut registry: BackendRegistry<dyn HarnessBackend> = BackendRegistry::new();
    registry.register(id("linter"), FakeHarness::exiting(3)).unwrap();

    let config = profile_config("default", &["linter"], &[]);
    let router = Router::new(ResourceKind::HarnessExecution, registry, config);

    let routed = router.execute(&harness_request(), &RouteOptions::default()).unwrap();
    assert_eq!(routed.backend_id, id("linter"));
    assert_eq!(routed.outcome.exit_code, 3);
}

#[test]
fn harness_explicit_id_is_attempted_before_profile_members() {
    let mut registry: BackendRegistry<dyn HarnessBackend> = BackendRegistry::new();
    let explicit = FakeHarness::exiting(0);
    let member = FakeHarness::exiting(0);
    registry.register(id("explicit"), Arc::clone(&explicit) as Arc<dyn HarnessBackend>).unwrap();
    registry.register(id("member"), Arc::clone(&member) as Arc<dyn HarnessBackend>).unwrap();

    let config = profile_config("default", &["member"], &[]);
    let router = Router::new(ResourceKind::HarnessExecution, registry, config);

    let routed = router
        .execute(&harness_request(), &RouteOptions::backend(id("explicit")))
        .unwrap();
    assert_eq!(routed.backend_id, id("explicit"));
    assert_eq!(member.calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// SECTION: Config Tests
// ============================================================================

#[test]
fn routing_config_parses_all_sections() {
    let raw = r#"
        [text]
        default_profile = "balanced"
        fallback = ["local-echo"]

        [text.profiles]
        balanced = ["primary", "secondary"]

        [harness]
        default_profile = "tools"

        [harness.profiles]
        tools = ["cli"]
    "#;
    let config = RoutingConfig::from_toml_str(raw).unwrap();
    assert_eq!(config.text.default_profile, "balanced");
    assert_eq!(config.text.fallback, vec![id("local-echo")]);
    assert_eq!(config.text.profiles["balanced"], vec![id("primary"), id("secondary")]);
    assert_eq!(config.harness.profiles["tools"], vec![id("cli")]);
    assert!(config.embeddings.profiles.is_empty());
}

#[test]
fn routing_config_rejects_dangling_default_profile() {
    let raw = r#"
        [text]
        default_profile = "missing"
    "#;
    let err = RoutingConfig::from_toml_str(raw).unwrap_err();
    assert!(err.to_string().contains("default_profile"));
}

#[test]
fn empty_routing_config_defaults_to_empty_sections() {
    let config = RoutingConfig::from_toml_str("").unwrap();
    assert!(config.text.profiles.is_empty());
    assert!(config.embeddings.fallback.is_empty());
    assert!(config.harness.default_profile.is_empty());
}
