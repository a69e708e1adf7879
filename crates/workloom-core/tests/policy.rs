// crates/workloom-core/tests/policy.rs
// ============================================================================
// Module: Policy Tests
// Description: Validate capability grant, check, and require semantics.
// Purpose: Ensure wildcard matching and constructor grant sets are exact.
// Dependencies: workloom-core
// ============================================================================

//! Capability policy behavior tests for exact and wildcard-scoped grants.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use workloom_core::Policy;

#[test]
fn exact_grant_matches_exactly() {
    let policy = Policy::workflow_default();
    assert!(policy.check("db:read"));
    assert!(policy.check("llm:generate"));
    assert!(policy.check("embeddings:generate"));
    assert!(!policy.check("db:write"));
    assert!(!policy.check("net:http"));
}

#[test]
fn wildcard_grant_matches_by_prefix() {
    let policy = Policy::from_declared(["fs:read:*"]);
    assert!(policy.check("fs:read:/a/b"));
    assert!(policy.check("fs:read:/etc/hosts"));
    assert!(!policy.check("fs:write:/a/b"));
}

#[test]
fn scoped_wildcard_grant_bounds_the_family() {
    let policy = Policy::from_declared(["fs:read:/workspace/*"]);
    assert!(policy.check("fs:read:/workspace/src/main.rs"));
    assert!(!policy.check("fs:read:/etc/passwd"));
}

#[test]
fn exact_path_grant_does_not_cover_siblings() {
    let policy = Policy::from_declared(["fs:read:/a/b"]);
    assert!(policy.check("fs:read:/a/b"));
    assert!(!policy.check("fs:read:/a/b/c"));
    assert!(!policy.check("fs:read:/a"));
}

#[test]
fn declared_policy_does_not_inherit_default_extras() {
    let policy = Policy::from_declared(["net:http"]);
    assert!(policy.check("db:read"));
    assert!(policy.check("net:http"));
    assert!(!policy.check("llm:generate"));
    assert!(!policy.check("embeddings:generate"));
}

#[test]
fn unrestricted_policy_covers_exec_and_fs_families() {
    let policy = Policy::unrestricted();
    assert!(policy.check("exec:git"));
    assert!(policy.check("fs:write:/tmp/out.txt"));
    assert!(policy.check("db:write"));
}

#[test]
fn require_carries_capability_and_context() {
    let policy = Policy::workflow_default();
    let denied = policy.require("exec:rm", Some("cleanup step")).unwrap_err();
    assert_eq!(denied.capability, "exec:rm");
    assert_eq!(denied.context.as_deref(), Some("cleanup step"));
    assert!(policy.require("db:read", None).is_ok());
}

#[test]
fn capabilities_snapshot_is_sorted_and_complete() {
    let policy = Policy::from_declared(["net:http", "exec:echo"]);
    let snapshot = policy.capabilities();
    assert_eq!(snapshot, vec!["db:read", "exec:echo", "net:http"]);
}
