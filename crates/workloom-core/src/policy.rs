// crates/workloom-core/src/policy.rs
// ============================================================================
// Module: Workloom Capability Policy
// Description: Capability grant, check, and require with wildcard families.
// Purpose: Gate every side-effecting workflow capability behind explicit grants.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Workflows are the system's open extension point, so every side-effecting
//! capability (file I/O, process execution, storage writes) must be opted
//! into per workflow. A capability is a string token, either exact
//! (`db:read`) or a scoped family with a wildcard suffix (`fs:read:*`).
//! Checks fail closed: a token that is neither granted exactly nor covered
//! by a granted wildcard prefix is denied.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use thiserror::Error;

// ============================================================================
// SECTION: Capability Vocabulary
// ============================================================================

/// Read access to the persistent store through the repository.
pub const CAP_DB_READ: &str = "db:read";
/// Write access to the persistent store through the command queue.
pub const CAP_DB_WRITE: &str = "db:write";
/// Text generation through the routed text backend.
pub const CAP_LLM_GENERATE: &str = "llm:generate";
/// Embedding generation through the routed embedding backend.
pub const CAP_EMBEDDINGS_GENERATE: &str = "embeddings:generate";
/// Outbound HTTP access.
pub const CAP_NET_HTTP: &str = "net:http";
/// Unrestricted filesystem read family.
pub const CAP_FS_READ_ALL: &str = "fs:read:*";
/// Unrestricted filesystem write family.
pub const CAP_FS_WRITE_ALL: &str = "fs:write:*";
/// Unrestricted process execution family.
pub const CAP_EXEC_ALL: &str = "exec:*";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Capability denial raised by [`Policy::require`].
///
/// # Invariants
/// - Denials are surfaced to the caller and never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("capability denied: {capability}{}", match context { Some(ctx) => format!(" ({ctx})"), None => String::new() })]
pub struct PolicyError {
    /// Capability that was denied.
    pub capability: String,
    /// Optional caller-supplied context string.
    pub context: Option<String>,
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Capability policy scoped to one workflow execution.
///
/// # Invariants
/// - Grants are immutable after construction.
/// - Wildcard grants match by string prefix (grant minus the trailing `*`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Granted capability tokens.
    grants: BTreeSet<String>,
}

impl Policy {
    /// Creates the default workflow policy.
    ///
    /// Grants only `db:read`, `llm:generate`, and `embeddings:generate`.
    #[must_use]
    pub fn workflow_default() -> Self {
        let mut grants = BTreeSet::new();
        grants.insert(CAP_DB_READ.to_string());
        grants.insert(CAP_LLM_GENERATE.to_string());
        grants.insert(CAP_EMBEDDINGS_GENERATE.to_string());
        Self {
            grants,
        }
    }

    /// Creates a policy from a workflow's declared capabilities.
    ///
    /// Grants `db:read` plus exactly the declared tokens. There is no
    /// implicit merge with the default policy's extra grants.
    #[must_use]
    pub fn from_declared<I, S>(declared: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut grants = BTreeSet::new();
        grants.insert(CAP_DB_READ.to_string());
        for capability in declared {
            grants.insert(capability.into());
        }
        Self {
            grants,
        }
    }

    /// Creates the unrestricted policy reserved for system workflows.
    #[must_use]
    pub fn unrestricted() -> Self {
        let mut grants = BTreeSet::new();
        for capability in [
            CAP_DB_READ,
            CAP_DB_WRITE,
            CAP_LLM_GENERATE,
            CAP_EMBEDDINGS_GENERATE,
            CAP_NET_HTTP,
            CAP_FS_READ_ALL,
            CAP_FS_WRITE_ALL,
            CAP_EXEC_ALL,
        ] {
            grants.insert(capability.to_string());
        }
        Self {
            grants,
        }
    }

    /// Returns true when the capability is granted exactly or by wildcard.
    #[must_use]
    pub fn check(&self, capability: &str) -> bool {
        if self.grants.contains(capability) {
            return true;
        }
        self.grants
            .iter()
            .any(|grant| grant.strip_suffix('*').is_some_and(|prefix| capability.starts_with(prefix)))
    }

    /// Requires the capability, raising [`PolicyError`] when denied.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] carrying the capability and optional context
    /// when the capability is not granted.
    pub fn require(&self, capability: &str, context: Option<&str>) -> Result<(), PolicyError> {
        if self.check(capability) {
            return Ok(());
        }
        Err(PolicyError {
            capability: capability.to_string(),
            context: context.map(ToString::to_string),
        })
    }

    /// Returns a snapshot of the granted tokens.
    #[must_use]
    pub fn capabilities(&self) -> Vec<String> {
        self.grants.iter().cloned().collect()
    }
}
