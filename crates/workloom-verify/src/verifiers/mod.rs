// crates/workloom-verify/src/verifiers/mod.rs
// ============================================================================
// Module: Criterion Verifiers
// Description: Verifier seam and the built-in method implementations.
// Purpose: Evaluate one criterion against one artifact per method kind.
// Dependencies: workloom-core
// ============================================================================

//! ## Overview
//! A verifier evaluates one criterion against one artifact and returns a
//! verdict. Verifiers are infallible at the type level: anything that
//! prevents evaluation (spawn failure, invalid pattern, missing judge) is a
//! failed verdict with the cause captured as evidence. The engine stamps the
//! criterion id onto the verdict when building results.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod command_exit;
pub mod inspection;
pub mod judged;
pub mod pattern;

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use workloom_core::Artifact;
use workloom_core::Criterion;

// ============================================================================
// SECTION: Verdict
// ============================================================================

/// Unstamped outcome of evaluating one criterion.
///
/// # Invariants
/// - Carries no criterion id; the engine stamps it when building results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Verdict {
    /// Whether the criterion held.
    pub passed: bool,
    /// Captured evidence (command output, matched text, judge rationale).
    #[serde(default)]
    pub evidence: Option<String>,
    /// Observed value when the method produces one.
    #[serde(default, alias = "actualValue")]
    pub actual_value: Option<String>,
}

impl Verdict {
    /// Returns a failed verdict with the provided evidence.
    #[must_use]
    pub fn failed(evidence: impl Into<String>) -> Self {
        Self {
            passed: false,
            evidence: Some(evidence.into()),
            actual_value: None,
        }
    }

    /// Returns a passed verdict with the provided evidence.
    #[must_use]
    pub fn passed(evidence: impl Into<String>) -> Self {
        Self {
            passed: true,
            evidence: Some(evidence.into()),
            actual_value: None,
        }
    }
}

// ============================================================================
// SECTION: Verifier Seam
// ============================================================================

/// Evaluates criteria of one verification-method kind.
pub trait Verifier: Send + Sync {
    /// Evaluates the criterion against the artifact.
    ///
    /// Evaluation never errors; failure to evaluate is a failed verdict.
    fn verify(&self, criterion: &Criterion, artifact: &Artifact) -> Verdict;
}
