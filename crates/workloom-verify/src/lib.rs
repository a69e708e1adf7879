// crates/workloom-verify/src/lib.rs
// ============================================================================
// Module: Workloom Verify
// Description: Verification engine and built-in criterion verifiers.
// Purpose: Evaluate quality criteria against artifacts and produce reports.
// Dependencies: workloom-core, workloom-router, regex, serde_json
// ============================================================================

//! ## Overview
//! The verification engine dispatches each criterion to a verifier registered
//! for its method kind and aggregates per-criterion outcomes into a report.
//! Invariants:
//! - A failed verification is a structured result, never an error; timeouts
//!   and spawn failures surface as failed results.
//! - Ideal and anti criteria are evaluated concurrently; all are read-only.
//! - The aggregate `passed` is false iff a CRITICAL ideal criterion failed.
//! - A report is produced for every run, pass or fail.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod engine;
pub mod verifiers;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use engine::VerificationEngine;
pub use verifiers::Verdict;
pub use verifiers::Verifier;
pub use verifiers::command_exit::CommandExitVerifier;
pub use verifiers::inspection::InspectionVerifier;
pub use verifiers::judged::JudgedVerifier;
pub use verifiers::pattern::PatternVerifier;
