// crates/workloom-verify/src/verifiers/pattern.rs
// ============================================================================
// Module: Pattern Verifier
// Description: Regular-expression verification over artifact content.
// Purpose: Pass a criterion iff its pattern matches the content at least once.
// Dependencies: regex
// ============================================================================

//! ## Overview
//! The pattern verifier compiles the criterion's pattern as a regular
//! expression and matches it against the artifact's content. An artifact
//! without content is matched against the empty string. An invalid pattern
//! is a failed verdict carrying the compile error as evidence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use workloom_core::Artifact;
use workloom_core::Criterion;
use workloom_core::VerificationMethod;

use crate::verifiers::Verdict;
use crate::verifiers::Verifier;

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Verifier matching criterion patterns against artifact content.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternVerifier;

impl Verifier for PatternVerifier {
    fn verify(&self, criterion: &Criterion, artifact: &Artifact) -> Verdict {
        let VerificationMethod::Pattern {
            pattern,
        } = &criterion.method
        else {
            return Verdict::failed(format!(
                "pattern verifier received a {} criterion",
                criterion.method.kind()
            ));
        };
        let regex = match Regex::new(pattern) {
            Ok(regex) => regex,
            Err(err) => return Verdict::failed(format!("invalid pattern: {err}")),
        };
        let content = artifact.content().unwrap_or_default();
        regex.find(content).map_or_else(
            || Verdict::failed(format!("pattern {pattern:?} did not match")),
            |found| Verdict {
                passed: true,
                evidence: Some(format!("pattern {pattern:?} matched")),
                actual_value: Some(found.as_str().to_string()),
            },
        )
    }
}
