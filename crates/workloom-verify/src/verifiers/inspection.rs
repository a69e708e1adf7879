// crates/workloom-verify/src/verifiers/inspection.rs
// ============================================================================
// Module: Inspection Verifier
// Description: File-existence and containment verification.
// Purpose: Pass a criterion iff the referenced file reflects the artifact.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The inspection verifier checks that the criterion's referenced file
//! exists. When the artifact carries content, the file must additionally
//! contain that content as a substring; an artifact without content only
//! requires existence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use workloom_core::Artifact;
use workloom_core::Criterion;
use workloom_core::VerificationMethod;

use crate::verifiers::Verdict;
use crate::verifiers::Verifier;

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Verifier inspecting files referenced by criteria.
#[derive(Debug, Clone, Copy, Default)]
pub struct InspectionVerifier;

impl Verifier for InspectionVerifier {
    fn verify(&self, criterion: &Criterion, artifact: &Artifact) -> Verdict {
        let VerificationMethod::Inspection {
            path,
        } = &criterion.method
        else {
            return Verdict::failed(format!(
                "inspection verifier received a {} criterion",
                criterion.method.kind()
            ));
        };
        let target = Path::new(path);
        if !target.exists() {
            return Verdict::failed(format!("file does not exist: {path}"));
        }
        let Some(expected) = artifact.content() else {
            return Verdict::passed(format!("file exists: {path}"));
        };
        match fs::read_to_string(target) {
            Ok(contents) if contents.contains(expected) => {
                Verdict::passed(format!("file {path} contains the artifact content"))
            }
            Ok(_) => Verdict::failed(format!("file {path} does not contain the artifact content")),
            Err(err) => Verdict::failed(format!("file {path} could not be read: {err}")),
        }
    }
}
