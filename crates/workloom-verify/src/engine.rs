// crates/workloom-verify/src/engine.rs
// ============================================================================
// Module: Verification Engine
// Description: Criterion dispatch and report aggregation.
// Purpose: Evaluate quality definitions against artifacts and build reports.
// Dependencies: workloom-core, workloom-router
// ============================================================================

//! ## Overview
//! The engine holds one verifier per verification-method kind. A criterion is
//! dispatched by its method's kind label and the resulting verdict is stamped
//! with the criterion id. Full-definition runs evaluate every ideal and anti
//! criterion on scoped threads; criteria are independent and read-only, so
//! order within the report follows the definition, not completion.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use workloom_core::Artifact;
use workloom_core::Criterion;
use workloom_core::IdGenerator;
use workloom_core::IscDefinition;
use workloom_core::IscReport;
use workloom_core::JobId;
use workloom_core::ReportId;
use workloom_core::Timestamp;
use workloom_core::VerificationResult;
use workloom_core::WorkflowId;
use workloom_router::TextRouter;

use crate::verifiers::Verifier;
use crate::verifiers::command_exit::CommandExitVerifier;
use crate::verifiers::inspection::InspectionVerifier;
use crate::verifiers::judged::JudgedVerifier;
use crate::verifiers::pattern::PatternVerifier;

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Default command-exit verification timeout in milliseconds.
const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 30_000;

/// Verification engine dispatching criteria to registered verifiers.
///
/// # Invariants
/// - At most one verifier is registered per method kind; later registrations
///   replace earlier ones.
pub struct VerificationEngine {
    /// Verifiers keyed by method kind label.
    verifiers: BTreeMap<&'static str, Box<dyn Verifier>>,
    /// Report identifier generator.
    report_ids: IdGenerator,
}

impl VerificationEngine {
    /// Creates an engine with no registered verifiers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            verifiers: BTreeMap::new(),
            report_ids: IdGenerator::new("rep"),
        }
    }

    /// Creates an engine with the four built-in verifiers registered.
    ///
    /// The text router, when provided, powers scriptless judged criteria.
    #[must_use]
    pub fn with_default_verifiers(text: Option<Arc<TextRouter>>) -> Self {
        let mut engine = Self::new();
        engine.register(
            "command_exit",
            Box::new(CommandExitVerifier::new(Duration::from_millis(
                DEFAULT_COMMAND_TIMEOUT_MS,
            ))),
        );
        engine.register("pattern", Box::new(PatternVerifier));
        engine.register("inspection", Box::new(InspectionVerifier));
        engine.register("judged", Box::new(JudgedVerifier::new(text)));
        engine
    }

    /// Registers a verifier for a method kind, replacing any existing one.
    pub fn register(&mut self, kind: &'static str, verifier: Box<dyn Verifier>) {
        self.verifiers.insert(kind, verifier);
    }

    /// Evaluates one criterion and stamps the result with its id.
    #[must_use]
    pub fn verify_criterion(&self, criterion: &Criterion, artifact: &Artifact) -> VerificationResult {
        let verdict = self.verifiers.get(criterion.method.kind()).map_or_else(
            || {
                crate::verifiers::Verdict::failed(format!(
                    "no verifier registered for method kind {}",
                    criterion.method.kind()
                ))
            },
            |verifier| verifier.verify(criterion, artifact),
        );
        VerificationResult {
            criterion_id: criterion.id.clone(),
            passed: verdict.passed,
            evidence: verdict.evidence,
            actual_value: verdict.actual_value,
        }
    }

    /// Evaluates every ideal and anti criterion and builds the report.
    ///
    /// Criteria run concurrently on scoped threads. The aggregate `passed`
    /// is false iff a CRITICAL ideal criterion failed; anti-criterion
    /// failures are recorded without flipping the aggregate.
    #[must_use]
    pub fn verify_all_criteria(
        &self,
        definition: &IscDefinition,
        artifact: &Artifact,
        job_id: Option<&JobId>,
        workflow_id: Option<&WorkflowId>,
    ) -> IscReport {
        let (ideal, anti) = thread::scope(|scope| {
            let ideal_handles: Vec<_> = definition
                .ideal
                .iter()
                .map(|criterion| scope.spawn(move || self.verify_criterion(criterion, artifact)))
                .collect();
            let anti_handles: Vec<_> = definition
                .anti
                .iter()
                .map(|criterion| scope.spawn(move || self.verify_criterion(criterion, artifact)))
                .collect();
            (
                join_in_order(&definition.ideal, ideal_handles),
                join_in_order(&definition.anti, anti_handles),
            )
        });
        let passed = IscReport::aggregate_passed(definition, &ideal);
        IscReport {
            id: ReportId::new(self.report_ids.issue()),
            definition_name: definition.name.clone(),
            definition_version: definition.version.clone(),
            artifact_id: artifact.id.clone(),
            artifact_kind: artifact.kind.clone(),
            job_id: job_id.cloned(),
            workflow_id: workflow_id.cloned(),
            ideal,
            anti,
            passed,
            at: Timestamp::now(),
        }
    }
}

impl Default for VerificationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Joins verification threads, preserving definition order.
fn join_in_order<'scope>(
    criteria: &[Criterion],
    handles: Vec<thread::ScopedJoinHandle<'scope, VerificationResult>>,
) -> Vec<VerificationResult> {
    criteria
        .iter()
        .zip(handles)
        .map(|(criterion, handle)| {
            handle.join().unwrap_or_else(|_| VerificationResult {
                criterion_id: criterion.id.clone(),
                passed: false,
                evidence: Some("verifier thread panicked".to_string()),
                actual_value: None,
            })
        })
        .collect()
}
