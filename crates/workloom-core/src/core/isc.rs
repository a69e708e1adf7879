// crates/workloom-core/src/core/isc.rs
// ============================================================================
// Module: Workloom Quality Definitions
// Description: ISC definitions, criteria, verification results, and PRDs.
// Purpose: Capture the quality contract an artifact kind must satisfy.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A quality definition (ISC: ideal state criteria) is a named, versioned
//! set of "ideal" and "anti" criteria for one artifact kind, each carrying a
//! priority and a verification method. A report aggregates per-criterion
//! outcomes plus a derived overall `passed`.
//!
//! The aggregate deliberately ignores anti-criterion failures: they are
//! recorded as informational and do not flip `passed` on their own. Flipping
//! that behavior is a one-line change in [`IscReport::aggregate_passed`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ArtifactId;
use crate::core::identifiers::CriterionId;
use crate::core::identifiers::JobId;
use crate::core::identifiers::PrdId;
use crate::core::identifiers::ReportId;
use crate::core::identifiers::WorkflowId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Criteria
// ============================================================================

/// Priority assigned to a quality criterion.
///
/// # Invariants
/// - Only failed CRITICAL ideal criteria flip the aggregate `passed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionPriority {
    /// Must hold; a failure gates the artifact.
    Critical,
    /// Should hold; failures are recorded but do not gate.
    Important,
    /// Nice to have; failures are recorded but do not gate.
    Nice,
}

/// Verification method attached to a criterion.
///
/// # Invariants
/// - Variants are stable for serialization and verifier dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerificationMethod {
    /// Spawn a shell command with the artifact content on stdin; exit 0 passes.
    CommandExit {
        /// Shell command line to execute.
        command: String,
    },
    /// Compile the pattern as a regular expression; one match passes.
    Pattern {
        /// Regular expression source.
        pattern: String,
    },
    /// The referenced file must exist and contain the artifact content.
    Inspection {
        /// Path of the file to inspect.
        path: String,
    },
    /// Delegate to an external script hook or the routed text backend.
    Judged {
        /// Optional script path; when unset the text backend judges.
        script: Option<String>,
    },
}

impl VerificationMethod {
    /// Returns the stable dispatch label for the method kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CommandExit { .. } => "command_exit",
            Self::Pattern { .. } => "pattern",
            Self::Inspection { .. } => "inspection",
            Self::Judged { .. } => "judged",
        }
    }
}

/// One quality criterion within a definition.
///
/// # Invariants
/// - `id` is unique within its definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    /// Criterion identifier.
    pub id: CriterionId,
    /// Human-readable description of the expected state.
    pub description: String,
    /// Criterion priority.
    pub priority: CriterionPriority,
    /// Verification method.
    pub method: VerificationMethod,
}

// ============================================================================
// SECTION: Definitions
// ============================================================================

/// Named, versioned quality definition for one artifact kind.
///
/// # Invariants
/// - `ideal` criteria describe the target state; `anti` criteria describe
///   states that must not occur.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IscDefinition {
    /// Definition name.
    pub name: String,
    /// Definition version label.
    pub version: String,
    /// Artifact kind the definition applies to.
    pub artifact_kind: String,
    /// Ideal criteria.
    pub ideal: Vec<Criterion>,
    /// Anti criteria.
    pub anti: Vec<Criterion>,
}

// ============================================================================
// SECTION: Verification Results
// ============================================================================

/// Outcome of verifying one criterion against one artifact.
///
/// # Invariants
/// - A failed verification is a structured result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Criterion the result belongs to.
    pub criterion_id: CriterionId,
    /// Whether the criterion held.
    pub passed: bool,
    /// Captured evidence (command output, matched text, judge rationale).
    pub evidence: Option<String>,
    /// Observed value when the method produces one.
    pub actual_value: Option<String>,
}

/// Aggregated verification report for one artifact.
///
/// # Invariants
/// - Reports are persisted whether or not the artifact passed.
/// - `passed` is true iff no CRITICAL ideal criterion failed; anti-criterion
///   failures are informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IscReport {
    /// Report identifier.
    pub id: ReportId,
    /// Definition name the report was produced from.
    pub definition_name: String,
    /// Definition version the report was produced from.
    pub definition_version: String,
    /// Artifact the report describes.
    pub artifact_id: ArtifactId,
    /// Artifact kind at verification time.
    pub artifact_kind: String,
    /// Job context, when known.
    pub job_id: Option<JobId>,
    /// Workflow context, when known.
    pub workflow_id: Option<WorkflowId>,
    /// Ideal criterion results.
    pub ideal: Vec<VerificationResult>,
    /// Anti criterion results.
    pub anti: Vec<VerificationResult>,
    /// Derived overall outcome.
    pub passed: bool,
    /// Report timestamp.
    pub at: Timestamp,
}

impl IscReport {
    /// Derives the aggregate outcome from ideal criterion results.
    ///
    /// Anti-criterion failures never flip the aggregate; they are recorded in
    /// the report for review.
    #[must_use]
    pub fn aggregate_passed(definition: &IscDefinition, ideal: &[VerificationResult]) -> bool {
        !ideal.iter().any(|result| {
            !result.passed
                && definition.ideal.iter().any(|criterion| {
                    criterion.id == result.criterion_id
                        && criterion.priority == CriterionPriority::Critical
                })
        })
    }

    /// Counts failed CRITICAL ideal criteria in the report.
    #[must_use]
    pub fn critical_failures(&self, definition: &IscDefinition) -> usize {
        self.ideal
            .iter()
            .filter(|result| {
                !result.passed
                    && definition.ideal.iter().any(|criterion| {
                        criterion.id == result.criterion_id
                            && criterion.priority == CriterionPriority::Critical
                    })
            })
            .count()
    }
}

/// Compact verification summary attached to artifact payloads and PRDs.
///
/// # Invariants
/// - Mirrors the report it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaSummary {
    /// Definition name.
    pub definition: String,
    /// Definition version label.
    pub version: String,
    /// Aggregate outcome.
    pub passed: bool,
    /// Count of failed CRITICAL ideal criteria.
    pub critical_failures: usize,
    /// Count of all criteria evaluated (ideal plus anti).
    pub total_criteria: usize,
}

// ============================================================================
// SECTION: Requirement Documents
// ============================================================================

/// Persistent requirement document tied to one artifact.
///
/// # Invariants
/// - `log` is append-only via `prd.append_log` commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrdRecord {
    /// Requirement document identifier.
    pub id: PrdId,
    /// Artifact the document describes.
    pub artifact_id: ArtifactId,
    /// Job context, when known.
    pub job_id: Option<JobId>,
    /// Intent statement for the artifact.
    pub intent: String,
    /// Constraints the artifact must respect.
    pub constraints: Vec<String>,
    /// Verification outcome at creation time, when a definition applied.
    pub criteria: Option<CriteriaSummary>,
    /// Content hash of the artifact body at creation time, when present.
    pub content_hash: Option<String>,
    /// Creation timestamp.
    pub created_at: Timestamp,
}
