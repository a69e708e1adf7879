// crates/workloom-core/src/core/job.rs
// ============================================================================
// Module: Workloom Jobs
// Description: Job records, status lattice, and effort levels.
// Purpose: Capture the job state machine shared by the runner and the store.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Jobs are created by `job.create` commands and mutated only through
//! `job.update_status`. Status transitions are monotonic forward through the
//! lattice `queued < running < verifying < needs_approval < terminal`.
//! `needs_approval` is a parking state exited only by an explicit external
//! approve or deny command, never by the runner itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::JobId;
use crate::core::identifiers::WorkflowId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Job Status
// ============================================================================

/// Job lifecycle status.
///
/// # Invariants
/// - Variants are stable for serialization and command matching.
/// - Transitions only move forward through the lattice; see [`JobStatus::rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is waiting to be picked up by the runner.
    Queued,
    /// Job is executing its workflow.
    Running,
    /// Job is executing its workflow verification hook.
    Verifying,
    /// Job is parked awaiting an explicit external approve or deny decision.
    NeedsApproval,
    /// Job finished successfully.
    Succeeded,
    /// Job finished with a failure.
    Failed,
}

impl JobStatus {
    /// Returns the lattice rank used for forward-transition checks.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Running => 1,
            Self::Verifying => 2,
            Self::NeedsApproval => 3,
            Self::Succeeded | Self::Failed => 4,
        }
    }

    /// Returns true when the status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns true when a transition from `self` to `next` moves forward.
    ///
    /// Terminal statuses accept no further transitions. `needs_approval` may
    /// only advance to a terminal status (the external approve/deny path).
    #[must_use]
    pub const fn allows_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.rank() < next.rank()
    }

    /// Returns the stable wire label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Verifying => "verifying",
            Self::NeedsApproval => "needs_approval",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Parses a stable wire label back into a status.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "verifying" => Some(Self::Verifying),
            "needs_approval" => Some(Self::NeedsApproval),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Effort Levels
// ============================================================================

/// Effort tier controlling verification depth and advisory time budget.
///
/// # Invariants
/// - Variants are stable for serialization and configuration matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EffortLevel {
    /// Minimal effort: no reflection capture, smallest advisory budget.
    Minimal,
    /// Standard effort: default tier for workflow executions.
    #[default]
    Standard,
    /// Thorough effort: enables best-effort reflection capture.
    Thorough,
}

impl EffortLevel {
    /// Returns the advisory execution budget for this tier, in milliseconds.
    #[must_use]
    pub const fn advisory_budget_ms(self) -> u64 {
        match self {
            Self::Minimal => 30_000,
            Self::Standard => 120_000,
            Self::Thorough => 600_000,
        }
    }

    /// Returns true when reflection capture should run for this tier.
    #[must_use]
    pub const fn captures_reflection(self) -> bool {
        matches!(self, Self::Thorough)
    }
}

// ============================================================================
// SECTION: Job Record
// ============================================================================

/// Durable job record.
///
/// # Invariants
/// - `started_at` is set when the job leaves `queued`; `finished_at` when it
///   reaches a terminal status. Both are writer-owned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Job identifier.
    pub id: JobId,
    /// Workflow the job executes.
    pub workflow_id: WorkflowId,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Opaque workflow input payload.
    pub input: Value,
    /// Timestamp when execution started, if it has.
    pub started_at: Option<Timestamp>,
    /// Timestamp when the job reached a terminal status, if it has.
    pub finished_at: Option<Timestamp>,
}

impl Job {
    /// Creates a queued job with unset execution timestamps.
    #[must_use]
    pub const fn queued(id: JobId, workflow_id: WorkflowId, input: Value) -> Self {
        Self {
            id,
            workflow_id,
            status: JobStatus::Queued,
            input,
            started_at: None,
            finished_at: None,
        }
    }
}
