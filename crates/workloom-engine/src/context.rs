// crates/workloom-engine/src/context.rs
// ============================================================================
// Module: Job Execution Context
// Description: The capability surface handed to a workflow for one job run.
// Purpose: Expose reads, buffered writes, runtimes, and the artifact gate.
// Dependencies: workloom-core, workloom-router, workloom-verify, serde_json
// ============================================================================

//! ## Overview
//! A context is built fresh for every job execution and owns that job's
//! local command buffer. Structured helpers (`emit_artifact`, `spawn_job`,
//! the requirement-document helpers) are the sanctioned write path and are
//! not capability-gated beyond what they touch; the raw `enqueue_command`
//! escape hatch requires `db:write`.
//!
//! `emit_artifact` is the verification gate: when the artifact kind has a
//! quality definition (workflow override first, then the global registry)
//! the artifact is verified synchronously and a failed CRITICAL criterion
//! withholds it entirely. The verification report is buffered either way.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use serde_json::json;
use workloom_core::Artifact;
use workloom_core::ArtifactId;
use workloom_core::Command;
use workloom_core::CommandSink;
use workloom_core::CriteriaSummary;
use workloom_core::EffortLevel;
use workloom_core::IdGenerator;
use workloom_core::IscDefinition;
use workloom_core::Job;
use workloom_core::JobId;
use workloom_core::JobStatus;
use workloom_core::LocalCommandBuffer;
use workloom_core::Policy;
use workloom_core::PrdId;
use workloom_core::PrdRecord;
use workloom_core::Repository;
use workloom_core::Timestamp;
use workloom_core::WorkflowId;
use workloom_core::hash_bytes;
use workloom_core::policy::CAP_DB_READ;
use workloom_core::policy::CAP_DB_WRITE;
use workloom_router::EmbeddingRouter;
use workloom_router::HarnessRouter;
use workloom_router::TextRouter;
use workloom_verify::VerificationEngine;

use crate::budget::BudgetTracker;
use crate::gated::GatedRuntimes;
use crate::isc_registry::IscRegistry;
use crate::workflow::WorkflowError;

// ============================================================================
// SECTION: Identifier Generators
// ============================================================================

/// Identifier generators shared across the engine.
///
/// # Invariants
/// - One instance per process; issued identifiers are process-unique.
#[derive(Debug)]
pub struct EngineIds {
    /// Job identifiers.
    pub jobs: IdGenerator,
    /// Artifact identifiers.
    pub artifacts: IdGenerator,
    /// Requirement document identifiers.
    pub prds: IdGenerator,
    /// Trace event identifiers.
    pub traces: IdGenerator,
    /// Reflection identifiers.
    pub reflections: IdGenerator,
}

impl EngineIds {
    /// Creates the engine identifier generators.
    #[must_use]
    pub fn new() -> Self {
        Self {
            jobs: IdGenerator::new("job"),
            artifacts: IdGenerator::new("art"),
            prds: IdGenerator::new("prd"),
            traces: IdGenerator::new("trc"),
            reflections: IdGenerator::new("refl"),
        }
    }
}

impl Default for EngineIds {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Capability surface handed to a workflow for one job execution.
///
/// # Invariants
/// - Owns the job's local buffer; nothing persists until the runner flushes.
/// - An artifact whose kind fails a CRITICAL criterion never reaches the
///   buffer as an `artifact.create` command.
pub struct JobContext {
    /// Job being executed.
    job: Job,
    /// Effort tier for this execution.
    effort: EffortLevel,
    /// Capability policy for the executing workflow.
    policy: Policy,
    /// Local command buffer owned by this execution.
    buffer: Arc<LocalCommandBuffer>,
    /// Read-only repository surface.
    repo: Arc<dyn Repository + Send + Sync>,
    /// Policy-gated runtime handle.
    runtimes: GatedRuntimes,
    /// Verification engine for the artifact gate.
    verification: Arc<VerificationEngine>,
    /// Global quality definition registry.
    isc: Arc<IscRegistry>,
    /// Workflow-supplied quality definition override, if any.
    quality_override: Option<IscDefinition>,
    /// Advisory budget tracker.
    budget: BudgetTracker,
    /// Shared identifier generators.
    ids: Arc<EngineIds>,
}

impl JobContext {
    /// Builds a context for one job execution.
    #[expect(clippy::too_many_arguments, reason = "Assembled once per run by the runner.")]
    #[must_use]
    pub fn new(
        job: Job,
        effort: EffortLevel,
        policy: Policy,
        buffer: Arc<LocalCommandBuffer>,
        repo: Arc<dyn Repository + Send + Sync>,
        text: Option<Arc<TextRouter>>,
        embeddings: Option<Arc<EmbeddingRouter>>,
        harness: Option<Arc<HarnessRouter>>,
        verification: Arc<VerificationEngine>,
        isc: Arc<IscRegistry>,
        quality_override: Option<IscDefinition>,
        ids: Arc<EngineIds>,
    ) -> Self {
        let runtimes = GatedRuntimes::new(
            policy.clone(),
            text,
            embeddings,
            harness,
            Arc::clone(&buffer),
            job.id.clone(),
            Arc::clone(&ids),
        );
        let budget = BudgetTracker::start(effort);
        Self {
            job,
            effort,
            policy,
            buffer,
            repo,
            runtimes,
            verification,
            isc,
            quality_override,
            budget,
            ids,
        }
    }

    /// Returns the job being executed.
    #[must_use]
    pub const fn job(&self) -> &Job {
        &self.job
    }

    /// Returns the effort tier for this execution.
    #[must_use]
    pub const fn effort(&self) -> EffortLevel {
        self.effort
    }

    /// Returns the advisory budget tracker.
    #[must_use]
    pub const fn budget(&self) -> &BudgetTracker {
        &self.budget
    }

    /// Returns the policy-gated runtime handle.
    #[must_use]
    pub const fn runtimes(&self) -> &GatedRuntimes {
        &self.runtimes
    }

    /// Returns the local command buffer owned by this execution.
    #[must_use]
    pub fn buffer(&self) -> &LocalCommandBuffer {
        &self.buffer
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Returns up to `limit` artifacts of the provided kind, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when `db:read` is denied or the query fails.
    pub fn find_artifacts(&self, kind: &str, limit: usize) -> Result<Vec<Artifact>, WorkflowError> {
        self.policy.require(CAP_DB_READ, Some("context.find_artifacts"))?;
        Ok(self.repo.artifacts_by_kind(kind, limit)?)
    }

    /// Returns every artifact produced by the executing job so far.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when `db:read` is denied or the query fails.
    pub fn job_artifacts(&self) -> Result<Vec<Artifact>, WorkflowError> {
        self.policy.require(CAP_DB_READ, Some("context.job_artifacts"))?;
        Ok(self.repo.artifacts_for_job(&self.job.id)?)
    }

    // ------------------------------------------------------------------
    // Buffered Writes
    // ------------------------------------------------------------------

    /// Verifies and buffers a new artifact, returning its identifier.
    ///
    /// When the artifact kind has a quality definition (workflow override
    /// first, then the global registry) every criterion is verified
    /// synchronously before anything is buffered for the artifact. The
    /// report is buffered pass or fail; a compact summary is attached to
    /// the payload under the `verification` key, and a requirement
    /// document is synthesized alongside the artifact.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::QualityGate`] when a CRITICAL criterion
    /// failed; the artifact is withheld entirely.
    pub fn emit_artifact(
        &self,
        kind: &str,
        title: Option<String>,
        content_md: Option<String>,
        data: Value,
    ) -> Result<ArtifactId, WorkflowError> {
        let artifact_id = ArtifactId::new(self.ids.artifacts.issue());
        let mut artifact = Artifact {
            id: artifact_id.clone(),
            kind: kind.to_string(),
            job_id: Some(self.job.id.clone()),
            title,
            content_md,
            data,
        };

        let definition = self
            .quality_override
            .as_ref()
            .filter(|candidate| candidate.artifact_kind == kind)
            .or_else(|| self.isc.definition_for_kind(kind));

        let summary = if let Some(definition) = definition {
            let report = self.verification.verify_all_criteria(
                definition,
                &artifact,
                Some(&self.job.id),
                Some(&self.job.workflow_id),
            );
            let summary = CriteriaSummary {
                definition: definition.name.clone(),
                version: definition.version.clone(),
                passed: report.passed,
                critical_failures: report.critical_failures(definition),
                total_criteria: definition.ideal.len() + definition.anti.len(),
            };
            self.buffer.enqueue(Command::IscReportCreate {
                report,
            });
            if summary.critical_failures > 0 {
                return Err(WorkflowError::QualityGate {
                    definition: summary.definition,
                    critical_failures: summary.critical_failures,
                });
            }
            attach_verification(&mut artifact.data, &summary);
            Some(summary)
        } else {
            None
        };

        let content_hash = artifact.content().map(|content| hash_bytes(content.as_bytes()));
        let intent = artifact
            .title
            .clone()
            .unwrap_or_else(|| format!("artifact {kind}"));
        self.buffer.enqueue(Command::ArtifactCreate {
            artifact,
        });
        if let Some(summary) = summary {
            self.buffer.enqueue(Command::PrdCreate {
                prd: PrdRecord {
                    id: PrdId::new(self.ids.prds.issue()),
                    artifact_id: artifact_id.clone(),
                    job_id: Some(self.job.id.clone()),
                    intent,
                    constraints: Vec::new(),
                    criteria: Some(summary),
                    content_hash,
                    created_at: Timestamp::now(),
                },
            });
        }
        Ok(artifact_id)
    }

    /// Buffers a new queued job for the provided workflow.
    pub fn spawn_job(&self, workflow_id: WorkflowId, input: Value) -> JobId {
        let job_id = JobId::new(self.ids.jobs.issue());
        self.buffer.enqueue(Command::JobCreate {
            job: Job::queued(job_id.clone(), workflow_id, input),
        });
        job_id
    }

    /// Buffers a status transition for the executing job.
    ///
    /// The runner honors a workflow-set terminal or `needs_approval` status
    /// over its own default finalization.
    pub fn set_job_status(&self, status: JobStatus) {
        self.buffer.enqueue(Command::JobUpdateStatus {
            job_id: self.job.id.clone(),
            status,
            at: Timestamp::now(),
        });
    }

    /// Buffers an append-only log line on a requirement document.
    pub fn append_prd_log(&self, prd_id: PrdId, line: impl Into<String>) {
        self.buffer.enqueue(Command::PrdAppendLog {
            prd_id,
            line: line.into(),
            at: Timestamp::now(),
        });
    }

    /// Buffers a requirement document patch.
    pub fn update_prd(
        &self,
        prd_id: PrdId,
        intent: Option<String>,
        constraints: Option<Vec<String>>,
    ) {
        self.buffer.enqueue(Command::PrdUpdate {
            prd_id,
            intent,
            constraints,
        });
    }

    /// Buffers a raw command, gated by `db:write`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Policy`] when `db:write` is not granted.
    pub fn enqueue_command(&self, command: Command) -> Result<(), WorkflowError> {
        self.policy.require(CAP_DB_WRITE, Some("context.enqueue_command"))?;
        self.buffer.enqueue(command);
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Attaches the verification summary to an artifact payload.
fn attach_verification(data: &mut Value, summary: &CriteriaSummary) {
    let summary_value = serde_json::to_value(summary).unwrap_or(Value::Null);
    match data {
        Value::Object(map) => {
            map.insert("verification".to_string(), summary_value);
        }
        Value::Null => {
            *data = json!({ "verification": summary_value });
        }
        other => {
            let payload = other.take();
            *other = json!({ "payload": payload, "verification": summary_value });
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
