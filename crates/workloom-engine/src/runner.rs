// crates/workloom-engine/src/runner.rs
// ============================================================================
// Module: Job Runner
// Description: Sequential execution of queued jobs through their workflows.
// Purpose: Drive the job state machine from queued to a final status.
// Dependencies: workloom-core, workloom-router, workloom-verify, serde
// ============================================================================

//! ## Overview
//! One tick fetches a bounded batch of queued jobs and executes them
//! sequentially. The running transition goes straight to the global queue so
//! observers see it even when the run itself never flushes; everything else
//! a run produces stays in a fresh local buffer until the run finishes.
//!
//! Final status precedence: a workflow-set terminal or `needs_approval`
//! status is honored as-is, whether the run or its verify hook enqueued it;
//! otherwise a declared verify hook's verdict decides; then the
//! approval-by-default switch; then `succeeded`. A parked job carries
//! exactly one approval-request artifact.
//! Invariants:
//! - A failing run still flushes partial progress, and a failed status is
//!   enqueued unless the workflow already buffered a terminal one.
//! - Per-job errors never abort the tick.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use workloom_core::APPROVAL_REQUEST_KIND;
use workloom_core::Artifact;
use workloom_core::ArtifactId;
use workloom_core::Command;
use workloom_core::CommandQueue;
use workloom_core::CommandSink;
use workloom_core::EffortLevel;
use workloom_core::Job;
use workloom_core::JobId;
use workloom_core::JobStatus;
use workloom_core::LocalCommandBuffer;
use workloom_core::Policy;
use workloom_core::Repository;
use workloom_core::StoreError;
use workloom_core::Timestamp;
use workloom_router::EmbeddingRouter;
use workloom_router::HarnessRouter;
use workloom_router::TextRouter;
use workloom_verify::VerificationEngine;

use crate::context::EngineIds;
use crate::context::JobContext;
use crate::isc_registry::IscRegistry;
use crate::reflection::ReflectionCapture;
use crate::telemetry::EngineMetrics;
use crate::telemetry::RunMetricEvent;
use crate::telemetry::RunOutcome;
use crate::workflow::Workflow;
use crate::workflow::WorkflowRegistry;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default queued jobs fetched per tick.
const DEFAULT_MAX_JOBS_PER_TICK: usize = 4;

/// Runner configuration.
///
/// # Invariants
/// - `require_approval_by_default` only applies when neither the workflow
///   nor its verify hook decided a final status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Maximum queued jobs fetched per tick.
    #[serde(default = "default_max_jobs")]
    pub max_jobs_per_tick: usize,
    /// Park undecided jobs in `needs_approval` instead of succeeding them.
    #[serde(default)]
    pub require_approval_by_default: bool,
    /// Effort tier applied to every execution.
    #[serde(default)]
    pub effort: EffortLevel,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_jobs_per_tick: DEFAULT_MAX_JOBS_PER_TICK,
            require_approval_by_default: false,
            effort: EffortLevel::default(),
        }
    }
}

/// Serde default for the per-tick job bound.
const fn default_max_jobs() -> usize {
    DEFAULT_MAX_JOBS_PER_TICK
}

// ============================================================================
// SECTION: Routers
// ============================================================================

/// Optional routed runtimes handed to every job execution.
///
/// # Invariants
/// - A missing router surfaces to workflows as an exhausted route, not a
///   panic.
#[derive(Default, Clone)]
pub struct EngineRouters {
    /// Routed text generation.
    pub text: Option<Arc<TextRouter>>,
    /// Routed embedding generation.
    pub embeddings: Option<Arc<EmbeddingRouter>>,
    /// Routed harness execution.
    pub harness: Option<Arc<HarnessRouter>>,
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Sequential job runner.
///
/// # Invariants
/// - Jobs in one tick execute sequentially; parallelism lives in criterion
///   verification, not here.
pub struct Runner {
    /// Read-only repository surface.
    repo: Arc<dyn Repository + Send + Sync>,
    /// Shared queue receiving the flushed command stream.
    queue: Arc<CommandQueue>,
    /// Startup-built workflow registry.
    workflows: Arc<WorkflowRegistry>,
    /// Verification engine backing the artifact gate.
    verification: Arc<VerificationEngine>,
    /// Global quality definition registry.
    isc: Arc<IscRegistry>,
    /// Optional routed runtimes.
    routers: EngineRouters,
    /// Metrics sink.
    metrics: Arc<dyn EngineMetrics>,
    /// Best-effort reflection prompter.
    reflection: ReflectionCapture,
    /// Shared identifier generators.
    ids: Arc<EngineIds>,
    /// Runner configuration.
    config: RunnerConfig,
}

impl Runner {
    /// Creates a runner over the provided seams.
    #[expect(clippy::too_many_arguments, reason = "Assembled once at engine startup.")]
    #[must_use]
    pub fn new(
        repo: Arc<dyn Repository + Send + Sync>,
        queue: Arc<CommandQueue>,
        workflows: Arc<WorkflowRegistry>,
        verification: Arc<VerificationEngine>,
        isc: Arc<IscRegistry>,
        routers: EngineRouters,
        metrics: Arc<dyn EngineMetrics>,
        config: RunnerConfig,
    ) -> Self {
        let ids = Arc::new(EngineIds::new());
        let reflection = ReflectionCapture::new(Arc::clone(&ids));
        Self {
            repo,
            queue,
            workflows,
            verification,
            isc,
            routers,
            metrics,
            reflection,
            ids,
            config,
        }
    }

    /// Fetches and executes one batch of queued jobs.
    ///
    /// Returns the number of jobs executed. Per-job failures are absorbed
    /// into the jobs themselves and never surface here.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the queued-job fetch fails.
    pub fn run_once(&self) -> Result<usize, StoreError> {
        let jobs = self.repo.queued_jobs(self.config.max_jobs_per_tick)?;
        let executed = jobs.len();
        for job in jobs {
            self.run_job(&job);
        }
        Ok(executed)
    }

    /// Executes one job end to end.
    fn run_job(&self, job: &Job) {
        // Straight to the global queue so the transition survives even if
        // the run never flushes its buffer.
        self.queue.enqueue(Command::JobUpdateStatus {
            job_id: job.id.clone(),
            status: JobStatus::Running,
            at: Timestamp::now(),
        });

        let Some(workflow) = self.workflows.get(&job.workflow_id) else {
            self.queue.enqueue(Command::JobUpdateStatus {
                job_id: job.id.clone(),
                status: JobStatus::Failed,
                at: Timestamp::now(),
            });
            self.record_run(job, RunOutcome::Failed);
            return;
        };

        let policy = workflow
            .capabilities()
            .map_or_else(Policy::workflow_default, Policy::from_declared);
        let buffer = Arc::new(LocalCommandBuffer::new());
        let context = JobContext::new(
            job.clone(),
            self.config.effort,
            policy,
            Arc::clone(&buffer),
            Arc::clone(&self.repo),
            self.routers.text.clone(),
            self.routers.embeddings.clone(),
            self.routers.harness.clone(),
            Arc::clone(&self.verification),
            Arc::clone(&self.isc),
            workflow.quality_definition(),
            Arc::clone(&self.ids),
        );

        match workflow.run(&context, &job.input) {
            Ok(()) => {
                self.capture_reflection(&buffer, job, "run completed");
                let outcome = self.finalize(workflow.as_ref(), &context, job, &buffer);
                buffer.flush_into(self.queue.as_ref());
                self.record_run(job, outcome);
            }
            Err(err) => {
                self.capture_reflection(&buffer, job, &format!("run failed: {err}"));
                let already_terminal =
                    workflow_decided_status(&buffer, &job.id).is_some_and(JobStatus::is_terminal);
                buffer.flush_into(self.queue.as_ref());
                if !already_terminal {
                    self.queue.enqueue(Command::JobUpdateStatus {
                        job_id: job.id.clone(),
                        status: JobStatus::Failed,
                        at: Timestamp::now(),
                    });
                }
                self.record_run(job, RunOutcome::Failed);
            }
        }
    }

    /// Decides and buffers the final status for a run that returned cleanly.
    fn finalize(
        &self,
        workflow: &dyn Workflow,
        context: &JobContext,
        job: &Job,
        buffer: &LocalCommandBuffer,
    ) -> RunOutcome {
        if let Some(status) = workflow_decided_status(buffer, &job.id) {
            return match status {
                JobStatus::NeedsApproval => {
                    self.ensure_approval_request(job, buffer);
                    RunOutcome::Parked
                }
                JobStatus::Failed => RunOutcome::Failed,
                _ => RunOutcome::Succeeded,
            };
        }

        if workflow.has_verify() {
            buffer.enqueue(Command::JobUpdateStatus {
                job_id: job.id.clone(),
                status: JobStatus::Verifying,
                at: Timestamp::now(),
            });
            let verdict = workflow.verify(context);
            // The hook may have parked or finished the job itself; that
            // decision outranks the verdict, and appending another terminal
            // status would be rejected at apply time.
            if let Some(status) = workflow_decided_status(buffer, &job.id) {
                return match status {
                    JobStatus::NeedsApproval => {
                        self.ensure_approval_request(job, buffer);
                        RunOutcome::Parked
                    }
                    JobStatus::Failed => RunOutcome::Failed,
                    _ => RunOutcome::Succeeded,
                };
            }
            let status = match verdict {
                Ok(()) => JobStatus::Succeeded,
                Err(_) => JobStatus::Failed,
            };
            buffer.enqueue(Command::JobUpdateStatus {
                job_id: job.id.clone(),
                status,
                at: Timestamp::now(),
            });
            return if status == JobStatus::Succeeded {
                RunOutcome::Succeeded
            } else {
                RunOutcome::Failed
            };
        }

        if self.config.require_approval_by_default {
            buffer.enqueue(Command::JobUpdateStatus {
                job_id: job.id.clone(),
                status: JobStatus::NeedsApproval,
                at: Timestamp::now(),
            });
            self.ensure_approval_request(job, buffer);
            return RunOutcome::Parked;
        }

        buffer.enqueue(Command::JobUpdateStatus {
            job_id: job.id.clone(),
            status: JobStatus::Succeeded,
            at: Timestamp::now(),
        });
        RunOutcome::Succeeded
    }

    /// Buffers an approval-request artifact unless one already exists.
    ///
    /// Both the buffered commands and the already-persisted artifacts count,
    /// so re-parking a job never duplicates the request.
    fn ensure_approval_request(&self, job: &Job, buffer: &LocalCommandBuffer) {
        let buffered = buffer.snapshot().into_iter().any(|command| {
            matches!(
                command,
                Command::ArtifactCreate { artifact }
                    if artifact.kind == APPROVAL_REQUEST_KIND
                        && artifact.job_id.as_ref() == Some(&job.id)
            )
        });
        if buffered {
            return;
        }
        let persisted = self
            .repo
            .artifacts_for_job(&job.id)
            .unwrap_or_default()
            .iter()
            .any(|artifact| artifact.kind == APPROVAL_REQUEST_KIND);
        if persisted {
            return;
        }
        buffer.enqueue(Command::ArtifactCreate {
            artifact: Artifact {
                id: ArtifactId::new(self.ids.artifacts.issue()),
                kind: APPROVAL_REQUEST_KIND.to_string(),
                job_id: Some(job.id.clone()),
                title: Some(format!("Approval requested for job {}", job.id)),
                content_md: None,
                data: json!({ "workflow_id": &job.workflow_id }),
            },
        });
    }

    /// Captures a best-effort reflection at thorough effort.
    fn capture_reflection(&self, buffer: &LocalCommandBuffer, job: &Job, summary: &str) {
        if !self.config.effort.captures_reflection() {
            return;
        }
        let captured = self
            .routers
            .text
            .as_deref()
            .and_then(|router| self.reflection.capture(router, job, summary));
        match captured {
            Some(reflection) => buffer.enqueue(Command::ReflectionCreate {
                reflection,
            }),
            None => self.metrics.record_reflection_failure(),
        }
    }

    /// Records one run outcome in telemetry.
    fn record_run(&self, job: &Job, outcome: RunOutcome) {
        self.metrics.record_run(RunMetricEvent {
            workflow_id: job.workflow_id.clone(),
            outcome,
        });
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the last workflow-buffered terminal or parking status, if any.
fn workflow_decided_status(buffer: &LocalCommandBuffer, job_id: &JobId) -> Option<JobStatus> {
    buffer
        .snapshot()
        .into_iter()
        .filter_map(|command| match command {
            Command::JobUpdateStatus {
                job_id: target,
                status,
                ..
            } if target == *job_id
                && (status.is_terminal() || status == JobStatus::NeedsApproval) =>
            {
                Some(status)
            }
            _ => None,
        })
        .last()
}
