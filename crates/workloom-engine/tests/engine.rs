// crates/workloom-engine/tests/engine.rs
// ============================================================================
// Module: Engine Integration Tests
// Description: Runner, flush loop, and scheduler behavior over a real store.
// Purpose: Exercise the job state machine end to end.
// Dependencies: workloom-core, workloom-engine, workloom-store-sqlite, tempfile
// ============================================================================

//! Runner, flush loop, and scheduler integration tests over a real store.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;
use workloom_core::APPROVAL_REQUEST_KIND;
use workloom_core::Command;
use workloom_core::CommandQueue;
use workloom_core::CommandSink;
use workloom_core::CommandStore;
use workloom_core::Criterion;
use workloom_core::CriterionId;
use workloom_core::CriterionPriority;
use workloom_core::IscDefinition;
use workloom_core::Job;
use workloom_core::JobId;
use workloom_core::JobStatus;
use workloom_core::Repository;
use workloom_core::VerificationMethod;
use workloom_core::WorkflowId;
use workloom_engine::CounterMetrics;
use workloom_engine::EngineRouters;
use workloom_engine::FlushConfig;
use workloom_engine::FlushLoop;
use workloom_engine::IscRegistry;
use workloom_engine::JobContext;
use workloom_engine::Runner;
use workloom_engine::RunnerConfig;
use workloom_engine::Scheduler;
use workloom_engine::SchedulerConfig;
use workloom_engine::Workflow;
use workloom_engine::WorkflowError;
use workloom_engine::WorkflowRegistry;
use workloom_store_sqlite::SqliteCommandStore;
use workloom_store_sqlite::SqliteStoreConfig;
use workloom_verify::VerificationEngine;

// ============================================================================
// SECTION: Fixture
// ============================================================================

struct Fixture {
    _dir: TempDir,
    store: Arc<SqliteCommandStore>,
    queue: Arc<CommandQueue>,
    metrics: Arc<CounterMetrics>,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let config = SqliteStoreConfig::at(dir.path().join("engine.db"));
    let store = Arc::new(SqliteCommandStore::open(&config).unwrap());
    Fixture {
        _dir: dir,
        store,
        queue: Arc::new(CommandQueue::new()),
        metrics: Arc::new(CounterMetrics::new()),
    }
}

fn build_runner(
    fixture: &Fixture,
    workflows: Vec<Arc<dyn Workflow>>,
    isc: IscRegistry,
    config: RunnerConfig,
) -> Runner {
    let mut registry = WorkflowRegistry::new();
    for workflow in workflows {
        registry.register(workflow).unwrap();
    }
    Runner::new(
        fixture.store.clone(),
        Arc::clone(&fixture.queue),
        Arc::new(registry),
        Arc::new(VerificationEngine::with_default_verifiers(None)),
        Arc::new(isc),
        EngineRouters::default(),
        fixture.metrics.clone(),
        config,
    )
}

fn seed_job(fixture: &Fixture, id: &str, workflow: &str, input: Value) -> JobId {
    let job_id = JobId::new(id);
    fixture
        .store
        .apply_batch(&[Command::JobCreate {
            job: Job::queued(job_id.clone(), WorkflowId::new(workflow), input),
        }])
        .unwrap();
    job_id
}

fn kinds(commands: &[Command]) -> Vec<&'static str> {
    commands.iter().map(Command::kind).collect()
}

fn statuses(commands: &[Command]) -> Vec<JobStatus> {
    commands
        .iter()
        .filter_map(|command| match command {
            Command::JobUpdateStatus {
                status, ..
            } => Some(*status),
            _ => None,
        })
        .collect()
}

fn critical_pattern_definition(kind: &str, pattern: &str) -> IscDefinition {
    IscDefinition {
        name: format!("{kind}-quality"),
        version: "1".to_string(),
        artifact_kind: kind.to_string(),
        ideal: vec![Criterion {
            id: CriterionId::new("must-match"),
            description: "content matches the required pattern".to_string(),
            priority: CriterionPriority::Critical,
            method: VerificationMethod::Pattern {
                pattern: pattern.to_string(),
            },
        }],
        anti: Vec::new(),
    }
}

// ============================================================================
// SECTION: Workflows
// ============================================================================

struct EchoWorkflow;

impl Workflow for EchoWorkflow {
    fn id(&self) -> WorkflowId {
        WorkflowId::new("echo")
    }

    fn run(&self, context: &JobContext, input: &Value) -> Result<(), WorkflowError> {
        let text = input.get("text").and_then(Value::as_str).unwrap_or_default().to_string();
        context.emit_artifact("plain.v1", None, Some(text), Value::Null)?;
        Ok(())
    }
}

struct GatedReportWorkflow;

impl Workflow for GatedReportWorkflow {
    fn id(&self) -> WorkflowId {
        WorkflowId::new("gated-report")
    }

    fn run(&self, context: &JobContext, _input: &Value) -> Result<(), WorkflowError> {
        context.emit_artifact(
            "report.v1",
            Some("Quarterly report".to_string()),
            Some("nothing to see here".to_string()),
            json!({ "quarter": "q3" }),
        )?;
        Ok(())
    }
}

struct SelfParkingWorkflow;

impl Workflow for SelfParkingWorkflow {
    fn id(&self) -> WorkflowId {
        WorkflowId::new("self-parking")
    }

    fn run(&self, context: &JobContext, _input: &Value) -> Result<(), WorkflowError> {
        context.emit_artifact(
            APPROVAL_REQUEST_KIND,
            Some("Please approve".to_string()),
            None,
            Value::Null,
        )?;
        context.set_job_status(JobStatus::NeedsApproval);
        Ok(())
    }
}

struct ParkingWorkflow;

impl Workflow for ParkingWorkflow {
    fn id(&self) -> WorkflowId {
        WorkflowId::new("parking")
    }

    fn run(&self, context: &JobContext, _input: &Value) -> Result<(), WorkflowError> {
        context.set_job_status(JobStatus::NeedsApproval);
        Ok(())
    }
}

struct VerifiedWorkflow {
    pass: bool,
}

impl Workflow for VerifiedWorkflow {
    fn id(&self) -> WorkflowId {
        WorkflowId::new("verified")
    }

    fn run(&self, _context: &JobContext, _input: &Value) -> Result<(), WorkflowError> {
        Ok(())
    }

    fn has_verify(&self) -> bool {
        true
    }

    fn verify(&self, _context: &JobContext) -> Result<(), WorkflowError> {
        if self.pass {
            Ok(())
        } else {
            Err(WorkflowError::Failed("verification rejected the output".to_string()))
        }
    }
}

struct ParkingVerifyWorkflow;

impl Workflow for ParkingVerifyWorkflow {
    fn id(&self) -> WorkflowId {
        WorkflowId::new("parking-verify")
    }

    fn run(&self, _context: &JobContext, _input: &Value) -> Result<(), WorkflowError> {
        Ok(())
    }

    fn has_verify(&self) -> bool {
        true
    }

    fn verify(&self, context: &JobContext) -> Result<(), WorkflowError> {
        context.set_job_status(JobStatus::NeedsApproval);
        Ok(())
    }
}

struct FailingVerifyDecisionWorkflow;

impl Workflow for FailingVerifyDecisionWorkflow {
    fn id(&self) -> WorkflowId {
        WorkflowId::new("failing-verify-decision")
    }

    fn run(&self, _context: &JobContext, _input: &Value) -> Result<(), WorkflowError> {
        Ok(())
    }

    fn has_verify(&self) -> bool {
        true
    }

    fn verify(&self, context: &JobContext) -> Result<(), WorkflowError> {
        context.set_job_status(JobStatus::Failed);
        Ok(())
    }
}

struct PartialFailureWorkflow;

impl Workflow for PartialFailureWorkflow {
    fn id(&self) -> WorkflowId {
        WorkflowId::new("partial-failure")
    }

    fn run(&self, context: &JobContext, _input: &Value) -> Result<(), WorkflowError> {
        context.emit_artifact("plain.v1", None, Some("partial".to_string()), Value::Null)?;
        Err(WorkflowError::Failed("boom".to_string()))
    }
}

// ============================================================================
// SECTION: Runner Tests
// ============================================================================

#[test]
fn echo_run_produces_artifact_then_succeeded() {
    let fixture = fixture();
    let job_id = seed_job(&fixture, "job-echo", "echo", json!({ "text": "hello" }));
    let runner = build_runner(
        &fixture,
        vec![Arc::new(EchoWorkflow)],
        IscRegistry::new(),
        RunnerConfig::default(),
    );

    assert_eq!(runner.run_once().unwrap(), 1);

    let drained = fixture.queue.drain(100);
    assert_eq!(kinds(&drained), vec!["job.update_status", "artifact.create", "job.update_status"]);
    assert_eq!(statuses(&drained), vec![JobStatus::Running, JobStatus::Succeeded]);
    let Command::ArtifactCreate {
        artifact,
    } = &drained[1] else {
        panic!("expected artifact.create");
    };
    assert_eq!(artifact.kind, "plain.v1");
    assert_eq!(artifact.job_id.as_ref(), Some(&job_id));
    assert_eq!(artifact.content(), Some("hello"));
}

#[test]
fn echo_run_applies_cleanly_and_sets_job_timestamps() {
    let fixture = fixture();
    let job_id = seed_job(&fixture, "job-applied", "echo", json!({ "text": "hi" }));
    let runner = build_runner(
        &fixture,
        vec![Arc::new(EchoWorkflow)],
        IscRegistry::new(),
        RunnerConfig::default(),
    );

    runner.run_once().unwrap();
    let drained = fixture.queue.drain(100);
    fixture.store.apply_batch(&drained).unwrap();

    let job = fixture.store.job(&job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Succeeded);
    assert!(job.started_at.is_some());
    assert!(job.finished_at.is_some());
    assert_eq!(fixture.store.artifacts_for_job(&job_id).unwrap().len(), 1);
}

#[test]
fn critical_criterion_failure_withholds_the_artifact_and_fails_the_job() {
    let fixture = fixture();
    let job_id = seed_job(&fixture, "job-gated", "gated-report", Value::Null);
    let isc = IscRegistry::new();
    isc.populate(vec![critical_pattern_definition("report.v1", "NEEDLE")]).unwrap();
    let runner = build_runner(
        &fixture,
        vec![Arc::new(GatedReportWorkflow)],
        isc,
        RunnerConfig::default(),
    );

    runner.run_once().unwrap();

    let drained = fixture.queue.drain(100);
    let drained_kinds = kinds(&drained);
    assert!(!drained_kinds.contains(&"artifact.create"));
    assert!(!drained_kinds.contains(&"prd.create"));
    assert!(drained_kinds.contains(&"isc_report.create"));
    assert_eq!(statuses(&drained), vec![JobStatus::Running, JobStatus::Failed]);

    fixture.store.apply_batch(&drained).unwrap();
    assert_eq!(fixture.store.job(&job_id).unwrap().unwrap().status, JobStatus::Failed);
    assert!(fixture.store.artifacts_for_job(&job_id).unwrap().is_empty());
}

#[test]
fn passing_criteria_attach_a_summary_and_synthesize_a_prd() {
    let fixture = fixture();
    seed_job(&fixture, "job-passing", "gated-report", Value::Null);
    let isc = IscRegistry::new();
    isc.populate(vec![critical_pattern_definition("report.v1", "nothing")]).unwrap();
    let runner = build_runner(
        &fixture,
        vec![Arc::new(GatedReportWorkflow)],
        isc,
        RunnerConfig::default(),
    );

    runner.run_once().unwrap();

    let drained = fixture.queue.drain(100);
    assert_eq!(
        kinds(&drained),
        vec![
            "job.update_status",
            "isc_report.create",
            "artifact.create",
            "prd.create",
            "job.update_status",
        ]
    );
    let Command::ArtifactCreate {
        artifact,
    } = &drained[2] else {
        panic!("expected artifact.create");
    };
    let summary = artifact.data.get("verification").unwrap();
    assert_eq!(summary.get("passed"), Some(&json!(true)));
    assert_eq!(artifact.data.get("quarter"), Some(&json!("q3")));
    let Command::PrdCreate {
        prd,
    } = &drained[3] else {
        panic!("expected prd.create");
    };
    assert_eq!(prd.artifact_id, artifact.id);
    assert!(prd.content_hash.is_some());
}

#[test]
fn parked_job_carries_exactly_one_approval_request() {
    let fixture = fixture();
    seed_job(&fixture, "job-parked", "parking", Value::Null);
    let runner = build_runner(
        &fixture,
        vec![Arc::new(ParkingWorkflow)],
        IscRegistry::new(),
        RunnerConfig::default(),
    );

    runner.run_once().unwrap();

    let drained = fixture.queue.drain(100);
    assert_eq!(statuses(&drained), vec![JobStatus::Running, JobStatus::NeedsApproval]);
    let approvals = drained
        .iter()
        .filter(|command| {
            matches!(
                command,
                Command::ArtifactCreate { artifact } if artifact.kind == APPROVAL_REQUEST_KIND
            )
        })
        .count();
    assert_eq!(approvals, 1);
}

#[test]
fn workflow_supplied_approval_request_is_not_duplicated() {
    let fixture = fixture();
    seed_job(&fixture, "job-self-parked", "self-parking", Value::Null);
    let runner = build_runner(
        &fixture,
        vec![Arc::new(SelfParkingWorkflow)],
        IscRegistry::new(),
        RunnerConfig::default(),
    );

    runner.run_once().unwrap();

    let drained = fixture.queue.drain(100);
    let approvals = drained
        .iter()
        .filter(|command| {
            matches!(
                command,
                Command::ArtifactCreate { artifact } if artifact.kind == APPROVAL_REQUEST_KIND
            )
        })
        .count();
    assert_eq!(approvals, 1);
}

#[test]
fn verify_hook_failure_fails_the_job_after_verifying() {
    let fixture = fixture();
    seed_job(&fixture, "job-verify-fail", "verified", Value::Null);
    let runner = build_runner(
        &fixture,
        vec![Arc::new(VerifiedWorkflow {
            pass: false,
        })],
        IscRegistry::new(),
        RunnerConfig::default(),
    );

    runner.run_once().unwrap();

    let drained = fixture.queue.drain(100);
    assert_eq!(
        statuses(&drained),
        vec![JobStatus::Running, JobStatus::Verifying, JobStatus::Failed]
    );
}

#[test]
fn verify_hook_success_succeeds_the_job_after_verifying() {
    let fixture = fixture();
    seed_job(&fixture, "job-verify-pass", "verified", Value::Null);
    let runner = build_runner(
        &fixture,
        vec![Arc::new(VerifiedWorkflow {
            pass: true,
        })],
        IscRegistry::new(),
        RunnerConfig::default(),
    );

    runner.run_once().unwrap();

    let drained = fixture.queue.drain(100);
    assert_eq!(
        statuses(&drained),
        vec![JobStatus::Running, JobStatus::Verifying, JobStatus::Succeeded]
    );
}

#[test]
fn verify_hook_parking_the_job_is_honored_with_an_approval_request() {
    let fixture = fixture();
    let job_id = seed_job(&fixture, "job-verify-park", "parking-verify", Value::Null);
    let runner = build_runner(
        &fixture,
        vec![Arc::new(ParkingVerifyWorkflow)],
        IscRegistry::new(),
        RunnerConfig::default(),
    );

    runner.run_once().unwrap();

    let drained = fixture.queue.drain(100);
    assert_eq!(
        statuses(&drained),
        vec![JobStatus::Running, JobStatus::Verifying, JobStatus::NeedsApproval]
    );
    let approvals = drained
        .iter()
        .filter(|command| {
            matches!(
                command,
                Command::ArtifactCreate { artifact }
                    if artifact.kind == APPROVAL_REQUEST_KIND
                        && artifact.job_id.as_ref() == Some(&job_id)
            )
        })
        .count();
    assert_eq!(approvals, 1);

    fixture.store.apply_batch(&drained).unwrap();
    assert_eq!(
        fixture.store.job(&job_id).unwrap().unwrap().status,
        JobStatus::NeedsApproval
    );
}

#[test]
fn verify_hook_enqueued_failure_is_not_overridden() {
    let fixture = fixture();
    let job_id = seed_job(&fixture, "job-verify-decided", "failing-verify-decision", Value::Null);
    let runner = build_runner(
        &fixture,
        vec![Arc::new(FailingVerifyDecisionWorkflow)],
        IscRegistry::new(),
        RunnerConfig::default(),
    );

    runner.run_once().unwrap();

    let drained = fixture.queue.drain(100);
    assert_eq!(
        statuses(&drained),
        vec![JobStatus::Running, JobStatus::Verifying, JobStatus::Failed]
    );

    fixture.store.apply_batch(&drained).unwrap();
    assert_eq!(fixture.store.job(&job_id).unwrap().unwrap().status, JobStatus::Failed);
}

#[test]
fn approval_by_default_parks_undecided_jobs() {
    let fixture = fixture();
    seed_job(&fixture, "job-default-park", "echo", json!({ "text": "park me" }));
    let runner = build_runner(
        &fixture,
        vec![Arc::new(EchoWorkflow)],
        IscRegistry::new(),
        RunnerConfig {
            require_approval_by_default: true,
            ..RunnerConfig::default()
        },
    );

    runner.run_once().unwrap();

    let drained = fixture.queue.drain(100);
    assert_eq!(statuses(&drained), vec![JobStatus::Running, JobStatus::NeedsApproval]);
    assert_eq!(kinds(&drained).iter().filter(|kind| **kind == "artifact.create").count(), 2);
}

#[test]
fn failing_run_flushes_partial_progress_and_fails_the_job() {
    let fixture = fixture();
    let job_id = seed_job(&fixture, "job-partial", "partial-failure", Value::Null);
    let runner = build_runner(
        &fixture,
        vec![Arc::new(PartialFailureWorkflow)],
        IscRegistry::new(),
        RunnerConfig::default(),
    );

    runner.run_once().unwrap();

    let drained = fixture.queue.drain(100);
    assert_eq!(kinds(&drained), vec!["job.update_status", "artifact.create", "job.update_status"]);
    assert_eq!(statuses(&drained), vec![JobStatus::Running, JobStatus::Failed]);

    fixture.store.apply_batch(&drained).unwrap();
    assert_eq!(fixture.store.job(&job_id).unwrap().unwrap().status, JobStatus::Failed);
    assert_eq!(fixture.store.artifacts_for_job(&job_id).unwrap().len(), 1);
}

#[test]
fn unknown_workflow_fails_the_job() {
    let fixture = fixture();
    seed_job(&fixture, "job-unknown", "missing", Value::Null);
    let runner =
        build_runner(&fixture, Vec::new(), IscRegistry::new(), RunnerConfig::default());

    runner.run_once().unwrap();

    let drained = fixture.queue.drain(100);
    assert_eq!(statuses(&drained), vec![JobStatus::Running, JobStatus::Failed]);
}

// ============================================================================
// SECTION: Flush Loop Tests
// ============================================================================

#[test]
fn flush_once_applies_the_drained_batch() {
    let fixture = fixture();
    let job_id = JobId::new("job-flush");
    fixture.queue.enqueue(Command::JobCreate {
        job: Job::queued(job_id.clone(), WorkflowId::new("echo"), Value::Null),
    });
    let flush = FlushLoop::new(
        Arc::clone(&fixture.queue),
        fixture.store.clone(),
        FlushConfig::default(),
        fixture.metrics.clone(),
    );

    assert_eq!(flush.flush_once().unwrap(), 1);
    assert_eq!(flush.flush_once().unwrap(), 0);
    assert!(fixture.store.job(&job_id).unwrap().is_some());
    assert_eq!(fixture.metrics.batches_committed(), 1);
}

#[test]
fn flush_start_is_idempotent_and_the_timer_drains_in_background() {
    let fixture = fixture();
    let flush = FlushLoop::new(
        Arc::clone(&fixture.queue),
        fixture.store.clone(),
        FlushConfig {
            interval_ms: 10,
            batch_size: 100,
        },
        fixture.metrics.clone(),
    );
    flush.start().unwrap();
    flush.start().unwrap();
    assert_eq!(fixture.metrics.duplicate_starts(), 1);

    let job_id = JobId::new("job-bg-flush");
    fixture.queue.enqueue(Command::JobCreate {
        job: Job::queued(job_id.clone(), WorkflowId::new("echo"), Value::Null),
    });
    let deadline = Instant::now() + Duration::from_secs(5);
    while fixture.store.job(&job_id).unwrap().is_none() {
        assert!(Instant::now() < deadline, "flush timer never applied the command");
        std::thread::sleep(Duration::from_millis(10));
    }
    flush.stop();
    assert!(!flush.is_running());
}

// ============================================================================
// SECTION: Scheduler Tests
// ============================================================================

#[test]
fn scheduler_and_flush_drive_a_job_to_succeeded_end_to_end() {
    let fixture = fixture();
    let job_id = seed_job(&fixture, "job-e2e", "echo", json!({ "text": "end to end" }));
    let runner = build_runner(
        &fixture,
        vec![Arc::new(EchoWorkflow)],
        IscRegistry::new(),
        RunnerConfig::default(),
    );
    let flush = FlushLoop::new(
        Arc::clone(&fixture.queue),
        fixture.store.clone(),
        FlushConfig {
            interval_ms: 10,
            batch_size: 100,
        },
        fixture.metrics.clone(),
    );
    let scheduler = Scheduler::new(
        Arc::new(runner),
        SchedulerConfig {
            interval_ms: 25,
        },
        fixture.metrics.clone(),
    );
    flush.start().unwrap();
    scheduler.start().unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let job = fixture.store.job(&job_id).unwrap().unwrap();
        if job.status == JobStatus::Succeeded {
            break;
        }
        assert!(Instant::now() < deadline, "job never reached succeeded");
        std::thread::sleep(Duration::from_millis(20));
    }

    scheduler.stop();
    flush.stop();
    assert_eq!(fixture.store.artifacts_for_job(&job_id).unwrap().len(), 1);
}

#[test]
fn scheduler_tick_once_executes_queued_jobs_synchronously() {
    let fixture = fixture();
    seed_job(&fixture, "job-tick", "echo", json!({ "text": "tick" }));
    let runner = build_runner(
        &fixture,
        vec![Arc::new(EchoWorkflow)],
        IscRegistry::new(),
        RunnerConfig::default(),
    );
    let scheduler = Scheduler::new(
        Arc::new(runner),
        SchedulerConfig::default(),
        fixture.metrics.clone(),
    );

    assert_eq!(scheduler.tick_once().unwrap(), 1);
    assert!(!fixture.queue.drain(100).is_empty());
}
