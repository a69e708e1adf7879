// crates/workloom-engine/src/telemetry.rs
// ============================================================================
// Module: Engine Telemetry
// Description: Observability hooks for flush, runner, and reflection paths.
// Purpose: Provide metric events and counters without hard dependencies.
// Dependencies: workloom-core
// ============================================================================

//! ## Overview
//! This module exposes a thin metrics interface for engine counters. It is
//! intentionally dependency-light so downstream deployments can plug in
//! Prometheus or OpenTelemetry without redesign. Telemetry must avoid leaking
//! artifact content or prompts; events carry sizes and labels only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use workloom_core::WorkflowId;

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Job run outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum RunOutcome {
    /// Run finished and the job succeeded.
    Succeeded,
    /// Run finished and the job failed.
    Failed,
    /// Run parked the job awaiting approval.
    Parked,
}

impl RunOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Parked => "parked",
        }
    }
}

/// Flush tick metric event payload.
///
/// # Invariants
/// - `batch_size` counts commands drained for the tick, committed or not.
#[derive(Debug, Clone, Copy)]
pub struct FlushMetricEvent {
    /// Commands drained in this tick.
    pub batch_size: usize,
    /// Whether the batch committed.
    pub committed: bool,
}

/// Job run metric event payload.
#[derive(Debug, Clone)]
pub struct RunMetricEvent {
    /// Workflow the job executed.
    pub workflow_id: WorkflowId,
    /// Run outcome classification.
    pub outcome: RunOutcome,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for engine counters.
pub trait EngineMetrics: Send + Sync {
    /// Records one flush tick.
    fn record_flush(&self, event: FlushMetricEvent);
    /// Records one job run outcome.
    fn record_run(&self, event: RunMetricEvent);
    /// Records one best-effort reflection capture failure.
    fn record_reflection_failure(&self);
    /// Records a start call on an already-running timer component.
    fn record_duplicate_start(&self, component: &'static str);
    /// Records a recoverable timer tick error.
    fn record_tick_error(&self, component: &'static str);
}

/// No-op metrics sink.
///
/// # Invariants
/// - Metrics are intentionally discarded.
pub struct NoopMetrics;

impl EngineMetrics for NoopMetrics {
    fn record_flush(&self, _event: FlushMetricEvent) {}

    fn record_run(&self, _event: RunMetricEvent) {}

    fn record_reflection_failure(&self) {}

    fn record_duplicate_start(&self, _component: &'static str) {}

    fn record_tick_error(&self, _component: &'static str) {}
}

// ============================================================================
// SECTION: Counter Sink
// ============================================================================

/// Atomic counter metrics sink suitable for in-process inspection.
///
/// # Invariants
/// - Counters only increase; readers tolerate relaxed ordering.
#[derive(Debug, Default)]
pub struct CounterMetrics {
    /// Flush batches committed.
    batches_committed: AtomicU64,
    /// Flush batches discarded after an apply failure.
    batches_discarded: AtomicU64,
    /// Total commands drained across flush ticks.
    commands_flushed: AtomicU64,
    /// Runs that ended in `succeeded`.
    runs_succeeded: AtomicU64,
    /// Runs that ended in `failed`.
    runs_failed: AtomicU64,
    /// Runs that parked the job in `needs_approval`.
    runs_parked: AtomicU64,
    /// Reflection captures that failed.
    reflection_failures: AtomicU64,
    /// Duplicate timer start calls.
    duplicate_starts: AtomicU64,
    /// Recoverable timer tick errors.
    tick_errors: AtomicU64,
}

impl CounterMetrics {
    /// Creates a zeroed counter sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of committed flush batches.
    #[must_use]
    pub fn batches_committed(&self) -> u64 {
        self.batches_committed.load(Ordering::Relaxed)
    }

    /// Returns the number of discarded flush batches.
    #[must_use]
    pub fn batches_discarded(&self) -> u64 {
        self.batches_discarded.load(Ordering::Relaxed)
    }

    /// Returns the total number of commands drained by the flush loop.
    #[must_use]
    pub fn commands_flushed(&self) -> u64 {
        self.commands_flushed.load(Ordering::Relaxed)
    }

    /// Returns the number of runs for the provided outcome.
    #[must_use]
    pub fn runs(&self, outcome: RunOutcome) -> u64 {
        match outcome {
            RunOutcome::Succeeded => self.runs_succeeded.load(Ordering::Relaxed),
            RunOutcome::Failed => self.runs_failed.load(Ordering::Relaxed),
            RunOutcome::Parked => self.runs_parked.load(Ordering::Relaxed),
        }
    }

    /// Returns the number of failed reflection captures.
    #[must_use]
    pub fn reflection_failures(&self) -> u64 {
        self.reflection_failures.load(Ordering::Relaxed)
    }

    /// Returns the number of duplicate timer start calls.
    #[must_use]
    pub fn duplicate_starts(&self) -> u64 {
        self.duplicate_starts.load(Ordering::Relaxed)
    }

    /// Returns the number of recoverable timer tick errors.
    #[must_use]
    pub fn tick_errors(&self) -> u64 {
        self.tick_errors.load(Ordering::Relaxed)
    }
}

impl EngineMetrics for CounterMetrics {
    fn record_flush(&self, event: FlushMetricEvent) {
        let batch = u64::try_from(event.batch_size).unwrap_or(u64::MAX);
        self.commands_flushed.fetch_add(batch, Ordering::Relaxed);
        if event.committed {
            self.batches_committed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.batches_discarded.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_run(&self, event: RunMetricEvent) {
        let counter = match event.outcome {
            RunOutcome::Succeeded => &self.runs_succeeded,
            RunOutcome::Failed => &self.runs_failed,
            RunOutcome::Parked => &self.runs_parked,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_reflection_failure(&self) {
        self.reflection_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_duplicate_start(&self, _component: &'static str) {
        self.duplicate_starts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_tick_error(&self, _component: &'static str) {
        self.tick_errors.fetch_add(1, Ordering::Relaxed);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::missing_panics_doc,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use super::*;

    #[test]
    fn counters_accumulate_flush_and_run_events() {
        let metrics = CounterMetrics::new();
        metrics.record_flush(FlushMetricEvent {
            batch_size: 3,
            committed: true,
        });
        metrics.record_flush(FlushMetricEvent {
            batch_size: 2,
            committed: false,
        });
        metrics.record_run(RunMetricEvent {
            workflow_id: WorkflowId::new("echo"),
            outcome: RunOutcome::Failed,
        });
        assert_eq!(metrics.batches_committed(), 1);
        assert_eq!(metrics.batches_discarded(), 1);
        assert_eq!(metrics.commands_flushed(), 5);
        assert_eq!(metrics.runs(RunOutcome::Failed), 1);
        assert_eq!(metrics.runs(RunOutcome::Succeeded), 0);
    }
}
