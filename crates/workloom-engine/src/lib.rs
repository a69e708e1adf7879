// crates/workloom-engine/src/lib.rs
// ============================================================================
// Module: Workloom Engine
// Description: Flush loop, scheduler, runner, and the workflow contract.
// Purpose: Drive jobs from queued to terminal through the single writer.
// Dependencies: workloom-core, workloom-router, workloom-verify, serde
// ============================================================================

//! ## Overview
//! The engine wires the core seams together: a flush loop drains the shared
//! command queue into the store (the single-writer discipline), a scheduler
//! ticks the runner, and the runner executes queued jobs through registered
//! workflows. Every job run gets a fresh local buffer, a capability policy,
//! gated runtimes, and the artifact verification gate; nothing a run
//! produces persists until its buffer is flushed into the shared queue.
//! Invariants:
//! - Exactly one flush loop applies batches per process.
//! - Job status transitions only move forward through the status lattice.
//! - An artifact with a failed CRITICAL criterion never reaches the queue.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod budget;
pub mod config;
pub mod context;
pub mod flush;
pub mod gated;
pub mod isc_registry;
pub mod reflection;
pub mod runner;
pub mod scheduler;
pub mod telemetry;
pub mod workflow;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use budget::BudgetTracker;
pub use config::EngineConfig;
pub use context::EngineIds;
pub use context::JobContext;
pub use flush::FlushConfig;
pub use flush::FlushError;
pub use flush::FlushLoop;
pub use gated::GatedRuntimes;
pub use isc_registry::IscRegistry;
pub use isc_registry::IscRegistryError;
pub use reflection::ReflectionCapture;
pub use runner::EngineRouters;
pub use runner::Runner;
pub use runner::RunnerConfig;
pub use scheduler::Scheduler;
pub use scheduler::SchedulerConfig;
pub use scheduler::SchedulerError;
pub use telemetry::CounterMetrics;
pub use telemetry::EngineMetrics;
pub use telemetry::FlushMetricEvent;
pub use telemetry::NoopMetrics;
pub use telemetry::RunMetricEvent;
pub use telemetry::RunOutcome;
pub use workflow::Workflow;
pub use workflow::WorkflowError;
pub use workflow::WorkflowRegistry;
pub use workflow::WorkflowRegistryError;
