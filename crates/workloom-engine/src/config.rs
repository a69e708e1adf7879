// crates/workloom-engine/src/config.rs
// ============================================================================
// Module: Engine Configuration
// Description: Aggregated configuration for flush, scheduler, and runner.
// Purpose: Provide one deserializable configuration root for the engine.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The engine configuration aggregates the three timer-and-runner sections.
//! Every field has a serde default, so an empty document yields the stock
//! engine: 100 ms flush ticks, 5 s scheduler ticks, four jobs per tick.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::flush::FlushConfig;
use crate::runner::RunnerConfig;
use crate::scheduler::SchedulerConfig;

// ============================================================================
// SECTION: Configuration Root
// ============================================================================

/// Aggregated engine configuration.
///
/// # Invariants
/// - Defaults reproduce the stock engine cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Flush loop section.
    #[serde(default)]
    pub flush: FlushConfig,
    /// Scheduler section.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Runner section.
    #[serde(default)]
    pub runner: RunnerConfig,
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
    fn empty_document_yields_stock_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.flush.interval_ms, 100);
        assert_eq!(config.flush.batch_size, 100);
        assert_eq!(config.scheduler.interval_ms, 5_000);
        assert_eq!(config.runner.max_jobs_per_tick, 4);
        assert!(!config.runner.require_approval_by_default);
    }

    #[test]
    fn sections_override_independently() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"scheduler": {"interval_ms": 250}}"#).unwrap();
        assert_eq!(config.scheduler.interval_ms, 250);
        assert_eq!(config.flush.interval_ms, 100);
    }
}
