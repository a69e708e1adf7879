// crates/workloom-engine/src/budget.rs
// ============================================================================
// Module: Budget Tracker
// Description: Advisory elapsed-time measurement against an effort budget.
// Purpose: Let workflows observe budget pressure without being preempted.
// Dependencies: workloom-core
// ============================================================================

//! ## Overview
//! The budget tracker measures elapsed wall time against the advisory budget
//! of the job's effort tier. It is purely observational: nothing in the
//! engine preempts a run that exceeds its budget. Workflows that care can
//! poll [`BudgetTracker::over_budget`] and wind down on their own.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;
use std::time::Instant;

use workloom_core::EffortLevel;

// ============================================================================
// SECTION: Tracker
// ============================================================================

/// Advisory elapsed-vs-budget tracker for one job execution.
///
/// # Invariants
/// - Never preempts; exceeding the budget only changes what observers see.
#[derive(Debug, Clone)]
pub struct BudgetTracker {
    /// Execution start instant.
    started: Instant,
    /// Advisory budget in milliseconds.
    budget_ms: u64,
}

impl BudgetTracker {
    /// Starts a tracker for the provided effort tier.
    #[must_use]
    pub fn start(effort: EffortLevel) -> Self {
        Self {
            started: Instant::now(),
            budget_ms: effort.advisory_budget_ms(),
        }
    }

    /// Starts a tracker with an explicit budget in milliseconds.
    #[must_use]
    pub fn with_budget_ms(budget_ms: u64) -> Self {
        Self {
            started: Instant::now(),
            budget_ms,
        }
    }

    /// Returns the advisory budget in milliseconds.
    #[must_use]
    pub const fn budget_ms(&self) -> u64 {
        self.budget_ms
    }

    /// Returns the elapsed execution time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Returns the remaining budget, saturating at zero.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        Duration::from_millis(self.budget_ms.saturating_sub(self.elapsed_ms()))
    }

    /// Returns true once elapsed time exceeds the advisory budget.
    #[must_use]
    pub fn over_budget(&self) -> bool {
        self.elapsed_ms() > self.budget_ms
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
