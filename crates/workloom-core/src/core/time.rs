// crates/workloom-core/src/core/time.rs
// ============================================================================
// Module: Workloom Time Model
// Description: Canonical timestamp representation for jobs and records.
// Purpose: Provide a single wall-clock timestamp form across Workloom records.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Workloom records carry unix-millisecond timestamps. Timers and the runner
//! read the wall clock once per record; stored values are never reinterpreted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in Workloom records.
///
/// # Invariants
/// - Values are unix epoch milliseconds.
/// - Monotonicity across records is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the current wall-clock time as a timestamp.
    #[must_use]
    pub fn now() -> Self {
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        let millis = nanos / 1_000_000;
        Self(i64::try_from(millis).unwrap_or(i64::MAX))
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the timestamp shifted backwards by the provided milliseconds.
    #[must_use]
    pub const fn minus_millis(self, millis: i64) -> Self {
        Self(self.0.saturating_sub(millis))
    }
}
