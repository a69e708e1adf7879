// crates/workloom-core/src/interfaces/mod.rs
// ============================================================================
// Module: Workloom Interfaces
// Description: Store and repository contracts consumed by the engine.
// Purpose: Define the write and read seams between the engine and storage.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Two seams separate the engine from storage. [`CommandStore`] is the write
//! seam: the flush loop applies drained batches through it, and it is the
//! only path that mutates storage. [`Repository`] is the read seam: a
//! read-only query surface the core never writes through.
//! Invariants:
//! - `apply_batch` is all-or-nothing: a failing command rolls back the whole
//!   batch, and the batch is discarded with no retry or dead-letter queue.
//!   This is an accepted data-loss risk, stated rather than silently fixed.
//! - Readers never observe a partially-applied batch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::artifact::Artifact;
use crate::core::command::Command;
use crate::core::identifiers::JobId;
use crate::core::job::Job;
use crate::core::job::JobStatus;
use crate::core::records::TraceEvent;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Store errors surfaced through the write and read seams.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("store io error: {0}")]
    Io(String),
    /// Store data is invalid or violates a record invariant.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// A command could not be applied and the batch was rolled back.
    #[error("batch apply failed on {kind}: {message}")]
    ApplyFailed {
        /// Wire label of the command that failed.
        kind: String,
        /// Failure description.
        message: String,
    },
    /// Store backend reported an error.
    #[error("store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Command Store
// ============================================================================

/// Write seam applying command batches inside one transaction.
pub trait CommandStore {
    /// Applies every command in the batch inside one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when any command fails to apply; the whole
    /// batch is rolled back and discarded.
    fn apply_batch(&self, commands: &[Command]) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Repository
// ============================================================================

/// Read-only query surface over the persistent store.
pub trait Repository {
    /// Returns up to `limit` queued jobs, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn queued_jobs(&self, limit: usize) -> Result<Vec<Job>, StoreError>;

    /// Returns the job with the provided identifier, if present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn job(&self, id: &JobId) -> Result<Option<Job>, StoreError>;

    /// Returns every artifact produced by the provided job.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn artifacts_for_job(&self, job_id: &JobId) -> Result<Vec<Artifact>, StoreError>;

    /// Returns up to `limit` artifacts of the provided kind, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn artifacts_by_kind(&self, kind: &str, limit: usize) -> Result<Vec<Artifact>, StoreError>;

    /// Returns job counts grouped by status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn status_counts(&self) -> Result<BTreeMap<JobStatus, u64>, StoreError>;

    /// Returns up to `limit` trace events for the provided job, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn trace_events_for_job(
        &self,
        job_id: &JobId,
        limit: usize,
    ) -> Result<Vec<TraceEvent>, StoreError>;
}
