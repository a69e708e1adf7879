// crates/workloom-store-sqlite/src/lib.rs
// ============================================================================
// Module: Workloom SQLite Store
// Description: Durable CommandStore and Repository backed by SQLite WAL.
// Purpose: Apply command batches transactionally and serve read queries.
// Dependencies: workloom-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This crate implements the write and read seams over one `SQLite` file.
//! The command store applies every drained batch inside a single
//! transaction and synthesizes domain-event and trace rows for job status
//! changes and artifact creation within that same transaction, so state and
//! its event trail never diverge.
//! Invariants:
//! - A failing command rolls back the whole batch; the batch is discarded
//!   with no retry or dead-letter queue. This is an accepted data-loss risk
//!   stated in the crate docs, not silently fixed.
//! - Job status transitions are enforced against the forward lattice at
//!   apply time.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteCommandStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
