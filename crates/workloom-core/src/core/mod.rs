// crates/workloom-core/src/core/mod.rs
// ============================================================================
// Module: Workloom Core Data Model
// Description: Identifiers, commands, jobs, artifacts, and quality records.
// Purpose: Group the serializable data model shared across Workloom crates.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The `core` module groups the serializable data model: identifiers, the
//! command vocabulary, jobs and artifacts, quality (ISC) records, auxiliary
//! store records, timestamps, and content hashing helpers.

pub mod artifact;
pub mod command;
pub mod hashing;
pub mod idgen;
pub mod identifiers;
pub mod isc;
pub mod job;
pub mod records;
pub mod time;
