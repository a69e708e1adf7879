// crates/workloom-core/src/lib.rs
// ============================================================================
// Module: Workloom Core
// Description: Data model, command vocabulary, policy, and queue primitives.
// Purpose: Define the shared contract surfaces used by the Workloom engine.
// Dependencies: rand, serde, serde_json, sha2, thiserror, time
// ============================================================================

//! ## Overview
//! This crate defines the Workloom core: the tagged command vocabulary that
//! external producers and the engine feed into the single writer, the job and
//! artifact data model, quality (ISC) definitions and reports, the capability
//! policy, and the command queue types. It also declares the store and
//! repository interfaces implemented by the `SQLite` crate.
//! Invariants:
//! - Commands are immutable once constructed; ownership moves with the queue.
//! - Job status transitions are monotonic forward through the status lattice.
//! - Policy checks fail closed: an unknown capability is a denial.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod policy;
pub mod queue;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::artifact::APPROVAL_REQUEST_KIND;
pub use core::artifact::Artifact;
pub use core::command::Command;
pub use core::hashing::DEFAULT_HASH_ALGORITHM;
pub use core::hashing::hash_bytes;
pub use core::idgen::IdGenerator;
pub use core::identifiers::ArtifactId;
pub use core::identifiers::BackendId;
pub use core::identifiers::CriterionId;
pub use core::identifiers::EntityId;
pub use core::identifiers::JobId;
pub use core::identifiers::PrdId;
pub use core::identifiers::ReportId;
pub use core::identifiers::WorkflowId;
pub use core::isc::CriteriaSummary;
pub use core::isc::Criterion;
pub use core::isc::CriterionPriority;
pub use core::isc::IscDefinition;
pub use core::isc::IscReport;
pub use core::isc::PrdRecord;
pub use core::isc::VerificationMethod;
pub use core::isc::VerificationResult;
pub use core::job::EffortLevel;
pub use core::job::Job;
pub use core::job::JobStatus;
pub use core::records::DomainEvent;
pub use core::records::EmbeddingRecord;
pub use core::records::Entity;
pub use core::records::EventRecord;
pub use core::records::PrunePolicy;
pub use core::records::RecordFamily;
pub use core::records::Reflection;
pub use core::records::TraceEvent;
pub use core::time::Timestamp;
pub use interfaces::CommandStore;
pub use interfaces::Repository;
pub use interfaces::StoreError;
pub use policy::Policy;
pub use policy::PolicyError;
pub use queue::CommandQueue;
pub use queue::CommandSink;
pub use queue::LocalCommandBuffer;
