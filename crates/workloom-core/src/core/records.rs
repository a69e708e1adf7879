// crates/workloom-core/src/core/records.rs
// ============================================================================
// Module: Workloom Auxiliary Records
// Description: Entity, event, embedding, trace, and reflection records.
// Purpose: Define the secondary store records carried inside commands.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Auxiliary records travel inside commands and land in their own store
//! tables. Domain events and trace events are also synthesized by the writer
//! as side effects of job and artifact mutations, inside the same
//! transaction, so state and its event trail never diverge.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::EntityId;
use crate::core::identifiers::JobId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Entities and Events
// ============================================================================

/// Domain entity record.
///
/// # Invariants
/// - Upserts replace the full record for the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity identifier.
    pub id: EntityId,
    /// Entity kind label.
    pub kind: String,
    /// Human-readable name.
    pub name: String,
    /// Structured payload data.
    pub data: Value,
}

/// Application event record.
///
/// # Invariants
/// - Events are append-only; the writer never updates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event identifier.
    pub id: String,
    /// Entity the event refers to, when known.
    pub entity_id: Option<EntityId>,
    /// Event kind label.
    pub kind: String,
    /// Structured payload data.
    pub payload: Value,
    /// Event timestamp.
    pub at: Timestamp,
}

/// Domain event published for downstream consumers.
///
/// # Invariants
/// - `delivered_at` is unset until `domain_event.mark_delivered` applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Domain event identifier.
    pub id: String,
    /// Domain event kind label (for example `job.status_changed`).
    pub kind: String,
    /// Structured payload data.
    pub payload: Value,
    /// Emission timestamp.
    pub emitted_at: Timestamp,
    /// Delivery timestamp, once marked delivered.
    pub delivered_at: Option<Timestamp>,
}

// ============================================================================
// SECTION: Embeddings and Traces
// ============================================================================

/// Embedding vector record keyed by an owning record identifier.
///
/// # Invariants
/// - `owner_id` groups embeddings for bulk deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Embedding identifier.
    pub id: String,
    /// Identifier of the record that owns this embedding.
    pub owner_id: String,
    /// Model label that produced the vector.
    pub model: String,
    /// Embedding vector values.
    pub vector: Vec<f32>,
}

/// Trace event recording one routed or gated operation.
///
/// # Invariants
/// - Trace events are append-only diagnostics; readers must tolerate gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Trace event identifier.
    pub id: String,
    /// Job the trace belongs to, when known.
    pub job_id: Option<JobId>,
    /// Trace kind label (for example `runtime.text.generate`).
    pub kind: String,
    /// Structured payload data.
    pub payload: Value,
    /// Trace timestamp.
    pub at: Timestamp,
}

// ============================================================================
// SECTION: Reflections
// ============================================================================

/// Structured reflection captured after a thorough-effort job execution.
///
/// # Invariants
/// - Capture is best effort; a missing reflection never fails a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    /// Reflection identifier.
    pub id: String,
    /// Job the reflection describes.
    pub job_id: JobId,
    /// What the execution accomplished.
    pub outcome: String,
    /// What slowed the execution down or failed along the way.
    pub friction: String,
    /// What should change for the next execution.
    pub next_step: String,
    /// Capture timestamp.
    pub at: Timestamp,
}

// ============================================================================
// SECTION: Maintenance
// ============================================================================

/// Record families subject to age-based pruning.
///
/// # Invariants
/// - Variants are stable for serialization and command matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFamily {
    /// Terminal jobs.
    Jobs,
    /// Artifacts.
    Artifacts,
    /// Application events.
    Events,
    /// Delivered domain events.
    DomainEvents,
    /// Trace events.
    TraceEvents,
    /// Embeddings.
    Embeddings,
}

/// Age-based prune policy applied by a `maintenance.prune` command.
///
/// # Invariants
/// - `older_than_ms` is measured against record timestamps at apply time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrunePolicy {
    /// Minimum age, in milliseconds, for a record to be pruned.
    pub older_than_ms: i64,
    /// Record families the prune applies to.
    pub families: Vec<RecordFamily>,
}
