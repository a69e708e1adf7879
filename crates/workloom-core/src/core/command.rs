// crates/workloom-core/src/core/command.rs
// ============================================================================
// Module: Workloom Command Vocabulary
// Description: Tagged union of state-mutation intents applied by the writer.
// Purpose: Define the wire contract between producers and the single writer.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A command is an immutable state-mutation intent. External producers and
//! the runner construct commands and enqueue them; the writer is the only
//! component that applies them to storage. Ownership of a command transfers
//! to whichever queue holds it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::artifact::Artifact;
use crate::core::identifiers::ArtifactId;
use crate::core::identifiers::JobId;
use crate::core::identifiers::PrdId;
use crate::core::isc::IscReport;
use crate::core::isc::PrdRecord;
use crate::core::job::Job;
use crate::core::job::JobStatus;
use crate::core::records::DomainEvent;
use crate::core::records::EmbeddingRecord;
use crate::core::records::Entity;
use crate::core::records::EventRecord;
use crate::core::records::PrunePolicy;
use crate::core::records::Reflection;
use crate::core::records::TraceEvent;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Command Union
// ============================================================================

/// State-mutation intent applied by the writer.
///
/// # Invariants
/// - Commands are immutable once constructed.
/// - Variant tags are stable wire labels consumed by external producers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    /// Upsert a domain entity.
    EntityUpsert {
        /// Entity record to upsert.
        entity: Entity,
    },
    /// Insert an application event.
    EventInsert {
        /// Event record to insert.
        event: EventRecord,
    },
    /// Create a job in `queued` status.
    JobCreate {
        /// Job record to create.
        job: Job,
    },
    /// Advance a job's status through the lattice.
    JobUpdateStatus {
        /// Job to update.
        job_id: JobId,
        /// New status.
        status: JobStatus,
        /// Transition timestamp.
        at: Timestamp,
    },
    /// Create an artifact.
    ArtifactCreate {
        /// Artifact record to create.
        artifact: Artifact,
    },
    /// Patch an existing artifact.
    ArtifactUpdate {
        /// Artifact to patch.
        artifact_id: ArtifactId,
        /// Replacement title, when provided.
        title: Option<String>,
        /// Replacement markdown content, when provided.
        content_md: Option<String>,
        /// Replacement payload data, when provided.
        data: Option<Value>,
    },
    /// Emit a domain event for downstream consumers.
    DomainEventEmit {
        /// Domain event to persist.
        event: DomainEvent,
    },
    /// Mark a previously emitted domain event as delivered.
    DomainEventMarkDelivered {
        /// Domain event identifier.
        event_id: String,
        /// Delivery timestamp.
        at: Timestamp,
    },
    /// Apply an age-based maintenance prune.
    MaintenancePrune {
        /// Prune policy to apply.
        policy: PrunePolicy,
    },
    /// Upsert an embedding vector.
    EmbeddingUpsert {
        /// Embedding record to upsert.
        embedding: EmbeddingRecord,
    },
    /// Delete all embeddings owned by a record.
    EmbeddingDeleteByOwner {
        /// Owning record identifier.
        owner_id: String,
    },
    /// Append a trace event.
    TraceEmit {
        /// Trace event to append.
        event: TraceEvent,
    },
    /// Persist a verification report.
    IscReportCreate {
        /// Report to persist.
        report: IscReport,
    },
    /// Persist a job reflection.
    ReflectionCreate {
        /// Reflection to persist.
        reflection: Reflection,
    },
    /// Create a requirement document.
    PrdCreate {
        /// Requirement document to create.
        prd: PrdRecord,
    },
    /// Patch a requirement document.
    PrdUpdate {
        /// Requirement document to patch.
        prd_id: PrdId,
        /// Replacement intent, when provided.
        intent: Option<String>,
        /// Replacement constraints, when provided.
        constraints: Option<Vec<String>>,
    },
    /// Append a log line to a requirement document.
    PrdAppendLog {
        /// Requirement document to append to.
        prd_id: PrdId,
        /// Log line to append.
        line: String,
        /// Append timestamp.
        at: Timestamp,
    },
}

impl Command {
    /// Returns the stable wire label for the command kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EntityUpsert { .. } => "entity.upsert",
            Self::EventInsert { .. } => "event.insert",
            Self::JobCreate { .. } => "job.create",
            Self::JobUpdateStatus { .. } => "job.update_status",
            Self::ArtifactCreate { .. } => "artifact.create",
            Self::ArtifactUpdate { .. } => "artifact.update",
            Self::DomainEventEmit { .. } => "domain_event.emit",
            Self::DomainEventMarkDelivered { .. } => "domain_event.mark_delivered",
            Self::MaintenancePrune { .. } => "maintenance.prune",
            Self::EmbeddingUpsert { .. } => "embedding.upsert",
            Self::EmbeddingDeleteByOwner { .. } => "embedding.delete_by_owner",
            Self::TraceEmit { .. } => "trace.emit",
            Self::IscReportCreate { .. } => "isc_report.create",
            Self::ReflectionCreate { .. } => "reflection.create",
            Self::PrdCreate { .. } => "prd.create",
            Self::PrdUpdate { .. } => "prd.update",
            Self::PrdAppendLog { .. } => "prd.append_log",
        }
    }
}
