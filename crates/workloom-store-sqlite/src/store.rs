// crates/workloom-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Command Store
// Description: Transactional command application and read-only queries.
// Purpose: Persist the Workloom data model in one SQLite WAL database.
// Dependencies: workloom-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! One writer connection, guarded by a mutex, applies command batches: every
//! command in a batch executes inside one transaction, and the first failure
//! rolls the whole batch back. Domain-event and trace rows for job status
//! changes and artifact creation are synthesized here, inside the same
//! transaction, which is the single derivation point for those trails.
//! Reads go through the [`Repository`] implementation on the same store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::PoisonError;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use workloom_core::Artifact;
use workloom_core::ArtifactId;
use workloom_core::Command;
use workloom_core::CommandStore;
use workloom_core::IdGenerator;
use workloom_core::Job;
use workloom_core::JobId;
use workloom_core::JobStatus;
use workloom_core::PrunePolicy;
use workloom_core::RecordFamily;
use workloom_core::Repository;
use workloom_core::StoreError;
use workloom_core::Timestamp;
use workloom_core::TraceEvent;
use workloom_core::WorkflowId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` command store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a config with defaults for the provided database path.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding raw payload data.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Invalid store data or command.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) | SqliteStoreError::VersionMismatch(message) => {
                Self::Store(message)
            }
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

/// Shorthand mapping a rusqlite error into a store db error.
fn db_err(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed command store and repository.
///
/// # Invariants
/// - All access is serialized through one mutex-guarded connection; the
///   flush loop is the only writer in a correctly wired process.
pub struct SqliteCommandStore {
    /// Writer connection guarded by a mutex.
    connection: Mutex<Connection>,
    /// Identifier generator for synthesized domain and trace events.
    derived_ids: IdGenerator,
}

impl SqliteCommandStore {
    /// Opens or creates the store at the configured path.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is invalid, the database
    /// cannot be opened, or the schema version is unsupported.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
            derived_ids: IdGenerator::new("evt"),
        })
    }

    /// Applies one command inside the open transaction.
    fn apply_command(&self, tx: &Transaction<'_>, command: &Command) -> Result<(), SqliteStoreError> {
        match command {
            Command::EntityUpsert {
                entity,
            } => {
                tx.execute(
                    "INSERT OR REPLACE INTO entities (id, kind, name, data_json)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![entity.id.as_str(), entity.kind, entity.name, to_json(&entity.data)?],
                )
                .map_err(db_err)?;
            }
            Command::EventInsert {
                event,
            } => {
                tx.execute(
                    "INSERT INTO events (id, entity_id, kind, payload_json, at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        event.id,
                        event.entity_id.as_ref().map(|id| id.as_str().to_string()),
                        event.kind,
                        to_json(&event.payload)?,
                        event.at.as_unix_millis(),
                    ],
                )
                .map_err(db_err)?;
            }
            Command::JobCreate {
                job,
            } => self.apply_job_create(tx, job)?,
            Command::JobUpdateStatus {
                job_id,
                status,
                at,
            } => self.apply_job_update_status(tx, job_id, *status, *at)?,
            Command::ArtifactCreate {
                artifact,
            } => self.apply_artifact_create(tx, artifact)?,
            Command::ArtifactUpdate {
                artifact_id,
                title,
                content_md,
                data,
            } => apply_artifact_update(tx, artifact_id, title.as_ref(), content_md.as_ref(), data.as_ref())?,
            Command::DomainEventEmit {
                event,
            } => {
                tx.execute(
                    "INSERT INTO domain_events (id, kind, payload_json, emitted_at, delivered_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        event.id,
                        event.kind,
                        to_json(&event.payload)?,
                        event.emitted_at.as_unix_millis(),
                        event.delivered_at.map(Timestamp::as_unix_millis),
                    ],
                )
                .map_err(db_err)?;
            }
            Command::DomainEventMarkDelivered {
                event_id,
                at,
            } => {
                let updated = tx
                    .execute(
                        "UPDATE domain_events SET delivered_at = ?1 WHERE id = ?2",
                        params![at.as_unix_millis(), event_id],
                    )
                    .map_err(db_err)?;
                if updated == 0 {
                    return Err(SqliteStoreError::Invalid(format!(
                        "domain event not found: {event_id}"
                    )));
                }
            }
            Command::MaintenancePrune {
                policy,
            } => apply_prune(tx, policy)?,
            Command::EmbeddingUpsert {
                embedding,
            } => {
                tx.execute(
                    "INSERT OR REPLACE INTO embeddings (id, owner_id, model, vector_json, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        embedding.id,
                        embedding.owner_id,
                        embedding.model,
                        to_json(&embedding.vector)?,
                        Timestamp::now().as_unix_millis(),
                    ],
                )
                .map_err(db_err)?;
            }
            Command::EmbeddingDeleteByOwner {
                owner_id,
            } => {
                tx.execute("DELETE FROM embeddings WHERE owner_id = ?1", params![owner_id])
                    .map_err(db_err)?;
            }
            Command::TraceEmit {
                event,
            } => {
                insert_trace_event(
                    tx,
                    &event.id,
                    event.job_id.as_ref(),
                    &event.kind,
                    &to_json(&event.payload)?,
                    event.at,
                )?;
            }
            Command::IscReportCreate {
                report,
            } => {
                tx.execute(
                    "INSERT INTO isc_reports (id, definition_name, definition_version,
                        artifact_id, artifact_kind, job_id, workflow_id, report_json, passed, at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        report.id.as_str(),
                        report.definition_name,
                        report.definition_version,
                        report.artifact_id.as_str(),
                        report.artifact_kind,
                        report.job_id.as_ref().map(|id| id.as_str().to_string()),
                        report.workflow_id.as_ref().map(|id| id.as_str().to_string()),
                        to_json(report)?,
                        i64::from(report.passed),
                        report.at.as_unix_millis(),
                    ],
                )
                .map_err(db_err)?;
            }
            Command::ReflectionCreate {
                reflection,
            } => {
                tx.execute(
                    "INSERT INTO reflections (id, job_id, outcome, friction, next_step, at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        reflection.id,
                        reflection.job_id.as_str(),
                        reflection.outcome,
                        reflection.friction,
                        reflection.next_step,
                        reflection.at.as_unix_millis(),
                    ],
                )
                .map_err(db_err)?;
            }
            Command::PrdCreate {
                prd,
            } => {
                tx.execute(
                    "INSERT INTO prds (id, artifact_id, job_id, intent, constraints_json,
                        criteria_json, content_hash, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        prd.id.as_str(),
                        prd.artifact_id.as_str(),
                        prd.job_id.as_ref().map(|id| id.as_str().to_string()),
                        prd.intent,
                        to_json(&prd.constraints)?,
                        prd.criteria.as_ref().map(to_json).transpose()?,
                        prd.content_hash,
                        prd.created_at.as_unix_millis(),
                    ],
                )
                .map_err(db_err)?;
            }
            Command::PrdUpdate {
                prd_id,
                intent,
                constraints,
            } => apply_prd_update(tx, prd_id.as_str(), intent.as_ref(), constraints.as_ref())?,
            Command::PrdAppendLog {
                prd_id,
                line,
                at,
            } => {
                require_row(tx, "prds", prd_id.as_str())?;
                tx.execute(
                    "INSERT INTO prd_log (prd_id, line, at) VALUES (?1, ?2, ?3)",
                    params![prd_id.as_str(), line, at.as_unix_millis()],
                )
                .map_err(db_err)?;
            }
        }
        Ok(())
    }

    /// Inserts a queued job row.
    fn apply_job_create(&self, tx: &Transaction<'_>, job: &Job) -> Result<(), SqliteStoreError> {
        if job.status != JobStatus::Queued {
            return Err(SqliteStoreError::Invalid(format!(
                "job.create requires queued status, got {}",
                job.status.as_str()
            )));
        }
        tx.execute(
            "INSERT INTO jobs (id, workflow_id, status, input_json, started_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, NULL, NULL)",
            params![job.id.as_str(), job.workflow_id.as_str(), job.status.as_str(), to_json(&job.input)?],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Advances a job through the status lattice and derives its events.
    fn apply_job_update_status(
        &self,
        tx: &Transaction<'_>,
        job_id: &JobId,
        next: JobStatus,
        at: Timestamp,
    ) -> Result<(), SqliteStoreError> {
        let current: Option<String> = tx
            .query_row("SELECT status FROM jobs WHERE id = ?1", params![job_id.as_str()], |row| {
                row.get(0)
            })
            .optional()
            .map_err(db_err)?;
        let Some(current) = current else {
            return Err(SqliteStoreError::Invalid(format!("job not found: {job_id}")));
        };
        let current = JobStatus::from_label(&current).ok_or_else(|| {
            SqliteStoreError::Invalid(format!("job {job_id} has unknown status: {current}"))
        })?;
        if !current.allows_transition_to(next) {
            return Err(SqliteStoreError::Invalid(format!(
                "illegal transition for job {job_id}: {} -> {}",
                current.as_str(),
                next.as_str()
            )));
        }
        tx.execute(
            "UPDATE jobs SET status = ?1,
                started_at = COALESCE(started_at, ?2),
                finished_at = CASE WHEN ?3 THEN ?2 ELSE finished_at END
             WHERE id = ?4",
            params![next.as_str(), at.as_unix_millis(), next.is_terminal(), job_id.as_str()],
        )
        .map_err(db_err)?;

        let payload = serde_json::json!({
            "job_id": job_id,
            "from": current.as_str(),
            "to": next.as_str(),
        });
        let payload_json = to_json(&payload)?;
        insert_domain_event(tx, &self.derived_ids.issue(), "job.status_changed", &payload_json, at)?;
        insert_trace_event(
            tx,
            &self.derived_ids.issue(),
            Some(job_id),
            "job.status_changed",
            &payload_json,
            at,
        )?;
        Ok(())
    }

    /// Inserts an artifact row and derives its creation events.
    fn apply_artifact_create(
        &self,
        tx: &Transaction<'_>,
        artifact: &Artifact,
    ) -> Result<(), SqliteStoreError> {
        let at = Timestamp::now();
        tx.execute(
            "INSERT INTO artifacts (id, kind, job_id, title, content_md, data_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                artifact.id.as_str(),
                artifact.kind,
                artifact.job_id.as_ref().map(|id| id.as_str().to_string()),
                artifact.title,
                artifact.content_md,
                to_json(&artifact.data)?,
                at.as_unix_millis(),
            ],
        )
        .map_err(db_err)?;

        let payload = serde_json::json!({
            "artifact_id": artifact.id,
            "kind": artifact.kind,
            "job_id": artifact.job_id,
        });
        let payload_json = to_json(&payload)?;
        insert_domain_event(tx, &self.derived_ids.issue(), "artifact.created", &payload_json, at)?;
        insert_trace_event(
            tx,
            &self.derived_ids.issue(),
            artifact.job_id.as_ref(),
            "artifact.created",
            &payload_json,
            at,
        )?;
        Ok(())
    }
}

impl CommandStore for SqliteCommandStore {
    fn apply_batch(&self, commands: &[Command]) -> Result<(), StoreError> {
        let mut guard = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = guard.transaction().map_err(|err| StoreError::Store(err.to_string()))?;
        for command in commands {
            if let Err(err) = self.apply_command(&tx, command) {
                // Dropping the transaction rolls back everything applied so
                // far; the batch is discarded, not retried.
                return Err(StoreError::ApplyFailed {
                    kind: command.kind().to_string(),
                    message: err.to_string(),
                });
            }
        }
        tx.commit().map_err(|err| StoreError::Store(err.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Repository
// ============================================================================

impl Repository for SqliteCommandStore {
    fn queued_jobs(&self, limit: usize) -> Result<Vec<Job>, StoreError> {
        let guard = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let mut statement = guard
            .prepare(
                "SELECT id, workflow_id, status, input_json, started_at, finished_at
                 FROM jobs WHERE status = 'queued' ORDER BY rowid ASC LIMIT ?1",
            )
            .map_err(|err| StoreError::Store(err.to_string()))?;
        let rows = statement
            .query_map(params![as_limit(limit)], row_to_job)
            .map_err(|err| StoreError::Store(err.to_string()))?;
        collect_rows(rows)
    }

    fn job(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        let guard = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .query_row(
                "SELECT id, workflow_id, status, input_json, started_at, finished_at
                 FROM jobs WHERE id = ?1",
                params![id.as_str()],
                row_to_job,
            )
            .optional()
            .map_err(|err| StoreError::Store(err.to_string()))
    }

    fn artifacts_for_job(&self, job_id: &JobId) -> Result<Vec<Artifact>, StoreError> {
        let guard = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let mut statement = guard
            .prepare(
                "SELECT id, kind, job_id, title, content_md, data_json
                 FROM artifacts WHERE job_id = ?1 ORDER BY rowid ASC",
            )
            .map_err(|err| StoreError::Store(err.to_string()))?;
        let rows = statement
            .query_map(params![job_id.as_str()], row_to_artifact)
            .map_err(|err| StoreError::Store(err.to_string()))?;
        collect_rows(rows)
    }

    fn artifacts_by_kind(&self, kind: &str, limit: usize) -> Result<Vec<Artifact>, StoreError> {
        let guard = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let mut statement = guard
            .prepare(
                "SELECT id, kind, job_id, title, content_md, data_json
                 FROM artifacts WHERE kind = ?1 ORDER BY rowid DESC LIMIT ?2",
            )
            .map_err(|err| StoreError::Store(err.to_string()))?;
        let rows = statement
            .query_map(params![kind, as_limit(limit)], row_to_artifact)
            .map_err(|err| StoreError::Store(err.to_string()))?;
        collect_rows(rows)
    }

    fn status_counts(&self) -> Result<BTreeMap<JobStatus, u64>, StoreError> {
        let guard = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let mut statement = guard
            .prepare("SELECT status, COUNT(1) FROM jobs GROUP BY status")
            .map_err(|err| StoreError::Store(err.to_string()))?;
        let rows = statement
            .query_map(params![], |row| {
                let status: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((status, count))
            })
            .map_err(|err| StoreError::Store(err.to_string()))?;
        let mut counts = BTreeMap::new();
        for row in rows {
            let (status, count) = row.map_err(|err| StoreError::Store(err.to_string()))?;
            let status = JobStatus::from_label(&status)
                .ok_or_else(|| StoreError::Invalid(format!("unknown job status: {status}")))?;
            counts.insert(status, u64::try_from(count).unwrap_or(0));
        }
        Ok(counts)
    }

    fn trace_events_for_job(
        &self,
        job_id: &JobId,
        limit: usize,
    ) -> Result<Vec<TraceEvent>, StoreError> {
        let guard = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let mut statement = guard
            .prepare(
                "SELECT id, job_id, kind, payload_json, at
                 FROM trace_events WHERE job_id = ?1 ORDER BY rowid ASC LIMIT ?2",
            )
            .map_err(|err| StoreError::Store(err.to_string()))?;
        let rows = statement
            .query_map(params![job_id.as_str(), as_limit(limit)], row_to_trace_event)
            .map_err(|err| StoreError::Store(err.to_string()))?;
        collect_rows(rows)
    }
}

// ============================================================================
// SECTION: Apply Helpers
// ============================================================================

/// Patches an artifact row with the provided replacement fields.
fn apply_artifact_update(
    tx: &Transaction<'_>,
    artifact_id: &ArtifactId,
    title: Option<&String>,
    content_md: Option<&String>,
    data: Option<&Value>,
) -> Result<(), SqliteStoreError> {
    require_row(tx, "artifacts", artifact_id.as_str())?;
    if let Some(title) = title {
        tx.execute(
            "UPDATE artifacts SET title = ?1 WHERE id = ?2",
            params![title, artifact_id.as_str()],
        )
        .map_err(db_err)?;
    }
    if let Some(content_md) = content_md {
        tx.execute(
            "UPDATE artifacts SET content_md = ?1 WHERE id = ?2",
            params![content_md, artifact_id.as_str()],
        )
        .map_err(db_err)?;
    }
    if let Some(data) = data {
        tx.execute(
            "UPDATE artifacts SET data_json = ?1 WHERE id = ?2",
            params![to_json(data)?, artifact_id.as_str()],
        )
        .map_err(db_err)?;
    }
    Ok(())
}

/// Patches a requirement-document row with the provided replacement fields.
fn apply_prd_update(
    tx: &Transaction<'_>,
    prd_id: &str,
    intent: Option<&String>,
    constraints: Option<&Vec<String>>,
) -> Result<(), SqliteStoreError> {
    require_row(tx, "prds", prd_id)?;
    if let Some(intent) = intent {
        tx.execute("UPDATE prds SET intent = ?1 WHERE id = ?2", params![intent, prd_id])
            .map_err(db_err)?;
    }
    if let Some(constraints) = constraints {
        tx.execute(
            "UPDATE prds SET constraints_json = ?1 WHERE id = ?2",
            params![to_json(constraints)?, prd_id],
        )
        .map_err(db_err)?;
    }
    Ok(())
}

/// Deletes aged rows for each family named by the prune policy.
fn apply_prune(tx: &Transaction<'_>, policy: &PrunePolicy) -> Result<(), SqliteStoreError> {
    let cutoff = Timestamp::now().as_unix_millis().saturating_sub(policy.older_than_ms);
    for family in &policy.families {
        match family {
            RecordFamily::Jobs => {
                tx.execute(
                    "DELETE FROM jobs WHERE status IN ('succeeded', 'failed')
                     AND finished_at IS NOT NULL AND finished_at < ?1",
                    params![cutoff],
                )
                .map_err(db_err)?;
            }
            RecordFamily::Artifacts => {
                tx.execute("DELETE FROM artifacts WHERE created_at < ?1", params![cutoff])
                    .map_err(db_err)?;
            }
            RecordFamily::Events => {
                tx.execute("DELETE FROM events WHERE at < ?1", params![cutoff]).map_err(db_err)?;
            }
            RecordFamily::DomainEvents => {
                tx.execute(
                    "DELETE FROM domain_events
                     WHERE delivered_at IS NOT NULL AND delivered_at < ?1",
                    params![cutoff],
                )
                .map_err(db_err)?;
            }
            RecordFamily::TraceEvents => {
                tx.execute("DELETE FROM trace_events WHERE at < ?1", params![cutoff])
                    .map_err(db_err)?;
            }
            RecordFamily::Embeddings => {
                tx.execute("DELETE FROM embeddings WHERE created_at < ?1", params![cutoff])
                    .map_err(db_err)?;
            }
        }
    }
    Ok(())
}

/// Inserts one domain-event row.
fn insert_domain_event(
    tx: &Transaction<'_>,
    id: &str,
    kind: &str,
    payload_json: &str,
    at: Timestamp,
) -> Result<(), SqliteStoreError> {
    tx.execute(
        "INSERT INTO domain_events (id, kind, payload_json, emitted_at, delivered_at)
         VALUES (?1, ?2, ?3, ?4, NULL)",
        params![id, kind, payload_json, at.as_unix_millis()],
    )
    .map_err(db_err)?;
    Ok(())
}

/// Inserts one trace-event row.
fn insert_trace_event(
    tx: &Transaction<'_>,
    id: &str,
    job_id: Option<&JobId>,
    kind: &str,
    payload_json: &str,
    at: Timestamp,
) -> Result<(), SqliteStoreError> {
    tx.execute(
        "INSERT INTO trace_events (id, job_id, kind, payload_json, at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, job_id.map(|id| id.as_str().to_string()), kind, payload_json, at.as_unix_millis()],
    )
    .map_err(db_err)?;
    Ok(())
}

/// Fails unless the table holds a row with the provided identifier.
fn require_row(tx: &Transaction<'_>, table: &str, id: &str) -> Result<(), SqliteStoreError> {
    let exists: Option<i64> = tx
        .query_row(&format!("SELECT 1 FROM {table} WHERE id = ?1"), params![id], |row| row.get(0))
        .optional()
        .map_err(db_err)?;
    if exists.is_none() {
        return Err(SqliteStoreError::Invalid(format!("{table} row not found: {id}")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Maps a job row into the core record.
fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<Job> {
    let id: String = row.get(0)?;
    let workflow_id: String = row.get(1)?;
    let status: String = row.get(2)?;
    let input_json: String = row.get(3)?;
    let started_at: Option<i64> = row.get(4)?;
    let finished_at: Option<i64> = row.get(5)?;
    Ok(Job {
        id: JobId::new(id),
        workflow_id: WorkflowId::new(workflow_id),
        status: JobStatus::from_label(&status).unwrap_or(JobStatus::Failed),
        input: from_json(&input_json),
        started_at: started_at.map(Timestamp::from_unix_millis),
        finished_at: finished_at.map(Timestamp::from_unix_millis),
    })
}

/// Maps an artifact row into the core record.
fn row_to_artifact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Artifact> {
    let id: String = row.get(0)?;
    let kind: String = row.get(1)?;
    let job_id: Option<String> = row.get(2)?;
    let title: Option<String> = row.get(3)?;
    let content_md: Option<String> = row.get(4)?;
    let data_json: String = row.get(5)?;
    Ok(Artifact {
        id: ArtifactId::new(id),
        kind,
        job_id: job_id.map(JobId::new),
        title,
        content_md,
        data: from_json(&data_json),
    })
}

/// Maps a trace-event row into the core record.
fn row_to_trace_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<TraceEvent> {
    let id: String = row.get(0)?;
    let job_id: Option<String> = row.get(1)?;
    let kind: String = row.get(2)?;
    let payload_json: String = row.get(3)?;
    let at: i64 = row.get(4)?;
    Ok(TraceEvent {
        id,
        job_id: job_id.map(JobId::new),
        kind,
        payload: from_json(&payload_json),
        at: Timestamp::from_unix_millis(at),
    })
}

/// Collects mapped rows, converting the first row error.
fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
) -> Result<Vec<T>, StoreError> {
    rows.collect::<rusqlite::Result<Vec<T>>>().map_err(|err| StoreError::Store(err.to_string()))
}

/// Serializes a value into a JSON column string.
fn to_json<T: Serialize>(value: &T) -> Result<String, SqliteStoreError> {
    serde_json::to_string(value).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

/// Deserializes a JSON column, tolerating legacy rows via a null fallback.
fn from_json(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or(Value::Null)
}

/// Clamps a usize query limit into an `SQLite` integer parameter.
fn as_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

// ============================================================================
// SECTION: Connection Setup
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_err)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_err)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_err)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_err)?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_err)?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_err)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_err)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_err)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_err)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS jobs (
                    id TEXT PRIMARY KEY,
                    workflow_id TEXT NOT NULL,
                    status TEXT NOT NULL,
                    input_json TEXT NOT NULL,
                    started_at INTEGER,
                    finished_at INTEGER
                );
                CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs (status);
                CREATE TABLE IF NOT EXISTS artifacts (
                    id TEXT PRIMARY KEY,
                    kind TEXT NOT NULL,
                    job_id TEXT,
                    title TEXT,
                    content_md TEXT,
                    data_json TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_artifacts_job ON artifacts (job_id);
                CREATE INDEX IF NOT EXISTS idx_artifacts_kind ON artifacts (kind);
                CREATE TABLE IF NOT EXISTS entities (
                    id TEXT PRIMARY KEY,
                    kind TEXT NOT NULL,
                    name TEXT NOT NULL,
                    data_json TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS events (
                    id TEXT PRIMARY KEY,
                    entity_id TEXT,
                    kind TEXT NOT NULL,
                    payload_json TEXT NOT NULL,
                    at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS domain_events (
                    id TEXT PRIMARY KEY,
                    kind TEXT NOT NULL,
                    payload_json TEXT NOT NULL,
                    emitted_at INTEGER NOT NULL,
                    delivered_at INTEGER
                );
                CREATE TABLE IF NOT EXISTS embeddings (
                    id TEXT PRIMARY KEY,
                    owner_id TEXT NOT NULL,
                    model TEXT NOT NULL,
                    vector_json TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_embeddings_owner ON embeddings (owner_id);
                CREATE TABLE IF NOT EXISTS trace_events (
                    id TEXT PRIMARY KEY,
                    job_id TEXT,
                    kind TEXT NOT NULL,
                    payload_json TEXT NOT NULL,
                    at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_trace_events_job ON trace_events (job_id);
                CREATE TABLE IF NOT EXISTS isc_reports (
                    id TEXT PRIMARY KEY,
                    definition_name TEXT NOT NULL,
                    definition_version TEXT NOT NULL,
                    artifact_id TEXT NOT NULL,
                    artifact_kind TEXT NOT NULL,
                    job_id TEXT,
                    workflow_id TEXT,
                    report_json TEXT NOT NULL,
                    passed INTEGER NOT NULL,
                    at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS reflections (
                    id TEXT PRIMARY KEY,
                    job_id TEXT NOT NULL,
                    outcome TEXT NOT NULL,
                    friction TEXT NOT NULL,
                    next_step TEXT NOT NULL,
                    at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS prds (
                    id TEXT PRIMARY KEY,
                    artifact_id TEXT NOT NULL,
                    job_id TEXT,
                    intent TEXT NOT NULL,
                    constraints_json TEXT NOT NULL,
                    criteria_json TEXT,
                    content_hash TEXT,
                    created_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS prd_log (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    prd_id TEXT NOT NULL,
                    line TEXT NOT NULL,
                    at INTEGER NOT NULL,
                    FOREIGN KEY (prd_id) REFERENCES prds(id) ON DELETE CASCADE
                );",
            )
            .map_err(db_err)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_err)?;
    Ok(())
}
