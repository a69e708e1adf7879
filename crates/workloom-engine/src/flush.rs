// crates/workloom-engine/src/flush.rs
// ============================================================================
// Module: Command Flush Loop
// Description: Timer thread draining the shared queue into the command store.
// Purpose: Enforce the single-writer discipline between queue and storage.
// Dependencies: workloom-core, serde, thiserror
// ============================================================================

//! ## Overview
//! The flush loop owns the only path from the shared [`CommandQueue`] into
//! the [`CommandStore`]. A named timer thread wakes on a fixed interval,
//! drains up to the configured batch size, and applies the batch in one
//! store transaction. Exactly one flush loop runs per process.
//! Invariants:
//! - `start` is idempotent; a second call is counted and ignored.
//! - A failed apply discards the drained batch. There is no retry and no
//!   dead-letter queue; this data-loss risk is accepted and documented.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::mpsc;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use workloom_core::CommandQueue;
use workloom_core::CommandSink;
use workloom_core::CommandStore;
use workloom_core::StoreError;

use crate::telemetry::EngineMetrics;
use crate::telemetry::FlushMetricEvent;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default flush interval in milliseconds.
const DEFAULT_FLUSH_INTERVAL_MS: u64 = 100;

/// Default maximum commands drained per tick.
const DEFAULT_FLUSH_BATCH_SIZE: usize = 100;

/// Flush loop configuration.
///
/// # Invariants
/// - `batch_size` bounds a single drain; queued overflow waits for the next
///   tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushConfig {
    /// Tick interval in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Maximum commands drained per tick.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            batch_size: DEFAULT_FLUSH_BATCH_SIZE,
        }
    }
}

/// Serde default for the flush interval.
const fn default_interval_ms() -> u64 {
    DEFAULT_FLUSH_INTERVAL_MS
}

/// Serde default for the flush batch size.
const fn default_batch_size() -> usize {
    DEFAULT_FLUSH_BATCH_SIZE
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when managing the flush timer thread.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum FlushError {
    /// The flush thread could not be spawned.
    #[error("failed to spawn flush thread: {0}")]
    Spawn(String),
}

// ============================================================================
// SECTION: Flush Loop
// ============================================================================

/// Timer loop draining the shared command queue into the store.
///
/// # Invariants
/// - At most one timer thread runs per instance.
/// - Apply failures discard the batch and never stop the timer.
pub struct FlushLoop {
    /// Shared queue drained by the timer.
    queue: Arc<CommandQueue>,
    /// Write seam the drained batches are applied through.
    store: Arc<dyn CommandStore + Send + Sync>,
    /// Timer configuration.
    config: FlushConfig,
    /// Metrics sink.
    metrics: Arc<dyn EngineMetrics>,
    /// Stop signal sender for the running timer thread, when started.
    stop: Mutex<Option<mpsc::Sender<()>>>,
    /// Join handle for the running timer thread, when started.
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl FlushLoop {
    /// Creates a flush loop over the provided queue and store.
    #[must_use]
    pub fn new(
        queue: Arc<CommandQueue>,
        store: Arc<dyn CommandStore + Send + Sync>,
        config: FlushConfig,
        metrics: Arc<dyn EngineMetrics>,
    ) -> Self {
        Self {
            queue,
            store,
            config,
            metrics,
            stop: Mutex::new(None),
            handle: Mutex::new(None),
        }
    }

    /// Returns true when the timer thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.stop.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Starts the timer thread.
    ///
    /// A second start on a running loop is counted in telemetry and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`FlushError::Spawn`] when the thread cannot be spawned.
    pub fn start(&self) -> Result<(), FlushError> {
        let mut stop_guard = self.stop.lock().unwrap_or_else(PoisonError::into_inner);
        if stop_guard.is_some() {
            self.metrics.record_duplicate_start("flush");
            return Ok(());
        }
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let queue = Arc::clone(&self.queue);
        let store = Arc::clone(&self.store);
        let metrics = Arc::clone(&self.metrics);
        let interval = Duration::from_millis(self.config.interval_ms);
        let batch_size = self.config.batch_size;
        let handle = thread::Builder::new()
            .name("workloom-flush".to_string())
            .spawn(move || {
                flush_timer_loop(&queue, &*store, &*metrics, &stop_rx, interval, batch_size);
            })
            .map_err(|err| FlushError::Spawn(err.to_string()))?;
        *stop_guard = Some(stop_tx);
        *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    /// Stops the timer thread and waits for it to exit.
    ///
    /// Stopping a loop that is not running is a no-op.
    pub fn stop(&self) {
        let stop_tx = self.stop.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(sender) = stop_tx {
            // A closed receiver means the thread already exited; both
            // outcomes leave the loop stopped.
            let _ = sender.send(());
        }
        let handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Drains and applies one batch synchronously.
    ///
    /// Returns the number of commands applied. An empty queue applies
    /// nothing and returns zero.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the batch fails to apply; the batch is
    /// discarded.
    pub fn flush_once(&self) -> Result<usize, StoreError> {
        flush_tick(&self.queue, &*self.store, &*self.metrics, self.config.batch_size)
    }
}

impl Drop for FlushLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// SECTION: Timer Thread
// ============================================================================

/// Runs the flush timer until the stop channel signals or disconnects.
fn flush_timer_loop(
    queue: &CommandQueue,
    store: &(dyn CommandStore + Send + Sync),
    metrics: &dyn EngineMetrics,
    stop_rx: &mpsc::Receiver<()>,
    interval: Duration,
    batch_size: usize,
) {
    loop {
        match stop_rx.recv_timeout(interval) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                if flush_tick(queue, store, metrics, batch_size).is_err() {
                    metrics.record_tick_error("flush");
                }
            }
        }
    }
}

/// Drains and applies one batch, recording the tick in telemetry.
fn flush_tick(
    queue: &CommandQueue,
    store: &(dyn CommandStore + Send + Sync),
    metrics: &dyn EngineMetrics,
    batch_size: usize,
) -> Result<usize, StoreError> {
    let batch = queue.drain(batch_size);
    if batch.is_empty() {
        return Ok(0);
    }
    let applied = batch.len();
    let result = store.apply_batch(&batch);
    metrics.record_flush(FlushMetricEvent {
        batch_size: applied,
        committed: result.is_ok(),
    });
    result.map(|()| applied)
}
