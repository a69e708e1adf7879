// crates/workloom-engine/src/scheduler.rs
// ============================================================================
// Module: Runner Scheduler
// Description: Fixed-interval timer driving the job runner.
// Purpose: Invoke runner ticks on a cadence that survives tick errors.
// Dependencies: workloom-core, serde, thiserror
// ============================================================================

//! ## Overview
//! The scheduler wakes on a fixed interval and calls [`Runner::run_once`].
//! A failed tick is counted in telemetry and the timer keeps running; only
//! an explicit stop ends it.
//! Invariants:
//! - `start` is idempotent; a second call is counted and ignored.

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
use workloom_core::StoreError;

use crate::runner::Runner;
use crate::telemetry::EngineMetrics;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default scheduler interval in milliseconds.
const DEFAULT_SCHEDULER_INTERVAL_MS: u64 = 5_000;

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Tick interval in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_SCHEDULER_INTERVAL_MS,
        }
    }
}

/// Serde default for the scheduler interval.
const fn default_interval_ms() -> u64 {
    DEFAULT_SCHEDULER_INTERVAL_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when managing the scheduler timer thread.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler thread could not be spawned.
    #[error("failed to spawn scheduler thread: {0}")]
    Spawn(String),
}

// ============================================================================
// SECTION: Scheduler
// ============================================================================

/// Fixed-interval timer invoking runner ticks.
///
/// # Invariants
/// - Tick errors are recorded and never stop the timer.
pub struct Scheduler {
    /// Runner invoked every tick.
    runner: Arc<Runner>,
    /// Timer configuration.
    config: SchedulerConfig,
    /// Metrics sink.
    metrics: Arc<dyn EngineMetrics>,
    /// Stop signal sender for the running timer thread, when started.
    stop: Mutex<Option<mpsc::Sender<()>>>,
    /// Join handle for the running timer thread, when started.
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Scheduler {
    /// Creates a scheduler over the provided runner.
    #[must_use]
    pub fn new(runner: Arc<Runner>, config: SchedulerConfig, metrics: Arc<dyn EngineMetrics>) -> Self {
        Self {
            runner,
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
    /// A second start on a running scheduler is counted in telemetry and
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Spawn`] when the thread cannot be spawned.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let mut stop_guard = self.stop.lock().unwrap_or_else(PoisonError::into_inner);
        if stop_guard.is_some() {
            self.metrics.record_duplicate_start("scheduler");
            return Ok(());
        }
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let runner = Arc::clone(&self.runner);
        let metrics = Arc::clone(&self.metrics);
        let interval = Duration::from_millis(self.config.interval_ms);
        let handle = thread::Builder::new()
            .name("workloom-scheduler".to_string())
            .spawn(move || {
                scheduler_timer_loop(&runner, &*metrics, &stop_rx, interval);
            })
            .map_err(|err| SchedulerError::Spawn(err.to_string()))?;
        *stop_guard = Some(stop_tx);
        *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    /// Stops the timer thread and waits for it to exit.
    pub fn stop(&self) {
        let stop_tx = self.stop.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(sender) = stop_tx {
            let _ = sender.send(());
        }
        let handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Runs one tick synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the queued-job fetch fails.
    pub fn tick_once(&self) -> Result<usize, StoreError> {
        self.runner.run_once()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// SECTION: Timer Thread
// ============================================================================

/// Runs the scheduler timer until the stop channel signals or disconnects.
fn scheduler_timer_loop(
    runner: &Runner,
    metrics: &dyn EngineMetrics,
    stop_rx: &mpsc::Receiver<()>,
    interval: Duration,
) {
    loop {
        match stop_rx.recv_timeout(interval) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                if runner.run_once().is_err() {
                    metrics.record_tick_error("scheduler");
                }
            }
        }
    }
}
