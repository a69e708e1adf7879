// crates/workloom-core/src/queue.rs
// ============================================================================
// Module: Workloom Command Queues
// Description: Shared command queue and per-job local command buffer.
// Purpose: Buffer state-mutation intents ahead of the single writer.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Two independent queue types satisfy the shared [`CommandSink`] capability:
//! the process-wide [`CommandQueue`] drained by the flush loop, and the
//! throwaway [`LocalCommandBuffer`] owned by one runner invocation. They are
//! composed, not inherited, so the runner can swap the local variant into a
//! workflow context without any is-a relationship.
//! Invariants:
//! - FIFO insertion order is preserved across drains.
//! - `enqueue` never blocks and never validates.
//! - `drain(max)` removes at most `max` commands; an empty queue returns an
//!   empty batch, not an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::PoisonError;

use crate::core::command::Command;

// ============================================================================
// SECTION: Sink Capability
// ============================================================================

/// Shared enqueue/drain capability over a FIFO command buffer.
pub trait CommandSink {
    /// Appends a command to the tail. Never blocks, never validates.
    fn enqueue(&self, command: Command);

    /// Removes and returns up to `max` oldest commands in FIFO order.
    fn drain(&self, max: usize) -> Vec<Command>;

    /// Returns the current queue depth.
    fn size(&self) -> usize;
}

// ============================================================================
// SECTION: Global Queue
// ============================================================================

/// Process-wide FIFO buffer of pending commands.
///
/// # Invariants
/// - Many producers may enqueue concurrently; only the flush loop drains.
/// - No persistence and no backpressure beyond observable size.
#[derive(Debug, Default)]
pub struct CommandQueue {
    /// FIFO storage guarded for concurrent producers.
    inner: Mutex<VecDeque<Command>>,
}

impl CommandQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandSink for CommandQueue {
    fn enqueue(&self, command: Command) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).push_back(command);
    }

    fn drain(&self, max: usize) -> Vec<Command> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let take = max.min(guard.len());
        guard.drain(.. take).collect()
    }

    fn size(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

// ============================================================================
// SECTION: Local Buffer
// ============================================================================

/// Per-job-execution throwaway command buffer.
///
/// # Invariants
/// - Owned exclusively by one runner invocation; nothing reads it until it is
///   explicitly flushed into the global queue.
/// - [`LocalCommandBuffer::snapshot`] never removes commands, so the runner
///   can inspect workflow intent before committing anything.
#[derive(Debug, Default)]
pub struct LocalCommandBuffer {
    /// FIFO storage; the mutex only serves interior mutability for the
    /// context handles held during one job execution.
    inner: Mutex<VecDeque<Command>>,
}

impl LocalCommandBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a non-destructive copy of the buffered commands in order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Command> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).iter().cloned().collect()
    }

    /// Moves every buffered command into the provided sink, preserving order.
    pub fn flush_into(&self, sink: &dyn CommandSink) {
        let drained: Vec<Command> = {
            let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            guard.drain(..).collect()
        };
        for command in drained {
            sink.enqueue(command);
        }
    }
}

impl CommandSink for LocalCommandBuffer {
    fn enqueue(&self, command: Command) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).push_back(command);
    }

    fn drain(&self, max: usize) -> Vec<Command> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let take = max.min(guard.len());
        guard.drain(.. take).collect()
    }

    fn size(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
