// crates/workloom-core/tests/queue.rs
// ============================================================================
// Module: Command Queue Tests
// Description: FIFO, drain-bound, and order-reconstruction properties.
// Purpose: Validate the queue contract the single-writer model depends on.
// Dependencies: workloom-core, proptest
// ============================================================================

//! Queue behavior tests: drains never exceed their bound, undrained commands
//! keep their relative order, and concatenated drains reconstruct the exact
//! enqueue order.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use proptest::prelude::*;
use workloom_core::Command;
use workloom_core::CommandQueue;
use workloom_core::CommandSink;
use workloom_core::JobId;
use workloom_core::JobStatus;
use workloom_core::LocalCommandBuffer;
use workloom_core::Timestamp;

/// Builds a distinguishable command carrying the provided marker.
fn marker_command(marker: u32) -> Command {
    Command::JobUpdateStatus {
        job_id: JobId::new(format!("job_{marker}")),
        status: JobStatus::Running,
        at: Timestamp::from_unix_millis(i64::from(marker)),
    }
}

/// Extracts the marker from a command built by `marker_command`.
fn marker_of(command: &Command) -> u32 {
    match command {
        Command::JobUpdateStatus {
            job_id, ..
        } => job_id
            .as_str()
            .strip_prefix("job_")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(u32::MAX),
        _ => u32::MAX,
    }
}

#[test]
fn drain_on_empty_queue_returns_empty_batch() {
    let queue = CommandQueue::new();
    assert!(queue.drain(16).is_empty());
    assert_eq!(queue.size(), 0);
}

#[test]
fn drain_never_exceeds_bound_and_preserves_remainder_order() {
    let queue = CommandQueue::new();
    for marker in 0 .. 10 {
        queue.enqueue(marker_command(marker));
    }
    let first = queue.drain(4);
    assert_eq!(first.len(), 4);
    assert_eq!(first.iter().map(marker_of).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    assert_eq!(queue.size(), 6);
    let rest = queue.drain(100);
    assert_eq!(rest.iter().map(marker_of).collect::<Vec<_>>(), vec![4, 5, 6, 7, 8, 9]);
}

#[test]
fn local_buffer_snapshot_is_non_destructive() {
    let buffer = LocalCommandBuffer::new();
    buffer.enqueue(marker_command(1));
    buffer.enqueue(marker_command(2));
    let snapshot = buffer.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(buffer.size(), 2);
}

#[test]
fn flush_into_moves_everything_in_order() {
    let buffer = LocalCommandBuffer::new();
    let queue = CommandQueue::new();
    queue.enqueue(marker_command(0));
    for marker in 1 ..= 3 {
        buffer.enqueue(marker_command(marker));
    }
    buffer.flush_into(&queue);
    assert_eq!(buffer.size(), 0);
    let drained = queue.drain(16);
    assert_eq!(drained.iter().map(marker_of).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
}

proptest! {
    #[test]
    fn successive_drains_reconstruct_enqueue_order(
        count in 0_u32 .. 64,
        chunks in proptest::collection::vec(1_usize .. 9, 0 .. 32),
    ) {
        let queue = CommandQueue::new();
        for marker in 0 .. count {
            queue.enqueue(marker_command(marker));
        }
        let mut recovered = Vec::new();
        for chunk in chunks {
            let batch = queue.drain(chunk);
            prop_assert!(batch.len() <= chunk);
            recovered.extend(batch.iter().map(marker_of));
        }
        recovered.extend(queue.drain(usize::MAX).iter().map(marker_of));
        prop_assert_eq!(recovered, (0 .. count).collect::<Vec<_>>());
    }
}
