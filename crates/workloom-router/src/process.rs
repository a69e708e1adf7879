// crates/workloom-router/src/process.rs
// ============================================================================
// Module: Timed Process Execution
// Description: Spawn a child process with stdin, capture, and a timeout.
// Purpose: Shared process control for harness backends and verifiers.
// Dependencies: std, nix (unix)
// ============================================================================

//! ## Overview
//! Harness backends and the command-exit verifier both run external
//! processes under a caller-supplied timeout. On expiry the child receives a
//! graceful terminate signal (SIGTERM on Unix), then a forced kill after a
//! grace window, and the operation completes with a timeout error. A timeout
//! is treated by callers as a verification or harness failure, never as a
//! system fault.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;
use std::process::Child;
use std::process::ChildStdin;
use std::process::Command;
use std::process::Stdio;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Poll interval while waiting for a child to exit.
const WAIT_POLL: Duration = Duration::from_millis(10);
/// Default grace window between terminate and forced kill.
pub const DEFAULT_GRACE: Duration = Duration::from_millis(2_000);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Timed process execution errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Process failed to spawn.
    #[error("process spawn failed: {0}")]
    Spawn(String),
    /// I/O with the child process failed.
    #[error("process io error: {0}")]
    Io(String),
    /// Process exceeded the caller-supplied timeout.
    #[error("process timed out after {timeout_ms} ms")]
    TimedOut {
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Captured output of a completed process.
///
/// # Invariants
/// - `exit_code` is `-1` when the process exited without a code (signal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Process exit code.
    pub exit_code: i32,
    /// Captured stdout, lossily decoded.
    pub stdout: String,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Runs a command to completion under a timeout, capturing output.
///
/// `stdin` is written from a writer thread so a child that never reads it
/// cannot stall the deadline once the pipe buffer fills; stdout and stderr
/// are drained on reader threads so a chatty child cannot deadlock on full
/// pipes. A child that exits without reading its stdin reports its own
/// outcome; the resulting broken pipe is not an error.
///
/// # Errors
///
/// Returns [`ProcessError::Spawn`] when the command cannot start,
/// [`ProcessError::Io`] on pipe failures, and [`ProcessError::TimedOut`]
/// when the child had to be terminated.
pub fn run_with_timeout(
    command: &mut Command,
    stdin: Option<&str>,
    timeout: Duration,
    grace: Duration,
) -> Result<ProcessOutput, ProcessError> {
    command.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() });
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|err| ProcessError::Spawn(err.to_string()))?;

    let stdout_reader = child.stdout.take().map(spawn_capture);
    let stderr_reader = child.stderr.take().map(spawn_capture);
    let stdin_writer = match (stdin, child.stdin.take()) {
        (Some(payload), Some(handle)) => {
            Some(spawn_stdin_writer(handle, payload.as_bytes().to_vec()))
        }
        _ => None,
    };

    let deadline = Instant::now() + timeout;
    let exit_code = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status.code().unwrap_or(-1),
            Ok(None) => {
                if Instant::now() >= deadline {
                    terminate(&mut child, grace);
                    drain_capture(stdout_reader);
                    drain_capture(stderr_reader);
                    drain_writer(stdin_writer);
                    return Err(ProcessError::TimedOut {
                        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    });
                }
                thread::sleep(WAIT_POLL);
            }
            Err(err) => {
                terminate(&mut child, grace);
                drain_capture(stdout_reader);
                drain_capture(stderr_reader);
                drain_writer(stdin_writer);
                return Err(ProcessError::Io(err.to_string()));
            }
        }
    };

    if let Some(writer) = stdin_writer
        && let Ok(Err(message)) = writer.join()
    {
        drain_capture(stdout_reader);
        drain_capture(stderr_reader);
        return Err(ProcessError::Io(message));
    }

    Ok(ProcessOutput {
        exit_code,
        stdout: collect_capture(stdout_reader),
        stderr: collect_capture(stderr_reader),
    })
}

/// Spawns a writer thread streaming the stdin payload to the child.
///
/// A broken pipe means the child stopped reading; the child's own exit
/// reports the outcome, so the writer treats it as success.
fn spawn_stdin_writer(
    mut handle: ChildStdin,
    payload: Vec<u8>,
) -> thread::JoinHandle<Result<(), String>> {
    thread::spawn(move || match handle.write_all(&payload) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.to_string()),
    })
}

/// Joins the stdin writer thread, discarding its result.
fn drain_writer(handle: Option<thread::JoinHandle<Result<(), String>>>) {
    if let Some(writer) = handle {
        let _ = writer.join();
    }
}

/// Spawns a reader thread draining one output pipe.
fn spawn_capture<S>(mut stream: S) -> thread::JoinHandle<Vec<u8>>
where
    S: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = stream.read_to_end(&mut buffer);
        buffer
    })
}

/// Joins a capture thread and lossily decodes its bytes.
fn collect_capture(handle: Option<thread::JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|reader| reader.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Joins a capture thread, discarding its output.
fn drain_capture(handle: Option<thread::JoinHandle<Vec<u8>>>) {
    if let Some(reader) = handle {
        let _ = reader.join();
    }
}

/// Terminates a child gracefully, then forcibly after the grace window.
#[cfg(unix)]
fn terminate(child: &mut Child, grace: Duration) {
    use nix::sys::signal::Signal;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    if let Ok(pid) = i32::try_from(child.id()) {
        let _ = kill(Pid::from_raw(pid), Signal::SIGTERM);
    }
    let grace_deadline = Instant::now() + grace;
    while Instant::now() < grace_deadline {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        thread::sleep(WAIT_POLL);
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// Terminates a child forcibly; no graceful signal exists on this platform.
#[cfg(not(unix))]
fn terminate(child: &mut Child, _grace: Duration) {
    let _ = child.kill();
    let _ = child.wait();
}
