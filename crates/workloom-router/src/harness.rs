// crates/workloom-router/src/harness.rs
// ============================================================================
// Module: Local Process Harness
// Description: Built-in harness backend executing a local program.
// Purpose: Run tool invocations as timed child processes.
// Dependencies: std, serde
// ============================================================================

//! ## Overview
//! The local process harness runs a configured program with the request's
//! tool name and arguments appended after a fixed base argument list. The
//! availability probe resolves the program on every routing attempt: an
//! absolute or relative path must point at an executable file, a bare name
//! must resolve through `PATH`. A nonzero exit is reported as an outcome; a
//! timeout maps to a backend timeout error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::process::ProcessError;
use crate::process::run_with_timeout;
use crate::runtime::BackendError;
use crate::runtime::HarnessBackend;
use crate::runtime::HarnessOutcome;
use crate::runtime::HarnessRequest;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Default execution timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
/// Default terminate-to-kill grace window in milliseconds.
const DEFAULT_GRACE_MS: u64 = 2_000;

/// Configuration for the local process harness.
///
/// # Invariants
/// - `base_args` precede the request's tool name and arguments on every
///   invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalProcessHarnessConfig {
    /// Program to execute: an absolute path or a bare name found on `PATH`.
    pub program: String,
    /// Fixed arguments prepended to every invocation.
    #[serde(default)]
    pub base_args: Vec<String>,
    /// Execution timeout in milliseconds when the request supplies none.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Grace window between graceful terminate and forced kill.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
}

/// Returns the default execution timeout.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Returns the default grace window.
const fn default_grace_ms() -> u64 {
    DEFAULT_GRACE_MS
}

// ============================================================================
// SECTION: Program Resolution
// ============================================================================

/// Resolves a program to an executable path.
///
/// Names containing a path separator are checked directly; bare names are
/// searched through `PATH`.
#[must_use]
pub fn resolve_program(program: &str) -> Option<PathBuf> {
    if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
        let candidate = PathBuf::from(program);
        return is_executable(&candidate).then_some(candidate);
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

/// Returns true when the path names an executable regular file.
#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Returns true when the path names a regular file.
#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Harness backend executing a configured local program.
pub struct LocalProcessHarness {
    /// Backend configuration.
    config: LocalProcessHarnessConfig,
}

impl LocalProcessHarness {
    /// Creates a harness from the provided configuration.
    #[must_use]
    pub const fn new(config: LocalProcessHarnessConfig) -> Self {
        Self {
            config,
        }
    }
}

impl HarnessBackend for LocalProcessHarness {
    fn available(&self) -> bool {
        resolve_program(&self.config.program).is_some()
    }

    fn execute(&self, request: &HarnessRequest) -> Result<HarnessOutcome, BackendError> {
        let program = resolve_program(&self.config.program).ok_or_else(|| {
            BackendError::Call(format!("program not found: {}", self.config.program))
        })?;
        let mut command = Command::new(program);
        command.args(&self.config.base_args);
        command.arg(&request.tool);
        command.args(&request.args);

        let timeout_ms = request.timeout_ms.unwrap_or(self.config.timeout_ms);
        let output = run_with_timeout(
            &mut command,
            request.stdin.as_deref(),
            Duration::from_millis(timeout_ms),
            Duration::from_millis(self.config.grace_ms),
        )
        .map_err(|err| match err {
            ProcessError::TimedOut {
                timeout_ms,
            } => BackendError::TimedOut {
                timeout_ms,
            },
            ProcessError::Spawn(message) | ProcessError::Io(message) => BackendError::Call(message),
        })?;
        Ok(HarnessOutcome {
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
