// crates/workloom-verify/src/verifiers/command_exit.rs
// ============================================================================
// Module: Command-Exit Verifier
// Description: Shell-command verification with artifact content on stdin.
// Purpose: Pass a criterion iff the configured command exits zero.
// Dependencies: workloom-router
// ============================================================================

//! ## Overview
//! The command-exit verifier runs the criterion's shell command with the
//! artifact's content piped to stdin. Exit code zero passes; anything else,
//! including a timeout or a spawn failure, is a failed verdict. Evidence is
//! the captured stdout and stderr.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::process::Command;
use std::time::Duration;

use workloom_core::Artifact;
use workloom_core::Criterion;
use workloom_core::VerificationMethod;
use workloom_router::process::DEFAULT_GRACE;
use workloom_router::process::ProcessError;
use workloom_router::process::run_with_timeout;

use crate::verifiers::Verdict;
use crate::verifiers::Verifier;

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Default command timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Verifier spawning a shell command per criterion.
pub struct CommandExitVerifier {
    /// Command timeout.
    timeout: Duration,
    /// Terminate-to-kill grace window.
    grace: Duration,
}

impl CommandExitVerifier {
    /// Creates a verifier with the provided timeout.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            grace: DEFAULT_GRACE,
        }
    }
}

impl Default for CommandExitVerifier {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }
}

impl Verifier for CommandExitVerifier {
    fn verify(&self, criterion: &Criterion, artifact: &Artifact) -> Verdict {
        let VerificationMethod::CommandExit {
            command,
        } = &criterion.method
        else {
            return Verdict::failed(format!(
                "command_exit verifier received a {} criterion",
                criterion.method.kind()
            ));
        };
        let mut shell = Command::new("sh");
        shell.arg("-c");
        shell.arg(command);
        match run_with_timeout(&mut shell, Some(artifact.content().unwrap_or_default()), self.timeout, self.grace) {
            Ok(output) => Verdict {
                passed: output.exit_code == 0,
                evidence: Some(format!("stdout: {}\nstderr: {}", output.stdout, output.stderr)),
                actual_value: Some(format!("exit {}", output.exit_code)),
            },
            Err(ProcessError::TimedOut {
                timeout_ms,
            }) => Verdict::failed(format!("command timed out after {timeout_ms} ms")),
            Err(err) => Verdict::failed(err.to_string()),
        }
    }
}
