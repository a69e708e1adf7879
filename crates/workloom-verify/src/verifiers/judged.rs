// crates/workloom-verify/src/verifiers/judged.rs
// ============================================================================
// Module: Judged Verifier
// Description: Script-hook or model-judged verification.
// Purpose: Delegate subjective criteria to a script or the routed text backend.
// Dependencies: workloom-router, serde_json
// ============================================================================

//! ## Overview
//! A judged criterion either names an external script or relies on the
//! routed text backend. A script receives the artifact and criterion as JSON
//! on stdin and answers with a `{passed, evidence, actual_value}` verdict on
//! stdout. Without a script, the text router is prompted with the artifact
//! and criterion description; replies that fail to parse as JSON fall back
//! to keyword scanning so a plain "pass"/"fail" answer is still usable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use workloom_core::Artifact;
use workloom_core::Criterion;
use workloom_core::VerificationMethod;
use workloom_router::RouteOptions;
use workloom_router::TextRequest;
use workloom_router::TextRouter;
use workloom_router::process::DEFAULT_GRACE;
use workloom_router::process::run_with_timeout;

use crate::verifiers::Verdict;
use crate::verifiers::Verifier;

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Default script timeout in milliseconds.
const DEFAULT_SCRIPT_TIMEOUT_MS: u64 = 60_000;

/// Verifier delegating judgment to a script hook or the text backend.
pub struct JudgedVerifier {
    /// Routed text backend used when no script is configured.
    text: Option<Arc<TextRouter>>,
    /// Script execution timeout.
    script_timeout: Duration,
}

impl JudgedVerifier {
    /// Creates a verifier with an optional text router for model judgment.
    #[must_use]
    pub const fn new(text: Option<Arc<TextRouter>>) -> Self {
        Self {
            text,
            script_timeout: Duration::from_millis(DEFAULT_SCRIPT_TIMEOUT_MS),
        }
    }

    /// Runs the configured script hook with the judgment payload on stdin.
    fn judge_by_script(&self, script: &str, criterion: &Criterion, artifact: &Artifact) -> Verdict {
        let payload = serde_json::json!({
            "criterion": {
                "id": criterion.id,
                "description": criterion.description,
            },
            "artifact": artifact,
        });
        let mut command = Command::new(script);
        match run_with_timeout(
            &mut command,
            Some(&payload.to_string()),
            self.script_timeout,
            DEFAULT_GRACE,
        ) {
            Ok(output) if output.exit_code == 0 => parse_reply(&output.stdout),
            Ok(output) => Verdict::failed(format!(
                "judge script exited {}: {}",
                output.exit_code, output.stderr
            )),
            Err(err) => Verdict::failed(format!("judge script failed: {err}")),
        }
    }

    /// Prompts the routed text backend to judge the criterion.
    fn judge_by_model(&self, criterion: &Criterion, artifact: &Artifact) -> Verdict {
        let Some(router) = &self.text else {
            return Verdict::failed("no judge script and no text backend configured");
        };
        let request = TextRequest {
            prompt: format!(
                "Judge whether the following artifact satisfies this criterion.\n\
                 Criterion: {}\n\
                 Artifact content:\n{}\n\
                 Reply with JSON: {{\"passed\": bool, \"evidence\": string, \
                 \"actual_value\": string}}.",
                criterion.description,
                artifact.content().unwrap_or_default()
            ),
            system: Some("You are a strict quality judge.".to_string()),
            max_tokens: None,
        };
        match router.generate(&request, &RouteOptions::default()) {
            Ok(routed) => parse_reply(&routed.text),
            Err(err) => Verdict::failed(format!("judge backend unavailable: {err}")),
        }
    }
}

impl Verifier for JudgedVerifier {
    fn verify(&self, criterion: &Criterion, artifact: &Artifact) -> Verdict {
        let VerificationMethod::Judged {
            script,
        } = &criterion.method
        else {
            return Verdict::failed(format!(
                "judged verifier received a {} criterion",
                criterion.method.kind()
            ));
        };
        script.as_ref().map_or_else(
            || self.judge_by_model(criterion, artifact),
            |script| self.judge_by_script(script, criterion, artifact),
        )
    }
}

// ============================================================================
// SECTION: Reply Parsing
// ============================================================================

/// Parses a judge reply: structured JSON first, keyword fallback second.
fn parse_reply(reply: &str) -> Verdict {
    let trimmed = reply.trim();
    if let Ok(verdict) = serde_json::from_str::<Verdict>(trimmed) {
        return verdict;
    }
    // Replies often wrap the JSON object in prose; try the first brace span.
    if let Some(start) = trimmed.find('{')
        && let Some(end) = trimmed.rfind('}')
        && start < end
        && let Ok(verdict) = serde_json::from_str::<Verdict>(&trimmed[start ..= end])
    {
        return verdict;
    }
    let lowered = trimmed.to_lowercase();
    let passed = (lowered.contains("pass") && !lowered.contains("fail"))
        || lowered.contains("true")
        || lowered.contains("yes");
    Verdict {
        passed,
        evidence: Some(trimmed.to_string()),
        actual_value: None,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use super::parse_reply;

    #[test]
    fn structured_json_reply_is_parsed() {
        let verdict = parse_reply(r#"{"passed": true, "evidence": "looks good"}"#);
        assert!(verdict.passed);
        assert_eq!(verdict.evidence.as_deref(), Some("looks good"));
    }

    #[test]
    fn camel_case_actual_value_is_accepted() {
        let verdict = parse_reply(r#"{"passed": false, "actualValue": "7"}"#);
        assert!(!verdict.passed);
        assert_eq!(verdict.actual_value.as_deref(), Some("7"));
    }

    #[test]
    fn embedded_json_object_is_extracted_from_prose() {
        let verdict = parse_reply("Here is my verdict: {\"passed\": true} hope that helps");
        assert!(verdict.passed);
    }

    #[test]
    fn keyword_fallback_handles_plain_answers() {
        assert!(parse_reply("PASS: everything checks out").passed);
        assert!(!parse_reply("fail, missing section").passed);
        assert!(!parse_reply("unclear").passed);
    }
}
