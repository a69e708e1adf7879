// crates/workloom-engine/src/reflection.rs
// ============================================================================
// Module: Reflection Capture
// Description: Best-effort post-run reflection via the routed text backend.
// Purpose: Record what a thorough-effort run learned, without risking the job.
// Dependencies: workloom-core, workloom-router, serde, serde_json
// ============================================================================

//! ## Overview
//! After a thorough-effort run finishes, the runner asks the routed text
//! backend three questions: what the execution accomplished, what slowed it
//! down, and what should change next time. Capture is strictly best effort;
//! any failure is counted in telemetry and the job outcome is unaffected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use workloom_core::Job;
use workloom_core::Reflection;
use workloom_core::Timestamp;
use workloom_router::RouteOptions;
use workloom_router::TextRequest;
use workloom_router::TextRouter;

use crate::context::EngineIds;

// ============================================================================
// SECTION: Capture
// ============================================================================

/// Best-effort reflection prompter.
///
/// # Invariants
/// - Never raises; an unusable reply yields `None`.
pub struct ReflectionCapture {
    /// Shared identifier generators.
    ids: Arc<EngineIds>,
}

impl ReflectionCapture {
    /// Creates a reflection prompter over the shared identifier generators.
    #[must_use]
    pub const fn new(ids: Arc<EngineIds>) -> Self {
        Self {
            ids,
        }
    }

    /// Prompts the text backend for a reflection on the finished run.
    ///
    /// Returns `None` when no backend answers or the reply cannot be read.
    #[must_use]
    pub fn capture(&self, text: &TextRouter, job: &Job, run_summary: &str) -> Option<Reflection> {
        let request = TextRequest {
            prompt: format!(
                "A job for workflow '{}' just finished. Run summary: {run_summary}\n\
                 Answer three questions as a JSON object with string fields \
                 \"outcome\", \"friction\", and \"next_step\":\n\
                 1. What did the execution accomplish?\n\
                 2. What slowed it down or failed along the way?\n\
                 3. What should change for the next execution?\n\
                 Reply with the JSON object only.",
                job.workflow_id
            ),
            system: Some("You are a concise engineering retrospective writer.".to_string()),
            max_tokens: Some(512),
        };
        let routed = text.generate(&request, &RouteOptions::default()).ok()?;
        let reply = parse_reply(&routed.text)?;
        Some(Reflection {
            id: self.ids.reflections.issue(),
            job_id: job.id.clone(),
            outcome: reply.outcome,
            friction: reply.friction,
            next_step: reply.next_step,
            at: Timestamp::now(),
        })
    }
}

// ============================================================================
// SECTION: Reply Parsing
// ============================================================================

/// Structured reflection reply expected from the text backend.
#[derive(Debug, Deserialize)]
struct ReflectionReply {
    /// What the execution accomplished.
    #[serde(default)]
    outcome: String,
    /// What slowed the execution down.
    #[serde(default)]
    friction: String,
    /// What should change next time.
    #[serde(default, alias = "nextStep")]
    next_step: String,
}

/// Parses a backend reply, tolerating prose around the JSON object.
fn parse_reply(reply: &str) -> Option<ReflectionReply> {
    if let Ok(parsed) = serde_json::from_str::<ReflectionReply>(reply) {
        return Some(parsed);
    }
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<ReflectionReply>(&reply[start ..= end]).ok()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::missing_panics_doc,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use super::*;

    #[test]
    fn bare_json_reply_parses() {
        let reply = parse_reply(
            r#"{"outcome": "shipped", "friction": "slow backend", "next_step": "cache"}"#,
        )
        .unwrap();
        assert_eq!(reply.outcome, "shipped");
        assert_eq!(reply.next_step, "cache");
    }

    #[test]
    fn json_embedded_in_prose_parses() {
        let reply =
            parse_reply("Here you go: {\"outcome\": \"done\", \"friction\": \"\"} thanks").unwrap();
        assert_eq!(reply.outcome, "done");
        assert_eq!(reply.next_step, "");
    }

    #[test]
    fn prose_without_json_is_rejected() {
        assert!(parse_reply("it went fine overall").is_none());
    }
}
