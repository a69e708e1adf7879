// crates/workloom-router/src/lib.rs
// ============================================================================
// Module: Workloom Router
// Description: Backend registries, profile routing, and built-in backends.
// Purpose: Route text, embedding, and harness calls with fallback semantics.
// Dependencies: workloom-core, serde, reqwest, toml
// ============================================================================

//! ## Overview
//! One generic registry/router pattern instantiated three times: text
//! generation, embedding generation, and tool/harness execution. A router
//! resolves an ordered candidate list (explicit id, then profile ids, then
//! the global fallback), probes availability on every attempt, and returns
//! the first successful result stamped with the winning backend id.
//! Invariants:
//! - Availability probes are re-evaluated on every routing attempt, never
//!   cached.
//! - Text and embedding attempts fall through on error; harness execution
//!   errors propagate immediately once a backend has been attempted.
//! - Exhausting the candidate list raises a typed no-available-backend error
//!   tagged with the resource kind.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod harness;
pub mod http;
pub mod process;
pub mod registry;
pub mod router;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::RouterConfig;
pub use config::RoutingConfig;
pub use harness::LocalProcessHarness;
pub use harness::LocalProcessHarnessConfig;
pub use http::HttpTextBackend;
pub use http::HttpTextBackendConfig;
pub use registry::BackendRegistry;
pub use router::EmbeddingRouter;
pub use router::HarnessRouter;
pub use router::RouteError;
pub use router::RouteOptions;
pub use router::Router;
pub use router::TextRouter;
pub use runtime::BackendError;
pub use runtime::EmbeddingBackend;
pub use runtime::EmbeddingRequest;
pub use runtime::HarnessBackend;
pub use runtime::HarnessOutcome;
pub use runtime::HarnessRequest;
pub use runtime::ResourceKind;
pub use runtime::RoutedEmbeddings;
pub use runtime::RoutedHarness;
pub use runtime::RoutedText;
pub use runtime::TextBackend;
pub use runtime::TextRequest;

#[cfg(test)]
mod tests;
