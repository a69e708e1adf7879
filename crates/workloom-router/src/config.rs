// crates/workloom-router/src/config.rs
// ============================================================================
// Module: Routing Configuration
// Description: Profile maps and fallback lists per resource kind.
// Purpose: Load and validate externally supplied routing plain data.
// Dependencies: serde, toml, workloom-core
// ============================================================================

//! ## Overview
//! Routing configuration is externally loaded plain data: per resource kind,
//! a default profile name, a map from profile name to an ordered backend-id
//! list, and a global fallback id list. The whole document is one TOML file
//! covering all three kinds.
//!
//! ```toml
//! [text]
//! default_profile = "balanced"
//! fallback = ["local-echo"]
//! [text.profiles]
//! balanced = ["primary", "secondary"]
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use workloom_core::BackendId;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Routing configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("routing config io error: {0}")]
    Io(String),
    /// Configuration failed to parse.
    #[error("routing config parse error: {0}")]
    Parse(String),
    /// Configuration is structurally invalid.
    #[error("routing config invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Per-Kind Config
// ============================================================================

/// Routing configuration for one resource kind.
///
/// # Invariants
/// - `default_profile`, when profiles exist, names a key of `profiles`.
/// - Candidate order inside a profile is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RouterConfig {
    /// Profile used when a call supplies none.
    #[serde(default)]
    pub default_profile: String,
    /// Ordered backend-id lists keyed by profile name.
    #[serde(default)]
    pub profiles: BTreeMap<String, Vec<BackendId>>,
    /// Global fallback backend ids appended to every candidate list.
    #[serde(default)]
    pub fallback: Vec<BackendId>,
}

impl RouterConfig {
    /// Validates profile references.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `default_profile` is set but
    /// missing from `profiles`.
    pub fn validate(&self, kind_label: &str) -> Result<(), ConfigError> {
        if !self.default_profile.is_empty() && !self.profiles.contains_key(&self.default_profile) {
            return Err(ConfigError::Invalid(format!(
                "{kind_label}: default_profile {} is not a configured profile",
                self.default_profile
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Full Config
// ============================================================================

/// Routing configuration document covering all three resource kinds.
///
/// # Invariants
/// - Missing sections default to empty configs (routing then relies solely
///   on explicit backend ids).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RoutingConfig {
    /// Text generation routing.
    #[serde(default)]
    pub text: RouterConfig,
    /// Embedding generation routing.
    #[serde(default)]
    pub embeddings: RouterConfig,
    /// Harness execution routing.
    #[serde(default)]
    pub harness: RouterConfig,
}

impl RoutingConfig {
    /// Parses and validates a routing configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.text.validate("text")?;
        config.embeddings.validate("embeddings")?;
        config.harness.validate("harness")?;
        Ok(config)
    }

    /// Loads a routing configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when reading, parsing, or validation fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        Self::from_toml_str(&raw)
    }
}
