// crates/workloom-core/src/core/hashing.rs
// ============================================================================
// Module: Workloom Hashing
// Description: Content hashing helpers for artifact provenance.
// Purpose: Provide stable content digests for PRD records and reports.
// Dependencies: sha2
// ============================================================================

//! ## Overview
//! Requirement documents and verification reports carry a content hash of
//! the artifact body they were derived from, so a reader can detect drift
//! between the document and a later artifact update.

// ============================================================================
// SECTION: Imports
// ============================================================================

use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Hashing
// ============================================================================

/// Hash algorithm label stored alongside digests.
pub const DEFAULT_HASH_ALGORITHM: &str = "sha256";

/// Returns the lowercase hex SHA-256 digest of the provided bytes.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
