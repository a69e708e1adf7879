// crates/workloom-core/src/core/idgen.rs
// ============================================================================
// Module: Identifier Generation
// Description: Boot-scoped identifier generator for jobs, artifacts, reports.
// Purpose: Mint process-unique identifiers without an external id service.
// Dependencies: rand
// ============================================================================

//! ## Overview
//! Identifiers are minted from a prefix, a boot-scoped random value, and a
//! monotonic counter. Uniqueness holds within a process lifetime; the random
//! boot value keeps identifiers from colliding across restarts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rand::RngCore;
use rand::rngs::OsRng;

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Boot-scoped identifier generator.
///
/// # Invariants
/// - Issued identifiers are unique within the process lifetime.
#[derive(Debug)]
pub struct IdGenerator {
    /// Prefix included in every generated identifier.
    prefix: &'static str,
    /// Boot-scoped random value for cross-restart entropy.
    boot_id: u64,
    /// Monotonic counter for identifiers issued in this process.
    counter: AtomicU64,
}

impl IdGenerator {
    /// Creates a generator with the given prefix.
    #[must_use]
    pub fn new(prefix: &'static str) -> Self {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        Self {
            prefix,
            boot_id: u64::from_be_bytes(bytes),
            counter: AtomicU64::new(1),
        }
    }

    /// Issues a new identifier string.
    #[must_use]
    pub fn issue(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{:016x}-{:08x}", self.prefix, self.boot_id, seq)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
