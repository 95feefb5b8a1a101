//! # Subbuteo Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Match fixtures at well-known points of the lifecycle
//! - Synthetic physics bodies and a flat ground projector
//! - Determinism harness over replay logs
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod strategies;

/// Re-export proptest for convenience.
pub use proptest;
