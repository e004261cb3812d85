//! Common types and utilities for the tyrel type checker.
//!
//! This crate provides foundational types used across all tyrel crates:
//! - String interning (`Atom`, `ShardedInterner`)
//! - Recursion thresholds and stack growth limits
//! - Tracing subscriber setup

// String interning for member and parameter names
pub mod interner;
pub use interner::{Atom, ShardedInterner};

// Centralized limits and thresholds
pub mod limits;

// Tracing subscriber configuration
pub mod tracing_config;
pub use tracing_config::init_tracing;
