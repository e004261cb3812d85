//! Centralized limits and thresholds for the tyrel type checker.
//!
//! Solver recursion profiles (`tyrel_solver::recursion::RecursionProfile`)
//! read their numbers from here so every threshold is tuned in one place.

// =============================================================================
// Subtype comparison
// =============================================================================

/// Recursion depth at which subtype comparison switches to monitored mode.
///
/// Below this depth the four-tier cascade runs unguarded. At and above it,
/// every `(tp1, tp2)` pair is recorded while in flight and a re-entrant pair
/// is answered `false` instead of being explored again.
///
/// ```text
/// type A <: B
/// type B <: A
/// A <: C  ->  B <: C  ->  A <: C  ->  ...   // refused once monitored
/// ```
pub const MONITORED_SUBTYPE_THRESHOLD: u32 = 50;

/// Maximum depth for walks inside the type algebra (base types through
/// alias/abstract chains, erasure of bound parameters).
///
/// These walks follow symbol infos rather than type structure, so a cyclic
/// declaration (`type A <: B; type B <: A`) would otherwise never end.
pub const MAX_TYPE_TRAVERSAL_DEPTH: u32 = 64;

/// Upper bound on the visiting set of any recursion guard.
pub const MAX_VISITING_SET_SIZE: u32 = 10_000;

// =============================================================================
// Stack growth
// =============================================================================

/// Remaining stack (bytes) below which a recursive comparison grows the stack.
pub const STACK_RED_ZONE: usize = 64 * 1024;

/// Size (bytes) of each freshly allocated stack segment.
pub const STACK_GROWTH_SIZE: usize = 2 * 1024 * 1024;
