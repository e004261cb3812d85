//! Recursion guards for the subtype cascade and the type algebra walks.
//!
//! Two mechanisms:
//!
//! 1. [`RecursionGuard`]: a visiting set plus depth and iteration limits.
//!    The comparator uses one keyed by `(tp1, tp2)` to refuse re-entrant
//!    pairs in monitored mode; the algebra uses one keyed by `TypeId` to cut
//!    cycles through abstract-type bounds.
//! 2. [`DepthCounter`]: the comparator's nesting depth. Entry always succeeds;
//!    what the counter reports is whether the new depth is still below the
//!    monitoring threshold.
//!
//! # Profiles
//!
//! [`RecursionProfile`] names the limit presets so call sites read as intent:
//!
//! ```ignore
//! let guard = RecursionGuard::<TypeId>::with_profile(RecursionProfile::TypeTraversal);
//! ```
//!
//! # Debug-mode safety
//!
//! Dropping a guard with active entries, or a counter above depth zero,
//! panics in debug builds unless the thread is already unwinding. Leaving a
//! key that was never entered panics as well.

use rustc_hash::FxHashSet;
use std::hash::Hash;
use tyrel_common::limits::{MAX_TYPE_TRAVERSAL_DEPTH, MAX_VISITING_SET_SIZE};

// ---------------------------------------------------------------------------
// RecursionProfile
// ---------------------------------------------------------------------------

/// Named recursion limit presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionProfile {
    /// Walks through symbol infos: base types, member lookup, erasure.
    ///
    /// depth = 64, iterations = 100,000, visiting = 10,000
    TypeTraversal,

    /// The in-flight pair set of monitored mode. Only cycles are refused;
    /// depth is already accounted for by the comparator's counter.
    ///
    /// depth = unbounded, iterations = unbounded, visiting = unbounded
    MonitoredPairs,
}

impl RecursionProfile {
    pub const fn max_depth(self) -> u32 {
        match self {
            Self::TypeTraversal => MAX_TYPE_TRAVERSAL_DEPTH,
            Self::MonitoredPairs => u32::MAX,
        }
    }

    pub const fn max_iterations(self) -> u32 {
        match self {
            Self::TypeTraversal => 100_000,
            Self::MonitoredPairs => u32::MAX,
        }
    }

    pub const fn max_visiting(self) -> u32 {
        match self {
            Self::TypeTraversal => MAX_VISITING_SET_SIZE,
            Self::MonitoredPairs => u32::MAX,
        }
    }
}

// ---------------------------------------------------------------------------
// RecursionResult
// ---------------------------------------------------------------------------

/// Result of attempting to enter a recursive computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionResult {
    Entered,
    /// The key is already being visited.
    Cycle,
    DepthExceeded,
    IterationExceeded,
}

impl RecursionResult {
    #[inline]
    pub fn is_entered(self) -> bool {
        matches!(self, Self::Entered)
    }

    #[inline]
    pub fn is_cycle(self) -> bool {
        matches!(self, Self::Cycle)
    }

    #[inline]
    pub fn is_exceeded(self) -> bool {
        matches!(self, Self::DepthExceeded | Self::IterationExceeded)
    }
}

// ---------------------------------------------------------------------------
// RecursionGuard
// ---------------------------------------------------------------------------

/// Visiting set with depth and iteration limits.
///
/// Every successful [`enter`](Self::enter) must be paired with a
/// [`leave`](Self::leave) of the same key.
pub struct RecursionGuard<K: Hash + Eq + Copy> {
    visiting: FxHashSet<K>,
    depth: u32,
    iterations: u32,
    max_depth: u32,
    max_iterations: u32,
    max_visiting: u32,
    exceeded: bool,
}

impl<K: Hash + Eq + Copy> RecursionGuard<K> {
    pub fn new(max_depth: u32, max_iterations: u32, max_visiting: u32) -> Self {
        Self {
            visiting: FxHashSet::default(),
            depth: 0,
            iterations: 0,
            max_depth,
            max_iterations,
            max_visiting,
            exceeded: false,
        }
    }

    pub fn with_profile(profile: RecursionProfile) -> Self {
        Self::new(
            profile.max_depth(),
            profile.max_iterations(),
            profile.max_visiting(),
        )
    }

    /// Try to enter the computation for `key`.
    ///
    /// Limits are checked in order: iterations, depth, cycle, visiting-set
    /// size.
    pub fn enter(&mut self, key: K) -> RecursionResult {
        self.iterations = self.iterations.saturating_add(1);

        if self.iterations > self.max_iterations {
            self.exceeded = true;
            return RecursionResult::IterationExceeded;
        }
        if self.depth >= self.max_depth {
            self.exceeded = true;
            return RecursionResult::DepthExceeded;
        }
        if self.visiting.contains(&key) {
            return RecursionResult::Cycle;
        }
        if self.visiting.len() as u32 >= self.max_visiting {
            self.exceeded = true;
            return RecursionResult::DepthExceeded;
        }

        self.visiting.insert(key);
        self.depth += 1;
        RecursionResult::Entered
    }

    pub fn leave(&mut self, key: K) {
        let was_present = self.visiting.remove(&key);
        debug_assert!(
            was_present,
            "RecursionGuard::leave() called with a key that is not in the visiting set"
        );
        self.depth = self.depth.saturating_sub(1);
    }

    #[inline]
    pub fn is_visiting(&self, key: &K) -> bool {
        self.visiting.contains(key)
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    #[inline]
    pub fn visiting_count(&self) -> usize {
        self.visiting.len()
    }

    #[inline]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Sticky until [`reset`](Self::reset).
    #[inline]
    pub fn is_exceeded(&self) -> bool {
        self.exceeded
    }

    pub fn reset(&mut self) {
        self.visiting.clear();
        self.depth = 0;
        self.iterations = 0;
        self.exceeded = false;
    }
}

#[cfg(debug_assertions)]
impl<K: Hash + Eq + Copy> Drop for RecursionGuard<K> {
    fn drop(&mut self) {
        if !std::thread::panicking() && !self.visiting.is_empty() {
            panic!(
                "RecursionGuard dropped with {} active entries still in the visiting set",
                self.visiting.len(),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// DepthCounter
// ---------------------------------------------------------------------------

/// How a comparison at the current depth must run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthMode {
    /// Below the threshold: run the cascade directly.
    Direct,
    /// At or above the threshold: run with re-entrant pair detection.
    Monitored,
}

/// Nesting depth of the subtype cascade.
///
/// Unlike [`RecursionGuard`], entry never fails: deep comparisons are not
/// cut off, they switch to monitored mode.
pub struct DepthCounter {
    depth: u32,
    threshold: u32,
    crossings: u32,
}

impl DepthCounter {
    pub fn new(threshold: u32) -> Self {
        Self {
            depth: 0,
            threshold,
            crossings: 0,
        }
    }

    /// Go one level deeper. The caller must [`leave`](Self::leave) afterwards.
    #[inline]
    pub fn enter(&mut self) -> DepthMode {
        self.depth = self.depth.saturating_add(1);
        if self.depth < self.threshold {
            DepthMode::Direct
        } else {
            if self.depth == self.threshold.max(1) {
                self.crossings = self.crossings.saturating_add(1);
            }
            DepthMode::Monitored
        }
    }

    #[inline]
    pub fn leave(&mut self) {
        debug_assert!(
            self.depth > 0,
            "DepthCounter::leave() called at depth 0"
        );
        self.depth = self.depth.saturating_sub(1);
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// How many times the depth has reached the threshold from below.
    #[inline]
    pub fn crossings(&self) -> u32 {
        self.crossings
    }

    /// Whether the last [`enter`](Self::enter) crossed into monitored mode.
    #[inline]
    pub fn just_crossed(&self) -> bool {
        self.depth == self.threshold.max(1)
    }
}

#[cfg(debug_assertions)]
impl Drop for DepthCounter {
    fn drop(&mut self) {
        if !std::thread::panicking() && self.depth > 0 {
            panic!(
                "DepthCounter dropped with depth {}; enter() without matching leave()",
                self.depth,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_limits() {
        assert_eq!(RecursionProfile::TypeTraversal.max_depth(), 64);
        assert_eq!(RecursionProfile::TypeTraversal.max_iterations(), 100_000);
        assert_eq!(RecursionProfile::TypeTraversal.max_visiting(), 10_000);
        assert_eq!(RecursionProfile::MonitoredPairs.max_depth(), u32::MAX);
        assert_eq!(RecursionProfile::MonitoredPairs.max_visiting(), u32::MAX);
    }

    #[test]
    fn guard_detects_cycle() {
        let mut guard = RecursionGuard::<(u32, u32)>::with_profile(RecursionProfile::MonitoredPairs);
        assert_eq!(guard.enter((1, 2)), RecursionResult::Entered);
        assert_eq!(guard.enter((2, 1)), RecursionResult::Entered);
        assert!(guard.enter((1, 2)).is_cycle());
        assert!(guard.is_visiting(&(1, 2)));
        guard.leave((2, 1));
        guard.leave((1, 2));
        assert_eq!(guard.visiting_count(), 0);
        assert!(!guard.is_exceeded());
    }

    #[test]
    fn guard_depth_exceeded_is_sticky() {
        let mut guard = RecursionGuard::<u32>::new(2, 100, 100);
        assert!(guard.enter(1).is_entered());
        assert!(guard.enter(2).is_entered());
        assert!(guard.enter(3).is_exceeded());
        guard.leave(2);
        guard.leave(1);
        assert_eq!(guard.depth(), 0);
        assert!(guard.is_exceeded());
        guard.reset();
        assert!(!guard.is_exceeded());
    }

    #[test]
    fn guard_iteration_limit() {
        let mut guard = RecursionGuard::<u32>::new(10, 2, 100);
        assert!(guard.enter(1).is_entered());
        guard.leave(1);
        assert!(guard.enter(1).is_entered());
        guard.leave(1);
        assert_eq!(guard.enter(1), RecursionResult::IterationExceeded);
    }

    #[test]
    fn guard_visiting_set_limit() {
        let mut guard = RecursionGuard::<u32>::new(100, 100, 1);
        assert!(guard.enter(1).is_entered());
        assert_eq!(guard.enter(2), RecursionResult::DepthExceeded);
        guard.leave(1);
    }

    #[test]
    fn monitored_pairs_are_not_capped_by_size() {
        let mut guard = RecursionGuard::<u32>::with_profile(RecursionProfile::MonitoredPairs);
        let count = MAX_VISITING_SET_SIZE + 100;
        for key in 0..count {
            assert!(guard.enter(key).is_entered());
        }
        assert!(guard.enter(0).is_cycle());
        for key in (0..count).rev() {
            guard.leave(key);
        }
        assert!(!guard.is_exceeded());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not in the visiting set")]
    fn guard_leave_without_enter_panics() {
        let mut guard = RecursionGuard::<u32>::new(5, 100, 100);
        guard.leave(1);
    }

    #[test]
    fn depth_counter_switches_mode_at_threshold() {
        let mut counter = DepthCounter::new(3);
        assert_eq!(counter.enter(), DepthMode::Direct);
        assert_eq!(counter.enter(), DepthMode::Direct);
        assert_eq!(counter.enter(), DepthMode::Monitored);
        assert_eq!(counter.enter(), DepthMode::Monitored);
        assert_eq!(counter.crossings(), 1);
        counter.leave();
        counter.leave();
        assert_eq!(counter.enter(), DepthMode::Monitored);
        assert_eq!(counter.crossings(), 2);
        counter.leave();
        counter.leave();
        counter.leave();
        assert_eq!(counter.depth(), 0);
    }

    #[test]
    fn depth_counter_zero_threshold_is_always_monitored() {
        let mut counter = DepthCounter::new(0);
        assert_eq!(counter.enter(), DepthMode::Monitored);
        assert!(counter.just_crossed());
        assert_eq!(counter.enter(), DepthMode::Monitored);
        assert!(!counter.just_crossed());
        assert_eq!(counter.crossings(), 1);
        counter.leave();
        counter.leave();
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "called at depth 0")]
    fn depth_counter_leave_at_zero_panics() {
        let mut counter = DepthCounter::new(3);
        counter.leave();
    }
}
