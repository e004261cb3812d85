//! Subtype comparison.
//!
//! `is_sub_type(tp1, tp2)` runs a four-tier cascade. Each tier dispatches on
//! the shape of one operand and either decides or defers to the next tier:
//!
//! | Tier | Dispatches on | Handles |
//! |------|---------------|---------|
//! | `first_try` | `tp2` | named vs named, wildcard/error, type variables, constrained parameters |
//! | `second_try` | `tp1` | wildcard/error, type variables, constrained parameters |
//! | `third_try` | `tp2` | named targets, refinements, `&`, `\|`, methods, universals, by-name, bounds |
//! | `fourth_try` | `tp1` | named sources, singletons, refinements, `&`, `\|` |
//!
//! Each call is a speculative frame: the constraint store is snapshotted on
//! entry and restored on exit unless the call answers `true`. The same holds
//! when a comparison panics, since the restore lives in a `Drop` impl.
//!
//! Below the monitoring threshold the cascade runs directly. At or above it,
//! the comparator records the pairs it is in the middle of comparing and
//! answers `false` to a pair that comes round again, which is what makes
//! cyclic bounds terminate.

use crate::constraint::ConstraintStore;
use crate::intern::TypeInterner;
use crate::options::ComparerOptions;
use crate::recursion::{DepthCounter, DepthMode, RecursionGuard, RecursionProfile};
use crate::types::{BinderId, IntrinsicKind, MethodFlags, ParamRef, SymbolId, TypeData, TypeId};
use std::cell::RefCell;
use tracing::{trace, warn};
use tyrel_common::limits::{STACK_GROWTH_SIZE, STACK_RED_ZONE};

/// Subtype comparator over one [`TypeInterner`].
///
/// Holds the constraint store for the parameters it is inferring. The
/// comparator is single-threaded; create one per checking thread.
pub struct TypeComparer<'a> {
    pub(crate) db: &'a TypeInterner,
    options: ComparerOptions,
    constraint: RefCell<ConstraintStore>,
    depth: RefCell<DepthCounter>,
    pending: RefCell<RecursionGuard<(TypeId, TypeId)>>,
}

impl<'a> TypeComparer<'a> {
    pub fn new(db: &'a TypeInterner) -> Self {
        Self::with_options(db, ComparerOptions::default())
    }

    pub fn with_options(db: &'a TypeInterner, options: ComparerOptions) -> Self {
        let depth = DepthCounter::new(options.monitor_threshold);
        Self {
            db,
            options,
            constraint: RefCell::new(ConstraintStore::new()),
            depth: RefCell::new(depth),
            pending: RefCell::new(RecursionGuard::with_profile(
                RecursionProfile::MonitoredPairs,
            )),
        }
    }

    pub fn interner(&self) -> &'a TypeInterner {
        self.db
    }

    pub fn options(&self) -> &ComparerOptions {
        &self.options
    }

    /// Snapshot of the current constraint store.
    pub fn constraint(&self) -> ConstraintStore {
        self.constraint.borrow().clone()
    }

    pub fn set_constraint(&self, store: ConstraintStore) {
        *self.constraint.borrow_mut() = store;
    }

    /// Nesting depth of the comparison in progress; zero between calls.
    pub fn recursion_depth(&self) -> u32 {
        self.depth.borrow().depth()
    }

    /// How many times comparisons have gone deep enough to be monitored.
    pub fn monitored_crossings(&self) -> u32 {
        self.depth.borrow().crossings()
    }

    pub(crate) fn current_bounds(&self, param: ParamRef) -> Option<(TypeId, TypeId)> {
        let bounds = self.constraint.borrow().bounds_of(param)?;
        self.db.bounds_parts(bounds)
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Whether `tp1` conforms to `tp2`.
    ///
    /// Constraints narrowed along the way are kept when the answer is `true`
    /// and rolled back when it is `false`.
    pub fn is_sub_type(&self, tp1: TypeId, tp2: TypeId) -> bool {
        if !tp1.exists() || !tp2.exists() {
            return false;
        }
        if tp1 == tp2 {
            return true;
        }

        let frame = SubtypeFrame::enter(self);
        trace!(
            depth = frame.depth,
            tp1 = tp1.0,
            tp2 = tp2.0,
            "is_sub_type"
        );
        let result = match frame.mode {
            DepthMode::Direct => grow(|| self.first_try(tp1, tp2)),
            DepthMode::Monitored => self.monitored_is_sub_type(tp1, tp2, frame.crossed),
        };
        frame.finish(result)
    }

    fn monitored_is_sub_type(&self, tp1: TypeId, tp2: TypeId, crossed: bool) -> bool {
        if crossed {
            warn!(
                threshold = self.options.monitor_threshold,
                tp1 = tp1.0,
                tp2 = tp2.0,
                "deep subtype recursion, comparing in monitored mode"
            );
        }
        let Some(_pending) = PendingPair::enter(self, (tp1, tp2)) else {
            trace!(tp1 = tp1.0, tp2 = tp2.0, "re-entrant subtype pair refused");
            return false;
        };
        grow(|| self.first_try(tp1, tp2))
    }

    /// Mutual conformance. `NO_TYPE` is not the same as anything.
    pub fn is_same_type(&self, tp1: TypeId, tp2: TypeId) -> bool {
        if !tp1.exists() || !tp2.exists() {
            return false;
        }
        if tp1 == tp2 {
            return true;
        }
        let saved = self.constraint();
        let same = self.is_sub_type(tp1, tp2) && self.is_sub_type(tp2, tp1);
        if !same {
            self.set_constraint(saved);
        }
        same
    }

    // =========================================================================
    // Tier 1: dispatch on tp2
    // =========================================================================

    fn first_try(&self, tp1: TypeId, tp2: TypeId) -> bool {
        let db = self.db;
        match db.data(tp2) {
            data2 if data2.is_named() => {
                if db.data(tp1).is_named() {
                    self.compare_named(tp1, tp2)
                } else {
                    self.second_try(tp1, tp2)
                }
            }
            TypeData::Intrinsic(IntrinsicKind::Wildcard | IntrinsicKind::Error) => true,
            TypeData::Var(var) => self.is_sub_type(tp1, db.type_var_underlying(var)),
            TypeData::Param(param2) => match self.current_bounds(param2) {
                Some((lo2, _)) => {
                    self.is_sub_type(tp1, lo2)
                        || self.add_constraint(param2, db.lower_bounds(tp1))
                }
                None => self.second_try(tp1, tp2),
            },
            _ => self.second_try(tp1, tp2),
        }
    }

    fn compare_named(&self, tp1: TypeId, tp2: TypeId) -> bool {
        let (Some((pre1, sym1, is_type1)), Some((pre2, sym2, is_type2))) =
            (self.named_parts(tp1), self.named_parts(tp2))
        else {
            return false;
        };
        let db = self.db;
        let symbols = db.symbols();

        if sym1 == sym2 {
            return self.options.erased_types
                || symbols.is_static(sym1)
                || self.is_sub_type(pre1, pre2);
        }

        (is_type1 == is_type2
            && symbols.name(sym1) == symbols.name(sym2)
            && self.is_sub_type(pre1, pre2))
            || (symbols.is_class(sym2) && {
                let base = db.base_type(tp1, sym2);
                base.exists() && base != tp1 && self.is_sub_type(base, tp2)
            })
            || self.third_try_named(tp1, tp2)
    }

    fn named_parts(&self, tp: TypeId) -> Option<(TypeId, SymbolId, bool)> {
        match self.db.data(tp) {
            TypeData::TypeRef { prefix, symbol } => Some((prefix, symbol, true)),
            TypeData::TermRef { prefix, symbol } => Some((prefix, symbol, false)),
            _ => None,
        }
    }

    // =========================================================================
    // Tier 2: dispatch on tp1
    // =========================================================================

    fn second_try(&self, tp1: TypeId, tp2: TypeId) -> bool {
        let db = self.db;
        match db.data(tp1) {
            TypeData::Intrinsic(IntrinsicKind::Wildcard | IntrinsicKind::Error) => true,
            TypeData::Var(var) => self.is_sub_type(db.type_var_underlying(var), tp2),
            TypeData::Param(param1) => match self.current_bounds(param1) {
                Some((_, hi1)) => {
                    self.is_sub_type(hi1, tp2)
                        || self.add_constraint(param1, db.upper_bounds(tp2))
                }
                None => self.third_try(tp1, tp2),
            },
            _ => self.third_try(tp1, tp2),
        }
    }

    // =========================================================================
    // Tier 3: dispatch on tp2
    // =========================================================================

    fn third_try(&self, tp1: TypeId, tp2: TypeId) -> bool {
        let db = self.db;
        match db.data(tp2) {
            data2 if data2.is_named() => self.third_try_named(tp1, tp2),
            TypeData::Refined { parent, name, info } => {
                (self.is_sub_type(tp1, parent)
                    && (name == db.defn().wildcard_name
                        || self.is_sub_type(db.member(tp1, name), info)))
                    || self.fourth_try(tp1, tp2)
            }
            TypeData::And(a, b) => self.is_sub_type(tp1, a) && self.is_sub_type(tp1, b),
            TypeData::Or(a, b) => {
                self.is_sub_type(tp1, a) || self.is_sub_type(tp1, b) || self.fourth_try(tp1, tp2)
            }
            TypeData::Method(b2) => match db.data(tp1) {
                TypeData::Method(b1) => self.compare_methods(tp1, b1, tp2, b2),
                _ => self.fourth_try(tp1, tp2),
            },
            TypeData::Universal(b2) => match db.data(tp1) {
                TypeData::Universal(b1) => self.compare_universals(tp1, b1, tp2, b2),
                _ => self.fourth_try(tp1, tp2),
            },
            TypeData::ByName(res2) => match db.data(tp1) {
                TypeData::ByName(res1) => self.is_sub_type(res1, res2),
                _ => self.fourth_try(tp1, tp2),
            },
            TypeData::Bounds { lo: lo2, hi: hi2 } => match db.data(tp1) {
                TypeData::Bounds { lo: lo1, hi: hi1 } => {
                    self.is_sub_type(lo2, lo1) && self.is_sub_type(hi1, hi2)
                }
                TypeData::ClassInfo { prefix, class } => {
                    let tt = db.type_ref(prefix, class);
                    self.is_sub_type(lo2, tt) && self.is_sub_type(tt, hi2)
                }
                _ => self.fourth_try(tp1, tp2),
            },
            _ => self.fourth_try(tp1, tp2),
        }
    }

    fn third_try_named(&self, tp1: TypeId, tp2: TypeId) -> bool {
        let db = self.db;
        if let Some((lo2, _)) = db.bounds_parts(db.info_of(tp2)) {
            return self.is_sub_type(tp1, lo2) || self.fourth_try(tp1, tp2);
        }
        let defn = db.defn();
        let sym2 = match db.data(tp2) {
            TypeData::TypeRef { symbol, .. } => symbol,
            _ => SymbolId::NONE,
        };
        (sym2 == defn.singleton && db.is_stable(tp1))
            || (sym2 == defn.not_null && db.is_not_null(tp1))
            || (defn.is_hk_trait(sym2) && self.is_sub_type_hk(tp1, tp2))
            || self.fourth_try(tp1, tp2)
    }

    fn compare_methods(&self, tp1: TypeId, b1: BinderId, tp2: TypeId, b2: BinderId) -> bool {
        let db = self.db;
        let (Some(m1), Some(m2)) = (db.binder(b1), db.binder(b2)) else {
            return false;
        };
        let (flags1, flags2) = (m1.method_flags(), m2.method_flags());
        let formals2: Vec<TypeId> = m2
            .param_infos
            .iter()
            .map(|&formal| db.subst_binder(formal, b2, b1))
            .collect();

        db.signature(tp1).matches(&db.signature(tp2))
            && self.matching_params(
                &m1.param_infos,
                &formals2,
                flags1.contains(MethodFlags::FOREIGN),
                flags2.contains(MethodFlags::FOREIGN),
            )
            && flags1.contains(MethodFlags::IMPLICIT) == flags2.contains(MethodFlags::IMPLICIT)
            && self.is_sub_type(m1.result, db.subst_binder(m2.result, b2, b1))
    }

    fn compare_universals(&self, tp1: TypeId, b1: BinderId, tp2: TypeId, b2: BinderId) -> bool {
        let db = self.db;
        let (Some(p1), Some(p2)) = (db.binder(b1), db.binder(b2)) else {
            return false;
        };
        db.signature(tp1).matches(&db.signature(tp2))
            && p1.arity() == p2.arity()
            && p1
                .param_infos
                .iter()
                .zip(p2.param_infos.iter())
                .all(|(&bounds1, &bounds2)| {
                    self.is_same_type(bounds1, db.subst_binder(bounds2, b2, b1))
                })
            && self.is_sub_type(p1.result, db.subst_binder(p2.result, b2, b1))
    }

    // =========================================================================
    // Tier 4: dispatch on tp1
    // =========================================================================

    fn fourth_try(&self, tp1: TypeId, tp2: TypeId) -> bool {
        let db = self.db;
        match db.data(tp1) {
            TypeData::TypeRef { symbol, .. } => {
                let defn = db.defn();
                let symbols = db.symbols();
                symbol == defn.nothing
                    || (symbol == defn.null
                        && db
                            .type_symbol(db.dealias(tp2))
                            .is_some_and(|sym2| db.is_reference_class(sym2)))
                    || (!symbols.is_class(symbol) && self.is_sub_type(db.upper_bound(tp1), tp2))
            }
            data1 if data1.is_singleton() => self.is_sub_type(db.underlying(tp1), tp2),
            TypeData::Refined { parent, .. } => self.is_sub_type(parent, tp2),
            TypeData::And(a, b) => self.is_sub_type(a, tp2) || self.is_sub_type(b, tp2),
            TypeData::Or(a, b) => self.is_sub_type(a, tp2) && self.is_sub_type(b, tp2),
            _ => false,
        }
    }

    // =========================================================================
    // Higher-kinded conformance
    // =========================================================================

    /// Whether the type constructor `tp1` fits the hk trait reference `tp2`.
    ///
    /// Each open type parameter of `tp1`, looked up as a member of an opaque
    /// instance of `tp1`, must have bounds within the corresponding argument
    /// bounds of `tp2`, and the variances must agree position by position.
    pub fn is_sub_type_hk(&self, tp1: TypeId, tp2: TypeId) -> bool {
        let db = self.db;
        let symbols = db.symbols();
        let tparams = db.type_params(tp1);
        let hk_args = db.type_args(tp2);
        if tparams.len() != hk_args.len() {
            return false;
        }

        let base = db.skolem(tp1);
        let bounds_fit = tparams.iter().zip(hk_args.iter()).all(|(&tparam, &arg)| {
            let info = db.member(base, symbols.name(tparam));
            self.is_sub_type(db.as_bounds(info), db.as_bounds(arg))
        });
        if !bounds_fit {
            return false;
        }

        let hk_params = db
            .type_symbol(tp2)
            .map(|sym| symbols.type_params(sym))
            .unwrap_or_default();
        tparams
            .iter()
            .zip(hk_params.iter())
            .all(|(&param1, &param2)| symbols.variance(param1) == symbols.variance(param2))
    }
}

#[inline]
fn grow<T>(f: impl FnOnce() -> T) -> T {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH_SIZE, f)
}

// =============================================================================
// Scope guards
// =============================================================================

/// One `is_sub_type` activation.
///
/// Holds the store snapshot taken on entry and restores it on drop unless the
/// frame finished with `true`; always pops the depth counter.
pub(crate) struct SubtypeFrame<'c, 'a> {
    comparer: &'c TypeComparer<'a>,
    saved: ConstraintStore,
    depth: u32,
    mode: DepthMode,
    crossed: bool,
    committed: bool,
}

impl<'c, 'a> SubtypeFrame<'c, 'a> {
    pub(crate) fn enter(comparer: &'c TypeComparer<'a>) -> Self {
        let saved = comparer.constraint();
        let mut counter = comparer.depth.borrow_mut();
        let mode = counter.enter();
        let depth = counter.depth();
        let crossed = mode == DepthMode::Monitored && counter.just_crossed();
        drop(counter);
        Self {
            comparer,
            saved,
            depth,
            mode,
            crossed,
            committed: false,
        }
    }

    fn finish(mut self, result: bool) -> bool {
        self.committed = result;
        result
    }
}

impl Drop for SubtypeFrame<'_, '_> {
    fn drop(&mut self) {
        self.comparer.depth.borrow_mut().leave();
        if !self.committed {
            let saved = std::mem::take(&mut self.saved);
            *self.comparer.constraint.borrow_mut() = saved;
        }
    }
}

/// Membership of a pair in the monitored in-flight set.
pub(crate) struct PendingPair<'c, 'a> {
    comparer: &'c TypeComparer<'a>,
    key: (TypeId, TypeId),
}

impl<'c, 'a> PendingPair<'c, 'a> {
    pub(crate) fn enter(comparer: &'c TypeComparer<'a>, key: (TypeId, TypeId)) -> Option<Self> {
        if comparer.pending.borrow_mut().enter(key).is_entered() {
            Some(Self { comparer, key })
        } else {
            None
        }
    }
}

impl Drop for PendingPair<'_, '_> {
    fn drop(&mut self) {
        self.comparer.pending.borrow_mut().leave(self.key);
    }
}
