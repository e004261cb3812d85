//! Parameter inference on top of the comparator.
//!
//! `track` puts a universal binder's parameters under inference. From then
//! on, comparing against one of those parameters narrows its bounds in the
//! constraint store instead of failing. `approximate` picks an
//! instantiation from the narrowed bounds and `replace` substitutes it
//! through the rest of the store.

use crate::comparer::TypeComparer;
use crate::constraint::ConstraintStore;
use crate::types::{ParamRef, TypeAlgebraError, TypeData, TypeId};
use tracing::debug;

impl TypeComparer<'_> {
    /// Start inferring the parameters of the universal type `poly`.
    ///
    /// Returns the universal whose parameters are now tracked: `poly` itself,
    /// or a copy on a fresh binder when `poly`'s binder is already tracked.
    pub fn track(&self, poly: TypeId) -> Result<TypeId, TypeAlgebraError> {
        let db = self.db;
        let TypeData::Universal(binder) = db.data(poly) else {
            return Err(TypeAlgebraError::NotUniversal(poly));
        };
        let store = self.constraint();
        if store.contains(binder) {
            let copy = db.copy_binder(binder);
            debug!(binder = binder.0, copy = copy.0, "binder already tracked, tracking a copy");
            self.set_constraint(store.add(db, copy));
            Ok(db.binder_type(copy))
        } else {
            debug!(binder = binder.0, "tracking binder");
            self.set_constraint(store.add(db, binder));
            Ok(poly)
        }
    }

    /// Narrow the bounds of `param` by `bound` and report whether the
    /// narrowed bounds are still satisfiable (lower conforms to upper).
    ///
    /// Answers `false` without touching the store when `param` is not
    /// constrained.
    pub fn add_constraint(&self, param: ParamRef, bound: TypeId) -> bool {
        let db = self.db;
        let store = self.constraint();
        let Some(slots) = store.entries(param.binder) else {
            return false;
        };
        let index = param.index as usize;
        let Some(&old) = slots.get(index) else {
            return false;
        };
        if !old.exists() {
            return false;
        }

        let narrowed = db.bounds_and(old, bound);
        if narrowed != old {
            debug!(
                binder = param.binder.0,
                index = param.index,
                old = old.0,
                new = narrowed.0,
                "constraint narrowed"
            );
            let mut updated = slots.to_vec();
            updated[index] = narrowed;
            self.set_constraint(store.with_updated_entries(param.binder, updated.into()));
        }
        let Some((lo, hi)) = db.bounds_parts(narrowed) else {
            return false;
        };
        self.is_sub_type(lo, hi)
    }

    /// Instantiate `param` from its current bounds: the lower bound when
    /// `from_below`, the upper bound otherwise, with refinements that
    /// mention `param` itself dropped. The instantiation is substituted
    /// through the store.
    ///
    /// Returns `NO_TYPE` when `param` is not constrained.
    pub fn approximate(&self, param: ParamRef, from_below: bool) -> TypeId {
        let Some((lo, hi)) = self.current_bounds(param) else {
            return TypeId::NO_TYPE;
        };
        let bound = if from_below { lo } else { hi };
        let inst = self.db.drop_refinements_mentioning(bound, param);
        debug!(
            binder = param.binder.0,
            index = param.index,
            from_below,
            inst = inst.0,
            "parameter approximated"
        );
        self.replace(param, inst);
        inst
    }

    /// Remove `param` from the store and substitute `instantiation` for it
    /// in every remaining bound. Returns the new store.
    pub fn replace(&self, param: ParamRef, instantiation: TypeId) -> ConstraintStore {
        let store = self
            .constraint()
            .with_substitution(self.db, param, instantiation);
        debug!(
            binder = param.binder.0,
            index = param.index,
            instantiation = instantiation.0,
            "parameter replaced"
        );
        self.set_constraint(store.clone());
        store
    }
}
