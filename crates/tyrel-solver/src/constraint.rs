//! Persistent constraint store.
//!
//! Maps each tracked universal binder to one bounds slot per parameter. The
//! store is an immutable value: every update builds a new map and shares the
//! untouched slot arrays with the old one, so saving the store before a
//! speculative comparison and restoring it afterwards is a pointer swap.
//!
//! A slot holding `NO_TYPE` marks a parameter that has been replaced by an
//! instantiation and is no longer constrained. A binder whose slots are all
//! `NO_TYPE` is dropped from the map.

use crate::intern::TypeInterner;
use crate::types::{BinderId, ParamRef, TypeId};
use rustc_hash::FxHashMap;
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct ConstraintStore {
    entries: Arc<FxHashMap<BinderId, Arc<[TypeId]>>>,
}

impl ConstraintStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of tracked binders.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, binder: BinderId) -> bool {
        self.entries.contains_key(&binder)
    }

    /// The bounds slots of `binder`, if tracked.
    pub fn entries(&self, binder: BinderId) -> Option<Arc<[TypeId]>> {
        self.entries.get(&binder).cloned()
    }

    /// Current bounds of `param`; `None` when its binder is untracked or the
    /// parameter has been replaced.
    pub fn bounds_of(&self, param: ParamRef) -> Option<TypeId> {
        self.entries
            .get(&param.binder)
            .and_then(|slots| slots.get(param.index as usize).copied())
            .filter(|bounds| bounds.exists())
    }

    /// Whether `param` is in the domain: tracked and not yet replaced.
    pub fn is_constrained(&self, param: ParamRef) -> bool {
        self.bounds_of(param).is_some()
    }

    /// Store with `binder`'s slots set to `slots`.
    pub fn with_updated_entries(&self, binder: BinderId, slots: Arc<[TypeId]>) -> Self {
        let mut map = (*self.entries).clone();
        map.insert(binder, slots);
        Self {
            entries: Arc::new(map),
        }
    }

    /// Store with `binder` tracked, each slot seeded with the declared
    /// bounds of its parameter.
    pub fn add(&self, db: &TypeInterner, binder: BinderId) -> Self {
        debug_assert!(
            !self.contains(binder),
            "binder #{} is already tracked",
            binder.0
        );
        let Some(data) = db.binder(binder) else {
            return self.clone();
        };
        self.with_updated_entries(binder, data.param_infos.iter().copied().collect())
    }

    /// Store with `param`'s slot cleared. The binder goes away once every
    /// slot is cleared.
    pub fn without_param(&self, param: ParamRef) -> Self {
        let Some(slots) = self.entries.get(&param.binder) else {
            return self.clone();
        };
        let index = param.index as usize;
        if index >= slots.len() || !slots[index].exists() {
            return self.clone();
        }
        let mut updated = slots.to_vec();
        updated[index] = TypeId::NO_TYPE;

        let mut map = (*self.entries).clone();
        if updated.iter().all(|slot| !slot.exists()) {
            map.remove(&param.binder);
        } else {
            map.insert(param.binder, updated.into());
        }
        Self {
            entries: Arc::new(map),
        }
    }

    /// Store with `param` removed and every remaining bound rewritten to
    /// mention `replacement` instead of `param`.
    pub fn with_substitution(&self, db: &TypeInterner, param: ParamRef, replacement: TypeId) -> Self {
        let removed = self.without_param(param);
        let mut changed = false;
        let map: FxHashMap<BinderId, Arc<[TypeId]>> = removed
            .entries
            .iter()
            .map(|(&binder, slots)| {
                let rewritten: Vec<TypeId> = slots
                    .iter()
                    .map(|&slot| {
                        if slot.exists() {
                            db.subst_param(slot, param, replacement)
                        } else {
                            slot
                        }
                    })
                    .collect();
                if rewritten[..] == slots[..] {
                    (binder, Arc::clone(slots))
                } else {
                    changed = true;
                    (binder, rewritten.into())
                }
            })
            .collect();
        if changed {
            Self {
                entries: Arc::new(map),
            }
        } else {
            removed
        }
    }

    /// Every constrained parameter, in no particular order.
    pub fn domain(&self) -> impl Iterator<Item = ParamRef> + '_ {
        self.entries.iter().flat_map(|(&binder, slots)| {
            slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.exists())
                .map(move |(index, _)| ParamRef::new(binder, index as u32))
        })
    }

    pub fn binders(&self) -> impl Iterator<Item = BinderId> + '_ {
        self.entries.keys().copied()
    }

    /// Whether both stores are the same snapshot.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }
}
