//! Built-in classes, marker traits and the higher-kinded traits.
//!
//! ```text
//! Any
//! ├── AnyVal ── Int, Boolean
//! ├── Object ── String, Null, <user classes>
//! ├── Singleton
//! └── NotNull
//! Nothing            (no parents; subtype of everything)
//! Lambda$I, Lambda$P, Lambda$N, Lambda$II, ... Lambda$NN
//! ```
//!
//! A `Lambda$<v..>` trait has one type parameter `$hk<i>` per letter, with
//! variance `I`nvariant, `P`ositive (covariant) or `N`egative
//! (contravariant). Comparing a type constructor against one of them goes
//! through the higher-kinded rule instead of class inheritance.

use crate::def::SymbolFlags;
use crate::intern::TypeInterner;
use crate::types::{SymbolId, TypeId, Variance};
use smallvec::SmallVec;
use tracing::debug;
use tyrel_common::Atom;

/// Largest arity for which hk traits are declared.
pub const MAX_HK_ARITY: usize = 2;

const HK_TRAIT_PREFIX: &str = "Lambda$";

#[derive(Clone, Debug, Default)]
pub struct Definitions {
    pub any: SymbolId,
    pub any_type: TypeId,
    pub any_val: SymbolId,
    pub any_val_type: TypeId,
    pub object: SymbolId,
    pub object_type: TypeId,
    pub null: SymbolId,
    pub null_type: TypeId,
    pub nothing: SymbolId,
    pub nothing_type: TypeId,
    pub int: SymbolId,
    pub int_type: TypeId,
    pub boolean: SymbolId,
    pub boolean_type: TypeId,
    pub string: SymbolId,
    pub string_type: TypeId,
    /// Marker satisfied by every stable path.
    pub singleton: SymbolId,
    pub singleton_type: TypeId,
    /// Marker satisfied by every type that excludes `null`.
    pub not_null: SymbolId,
    pub not_null_type: TypeId,
    /// `_`: a refinement under this name constrains nothing.
    pub wildcard_name: Atom,
    hk_traits: Vec<(SmallVec<[Variance; 2]>, SymbolId)>,
}

impl Definitions {
    /// Declare the built-ins into `db`.
    ///
    /// Runs while `db.defn()` is still the zeroed default, so it only uses
    /// constructors that do not consult the definitions.
    pub(crate) fn bootstrap(db: &TypeInterner) -> Self {
        let builtin = |name: &str| {
            let sym = db.declare_class(SymbolId::NONE, name, SymbolFlags::empty());
            (sym, db.class_ref(sym))
        };

        let (any, any_type) = builtin("Any");
        let (nothing, nothing_type) = builtin("Nothing");
        let (any_val, any_val_type) = builtin("AnyVal");
        let (object, object_type) = builtin("Object");
        let (null, null_type) = builtin("Null");
        let (int, int_type) = builtin("Int");
        let (boolean, boolean_type) = builtin("Boolean");
        let (string, string_type) = builtin("String");
        let (singleton, singleton_type) = builtin("Singleton");
        let (not_null, not_null_type) = builtin("NotNull");

        db.set_parents_unchecked(any_val, &[any_type]);
        db.set_parents_unchecked(object, &[any_type]);
        db.set_parents_unchecked(null, &[object_type]);
        db.set_parents_unchecked(int, &[any_val_type]);
        db.set_parents_unchecked(boolean, &[any_val_type]);
        db.set_parents_unchecked(string, &[object_type]);
        db.set_parents_unchecked(singleton, &[any_type]);
        db.set_parents_unchecked(not_null, &[any_type]);

        let unbounded = db.bounds(nothing_type, any_type);
        let mut hk_traits = Vec::new();
        for arity in 1..=MAX_HK_ARITY {
            for variances in variance_combinations(arity) {
                let name: String = std::iter::once(HK_TRAIT_PREFIX.to_string())
                    .chain(variances.iter().map(|v| variance_letter(*v).to_string()))
                    .collect();
                let sym = db.declare_class(SymbolId::NONE, &name, SymbolFlags::SYNTHETIC);
                db.set_parents_unchecked(sym, &[any_type]);
                for (i, &variance) in variances.iter().enumerate() {
                    let declared =
                        db.declare_type_param(sym, &format!("$hk{i}"), variance, unbounded);
                    debug_assert!(declared.is_ok(), "hk trait parameter: {declared:?}");
                }
                hk_traits.push((variances, sym));
            }
        }
        debug!(hk_traits = hk_traits.len(), "definitions bootstrapped");

        Self {
            any,
            any_type,
            any_val,
            any_val_type,
            object,
            object_type,
            null,
            null_type,
            nothing,
            nothing_type,
            int,
            int_type,
            boolean,
            boolean_type,
            string,
            string_type,
            singleton,
            singleton_type,
            not_null,
            not_null_type,
            wildcard_name: db.intern_string("_"),
            hk_traits,
        }
    }

    pub fn is_hk_trait(&self, sym: SymbolId) -> bool {
        self.hk_traits.iter().any(|(_, s)| *s == sym)
    }

    /// The hk trait whose parameters have exactly these variances.
    pub fn hk_trait(&self, variances: &[Variance]) -> Option<SymbolId> {
        self.hk_traits
            .iter()
            .find(|(v, _)| v.as_slice() == variances)
            .map(|(_, s)| *s)
    }
}

fn variance_letter(variance: Variance) -> char {
    match variance {
        Variance::Invariant => 'I',
        Variance::Covariant => 'P',
        Variance::Contravariant => 'N',
    }
}

fn variance_combinations(arity: usize) -> Vec<SmallVec<[Variance; 2]>> {
    const ALL: [Variance; 3] = [
        Variance::Invariant,
        Variance::Covariant,
        Variance::Contravariant,
    ];
    let mut combos: Vec<SmallVec<[Variance; 2]>> = vec![SmallVec::new()];
    for _ in 0..arity {
        combos = combos
            .into_iter()
            .flat_map(|prefix| {
                ALL.into_iter().map(move |v| {
                    let mut next = prefix.clone();
                    next.push(v);
                    next
                })
            })
            .collect();
    }
    combos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinations_cover_every_variance_string() {
        assert_eq!(variance_combinations(1).len(), 3);
        assert_eq!(variance_combinations(2).len(), 9);
    }
}
