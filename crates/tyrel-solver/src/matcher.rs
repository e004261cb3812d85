//! Member signature matching.
//!
//! Matching is the relation used to decide whether two member types
//! override or clash with each other. It is coarser than conformance:
//! parameter types must be the same, results only need to match again, and
//! a parameterless method matches a by-name type.

use crate::comparer::TypeComparer;
use crate::types::{MethodFlags, TypeData, TypeId};

impl TypeComparer<'_> {
    /// Whether member types `tp1` and `tp2` match. With
    /// `always_match_simple`, two non-method, non-universal types always
    /// match; otherwise they must be the same type.
    pub fn matches_type(&self, tp1: TypeId, tp2: TypeId, always_match_simple: bool) -> bool {
        let db = self.db;
        match db.data(tp1) {
            TypeData::Method(b1) => {
                let Some(m1) = db.binder(b1) else {
                    return false;
                };
                match db.data(tp2) {
                    TypeData::Method(b2) => {
                        let Some(m2) = db.binder(b2) else {
                            return false;
                        };
                        let (flags1, flags2) = (m1.method_flags(), m2.method_flags());
                        let formals2: Vec<TypeId> = m2
                            .param_infos
                            .iter()
                            .map(|&formal| db.subst_binder(formal, b2, b1))
                            .collect();
                        flags1.contains(MethodFlags::IMPLICIT)
                            == flags2.contains(MethodFlags::IMPLICIT)
                            && self.matching_params(
                                &m1.param_infos,
                                &formals2,
                                flags1.contains(MethodFlags::FOREIGN),
                                flags2.contains(MethodFlags::FOREIGN),
                            )
                            && self.matches_type(
                                m1.result,
                                db.subst_binder(m2.result, b2, b1),
                                always_match_simple,
                            )
                    }
                    TypeData::ByName(res2) => {
                        m1.arity() == 0 && self.matches_type(m1.result, res2, always_match_simple)
                    }
                    _ => false,
                }
            }
            TypeData::ByName(res1) => match db.data(tp2) {
                TypeData::Method(b2) => db.binder(b2).is_some_and(|m2| {
                    m2.arity() == 0 && self.matches_type(res1, m2.result, always_match_simple)
                }),
                _ => self.matches_type(res1, tp2, always_match_simple),
            },
            TypeData::Universal(b1) => match db.data(tp2) {
                TypeData::Universal(b2) => {
                    let (Some(p1), Some(p2)) = (db.binder(b1), db.binder(b2)) else {
                        return false;
                    };
                    p1.arity() == p2.arity()
                        && self.matches_type(
                            p1.result,
                            db.subst_binder(p2.result, b2, b1),
                            always_match_simple,
                        )
                }
                _ => false,
            },
            _ => match db.data(tp2) {
                TypeData::Method(_) | TypeData::Universal(_) => false,
                TypeData::ByName(res2) => self.matches_type(tp1, res2, always_match_simple),
                _ => always_match_simple || self.is_same_type(tp1, tp2),
            },
        }
    }

    /// Pairwise sameness of two formal parameter lists.
    ///
    /// When either method comes from a foreign-interop boundary, the root
    /// reference class and the top type are interchangeable.
    pub fn matching_params(
        &self,
        formals1: &[TypeId],
        formals2: &[TypeId],
        foreign1: bool,
        foreign2: bool,
    ) -> bool {
        let foreign = foreign1 || foreign2;
        formals1.len() == formals2.len()
            && formals1
                .iter()
                .zip(formals2)
                .all(|(&f1, &f2)| self.is_same_type(f1, f2) || (foreign && self.is_top_pair(f1, f2)))
    }

    fn is_top_pair(&self, f1: TypeId, f2: TypeId) -> bool {
        let defn = self.db.defn();
        (f1 == defn.object_type && f2 == defn.any_type)
            || (f1 == defn.any_type && f2 == defn.object_type)
    }
}
