//! Queries and rewrites over interned types.
//!
//! These are the operations the comparator takes as given: dealiasing, the
//! info and upper bound of a named type, member lookup, base types,
//! substitution of binder parameters, stability and nullability, and the
//! erased signature of a method.
//!
//! Walks that follow symbol infos (rather than type structure) run under a
//! [`RecursionGuard`] so that cyclic declarations such as `type A <: B` with
//! `type B <: A` end with "no answer" instead of overflowing.

use crate::def::{Namespace, SymbolFlags, SymbolKind};
use crate::intern::TypeInterner;
use crate::recursion::{RecursionGuard, RecursionProfile};
use crate::types::{BinderId, LiteralValue, ParamRef, SymbolId, TypeData, TypeId};
use smallvec::SmallVec;
use tyrel_common::Atom;

type TraversalGuard = RecursionGuard<TypeId>;

fn traversal_guard() -> TraversalGuard {
    RecursionGuard::with_profile(RecursionProfile::TypeTraversal)
}

/// Erased shape of a member's type, used to tell overloads apart.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    pub params: SmallVec<[Atom; 4]>,
    pub result: Atom,
}

impl Signature {
    /// Same erased parameter list. Results are left to the caller, which
    /// compares them by conformance.
    pub fn matches(&self, other: &Signature) -> bool {
        self.params == other.params
    }
}

impl TypeInterner {
    // =========================================================================
    // Named types
    // =========================================================================

    /// Replace an alias reference by the aliased type; anything else is
    /// returned unchanged.
    pub fn dealias(&self, tp: TypeId) -> TypeId {
        let mut current = tp;
        let mut guard = traversal_guard();
        while let TypeData::TypeRef { symbol, .. } = self.data(current) {
            if !self.symbols().is_alias(symbol) || !guard.enter(current).is_entered() {
                break;
            }
            current = self.symbols().info(symbol);
        }
        guard.reset();
        current
    }

    /// Declared info of a named type: `ClassInfo` for classes, `Bounds` for
    /// abstract types, type parameters and aliases, the declared type for
    /// values. `NO_TYPE` for anything that is not named.
    pub fn info_of(&self, tp: TypeId) -> TypeId {
        match self.data(tp) {
            TypeData::TypeRef { prefix, symbol } => match self.symbols().kind(symbol) {
                Some(SymbolKind::Class) => self.class_info(prefix, symbol),
                Some(SymbolKind::Alias) => self.alias_bounds(self.symbols().info(symbol)),
                Some(SymbolKind::AbstractType | SymbolKind::TypeParam) => {
                    self.symbols().info(symbol)
                }
                _ => TypeId::NO_TYPE,
            },
            TypeData::TermRef { symbol, .. } => self.symbols().info(symbol),
            _ => TypeId::NO_TYPE,
        }
    }

    /// Upper bound of a named type: `hi` of its bounds, or its info when the
    /// info is not a bounds pair.
    pub fn upper_bound(&self, tp: TypeId) -> TypeId {
        let info = self.info_of(tp);
        self.bounds_parts(info).map_or(info, |(_, hi)| hi)
    }

    /// What a singleton or type variable stands for. `NO_TYPE` for other
    /// shapes.
    pub fn underlying(&self, tp: TypeId) -> TypeId {
        let defn = self.defn();
        match self.data(tp) {
            TypeData::TermRef { symbol, .. } => self.symbols().info(symbol),
            TypeData::This(class) => self.class_ref(class),
            TypeData::Constant(LiteralValue::Int(_)) => defn.int_type,
            TypeData::Constant(LiteralValue::Bool(_)) => defn.boolean_type,
            TypeData::Constant(LiteralValue::Str(_)) => defn.string_type,
            TypeData::Skolem { underlying, .. } => underlying,
            TypeData::TermParam(param) => self.param_info(param),
            TypeData::Var(var) => self.type_var_underlying(var),
            _ => TypeId::NO_TYPE,
        }
    }

    /// Lift an info to a bounds pair; a plain type `t` becomes `>: t <: t`.
    pub fn as_bounds(&self, info: TypeId) -> TypeId {
        if !info.exists() || self.bounds_parts(info).is_some() {
            info
        } else {
            self.alias_bounds(info)
        }
    }

    // =========================================================================
    // Members and base types
    // =========================================================================

    /// Info of the member `name` of `tp`, refinements first, then the
    /// declarations of the class and its parents. `NO_TYPE` when absent.
    pub fn member(&self, tp: TypeId, name: Atom) -> TypeId {
        let mut guard = traversal_guard();
        let info = self.member_in(tp, name, &mut guard);
        guard.reset();
        info
    }

    fn member_in(&self, tp: TypeId, name: Atom, guard: &mut TraversalGuard) -> TypeId {
        if !guard.enter(tp).is_entered() {
            return TypeId::NO_TYPE;
        }
        let info = self.member_step(tp, name, guard);
        guard.leave(tp);
        info
    }

    fn member_step(&self, tp: TypeId, name: Atom, guard: &mut TraversalGuard) -> TypeId {
        match self.data(tp) {
            TypeData::TypeRef { symbol, .. } => {
                if self.symbols().is_class(symbol) {
                    self.class_member(symbol, name, guard)
                } else {
                    self.member_in(self.upper_bound(tp), name, guard)
                }
            }
            TypeData::ClassInfo { class, .. } => self.class_member(class, name, guard),
            TypeData::Refined {
                parent,
                name: refined,
                info,
            } => {
                if refined == name {
                    info
                } else {
                    self.member_in(parent, name, guard)
                }
            }
            TypeData::And(a, b) => {
                let info = self.member_in(a, name, guard);
                if info.exists() {
                    info
                } else {
                    self.member_in(b, name, guard)
                }
            }
            TypeData::Or(a, b) => {
                let left = self.member_in(a, name, guard);
                let right = self.member_in(b, name, guard);
                if !left.exists() || !right.exists() {
                    return TypeId::NO_TYPE;
                }
                match (self.bounds_parts(left), self.bounds_parts(right)) {
                    (Some((lo1, hi1)), Some((lo2, hi2))) => {
                        self.bounds(self.and(lo1, lo2), self.or(hi1, hi2))
                    }
                    _ => self.or(left, right),
                }
            }
            TypeData::Param(param) => {
                let hi = self
                    .bounds_parts(self.param_info(param))
                    .map_or(TypeId::NO_TYPE, |(_, hi)| hi);
                self.member_in(hi, name, guard)
            }
            data if data.is_singleton() || matches!(data, TypeData::Var(_)) => {
                self.member_in(self.underlying(tp), name, guard)
            }
            _ => TypeId::NO_TYPE,
        }
    }

    fn class_member(&self, class: SymbolId, name: Atom, guard: &mut TraversalGuard) -> TypeId {
        let symbols = self.symbols();
        if let Some(sym) = symbols.decl(class, name, Namespace::Type) {
            return self.info_of(self.class_ref(sym));
        }
        if let Some(sym) = symbols.decl(class, name, Namespace::Term) {
            return symbols.info(sym);
        }
        for parent in symbols.parents(class) {
            let info = self.member_in(parent, name, guard);
            if info.exists() {
                return info;
            }
        }
        TypeId::NO_TYPE
    }

    /// View of `tp` as an instance of class `cls`, or `NO_TYPE` when `tp`
    /// does not derive from `cls`.
    ///
    /// Refinements of `tp` are kept when `cls` declares the refined name, so
    /// the base type of `IntList extends List { type A = Int }` at `List` is
    /// `List { type A = Int }`.
    pub fn base_type(&self, tp: TypeId, cls: SymbolId) -> TypeId {
        let mut guard = traversal_guard();
        let base = self.base_type_in(tp, cls, &mut guard);
        guard.reset();
        base
    }

    fn base_type_in(&self, tp: TypeId, cls: SymbolId, guard: &mut TraversalGuard) -> TypeId {
        if !guard.enter(tp).is_entered() {
            return TypeId::NO_TYPE;
        }
        let base = self.base_type_step(tp, cls, guard);
        guard.leave(tp);
        base
    }

    fn base_type_step(&self, tp: TypeId, cls: SymbolId, guard: &mut TraversalGuard) -> TypeId {
        match self.data(tp) {
            TypeData::TypeRef { symbol, .. } => {
                if symbol == cls {
                    tp
                } else if self.symbols().is_class(symbol) {
                    for parent in self.symbols().parents(symbol) {
                        let base = self.base_type_in(parent, cls, guard);
                        if base.exists() {
                            return base;
                        }
                    }
                    TypeId::NO_TYPE
                } else {
                    self.base_type_in(self.upper_bound(tp), cls, guard)
                }
            }
            TypeData::ClassInfo { prefix, class } => {
                self.base_type_in(self.type_ref(prefix, class), cls, guard)
            }
            TypeData::Refined { parent, name, info } => {
                let base = self.base_type_in(parent, cls, guard);
                if base.exists() && self.declares_type(cls, name) {
                    self.refined(base, name, info)
                } else {
                    base
                }
            }
            TypeData::And(a, b) => {
                let left = self.base_type_in(a, cls, guard);
                let right = self.base_type_in(b, cls, guard);
                match (left.exists(), right.exists()) {
                    (true, true) => self.and(left, right),
                    (true, false) => left,
                    (false, true) => right,
                    (false, false) => TypeId::NO_TYPE,
                }
            }
            TypeData::Or(a, b) => {
                let left = self.base_type_in(a, cls, guard);
                let right = self.base_type_in(b, cls, guard);
                if left.exists() && right.exists() {
                    self.or(left, right)
                } else {
                    TypeId::NO_TYPE
                }
            }
            TypeData::Param(param) => {
                let hi = self
                    .bounds_parts(self.param_info(param))
                    .map_or(TypeId::NO_TYPE, |(_, hi)| hi);
                self.base_type_in(hi, cls, guard)
            }
            data if data.is_singleton() || matches!(data, TypeData::Var(_)) => {
                self.base_type_in(self.underlying(tp), cls, guard)
            }
            _ => TypeId::NO_TYPE,
        }
    }

    /// Whether class `cls` is `base` or inherits from it.
    pub fn derives_from(&self, cls: SymbolId, base: SymbolId) -> bool {
        self.symbols().is_class(cls)
            && (cls == base || self.base_type(self.class_ref(cls), base).exists())
    }

    /// Symbol naming the type constructor of `tp`, looking through aliases
    /// and refinements.
    pub fn type_symbol(&self, tp: TypeId) -> Option<SymbolId> {
        let mut current = tp;
        let mut guard = traversal_guard();
        let found = loop {
            if !guard.enter(current).is_entered() {
                break None;
            }
            match self.data(current) {
                TypeData::TypeRef { symbol, .. } if self.symbols().is_alias(symbol) => {
                    current = self.symbols().info(symbol);
                }
                TypeData::TypeRef { symbol, .. } => break Some(symbol),
                TypeData::ClassInfo { class, .. } => break Some(class),
                TypeData::Refined { parent, .. } => current = parent,
                _ => break None,
            }
        };
        guard.reset();
        found
    }

    /// Type parameters of `tp` that are still open: the class's parameters
    /// minus the ones a refinement has fixed.
    pub fn type_params(&self, tp: TypeId) -> SmallVec<[SymbolId; 4]> {
        let Some(sym) = self.type_symbol(tp) else {
            return SmallVec::new();
        };
        let symbols = self.symbols();
        symbols
            .type_params(sym)
            .into_iter()
            .filter(|&tparam| self.refinement_of(tp, symbols.name(tparam)).is_none())
            .collect()
    }

    /// Arguments of `tp` for each type parameter of its type symbol: the
    /// refinement when there is one, the declared bounds otherwise.
    pub fn type_args(&self, tp: TypeId) -> SmallVec<[TypeId; 4]> {
        let Some(sym) = self.type_symbol(tp) else {
            return SmallVec::new();
        };
        let symbols = self.symbols();
        symbols
            .type_params(sym)
            .into_iter()
            .map(|tparam| {
                self.refinement_of(tp, symbols.name(tparam))
                    .unwrap_or_else(|| symbols.info(tparam))
            })
            .collect()
    }

    fn refinement_of(&self, tp: TypeId, name: Atom) -> Option<TypeId> {
        let mut current = tp;
        loop {
            match self.data(current) {
                TypeData::Refined {
                    parent,
                    name: refined,
                    info,
                } => {
                    if refined == name {
                        return Some(info);
                    }
                    current = parent;
                }
                TypeData::TypeRef { symbol, .. } if self.symbols().is_alias(symbol) => {
                    let next = self.symbols().info(symbol);
                    if next == current {
                        return None;
                    }
                    current = next;
                }
                _ => return None,
            }
        }
    }

    // =========================================================================
    // Substitution
    // =========================================================================

    /// Rebuild `tp` with `f` applied to each direct child. Returns `tp`
    /// itself when no child changed. Binder types are rebuilt on a fresh
    /// binder.
    pub(crate) fn map_children(&self, tp: TypeId, f: &mut dyn FnMut(TypeId) -> TypeId) -> TypeId {
        match self.data(tp) {
            TypeData::TypeRef { prefix, symbol } => {
                let mapped = f(prefix);
                if mapped == prefix {
                    tp
                } else {
                    self.type_ref(mapped, symbol)
                }
            }
            TypeData::TermRef { prefix, symbol } => {
                let mapped = f(prefix);
                if mapped == prefix {
                    tp
                } else {
                    self.term_ref(mapped, symbol)
                }
            }
            TypeData::ClassInfo { prefix, class } => {
                let mapped = f(prefix);
                if mapped == prefix {
                    tp
                } else {
                    self.class_info(mapped, class)
                }
            }
            TypeData::Refined { parent, name, info } => {
                let (p, i) = (f(parent), f(info));
                if p == parent && i == info {
                    tp
                } else {
                    self.refined(p, name, i)
                }
            }
            TypeData::And(a, b) => {
                let (x, y) = (f(a), f(b));
                if x == a && y == b { tp } else { self.and(x, y) }
            }
            TypeData::Or(a, b) => {
                let (x, y) = (f(a), f(b));
                if x == a && y == b { tp } else { self.or(x, y) }
            }
            TypeData::ByName(result) => {
                let mapped = f(result);
                if mapped == result {
                    tp
                } else {
                    self.by_name(mapped)
                }
            }
            TypeData::Bounds { lo, hi } => {
                let (l, h) = (f(lo), f(hi));
                if l == lo && h == hi { tp } else { self.bounds(l, h) }
            }
            TypeData::Method(binder) | TypeData::Universal(binder) => {
                let Some(data) = self.binder(binder) else {
                    return tp;
                };
                let infos: SmallVec<[TypeId; 4]> =
                    data.param_infos.iter().map(|&info| f(info)).collect();
                let result = f(data.result);
                if infos == data.param_infos && result == data.result {
                    return tp;
                }
                let fresh = self.alloc_binder(data.kind, &data.param_names);
                let infos = infos
                    .into_iter()
                    .map(|info| self.subst_binder(info, binder, fresh))
                    .collect();
                let result = self.subst_binder(result, binder, fresh);
                self.fill_binder(fresh, infos, result);
                self.binder_type(fresh)
            }
            TypeData::Intrinsic(_)
            | TypeData::This(_)
            | TypeData::Constant(_)
            | TypeData::Skolem { .. }
            | TypeData::Var(_)
            | TypeData::Param(_)
            | TypeData::TermParam(_) => tp,
        }
    }

    fn children(&self, tp: TypeId) -> SmallVec<[TypeId; 4]> {
        let mut out = SmallVec::new();
        match self.data(tp) {
            TypeData::TypeRef { prefix, .. }
            | TypeData::TermRef { prefix, .. }
            | TypeData::ClassInfo { prefix, .. } => out.push(prefix),
            TypeData::Refined { parent, info, .. } => out.extend([parent, info]),
            TypeData::And(a, b) | TypeData::Or(a, b) => out.extend([a, b]),
            TypeData::ByName(result) => out.push(result),
            TypeData::Bounds { lo, hi } => out.extend([lo, hi]),
            TypeData::Method(binder) | TypeData::Universal(binder) => {
                if let Some(data) = self.binder(binder) {
                    out.extend(data.param_infos.iter().copied());
                    out.push(data.result);
                }
            }
            _ => {}
        }
        out
    }

    /// Replace every reference to a parameter of `from` by the parameter at
    /// the same index of `to`.
    pub fn subst_binder(&self, tp: TypeId, from: BinderId, to: BinderId) -> TypeId {
        if from == to {
            return tp;
        }
        match self.data(tp) {
            TypeData::Param(param) | TypeData::TermParam(param) if param.binder == from => {
                self.param_type(ParamRef::new(to, param.index))
            }
            _ => self.map_children(tp, &mut |child| self.subst_binder(child, from, to)),
        }
    }

    /// Replace every reference to `param` by `replacement`.
    pub fn subst_param(&self, tp: TypeId, param: ParamRef, replacement: TypeId) -> TypeId {
        match self.data(tp) {
            TypeData::Param(p) if p == param => replacement,
            _ => self.map_children(tp, &mut |child| self.subst_param(child, param, replacement)),
        }
    }

    pub fn mentions_param(&self, tp: TypeId, param: ParamRef) -> bool {
        match self.data(tp) {
            TypeData::Param(p) => p == param,
            _ => self
                .children(tp)
                .into_iter()
                .any(|child| self.mentions_param(child, param)),
        }
    }

    /// Remove every refinement whose info mentions `param`, keeping its
    /// parent. `Comparable { type T = X }` becomes `Comparable` for `X`.
    pub fn drop_refinements_mentioning(&self, tp: TypeId, param: ParamRef) -> TypeId {
        match self.data(tp) {
            TypeData::Refined { parent, info, .. } if self.mentions_param(info, param) => {
                self.drop_refinements_mentioning(parent, param)
            }
            _ => self.map_children(tp, &mut |child| {
                self.drop_refinements_mentioning(child, param)
            }),
        }
    }

    // =========================================================================
    // Predicates
    // =========================================================================

    /// Stable paths: singleton types (except mutable values) and
    /// intersections with a stable operand.
    pub fn is_stable(&self, tp: TypeId) -> bool {
        match self.data(tp) {
            TypeData::TermRef { symbol, .. } => {
                !self.symbols().flags(symbol).contains(SymbolFlags::MUTABLE)
            }
            TypeData::This(_)
            | TypeData::Constant(_)
            | TypeData::Skolem { .. }
            | TypeData::TermParam(_) => true,
            TypeData::And(a, b) => self.is_stable(a) || self.is_stable(b),
            TypeData::Var(var) => self
                .type_var_instance(var)
                .is_some_and(|inst| self.is_stable(inst)),
            _ => false,
        }
    }

    /// Types whose values are never `null`.
    pub fn is_not_null(&self, tp: TypeId) -> bool {
        let mut guard = traversal_guard();
        let result = self.is_not_null_in(tp, &mut guard);
        guard.reset();
        result
    }

    fn is_not_null_in(&self, tp: TypeId, guard: &mut TraversalGuard) -> bool {
        if !guard.enter(tp).is_entered() {
            return false;
        }
        let defn = self.defn();
        let result = match self.data(tp) {
            TypeData::Constant(_) | TypeData::This(_) => true,
            TypeData::TypeRef { symbol, .. } if self.symbols().is_class(symbol) => {
                symbol == defn.not_null
                    || symbol == defn.nothing
                    || self.derives_from(symbol, defn.any_val)
                    || self.derives_from(symbol, defn.not_null)
            }
            TypeData::TypeRef { .. } => self.is_not_null_in(self.upper_bound(tp), guard),
            TypeData::Refined { parent, .. } => self.is_not_null_in(parent, guard),
            TypeData::And(a, b) => {
                self.is_not_null_in(a, guard) || self.is_not_null_in(b, guard)
            }
            TypeData::Or(a, b) => {
                self.is_not_null_in(a, guard) && self.is_not_null_in(b, guard)
            }
            data if data.is_singleton() || matches!(data, TypeData::Var(_)) => {
                self.is_not_null_in(self.underlying(tp), guard)
            }
            _ => false,
        };
        guard.leave(tp);
        result
    }

    /// Classes whose instances may be `null`: classes under the root
    /// reference class, excluding the bottom class and value classes.
    pub fn is_reference_class(&self, sym: SymbolId) -> bool {
        let defn = self.defn();
        self.symbols().is_class(sym)
            && sym != defn.nothing
            && !self.derives_from(sym, defn.any_val)
            && self.derives_from(sym, defn.object)
    }

    // =========================================================================
    // Erasure
    // =========================================================================

    /// Erased signature of a member type. Method signatures list the erased
    /// class name of each formal; other types only have a result.
    pub fn signature(&self, tp: TypeId) -> Signature {
        match self.data(tp) {
            TypeData::Method(binder) => {
                let Some(data) = self.binder(binder) else {
                    return Signature {
                        params: SmallVec::new(),
                        result: Atom::NONE,
                    };
                };
                Signature {
                    params: data
                        .param_infos
                        .iter()
                        .map(|&formal| self.erased_name(formal))
                        .collect(),
                    result: self.erased_name(data.result),
                }
            }
            TypeData::Universal(binder) => match self.binder(binder) {
                Some(data) => self.signature(data.result),
                None => Signature {
                    params: SmallVec::new(),
                    result: Atom::NONE,
                },
            },
            _ => Signature {
                params: SmallVec::new(),
                result: self.erased_name(tp),
            },
        }
    }

    /// Name of the class `tp` erases to. The top type erases to the root
    /// reference class.
    pub fn erased_name(&self, tp: TypeId) -> Atom {
        let mut guard = traversal_guard();
        let name = self.erased_name_in(tp, &mut guard);
        guard.reset();
        name
    }

    fn erased_name_in(&self, tp: TypeId, guard: &mut TraversalGuard) -> Atom {
        if !guard.enter(tp).is_entered() {
            return Atom::NONE;
        }
        let defn = self.defn();
        let name = match self.data(tp) {
            TypeData::TypeRef { symbol, .. } if symbol == defn.any => {
                self.symbols().name(defn.object)
            }
            TypeData::TypeRef { symbol, .. } if self.symbols().is_class(symbol) => {
                self.symbols().name(symbol)
            }
            TypeData::TypeRef { .. } => self.erased_name_in(self.upper_bound(tp), guard),
            TypeData::ClassInfo { class, .. } => self.symbols().name(class),
            TypeData::Refined { parent, .. } => self.erased_name_in(parent, guard),
            TypeData::And(a, _) => self.erased_name_in(a, guard),
            TypeData::Or(..) => self.symbols().name(defn.object),
            TypeData::ByName(result) => self.erased_name_in(result, guard),
            TypeData::Param(param) => {
                let hi = self
                    .bounds_parts(self.param_info(param))
                    .map_or(TypeId::NO_TYPE, |(_, hi)| hi);
                self.erased_name_in(hi, guard)
            }
            TypeData::Method(binder) | TypeData::Universal(binder) => match self.binder(binder) {
                Some(data) => self.erased_name_in(data.result, guard),
                None => Atom::NONE,
            },
            data if data.is_singleton() || matches!(data, TypeData::Var(_)) => {
                self.erased_name_in(self.underlying(tp), guard)
            }
            _ => Atom::NONE,
        };
        guard.leave(tp);
        name
    }
}
