//! Type interning and the binder arena.
//!
//! Every type is hash-consed into a single table, so structural equality of
//! non-binder types is handle equality. Universal and method types are
//! identified by their binder instead: two `Universal` types built from the
//! same parameter list are still distinct binders, and the constraint store
//! keys on that identity.
//!
//! Binders are built in two steps. The arena first hands out the binder and
//! the parameter references that point into it, then a caller-supplied closure
//! computes the parameter infos and the result type from those references.
//! That is what lets a bound mention its own parameter (`X <: Comparable[X]`).

use crate::def::{Namespace, SymbolData, SymbolFlags, SymbolKind, SymbolTable};
use crate::definitions::Definitions;
use crate::types::{
    BinderData, BinderId, BinderKind, IntrinsicKind, LiteralValue, MethodFlags, ParamRef,
    SkolemId, SymbolId, TypeAlgebraError, TypeData, TypeId, TypeVarId, Variance,
};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, trace};
use tyrel_common::{Atom, ShardedInterner};

#[derive(Default)]
struct TypeTable {
    key_to_id: FxHashMap<TypeData, TypeId>,
    id_to_key: Vec<TypeData>,
}

#[derive(Copy, Clone, Debug)]
struct TypeVarData {
    origin: TypeId,
    inst: Option<TypeId>,
}

/// Owner of every type, binder, type variable and symbol.
pub struct TypeInterner {
    strings: ShardedInterner,
    types: RwLock<TypeTable>,
    binders: RwLock<Vec<Arc<BinderData>>>,
    type_vars: RwLock<Vec<TypeVarData>>,
    next_skolem: AtomicU32,
    symbols: SymbolTable,
    defn: Definitions,
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeInterner {
    /// Create an interner with the intrinsics registered and the built-in
    /// classes, markers and hk traits declared.
    pub fn new() -> Self {
        let strings = ShardedInterner::new();
        strings.intern_common();

        let mut table = TypeTable::default();
        for kind in [
            IntrinsicKind::NoType,
            IntrinsicKind::NoPrefix,
            IntrinsicKind::Wildcard,
            IntrinsicKind::Error,
        ] {
            let key = TypeData::Intrinsic(kind);
            let id = TypeId(table.id_to_key.len() as u32);
            table.id_to_key.push(key);
            table.key_to_id.insert(key, id);
        }
        debug_assert_eq!(table.id_to_key.len() as u32, TypeId::FIRST_USER);

        let mut interner = Self {
            strings,
            types: RwLock::new(table),
            binders: RwLock::new(Vec::new()),
            type_vars: RwLock::new(Vec::new()),
            next_skolem: AtomicU32::new(0),
            symbols: SymbolTable::new(),
            defn: Definitions::default(),
        };
        interner.defn = Definitions::bootstrap(&interner);
        interner
    }

    // =========================================================================
    // Names and symbols
    // =========================================================================

    pub fn intern_string(&self, s: &str) -> Atom {
        self.strings.intern(s)
    }

    pub fn resolve_atom(&self, atom: Atom) -> String {
        self.strings.resolve(atom).to_string()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Built-in classes and markers.
    pub fn defn(&self) -> &Definitions {
        &self.defn
    }

    /// Declare a class. Parents default to the root reference class until
    /// [`set_parents`](Self::set_parents) says otherwise.
    pub fn declare_class(&self, owner: SymbolId, name: &str, flags: SymbolFlags) -> SymbolId {
        let mut flags = flags;
        if owner == SymbolId::NONE {
            flags |= SymbolFlags::STATIC;
        }
        let data = SymbolData::new(SymbolKind::Class, self.intern_string(name), owner)
            .with_flags(flags);
        let class = self.symbols.register(data);
        if self.defn.object != SymbolId::NONE {
            self.symbols
                .set_parents(class, SmallVec::from_elem(self.defn.object_type, 1));
        }
        class
    }

    /// Declare a type parameter of `class` with the given bounds.
    pub fn declare_type_param(
        &self,
        class: SymbolId,
        name: &str,
        variance: Variance,
        bounds: TypeId,
    ) -> Result<SymbolId, TypeAlgebraError> {
        if !self.symbols.is_class(class) {
            return Err(TypeAlgebraError::BadSymbol(class));
        }
        self.expect_bounds(bounds)?;
        let data = SymbolData::new(SymbolKind::TypeParam, self.intern_string(name), class)
            .with_info(bounds)
            .with_variance(variance);
        Ok(self.symbols.register(data))
    }

    /// Declare an abstract type member (or a top-level abstract type when
    /// `owner` is `SymbolId::NONE`).
    pub fn declare_abstract_type(
        &self,
        owner: SymbolId,
        name: &str,
        bounds: TypeId,
    ) -> Result<SymbolId, TypeAlgebraError> {
        self.expect_owner(owner)?;
        self.expect_bounds(bounds)?;
        let mut data = SymbolData::new(SymbolKind::AbstractType, self.intern_string(name), owner)
            .with_info(bounds);
        if owner == SymbolId::NONE {
            data = data.with_flags(SymbolFlags::STATIC);
        }
        Ok(self.symbols.register(data))
    }

    pub fn declare_alias(
        &self,
        owner: SymbolId,
        name: &str,
        aliased: TypeId,
    ) -> Result<SymbolId, TypeAlgebraError> {
        self.expect_owner(owner)?;
        let mut data =
            SymbolData::new(SymbolKind::Alias, self.intern_string(name), owner).with_info(aliased);
        if owner == SymbolId::NONE {
            data = data.with_flags(SymbolFlags::STATIC);
        }
        Ok(self.symbols.register(data))
    }

    pub fn declare_val(
        &self,
        owner: SymbolId,
        name: &str,
        tpe: TypeId,
        flags: SymbolFlags,
    ) -> Result<SymbolId, TypeAlgebraError> {
        self.expect_owner(owner)?;
        let mut flags = flags;
        if owner == SymbolId::NONE {
            flags |= SymbolFlags::STATIC;
        }
        let data = SymbolData::new(SymbolKind::Val, self.intern_string(name), owner)
            .with_info(tpe)
            .with_flags(flags);
        Ok(self.symbols.register(data))
    }

    /// Replace the parents of `class`. An empty list means the root reference
    /// class. Parents that would make `class` inherit from itself are rejected.
    pub fn set_parents(&self, class: SymbolId, parents: &[TypeId]) -> Result<(), TypeAlgebraError> {
        if !self.symbols.is_class(class) {
            return Err(TypeAlgebraError::BadSymbol(class));
        }
        let mut list: SmallVec<[TypeId; 4]> = parents.iter().copied().collect();
        if list.is_empty() && class != self.defn.any && class != self.defn.nothing {
            list.push(self.defn.object_type);
        }
        for &parent in &list {
            if self.base_type(parent, class).exists() {
                return Err(TypeAlgebraError::CyclicInheritance(class));
            }
        }
        self.symbols.set_parents(class, list);
        Ok(())
    }

    pub(crate) fn set_parents_unchecked(&self, class: SymbolId, parents: &[TypeId]) {
        self.symbols
            .set_parents(class, parents.iter().copied().collect());
    }

    fn expect_owner(&self, owner: SymbolId) -> Result<(), TypeAlgebraError> {
        if owner == SymbolId::NONE || self.symbols.is_class(owner) {
            Ok(())
        } else {
            Err(TypeAlgebraError::BadSymbol(owner))
        }
    }

    fn expect_bounds(&self, tp: TypeId) -> Result<(), TypeAlgebraError> {
        match self.bounds_parts(tp) {
            Some(_) => Ok(()),
            None => Err(TypeAlgebraError::NotBounds(tp)),
        }
    }

    // =========================================================================
    // Interning
    // =========================================================================

    pub fn lookup(&self, id: TypeId) -> Option<TypeData> {
        let table = self.types.read().unwrap_or_else(PoisonError::into_inner);
        table.id_to_key.get(id.0 as usize).copied()
    }

    /// Like [`lookup`](Self::lookup), with unknown handles reading as `NoType`.
    #[inline]
    pub fn data(&self, id: TypeId) -> TypeData {
        self.lookup(id)
            .unwrap_or(TypeData::Intrinsic(IntrinsicKind::NoType))
    }

    /// Number of interned types, intrinsics included.
    pub fn len(&self) -> usize {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .id_to_key
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn intern(&self, key: TypeData) -> TypeId {
        {
            let table = self.types.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&id) = table.key_to_id.get(&key) {
                return id;
            }
        }
        let mut table = self.types.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(&id) = table.key_to_id.get(&key) {
            return id;
        }
        let id = TypeId(table.id_to_key.len() as u32);
        table.id_to_key.push(key);
        table.key_to_id.insert(key, id);
        trace!(type_id = id.0, key = ?key, "TypeInterner::intern");
        id
    }

    // =========================================================================
    // Named and singleton types
    // =========================================================================

    pub fn type_ref(&self, prefix: TypeId, symbol: SymbolId) -> TypeId {
        self.intern(TypeData::TypeRef { prefix, symbol })
    }

    /// Reference to a statically reachable class or type.
    pub fn class_ref(&self, symbol: SymbolId) -> TypeId {
        self.type_ref(TypeId::NO_PREFIX, symbol)
    }

    pub fn term_ref(&self, prefix: TypeId, symbol: SymbolId) -> TypeId {
        self.intern(TypeData::TermRef { prefix, symbol })
    }

    pub fn this_type(&self, class: SymbolId) -> TypeId {
        self.intern(TypeData::This(class))
    }

    pub fn constant(&self, value: LiteralValue) -> TypeId {
        self.intern(TypeData::Constant(value))
    }

    pub fn literal_int(&self, value: i64) -> TypeId {
        self.constant(LiteralValue::Int(value))
    }

    pub fn literal_bool(&self, value: bool) -> TypeId {
        self.constant(LiteralValue::Bool(value))
    }

    pub fn literal_string(&self, value: &str) -> TypeId {
        self.constant(LiteralValue::Str(self.intern_string(value)))
    }

    /// A fresh opaque stand-in for some value of type `underlying`.
    pub fn skolem(&self, underlying: TypeId) -> TypeId {
        let id = SkolemId(self.next_skolem.fetch_add(1, Ordering::SeqCst));
        self.intern(TypeData::Skolem { id, underlying })
    }

    // =========================================================================
    // Compound types
    // =========================================================================

    pub fn refined(&self, parent: TypeId, name: Atom, info: TypeId) -> TypeId {
        self.intern(TypeData::Refined { parent, name, info })
    }

    /// Intersection. Identical operands collapse, the top type is the unit
    /// and the bottom type absorbs.
    pub fn and(&self, a: TypeId, b: TypeId) -> TypeId {
        if a == b {
            return a;
        }
        if a == self.defn.any_type {
            return b;
        }
        if b == self.defn.any_type {
            return a;
        }
        if a == self.defn.nothing_type || b == self.defn.nothing_type {
            return self.defn.nothing_type;
        }
        self.intern(TypeData::And(a, b))
    }

    /// Union. Identical operands collapse, the bottom type is the unit and
    /// the top type absorbs.
    pub fn or(&self, a: TypeId, b: TypeId) -> TypeId {
        if a == b {
            return a;
        }
        if a == self.defn.nothing_type {
            return b;
        }
        if b == self.defn.nothing_type {
            return a;
        }
        if a == self.defn.any_type || b == self.defn.any_type {
            return self.defn.any_type;
        }
        self.intern(TypeData::Or(a, b))
    }

    pub fn by_name(&self, result: TypeId) -> TypeId {
        self.intern(TypeData::ByName(result))
    }

    pub fn bounds(&self, lo: TypeId, hi: TypeId) -> TypeId {
        self.intern(TypeData::Bounds { lo, hi })
    }

    /// `>: tp <: tp`, the bounds of an alias.
    pub fn alias_bounds(&self, tp: TypeId) -> TypeId {
        self.bounds(tp, tp)
    }

    /// `>: lo <: Any`.
    pub fn lower_bounds(&self, lo: TypeId) -> TypeId {
        self.bounds(lo, self.defn.any_type)
    }

    /// `>: Nothing <: hi`.
    pub fn upper_bounds(&self, hi: TypeId) -> TypeId {
        self.bounds(self.defn.nothing_type, hi)
    }

    /// `>: Nothing <: Any`.
    pub fn unbounded(&self) -> TypeId {
        self.bounds(self.defn.nothing_type, self.defn.any_type)
    }

    pub fn bounds_parts(&self, tp: TypeId) -> Option<(TypeId, TypeId)> {
        match self.lookup(tp)? {
            TypeData::Bounds { lo, hi } => Some((lo, hi)),
            _ => None,
        }
    }

    /// Meet of two bounds: the union of the lower bounds and the
    /// intersection of the upper bounds.
    pub fn bounds_and(&self, a: TypeId, b: TypeId) -> TypeId {
        let (lo1, hi1) = self.bounds_parts(self.as_bounds(a)).unwrap_or((a, a));
        let (lo2, hi2) = self.bounds_parts(self.as_bounds(b)).unwrap_or((b, b));
        self.bounds(self.or(lo1, lo2), self.and(hi1, hi2))
    }

    pub fn class_info(&self, prefix: TypeId, class: SymbolId) -> TypeId {
        self.intern(TypeData::ClassInfo { prefix, class })
    }

    // =========================================================================
    // Type variables
    // =========================================================================

    /// Fresh inference cell standing for the universal parameter `origin`.
    pub fn type_var(&self, origin: TypeId) -> Result<TypeId, TypeAlgebraError> {
        if !matches!(self.lookup(origin), Some(TypeData::Param(_))) {
            return Err(TypeAlgebraError::NotParam(origin));
        }
        let mut vars = self.type_vars.write().unwrap_or_else(PoisonError::into_inner);
        let var = TypeVarId(vars.len() as u32);
        vars.push(TypeVarData { origin, inst: None });
        drop(vars);
        Ok(self.intern(TypeData::Var(var)))
    }

    /// Settle a type variable. A variable is settled at most once.
    pub fn instantiate(&self, var: TypeId, inst: TypeId) -> Result<(), TypeAlgebraError> {
        let Some(TypeData::Var(id)) = self.lookup(var) else {
            return Err(TypeAlgebraError::NotTypeVar(var));
        };
        let mut vars = self.type_vars.write().unwrap_or_else(PoisonError::into_inner);
        let Some(slot) = vars.get_mut(id.0 as usize) else {
            return Err(TypeAlgebraError::NotTypeVar(var));
        };
        if slot.inst.is_some() {
            return Err(TypeAlgebraError::AlreadyInstantiated(id));
        }
        slot.inst = Some(inst);
        debug!(var = id.0, inst = inst.0, "type variable instantiated");
        Ok(())
    }

    pub fn type_var_instance(&self, var: TypeVarId) -> Option<TypeId> {
        let vars = self.type_vars.read().unwrap_or_else(PoisonError::into_inner);
        vars.get(var.0 as usize).and_then(|v| v.inst)
    }

    pub fn type_var_origin(&self, var: TypeVarId) -> TypeId {
        let vars = self.type_vars.read().unwrap_or_else(PoisonError::into_inner);
        vars.get(var.0 as usize)
            .map_or(TypeId::NO_TYPE, |v| v.origin)
    }

    /// The instantiation once settled, otherwise the origin parameter.
    pub fn type_var_underlying(&self, var: TypeVarId) -> TypeId {
        self.type_var_instance(var)
            .unwrap_or_else(|| self.type_var_origin(var))
    }

    // =========================================================================
    // Binders
    // =========================================================================

    pub fn binder(&self, id: BinderId) -> Option<Arc<BinderData>> {
        let binders = self.binders.read().unwrap_or_else(PoisonError::into_inner);
        binders.get(id.0 as usize).cloned()
    }

    /// Binder of a universal or method type.
    pub fn binder_of(&self, tp: TypeId) -> Option<BinderId> {
        match self.lookup(tp)? {
            TypeData::Universal(b) | TypeData::Method(b) => Some(b),
            _ => None,
        }
    }

    pub fn binder_count(&self) -> usize {
        self.binders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn alloc_binder(&self, kind: BinderKind, names: &[Atom]) -> BinderId {
        let mut binders = self.binders.write().unwrap_or_else(PoisonError::into_inner);
        let id = BinderId(binders.len() as u32);
        binders.push(Arc::new(BinderData {
            kind,
            param_names: names.iter().copied().collect(),
            param_infos: SmallVec::new(),
            result: TypeId::NO_TYPE,
        }));
        id
    }

    pub(crate) fn fill_binder(&self, id: BinderId, infos: SmallVec<[TypeId; 4]>, result: TypeId) {
        let mut binders = self.binders.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = binders.get_mut(id.0 as usize) {
            let mut data = (**slot).clone();
            data.param_infos = infos;
            data.result = result;
            *slot = Arc::new(data);
        }
    }

    pub(crate) fn binder_type(&self, id: BinderId) -> TypeId {
        match self.binder(id).map(|b| b.kind) {
            Some(BinderKind::Method(_)) => self.intern(TypeData::Method(id)),
            _ => self.intern(TypeData::Universal(id)),
        }
    }

    /// Parameter reference without range checking.
    pub(crate) fn param_type(&self, param: ParamRef) -> TypeId {
        match self.binder(param.binder).map(|b| b.kind) {
            Some(BinderKind::Method(_)) => self.intern(TypeData::TermParam(param)),
            _ => self.intern(TypeData::Param(param)),
        }
    }

    /// References to every parameter of `binder`, in order.
    pub fn param_refs(&self, binder: BinderId) -> SmallVec<[TypeId; 4]> {
        let arity = self.binder(binder).map_or(0, |b| b.arity());
        (0..arity as u32)
            .map(|index| self.param_type(ParamRef::new(binder, index)))
            .collect()
    }

    /// The `index`-th parameter of `binder`.
    pub fn param_ref(&self, binder: BinderId, index: u32) -> Result<TypeId, TypeAlgebraError> {
        let arity = self.binder(binder).map_or(0, |b| b.arity());
        if index as usize >= arity {
            return Err(TypeAlgebraError::ParamOutOfRange {
                binder,
                index,
                arity,
            });
        }
        Ok(self.param_type(ParamRef::new(binder, index)))
    }

    /// Declared bounds of a universal parameter, or the formal type of a
    /// method parameter.
    pub fn param_info(&self, param: ParamRef) -> TypeId {
        self.binder(param.binder)
            .and_then(|b| b.param_infos.get(param.index as usize).copied())
            .unwrap_or(TypeId::NO_TYPE)
    }

    /// Build a universal type.
    ///
    /// `build` receives this interner and the references to the new binder's
    /// parameters, and returns the declared `Bounds` of each parameter plus
    /// the result type.
    pub fn universal<F>(&self, names: &[&str], build: F) -> Result<TypeId, TypeAlgebraError>
    where
        F: FnOnce(&Self, &[TypeId]) -> (Vec<TypeId>, TypeId),
    {
        let atoms: SmallVec<[Atom; 4]> = names.iter().map(|n| self.intern_string(n)).collect();
        let binder = self.alloc_binder(BinderKind::Universal, &atoms);
        let params = self.param_refs(binder);
        let (infos, result) = build(self, &params);
        if infos.len() != atoms.len() {
            return Err(TypeAlgebraError::BinderArity {
                expected: atoms.len(),
                found: infos.len(),
            });
        }
        for &info in &infos {
            self.expect_bounds(info)?;
        }
        self.fill_binder(binder, infos.into_iter().collect(), result);
        Ok(self.intern(TypeData::Universal(binder)))
    }

    /// Build a method type. `build` returns the formal parameter types and
    /// the result type; both may mention the value parameters.
    pub fn method<F>(
        &self,
        names: &[&str],
        flags: MethodFlags,
        build: F,
    ) -> Result<TypeId, TypeAlgebraError>
    where
        F: FnOnce(&Self, &[TypeId]) -> (Vec<TypeId>, TypeId),
    {
        let atoms: SmallVec<[Atom; 4]> = names.iter().map(|n| self.intern_string(n)).collect();
        let binder = self.alloc_binder(BinderKind::Method(flags), &atoms);
        let params = self.param_refs(binder);
        let (formals, result) = build(self, &params);
        if formals.len() != atoms.len() {
            return Err(TypeAlgebraError::BinderArity {
                expected: atoms.len(),
                found: formals.len(),
            });
        }
        self.fill_binder(binder, formals.into_iter().collect(), result);
        Ok(self.intern(TypeData::Method(binder)))
    }

    /// Method type whose formals and result do not mention its parameters.
    pub fn simple_method(&self, formals: &[TypeId], result: TypeId, flags: MethodFlags) -> TypeId {
        let atoms: SmallVec<[Atom; 4]> = (0..formals.len())
            .map(|i| self.intern_string(&format!("x{i}")))
            .collect();
        let binder = self.alloc_binder(BinderKind::Method(flags), &atoms);
        self.fill_binder(binder, formals.iter().copied().collect(), result);
        self.intern(TypeData::Method(binder))
    }

    /// Fresh binder with the same names, infos and result as `binder`, its
    /// own parameter references substituted in.
    pub fn copy_binder(&self, binder: BinderId) -> BinderId {
        let Some(data) = self.binder(binder) else {
            return binder;
        };
        let copy = self.alloc_binder(data.kind, &data.param_names);
        let infos = data
            .param_infos
            .iter()
            .map(|&info| self.subst_binder(info, binder, copy))
            .collect();
        let result = self.subst_binder(data.result, binder, copy);
        self.fill_binder(copy, infos, result);
        debug!(from = binder.0, to = copy.0, "binder copied");
        copy
    }

    /// Whether `name` is declared as a type member of `class`.
    pub fn declares_type(&self, class: SymbolId, name: Atom) -> bool {
        self.symbols.decl(class, name, Namespace::Type).is_some()
    }
}
