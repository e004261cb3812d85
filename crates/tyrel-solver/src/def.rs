//! Symbol table for classes, abstract types, aliases and values.
//!
//! Named types (`TypeRef`, `TermRef`) point at a [`SymbolId`]; everything the
//! comparator needs to know about the name lives here:
//!
//! | Kind | `info` | Notes |
//! |------|--------|-------|
//! | Class | unused | parents, ordered type parameters, member declarations |
//! | TypeParam | `Bounds` | owned by a class, carries a variance |
//! | AbstractType | `Bounds` | |
//! | Alias | aliased type | dealiasing replaces the reference by `info` |
//! | Val | declared type | `TermRef` underlying |
//!
//! Declarations that need type validation go through the `declare_*` methods
//! of [`TypeInterner`](crate::TypeInterner); the table itself only stores.

use crate::types::{SymbolId, TypeId, Variance};
use bitflags::bitflags;
use dashmap::DashMap;
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::trace;
use tyrel_common::Atom;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Class,
    TypeParam,
    AbstractType,
    Alias,
    Val,
}

impl SymbolKind {
    #[inline]
    pub fn is_type(self) -> bool {
        !matches!(self, SymbolKind::Val)
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    pub struct SymbolFlags: u16 {
        /// Reachable without a prefix; references compare by symbol alone.
        const STATIC = 1 << 0;
        /// Mutable value; its `TermRef` is not a stable path.
        const MUTABLE = 1 << 1;
        /// Marker or hk trait synthesized by the definitions bootstrap.
        const SYNTHETIC = 1 << 2;
    }
}

/// Which declaration space a member name lives in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    Type,
    Term,
}

/// Stored data for one symbol.
#[derive(Clone, Debug)]
pub struct SymbolData {
    pub kind: SymbolKind,
    pub name: Atom,
    /// Enclosing class, or `SymbolId::NONE` at top level.
    pub owner: SymbolId,
    pub flags: SymbolFlags,
    pub variance: Variance,
    pub info: TypeId,
    pub parents: SmallVec<[TypeId; 4]>,
    pub type_params: SmallVec<[SymbolId; 4]>,
    pub type_decls: IndexMap<Atom, SymbolId>,
    pub term_decls: IndexMap<Atom, SymbolId>,
}

impl SymbolData {
    pub fn new(kind: SymbolKind, name: Atom, owner: SymbolId) -> Self {
        Self {
            kind,
            name,
            owner,
            flags: SymbolFlags::empty(),
            variance: Variance::Invariant,
            info: TypeId::NO_TYPE,
            parents: SmallVec::new(),
            type_params: SmallVec::new(),
            type_decls: IndexMap::new(),
            term_decls: IndexMap::new(),
        }
    }

    pub fn with_flags(mut self, flags: SymbolFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_info(mut self, info: TypeId) -> Self {
        self.info = info;
        self
    }

    pub fn with_variance(mut self, variance: Variance) -> Self {
        self.variance = variance;
        self
    }
}

/// Concurrent symbol storage.
///
/// Ids are allocated from an atomic counter starting at 1 so that
/// `SymbolId::NONE` never names a real symbol.
pub struct SymbolTable {
    symbols: DashMap<SymbolId, SymbolData>,
    next_id: AtomicU32,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            symbols: DashMap::new(),
            next_id: AtomicU32::new(1),
        }
    }

    /// Store a symbol and enter it into its owner's declarations.
    pub(crate) fn register(&self, data: SymbolData) -> SymbolId {
        let id = SymbolId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (owner, name, kind) = (data.owner, data.name, data.kind);
        trace!(symbol = id.0, kind = ?kind, "SymbolTable::register");
        self.symbols.insert(id, data);

        // The new entry's shard guard is released above; taking the owner's
        // guard here cannot deadlock against it.
        if let Some(mut owner_data) = self.symbols.get_mut(&owner) {
            match kind {
                SymbolKind::TypeParam => {
                    owner_data.type_params.push(id);
                    owner_data.type_decls.insert(name, id);
                }
                SymbolKind::Val => {
                    owner_data.term_decls.insert(name, id);
                }
                _ => {
                    owner_data.type_decls.insert(name, id);
                }
            }
        }
        id
    }

    pub fn get(&self, sym: SymbolId) -> Option<SymbolData> {
        self.symbols.get(&sym).map(|r| r.clone())
    }

    pub fn contains(&self, sym: SymbolId) -> bool {
        self.symbols.contains_key(&sym)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn kind(&self, sym: SymbolId) -> Option<SymbolKind> {
        self.symbols.get(&sym).map(|r| r.kind)
    }

    pub fn name(&self, sym: SymbolId) -> Atom {
        self.symbols.get(&sym).map_or(Atom::NONE, |r| r.name)
    }

    pub fn owner(&self, sym: SymbolId) -> SymbolId {
        self.symbols.get(&sym).map_or(SymbolId::NONE, |r| r.owner)
    }

    pub fn flags(&self, sym: SymbolId) -> SymbolFlags {
        self.symbols
            .get(&sym)
            .map_or(SymbolFlags::empty(), |r| r.flags)
    }

    pub fn variance(&self, sym: SymbolId) -> Variance {
        self.symbols
            .get(&sym)
            .map_or(Variance::Invariant, |r| r.variance)
    }

    pub fn info(&self, sym: SymbolId) -> TypeId {
        self.symbols.get(&sym).map_or(TypeId::NO_TYPE, |r| r.info)
    }

    pub fn parents(&self, sym: SymbolId) -> SmallVec<[TypeId; 4]> {
        self.symbols
            .get(&sym)
            .map(|r| r.parents.clone())
            .unwrap_or_default()
    }

    /// Type parameters of a class, in declaration order.
    pub fn type_params(&self, sym: SymbolId) -> SmallVec<[SymbolId; 4]> {
        self.symbols
            .get(&sym)
            .map(|r| r.type_params.clone())
            .unwrap_or_default()
    }

    /// Member declared directly in `class` (inherited members are not seen).
    pub fn decl(&self, class: SymbolId, name: Atom, ns: Namespace) -> Option<SymbolId> {
        let data = self.symbols.get(&class)?;
        match ns {
            Namespace::Type => data.type_decls.get(&name).copied(),
            Namespace::Term => data.term_decls.get(&name).copied(),
        }
    }

    #[inline]
    pub fn is_class(&self, sym: SymbolId) -> bool {
        self.kind(sym) == Some(SymbolKind::Class)
    }

    #[inline]
    pub fn is_alias(&self, sym: SymbolId) -> bool {
        self.kind(sym) == Some(SymbolKind::Alias)
    }

    #[inline]
    pub fn is_static(&self, sym: SymbolId) -> bool {
        self.flags(sym).contains(SymbolFlags::STATIC)
    }

    pub(crate) fn set_parents(&self, class: SymbolId, parents: SmallVec<[TypeId; 4]>) {
        if let Some(mut entry) = self.symbols.get_mut(&class) {
            entry.parents = parents;
        }
    }

    pub(crate) fn set_info(&self, sym: SymbolId, info: TypeId) {
        if let Some(mut entry) = self.symbols.get_mut(&sym) {
            entry.info = info;
        }
    }
}
