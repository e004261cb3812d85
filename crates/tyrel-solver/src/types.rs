//! Type representation for the subtype engine.
//!
//! Types are interned: a [`TypeId`] is a handle into a [`TypeInterner`], and
//! two handles are the same type object exactly when they are equal. The
//! structure behind a handle is a [`TypeData`], which only ever holds other
//! handles, so it is `Copy` and cheap to match on.
//!
//! Universal and method types are *binders*. Their parameter lists live in a
//! binder arena keyed by [`BinderId`], and a parameter reference carries the
//! `(binder, index)` pair of the binder that owns it. Binder identity, not
//! structure, decides which constraint-store entry a parameter belongs to.
//!
//! [`TypeInterner`]: crate::TypeInterner

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use tyrel_common::Atom;

/// Interned type handle.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TypeId(pub u32);

impl TypeId {
    /// Sentinel for "absent"; never a subtype or supertype of anything.
    pub const NO_TYPE: TypeId = TypeId(0);
    /// Prefix of statically accessible named types.
    pub const NO_PREFIX: TypeId = TypeId(1);
    /// Placeholder that every type conforms to.
    pub const WILDCARD: TypeId = TypeId(2);
    /// Result of an earlier failure; conforms to everything.
    pub const ERROR: TypeId = TypeId(3);

    /// First id handed out for a non-intrinsic type.
    pub const FIRST_USER: u32 = 4;

    #[inline]
    pub fn exists(self) -> bool {
        self != Self::NO_TYPE
    }
}

/// Symbol handle into the [`SymbolTable`](crate::SymbolTable).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub const NONE: SymbolId = SymbolId(0);
}

/// Handle of a universal or method binder.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BinderId(pub u32);

/// Reference to the `index`-th parameter of `binder`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamRef {
    pub binder: BinderId,
    pub index: u32,
}

impl ParamRef {
    #[inline]
    pub fn new(binder: BinderId, index: u32) -> Self {
        Self { binder, index }
    }
}

/// Inference cell handle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarId(pub u32);

/// Fresh opaque stand-in handle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SkolemId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntrinsicKind {
    NoType,
    NoPrefix,
    Wildcard,
    Error,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    Int(i64),
    Bool(bool),
    Str(Atom),
}

/// The closed set of type shapes the comparator dispatches on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    Intrinsic(IntrinsicKind),
    /// Named reference to a type symbol (class, alias or abstract type).
    TypeRef { prefix: TypeId, symbol: SymbolId },
    /// Named reference to a term symbol; a singleton type.
    TermRef { prefix: TypeId, symbol: SymbolId },
    /// Self type of a class; a singleton type.
    This(SymbolId),
    /// Literal constant; a singleton type.
    Constant(LiteralValue),
    /// Opaque instance of `underlying`; a singleton type.
    Skolem { id: SkolemId, underlying: TypeId },
    /// Inference cell.
    Var(TypeVarId),
    /// Bound parameter of a universal type.
    Param(ParamRef),
    /// Value parameter of a method type; a singleton type.
    TermParam(ParamRef),
    /// `parent { name: info }`.
    Refined {
        parent: TypeId,
        name: Atom,
        info: TypeId,
    },
    And(TypeId, TypeId),
    Or(TypeId, TypeId),
    Method(BinderId),
    Universal(BinderId),
    /// Call-by-name result type.
    ByName(TypeId),
    /// `>: lo <: hi`.
    Bounds { lo: TypeId, hi: TypeId },
    /// Declaration-side view of a class.
    ClassInfo { prefix: TypeId, class: SymbolId },
}

impl TypeData {
    /// Named references: the shapes the first cascade tier matches on.
    #[inline]
    pub fn is_named(&self) -> bool {
        matches!(self, TypeData::TypeRef { .. } | TypeData::TermRef { .. })
    }

    #[inline]
    pub fn is_singleton(&self) -> bool {
        matches!(
            self,
            TypeData::TermRef { .. }
                | TypeData::This(_)
                | TypeData::Constant(_)
                | TypeData::Skolem { .. }
                | TypeData::TermParam(_)
        )
    }
}

/// Declared variance of a type parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Variance {
    #[default]
    Invariant,
    Covariant,
    Contravariant,
}

bitflags! {
    /// Flags carried by a method binder.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MethodFlags: u8 {
        /// Parameters are supplied implicitly.
        const IMPLICIT = 1 << 0;
        /// Method originates from a foreign-interop boundary.
        const FOREIGN = 1 << 1;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinderKind {
    Universal,
    Method(MethodFlags),
}

/// Contents of a binder.
///
/// For a universal binder `param_infos` are the declared `Bounds` of each
/// parameter; for a method binder they are the formal parameter types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinderData {
    pub kind: BinderKind,
    pub param_names: SmallVec<[Atom; 4]>,
    pub param_infos: SmallVec<[TypeId; 4]>,
    pub result: TypeId,
}

impl BinderData {
    #[inline]
    pub fn arity(&self) -> usize {
        self.param_names.len()
    }

    pub fn method_flags(&self) -> MethodFlags {
        match self.kind {
            BinderKind::Method(flags) => flags,
            BinderKind::Universal => MethodFlags::empty(),
        }
    }
}

/// Failures raised while building types or declaring symbols.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeAlgebraError {
    /// A binder builder returned a different number of infos than names.
    BinderArity { expected: usize, found: usize },
    /// A universal parameter info was not a `Bounds` type.
    NotBounds(TypeId),
    /// A parameter index outside the binder's parameter list.
    ParamOutOfRange { binder: BinderId, index: u32, arity: usize },
    /// An operation that needs a universal type got something else.
    NotUniversal(TypeId),
    /// A type variable was settled a second time.
    AlreadyInstantiated(TypeVarId),
    /// The handle is not a type variable.
    NotTypeVar(TypeId),
    /// The handle is not a universal parameter.
    NotParam(TypeId),
    /// Declaring these parents would make inheritance cyclic.
    CyclicInheritance(SymbolId),
    /// The symbol is unknown or of the wrong kind.
    BadSymbol(SymbolId),
}

impl fmt::Display for TypeAlgebraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BinderArity { expected, found } => {
                write!(f, "binder expects {expected} parameter infos, got {found}")
            }
            Self::NotBounds(tp) => write!(f, "type #{} is not a bounds pair", tp.0),
            Self::ParamOutOfRange {
                binder,
                index,
                arity,
            } => write!(
                f,
                "parameter {index} out of range for binder #{} with {arity} parameters",
                binder.0
            ),
            Self::NotUniversal(tp) => write!(f, "type #{} is not a universal type", tp.0),
            Self::AlreadyInstantiated(var) => {
                write!(f, "type variable ?{} is already instantiated", var.0)
            }
            Self::NotTypeVar(tp) => write!(f, "type #{} is not a type variable", tp.0),
            Self::NotParam(tp) => write!(f, "type #{} is not a universal parameter", tp.0),
            Self::CyclicInheritance(sym) => {
                write!(f, "symbol #{} would inherit from itself", sym.0)
            }
            Self::BadSymbol(sym) => write!(f, "symbol #{} is unknown or of the wrong kind", sym.0),
        }
    }
}

impl std::error::Error for TypeAlgebraError {}
