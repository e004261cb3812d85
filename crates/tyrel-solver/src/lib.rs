//! Subtype Relation Engine
//!
//! Decides conformance between types of a nominal language with abstract
//! type members, refinements, intersections and unions, higher-kinded
//! parameters, method and universal types.
//!
//! - **Interned types**: structural equality is `TypeId` equality
//! - **Four-tier cascade**: `TypeComparer::is_sub_type` dispatches on one
//!   operand per tier, falling through to the next
//! - **Persistent constraints**: parameters under inference are narrowed in
//!   a `ConstraintStore` snapshot that is rolled back when a speculative
//!   comparison fails
//! - **Monitored mode**: deep comparisons refuse re-entrant pairs so cyclic
//!   bounds terminate
//!
//! ```ignore
//! let db = TypeInterner::new();
//! let cmp = TypeComparer::new(&db);
//! assert!(cmp.is_sub_type(db.defn().int_type, db.defn().any_type));
//! ```

mod algebra;
mod comparer;
pub mod constraint;
pub mod def;
pub mod definitions;
mod intern;
mod matcher;
pub mod options;
pub mod recursion;
mod resolve;
pub mod types;

pub use algebra::Signature;
pub use comparer::TypeComparer;
pub use constraint::ConstraintStore;
pub use def::{Namespace, SymbolData, SymbolFlags, SymbolKind, SymbolTable};
pub use definitions::Definitions;
pub use intern::TypeInterner;
pub use options::ComparerOptions;
pub use types::*;

// Test modules live under tests/ and are compiled into the crate so they can
// reach crate-private helpers.
#[cfg(test)]
#[path = "../tests/fixtures.rs"]
mod fixtures;

#[cfg(test)]
#[path = "../tests/intern_tests.rs"]
mod intern_tests;

#[cfg(test)]
#[path = "../tests/algebra_tests.rs"]
mod algebra_tests;

#[cfg(test)]
#[path = "../tests/constraint_tests.rs"]
mod constraint_tests;

#[cfg(test)]
#[path = "../tests/comparer_tests.rs"]
mod comparer_tests;

#[cfg(test)]
#[path = "../tests/monitored_tests.rs"]
mod monitored_tests;

#[cfg(test)]
#[path = "../tests/hk_tests.rs"]
mod hk_tests;

#[cfg(test)]
#[path = "../tests/resolve_tests.rs"]
mod resolve_tests;

#[cfg(test)]
#[path = "../tests/matcher_tests.rs"]
mod matcher_tests;

#[cfg(test)]
#[path = "../tests/options_tests.rs"]
mod options_tests;
