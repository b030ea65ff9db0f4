//! Transactional editing over observable cells.
//!
//! - [`Editable`]: one cell with `begin_edit` / `commit` / `rollback` and a
//!   lazily derived `has_changes` flag.
//! - [`ScopeRegistry`]: named buckets of editables operated on as a unit.
//! - [`EditableObject`]: a facade applying the same operations to every
//!   cell discovered in an object graph.
//! - [`EqualityStrategy`]: how a cell decides it drifted from its baseline.

mod cell;
pub mod equality;
mod facade;
mod scope;
mod set;

pub use cell::{EditOptions, Editable};
pub use equality::EqualityStrategy;
pub use facade::EditableObject;
pub use scope::{ChangeFlag, Scope, ScopeId, ScopeRegistry};
pub use set::EditableSet;
