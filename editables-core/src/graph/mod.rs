//! Object Graph
//!
//! This module models the application state the editable layer operates on
//! and the walk that discovers editable cells in it.
//!
//! # Overview
//!
//! - [`Value`]: plain data (primitives, arrays, objects).
//! - [`Object`]: a shared, identity-bearing bag of named [`Property`]s.
//!   Objects may reference each other, including in cycles.
//! - [`Property`]: a writable [`Observable`], a read-only computed
//!   ([`Memo`](crate::reactive::Memo)), or a plain value. The variant is
//!   the capability the walker checks, resolved once per visited property.
//! - [`make_editable`]: the recursive, cycle-safe discovery walk.

mod object;
mod observable;
mod value;
mod walker;

pub use object::{Object, Property};
pub use observable::Observable;
pub use value::Value;
pub use walker::{make_editable, Identity, Visited};
