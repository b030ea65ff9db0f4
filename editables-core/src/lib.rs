//! Editables Core
//!
//! Transactional edit semantics for reactive state: given an object graph
//! whose leaf values are observable cells, this crate provides
//! `begin_edit` / `commit` / `rollback` and a lazily derived `has_changes`
//! flag for single cells, for named scopes of cells and for whole object
//! graphs.
//!
//! # Architecture
//!
//! - `reactive`: signals, memos, effects and the runtime connecting them
//! - `graph`: the object graph model and the cycle-safe discovery walk
//! - `editable`: editable cells, scopes, the scope registry and the object
//!   facade
//! - `config` / `error`: registry settings and the error type
//!
//! The free functions below operate on a process-wide [`ScopeRegistry`].
//! Code that wants isolation (tests, embedded subsystems) builds its own
//! registry and calls the same operations as methods.
//!
//! # Example
//!
//! ```rust
//! use editables_core::{Object, Observable, ScopeRegistry, Value};
//!
//! let registry = ScopeRegistry::new();
//! let name = Observable::new("Ann");
//! let person = Object::new()
//!     .with("name", name.clone())
//!     .with("address", Object::new().with("city", Observable::new("Kyiv")));
//!
//! let editor = registry.attach(&person, true);
//! editor.begin_edit();
//! name.set("Bob");
//! assert!(editor.has_changes());
//!
//! editor.rollback();
//! assert_eq!(name.get(), Value::from("Ann"));
//! assert!(!editor.has_changes());
//! ```

pub mod config;
pub mod editable;
pub mod error;
pub mod graph;
pub mod reactive;

use std::sync::OnceLock;
use std::time::Duration;

pub use config::{EditablesConfig, ScalarEquality};
pub use editable::{
    ChangeFlag, EditOptions, Editable, EditableObject, EditableSet, EqualityStrategy, Scope,
    ScopeId, ScopeRegistry,
};
pub use error::{EditError, Result};
pub use graph::{Object, Observable, Property, Value};

static GLOBAL_REGISTRY: OnceLock<ScopeRegistry> = OnceLock::new();

/// The process-wide registry, created with the default configuration on
/// first use.
pub fn registry() -> &'static ScopeRegistry {
    GLOBAL_REGISTRY.get_or_init(ScopeRegistry::new)
}

/// Create the process-wide registry with `config`.
///
/// Fails with [`EditError::RegistryInitialized`] once the registry exists,
/// whether created here or by an earlier call to any free function.
pub fn init_registry(config: EditablesConfig) -> Result<&'static ScopeRegistry> {
    let mut installed = false;
    let registry = GLOBAL_REGISTRY.get_or_init(|| {
        installed = true;
        ScopeRegistry::with_config(config)
    });

    if installed {
        Ok(registry)
    } else {
        Err(EditError::RegistryInitialized)
    }
}

/// Install the transactional extension on a cell. See [`ScopeRegistry::extend`].
pub fn extend(cell: &Observable, options: impl Into<EditOptions>) -> Editable {
    registry().extend(cell, options)
}

/// Attach an editable facade to an object. See [`ScopeRegistry::attach`].
pub fn attach(root: &Object, auto_init: bool) -> EditableObject {
    registry().attach(root, auto_init)
}

/// Make every writable cell under `object` editable in `scope`.
pub fn enable(object: &Object, scope: impl Into<ScopeId>) -> Vec<Editable> {
    registry().enable(object, scope)
}

pub fn begin_edit(scope: impl Into<ScopeId>) -> Result<()> {
    registry().begin_edit(scope)
}

pub fn commit(scope: impl Into<ScopeId>) -> Result<()> {
    registry().commit(scope)
}

pub fn rollback(scope: impl Into<ScopeId>) -> Result<()> {
    registry().rollback(scope)
}

/// Whether any cell of `scope` has uncommitted changes.
pub fn has_changes(scope: impl Into<ScopeId>) -> Result<bool> {
    registry().has_changes(scope)
}

/// Throttled change flag of `scope`; `delay` defaults to the configured
/// 100ms window.
pub fn get_has_changes_flag(scope: impl Into<ScopeId>, delay: Option<Duration>) -> Result<ChangeFlag> {
    registry().get_has_changes_flag(scope, delay)
}
