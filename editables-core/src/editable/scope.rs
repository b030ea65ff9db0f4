//! Scopes and the scope registry.
//!
//! A scope is a named bucket of editables that can be begun, committed,
//! rolled back and queried as a unit. Independent feature areas of an
//! application each use their own scope. The registry maps identifiers to
//! scopes: scopes are created on first registration and live as long as the
//! registry. The empty identifier is the default scope and always exists.
//!
//! The registry is an explicit, cheaply cloneable handle. The process-wide
//! instance behind the crate's free functions is just one of them; tests
//! construct their own.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use super::{EditOptions, Editable, EditableObject, EditableSet};
use crate::config::EditablesConfig;
use crate::error::{EditError, Result};
use crate::graph::{make_editable, Object, Observable, Visited};
use crate::reactive::{Memo, Throttled};

/// Throttled aggregate change flag of a scope.
pub type ChangeFlag = Throttled<bool>;

/// Identifier of a scope. The empty string is the default scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(String);

impl ScopeId {
    /// The implicit global scope.
    pub const DEFAULT: ScopeId = ScopeId(String::new());

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }

    /// A fresh identifier for a facade's private scope.
    pub(crate) fn private() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(format!("editable-object-{}", COUNTER.fetch_add(1, Ordering::Relaxed)))
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ScopeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&ScopeId> for ScopeId {
    fn from(id: &ScopeId) -> Self {
        id.clone()
    }
}

/// A registered scope: its identifier and live member list.
#[derive(Debug, Clone)]
pub struct Scope {
    id: ScopeId,
    editables: EditableSet,
}

impl Scope {
    fn new(id: ScopeId) -> Self {
        Self {
            id,
            editables: EditableSet::new(),
        }
    }

    pub fn id(&self) -> &ScopeId {
        &self.id
    }

    /// The live member list.
    pub fn editables(&self) -> &EditableSet {
        &self.editables
    }

    pub fn members(&self) -> Vec<Editable> {
        self.editables.members()
    }

    pub fn len(&self) -> usize {
        self.editables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.editables.is_empty()
    }

    /// A lazily recomputed memo of the scope's aggregate change flag.
    pub fn has_changes_memo(&self) -> Memo<bool> {
        let editables = self.editables.clone();
        Memo::new(move || editables.has_changes())
    }
}

struct RegistryInner {
    scopes: DashMap<ScopeId, Scope>,
    config: EditablesConfig,
}

/// Mapping from scope identifier to scope.
#[derive(Clone)]
pub struct ScopeRegistry {
    inner: Arc<RegistryInner>,
}

impl ScopeRegistry {
    /// A registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EditablesConfig::default())
    }

    /// A registry holding only the (empty) default scope.
    pub fn with_config(config: EditablesConfig) -> Self {
        let scopes = DashMap::new();
        scopes.insert(ScopeId::DEFAULT, Scope::new(ScopeId::DEFAULT));

        Self {
            inner: Arc::new(RegistryInner { scopes, config }),
        }
    }

    pub fn config(&self) -> &EditablesConfig {
        &self.inner.config
    }

    /// Append `editable` to the scope, creating the scope if needed.
    pub fn register(&self, scope: impl Into<ScopeId>, editable: Editable) {
        let id = scope.into();
        // Clone the scope out so no map guard is held while members notify.
        let scope = self
            .inner
            .scopes
            .entry(id.clone())
            .or_insert_with(|| Scope::new(id.clone()))
            .clone();

        tracing::debug!(scope = %id, cell = editable.id(), "registered editable");
        scope.editables.push(editable);
    }

    /// Look up a scope.
    ///
    /// Fails with [`EditError::UnknownScope`] if nothing was ever registered
    /// under `scope`.
    pub fn scope(&self, scope: impl Into<ScopeId>) -> Result<Scope> {
        let id = scope.into();
        self.inner
            .scopes
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(EditError::UnknownScope(id))
    }

    /// Members of a scope, in registration order.
    pub fn members(&self, scope: impl Into<ScopeId>) -> Result<Vec<Editable>> {
        Ok(self.scope(scope)?.members())
    }

    pub fn contains(&self, scope: impl Into<ScopeId>) -> bool {
        self.inner.scopes.contains_key(&scope.into())
    }

    /// Identifiers of every known scope, sorted.
    pub fn scope_ids(&self) -> Vec<ScopeId> {
        let mut ids: Vec<ScopeId> = self.inner.scopes.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn begin_edit(&self, scope: impl Into<ScopeId>) -> Result<()> {
        let scope = self.scope(scope)?;
        tracing::debug!(scope = %scope.id, members = scope.len(), "begin edit");
        scope.editables.begin_edit();
        Ok(())
    }

    pub fn commit(&self, scope: impl Into<ScopeId>) -> Result<()> {
        let scope = self.scope(scope)?;
        tracing::debug!(scope = %scope.id, members = scope.len(), "commit");
        scope.editables.commit();
        Ok(())
    }

    pub fn rollback(&self, scope: impl Into<ScopeId>) -> Result<()> {
        let scope = self.scope(scope)?;
        tracing::debug!(scope = %scope.id, members = scope.len(), "rollback");
        scope.editables.rollback();
        Ok(())
    }

    /// Whether any member of the scope has uncommitted changes.
    pub fn has_changes(&self, scope: impl Into<ScopeId>) -> Result<bool> {
        Ok(self.scope(scope)?.editables.has_changes())
    }

    /// A throttled flag following [`ScopeRegistry::has_changes`].
    ///
    /// `delay` defaults to the configured flag delay.
    pub fn get_has_changes_flag(
        &self,
        scope: impl Into<ScopeId>,
        delay: Option<Duration>,
    ) -> Result<ChangeFlag> {
        let scope = self.scope(scope)?;
        let delay = delay.unwrap_or_else(|| self.config().flag_delay());
        Ok(Throttled::new(scope.has_changes_memo(), delay))
    }

    /// Install the transactional extension on `cell`.
    ///
    /// The first call decides the cell's options and registration; later
    /// calls, through any registry, return the same handle untouched.
    pub fn extend(&self, cell: &Observable, options: impl Into<EditOptions>) -> Editable {
        let options = options.into();
        let mut created = false;
        let editable = cell
            .editable_slot()
            .get_or_init(|| {
                created = true;
                Editable::new(cell.signal(), &options, self.config().scalar_equality)
            })
            .clone();

        if created {
            if let Some(scope) = editable.scope() {
                self.register(scope, editable.clone());
            }
        }
        editable
    }

    /// Walk `object` and extend every writable cell under `scope`, without
    /// creating a facade. Returns the editables found.
    pub fn enable(&self, object: &Object, scope: impl Into<ScopeId>) -> Vec<Editable> {
        let scope = scope.into();
        let mut found = Vec::new();
        make_editable(self, object, &scope, &mut found, &mut Visited::new());
        tracing::debug!(scope = %scope, found = found.len(), "enabled object graph");
        found
    }

    /// Attach an editable facade to `root`.
    ///
    /// Attaching is idempotent per object: a second call returns the facade
    /// already attached. With `auto_init` the root graph is walked at once.
    pub fn attach(&self, root: &Object, auto_init: bool) -> EditableObject {
        let mut created = false;
        let facade = root
            .facade_slot()
            .get_or_init(|| {
                created = true;
                EditableObject::new(self.clone())
            })
            .clone();

        if created {
            tracing::debug!(scope = %facade.scope(), auto_init, "attached editable facade");
            if auto_init {
                facade.add_editable(root);
            }
        }
        facade
    }
}

impl Default for ScopeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeRegistry")
            .field("scopes", &self.scope_ids())
            .field("config", self.config())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScalarEquality;
    use crate::graph::Value;

    #[test]
    fn default_scope_exists_and_is_empty() {
        let registry = ScopeRegistry::new();
        assert!(registry.contains(ScopeId::DEFAULT));
        assert!(registry.members("").unwrap().is_empty());
        assert!(!registry.has_changes("").unwrap());
    }

    #[test]
    fn unknown_scope_is_an_error() {
        let registry = ScopeRegistry::new();
        let err = registry.has_changes("doesNotExist").unwrap_err();
        assert!(matches!(err, EditError::UnknownScope(id) if id.as_str() == "doesNotExist"));
        assert!(registry.begin_edit("doesNotExist").is_err());
        assert!(registry.get_has_changes_flag("doesNotExist", None).is_err());
    }

    #[test]
    fn extend_registers_once() {
        let registry = ScopeRegistry::new();
        let cell = Observable::new(1);

        let first = registry.extend(&cell, EditOptions::in_scope("S"));
        let second = registry.extend(&cell, EditOptions::in_scope("S"));

        assert!(first.ptr_eq(&second));
        assert_eq!(registry.members("S").unwrap().len(), 1);
    }

    #[test]
    fn unscoped_and_disabled_cells_are_not_registered() {
        let registry = ScopeRegistry::new();
        registry.extend(&Observable::new(1), EditOptions::unscoped());
        registry.extend(&Observable::new(2), false);

        assert!(registry.members(ScopeId::DEFAULT).unwrap().is_empty());
    }

    #[test]
    fn explicit_registration_keeps_duplicates() {
        let registry = ScopeRegistry::new();
        let editable = registry.extend(&Observable::new(1), EditOptions::in_scope("dup"));
        registry.register("dup", editable);

        assert_eq!(registry.members("dup").unwrap().len(), 2);
        assert_eq!(registry.scope_ids(), vec![ScopeId::DEFAULT, ScopeId::from("dup")]);
    }

    #[test]
    fn registry_policy_reaches_cells() {
        let config = EditablesConfig {
            scalar_equality: ScalarEquality::Strict,
            ..EditablesConfig::default()
        };
        let registry = ScopeRegistry::with_config(config);
        let cell = Observable::new(0);
        let editable = registry.extend(&cell, EditOptions::unscoped());

        editable.begin_edit();
        cell.set("0");
        assert!(editable.has_changes());
        assert_eq!(cell.get(), Value::from("0"));
    }
}
