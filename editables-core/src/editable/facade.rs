//! Editable object facade.
//!
//! A facade gives a whole object graph the same interface as a single cell:
//! `begin_edit`, `commit`, `rollback` and a derived `has_changes`, applied to
//! every cell discovered beneath the root. Discovered cells are registered
//! under a private scope unique to the facade.

use std::fmt;
use std::sync::Arc;

use super::{EditOptions, Editable, EditableSet, ScopeId, ScopeRegistry};
use crate::graph::{make_editable, Object, Observable, Visited};
use crate::reactive::Memo;

struct FacadeInner {
    scope: ScopeId,
    registry: ScopeRegistry,
    editables: EditableSet,
    has_changes: Memo<bool>,
}

/// Transactional view over the editable cells of an object graph.
///
/// Created by [`ScopeRegistry::attach`]; clones share state.
#[derive(Clone)]
pub struct EditableObject {
    inner: Arc<FacadeInner>,
}

impl EditableObject {
    pub(crate) fn new(registry: ScopeRegistry) -> Self {
        let editables = EditableSet::new();
        let has_changes = {
            let editables = editables.clone();
            Memo::new(move || editables.has_changes())
        };

        Self {
            inner: Arc::new(FacadeInner {
                scope: ScopeId::private(),
                registry,
                editables,
                has_changes,
            }),
        }
    }

    /// The facade's private scope.
    pub fn scope(&self) -> &ScopeId {
        &self.inner.scope
    }

    /// Collected editables, in discovery order.
    pub fn members(&self) -> Vec<Editable> {
        self.inner.editables.members()
    }

    pub fn len(&self) -> usize {
        self.inner.editables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.editables.is_empty()
    }

    pub fn begin_edit(&self) {
        tracing::debug!(scope = %self.inner.scope, members = self.len(), "begin edit");
        self.inner.editables.begin_edit();
    }

    pub fn commit(&self) {
        tracing::debug!(scope = %self.inner.scope, members = self.len(), "commit");
        self.inner.editables.commit();
    }

    pub fn rollback(&self) {
        tracing::debug!(scope = %self.inner.scope, members = self.len(), "rollback");
        self.inner.editables.rollback();
    }

    /// Whether any collected cell has uncommitted changes.
    pub fn has_changes(&self) -> bool {
        self.inner.has_changes.get()
    }

    pub fn has_changes_memo(&self) -> Memo<bool> {
        self.inner.has_changes.clone()
    }

    /// Walk `object` under the private scope and collect what it finds.
    pub fn add_editable(&self, object: &Object) {
        let mut found = Vec::new();
        make_editable(
            &self.inner.registry,
            object,
            &self.inner.scope,
            &mut found,
            &mut Visited::new(),
        );
        tracing::trace!(scope = %self.inner.scope, found = found.len(), "collected editables");
        self.inner.editables.extend(found);
    }

    /// Extend a single cell under the private scope and collect it.
    ///
    /// Cells already marked non-editable are left out.
    pub fn add_observable(&self, cell: &Observable) {
        let editable = self
            .inner
            .registry
            .extend(cell, EditOptions::in_scope(&self.inner.scope));
        if editable.is_enabled() {
            self.inner.editables.push(editable);
        }
    }
}

impl fmt::Debug for EditableObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditableObject")
            .field("scope", &self.inner.scope)
            .field("members", &self.len())
            .finish()
    }
}
