//! Ordered, append-only collections of editables.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::Editable;
use crate::reactive::Signal;

/// The member list shared by scopes and facades.
///
/// Members are kept in insertion order and never removed; adding the same
/// editable twice keeps both entries. Appends bump a revision signal, so a
/// derived flag reading the set picks up members added later.
#[derive(Clone)]
pub struct EditableSet {
    members: Arc<RwLock<Vec<Editable>>>,
    revision: Signal<usize>,
}

impl EditableSet {
    pub fn new() -> Self {
        Self {
            members: Arc::new(RwLock::new(Vec::new())),
            revision: Signal::new(0),
        }
    }

    pub fn push(&self, editable: Editable) {
        self.extend(std::iter::once(editable));
    }

    /// Append several members with a single notification.
    pub fn extend(&self, editables: impl IntoIterator<Item = Editable>) {
        let len = {
            let mut members = self.members.write();
            let before = members.len();
            members.extend(editables);
            if members.len() == before {
                return;
            }
            members.len()
        };
        self.revision.set(len);
    }

    /// Snapshot of the members, in insertion order.
    pub fn members(&self) -> Vec<Editable> {
        self.members.read().clone()
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn begin_edit(&self) {
        for editable in self.members() {
            editable.begin_edit();
        }
    }

    pub fn commit(&self) {
        for editable in self.members() {
            editable.commit();
        }
    }

    pub fn rollback(&self) {
        for editable in self.members() {
            editable.rollback();
        }
    }

    /// True as soon as one member reports changes; later members are not
    /// evaluated. Tracked inside a reactive context, including later
    /// appends.
    pub fn has_changes(&self) -> bool {
        self.revision.get();
        self.members().iter().any(Editable::has_changes)
    }
}

impl Default for EditableSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EditableSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.members()).finish()
    }
}
