//! Discovery of editable cells in an object graph.
//!
//! The walk enumerates every property of an object. Writable observables
//! are extended under the walk's scope; then each property is unwrapped and,
//! if it holds an object (directly, through a cell, or inside an array),
//! the walk descends into it. Plain objects therefore expose the cells
//! nested beneath them.
//!
//! A visited set keyed by identity bounds the walk: every cell and every
//! object instance is processed at most once, so cyclic graphs terminate
//! and a cell reachable along several paths is collected once.

use std::collections::HashSet;

use super::{Object, Value};
use crate::editable::{EditOptions, Editable, ScopeId, ScopeRegistry};
use crate::reactive::ReactiveContext;

/// Identity of a node seen during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    Cell(u64),
    Object(usize),
}

/// Identities already processed by a walk.
#[derive(Debug, Default)]
pub struct Visited {
    seen: HashSet<Identity>,
}

impl Visited {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `identity`; false if it was already present.
    pub fn insert(&mut self, identity: Identity) -> bool {
        self.seen.insert(identity)
    }

    pub fn contains(&self, identity: Identity) -> bool {
        self.seen.contains(&identity)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

struct GraphWalker<'a> {
    registry: &'a ScopeRegistry,
    scope: &'a ScopeId,
    collector: &'a mut Vec<Editable>,
    visited: &'a mut Visited,
}

impl GraphWalker<'_> {
    fn walk_object(&mut self, object: &Object) {
        for (name, property) in object.properties() {
            if let Some(cell) = property.as_writable() {
                if !self.visited.insert(Identity::Cell(cell.id())) {
                    continue;
                }
                let editable = self.registry.extend(cell, EditOptions::in_scope(self.scope));
                if editable.is_enabled() {
                    tracing::trace!(property = %name, cell = cell.id(), "found editable");
                    self.collector.push(editable);
                }
            }
            self.walk_value(&property.unwrap_value());
        }
    }

    fn walk_value(&mut self, value: &Value) {
        match value {
            Value::Object(object) => {
                if self.visited.insert(Identity::Object(object.identity())) {
                    self.walk_object(object);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.walk_value(item);
                }
            }
            _ => {}
        }
    }
}

/// Extend every writable cell reachable from `root` under `scope`, appending
/// the enabled ones to `collector`.
///
/// `visited` may be shared between walks to skip already processed nodes.
/// The walk reads cells without subscribing any running computation.
pub fn make_editable(
    registry: &ScopeRegistry,
    root: &Object,
    scope: &ScopeId,
    collector: &mut Vec<Editable>,
    visited: &mut Visited,
) {
    if !visited.insert(Identity::Object(root.identity())) {
        return;
    }

    ReactiveContext::untracked(|| {
        GraphWalker {
            registry,
            scope,
            collector,
            visited,
        }
        .walk_object(root);
    });
}
