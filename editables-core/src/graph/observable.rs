//! Writable observable cells.

use std::fmt;
use std::sync::{Arc, OnceLock};

use super::Value;
use crate::editable::{EditOptions, Editable};
use crate::reactive::Signal;

/// A writable observable cell holding a [`Value`].
///
/// Besides the signal it carries the editable marker: the transactional
/// extension installed by [`Observable::extend`] or a registry. Clones share
/// both.
#[derive(Clone)]
pub struct Observable {
    signal: Signal<Value>,
    editable: Arc<OnceLock<Editable>>,
}

impl Observable {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            signal: Signal::new(value.into()),
            editable: Arc::new(OnceLock::new()),
        }
    }

    /// Identity of the underlying signal.
    pub fn id(&self) -> u64 {
        self.signal.id()
    }

    /// Read the value; tracked inside a reactive context.
    pub fn get(&self) -> Value {
        self.signal.get()
    }

    pub fn get_untracked(&self) -> Value {
        self.signal.get_untracked()
    }

    /// Write the value and notify dependents.
    pub fn set(&self, value: impl Into<Value>) {
        self.signal.set(value.into());
    }

    pub fn signal(&self) -> &Signal<Value> {
        &self.signal
    }

    /// The editable extension, if the cell was ever extended.
    pub fn editable(&self) -> Option<Editable> {
        self.editable.get().cloned()
    }

    /// Extend this cell through the process-wide registry.
    pub fn extend(&self, options: impl Into<EditOptions>) -> Editable {
        crate::registry().extend(self, options)
    }

    pub(crate) fn editable_slot(&self) -> &OnceLock<Editable> {
        &self.editable
    }
}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("id", &self.id())
            .field("value", &self.get_untracked())
            .field("editable", &self.editable().map(|e| e.is_enabled()))
            .finish()
    }
}
