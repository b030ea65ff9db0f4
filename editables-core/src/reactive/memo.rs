//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Memos Work
//!
//! 1. Creation does not evaluate anything (deferred evaluation).
//!
//! 2. On first access, the memo runs its computation inside a reactive
//!    context, records what it read and caches the result.
//!
//! 3. When a dependency changes, the runtime marks the memo "maybe dirty".
//!    A memo that goes from clean to dirty forwards the notification to its
//!    own dependents, so chains of memos invalidate without manual wiring.
//!
//! 4. The next access recomputes. Memos that are never read stay dirty and
//!    cost nothing.
//!
//! # Thread Safety
//!
//! Cached value and state live behind locks, but the computation itself runs
//! with no lock held. A reader racing a recomputation sees either the
//! previous complete value or the new one.

use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::runtime::{next_source_id, Reactive, ReactiveHandle, Runtime, SubscriberId};

/// Dirty state for a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// The cached value is up-to-date.
    Clean,

    /// A dependency might have changed. Need to check.
    MaybeDirty,

    /// The memo definitely needs to recompute.
    Dirty,
}

struct MemoInner<T> {
    id: u64,
    subscriber_id: SubscriberId,
    compute: Box<dyn Fn() -> T + Send + Sync>,
    value: RwLock<Option<T>>,
    state: RwLock<MemoState>,
    /// Source ids read during the last computation.
    dependencies: RwLock<HashSet<u64>>,
}

impl<T> MemoInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn recompute(&self) -> T {
        // Clean before running: a dependency written mid-computation marks
        // the memo dirty again instead of being lost.
        *self.state.write() = MemoState::Clean;
        Runtime::clear_dependencies(self.subscriber_id);

        let (new_value, deps) = {
            let _ctx = ReactiveContext::enter(self.subscriber_id);
            let value = (self.compute)();
            (value, ReactiveContext::get_dependencies())
        };

        *self.dependencies.write() = deps.into_iter().collect();
        *self.value.write() = Some(new_value.clone());

        new_value
    }

    /// Move to `next`, forwarding the change to dependents if the memo was
    /// clean.
    fn invalidate(&self, next: MemoState) {
        let was_clean = {
            let mut state = self.state.write();
            let was_clean = *state == MemoState::Clean;
            if was_clean || next == MemoState::Dirty {
                *state = next;
            }
            was_clean
        };

        if was_clean {
            Runtime::notify_signal_change(self.id);
        }
    }
}

impl<T> Reactive for MemoInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn mark_maybe_dirty(&self) {
        self.invalidate(MemoState::MaybeDirty);
    }

    fn schedule(&self) {}

    fn is_eager(&self) -> bool {
        false
    }
}

/// A cached derived value that recomputes only when dependencies change.
///
/// Clones share the cache; the memo unregisters from the runtime when the
/// last clone is dropped.
pub struct Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<MemoInner<T>>,
    _handle: Arc<ReactiveHandle>,
}

impl<T> Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new memo with the given computation function.
    ///
    /// The computation is not run immediately. It runs on first access.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new(MemoInner {
            id: next_source_id(),
            subscriber_id: SubscriberId::new(),
            compute: Box::new(compute),
            value: RwLock::new(None),
            state: RwLock::new(MemoState::Dirty),
            dependencies: RwLock::new(HashSet::new()),
        });
        let handle = Runtime::register(inner.clone());

        Self {
            inner,
            _handle: Arc::new(handle),
        }
    }

    /// Get the memo's source ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Get the subscriber ID for this memo.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Get the current value, recomputing if necessary.
    ///
    /// Inside a reactive context the running computation becomes a
    /// dependent of this memo.
    pub fn get(&self) -> T {
        if let Some(current) = ReactiveContext::current_subscriber() {
            ReactiveContext::track_dependency(self.inner.id);
            Runtime::add_dependency(self.inner.id, current);
        }

        if self.state() == MemoState::Clean {
            if let Some(value) = self.inner.value.read().clone() {
                return value;
            }
        }

        self.inner.recompute()
    }

    /// Mark the memo as potentially needing recomputation.
    pub fn mark_maybe_dirty(&self) {
        self.inner.invalidate(MemoState::MaybeDirty);
    }

    /// Mark the memo as definitely needing recomputation.
    pub fn mark_dirty(&self) {
        self.inner.invalidate(MemoState::Dirty);
    }

    /// Get the current dirty state.
    pub fn state(&self) -> MemoState {
        *self.inner.state.read()
    }

    /// Number of sources read during the last computation.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.read().len()
    }

    /// Number of computations currently depending on this memo.
    pub fn dependent_count(&self) -> usize {
        Runtime::dependent_count(self.inner.id)
    }

    /// Check if the memo has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.read().is_some()
    }
}

impl<T> Clone for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _handle: Arc::clone(&self._handle),
        }
    }
}

impl<T> Debug for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("has_value", &self.has_value())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}
