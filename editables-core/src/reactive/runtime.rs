//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, memos, and
//! effects.
//!
//! # How It Works
//!
//! 1. Memos and effects register with the runtime when created. The runtime
//!    only holds weak references, so dropping the last handle of a node
//!    removes it.
//!
//! 2. When a memo or effect reads a source (a signal or another memo) the
//!    runtime records the edge `source -> subscriber`.
//!
//! 3. When a source changes, the runtime:
//!    a. Finds all live dependents
//!    b. Marks them as "maybe dirty" (memos cascade to their own dependents)
//!    c. Runs eager dependents (effects)
//!
//! Memos stay lazy: they only recompute on their next read.
//!
//! # Locking
//!
//! Notification snapshots the dependents and releases every runtime lock
//! before calling into them, so a dependent may read, write, or register
//! further nodes while it is being notified.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;
use smallvec::SmallVec;

use super::context::ReactiveContext;

/// Counter shared by every source (signals and memos), so their ids never
/// collide in the dependency table.
static SOURCE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique source ID.
pub(crate) fn next_source_id() -> u64 {
    SOURCE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Unique identifier for a subscriber (memo or effect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A trait for types that can be notified when dependencies change.
pub trait Reactive: Send + Sync {
    /// Get the subscriber ID for this reactive value.
    fn subscriber_id(&self) -> SubscriberId;

    /// Mark this reactive value as potentially needing update.
    fn mark_maybe_dirty(&self);

    /// Schedule this reactive value for execution (effects only).
    fn schedule(&self);

    /// Check if this reactive value is an effect (eager) or memo (lazy).
    fn is_eager(&self) -> bool;
}

/// Handle to a registered reactive value.
///
/// Dropping this handle unregisters the reactive value from the runtime.
pub struct ReactiveHandle {
    subscriber_id: SubscriberId,
}

impl Drop for ReactiveHandle {
    fn drop(&mut self) {
        Runtime::unregister(self.subscriber_id);
    }
}

type Subscribers = SmallVec<[SubscriberId; 4]>;
type Sources = SmallVec<[u64; 4]>;

/// Dependency edges, indexed from both ends so a subscriber's edges can be
/// dropped without scanning every source.
#[derive(Default)]
struct DependencyGraph {
    by_source: HashMap<u64, Subscribers>,
    by_subscriber: HashMap<SubscriberId, Sources>,
}

impl DependencyGraph {
    fn insert(&mut self, source_id: u64, subscriber_id: SubscriberId) {
        let subscribers = self.by_source.entry(source_id).or_default();
        if subscribers.contains(&subscriber_id) {
            return;
        }
        subscribers.push(subscriber_id);
        self.by_subscriber
            .entry(subscriber_id)
            .or_default()
            .push(source_id);
    }

    fn remove_subscriber(&mut self, subscriber_id: SubscriberId) {
        let Some(sources) = self.by_subscriber.remove(&subscriber_id) else {
            return;
        };
        for source_id in sources {
            if let Some(subscribers) = self.by_source.get_mut(&source_id) {
                subscribers.retain(|s| *s != subscriber_id);
                if subscribers.is_empty() {
                    self.by_source.remove(&source_id);
                }
            }
        }
    }
}

/// The global reactive runtime.
pub struct Runtime;

static REGISTRY: OnceLock<RwLock<HashMap<SubscriberId, Weak<dyn Reactive>>>> = OnceLock::new();
static DEPENDENCIES: OnceLock<RwLock<DependencyGraph>> = OnceLock::new();

fn get_registry() -> &'static RwLock<HashMap<SubscriberId, Weak<dyn Reactive>>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

fn get_dependencies() -> &'static RwLock<DependencyGraph> {
    DEPENDENCIES.get_or_init(|| RwLock::new(DependencyGraph::default()))
}

impl Runtime {
    /// Register a reactive value with the runtime.
    ///
    /// Returns a handle that unregisters the value when dropped.
    pub fn register(reactive: Arc<dyn Reactive>) -> ReactiveHandle {
        let id = reactive.subscriber_id();

        get_registry().write().insert(id, Arc::downgrade(&reactive));

        ReactiveHandle { subscriber_id: id }
    }

    fn unregister(id: SubscriberId) {
        get_registry().write().remove(&id);
        Self::clear_dependencies(id);
    }

    /// Record that a subscriber depends on a source.
    pub fn add_dependency(source_id: u64, subscriber_id: SubscriberId) {
        get_dependencies().write().insert(source_id, subscriber_id);
    }

    /// Remove all dependencies for a subscriber.
    ///
    /// Called before re-running a computation to clear stale edges. Costs
    /// the number of sources the subscriber read, not the size of the table.
    pub fn clear_dependencies(subscriber_id: SubscriberId) {
        get_dependencies().write().remove_subscriber(subscriber_id);
    }

    /// Notify all dependents that a source changed.
    pub fn notify_signal_change(source_id: u64) {
        let subscriber_ids: Subscribers = get_dependencies()
            .read()
            .by_source
            .get(&source_id)
            .cloned()
            .unwrap_or_default();

        if subscriber_ids.is_empty() {
            return;
        }

        let reactives: Vec<Arc<dyn Reactive>> = {
            let registry = get_registry().read();
            subscriber_ids
                .iter()
                .filter_map(|id| registry.get(id).and_then(Weak::upgrade))
                .collect()
        };

        let mut effects_to_run = Vec::new();
        for reactive in reactives {
            reactive.mark_maybe_dirty();
            if reactive.is_eager() {
                effects_to_run.push(reactive);
            }
        }

        for effect in effects_to_run {
            effect.schedule();
        }
    }

    /// Number of subscribers currently recorded for a source.
    pub fn dependent_count(source_id: u64) -> usize {
        get_dependencies()
            .read()
            .by_source
            .get(&source_id)
            .map_or(0, |subs| subs.len())
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if we're inside a reactive context.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}
