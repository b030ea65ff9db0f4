//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (memo/effect), the
//!    runtime records that context as a dependent. The edge goes away when
//!    the computation re-runs or is dropped.
//!
//! 2. When a signal's value changes, local callbacks run first, then the
//!    runtime marks every dependent memo and runs every dependent effect.
//!
//! # Thread Safety
//!
//! The value sits behind a `parking_lot::RwLock`. No lock is held while
//! subscribers are notified, so a callback may freely read or write the
//! signal that woke it.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::runtime::{next_source_id, Runtime};
use super::SubscriberId;

type Notifier = Arc<dyn Fn() + Send + Sync>;

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust
/// use editables_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Unique identifier for this signal.
    id: u64,

    value: Arc<RwLock<T>>,

    /// Explicit notification callbacks.
    notifiers: Arc<RwLock<Vec<(SubscriberId, Notifier)>>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: next_source_id(),
            value: Arc::new(RwLock::new(value)),
            notifiers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a subscriber.
    pub fn get(&self) -> T {
        if let Some(subscriber_id) = ReactiveContext::current_subscriber() {
            ReactiveContext::track_dependency(self.id);
            Runtime::add_dependency(self.id, subscriber_id);
        }

        self.value.read().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Set a new value and notify subscribers.
    pub fn set(&self, value: T) {
        *self.value.write() = value;

        self.notify_subscribers();
        Runtime::notify_signal_change(self.id);
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = {
            let guard = self.value.read();
            f(&guard)
        };
        self.set(new_value);
    }

    /// Register a notification callback for a subscriber.
    ///
    /// The callback will be invoked when the signal's value changes.
    pub fn subscribe<F>(&self, subscriber_id: SubscriberId, notify: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.notifiers.write().push((subscriber_id, Arc::new(notify)));
    }

    /// Remove a subscriber.
    pub fn unsubscribe(&self, subscriber_id: SubscriberId) {
        self.notifiers.write().retain(|(id, _)| *id != subscriber_id);
    }

    fn notify_subscribers(&self) {
        let notifiers: Vec<Notifier> = self
            .notifiers
            .read()
            .iter()
            .map(|(_, notify)| Arc::clone(notify))
            .collect();
        for notify in notifiers {
            notify();
        }
    }

    /// Get the number of subscribers: registered callbacks plus the live
    /// computations that read this signal in their last run.
    pub fn subscriber_count(&self) -> usize {
        self.notifiers.read().len() + Runtime::dependent_count(self.id)
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
            notifiers: Arc::clone(&self.notifiers),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &self.get_untracked())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get(), 0);

        signal.set(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let signal = Signal::new(vec![1, 2]);
        signal.update(|v| {
            let mut next = v.clone();
            next.push(3);
            next
        });
        assert_eq!(signal.get(), vec![1, 2, 3]);
    }

    #[test]
    fn unsubscribed_callback_stops_firing() {
        let signal = Signal::new(0);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let subscriber_id = SubscriberId::new();
        signal.subscribe(subscriber_id, move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        signal.set(1);
        signal.set(2);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);

        signal.unsubscribe(subscriber_id);
        signal.set(3);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn callback_may_read_the_signal_it_watches() {
        let signal = Signal::new(0);
        let seen = Arc::new(AtomicI32::new(-1));

        let reader = signal.clone();
        let seen_clone = seen.clone();
        signal.subscribe(SubscriberId::new(), move || {
            seen_clone.store(reader.get(), Ordering::SeqCst);
        });

        signal.set(9);
        assert_eq!(seen.load(Ordering::SeqCst), 9);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);
        assert_eq!(signal1.id(), signal2.id());
    }

    #[test]
    fn dropped_readers_stop_counting() {
        let signal = Signal::new(1);
        let reader = signal.clone();
        let memo = crate::reactive::Memo::new(move || reader.get() + 1);

        assert_eq!(memo.get(), 2);
        assert_eq!(signal.subscriber_count(), 1);

        drop(memo);
        assert_eq!(signal.subscriber_count(), 0);

        let id = SubscriberId::new();
        signal.subscribe(id, || {});
        assert_eq!(signal.subscriber_count(), 1);
        signal.unsubscribe(id);
        assert_eq!(signal.subscriber_count(), 0);
    }
}
