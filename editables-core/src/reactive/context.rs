//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! When a signal or memo is read, the running computation is registered as
//! one of its dependents.
//!
//! # Implementation
//!
//! A thread-local stack holds the computations in flight. Entering a memo or
//! effect pushes an entry; dropping the guard pops it. Nested computations
//! (a memo reading another memo) push their own entries.
//!
//! Reads that must not subscribe, such as capturing a transaction baseline or
//! walking an object graph, go through [`ReactiveContext::untracked`], which
//! pushes a suspension marker that hides the enclosing computation.

use std::cell::RefCell;

use super::SubscriberId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Clone)]
enum ContextEntry {
    /// A computation collecting the source ids it reads.
    Tracking {
        subscriber_id: SubscriberId,
        dependencies: Vec<u64>,
    },
    /// Tracking suspended until the matching guard drops.
    Suspended,
}

/// Guard that pops the context when dropped.
///
/// Popping on drop keeps the stack balanced even if the computation panics.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// While the returned guard is alive, reads register `subscriber_id` as
    /// a dependent of whatever they read.
    pub fn enter(subscriber_id: SubscriberId) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry::Tracking {
                subscriber_id,
                dependencies: Vec::new(),
            });
        });

        Self {
            subscriber_id: Some(subscriber_id),
        }
    }

    /// Run `f` with dependency tracking suspended.
    pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(ContextEntry::Suspended));
        let _guard = Self {
            subscriber_id: None,
        };
        f()
    }

    /// Check if there is an active tracking context.
    pub fn is_active() -> bool {
        Self::current_subscriber().is_some()
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| match stack.borrow().last() {
            Some(ContextEntry::Tracking { subscriber_id, .. }) => Some(*subscriber_id),
            _ => None,
        })
    }

    /// Record a dependency on the given source.
    ///
    /// Repeated reads of the same source within one computation are
    /// recorded once.
    pub fn track_dependency(source_id: u64) {
        CONTEXT_STACK.with(|stack| {
            if let Some(ContextEntry::Tracking { dependencies, .. }) = stack.borrow_mut().last_mut() {
                if !dependencies.contains(&source_id) {
                    dependencies.push(source_id);
                }
            }
        });
    }

    /// Get the dependencies collected in the current context.
    pub fn get_dependencies() -> Vec<u64> {
        CONTEXT_STACK.with(|stack| match stack.borrow().last() {
            Some(ContextEntry::Tracking { dependencies, .. }) => dependencies.clone(),
            _ => Vec::new(),
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                let popped_id = match entry {
                    ContextEntry::Tracking { subscriber_id, .. } => Some(subscriber_id),
                    ContextEntry::Suspended => None,
                };
                debug_assert_eq!(
                    popped_id, self.subscriber_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.subscriber_id, popped_id
                );
            }
        });
    }
}
