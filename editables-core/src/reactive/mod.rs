//! Reactive Primitives
//!
//! This module implements the reactive cells the editable layer is built on:
//! signals, memos, and effects.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (such as a memo or effect), the signal
//! registers that context as a dependent. When the signal's value changes,
//! all dependents are notified.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result. Evaluation is deferred
//! until the first read and repeated only after one of its dependencies
//! changed. Transaction change flags are memos.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change. [`Throttled`] uses one to republish a memo at a
//! bounded rate.
//!
//! # Implementation Notes
//!
//! A thread-local tracking context detects dependencies automatically: when
//! a signal is read, we check if there is an active tracking context and, if
//! so, register the dependency with the [`Runtime`].

mod context;
mod effect;
mod memo;
mod runtime;
mod signal;
mod throttle;

pub use context::ReactiveContext;
pub use effect::Effect;
pub use memo::{Memo, MemoState};
pub use runtime::{Reactive, ReactiveHandle, Runtime, SubscriberId};
pub use signal::Signal;
pub use throttle::Throttled;
