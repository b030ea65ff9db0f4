//! Throttled derived values.
//!
//! A [`Throttled`] mirrors a memo into an output signal, but collapses every
//! notification that arrives within `delay` of the first one into a single
//! trailing update. Consumers that redraw on each notification see one
//! change per burst instead of one per underlying write.
//!
//! The trailing update is a tokio timer spawned on the ambient runtime.
//! Outside a tokio runtime, or with a zero delay, updates are delivered
//! synchronously. The output is only written when the value actually changed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use super::{Effect, Memo, ReactiveContext, Signal};

/// A memo whose changes are coalesced over a time window.
pub struct Throttled<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    output: Signal<T>,
    delay: Duration,
    _watch: Effect,
}

impl<T> Throttled<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Start mirroring `source` with the given coalescing window.
    pub fn new(source: Memo<T>, delay: Duration) -> Self {
        let output = Signal::new(ReactiveContext::untracked(|| source.get()));
        let pending = Arc::new(AtomicBool::new(false));
        let primed = AtomicBool::new(false);

        let watch = {
            let output = output.clone();
            Effect::new(move || {
                let value = source.get();
                // The first run only subscribes; the output already holds it.
                if !primed.swap(true, Ordering::SeqCst) {
                    return;
                }
                if delay.is_zero() {
                    publish(&output, value);
                    return;
                }
                if pending.swap(true, Ordering::SeqCst) {
                    return;
                }

                match Handle::try_current() {
                    Ok(handle) => {
                        let output = output.clone();
                        let source = source.clone();
                        let pending = Arc::clone(&pending);
                        handle.spawn(async move {
                            tokio::time::sleep(delay).await;
                            pending.store(false, Ordering::SeqCst);
                            let latest = ReactiveContext::untracked(|| source.get());
                            publish(&output, latest);
                        });
                    }
                    Err(_) => {
                        tracing::trace!("no tokio runtime, publishing throttled value synchronously");
                        pending.store(false, Ordering::SeqCst);
                        publish(&output, value);
                    }
                }
            })
        };

        Self {
            output,
            delay,
            _watch: watch,
        }
    }

    /// Current published value. Tracked when read inside a reactive context.
    pub fn get(&self) -> T {
        self.output.get()
    }

    /// The output signal, for subscribing to published changes.
    pub fn signal(&self) -> &Signal<T> {
        &self.output
    }

    /// The coalescing window.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

fn publish<T>(output: &Signal<T>, value: T)
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    if output.get_untracked() != value {
        output.set(value);
    }
}
