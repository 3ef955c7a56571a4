use crate::Work;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const PENDING: u8 = 0;
const STARTED: u8 = 1;
const CANCELLED: u8 = 2;

/// A handle to work scheduled with [`run_on_main_after`](crate::run_on_main_after).
///
/// Dropping the handle does *not* cancel the work.
#[derive(Debug, Clone)]
#[must_use = "dropping a `Delayed` does not cancel it, use `let _ = ...` if this is intended"]
pub struct Delayed {
    state: Arc<AtomicU8>,
}

#[cfg(test)]
static_assertions::assert_impl_all!(Delayed: Send, Sync);

impl Delayed {
    /// Wraps `work` so that it only runs if it has not been cancelled through the returned handle.
    pub(crate) fn wrap(work: impl FnOnce() + Send + 'static) -> (Self, Work) {
        let state = Arc::new(AtomicU8::new(PENDING));
        let handle = Delayed {
            state: Arc::clone(&state),
        };
        let work = Box::new(move || {
            if state
                .compare_exchange(PENDING, STARTED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                work();
            }
        });
        (handle, work)
    }

    /// Prevents the work from running.
    ///
    /// Returns `true` if the work had not started yet and now never will,
    /// `false` if it already started or was cancelled before.
    pub fn cancel(&self) -> bool {
        self.state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }

    /// Returns `true` once the work has begun executing on the main thread.
    pub fn has_started(&self) -> bool {
        self.state.load(Ordering::Acquire) == STARTED
    }
}
