use crate::Closed;
use std::sync::Arc;
use std::time::Duration;

/// A unit of work on its way to the main context.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// The main execution context as seen by a [`MainThreadGuard`](crate::MainThreadGuard).
///
/// Implementors answer whether the calling thread *is* the main context and accept
/// work for it. Submissions must be safe from any number of threads at once and
/// must be executed in the order they were submitted.
///
/// The crate ships [`PlatformContext`](crate::PlatformContext) and
/// [`MainQueue`](crate::MainQueue). Tests can implement this trait to
/// substitute a fake notion of "current thread".
pub trait MainContext {
    /// Returns `true` if the calling thread is the main context.
    fn is_current(&self) -> bool;

    /// Hands `work` to the main context. It must be invoked exactly once, later,
    /// on the main context.
    fn submit(&self, work: Work) -> Result<(), Closed>;

    /// Like [`MainContext::submit`], but the work becomes runnable only once
    /// `delay` has passed.
    fn submit_after(&self, delay: Duration, work: Work) -> Result<(), Closed>;
}

impl<C: MainContext + ?Sized> MainContext for &C {
    fn is_current(&self) -> bool {
        (**self).is_current()
    }

    fn submit(&self, work: Work) -> Result<(), Closed> {
        (**self).submit(work)
    }

    fn submit_after(&self, delay: Duration, work: Work) -> Result<(), Closed> {
        (**self).submit_after(delay, work)
    }
}

impl<C: MainContext + ?Sized> MainContext for Arc<C> {
    fn is_current(&self) -> bool {
        (**self).is_current()
    }

    fn submit(&self, work: Work) -> Result<(), Closed> {
        (**self).submit(work)
    }

    fn submit_after(&self, delay: Duration, work: Work) -> Result<(), Closed> {
        (**self).submit_after(delay, work)
    }
}
