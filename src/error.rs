use crate::Work;
use std::sync::{Mutex, PoisonError};
use std::thread::ThreadId;
use std::{error, fmt};

/// Returned when the main queue no longer accepts work,
/// e.g. after [`MainQueue::shutdown`](crate::MainQueue::shutdown).
///
/// The rejected work item was not invoked and can be recovered with [`Closed::into_inner`].
/// `Closed` is `Send` and `Sync`, so it fits into a `Box<dyn Error + Send + Sync>`.
pub struct Closed(Mutex<Work>);

#[cfg(test)]
static_assertions::assert_impl_all!(Closed: Send, Sync);

impl Closed {
    pub(crate) fn new(work: Work) -> Self {
        // The work is only reachable through `into_inner`, the mutex is never contended.
        Closed(Mutex::new(work))
    }

    /// Returns the work item that was rejected.
    pub fn into_inner(self) -> Work {
        self.0.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Closed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Closed").finish_non_exhaustive()
    }
}

impl fmt::Display for Closed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to submit work: the main queue is closed")
    }
}

impl error::Error for Closed {}

/// Returned by [`MainQueue::attach`](crate::MainQueue::attach) when a thread is already attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachError {
    owner: ThreadId,
}

impl AttachError {
    pub(crate) fn new(owner: ThreadId) -> Self {
        AttachError { owner }
    }

    /// The thread currently attached to the queue.
    pub fn owner(&self) -> ThreadId {
        self.owner
    }
}

impl fmt::Display for AttachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to attach: the main queue is already attached to {:?}",
            self.owner
        )
    }
}

impl error::Error for AttachError {}

/// The work behind a [`Completion`](crate::Completion) was dropped without completing.
///
/// This happens when the work panicked on the main context or when
/// the main queue was closed before the work could be submitted.
#[cfg(feature = "completion")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abandoned;

#[cfg(feature = "completion")]
impl fmt::Display for Abandoned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("work was dropped before it completed on the main thread")
    }
}

#[cfg(feature = "completion")]
impl error::Error for Abandoned {}
