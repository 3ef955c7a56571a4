//! A portable main queue for platforms without one.
//!
//! Any thread can become the main context by [attaching](MainQueue::attach) to a
//! [`MainQueue`] and then draining it through the returned [`MainLoop`].
//! Host applications typically do this on the thread that owns their UI or event loop:
//!
//! ```
//! use onmain::{MainQueue, MainThreadGuard};
//! use std::thread;
//!
//! let queue = MainQueue::new();
//! let main_loop = queue.attach().expect("no other thread is attached");
//! let guard = MainThreadGuard::new(&queue);
//!
//! thread::scope(|s| {
//!     s.spawn(|| guard.run_on_main(|| println!("hello from the main thread")));
//! });
//! assert_eq!(1, main_loop.run_pending());
//! ```

use crate::{AttachError, Closed, MainContext, Work};
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use timers::Timers;

mod timers;

/// Delays longer than this are shortened to it.
const MAX_DELAY: Duration = Duration::from_secs(60 * 60 * 24 * 365);

static GLOBAL: MainQueue = MainQueue::new();

/// A multi-producer, single-consumer FIFO queue of work for the main thread.
///
/// Work never runs while the queue's lock is held, so work items are free
/// to submit more work.
pub struct MainQueue {
    state: Mutex<State>,
    ready: Condvar,
}

struct State {
    owner: Option<ThreadId>,
    items: VecDeque<Work>,
    timers: Timers,
    closed: bool,
}

impl State {
    fn promote_due(&mut self, now: Instant) {
        let State { items, timers, .. } = self;
        items.extend(timers.pop_due(now));
    }

    fn has_runnable(&self, now: Instant) -> bool {
        !self.items.is_empty() || self.timers.next_deadline().is_some_and(|d| d <= now)
    }
}

impl MainQueue {
    pub const fn new() -> Self {
        MainQueue {
            state: Mutex::new(State {
                owner: None,
                items: VecDeque::new(),
                timers: Timers::new(),
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// The process-wide queue backing [`PlatformContext`](crate::PlatformContext)
    /// on platforms without a native main queue.
    pub fn global() -> &'static MainQueue {
        &GLOBAL
    }

    /// Designates the calling thread as the main context of this queue.
    ///
    /// Fails if a thread (including the calling one) is already attached.
    /// Work submitted before anyone attached stays queued and runs on the first drain.
    pub fn attach(&self) -> Result<MainLoop<'_>, AttachError> {
        let mut state = self.state();
        if let Some(owner) = state.owner {
            return Err(AttachError::new(owner));
        }
        state.owner = Some(thread::current().id());
        #[cfg(feature = "log")]
        log::debug!(
            "main queue attached to {:?} with {} pending item(s)",
            thread::current().id(),
            state.items.len() + state.timers.len()
        );
        Ok(MainLoop {
            queue: self,
            _not_send: PhantomData,
        })
    }

    /// Closes the queue for new work.
    ///
    /// Work that was already accepted, delayed work included, still runs.
    /// A [`MainLoop::run`] in progress returns once everything has been drained.
    pub fn shutdown(&self) {
        let mut state = self.state();
        state.closed = true;
        #[cfg(feature = "log")]
        log::debug!(
            "main queue shut down with {} pending item(s)",
            state.items.len() + state.timers.len()
        );
        drop(state);
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Number of items waiting to run, delayed ones included.
    pub fn len(&self) -> usize {
        let state = self.state();
        state.items.len() + state.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // Work never runs under the lock, a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pop(&self) -> Option<Work> {
        self.state().items.pop_front()
    }
}

impl Default for MainQueue {
    fn default() -> Self {
        MainQueue::new()
    }
}

impl fmt::Debug for MainQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("MainQueue")
            .field("owner", &state.owner)
            .field("queued", &state.items.len())
            .field("delayed", &state.timers.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl MainContext for MainQueue {
    fn is_current(&self) -> bool {
        self.state().owner == Some(thread::current().id())
    }

    fn submit(&self, work: Work) -> Result<(), Closed> {
        let mut state = self.state();
        if state.closed {
            return Err(Closed::new(work));
        }
        state.items.push_back(work);
        drop(state);
        self.ready.notify_all();
        Ok(())
    }

    fn submit_after(&self, delay: Duration, work: Work) -> Result<(), Closed> {
        if delay.is_zero() {
            return self.submit(work);
        }
        let mut state = self.state();
        if state.closed {
            return Err(Closed::new(work));
        }
        state
            .timers
            .push(Instant::now() + delay.min(MAX_DELAY), work);
        drop(state);
        self.ready.notify_all();
        Ok(())
    }
}

/// Proof of being attached to a [`MainQueue`], used to drain it.
///
/// Neither `Send` nor `Sync`: the queue can only be drained from the attached thread.
/// Dropping the `MainLoop` detaches the thread; pending work stays queued.
pub struct MainLoop<'q> {
    queue: &'q MainQueue,
    // Mark as !Send and !Sync.
    _not_send: PhantomData<*const ()>,
}

#[cfg(test)]
static_assertions::assert_not_impl_any!(MainLoop<'static>: Send, Sync);

impl<'q> MainLoop<'q> {
    pub fn queue(&self) -> &'q MainQueue {
        self.queue
    }

    /// Runs the work that is runnable right now, in FIFO order, and returns how many items ran.
    ///
    /// Delayed work whose delay has passed joins the back of the queue first.
    /// Work submitted while this pass is running waits for the next pass.
    ///
    /// A panic in a work item propagates out of this call; the items after it stay queued.
    pub fn run_pending(&self) -> usize {
        let due = {
            let mut state = self.queue.state();
            state.promote_due(Instant::now());
            state.items.len()
        };
        let mut ran = 0;
        while ran < due {
            let Some(work) = self.queue.pop() else {
                break;
            };
            work();
            ran += 1;
        }
        ran
    }

    /// Waits at most `timeout` for work to become runnable, then does one [`MainLoop::run_pending`] pass.
    pub fn run_timeout(&self, timeout: Duration) -> usize {
        self.wait(Instant::now().checked_add(timeout));
        self.run_pending()
    }

    /// Drains the queue until it has been [shut down](MainQueue::shutdown)
    /// and no queued or delayed work is left.
    pub fn run(&self) {
        while self.wait(None) {
            self.run_pending();
        }
    }

    /// Blocks until work is runnable or `until` has passed.
    /// Returns `false` if the queue is closed and nothing is left to run.
    fn wait(&self, until: Option<Instant>) -> bool {
        let mut state = self.queue.state();
        loop {
            let now = Instant::now();
            if state.has_runnable(now) {
                return true;
            }
            if state.closed && state.timers.is_empty() {
                return false;
            }
            if until.is_some_and(|until| until <= now) {
                return true;
            }
            let wake_at = match (state.timers.next_deadline(), until) {
                (Some(timer), Some(until)) => Some(timer.min(until)),
                (timer, until) => timer.or(until),
            };
            state = match wake_at {
                Some(wake_at) => {
                    self.queue
                        .ready
                        .wait_timeout(state, wake_at.saturating_duration_since(now))
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .queue
                    .ready
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }
}

impl Drop for MainLoop<'_> {
    fn drop(&mut self) {
        self.queue.state().owner = None;
        #[cfg(feature = "log")]
        log::debug!("main queue detached from {:?}", thread::current().id());
    }
}

impl fmt::Debug for MainLoop<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainLoop")
            .field("queue", self.queue)
            .finish()
    }
}
