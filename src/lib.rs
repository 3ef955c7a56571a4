#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![forbid(
    clippy::dbg_macro,
    clippy::missing_safety_doc,
    clippy::unnecessary_safety_comment,
    clippy::unnecessary_safety_doc,
    unsafe_op_in_unsafe_fn
)]
#![deny(clippy::unwrap_used)]

//! Run closures on the main thread, from anywhere.
//!
//! UI toolkits insist that their objects are only touched from the main thread.
//! [`run_on_main`] takes care of getting there:
//! * Called on the main thread, the closure runs right away, before `run_on_main` returns.
//! * Called on any other thread, the closure is queued for the main thread and
//!   `run_on_main` returns immediately.
//!
//! Either way the closure runs exactly once, and closures queued from one thread
//! run in the order they were queued.
//!
//! ## Example
//! ```no_run
//! use std::thread;
//!
//! thread::spawn(|| {
//!     let thumbnail = vec![0u8; 64 * 64];
//!     onmain::run_on_main(move || {
//!         // Safe to touch UI state here.
//!         eprintln!("thumbnail ready: {} bytes", thumbnail.len());
//!     });
//! });
//! ```
//!
//! ## Platforms
//! * Apple platforms: work is queued on the main dispatch queue, which the
//!   application's run loop drains.
//! * Web: work is queued for the thread that owns the `Window`.
//! * Everywhere else: there is no system-wide main queue, so the application
//!   [attaches](MainQueue::attach) one of its threads to [`MainQueue::global()`]
//!   and drains it from its event loop.
//!
//! The decision between running inline and queueing is made by a [`MainThreadGuard`],
//! which works with any [`MainContext`]. The free functions of this crate use the
//! [`PlatformContext`].
//!
//! ## Errors
//! [`run_on_main`] never fails. If the main queue has been shut down the closure is
//! dropped without running (turn on the `log` feature to see a warning). Use
//! [`try_run_on_main`] to get the closure back instead.
//!
//! Panics are not caught: on the main thread they unwind into the caller of
//! [`run_on_main`], queued closures unwind out of whatever drains the queue.

use std::time::Duration;

mod context;
pub use context::*;
mod delayed;
pub use delayed::*;
mod error;
pub use error::*;
mod guard;
pub use guard::*;
mod queue;
pub use queue::*;
#[cfg(feature = "completion")]
mod completion;
#[cfg(feature = "completion")]
pub use completion::*;
#[cfg(all(feature = "web", any(test, all(target_family = "wasm", target_os = "unknown"))))]
mod main_zone;

cfg_if::cfg_if! {
    if #[cfg(all(target_vendor = "apple", feature = "gcd"))] {
        mod apple;
        use apple as imp;
    } else if #[cfg(all(target_family = "wasm", target_os = "unknown", feature = "web"))] {
        mod web;
        use web as imp;
    } else {
        mod fallback;
        use fallback as imp;
    }
}

/// Contains platform-specific functionality.
pub mod platform {
    /// Functionality only available when using Grand Central Dispatch.
    #[cfg(all(target_vendor = "apple", feature = "gcd"))]
    pub mod apple {
        use objc2_foundation::MainThreadMarker;

        /// Runs `f` on the main thread and hands it a [`MainThreadMarker`],
        /// so it can use APIs that require one.
        ///
        /// Runs `f` inline if called on the main thread, otherwise queues it on the main dispatch queue.
        pub fn run_on_main_with_marker(f: impl FnOnce(MainThreadMarker) + Send + 'static) {
            crate::apple::run_on_main_with_marker(f)
        }
    }

    /// Functionality only available in the browser.
    #[cfg(any(doc, all(target_family = "wasm", target_os = "unknown")))]
    #[cfg_attr(docsrs, doc(cfg(all(target_family = "wasm", target_os = "unknown"))))]
    pub mod web {
        /// Sets up the task that runs queued work on the main thread.
        ///
        /// This happens automatically the first time the main thread calls into this crate.
        /// Work queued from a worker before that is kept and runs once the main thread
        /// sets up the task, so calling this early only makes that happen sooner.
        ///
        /// Returns `false` if not called from the main thread.
        pub fn init() -> bool {
            #[cfg(all(target_family = "wasm", target_os = "unknown", feature = "web"))]
            return crate::imp::init();
            #[cfg(not(all(target_family = "wasm", target_os = "unknown", feature = "web")))]
            return false;
        }
    }
}

/// # Feature Flags
///
/// * `log`—Enable logging through the [`log`](https://docs.rs/log) facade.
/// * `completion`—Enable [`run_on_main_with_completion`] (*default*).
/// * `gcd`—Use the main dispatch queue on Apple platforms (*default*).
///   Without it, the portable [`MainQueue`] is used there too.
/// * `web`—Use the browser's main thread on `wasm32-unknown-unknown` (*default*).
///   Without it, the portable [`MainQueue`] is used there too.
#[cfg(doc)]
#[cfg_attr(docsrs, doc(cfg(doc)))]
pub mod feature_flags {}

#[cfg(doctest)]
#[doc = include_str!("../readme.md")]
pub mod readme_doctest {}

/// The main execution context of this platform, see [Platforms](crate#platforms).
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformContext {
    _private: (),
}

impl PlatformContext {
    pub const fn new() -> Self {
        PlatformContext { _private: () }
    }
}

impl MainContext for PlatformContext {
    fn is_current(&self) -> bool {
        imp::is_main_thread()
    }

    fn submit(&self, work: Work) -> Result<(), Closed> {
        imp::submit(work)
    }

    fn submit_after(&self, delay: Duration, work: Work) -> Result<(), Closed> {
        imp::submit_after(delay, work)
    }
}

static GUARD: MainThreadGuard<PlatformContext> = MainThreadGuard::new(PlatformContext::new());

#[cfg(test)]
static_assertions::assert_impl_all!(MainThreadGuard<PlatformContext>: Send, Sync);
#[cfg(test)]
static_assertions::assert_impl_all!(MainQueue: Send, Sync);

/// Returns `true` if called on the main thread.
pub fn is_main_thread() -> bool {
    GUARD.is_main_thread()
}

/// Runs `work` on the main thread: right away if called there, queued otherwise.
///
/// If the main queue has been shut down, `work` is dropped without running. This is
/// silent unless the `log` feature is enabled; use [`try_run_on_main`] to notice it.
///
/// See [`MainThreadGuard::run_on_main`].
pub fn run_on_main(work: impl FnOnce() + Send + 'static) {
    GUARD.run_on_main(work)
}

/// Like [`run_on_main`], but reports whether `work` ran inline or was queued,
/// and hands it back if the main queue is closed.
pub fn try_run_on_main(work: impl FnOnce() + Send + 'static) -> Result<Dispatch, Closed> {
    GUARD.try_run_on_main(work)
}

/// Queues `work` for the main thread, even when called on the main thread.
pub fn defer(work: impl FnOnce() + Send + 'static) -> Result<(), Closed> {
    GUARD.defer(work)
}

/// Runs `work` on the main thread once `delay` has passed, unless cancelled through the returned handle.
pub fn run_on_main_after(delay: Duration, work: impl FnOnce() + Send + 'static) -> Delayed {
    GUARD.run_on_main_after(delay, work)
}

/// Runs `work` on the main thread and returns a future resolving to its result.
///
/// See [`MainThreadGuard::run_on_main_with_completion`].
#[cfg(feature = "completion")]
pub fn run_on_main_with_completion<T>(work: impl FnOnce() -> T + Send + 'static) -> Completion<T>
where
    T: Send + 'static,
{
    GUARD.run_on_main_with_completion(work)
}

// The global queue is shared by the whole test binary, so this is the only test touching it.
#[cfg(all(
    test,
    not(all(target_vendor = "apple", feature = "gcd")),
    not(all(target_family = "wasm", target_os = "unknown", feature = "web"))
))]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn free_functions_use_the_global_queue() {
        let main_loop = MainQueue::global().attach().expect("not attached yet");
        assert!(is_main_thread());

        let count = Arc::new(AtomicUsize::new(0));
        let increment = || {
            let count = Arc::clone(&count);
            move || {
                count.fetch_add(1, Ordering::SeqCst);
            }
        };

        run_on_main(increment());
        assert_eq!(1, count.load(Ordering::SeqCst));
        assert_eq!(Ok(Dispatch::Inline), try_run_on_main(increment()).map_err(drop));
        assert_eq!(2, count.load(Ordering::SeqCst));

        defer(increment()).expect("queue is open");
        let _delayed = run_on_main_after(Duration::from_millis(1), increment());
        thread::scope(|s| {
            s.spawn(|| {
                assert!(!is_main_thread());
                for _ in 0..10 {
                    run_on_main(increment());
                }
            });
        });
        assert_eq!(2, count.load(Ordering::SeqCst));

        // 10 from the other thread, the deferred one and the delayed one.
        let mut ran = main_loop.run_pending();
        for _ in 0..100 {
            if ran >= 12 {
                break;
            }
            ran += main_loop.run_timeout(Duration::from_millis(10));
        }
        assert_eq!(12, ran);
        assert_eq!(14, count.load(Ordering::SeqCst));

        #[cfg(feature = "completion")]
        assert_eq!(Ok(7), run_on_main_with_completion(|| 7).wait());
    }
}
