use crate::{Closed, Delayed, MainContext};
use std::time::Duration;

/// Which way [`MainThreadGuard::try_run_on_main`] ran the work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The caller was on the main context and the work already ran.
    Inline,
    /// The work was handed to the main queue and will run later.
    Deferred,
}

/// Makes sure work runs on the main context of `C`.
///
/// Work submitted from the main context runs inline, before the call returns.
/// Work submitted from any other thread is queued and the call returns immediately.
/// Since the inline path never touches the queue, work running on the main context
/// can call back into the guard without deadlocking.
#[derive(Debug, Clone, Copy, Default)]
pub struct MainThreadGuard<C> {
    context: C,
}

impl<C: MainContext> MainThreadGuard<C> {
    pub const fn new(context: C) -> Self {
        MainThreadGuard { context }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    /// Returns `true` if the calling thread is the main context.
    pub fn is_main_thread(&self) -> bool {
        self.context.is_current()
    }

    /// Runs `work` on the main context.
    ///
    /// On the main context this calls `work` directly and a panic in it unwinds into the caller.
    /// Anywhere else, `work` is queued and this returns without waiting for it.
    ///
    /// If the main queue is closed the work is dropped without running. Without the `log`
    /// feature nothing reports this, the call is a silent no-op.
    /// Use [`MainThreadGuard::try_run_on_main`] to get the work back instead.
    pub fn run_on_main(&self, work: impl FnOnce() + Send + 'static) {
        if let Err(closed) = self.try_run_on_main(work) {
            log_dropped_work(&closed);
        }
    }

    /// Like [`MainThreadGuard::run_on_main`], but reports how the work was run
    /// and hands the work back if the main queue is closed.
    pub fn try_run_on_main(&self, work: impl FnOnce() + Send + 'static) -> Result<Dispatch, Closed> {
        if self.context.is_current() {
            work();
            Ok(Dispatch::Inline)
        } else {
            self.context.submit(Box::new(work))?;
            Ok(Dispatch::Deferred)
        }
    }

    /// Queues `work` for the main context, even when called from it.
    ///
    /// The work runs after everything already queued, and never inline.
    pub fn defer(&self, work: impl FnOnce() + Send + 'static) -> Result<(), Closed> {
        self.context.submit(Box::new(work))
    }

    /// Runs `work` on the main context once `delay` has passed.
    ///
    /// The work is always queued, even when called from the main context.
    /// It can be cancelled through the returned [`Delayed`] until it starts.
    pub fn run_on_main_after(
        &self,
        delay: Duration,
        work: impl FnOnce() + Send + 'static,
    ) -> Delayed {
        let (handle, work) = Delayed::wrap(work);
        if let Err(closed) = self.context.submit_after(delay, work) {
            _ = handle.cancel();
            log_dropped_work(&closed);
        }
        handle
    }

    /// Runs `work` on the main context and returns a future for its result.
    ///
    /// Follows the same rules as [`MainThreadGuard::run_on_main`]: when called on the
    /// main context the returned [`Completion`](crate::Completion) is already resolved.
    #[cfg(feature = "completion")]
    pub fn run_on_main_with_completion<T>(
        &self,
        work: impl FnOnce() -> T + Send + 'static,
    ) -> crate::Completion<T>
    where
        T: Send + 'static,
    {
        let (completion, work) = crate::Completion::wrap(work);
        self.run_on_main(work);
        completion
    }
}

#[cfg(feature = "log")]
fn log_dropped_work(err: &Closed) {
    log::warn!("dropping work for the main thread: {err}");
}

#[cfg(not(feature = "log"))]
fn log_dropped_work(_err: &Closed) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MainQueue, Work};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    /// A main context whose "current thread" is a switch.
    #[derive(Default)]
    struct FakeContext {
        on_main: AtomicBool,
        closed: AtomicBool,
        submitted: Mutex<Vec<(Duration, Work)>>,
    }

    impl FakeContext {
        fn on_main() -> Self {
            let context = FakeContext::default();
            context.on_main.store(true, Ordering::SeqCst);
            context
        }

        fn take(&self) -> Vec<(Duration, Work)> {
            std::mem::take(&mut *self.submitted.lock().expect("lock poisoned"))
        }
    }

    impl MainContext for FakeContext {
        fn is_current(&self) -> bool {
            self.on_main.load(Ordering::SeqCst)
        }

        fn submit(&self, work: Work) -> Result<(), Closed> {
            self.submit_after(Duration::ZERO, work)
        }

        fn submit_after(&self, delay: Duration, work: Work) -> Result<(), Closed> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(Closed::new(work));
            }
            self.submitted
                .lock()
                .expect("lock poisoned")
                .push((delay, work));
            Ok(())
        }
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let shared = Arc::clone(&count);
        let make = move || -> Box<dyn FnOnce() + Send> {
            let shared = Arc::clone(&shared);
            Box::new(move || {
                shared.fetch_add(1, Ordering::SeqCst);
            })
        };
        (count, make)
    }

    #[test]
    fn runs_inline_on_the_main_context() {
        let guard = MainThreadGuard::new(FakeContext::on_main());
        let (count, increment) = counter();
        assert_eq!(Ok(Dispatch::Inline), guard.try_run_on_main(increment()).map_err(drop));
        assert_eq!(1, count.load(Ordering::SeqCst));
        assert!(guard.context().take().is_empty());
    }

    #[test]
    fn defers_off_the_main_context() {
        let guard = MainThreadGuard::new(FakeContext::default());
        let (count, increment) = counter();
        guard.run_on_main(increment());
        assert_eq!(0, count.load(Ordering::SeqCst));

        let submitted = guard.context().take();
        assert_eq!(1, submitted.len());
        for (_, work) in submitted {
            work();
        }
        assert_eq!(1, count.load(Ordering::SeqCst));
    }

    #[test]
    fn closed_queue_hands_the_work_back() {
        let context = FakeContext::default();
        context.closed.store(true, Ordering::SeqCst);
        let guard = MainThreadGuard::new(context);
        let (count, increment) = counter();

        let closed = guard
            .try_run_on_main(increment())
            .expect_err("queue is closed");
        assert_eq!(0, count.load(Ordering::SeqCst));
        closed.into_inner()();
        assert_eq!(1, count.load(Ordering::SeqCst));

        // The infallible variant drops the work.
        guard.run_on_main(increment());
        assert_eq!(1, count.load(Ordering::SeqCst));
    }

    #[test]
    fn run_on_main_drops_work_for_a_shut_down_queue() {
        let queue = MainQueue::new();
        let main_loop = queue.attach().expect("not attached yet");
        let guard = MainThreadGuard::new(&queue);
        let (count, increment) = counter();
        queue.shutdown();

        thread::scope(|s| {
            s.spawn(|| guard.run_on_main(increment()));
        });
        main_loop.run();

        assert_eq!(0, count.load(Ordering::SeqCst));
        assert!(queue.is_empty());
    }

    #[test]
    fn closed_queue_cancels_delayed_work() {
        let context = FakeContext::default();
        context.closed.store(true, Ordering::SeqCst);
        let guard = MainThreadGuard::new(context);
        let (_, increment) = counter();
        let delayed = guard.run_on_main_after(Duration::from_millis(5), increment());
        assert!(delayed.is_cancelled());
    }

    #[test]
    fn defer_queues_even_on_the_main_context() {
        let guard = MainThreadGuard::new(FakeContext::on_main());
        let (count, increment) = counter();
        guard.defer(increment()).expect("queue is open");
        assert_eq!(0, count.load(Ordering::SeqCst));
        assert_eq!(1, guard.context().take().len());
    }

    #[test]
    fn run_on_main_after_always_goes_through_the_queue() {
        let guard = MainThreadGuard::new(FakeContext::on_main());
        let (count, increment) = counter();
        let delayed = guard.run_on_main_after(Duration::from_millis(300), increment());
        assert_eq!(0, count.load(Ordering::SeqCst));

        let submitted = guard.context().take();
        assert_eq!(1, submitted.len());
        for (delay, work) in submitted {
            assert_eq!(Duration::from_millis(300), delay);
            work();
        }
        assert_eq!(1, count.load(Ordering::SeqCst));
        assert!(delayed.has_started());
    }

    #[test]
    fn cancelled_delayed_work_never_runs() {
        let queue = MainQueue::new();
        let main_loop = queue.attach().expect("not attached yet");
        let guard = MainThreadGuard::new(&queue);
        let (count, increment) = counter();

        let delayed = guard.run_on_main_after(Duration::from_millis(10), increment());
        assert!(delayed.cancel());
        queue.shutdown();
        main_loop.run();

        assert_eq!(0, count.load(Ordering::SeqCst));
        assert!(queue.is_empty());
    }

    #[test]
    fn deferred_work_runs_later_on_the_attached_thread() {
        let queue = MainQueue::new();
        let main_loop = queue.attach().expect("not attached yet");
        let guard = MainThreadGuard::new(&queue);
        let main_thread = thread::current().id();
        let ran_on = Arc::new(Mutex::new(None));

        thread::scope(|s| {
            s.spawn(|| {
                let ran_on = Arc::clone(&ran_on);
                let dispatch = guard
                    .try_run_on_main(move || {
                        *ran_on.lock().expect("lock poisoned") = Some(thread::current().id());
                    })
                    .expect("queue is open");
                assert_eq!(Dispatch::Deferred, dispatch);
            });
        });
        assert_eq!(None, *ran_on.lock().expect("lock poisoned"));

        assert_eq!(1, main_loop.run_pending());
        assert_eq!(Some(main_thread), *ran_on.lock().expect("lock poisoned"));
    }

    #[test]
    fn nested_calls_on_the_main_context_run_inline() {
        let queue = Arc::new(MainQueue::new());
        let main_loop = queue.attach().expect("not attached yet");
        let guard = Arc::new(MainThreadGuard::new(Arc::clone(&queue)));
        let order = Arc::new(Mutex::new(Vec::new()));

        let outer_guard = Arc::clone(&guard);
        let outer_order = Arc::clone(&order);
        thread::scope(|s| {
            s.spawn(|| {
                guard.run_on_main(move || {
                    outer_order.lock().expect("lock poisoned").push("outer start");
                    let inner_order = Arc::clone(&outer_order);
                    let dispatch = outer_guard
                        .try_run_on_main(move || {
                            inner_order.lock().expect("lock poisoned").push("inner");
                        })
                        .expect("queue is open");
                    assert_eq!(Dispatch::Inline, dispatch);
                    outer_order.lock().expect("lock poisoned").push("outer end");
                });
            });
        });

        assert_eq!(1, main_loop.run_pending());
        assert_eq!(
            vec!["outer start", "inner", "outer end"],
            *order.lock().expect("lock poisoned")
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn items_from_one_thread_run_in_order() {
        let queue = MainQueue::new();
        let main_loop = queue.attach().expect("not attached yet");
        let guard = MainThreadGuard::new(&queue);
        let order = Arc::new(Mutex::new(Vec::new()));

        thread::scope(|s| {
            s.spawn(|| {
                for i in 0..50 {
                    let order = Arc::clone(&order);
                    guard.run_on_main(move || order.lock().expect("lock poisoned").push(i));
                }
            });
        });

        assert_eq!(50, main_loop.run_pending());
        assert_eq!(
            (0..50).collect::<Vec<_>>(),
            *order.lock().expect("lock poisoned")
        );
    }

    #[test]
    fn every_item_runs_exactly_once() {
        let queue = MainQueue::new();
        let main_loop = queue.attach().expect("not attached yet");
        let guard = MainThreadGuard::new(&queue);
        let (count, increment) = counter();

        thread::scope(|s| {
            for _ in 0..10 {
                s.spawn(|| {
                    for _ in 0..10 {
                        guard.run_on_main(increment());
                    }
                });
            }
        });
        // A few more from the main thread itself, interleaved with the queued ones.
        for _ in 0..5 {
            guard.run_on_main(increment());
        }
        assert_eq!(5, count.load(Ordering::SeqCst));

        assert_eq!(100, main_loop.run_pending());
        assert_eq!(105, count.load(Ordering::SeqCst));
        assert_eq!(0, main_loop.run_pending());
        assert_eq!(105, count.load(Ordering::SeqCst));
    }

    #[test]
    fn concurrent_producers_while_the_main_loop_runs() {
        let queue = MainQueue::new();
        let main_loop = queue.attach().expect("not attached yet");
        let guard = MainThreadGuard::new(&queue);
        let (count, increment) = counter();

        thread::scope(|s| {
            let producers: Vec<_> = (0..10)
                .map(|_| {
                    s.spawn(|| {
                        for _ in 0..10 {
                            guard.run_on_main(increment());
                        }
                    })
                })
                .collect();
            s.spawn(|| {
                for producer in producers {
                    producer.join().expect("producer panicked");
                }
                queue.shutdown();
            });
            main_loop.run();
        });

        assert_eq!(100, count.load(Ordering::SeqCst));
    }
}
