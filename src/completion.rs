use crate::Abandoned;
use futures_channel::oneshot;
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// The result of work started with [`run_on_main_with_completion`](crate::run_on_main_with_completion).
    ///
    /// Resolves to the value returned by the work, or to [`Abandoned`] if the work
    /// was dropped before it could finish.
    #[must_use = "dropping a `Completion` does not cancel the work, use `run_on_main` if the result is not needed"]
    pub struct Completion<T> {
        #[pin]
        receiver: oneshot::Receiver<T>,
    }
}

#[cfg(test)]
static_assertions::assert_impl_all!(Completion<u32>: Send, Sync);

impl<T: Send + 'static> Completion<T> {
    pub(crate) fn wrap(
        work: impl FnOnce() -> T + Send + 'static,
    ) -> (Self, impl FnOnce() + Send + 'static) {
        let (sender, receiver) = oneshot::channel();
        let work = move || {
            // The receiver may be gone already, nobody is interested in the result then.
            _ = sender.send(work());
        };
        (Completion { receiver }, work)
    }
}

impl<T> Completion<T> {
    /// Blocks the current thread until the work has finished.
    ///
    /// Calling this on the main thread for work that was queued blocks the very
    /// thread that would have to run it. Use [`Completion::try_take`] or `.await` there.
    pub fn wait(self) -> Result<T, Abandoned> {
        futures_lite::future::block_on(self)
    }

    /// Returns the result if the work has already finished, without blocking.
    pub fn try_take(&mut self) -> Option<Result<T, Abandoned>> {
        match self.receiver.try_recv() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(Abandoned)),
        }
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T, Abandoned>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.project()
            .receiver
            .poll(cx)
            .map(|result| result.map_err(|oneshot::Canceled| Abandoned))
    }
}
