use futures_channel::mpsc;
use std::sync::{Mutex, PoisonError};

/// A channel whose receiving end is parked until the main thread picks it up.
///
/// Items sent before that wait in the channel, so any thread can send as soon
/// as the zone exists, no matter whether the main thread has started draining.
pub(crate) struct MainZone<T> {
    sender: mpsc::UnboundedSender<T>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<T>>>,
}

impl<T> MainZone<T> {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded();
        MainZone {
            sender,
            receiver: Mutex::new(Some(receiver)),
        }
    }

    /// Hands the item back if the receiving end has been dropped.
    pub(crate) fn send(&self, item: T) -> Result<(), T> {
        self.sender
            .unbounded_send(item)
            .map_err(mpsc::TrySendError::into_inner)
    }

    /// Returns the receiving end the first time it is called, [`None`] afterwards.
    pub(crate) fn take_receiver(&self) -> Option<mpsc::UnboundedReceiver<T>> {
        self.receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[cfg(test)]
static_assertions::assert_impl_all!(MainZone<Box<dyn FnOnce() + Send>>: Send, Sync);
