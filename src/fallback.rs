use crate::{Closed, MainContext, MainQueue, Work};
use std::time::Duration;

pub(crate) fn is_main_thread() -> bool {
    MainQueue::global().is_current()
}

pub(crate) fn submit(work: Work) -> Result<(), Closed> {
    MainQueue::global().submit(work)
}

pub(crate) fn submit_after(delay: Duration, work: Work) -> Result<(), Closed> {
    MainQueue::global().submit_after(delay, work)
}
