//! Grand Central Dispatch backend, used on macOS, iOS and the other Apple platforms.

use crate::{Closed, Work};
use dispatch::Queue;
use objc2_foundation::MainThreadMarker;
use std::time::Duration;

mod main_thread;
pub(crate) use main_thread::*;

pub(crate) fn is_main_thread() -> bool {
    MainThreadMarker::new().is_some()
}

// The main dispatch queue lives as long as the process, submissions never fail.

pub(crate) fn submit(work: Work) -> Result<(), Closed> {
    Queue::main().exec_async(work);
    Ok(())
}

pub(crate) fn submit_after(delay: Duration, work: Work) -> Result<(), Closed> {
    Queue::main().exec_after(delay, work);
    Ok(())
}
