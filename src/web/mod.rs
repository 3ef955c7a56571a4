//! Browser backend. The main context is the thread that owns the `Window`.

use crate::{Closed, Work};
use std::time::Duration;
use web_sys::window;

mod main_thread;

pub(crate) fn is_main_thread() -> bool {
    match window() {
        Some(window) => {
            main_thread::init(&window);
            true
        }
        None => false,
    }
}

pub(crate) fn init() -> bool {
    is_main_thread()
}

pub(crate) fn submit(work: Work) -> Result<(), Closed> {
    main_thread::send(main_thread::Message::Now(work))
}

pub(crate) fn submit_after(delay: Duration, work: Work) -> Result<(), Closed> {
    main_thread::send(main_thread::Message::After(delay, work))
}
