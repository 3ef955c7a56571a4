use crate::main_zone::MainZone;
use crate::{Closed, Work};
use futures_lite::StreamExt as _;
use std::sync::OnceLock;
use std::time::Duration;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast as _;
use wasm_bindgen_futures::spawn_local;
use web_sys::{window, Window};

// The trick here is stolen straight from winit:
// https://github.com/rust-windowing/winit/blob/master/src/platform_impl/web/main_thread.rs

static MAIN_ZONE: OnceLock<MainZone<Message>> = OnceLock::new();

pub(super) enum Message {
    Now(Work),
    After(Duration, Work),
}

impl Message {
    fn into_work(self) -> Work {
        match self {
            Message::Now(work) | Message::After(_, work) => work,
        }
    }
}

fn zone() -> &'static MainZone<Message> {
    MAIN_ZONE.get_or_init(MainZone::new)
}

/// Spawns the task draining the main zone, once. The `window` parameter
/// is used to enforce this function to be called from the main thread.
pub(super) fn init(_window: &Window) {
    let Some(mut receiver) = zone().take_receiver() else {
        return;
    };
    spawn_local(async move {
        while let Some(message) = receiver.next().await {
            match message {
                Message::Now(work) => work(),
                Message::After(delay, work) => set_timeout(delay, work),
            }
        }
    });
}

/// Work sent before the main thread starts draining waits in the zone.
pub(super) fn send(message: Message) -> Result<(), Closed> {
    if let Some(window) = window() {
        init(&window);
    }
    zone()
        .send(message)
        .map_err(|message| Closed::new(message.into_work()))
}

fn set_timeout(delay: Duration, work: Work) {
    let Some(window) = window() else {
        return;
    };
    let callback = Closure::once_into_js(move || work());
    let timeout = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
    if let Err(_err) = window
        .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), timeout)
    {
        #[cfg(feature = "log")]
        log::warn!("failed to schedule delayed work: {_err:?}");
    }
}
