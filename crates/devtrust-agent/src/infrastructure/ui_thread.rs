//! A dedicated looper thread standing in for the platform UI thread.
//!
//! On Android the secure-display flag may only be touched from the main
//! looper.  Hosts without one (the CLI, tests, desktop shells) get the same
//! guarantee from [`UiThreadExecutor`]: a single named OS thread that drains a
//! channel of closures, one at a time, in submission order.
//!
//! # Lifetime
//!
//! The thread exits when the executor is dropped (the channel closes) or
//! when [`UiThreadExecutor::shutdown`] is called, after finishing every task
//! already queued.  A panicking task is caught and logged; the looper keeps
//! running.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use crate::application::platform::{PlatformError, UiDispatcher, UiTask};

/// Name given to the looper thread.
pub const UI_THREAD_NAME: &str = "devtrust-ui";

/// Serial executor backed by one OS thread.
pub struct UiThreadExecutor {
    sender: Mutex<Option<Sender<UiTask>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl UiThreadExecutor {
    /// Spawns the looper thread.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::DispatcherUnavailable`] if the OS refuses to
    /// create the thread.
    pub fn spawn() -> Result<Self, PlatformError> {
        let (tx, rx) = mpsc::channel::<UiTask>();
        let handle = thread::Builder::new()
            .name(UI_THREAD_NAME.to_string())
            .spawn(move || {
                debug!("UI looper started");
                for task in rx {
                    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                        error!("UI task panicked; looper continues");
                    }
                }
                debug!("UI looper stopped");
            })
            .map_err(|e| PlatformError::DispatcherUnavailable(e.to_string()))?;

        Ok(Self {
            sender: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Stops accepting tasks and waits for the queued ones to finish.
    pub fn shutdown(&self) {
        self.sender
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        let handle = self.handle.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(h) = handle {
            if h.join().is_err() {
                error!("UI looper thread panicked during shutdown");
            }
        }
    }
}

impl UiDispatcher for UiThreadExecutor {
    fn dispatch(&self, task: UiTask) -> Result<(), PlatformError> {
        let guard = self.sender.lock().unwrap_or_else(|p| p.into_inner());
        match guard.as_ref() {
            Some(tx) => tx
                .send(task)
                .map_err(|_| PlatformError::DispatcherUnavailable("UI looper has exited".into())),
            None => Err(PlatformError::DispatcherUnavailable(
                "UI looper was shut down".into(),
            )),
        }
    }
}

impl Drop for UiThreadExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
