use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Coalesces calls that arrive within `delay` of each other into one
/// delivery of the latest. Outside a tokio runtime calls run immediately.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn call<F>(&mut self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        if self.delay.is_zero() {
            callback();
            return;
        }
        match Handle::try_current() {
            Ok(handle) => {
                let delay = self.delay;
                self.pending = Some(handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    callback();
                }));
            }
            Err(_) => callback(),
        }
    }

    /// Drops the pending delivery, if any.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
