//! Stop signal shared between a running loop and its owner

use std::time::Duration;
use tokio::sync::watch;

/// Cloneable stop flag backed by a `watch` channel
#[derive(Debug, Clone)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// Ask every loop holding this flag to stop
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    /// Clear the flag so a loop can be started again
    pub fn reset(&self) {
        self.sender.send_replace(false);
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Sleep for `duration` unless stopped first. Returns `true` if stopped.
    pub async fn sleep_or_stop(&self, duration: Duration) -> bool {
        let mut receiver = self.sender.subscribe();
        if *receiver.borrow_and_update() {
            return true;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_triggered(),
            changed = receiver.wait_for(|stopped| *stopped) => changed.is_ok(),
        }
    }
}
