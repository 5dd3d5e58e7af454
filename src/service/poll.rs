use std::time::Duration;

use crate::host::PopupWindow;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[cfg(not(target_arch = "wasm32"))]
async fn sleep(interval: Duration) {
    tokio::time::sleep(interval).await;
}

#[cfg(target_arch = "wasm32")]
async fn sleep(interval: Duration) {
    gloo_timers::future::sleep(interval).await;
}

/// Waits for a popup to close by re-checking it on a fixed interval.
///
/// Hosts rarely expose a "window closed" event, so closure is observed by
/// polling. There is no timeout: the wait lasts until the popup closes.
#[derive(Debug, Clone, Copy)]
pub struct ClosePoller {
    interval: Duration,
}

impl Default for ClosePoller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl ClosePoller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Resolves once `popup` reports closed. Returns the number of ticks waited.
    pub async fn wait_closed(&self, popup: &dyn PopupWindow) -> u64 {
        let mut ticks = 0;
        loop {
            sleep(self.interval).await;
            ticks += 1;
            if popup.is_closed() {
                tracing::debug!("Popup closed after {ticks} poll tick(s)");
                return ticks;
            }
        }
    }
}
