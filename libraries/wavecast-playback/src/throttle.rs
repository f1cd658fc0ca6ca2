//! Leading-edge throttle for progress writes

use std::time::Duration;
use tokio::time::Instant;

/// Lets the first call through, then drops calls until `window` has elapsed
///
/// Uses tokio's clock so paused-time tests can drive it.
#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    last_fired: Option<Instant>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: None,
        }
    }

    /// Whether the caller may run now; records the call when it may
    pub fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        match self.last_fired {
            Some(last) if now.duration_since(last) < self.window => false,
            _ => {
                self.last_fired = Some(now);
                true
            }
        }
    }

    /// Reopen the gate immediately
    pub fn reset(&mut self) {
        self.last_fired = None;
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
