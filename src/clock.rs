//! Cooperative delays.
//!
//! Every wait in a run (restart cooldown, polling cadence, settle delays)
//! goes through a [`Clock`] so the control flow can be driven without real
//! timers in tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

/// Suspends the calling flow for a given duration.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Waits for `duration` before returning.
    async fn sleep(&self, duration: Duration);
}

/// A [`Clock`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A [`Clock`] that returns immediately and remembers every requested delay.
///
/// Useful for driving the monitor and acquirer deterministically and for
/// asserting on the cadence they would have used.
#[derive(Debug, Default)]
pub struct RecordingClock {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// All delays requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Sum of all requested delays.
    pub fn total(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
    }
}
