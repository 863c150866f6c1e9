//! Injected delays.
//!
//! Every fixed wait in the pipeline goes through a [`Pacer`] so tests can
//! run the same loops without sleeping.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::PacingConfig;

#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Returns immediately and records what it was asked to wait.
#[derive(Default)]
pub struct RecordingPacer {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, duration: Duration) {
        if let Ok(mut p) = self.pauses.lock() {
            p.push(duration);
        }
    }
}

/// [`PacingConfig`] as durations.
#[derive(Debug, Clone, Copy)]
pub struct Delays {
    pub initial_settle: Duration,
    pub settle: Duration,
    pub scroll_pause: Duration,
    pub page_settle: Duration,
    pub offer_delay: Duration,
    pub batch_delay: Duration,
}

impl From<&PacingConfig> for Delays {
    fn from(c: &PacingConfig) -> Self {
        Self {
            initial_settle: Duration::from_millis(c.initial_settle_ms),
            settle: Duration::from_millis(c.settle_ms),
            scroll_pause: Duration::from_millis(c.scroll_pause_ms),
            page_settle: Duration::from_millis(c.page_settle_ms),
            offer_delay: Duration::from_millis(c.offer_delay_ms),
            batch_delay: Duration::from_millis(c.batch_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_from_default_config() {
        let d = Delays::from(&PacingConfig::default());
        assert_eq!(d.scroll_pause, Duration::from_millis(512));
        assert_eq!(d.batch_delay, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn recording_pacer_does_not_sleep() {
        let pacer = RecordingPacer::new();
        pacer.pause(Duration::from_secs(3600)).await;
        assert_eq!(pacer.pauses(), vec![Duration::from_secs(3600)]);
    }
}
