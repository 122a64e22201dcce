//! Request pacing.
//!
//! The sweep is strictly sequential, so these waits simply hold the run:
//! there is no other work to interleave.

use harvester_core::PacingConfig;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Delays applied between requests and after faults.
#[derive(Debug, Clone)]
pub struct Pacing {
    min_delay: Duration,
    max_delay: Duration,
    transport_backoff: Duration,
}

impl Pacing {
    /// Create pacing with explicit bounds.
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration, transport_backoff: Duration) -> Self {
        Self {
            min_delay,
            max_delay: max_delay.max(min_delay),
            transport_backoff,
        }
    }

    /// Pacing from configuration.
    #[must_use]
    pub fn from_config(config: &PacingConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            Duration::from_millis(config.transport_backoff_ms),
        )
    }

    /// No waiting at all.
    #[must_use]
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    /// Uniformly random delay within the configured range.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        rand::thread_rng().gen_range(self.min_delay..=self.max_delay)
    }

    /// Wait before requesting the next page.
    pub async fn between_pages(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis(), "pacing next request");
            tokio::time::sleep(delay).await;
        }
    }

    /// Wait after a transport fault.
    pub async fn after_transport_fault(&self) {
        if !self.transport_backoff.is_zero() {
            tokio::time::sleep(self.transport_backoff).await;
        }
    }

    /// Backoff applied after a transport fault.
    #[must_use]
    pub fn transport_backoff(&self) -> Duration {
        self.transport_backoff
    }
}
