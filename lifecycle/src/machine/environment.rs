//! Dependencies of the booking state machine.

use crate::config::EngineConfig;
use crate::providers::Notifier;
use booking_engine_core::environment::Clock;
use booking_engine_runtime::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

/// Environment dependencies for [`BookingMachine`](super::BookingMachine).
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
    /// Where notification effects deliver to
    pub notifier: Arc<dyn Notifier>,
    /// Delay before a new request moves to pending
    pub auto_pending_delay: Duration,
    /// Retry policy for notification delivery
    pub notify_policy: RetryPolicy,
}

impl BookingEnvironment {
    /// Creates a new `BookingEnvironment` from engine configuration.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>, config: &EngineConfig) -> Self {
        Self {
            clock,
            notifier,
            auto_pending_delay: config.auto_pending_delay(),
            notify_policy: config.retry_policy(),
        }
    }
}

impl std::fmt::Debug for BookingEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingEnvironment")
            .field("auto_pending_delay", &self.auto_pending_delay)
            .field("notify_policy", &self.notify_policy)
            .finish_non_exhaustive()
    }
}
