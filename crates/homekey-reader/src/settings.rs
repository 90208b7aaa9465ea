//! Card loop timing.

use crate::auth::KeyFlow;
use homekey_core::constants::{
    DEFAULT_DETECTION_TIMEOUT_MS, ECP_EXCHANGE_TIMEOUT_MS, READER_CYCLE_DELAY_MS,
    RECONNECT_RETRY_DELAY_MS, REMOVAL_CHECK_ATTEMPTS,
};
use std::time::Duration;

/// Runtime settings of the card loop and its reconnect worker.
#[derive(Debug, Clone)]
pub struct ReaderSettings {
    /// How long one passive detection waits for a card
    pub detection_timeout: Duration,

    /// Timeout of the presence broadcast exchange
    pub ecp_timeout: Duration,

    /// Pause between cycles and between removal checks
    pub cycle_delay: Duration,

    /// Removal re-detections before giving up on a card that stays put
    pub removal_attempts: u32,

    /// Pause between failed reconnect attempts
    pub reconnect_delay: Duration,

    /// Key flow requested at startup
    pub key_flow: KeyFlow,

    /// Capacity of the reader event broadcast
    pub event_capacity: usize,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            detection_timeout: Duration::from_millis(DEFAULT_DETECTION_TIMEOUT_MS),
            ecp_timeout: Duration::from_millis(ECP_EXCHANGE_TIMEOUT_MS),
            cycle_delay: Duration::from_millis(READER_CYCLE_DELAY_MS),
            removal_attempts: REMOVAL_CHECK_ATTEMPTS,
            reconnect_delay: Duration::from_millis(RECONNECT_RETRY_DELAY_MS),
            key_flow: KeyFlow::Fast,
            event_capacity: 16,
        }
    }
}

impl ReaderSettings {
    pub fn detection_timeout(mut self, timeout: Duration) -> Self {
        self.detection_timeout = timeout;
        self
    }

    pub fn cycle_delay(mut self, delay: Duration) -> Self {
        self.cycle_delay = delay;
        self
    }

    pub fn removal_attempts(mut self, attempts: u32) -> Self {
        self.removal_attempts = attempts;
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn key_flow(mut self, flow: KeyFlow) -> Self {
        self.key_flow = flow;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}
