use homekey_core::constants::{
    ALT_ACTION_POLL_INTERVAL_MS, FEEDBACK_QUEUE_DEPTH, WORKER_POLL_INTERVAL_MS,
    WORKER_STOP_TIMEOUT_MS,
};
use std::time::Duration;

/// Runtime tuning of the actuation workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Periodic wake of a worker blocked on its queue
    pub poll_interval: Duration,

    /// How long a stop request may wait for room in a full queue
    pub stop_timeout: Duration,

    /// Capacity of each worker queue
    pub queue_depth: usize,

    /// Sampling interval of the alt-action button
    pub alt_poll_interval: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(WORKER_POLL_INTERVAL_MS),
            stop_timeout: Duration::from_millis(WORKER_STOP_TIMEOUT_MS),
            queue_depth: FEEDBACK_QUEUE_DEPTH,
            alt_poll_interval: Duration::from_millis(ALT_ACTION_POLL_INTERVAL_MS),
        }
    }
}

impl WorkerSettings {
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    pub fn alt_poll_interval(mut self, interval: Duration) -> Self {
        self.alt_poll_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = WorkerSettings::default();
        assert_eq!(settings.poll_interval, Duration::from_millis(100));
        assert_eq!(settings.stop_timeout, Duration::from_secs(5));
        assert_eq!(settings.queue_depth, 2);
    }

    #[test]
    fn test_builder() {
        let settings = WorkerSettings::default()
            .queue_depth(4)
            .stop_timeout(Duration::from_millis(10));
        assert_eq!(settings.queue_depth, 4);
        assert_eq!(settings.stop_timeout, Duration::from_millis(10));
    }
}
