//! Worker lifecycle table.
//!
//! Each [`WorkerKind`] declares when it is wanted given a configuration; the
//! supervisor diffs that against what is running. A [`WorkerSlot`] holds
//! at most one live task per kind and keeps stopped tasks around until they
//! have been joined.

use homekey_core::Configuration;
use homekey_core::constants::is_pin_assigned;
use std::fmt;
use std::future::Future;
use tokio::task::{JoinError, JoinHandle};
use tracing::warn;

/// The long-lived tasks the configuration can start and stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkerKind {
    /// Success/fail LEDs and the alt-action output.
    Indicator,
    /// Addressable status pixel.
    Pixel,
    /// Lock arbitration controller driving the actuator relay.
    Lock,
    /// Alt-action init button sampler.
    AltAction,
}

impl WorkerKind {
    pub const ALL: [WorkerKind; 4] = [
        WorkerKind::Indicator,
        WorkerKind::Pixel,
        WorkerKind::Lock,
        WorkerKind::AltAction,
    ];

    /// Whether `config` calls for this worker to run.
    ///
    /// # Examples
    ///
    /// ```
    /// use homekey_actuation::WorkerKind;
    /// use homekey_core::Configuration;
    ///
    /// let mut config = Configuration::default();
    /// assert!(!WorkerKind::Lock.wanted(&config));
    /// config.hk_dumb_switch_mode = true;
    /// assert!(WorkerKind::Lock.wanted(&config));
    /// ```
    pub fn wanted(&self, config: &Configuration) -> bool {
        match self {
            WorkerKind::Indicator => {
                is_pin_assigned(config.nfc_success_pin)
                    || is_pin_assigned(config.nfc_fail_pin)
                    || config.alt_action_wired()
            }
            WorkerKind::Pixel => is_pin_assigned(config.nfc_neopixel_pin),
            WorkerKind::Lock => {
                is_pin_assigned(config.gpio_action_pin) || config.hk_dumb_switch_mode
            }
            WorkerKind::AltAction => is_pin_assigned(config.hk_alt_action_init_pin),
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indicator => write!(f, "indicator"),
            Self::Pixel => write!(f, "pixel"),
            Self::Lock => write!(f, "lock"),
            Self::AltAction => write!(f, "alt-action"),
        }
    }
}

/// How a worker task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskTermination {
    /// Task returned on its own (stop message).
    Success,
    /// Task was aborted.
    Cancelled,
    /// Task panicked.
    Panic,
}

impl TaskTermination {
    pub fn classify(result: Result<(), JoinError>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(e) if e.is_cancelled() => Self::Cancelled,
            Err(_) => Self::Panic,
        }
    }
}

/// Slot for one worker kind.
#[derive(Debug)]
pub struct WorkerSlot {
    kind: WorkerKind,
    running: Option<JoinHandle<()>>,
    retired: Vec<JoinHandle<()>>,
}

impl WorkerSlot {
    pub fn new(kind: WorkerKind) -> Self {
        Self {
            kind,
            running: None,
            retired: Vec::new(),
        }
    }

    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Spawn `task` unless a worker is already running. Returns whether a
    /// task was spawned.
    pub fn start<F>(&mut self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_running() {
            return false;
        }
        if let Some(finished) = self.running.take() {
            self.retired.push(finished);
        }
        self.retired.retain(|h| !h.is_finished());
        self.running = Some(tokio::spawn(task));
        true
    }

    /// Ask the running worker to stop.
    ///
    /// `request` delivers the stop message and resolves to whether it was
    /// accepted; if not, the task is aborted. Returns whether a worker was
    /// running.
    pub async fn stop<F>(&mut self, request: F) -> bool
    where
        F: Future<Output = bool>,
    {
        if !self.is_running() {
            return false;
        }
        let Some(handle) = self.running.take() else {
            return false;
        };
        if !request.await {
            warn!("{} worker did not take the stop request, aborting", self.kind);
            handle.abort();
        }
        self.retired.push(handle);
        true
    }

    /// Abort the running worker, if any.
    pub fn abort(&mut self) -> bool {
        match self.running.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                self.retired.push(handle);
                true
            }
            Some(handle) => {
                self.retired.push(handle);
                false
            }
            None => false,
        }
    }

    /// Wait for every task this slot has spawned to end.
    pub async fn join_all(&mut self) -> Vec<TaskTermination> {
        let mut handles = std::mem::take(&mut self.retired);
        handles.extend(self.running.take());
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(TaskTermination::classify(handle.await));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    #[case(WorkerKind::Indicator, Configuration { nfc_fail_pin: 4, ..Default::default() }, true)]
    #[case(WorkerKind::Indicator, Configuration { hk_alt_action_pin: 27, hk_alt_action_init_pin: 14, ..Default::default() }, true)]
    #[case(WorkerKind::Indicator, Configuration { hk_alt_action_pin: 27, ..Default::default() }, false)]
    #[case(WorkerKind::Pixel, Configuration { nfc_neopixel_pin: 16, ..Default::default() }, true)]
    #[case(WorkerKind::Lock, Configuration { gpio_action_pin: 26, ..Default::default() }, true)]
    #[case(WorkerKind::AltAction, Configuration { hk_alt_action_init_pin: 14, ..Default::default() }, true)]
    fn test_wanted(#[case] kind: WorkerKind, #[case] config: Configuration, #[case] expected: bool) {
        assert_eq!(kind.wanted(&config), expected);
    }

    #[test]
    fn test_nothing_wanted_by_default() {
        let config = Configuration::default();
        assert!(WorkerKind::ALL.iter().all(|k| !k.wanted(&config)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let mut slot = WorkerSlot::new(WorkerKind::Pixel);
        assert!(slot.start(std::future::pending()));
        assert!(!slot.start(std::future::pending()));
        assert!(slot.is_running());
        assert!(slot.abort());
        assert_eq!(slot.join_all().await, vec![TaskTermination::Cancelled]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_when_idle_is_noop() {
        let mut slot = WorkerSlot::new(WorkerKind::Lock);
        assert!(!slot.stop(async { true }).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_stop_aborts() {
        let mut slot = WorkerSlot::new(WorkerKind::Lock);
        slot.start(std::future::pending());
        assert!(slot.stop(async { false }).await);
        assert!(!slot.is_running());
        assert_eq!(slot.join_all().await, vec![TaskTermination::Cancelled]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_task_can_restart() {
        let mut slot = WorkerSlot::new(WorkerKind::Indicator);
        slot.start(async {});
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!slot.is_running());
        assert!(slot.start(std::future::pending()));
        slot.abort();
        assert_eq!(slot.join_all().await, vec![TaskTermination::Cancelled]);
    }
}
