//! Success/fail indicator worker.
//!
//! Drives the two indicator pins and the alt-action output. Each message
//! lights one output at its configured active level, holds it for the
//! configured time and returns it to idle; the next message is not read
//! until the hold is over.

use crate::queue::SharedReceiver;
use crate::worker::{pulse, recv_polling};
use homekey_core::constants::is_pin_assigned;
use homekey_core::{ConfigReader, FeedbackEvent, Level};
use homekey_hardware::Gpio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug)]
pub struct IndicatorWorker {
    gpio: Arc<dyn Gpio>,
    config: ConfigReader,
    alt_active: Arc<AtomicBool>,
    poll: Duration,
}

impl IndicatorWorker {
    pub fn new(
        gpio: Arc<dyn Gpio>,
        config: ConfigReader,
        alt_active: Arc<AtomicBool>,
        poll: Duration,
    ) -> Self {
        Self {
            gpio,
            config,
            alt_active,
            poll,
        }
    }

    /// Serve the queue until a stop message arrives.
    pub async fn run(self, queue: SharedReceiver<FeedbackEvent>) {
        let mut rx = queue.lock().await;
        debug!("Indicator worker started");
        while let Some(event) = recv_polling(&mut rx, self.poll).await {
            if event == FeedbackEvent::Stop {
                break;
            }
            self.handle(event).await;
        }
        info!("Indicator worker stopped");
    }

    pub async fn handle(&self, event: FeedbackEvent) {
        match event {
            FeedbackEvent::Fail => {
                let (pin, active, hold) = self.config.with(|c| {
                    (c.nfc_fail_pin, Level::from(c.nfc_fail_hl), c.nfc_fail_time)
                });
                if is_pin_assigned(pin) {
                    debug!("FAIL LED {}:{:?}", pin, active);
                    pulse(self.gpio.as_ref(), pin, active, millis(hold)).await;
                }
            }
            FeedbackEvent::Success => {
                let (pin, active, hold) = self.config.with(|c| {
                    (
                        c.nfc_success_pin,
                        Level::from(c.nfc_success_hl),
                        c.nfc_success_time,
                    )
                });
                if is_pin_assigned(pin) {
                    debug!("SUCCESS LED {}:{:?}", pin, active);
                    pulse(self.gpio.as_ref(), pin, active, millis(hold)).await;
                }
            }
            FeedbackEvent::AltAction => {
                if !self.alt_active.load(Ordering::SeqCst) {
                    debug!("Alt action not armed, ignoring");
                    return;
                }
                let (pin, active, hold) = self.config.with(|c| {
                    (
                        c.hk_alt_action_pin,
                        Level::from(c.hk_alt_action_gpio_state),
                        c.hk_alt_action_timeout,
                    )
                });
                if is_pin_assigned(pin) {
                    debug!("ALT ACTION {}:{:?}", pin, active);
                    pulse(self.gpio.as_ref(), pin, active, millis(hold)).await;
                }
            }
            FeedbackEvent::Stop => {}
        }
    }
}

pub(crate) fn millis(ms: u16) -> Duration {
    Duration::from_millis(u64::from(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use homekey_core::{Configuration, config_channel};
    use homekey_hardware::mock::MockGpio;

    fn worker(config: Configuration) -> (IndicatorWorker, homekey_hardware::mock::MockGpioHandle, Arc<AtomicBool>) {
        let (gpio, handle) = MockGpio::new();
        let (_writer, reader) = config_channel(config);
        let alt = Arc::new(AtomicBool::new(false));
        let worker = IndicatorWorker::new(
            Arc::new(gpio),
            reader,
            Arc::clone(&alt),
            Duration::from_millis(100),
        );
        (worker, handle, alt)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_pulses_fail_pin() {
        let (worker, gpio, _) = worker(Configuration {
            nfc_fail_pin: 4,
            nfc_fail_hl: true,
            ..Default::default()
        });
        worker.handle(FeedbackEvent::Fail).await;
        assert_eq!(gpio.writes_to(4), vec![Level::High, Level::Low]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_respects_active_low() {
        let (worker, gpio, _) = worker(Configuration {
            nfc_success_pin: 2,
            nfc_success_hl: false,
            ..Default::default()
        });
        worker.handle(FeedbackEvent::Success).await;
        assert_eq!(gpio.writes_to(2), vec![Level::Low, Level::High]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unassigned_pin_is_silent() {
        let (worker, gpio, _) = worker(Configuration::default());
        worker.handle(FeedbackEvent::Success).await;
        worker.handle(FeedbackEvent::Fail).await;
        assert!(gpio.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_alt_action_needs_arming() {
        let (worker, gpio, alt) = worker(Configuration {
            hk_alt_action_pin: 27,
            hk_alt_action_init_pin: 14,
            ..Default::default()
        });
        worker.handle(FeedbackEvent::AltAction).await;
        assert!(gpio.writes().is_empty());

        alt.store(true, Ordering::SeqCst);
        worker.handle(FeedbackEvent::AltAction).await;
        assert_eq!(gpio.writes_to(27), vec![Level::High, Level::Low]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_time_elapses() {
        let (worker, _gpio, _) = worker(Configuration {
            nfc_fail_pin: 4,
            nfc_fail_time: 1500,
            ..Default::default()
        });
        let start = tokio::time::Instant::now();
        worker.handle(FeedbackEvent::Fail).await;
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }
}
