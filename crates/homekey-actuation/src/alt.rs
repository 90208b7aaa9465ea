//! Alt-action button task.
//!
//! Samples the alt-action init button. A press arms the alt action for
//! `hkAltActionInitTimeout`, lighting the init LED while armed; a card
//! authenticated inside that window asks the indicator worker to pulse the
//! alt-action output.

use crate::indicator::millis;
use crate::worker::drive;
use homekey_core::constants::is_pin_assigned;
use homekey_core::{ConfigReader, Level};
use homekey_hardware::Gpio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug)]
pub struct AltActionTask {
    gpio: Arc<dyn Gpio>,
    config: ConfigReader,
    active: Arc<AtomicBool>,
    poll: Duration,
}

impl AltActionTask {
    pub fn new(
        gpio: Arc<dyn Gpio>,
        config: ConfigReader,
        active: Arc<AtomicBool>,
        poll: Duration,
    ) -> Self {
        Self {
            gpio,
            config,
            active,
            poll,
        }
    }

    /// Sample the button forever. Stopped by aborting the task.
    pub async fn run(self) {
        info!("Starting Alt Action button task");
        self.active.store(false, Ordering::SeqCst);
        loop {
            self.poll_once().await;
            tokio::time::sleep(self.poll).await;
        }
    }

    /// One sample; arms and waits out the window when the button is high.
    pub async fn poll_once(&self) {
        let (button, led, window) = self.config.with(|c| {
            (
                c.hk_alt_action_init_pin,
                c.hk_alt_action_init_led_pin,
                c.hk_alt_action_init_timeout,
            )
        });
        if !is_pin_assigned(button) {
            return;
        }
        if !matches!(self.gpio.read(button), Ok(Level::High)) {
            return;
        }

        debug!("BUTTON HIGH");
        self.active.store(true, Ordering::SeqCst);
        drive(self.gpio.as_ref(), led, Level::High);
        tokio::time::sleep(millis(window)).await;
        drive(self.gpio.as_ref(), led, Level::Low);
        self.active.store(false, Ordering::SeqCst);
        debug!("TIMEOUT");
    }
}
