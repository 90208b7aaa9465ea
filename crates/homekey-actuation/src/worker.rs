//! Pieces shared by every queue-driven worker.

use homekey_core::Level;
use homekey_core::constants::is_pin_assigned;
use homekey_hardware::Gpio;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{trace, warn};

/// Wait for the next message, waking every `poll` while the queue is idle.
///
/// Returns `None` once every sender is gone.
pub(crate) async fn recv_polling<T>(rx: &mut mpsc::Receiver<T>, poll: Duration) -> Option<T> {
    loop {
        match timeout(poll, rx.recv()).await {
            Ok(message) => return message,
            Err(_) => trace!("queue idle"),
        }
    }
}

/// Drive `pin` to `level`, skipping the unassigned sentinel.
///
/// Pin failures are logged and otherwise ignored; feedback is best effort.
pub(crate) fn drive(gpio: &dyn Gpio, pin: u8, level: Level) {
    if !is_pin_assigned(pin) {
        return;
    }
    if let Err(e) = gpio.write(pin, level) {
        warn!("Failed to drive pin {}: {}", pin, e);
    }
}

/// Hold `pin` at `active` for `hold`, then return it to the opposite level.
pub(crate) async fn pulse(gpio: &dyn Gpio, pin: u8, active: Level, hold: Duration) {
    drive(gpio, pin, active);
    tokio::time::sleep(hold).await;
    drive(gpio, pin, !active);
}
