//! Hooks the accessory host stack calls into.

use crate::queue::QueueSender;
use homekey_core::constants::is_pin_assigned;
use homekey_core::{ConfigReader, TriggerEvent, TriggerSource};
use homekey_hardware::AccessoryStore;
use std::sync::Arc;
use tracing::info;

/// Accessory-side entry points: the lock mechanism update hook and the
/// battery service overrides.
#[derive(Debug, Clone)]
pub struct AccessoryBridge {
    accessory: Arc<dyn AccessoryStore>,
    lock: QueueSender<TriggerEvent>,
    config: ConfigReader,
}

impl AccessoryBridge {
    pub fn new(
        accessory: Arc<dyn AccessoryStore>,
        lock: QueueSender<TriggerEvent>,
        config: ConfigReader,
    ) -> Self {
        Self {
            accessory,
            lock,
            config,
        }
    }

    /// Update hook, called after a remote controller wrote the target state.
    ///
    /// Forwards an app toggle to the lock controller when one is driving the
    /// lock. Always accepts the write.
    pub fn on_target_state_written(&self) -> bool {
        info!(
            "New LockState={}, Current LockState={}",
            self.accessory.target_state(),
            self.accessory.current_state()
        );
        let drives = self
            .config
            .with(|c| is_pin_assigned(c.gpio_action_pin) || c.hk_dumb_switch_mode);
        if drives {
            self.lock.try_send(TriggerEvent::toggle(TriggerSource::App));
        }
        true
    }

    pub fn set_battery_level(&self, level: u8) {
        info!("Battery level set to {}", level);
        self.accessory.set_battery_level(level);
    }

    pub fn set_low_battery(&self, low: bool) {
        info!(
            "Low status set to {}",
            if low { "LOW" } else { "NORMAL" }
        );
        self.accessory.set_low_battery(low);
    }

    /// Recompute the low-battery flag against `threshold`.
    ///
    /// Returns the published flag, or `None` without a battery service.
    pub fn reevaluate_low_battery(&self, threshold: u8) -> Option<bool> {
        let level = self.accessory.battery_level()?;
        let low = level <= threshold;
        self.accessory.set_low_battery(low);
        Some(low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::Queue;
    use homekey_core::{Configuration, config_channel};
    use homekey_hardware::mock::MockAccessory;

    fn bridge(config: Configuration) -> (AccessoryBridge, Queue<TriggerEvent>, homekey_hardware::mock::MockAccessoryHandle) {
        let (accessory, handle) = MockAccessory::new();
        let queue = Queue::new("lock", 2);
        let (_writer, reader) = config_channel(config);
        (
            AccessoryBridge::new(Arc::new(accessory), queue.sender(), reader),
            queue,
            handle,
        )
    }

    #[tokio::test]
    async fn test_update_forwards_app_toggle_when_wired() {
        let (bridge, queue, _) = bridge(Configuration {
            gpio_action_pin: 26,
            ..Default::default()
        });
        assert!(bridge.on_target_state_written());

        let rx = queue.receiver();
        let mut rx = rx.lock().await;
        assert_eq!(
            rx.try_recv().ok(),
            Some(TriggerEvent::toggle(TriggerSource::App))
        );
    }

    #[tokio::test]
    async fn test_update_without_controller_sends_nothing() {
        let (bridge, queue, _) = bridge(Configuration::default());
        assert!(bridge.on_target_state_written());
        assert_eq!(queue.sender().pending(), 0);
    }

    #[test]
    fn test_low_battery_reevaluation() {
        let (bridge, _queue, handle) = bridge(Configuration::default());
        assert_eq!(bridge.reevaluate_low_battery(10), None);

        handle.set_battery_level(15);
        assert_eq!(bridge.reevaluate_low_battery(10), Some(false));
        assert_eq!(bridge.reevaluate_low_battery(15), Some(true));
        assert!(handle.low_battery());
    }
}
