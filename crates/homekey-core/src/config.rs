//! Device configuration record and its single-writer channel.
//!
//! The [`Configuration`] record is the one mutable source of truth for pin
//! assignments, arbitration policy and feedback timing. It is persisted as a
//! whole under the `MISCDATA` key and decoded with `#[serde(default)]`, so a
//! record written by an older build still loads with defaults for the fields
//! it lacks.
//!
//! Ownership is split by type: [`config_channel`] returns exactly one
//! [`ConfigWriter`] (not `Clone`) for the configuration engine and a
//! [`ConfigReader`] that every worker clones.
//!
//! # Example
//!
//! ```
//! use homekey_core::{Configuration, config_channel};
//!
//! let (writer, reader) = config_channel(Configuration::default());
//! writer.modify(|c| c.nfc_success_pin = 4);
//! assert_eq!(reader.with(|c| c.nfc_success_pin), 4);
//! ```

use crate::constants::{DEFAULT_SETUP_CODE, is_pin_assigned};
use crate::types::{Level, MomentarySources, PixelType, Rgb};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;

/// Persisted device configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    // misc
    pub device_name: String,
    pub ota_passwd: String,
    #[serde(rename = "hk_key_color")]
    pub hk_key_color: u8,
    pub setup_code: String,
    pub control_pin: u8,
    pub hs_status_pin: u8,
    pub web_auth_enabled: bool,
    pub web_username: String,
    pub web_password: String,
    pub nfc_gpio_pins: [u8; 4],
    pub btr_low_status_threshold: u8,
    pub prox_bat_enabled: bool,
    pub ethernet_enabled: bool,
    pub eth_active_preset: u8,
    pub eth_phy_type: u8,
    pub eth_spi_config: [i8; 7],

    // actions
    pub lock_always_unlock: bool,
    pub lock_always_lock: bool,
    pub nfc_neopixel_pin: u8,
    pub neo_pixel_type: u8,
    pub neopixel_success_color: Rgb,
    pub neopixel_failure_color: Rgb,
    pub neopixel_success_time: u16,
    pub neopixel_fail_time: u16,
    pub nfc_success_pin: u8,
    #[serde(rename = "nfcSuccessHL")]
    pub nfc_success_hl: bool,
    pub nfc_success_time: u16,
    pub nfc_fail_pin: u8,
    #[serde(rename = "nfcFailHL")]
    pub nfc_fail_hl: bool,
    pub nfc_fail_time: u16,
    pub gpio_action_pin: u8,
    pub gpio_action_lock_state: bool,
    pub gpio_action_unlock_state: bool,
    pub gpio_action_momentary_enabled: u8,
    pub gpio_action_momentary_timeout: u16,
    pub hk_gpio_controlled_state: bool,
    pub hk_dumb_switch_mode: bool,
    pub hk_alt_action_init_pin: u8,
    pub hk_alt_action_init_led_pin: u8,
    pub hk_alt_action_init_timeout: u16,
    pub hk_alt_action_pin: u8,
    pub hk_alt_action_timeout: u16,
    pub hk_alt_action_gpio_state: bool,
    pub nfc_tag_no_publish: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            device_name: "HK".to_string(),
            ota_passwd: "homespan-ota".to_string(),
            hk_key_color: 0,
            setup_code: DEFAULT_SETUP_CODE.to_string(),
            control_pin: 255,
            hs_status_pin: 255,
            web_auth_enabled: false,
            web_username: "admin".to_string(),
            web_password: "password".to_string(),
            nfc_gpio_pins: [5, 18, 19, 23],
            btr_low_status_threshold: 10,
            prox_bat_enabled: false,
            ethernet_enabled: false,
            eth_active_preset: 255,
            eth_phy_type: 0,
            eth_spi_config: [20, -1, -1, -1, -1, -1, -1],

            lock_always_unlock: false,
            lock_always_lock: false,
            nfc_neopixel_pin: 255,
            neo_pixel_type: 5,
            neopixel_success_color: Rgb::new(0, 255, 0),
            neopixel_failure_color: Rgb::new(255, 0, 0),
            neopixel_success_time: 1000,
            neopixel_fail_time: 1000,
            nfc_success_pin: 255,
            nfc_success_hl: true,
            nfc_success_time: 1000,
            nfc_fail_pin: 255,
            nfc_fail_hl: true,
            nfc_fail_time: 1000,
            gpio_action_pin: 255,
            gpio_action_lock_state: false,
            gpio_action_unlock_state: true,
            gpio_action_momentary_enabled: 0,
            gpio_action_momentary_timeout: 5000,
            hk_gpio_controlled_state: true,
            hk_dumb_switch_mode: false,
            hk_alt_action_init_pin: 255,
            hk_alt_action_init_led_pin: 255,
            hk_alt_action_init_timeout: 5000,
            hk_alt_action_pin: 255,
            hk_alt_action_timeout: 5000,
            hk_alt_action_gpio_state: true,
            nfc_tag_no_publish: true,
        }
    }
}

impl Configuration {
    /// Arbitration policy derived from the current fields.
    pub fn lock_policy(&self) -> LockPolicy {
        LockPolicy {
            always_unlock: self.lock_always_unlock,
            always_lock: self.lock_always_lock,
            momentary: MomentarySources::from_bits(self.gpio_action_momentary_enabled),
            momentary_timeout: Duration::from_millis(u64::from(self.gpio_action_momentary_timeout)),
            action_pin: self.gpio_action_pin,
            lock_level: Level::from(self.gpio_action_lock_state),
            unlock_level: Level::from(self.gpio_action_unlock_state),
        }
    }

    /// Pixel channel order, falling back to GRB for out-of-range values.
    pub fn pixel_type(&self) -> PixelType {
        PixelType::try_from(self.neo_pixel_type).unwrap_or(PixelType::Grb)
    }

    /// Whether a card success should reach the lock controller as a toggle.
    pub fn card_drives_controller(&self) -> bool {
        (is_pin_assigned(self.gpio_action_pin) && self.hk_gpio_controlled_state)
            || self.hk_dumb_switch_mode
    }

    /// Whether the alt-action feature is fully wired.
    pub fn alt_action_wired(&self) -> bool {
        is_pin_assigned(self.hk_alt_action_init_pin) && is_pin_assigned(self.hk_alt_action_pin)
    }
}

/// Snapshot of the fields the lock arbitration controller consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    pub always_unlock: bool,
    pub always_lock: bool,
    pub momentary: MomentarySources,
    pub momentary_timeout: Duration,
    pub action_pin: u8,
    pub lock_level: Level,
    pub unlock_level: Level,
}

/// Create the configuration channel seeded with `initial`.
pub fn config_channel(initial: Configuration) -> (ConfigWriter, ConfigReader) {
    let (tx, rx) = watch::channel(initial);
    (ConfigWriter { tx }, ConfigReader { rx })
}

/// The single mutable handle on the configuration.
#[derive(Debug)]
pub struct ConfigWriter {
    tx: watch::Sender<Configuration>,
}

impl ConfigWriter {
    /// Mutate the record in place and notify readers.
    pub fn modify(&self, f: impl FnOnce(&mut Configuration)) {
        self.tx.send_modify(f);
    }

    /// Swap the whole record, returning the previous one.
    pub fn replace(&self, config: Configuration) -> Configuration {
        self.tx.send_replace(config)
    }

    /// Clone of the current record.
    pub fn snapshot(&self) -> Configuration {
        self.tx.borrow().clone()
    }

    /// Borrow the record for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&Configuration) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// New read handle.
    pub fn reader(&self) -> ConfigReader {
        ConfigReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Shared read-only handle on the configuration.
#[derive(Debug, Clone)]
pub struct ConfigReader {
    rx: watch::Receiver<Configuration>,
}

impl ConfigReader {
    pub fn snapshot(&self) -> Configuration {
        self.rx.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&Configuration) -> R) -> R {
        f(&self.rx.borrow())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Configuration::default();
        assert_eq!(config.setup_code, "46637726");
        assert_eq!(config.neo_pixel_type, 5);
        assert_eq!(config.gpio_action_momentary_timeout, 5000);
        assert!(config.hk_gpio_controlled_state);
        assert!(config.nfc_tag_no_publish);
        assert_eq!(config.nfc_gpio_pins, [5, 18, 19, 23]);
    }

    #[test]
    fn test_serde_uses_external_names() {
        let json = serde_json::to_value(Configuration::default()).unwrap();
        assert!(json.get("nfcSuccessHL").is_some());
        assert!(json.get("hk_key_color").is_some());
        assert!(json.get("gpioActionMomentaryEnabled").is_some());
        assert!(json.get("nfc_success_pin").is_none());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: Configuration =
            serde_json::from_str(r#"{"deviceName":"Front door","nfcFailPin":12}"#).unwrap();
        assert_eq!(config.device_name, "Front door");
        assert_eq!(config.nfc_fail_pin, 12);
        assert_eq!(config.nfc_fail_time, 1000);
    }

    #[test]
    fn test_lock_policy_levels() {
        let config = Configuration {
            gpio_action_momentary_enabled: 2,
            ..Default::default()
        };
        let policy = config.lock_policy();
        assert_eq!(policy.lock_level, Level::Low);
        assert_eq!(policy.unlock_level, Level::High);
        assert_eq!(policy.momentary, MomentarySources::CARD);
        assert_eq!(policy.momentary_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_card_drives_controller() {
        let mut config = Configuration::default();
        assert!(!config.card_drives_controller());
        config.hk_dumb_switch_mode = true;
        assert!(config.card_drives_controller());
        config.hk_dumb_switch_mode = false;
        config.gpio_action_pin = 26;
        assert!(config.card_drives_controller());
        config.hk_gpio_controlled_state = false;
        assert!(!config.card_drives_controller());
    }

    #[test]
    fn test_writer_changes_visible_to_readers() {
        let (writer, reader) = config_channel(Configuration::default());
        let second = writer.reader();
        writer.modify(|c| c.gpio_action_pin = 26);
        assert_eq!(reader.with(|c| c.gpio_action_pin), 26);
        assert_eq!(second.snapshot().gpio_action_pin, 26);

        let previous = writer.replace(Configuration::default());
        assert_eq!(previous.gpio_action_pin, 26);
        assert_eq!(reader.with(|c| c.gpio_action_pin), 255);
    }

    #[test]
    fn test_modify_applies_every_change_in_one_update() {
        let (writer, reader) = config_channel(Configuration::default());
        writer.modify(|c| {
            c.gpio_action_pin = 26;
            c.hk_dumb_switch_mode = true;
            c.device_name.push_str("-2");
        });
        writer.modify(|_| {});

        let config = reader.snapshot();
        assert_eq!(config.gpio_action_pin, 26);
        assert!(config.hk_dumb_switch_mode);
        assert_eq!(config.device_name, "HK-2");
        assert_eq!(writer.snapshot(), config);
    }
}
