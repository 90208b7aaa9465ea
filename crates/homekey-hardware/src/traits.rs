//! Hardware device trait definitions.
//!
//! Pin, pixel and accessory access are plain synchronous calls shared through
//! `Arc<dyn ...>` between the workers and the configuration engine. The card
//! reader bus is the only slow device and uses native `async fn` methods
//! (Rust 1.90 + Edition 2024 RPITIT).

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::{FirmwareVersion, PairedController, PassiveTarget};
use homekey_core::{Level, LockState, PinDirection, PixelType, Rgb};
use std::fmt::Debug;
use std::time::Duration;

/// Digital pin controller.
///
/// Implementations must be cheap to call from any task; workers hold the
/// controller behind an `Arc` and write pins while the engine reprograms
/// others.
pub trait Gpio: Send + Sync + Debug {
    /// Whether `pin` exists and can be driven in `direction`.
    fn supports(&self, pin: u8, direction: PinDirection) -> bool;

    /// Program the electrical mode of `pin`.
    fn set_mode(&self, pin: u8, direction: PinDirection) -> Result<()>;

    /// Drive an output pin.
    fn write(&self, pin: u8, level: Level) -> Result<()>;

    /// Sample an input pin.
    fn read(&self, pin: u8) -> Result<Level>;

    /// Return `pin` to its power-on state.
    fn reset(&self, pin: u8) -> Result<()>;
}

/// Single addressable RGB pixel.
pub trait PixelDriver: Send + Sync + Debug {
    /// Light the pixel on `pin` with `color`, reordered for `pixel_type`.
    fn show(&self, pin: u8, pixel_type: PixelType, color: Rgb) -> Result<()>;

    /// Turn the pixel on `pin` off.
    fn off(&self, pin: u8) -> Result<()>;
}

/// Passive property store of the accessory host stack.
///
/// The lock controller is the only writer of the state pair; the host stack
/// writes `target_state` on behalf of a remote controller and then calls the
/// lock mechanism's update hook.
pub trait AccessoryStore: Send + Sync + Debug {
    fn current_state(&self) -> LockState;

    fn set_current_state(&self, state: LockState);

    fn target_state(&self) -> LockState;

    fn set_target_state(&self, state: LockState);

    /// Controllers currently paired with the accessory.
    fn controllers(&self) -> Vec<PairedController>;

    /// Number of paired controllers.
    fn paired_controllers(&self) -> usize {
        self.controllers().len()
    }

    /// Number of paired controllers with admin rights.
    fn admin_controllers(&self) -> usize {
        self.controllers().iter().filter(|c| c.admin).count()
    }

    /// Reprogram the code used for the next pairing.
    fn set_pairing_code(&self, code: &str) -> Result<()>;

    /// Last known battery level in percent, if a battery service exists.
    fn battery_level(&self) -> Option<u8>;

    fn set_battery_level(&self, level: u8);

    fn low_battery(&self) -> bool;

    fn set_low_battery(&self, low: bool);
}

/// Contactless reader chip bus.
///
/// Mirrors the PN532 host commands the card loop needs. Any error returned
/// from [`write_register`](NfcBus::write_register) or
/// [`read_passive_target`](NfcBus::read_passive_target) means the link is
/// lost and the loop hands the bus to the reconnect worker.
///
/// # Object Safety and Dynamic Dispatch
///
/// This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generics or the [`AnyNfcBus`](crate::devices::AnyNfcBus)
/// enum wrapper, which also keeps the returned futures `Send` so the card
/// loop can be spawned.
pub trait NfcBus: Send {
    /// (Re)initialize the host interface.
    async fn begin(&mut self) -> Result<()>;

    /// Probe the chip. Fails when no chip answers.
    async fn firmware_version(&mut self) -> Result<FirmwareVersion>;

    /// Configure the secure access module for normal mode.
    async fn sam_config(&mut self) -> Result<()>;

    /// RF configuration item `cfg_item` set to `value`.
    async fn set_rf_field(&mut self, cfg_item: u8, value: u8) -> Result<()>;

    /// Number of activation retries for passive detection (0 = one try).
    async fn set_passive_activation_retries(&mut self, retries: u8) -> Result<()>;

    async fn write_register(&mut self, register: u16, value: u8) -> Result<()>;

    /// Raw frame exchange without target selection.
    async fn communicate_thru(&mut self, frame: &[u8], timeout: Duration) -> Result<Vec<u8>>;

    /// Wait up to `timeout` for an ISO 14443-A target.
    async fn read_passive_target(&mut self, timeout: Duration) -> Result<Option<PassiveTarget>>;

    /// Send an APDU to the selected target and return its response.
    async fn data_exchange(&mut self, apdu: &[u8]) -> Result<Vec<u8>>;

    /// Release the selected target.
    async fn release(&mut self) -> Result<()>;

    /// Shut the host interface down.
    async fn stop(&mut self);
}
