//! Enum wrappers for hardware device dispatch.
//!
//! Native `async fn` in traits is not object-safe, so the card reader loop
//! cannot hold a `Box<dyn NfcBus>`. [`AnyNfcBus`] provides concrete type
//! dispatch instead, and because every variant is a concrete type the
//! futures it returns are `Send`, which lets the loop be spawned.
//!
//! # Examples
//!
//! ```
//! use homekey_hardware::devices::AnyNfcBus;
//! use homekey_hardware::mock::MockNfcBus;
//!
//! let (bus, _handle) = MockNfcBus::new();
//! let any_bus = AnyNfcBus::Mock(bus);
//! ```

use crate::mock::MockNfcBus;
use crate::traits::NfcBus;
use crate::{FirmwareVersion, PassiveTarget, Result};
use std::time::Duration;

/// Enum wrapper for reader bus dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyNfcBus {
    /// Mock bus for development and testing.
    Mock(MockNfcBus),
}

impl NfcBus for AnyNfcBus {
    async fn begin(&mut self) -> Result<()> {
        match self {
            Self::Mock(bus) => bus.begin().await,
        }
    }

    async fn firmware_version(&mut self) -> Result<FirmwareVersion> {
        match self {
            Self::Mock(bus) => bus.firmware_version().await,
        }
    }

    async fn sam_config(&mut self) -> Result<()> {
        match self {
            Self::Mock(bus) => bus.sam_config().await,
        }
    }

    async fn set_rf_field(&mut self, cfg_item: u8, value: u8) -> Result<()> {
        match self {
            Self::Mock(bus) => bus.set_rf_field(cfg_item, value).await,
        }
    }

    async fn set_passive_activation_retries(&mut self, retries: u8) -> Result<()> {
        match self {
            Self::Mock(bus) => bus.set_passive_activation_retries(retries).await,
        }
    }

    async fn write_register(&mut self, register: u16, value: u8) -> Result<()> {
        match self {
            Self::Mock(bus) => bus.write_register(register, value).await,
        }
    }

    async fn communicate_thru(&mut self, frame: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        match self {
            Self::Mock(bus) => bus.communicate_thru(frame, timeout).await,
        }
    }

    async fn read_passive_target(&mut self, timeout: Duration) -> Result<Option<PassiveTarget>> {
        match self {
            Self::Mock(bus) => bus.read_passive_target(timeout).await,
        }
    }

    async fn data_exchange(&mut self, apdu: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Mock(bus) => bus.data_exchange(apdu).await,
        }
    }

    async fn release(&mut self) -> Result<()> {
        match self {
            Self::Mock(bus) => bus.release().await,
        }
    }

    async fn stop(&mut self) {
        match self {
            Self::Mock(bus) => bus.stop().await,
        }
    }
}

impl From<MockNfcBus> for AnyNfcBus {
    fn from(bus: MockNfcBus) -> Self {
        Self::Mock(bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_any_bus_dispatches_to_mock() {
        let (bus, handle) = MockNfcBus::new();
        let mut any_bus = AnyNfcBus::from(bus);

        any_bus.begin().await.unwrap();
        let version = any_bus.firmware_version().await.unwrap();
        assert_eq!(version.ic, 0x32);
        assert_eq!(handle.stats().begin_calls, 1);
    }

    #[test]
    fn test_any_bus_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<AnyNfcBus>();
    }
}
