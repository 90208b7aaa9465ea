//! Mock device implementations for testing and development.
//!
//! Every mock comes with a handle that shares its state, so a test can keep
//! the handle while the device itself is moved into a worker.

pub mod accessory;
pub mod gpio;
pub mod nfc;
pub mod pixel;

// Re-export commonly used types
pub use accessory::{MockAccessory, MockAccessoryHandle, StateWrite};
pub use gpio::{MockGpio, MockGpioHandle, PinWrite};
pub use nfc::{MockNfcBus, MockNfcBusHandle, NfcBusStats, PN532_FIRMWARE, Presentation};
pub use pixel::{MockPixel, MockPixelHandle, PixelEvent};
