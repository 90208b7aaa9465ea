//! Hardware abstraction layer for the HomeKey lock runtime.
//!
//! This crate defines the collaborator interfaces the runtime drives and
//! mock implementations of each:
//!
//! - [`Gpio`]: digital pins for indicator LEDs, the lock relay and the
//!   alt-action button.
//! - [`PixelDriver`]: the single addressable status pixel.
//! - [`AccessoryStore`]: the accessory host stack's property store (lock
//!   state pair, pairings, battery service).
//! - [`NfcBus`]: the contactless reader chip.
//!
//! # Design
//!
//! Pins, pixel and accessory store are synchronous and object-safe; they are
//! shared as `Arc<dyn Trait>` between the workers and the configuration
//! engine. The reader bus is async and owned by exactly one task at a time
//! (the card loop or its reconnect worker), dispatched through
//! [`AnyNfcBus`](devices::AnyNfcBus).
//!
//! ```no_run
//! use homekey_hardware::traits::NfcBus;
//! use homekey_hardware::Result;
//!
//! async fn probe<B: NfcBus>(bus: &mut B) -> Result<()> {
//!     bus.begin().await?;
//!     let version = bus.firmware_version().await?;
//!     println!("found {}", version);
//!     Ok(())
//! }
//! ```
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides simulated devices that return a
//! `(device, handle)` pair; the handle inspects and drives the shared state.

pub mod devices;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::AnyNfcBus;
pub use error::{HardwareError, Result};
pub use traits::{AccessoryStore, Gpio, NfcBus, PixelDriver};
pub use types::{FirmwareVersion, PairedController, PassiveTarget};
