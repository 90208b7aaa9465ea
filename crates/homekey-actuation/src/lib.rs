//! Actuation subsystem of the HomeKey lock runtime.
//!
//! Independent tokio tasks drive the feedback hardware, each reading its own
//! bounded [`Queue`]:
//!
//! - [`IndicatorWorker`]: success/fail LEDs and the alt-action output
//! - [`PixelWorker`]: the addressable status pixel
//! - [`LockController`]: lock state arbitration and the actuator relay
//! - [`AltActionTask`]: the alt-action arming button (no queue)
//!
//! [`Actuators`] owns the queues and a lifecycle table keyed by
//! [`WorkerKind`]; [`Actuators::reconcile`] starts or stops workers so the
//! running set matches a configuration. Producers never block: a full queue
//! drops the message and bumps a per-queue counter ([`DropCounts`]).
//!
//! # Example
//!
//! ```no_run
//! use homekey_actuation::{Actuators, Peripherals, WorkerSettings};
//! use homekey_core::{Configuration, FeedbackEvent, config_channel};
//! use homekey_hardware::mock::{MockAccessory, MockGpio, MockPixel};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let (gpio, _) = MockGpio::new();
//! let (pixel, _) = MockPixel::new();
//! let (accessory, _) = MockAccessory::new();
//! let peripherals = Peripherals {
//!     gpio: Arc::new(gpio),
//!     pixel: Arc::new(pixel),
//!     accessory: Arc::new(accessory),
//! };
//!
//! let config = Configuration { nfc_success_pin: 2, ..Default::default() };
//! let (_writer, reader) = config_channel(config);
//! let mut actuators = Actuators::new(peripherals, reader, WorkerSettings::default());
//! actuators.boot().await;
//!
//! actuators.dispatch().indicator(FeedbackEvent::Success);
//! # }
//! ```

pub mod actuators;
pub mod alt;
pub mod bridge;
pub mod indicator;
pub mod lifecycle;
pub mod lock;
pub mod pixel;
pub mod queue;
pub mod settings;
mod worker;

pub use actuators::{Actuators, Dispatch, DropCounts, Peripherals, ReconcileReport};
pub use alt::AltActionTask;
pub use bridge::AccessoryBridge;
pub use indicator::IndicatorWorker;
pub use lifecycle::{TaskTermination, WorkerKind, WorkerSlot};
pub use lock::LockController;
pub use pixel::PixelWorker;
pub use queue::{Queue, QueueSender, SharedReceiver};
pub use settings::WorkerSettings;
