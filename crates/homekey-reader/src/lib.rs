//! Card side of the HomeKey lock runtime.
//!
//! - [`CardReader`]: the presence and authentication loop. It owns the
//!   reader bus and recovers from link loss through a reconnect worker.
//! - [`Authenticator`]: the seam to the authentication exchange, with a
//!   scripted [`MockAuthenticator`].
//! - [`ReaderEvent`]: broadcast of authentications and foreign tags.
//! - [`IdentityService`]: the reader identity, the pairing callback and the
//!   maintenance operations on it.
//!
//! # Example
//!
//! ```no_run
//! use homekey_reader::{AnyAuthenticator, CardReader, MockAuthenticator, ReaderSettings};
//! # use homekey_actuation::Dispatch;
//! # use homekey_core::ConfigReader;
//! # use homekey_hardware::{AccessoryStore, AnyNfcBus};
//! # use homekey_storage::SharedReaderData;
//! # use std::sync::Arc;
//!
//! # async fn example(
//! #     bus: AnyNfcBus,
//! #     dispatch: Dispatch,
//! #     accessory: Arc<dyn AccessoryStore>,
//! #     config: ConfigReader,
//! #     identity: SharedReaderData,
//! # ) {
//! let (auth, _) = MockAuthenticator::new();
//! let reader = CardReader::new(
//!     AnyAuthenticator::Mock(auth),
//!     dispatch,
//!     accessory,
//!     config,
//!     identity,
//!     ReaderSettings::default(),
//! );
//! let handle = reader.spawn(bus);
//! let mut events = handle.subscribe();
//! while let Ok(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! # }
//! ```

pub mod auth;
pub mod card_loop;
pub mod error;
pub mod events;
pub mod identity;
mod reconnect;
pub mod settings;

pub use auth::{
    AnyAuthenticator, AuthOutcome, Authenticator, KeyFlow, MockAuthenticator,
    MockAuthenticatorHandle,
};
pub use card_loop::{CardReader, LoopState, ReaderHandle, ReaderStats, ReaderStatsSnapshot};
pub use error::{ReaderError, Result};
pub use events::ReaderEvent;
pub use identity::{IdentityService, PairingSync};
pub use settings::ReaderSettings;
