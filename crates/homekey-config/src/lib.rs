//! Configuration surface of the HomeKey lock runtime.
//!
//! The [`ConfigEngine`] owns the single configuration writer and the
//! actuation workers. It validates a partial JSON document against the
//! field table in [`schema`], applies it field by field with the side
//! effects each row names, reconciles the running workers and persists the
//! record. [`ConfigRequest`] maps raw transport requests onto the engine.
//!
//! # Example
//!
//! ```no_run
//! use homekey_config::{ConfigEngine, Section};
//! use serde_json::json;
//!
//! # async fn example(engine: &mut ConfigEngine) -> Result<(), homekey_config::ConfigError> {
//! let outcome = engine
//!     .apply_partial(Section::Actions, &json!({ "nfcSuccessPin": 4, "nfcSuccessHL": 1 }))
//!     .await?;
//! println!("{}", outcome.message());
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod presets;
pub mod request;
pub mod schema;
pub mod section;

pub use engine::{ApplyOutcome, ConfigEngine};
pub use error::{ConfigError, Result};
pub use presets::{BoardPreset, EthChip, EthernetInfo, PhyType};
pub use request::{ConfigRequest, Response};
pub use schema::{FIELDS, FieldKind, FieldSpec, FieldValue};
pub use section::Section;
