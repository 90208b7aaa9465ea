//! Core constants for the HomeKey lock runtime.
//!
//! This module centralizes the magic numbers shared by the actuation workers,
//! the card reader loop and the configuration engine: the pin sentinel, queue
//! sizing, polling cadences, persistent storage keys and reader register
//! addresses.
//!
//! # Usage
//!
//! ```
//! use homekey_core::constants::*;
//!
//! fn pin_enabled(pin: u8) -> bool {
//!     pin != DISABLED_PIN
//! }
//!
//! assert!(!pin_enabled(DISABLED_PIN));
//! assert_eq!(FEEDBACK_QUEUE_DEPTH, 2);
//! ```

// ============================================================================
// Pins
// ============================================================================

/// Sentinel pin number meaning "unassigned / disabled".
///
/// Every pin-typed configuration field uses this value to switch the
/// associated hardware feature off.
pub const DISABLED_PIN: u8 = 255;

/// Returns `true` if `pin` denotes a real pin rather than the sentinel.
///
/// # Examples
///
/// ```
/// use homekey_core::constants::{DISABLED_PIN, is_pin_assigned};
///
/// assert!(is_pin_assigned(4));
/// assert!(!is_pin_assigned(DISABLED_PIN));
/// ```
#[must_use]
pub const fn is_pin_assigned(pin: u8) -> bool {
    pin != DISABLED_PIN
}

// ============================================================================
// Queues and workers
// ============================================================================

/// Depth of every feedback and trigger queue.
///
/// Workers expect at most one pending event; a flood is coalesced by
/// dropping on a full queue.
pub const FEEDBACK_QUEUE_DEPTH: usize = 2;

/// Periodic wake interval of a worker blocked on its queue (milliseconds).
pub const WORKER_POLL_INTERVAL_MS: u64 = 100;

/// How long a stop request may wait for room in a full queue (milliseconds).
pub const WORKER_STOP_TIMEOUT_MS: u64 = 5_000;

/// Polling interval of the alt-action button task (milliseconds).
pub const ALT_ACTION_POLL_INTERVAL_MS: u64 = 100;

// ============================================================================
// Card reader loop
// ============================================================================

/// Default passive target detection window (milliseconds).
pub const DEFAULT_DETECTION_TIMEOUT_MS: u64 = 500;

/// Timeout for the presence-broadcast exchange (milliseconds).
pub const ECP_EXCHANGE_TIMEOUT_MS: u64 = 100;

/// Delay between two poll cycles and between removal checks (milliseconds).
pub const READER_CYCLE_DELAY_MS: u64 = 50;

/// Maximum removal checks before the loop gives up waiting for the card to
/// leave the field.
pub const REMOVAL_CHECK_ATTEMPTS: u32 = 50;

/// Delay between two reconnect attempts (milliseconds).
pub const RECONNECT_RETRY_DELAY_MS: u64 = 50;

/// Reader control register written at the start of every poll cycle.
pub const READER_CONTROL_REGISTER: u16 = 0x633D;

/// Passive activation retries while a card is being served.
pub const ACTIVE_PASSIVE_RETRIES: u8 = 5;

// ============================================================================
// Persistent storage keys
// ============================================================================

/// Blob key of the reader identity state.
pub const READER_DATA_KEY: &str = "READERDATA";

/// Blob key of the device configuration record.
pub const CONFIG_DATA_KEY: &str = "MISCDATA";

// ============================================================================
// Accessory defaults
// ============================================================================

/// Default accessory setup code.
pub const DEFAULT_SETUP_CODE: &str = "46637726";

/// Required length of an accessory setup code.
pub const SETUP_CODE_LENGTH: usize = 8;
