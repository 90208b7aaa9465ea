//! Wire-level pieces of the card reader exchange.
//!
//! - [`crc16a`]: CRC-16 as used by ISO/IEC 14443-3 Type A framing.
//! - [`EcpFrame`]: the 18-byte presence broadcast sent before every poll.
//! - [`apdu`]: the application select command and status word checks.

pub mod apdu;
pub mod crc;
pub mod ecp;

pub use apdu::{SELECT_HOMEKEY_APPLET, StatusWord, is_success};
pub use crc::{crc16a, crc16a_bytes};
pub use ecp::{ECP_FRAME_LEN, ECP_PREFIX, EcpFrame};
