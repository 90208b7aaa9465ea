//! Common types shared across hardware device implementations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ISO 14443-A target found by a passive detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassiveTarget {
    pub uid: Vec<u8>,
    pub atqa: [u8; 2],
    pub sak: u8,
}

impl PassiveTarget {
    pub fn new(uid: impl Into<Vec<u8>>, atqa: [u8; 2], sak: u8) -> Self {
        Self {
            uid: uid.into(),
            atqa,
            sak,
        }
    }
}

/// Firmware version reported by the reader chip.
///
/// The probe packs IC model, major and minor version and supported features
/// into one word; a zero word means no chip answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub ic: u8,
    pub major: u8,
    pub minor: u8,
    pub support: u8,
}

impl FirmwareVersion {
    /// Decode the packed probe word.
    ///
    /// # Examples
    ///
    /// ```
    /// use homekey_hardware::FirmwareVersion;
    ///
    /// let version = FirmwareVersion::from_word(0x3201_0607).unwrap();
    /// assert_eq!(version.to_string(), "PN532 1.6");
    /// assert!(FirmwareVersion::from_word(0).is_none());
    /// ```
    pub fn from_word(word: u32) -> Option<Self> {
        if word == 0 {
            return None;
        }
        let [ic, major, minor, support] = word.to_be_bytes();
        Some(Self {
            ic,
            major,
            minor,
            support,
        })
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PN5{:x} {}.{}", self.ic, self.major, self.minor)
    }
}

/// A controller paired with the accessory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedController {
    pub id: String,
    /// Long-term Ed25519 public key.
    pub ltpk: Vec<u8>,
    pub admin: bool,
}
