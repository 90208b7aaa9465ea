//! Events published by the card loop.

use homekey_hardware::PassiveTarget;
use homekey_storage::upper_hex;
use serde::Serialize;

/// Something a subscriber may want to know about a card interaction.
///
/// Identifiers are upper-case hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReaderEvent {
    /// A digital key authenticated.
    Authenticated {
        #[serde(rename = "issuerId")]
        issuer_id: String,
        #[serde(rename = "endpointId")]
        endpoint_id: String,
        #[serde(rename = "readerId")]
        reader_id: String,
    },
    /// A card that is not a digital key was read.
    TagRead {
        uid: String,
        atqa: String,
        sak: String,
    },
}

impl ReaderEvent {
    pub fn authenticated(issuer_id: &[u8], endpoint_id: &[u8], reader_id: &[u8]) -> Self {
        ReaderEvent::Authenticated {
            issuer_id: upper_hex(issuer_id),
            endpoint_id: upper_hex(endpoint_id),
            reader_id: upper_hex(reader_id),
        }
    }

    pub fn tag_read(target: &PassiveTarget) -> Self {
        ReaderEvent::TagRead {
            uid: upper_hex(&target.uid),
            atqa: upper_hex(&target.atqa),
            sak: upper_hex(&[target.sak]),
        }
    }
}
