//! Reader identity record.
//!
//! The authentication collaborator owns the cryptographic content; this
//! runtime only reads the group identifier for the presence broadcast,
//! registers issuers for paired controllers and performs maintenance
//! (endpoint removal, wipe).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

/// Length of an issuer identifier in bytes.
pub const ISSUER_ID_LEN: usize = 8;

const ISSUER_ID_CONTEXT: &[u8] = b"key-identifier";

/// Reader identity shared between the card loop and the pairing callback.
pub type SharedReaderData = Arc<RwLock<ReaderData>>;

/// Persisted reader identity (`READERDATA`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderData {
    #[serde(rename = "reader_private_key")]
    pub reader_sk: Vec<u8>,
    #[serde(rename = "reader_public_key")]
    pub reader_pk: Vec<u8>,
    #[serde(rename = "reader_key_x")]
    pub reader_pk_x: Vec<u8>,
    #[serde(rename = "group_identifier")]
    pub reader_gid: Vec<u8>,
    #[serde(rename = "unique_identifier")]
    pub reader_id: Vec<u8>,
    pub issuers: Vec<Issuer>,
}

/// A key issuer, one per paired controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Issuer {
    #[serde(rename = "issuerId")]
    pub issuer_id: Vec<u8>,
    #[serde(rename = "publicKey")]
    pub issuer_pk: Vec<u8>,
    #[serde(rename = "issuer_key_x")]
    pub issuer_pk_x: Vec<u8>,
    pub endpoints: Vec<Endpoint>,
}

/// A device provisioned with a key by an issuer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    #[serde(rename = "endpointId")]
    pub endpoint_id: Vec<u8>,
    #[serde(rename = "publicKey")]
    pub endpoint_pk: Vec<u8>,
    #[serde(rename = "endpoint_key_x")]
    pub endpoint_pk_x: Vec<u8>,
    pub counter: u32,
    pub last_used_at: u32,
    pub key_type: i32,
    pub persistent_key: Vec<u8>,
}

/// Issuer identifier of a controller long-term public key.
///
/// First eight bytes of `SHA-256("key-identifier" || ltpk)`.
pub fn issuer_id_for(ltpk: &[u8]) -> [u8; ISSUER_ID_LEN] {
    let digest = Sha256::new()
        .chain_update(ISSUER_ID_CONTEXT)
        .chain_update(ltpk)
        .finalize();
    let mut id = [0u8; ISSUER_ID_LEN];
    id.copy_from_slice(&digest[..ISSUER_ID_LEN]);
    id
}

/// Upper-case hex without separators.
pub fn upper_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

impl ReaderData {
    /// Whether the reader has been provisioned at all.
    pub fn is_provisioned(&self) -> bool {
        !self.reader_gid.is_empty()
    }

    pub fn find_issuer(&self, issuer_id: &[u8]) -> Option<&Issuer> {
        self.issuers
            .iter()
            .find(|issuer| bool::from(issuer.issuer_id.as_slice().ct_eq(issuer_id)))
    }

    /// Register an issuer for every key in `ltpks` not yet known.
    ///
    /// Returns the number of issuers added.
    pub fn sync_issuers<'a>(&mut self, ltpks: impl IntoIterator<Item = &'a [u8]>) -> usize {
        let mut added = 0;
        for ltpk in ltpks {
            let id = issuer_id_for(ltpk);
            if self.find_issuer(&id).is_some() {
                continue;
            }
            self.issuers.push(Issuer {
                issuer_id: id.to_vec(),
                issuer_pk: ltpk.to_vec(),
                ..Default::default()
            });
            added += 1;
        }
        added
    }

    /// Drop every endpoint of every issuer, keeping the issuers.
    pub fn remove_endpoints(&mut self) -> usize {
        self.issuers
            .iter_mut()
            .map(|issuer| std::mem::take(&mut issuer.endpoints).len())
            .sum()
    }

    /// Forget the whole identity.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Read-only view with identifiers rendered as upper-case hex.
    pub fn info(&self) -> ReaderInfo {
        ReaderInfo {
            group_identifier: upper_hex(&self.reader_gid),
            unique_identifier: upper_hex(&self.reader_id),
            issuers: self
                .issuers
                .iter()
                .map(|issuer| IssuerInfo {
                    issuer_id: upper_hex(&issuer.issuer_id),
                    endpoints: (!issuer.endpoints.is_empty()).then(|| {
                        issuer
                            .endpoints
                            .iter()
                            .map(|endpoint| EndpointInfo {
                                endpoint_id: upper_hex(&endpoint.endpoint_id),
                            })
                            .collect()
                    }),
                })
                .collect(),
        }
    }
}

/// Hex view of [`ReaderData`] served as the `hkinfo` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReaderInfo {
    pub group_identifier: String,
    pub unique_identifier: String,
    pub issuers: Vec<IssuerInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuerInfo {
    #[serde(rename = "issuerId")]
    pub issuer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Vec<EndpointInfo>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointInfo {
    #[serde(rename = "endpointId")]
    pub endpoint_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provisioned() -> ReaderData {
        ReaderData {
            reader_gid: vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08],
            reader_id: vec![0xAA, 0xBB],
            issuers: vec![Issuer {
                issuer_id: vec![0xde, 0xad],
                endpoints: vec![Endpoint {
                    endpoint_id: vec![0x0f, 0xa0],
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_issuer_id_is_truncated_digest() {
        let ltpk = [7u8; 32];
        let mut hasher = Sha256::new();
        hasher.update(b"key-identifier");
        hasher.update(ltpk);
        let full = hasher.finalize();
        assert_eq!(issuer_id_for(&ltpk), full[..8]);
    }

    #[test]
    fn test_sync_issuers_adds_only_unknown() {
        let mut data = ReaderData::default();
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_eq!(data.sync_issuers([a.as_slice(), b.as_slice()]), 2);
        assert_eq!(data.sync_issuers([a.as_slice()]), 0);
        assert_eq!(data.issuers.len(), 2);
        assert_eq!(data.issuers[0].issuer_pk, a.to_vec());
        assert!(data.find_issuer(&issuer_id_for(&b)).is_some());
    }

    #[test]
    fn test_remove_endpoints_keeps_issuers() {
        let mut data = provisioned();
        assert_eq!(data.remove_endpoints(), 1);
        assert_eq!(data.issuers.len(), 1);
        assert!(data.issuers[0].endpoints.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut data = provisioned();
        assert!(data.is_provisioned());
        data.clear();
        assert!(!data.is_provisioned());
        assert!(data.issuers.is_empty());
    }

    #[test]
    fn test_info_view_is_upper_hex() {
        let info = serde_json::to_value(provisioned().info()).unwrap();
        assert_eq!(info["group_identifier"], "0102030405060708");
        assert_eq!(info["unique_identifier"], "AABB");
        assert_eq!(info["issuers"][0]["issuerId"], "DEAD");
        assert_eq!(info["issuers"][0]["endpoints"][0]["endpointId"], "0FA0");
    }

    #[test]
    fn test_info_omits_empty_endpoint_list() {
        let mut data = provisioned();
        data.remove_endpoints();
        let info = serde_json::to_value(data.info()).unwrap();
        assert!(info["issuers"][0].get("endpoints").is_none());
    }

    #[test]
    fn test_persisted_names() {
        let json = serde_json::to_value(provisioned()).unwrap();
        assert!(json.get("group_identifier").is_some());
        assert!(json.get("reader_private_key").is_some());
        assert!(json["issuers"][0].get("issuerId").is_some());
        assert!(json["issuers"][0]["endpoints"][0].get("endpointId").is_some());
    }
}
