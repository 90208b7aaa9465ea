//! Enhanced contactless polling (ECP) presence frame.
//!
//! Before each passive detection the reader modulates an 18-byte frame so
//! that phones and watches holding a matching key wake the right pass:
//!
//! ```text
//! 6A 02 CB 02 06 02 11 00 | G0 G1 G2 G3 G4 G5 G6 G7 | CL CH
//! ^^^^^^^^^^^^^^^^^^^^^^^   ^^^^^^^^^^^^^^^^^^^^^^^   ^^^^^
//! fixed prefix              reader group identifier   CRC-A over bytes 0..16
//! ```

use crate::crc::crc16a_bytes;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// Fixed ECP header: command, version, access terminal type and flags.
pub const ECP_PREFIX: [u8; 8] = [0x6A, 0x02, 0xCB, 0x02, 0x06, 0x02, 0x11, 0x00];

/// Length of the group identifier slot.
pub const GROUP_ID_LEN: usize = 8;

/// Total frame length.
pub const ECP_FRAME_LEN: usize = ECP_PREFIX.len() + GROUP_ID_LEN + 2;

/// Built presence frame, ready for a communicate-thru exchange.
///
/// # Examples
///
/// ```
/// use homekey_protocol::{ECP_FRAME_LEN, EcpFrame};
///
/// let frame = EcpFrame::new(&[1, 2, 3, 4, 5, 6, 7, 8]);
/// assert_eq!(frame.as_bytes().len(), ECP_FRAME_LEN);
/// assert_eq!(frame.crc(), [0x1E, 0x5E]);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct EcpFrame {
    data: Bytes,
}

impl EcpFrame {
    /// Build a frame for `group_id`.
    ///
    /// Identifiers shorter than eight bytes are zero padded, longer ones are
    /// truncated. An unprovisioned reader therefore broadcasts an all-zero
    /// group.
    pub fn new(group_id: &[u8]) -> Self {
        let mut buf = BytesMut::with_capacity(ECP_FRAME_LEN);
        buf.put_slice(&ECP_PREFIX);

        let take = group_id.len().min(GROUP_ID_LEN);
        buf.put_slice(&group_id[..take]);
        buf.put_bytes(0, GROUP_ID_LEN - take);

        let crc = crc16a_bytes(&buf);
        buf.put_slice(&crc);

        EcpFrame { data: buf.freeze() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Group identifier slot.
    pub fn group_id(&self) -> &[u8] {
        &self.data[ECP_PREFIX.len()..ECP_PREFIX.len() + GROUP_ID_LEN]
    }

    /// Trailing checksum, low byte first.
    pub fn crc(&self) -> [u8; 2] {
        [self.data[ECP_FRAME_LEN - 2], self.data[ECP_FRAME_LEN - 1]]
    }

    /// Recompute the checksum over the payload and compare.
    pub fn verify(&self) -> bool {
        crc16a_bytes(&self.data[..ECP_FRAME_LEN - 2]) == self.crc()
    }
}

impl fmt::Debug for EcpFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EcpFrame(")?;
        for (i, byte) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        write!(f, ")")
    }
}
