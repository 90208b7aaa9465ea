//! Application selection APDU.

use std::fmt;

/// `SELECT` by AID for the digital key applet (`A0 00 00 08 58 01 01`).
pub const SELECT_HOMEKEY_APPLET: [u8; 13] = [
    0x00, 0xA4, 0x04, 0x00, 0x07, 0xA0, 0x00, 0x00, 0x08, 0x58, 0x01, 0x01, 0x00,
];

/// Trailing status word of an APDU response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord {
    pub sw1: u8,
    pub sw2: u8,
}

impl StatusWord {
    pub const SUCCESS: StatusWord = StatusWord {
        sw1: 0x90,
        sw2: 0x00,
    };

    /// Status word of `response`, if it carries at least two bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use homekey_protocol::StatusWord;
    ///
    /// assert_eq!(StatusWord::from_response(&[0x01, 0x90, 0x00]), Some(StatusWord::SUCCESS));
    /// assert_eq!(StatusWord::from_response(&[0x90]), None);
    /// ```
    pub fn from_response(response: &[u8]) -> Option<StatusWord> {
        match response {
            [.., sw1, sw2] => Some(StatusWord {
                sw1: *sw1,
                sw2: *sw2,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.sw1, self.sw2)
    }
}

/// Whether `response` ends with `90 00`.
pub fn is_success(response: &[u8]) -> bool {
    StatusWord::from_response(response) == Some(StatusWord::SUCCESS)
}
