//! Error types for hardware operations.
//!
//! Bus and pin failures are never surfaced to a remote caller; the card
//! reader loop turns them into a reconnect and the workers log them.

use homekey_core::PinDirection;

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Bus transaction failed.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Device initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Pin cannot be used in the requested direction.
    #[error("Pin {pin} does not support {direction} mode")]
    UnsupportedPin { pin: u8, direction: PinDirection },

    /// Invalid data received from device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a new unsupported pin error.
    pub fn unsupported_pin(pin: u8, direction: PinDirection) -> Self {
        Self::UnsupportedPin { pin, direction }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Whether this error means the reader link is gone and must be rebuilt.
    pub fn is_link_failure(&self) -> bool {
        matches!(
            self,
            Self::Disconnected { .. }
                | Self::CommunicationError { .. }
                | Self::InitializationFailed { .. }
                | Self::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("PN532");
        assert!(matches!(error, HardwareError::Disconnected { .. }));
        assert_eq!(error.to_string(), "Device disconnected: PN532");
    }

    #[test]
    fn test_communication_error() {
        let error = HardwareError::communication("writeRegister failed");
        assert_eq!(error.to_string(), "Communication error: writeRegister failed");
        assert!(error.is_link_failure());
    }

    #[test]
    fn test_unsupported_pin_error() {
        let error = HardwareError::unsupported_pin(34, PinDirection::Output);
        assert_eq!(error.to_string(), "Pin 34 does not support output mode");
        assert!(!error.is_link_failure());
    }
}
