use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Value conversion errors
    #[error("Invalid lock state: {0}")]
    InvalidLockState(u8),

    #[error("Invalid trigger source: {0}")]
    InvalidTriggerSource(u8),

    #[error("Invalid pixel type: {0}")]
    InvalidPixelType(u8),

    #[error("Invalid key color: {0}")]
    InvalidKeyColor(u8),

    #[error("Invalid configuration section: {0}")]
    InvalidSection(String),

    // Hardware errors
    #[error("Pin {0} is not assigned")]
    PinUnassigned(u8),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
