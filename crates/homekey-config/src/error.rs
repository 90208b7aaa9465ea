use homekey_storage::StorageError;
use thiserror::Error;

/// Configuration request failures.
///
/// Validation variants abort a batch before anything is mutated; their
/// messages are shown to the user verbatim.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field unknown in the section, or of the wrong JSON type
    #[error("\"{field}\" not of correct type or does not exist in config")]
    UnknownField { field: String },

    #[error("\"{value}\" is not a valid value for \"{field}\"")]
    InvalidValue { field: String, value: String },

    #[error("\"{value}\" is not a valid GPIO Pin for \"{field}\"")]
    InvalidPin { field: String, value: String },

    #[error("The Setup Code can only be set if no devices are paired, reset if any issues!")]
    SetupCodeLocked,

    #[error("Config document must be a JSON object")]
    NotAnObject,

    #[error("Unknown config section: {0}")]
    UnknownSection(String),

    #[error("Section {0} is read-only")]
    ReadOnlySection(String),

    /// Applied in memory but could not be made durable
    #[error("Could not save config: {0}")]
    Persistence(#[from] StorageError),
}

impl ConfigError {
    pub fn unknown_field(field: impl Into<String>) -> Self {
        ConfigError::UnknownField {
            field: field.into(),
        }
    }

    pub fn invalid_value(field: impl Into<String>, value: &serde_json::Value) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            value: value.to_string(),
        }
    }

    pub fn invalid_pin(field: impl Into<String>, value: &serde_json::Value) -> Self {
        ConfigError::InvalidPin {
            field: field.into(),
            value: value.to_string(),
        }
    }

    /// Whether the request was rejected before any state changed.
    pub fn is_validation(&self) -> bool {
        !matches!(self, ConfigError::Persistence(_))
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
