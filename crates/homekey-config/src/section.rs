use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Addressable part of the configuration surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Feedback, actuator and alt-action settings.
    Actions,
    /// Device, pairing, battery and network settings.
    Misc,
    /// Read-only view of the reader identity.
    HkInfo,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Actions => "actions",
            Section::Misc => "misc",
            Section::HkInfo => "hkinfo",
        }
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self, Section::HkInfo)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s {
            "actions" => Ok(Section::Actions),
            "misc" => Ok(Section::Misc),
            "hkinfo" => Ok(Section::HkInfo),
            other => Err(ConfigError::UnknownSection(other.to_string())),
        }
    }
}
