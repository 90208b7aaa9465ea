//! Transport-facing request handling.
//!
//! Requests arrive with the section as a raw string and the body as raw
//! text, the way a web handler receives them. Every outcome maps to a
//! [`Response`] with an HTTP-like status code and a plain-text or JSON body.

use crate::engine::ConfigEngine;
use crate::error::ConfigError;
use crate::section::Section;
use serde_json::Value;
use tracing::{debug, error};

/// Reply to a configuration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn bad_request(body: impl Into<String>) -> Self {
        Self {
            status: 400,
            body: body.into(),
        }
    }

    pub fn server_error(body: impl Into<String>) -> Self {
        Self {
            status: 500,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

impl From<ConfigError> for Response {
    fn from(err: ConfigError) -> Self {
        match err {
            // unknown section gets an empty 400
            ConfigError::UnknownSection(_) => Response::bad_request(""),
            e if e.is_validation() => Response::bad_request(e.to_string()),
            e => Response::server_error(e.to_string()),
        }
    }
}

/// One configuration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigRequest {
    Get { section: String },
    Save { section: String, body: String },
    Clear { section: String },
}

impl ConfigRequest {
    /// Run the request against `engine`.
    pub async fn handle(self, engine: &mut ConfigEngine) -> Response {
        let result = match self {
            ConfigRequest::Get { section } => get(engine, &section).await,
            ConfigRequest::Save { section, body } => save(engine, &section, &body).await,
            ConfigRequest::Clear { section } => clear(engine, &section).await,
        };
        result.unwrap_or_else(Response::from)
    }
}

async fn get(engine: &ConfigEngine, section: &str) -> Result<Response, ConfigError> {
    let section: Section = section.parse()?;
    let value = engine.get(section).await;
    Ok(Response::ok(value.to_string()))
}

async fn save(engine: &mut ConfigEngine, section: &str, body: &str) -> Result<Response, ConfigError> {
    let section: Section = section.parse()?;
    let document: Value = match serde_json::from_str(body) {
        Ok(document) => document,
        Err(e) => {
            debug!("Rejected {} body: {}", section, e);
            return Err(ConfigError::NotAnObject);
        }
    };
    match engine.apply_partial(section, &document).await {
        Ok(outcome) => Ok(Response::ok(outcome.message())),
        Err(e) => {
            if !e.is_validation() {
                error!("Something went wrong, could not save: {}", e);
            }
            Err(e)
        }
    }
}

async fn clear(engine: &mut ConfigEngine, section: &str) -> Result<Response, ConfigError> {
    let section: Section = section.parse()?;
    engine.clear(section).await?;
    Ok(Response::ok("200 Success"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use homekey_storage::StorageError;

    #[test]
    fn test_error_status() {
        assert_eq!(
            Response::from(ConfigError::UnknownSection("mqtt".into())),
            Response::bad_request("")
        );
        let invalid = Response::from(ConfigError::unknown_field("bogus"));
        assert_eq!(invalid.status, 400);
        assert!(invalid.body.contains("bogus"));
        let persistence = Response::from(ConfigError::from(StorageError::CommitFailed("io".into())));
        assert_eq!(persistence.status, 500);
        assert!(!persistence.is_success());
    }
}
