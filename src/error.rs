use std::error::Error;

use rusoto_core::credential::CredentialsError;
use rusoto_core::request::TlsError;
use rusoto_core::RusotoError;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::io;

#[derive(Debug, PartialEq)]
pub enum LabsError {
    NoneValue,
    Authorization(String),
    Validation(String),
    Conflict(String),
    Client(String),
    NotFound(String),
    Serialization(String),
    Io(String),
    Config(String),
}

pub type Result<T> = std::result::Result<T, LabsError>;

impl LabsError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, LabsError::Conflict(_))
    }

    /// Classifies an error response body returned by an AWS JSON/REST API.
    pub fn from_response(status: u16, body: &[u8]) -> LabsError {
        let message = String::from_utf8_lossy(body).to_string();
        let error_type = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .get("__type")
                    .or_else(|| value.get("code"))
                    .and_then(|t| t.as_str())
                    .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
            })
            .unwrap_or_default();

        match (status, error_type.as_str()) {
            (409, _) | (_, "ConflictException") => LabsError::Conflict(message),
            (_, "ValidationException") => LabsError::Validation(message),
            (404, _) | (_, "ResourceNotFoundException") => LabsError::NotFound(message),
            (401, _) | (403, _) | (_, "AccessDeniedException") => {
                LabsError::Authorization(message)
            }
            _ => LabsError::Client(format!("{}: {}", status, message)),
        }
    }
}

impl Display for LabsError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            LabsError::NoneValue => write!(f, "Value is None"),
            LabsError::Authorization(ref message) => write!(f, "Not authorized: {}", message),
            LabsError::Validation(ref message) => {
                write!(f, "Parameter validation error: {}", message)
            }
            LabsError::Conflict(ref message) => write!(f, "Resource already exists: {}", message),
            LabsError::Client(ref message) => write!(f, "Unexpected error: {}", message),
            LabsError::NotFound(ref message) => write!(f, "Not found: {}", message),
            LabsError::Serialization(ref message) => {
                write!(f, "Failed to serialize record: {}", message)
            }
            LabsError::Io(ref message) => write!(f, "I/O error: {}", message),
            LabsError::Config(ref message) => write!(f, "Invalid configuration: {}", message),
        }
    }
}

impl Error for LabsError {}

impl<E: Error + 'static> From<RusotoError<E>> for LabsError {
    fn from(e: RusotoError<E>) -> LabsError {
        match e {
            RusotoError::Credentials(error) => LabsError::Authorization(error.to_string()),
            RusotoError::Validation(message) => LabsError::Validation(message),
            RusotoError::Unknown(response) => {
                let body = response.body.to_vec();
                let text = String::from_utf8_lossy(&body);
                // Query protocol services (EC2, CloudFormation) report the code in XML.
                if text.contains("<Code>ValidationError</Code>") {
                    LabsError::Validation(text.to_string())
                } else if text.contains("AccessDenied") || text.contains("<Code>AuthFailure</Code>")
                {
                    LabsError::Authorization(text.to_string())
                } else {
                    LabsError::from_response(response.status.as_u16(), &body)
                }
            }
            other => LabsError::Client(other.to_string()),
        }
    }
}

impl From<CredentialsError> for LabsError {
    fn from(e: CredentialsError) -> LabsError {
        LabsError::Authorization(e.to_string())
    }
}

impl From<TlsError> for LabsError {
    fn from(e: TlsError) -> LabsError {
        LabsError::Client(e.to_string())
    }
}

impl From<io::Error> for LabsError {
    fn from(e: io::Error) -> LabsError {
        LabsError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for LabsError {
    fn from(e: serde_json::Error) -> LabsError {
        LabsError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for LabsError {
    fn from(e: reqwest::Error) -> LabsError {
        LabsError::Client(e.to_string())
    }
}
