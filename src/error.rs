use thiserror::Error;

use crate::descriptor::Operation;

#[derive(Error, Debug)]
pub enum RabitError {
    /// Caller input was rejected before any request was sent.
    #[error("Invalid parameter `{param}`: {reason}")]
    Validation { param: String, reason: String },

    /// AutoRABIT answered with a non-success status.
    #[error("{operation} failed with status {status}: {body}")]
    Api {
        operation: Operation,
        status: u16,
        body: String,
    },

    #[error("{operation} could not reach AutoRABIT: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be initialised (TLS backend, resolver).
    #[error("Failed to initialise the HTTP client: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },

    /// A success status whose body is not a JSON object.
    #[error("{operation} returned an unreadable response (status {status}): {reason}")]
    InvalidResponse {
        operation: Operation,
        status: u16,
        body: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, RabitError>;

impl RabitError {
    pub(crate) fn validation(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            param: param.into(),
            reason: reason.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// HTTP status reported by AutoRABIT, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::InvalidResponse { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body, if a response was received.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Api { body, .. } | Self::InvalidResponse { body, .. } => Some(body),
            _ => None,
        }
    }
}
