//! Client error handling
//!
//! Every backend, storage and export failure is converted into
//! [`ClientError`] at the call site so nothing escapes to the UI layer
//! as a panic.

use survey_shared::errors::AnswerError;
use thiserror::Error;
use tracing::error;

/// Client error type
#[derive(Error, Debug)]
pub enum ClientError {
    /// A wizard step failed validation; recoverable, nothing is lost
    #[error("Validation error: {0}")]
    Validation(#[from] AnswerError),

    /// The user already responded to this form
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backend answered with an error envelope or error status
    #[error("API error: {message}")]
    Api {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        ClientError::Config(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl ClientError {
    /// Message suitable for a transient notification
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(err) => err.to_string(),
            ClientError::Conflict(msg) => msg.clone(),
            ClientError::Api { message, .. } => message.clone(),
            ClientError::Transport(err) if err.is_timeout() => {
                "The server took too long to respond. Please try again.".to_string()
            }
            ClientError::Transport(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ClientError::Internal(err) => {
                error!("Internal error: {:?}", err);
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Api { status, .. } => status.map_or(true, |s| s >= 500),
            _ => false,
        }
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
