use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub title: String,
    pub description: String,
}

impl FieldError {
    pub fn new(field: &str, title: impl Into<String>, description: impl Into<String>) -> Self {
        FieldError {
            field: field.to_string(),
            title: title.into(),
            description: description.into(),
        }
    }
}

#[derive(Error, Clone, Debug, Serialize, PartialEq)]
pub enum SettleError {
    /// Local input check failed before any ledger call
    #[error("Invalid input for field `{}`: {}", .0.field, .0.description)]
    Validation(FieldError),

    /// The ledger could not be reached or answered with an unreadable body
    #[error("Network error: {0}")]
    Network(String),

    /// The ledger refused the request
    #[error("{message}")]
    ServerRejection { status: u16, message: String },

    /// Session is missing or expired
    #[error("Not authenticated: {0}")]
    Auth(String),

    /// The requested action is not available in the current workflow state
    #[error("Cannot {action} while {state}")]
    InvalidTransition { action: String, state: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SettleError {
    pub fn validation(field: &str, title: impl Into<String>, description: impl Into<String>) -> Self {
        SettleError::Validation(FieldError::new(field, title, description))
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        SettleError::ServerRejection {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_transition(action: &str, state: &str) -> Self {
        SettleError::InvalidTransition {
            action: action.to_string(),
            state: state.to_string(),
        }
    }

    /// Text rendered inline in the workflow. Ledger messages pass through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            SettleError::Validation(field) => field.description.clone(),
            SettleError::ServerRejection { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, SettleError::Network(_) | SettleError::ServerRejection { .. })
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, SettleError::Auth(_))
    }
}
