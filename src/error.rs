//! Error types for the finance coach service

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// A single rejected input field.
///
/// Validation stops at the first violated rule, so one request produces at
/// most one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Standard rejection for a field with the wrong shape.
    pub fn invalid_field(field: &str) -> Self {
        Self::new(field, format!("Invalid field '{}'", field))
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Error, Debug)]
pub enum AppError {

    // =============================
    // Request Errors
    // =============================

    #[error("Validation error: {0}")]
    Validation(ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    // =============================
    // Infrastructure Errors
    // =============================

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Password hashing error: {0}")]
    Password(String),

    // =============================
    // Assistant Errors
    // =============================

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    // =============================
    // Client-side Errors
    // =============================

    #[error("Onboarding error: {0}")]
    Onboarding(String),

    #[error("Client error: {0}")]
    Client(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}
