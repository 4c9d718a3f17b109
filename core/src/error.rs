use std::fmt;
use thiserror::Error;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every rule a payload broke, in the order the rules were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    pub details: Vec<FieldError>,
}

impl ValidationError {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            details: vec![FieldError::new(field, message)],
        }
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.details.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn fields(&self) -> Vec<&str> {
        self.details.iter().map(|d| d.field.as_str()).collect()
    }

    /// Ok when nothing was recorded, otherwise the collected failures.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.details.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self
            .details
            .iter()
            .map(|d| format!("\"{}\" {}", d.field, d.message))
            .collect();
        write!(f, "{}", messages.join(". "))
    }
}

impl std::error::Error for ValidationError {}

#[derive(Error, Debug)]
pub enum ChargingError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Rules service unavailable: {0}")]
    RulesServiceUnavailable(String),

    #[error("Rules service returned an invalid response: {0}")]
    RulesServiceResponse(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    #[error("{0}")]
    InvalidState(String),

    #[error("Failed to generate file '{filename}': {source}")]
    FileGeneration {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChargingError {
    /// Errors a caller should report as unprocessable client data.
    pub fn is_unprocessable(&self) -> bool {
        matches!(self, ChargingError::Validation(_))
    }

    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        ChargingError::NotFound {
            entity,
            key: key.into(),
        }
    }
}

pub type ChargingResult<T> = Result<T, ChargingError>;
