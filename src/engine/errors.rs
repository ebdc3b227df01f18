//! Engine error types
//!
//! Error codes:
//! - ROWVIEW_INVALID_ROWS (ERROR)
//! - ROWVIEW_INVALID_STATE (ERROR)
//! - ROWVIEW_INVALID_CONFIG (ERROR)
//!
//! Projection itself never fails: shard failures degrade to the sequential
//! path. Only decoding caller input can produce an `EngineError`.

use std::error::Error;
use std::fmt;

use crate::observability::Severity;
use crate::store::StoreError;

/// Engine error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorCode {
    /// Row payload is not an array of objects
    RowviewInvalidRows,
    /// Query state payload could not be decoded
    RowviewInvalidState,
    /// Configuration could not be read, decoded or validated
    RowviewInvalidConfig,
}

impl EngineErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            EngineErrorCode::RowviewInvalidRows => "ROWVIEW_INVALID_ROWS",
            EngineErrorCode::RowviewInvalidState => "ROWVIEW_INVALID_STATE",
            EngineErrorCode::RowviewInvalidConfig => "ROWVIEW_INVALID_CONFIG",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for EngineErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Engine error with code, message and optional cause
#[derive(Debug)]
pub struct EngineError {
    code: EngineErrorCode,
    message: String,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl EngineError {
    pub fn invalid_rows(source: StoreError) -> Self {
        Self {
            code: EngineErrorCode::RowviewInvalidRows,
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn invalid_state(source: serde_json::Error) -> Self {
        Self {
            code: EngineErrorCode::RowviewInvalidState,
            message: format!("query state is not valid: {}", source),
            source: Some(Box::new(source)),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self {
            code: EngineErrorCode::RowviewInvalidConfig,
            message: reason.into(),
            source: None,
        }
    }

    /// Invalid configuration caused by an underlying error
    pub fn invalid_config_from<E>(reason: impl Into<String>, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            code: EngineErrorCode::RowviewInvalidConfig,
            message: format!("{}: {}", reason.into(), source),
            source: Some(Box::new(source)),
        }
    }

    pub fn code(&self) -> EngineErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code, self.message)
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::invalid_rows(err)
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
