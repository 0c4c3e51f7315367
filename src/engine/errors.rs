//! # Engine Errors
//!
//! Error taxonomy for the template parsing and execution engine.

use axum::http::StatusCode;
use thiserror::Error;

use crate::provider::ProviderError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// A single placeholder-binding failure collected during template parsing.
///
/// Binding failures are collected, not raised one at a time, so a caller
/// sees every unresolved placeholder in one response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The placeholder's name has no entry in the parameter source
    #[error("Missing required parameter [{0}]")]
    Missing(String),

    /// A cast-hinted value failed the required coercion. A malformed
    /// numeric argument is a caller bug that must surface as a 4xx, never
    /// be silently zeroed.
    #[error("Parameter [{name}] value [{value}] is not a valid integer")]
    Cast { name: String, value: String },

    /// The placeholder carries a cast hint the engine does not know
    #[error("Parameter [{name}] has unknown cast hint [{hint}]")]
    UnknownCast { name: String, hint: String },
}

/// Engine errors
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// One or more placeholders failed to bind; no execution was attempted
    #[error("template binding failed ({} error(s))", .0.len())]
    Binding(Vec<BindError>),

    /// No endpoint is registered for the path, or the endpoint is disabled,
    /// or the effective verb has no bound template. All three are
    /// indistinguishable to callers.
    #[error("no endpoint registered for [{path}]")]
    EndpointNotFound { path: String },

    /// The endpoint names a connection the provider cannot serve
    #[error("unable to get connection [{connection}]")]
    ConnectionUnavailable { connection: String },

    /// The statement failed on the backend
    #[error("{0}")]
    Statement(String),
}

impl EngineError {
    /// Get the HTTP status code analogue for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::Binding(_) => StatusCode::BAD_REQUEST,
            EngineError::EndpointNotFound { .. } => StatusCode::NOT_FOUND,
            EngineError::ConnectionUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Statement(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ProviderError> for EngineError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::UnknownConnection(connection) => {
                EngineError::ConnectionUnavailable { connection }
            }
            ProviderError::Statement(message) => EngineError::Statement(message),
        }
    }
}
