use axum::http::StatusCode;
use std::collections::HashMap;
use thiserror::Error;

use crate::codes;

/// Per-field validation messages, keyed by field name
pub type FieldErrors = HashMap<String, Vec<String>>;

/// Error shared by every NiCare crate
#[derive(Error, Debug)]
pub enum NicareError {
    /// Input failed validation
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field_errors: Option<FieldErrors>,
    },

    /// Missing or invalid credentials
    #[error("Authentication error: {0}")]
    Unauthenticated(String),

    /// Actor lacks the permission for the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Referenced record does not exist
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// Duplicate or conflicting record
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A workflow guard rejected the operation
    #[error("{message}")]
    BusinessRule { code: &'static str, message: String },

    /// Too many requests
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Server configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal system errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// Wrapped external errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NicareError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn validation_with_fields(message: impl Into<String>, field_errors: FieldErrors) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: Some(field_errors),
        }
    }

    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    pub fn business_rule(code: &'static str, message: impl Into<String>) -> Self {
        Self::BusinessRule {
            code,
            message: message.into(),
        }
    }

    /// HTTP status the error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::BusinessRule { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Configuration(_) | Self::Internal(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable error code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => codes::validation::INVALID_INPUT,
            Self::Unauthenticated(_) => codes::authentication::INVALID_CREDENTIALS,
            Self::Forbidden(_) => codes::authorization::INSUFFICIENT_PERMISSIONS,
            Self::NotFound { .. } => codes::resource::NOT_FOUND,
            Self::Conflict(_) => codes::resource::DUPLICATE,
            Self::BusinessRule { code, .. } => *code,
            Self::RateLimited(_) => codes::system::RATE_LIMITED,
            Self::Configuration(_) => codes::system::CONFIGURATION,
            Self::Internal(_) | Self::Other(_) => codes::system::INTERNAL,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::Unauthenticated(_) => "authentication_error",
            Self::Forbidden(_) => "authorization_error",
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::BusinessRule { .. } => "business_rule_violation",
            Self::RateLimited(_) => "rate_limited",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) | Self::Other(_) => "internal_error",
        }
    }

    /// Whether the message may be shown to API clients verbatim
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Result type alias for NiCare operations
pub type Result<T> = std::result::Result<T, NicareError>;
