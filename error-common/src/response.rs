use axum::{
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::ErrorContext;
use crate::reporting::log_error;
use crate::types::{FieldErrors, NicareError};

/// Standard API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Error type
    pub error_type: String,
    /// Stable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Field-specific validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<FieldErrors>,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Request ID for correlation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ApiErrorResponse {
    pub fn from_error(error: &NicareError) -> Self {
        // Server-side faults never leak their internals to the client.
        let message = if error.is_client_error() {
            error.to_string()
        } else {
            "An internal error occurred".to_string()
        };

        let field_errors = match error {
            NicareError::Validation { field_errors, .. } => field_errors.clone(),
            _ => None,
        };

        Self {
            error_id: Uuid::new_v4().to_string(),
            error_type: error.error_type().to_string(),
            code: error.code().to_string(),
            message,
            field_errors,
            timestamp: Utc::now(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl IntoResponse for NicareError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorResponse::from_error(&self);

        log_error(&self, &ErrorContext::new().with_request_id(body.error_id.clone()));

        (status, Json(body)).into_response()
    }
}
