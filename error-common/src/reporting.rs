// Error reporting through tracing

use crate::context::ErrorContext;
use crate::types::NicareError;

/// Log an error with its code and context.
///
/// Client errors (4xx) are expected guard rejections and log at `warn`;
/// everything else logs at `error`.
pub fn log_error(error: &NicareError, context: &ErrorContext) {
    let operation = context.operation.as_deref().unwrap_or("unknown");
    let request_id = context.request_id.as_deref().unwrap_or("-");

    if error.is_client_error() {
        tracing::warn!(
            error_code = error.code(),
            error_type = error.error_type(),
            operation,
            request_id,
            "{}",
            error
        );
    } else {
        tracing::error!(
            error_code = error.code(),
            error_type = error.error_type(),
            operation,
            request_id,
            "{}",
            error
        );
    }
}
