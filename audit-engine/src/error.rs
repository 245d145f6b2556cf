use error_common::NicareError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Audit entry validation failed: {0}")]
    ValidationError(String),

    #[error("Audit chain broken at entry {index} ({entry_id})")]
    IntegrityCheckError { index: usize, entry_id: String },
}

impl From<AuditError> for NicareError {
    fn from(err: AuditError) -> Self {
        match err {
            AuditError::ValidationError(msg) => NicareError::validation(msg),
            other => NicareError::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
