use audit_engine::AuditError;
use auth_rbac::RbacError;
use error_common::{codes, FieldErrors, NicareError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrollmentError {
    #[error("Validation error: {message}")]
    Validation { message: String, fields: FieldErrors },

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Enrollee is not eligible: {0}")]
    NotEligible(String),

    #[error("Premium PIN cannot be used: {0}")]
    PinUnavailable(String),

    #[error("Premium PIN has expired")]
    PinExpired,

    #[error("Facility is not usable: {0}")]
    FacilityInactive(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Rbac(#[from] RbacError),

    #[error(transparent)]
    Audit(#[from] AuditError),
}

impl EnrollmentError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.clone()]);
        Self::Validation { message, fields }
    }
}

impl From<EnrollmentError> for NicareError {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::Validation { message, fields } => {
                NicareError::validation_with_fields(message, fields)
            }
            EnrollmentError::NotFound { resource, id } => NicareError::not_found(resource, id),
            EnrollmentError::Conflict(msg) => NicareError::Conflict(msg),
            EnrollmentError::NotEligible(_) => {
                NicareError::business_rule(codes::enrollment::ENROLLEE_NOT_ELIGIBLE, err.to_string())
            }
            EnrollmentError::PinUnavailable(_) => {
                NicareError::business_rule(codes::enrollment::PIN_UNAVAILABLE, err.to_string())
            }
            EnrollmentError::PinExpired => {
                NicareError::business_rule(codes::enrollment::PIN_EXPIRED, err.to_string())
            }
            EnrollmentError::FacilityInactive(_) => {
                NicareError::business_rule(codes::enrollment::FACILITY_INACTIVE, err.to_string())
            }
            EnrollmentError::InvalidState(_) => {
                NicareError::business_rule(codes::claims::INVALID_STATUS_TRANSITION, err.to_string())
            }
            EnrollmentError::Rbac(e) => e.into(),
            EnrollmentError::Audit(e) => e.into(),
        }
    }
}

pub type EnrollmentResult<T> = Result<T, EnrollmentError>;
