use audit_engine::AuditError;
use auth_rbac::RbacError;
use enrollment_service::EnrollmentError;
use error_common::{codes, FieldErrors, NicareError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClaimsError {
    #[error("Validation error: {message}")]
    Validation { message: String, fields: FieldErrors },

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    ReferralNotApproved(String),

    #[error("{0}")]
    UtnNotValidated(String),

    #[error("{0}")]
    UtnInvalid(String),

    #[error("{0}")]
    PaCodeNotApproved(String),

    #[error("{0}")]
    PaCodeExpired(String),

    #[error("{0}")]
    InvalidStatus(String),

    #[error("{0}")]
    FacilityMismatch(String),

    #[error("{0}")]
    AmountExceeded(String),

    #[error("{0}")]
    NotDischarged(String),

    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),

    #[error(transparent)]
    Rbac(#[from] RbacError),

    #[error(transparent)]
    Audit(#[from] AuditError),
}

impl ClaimsError {
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

    /// Business rule code reported to API clients
    pub fn rule_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ReferralNotApproved(_) => codes::claims::REFERRAL_NOT_APPROVED,
            Self::UtnNotValidated(_) => codes::claims::UTN_NOT_VALIDATED,
            Self::UtnInvalid(_) => codes::claims::UTN_INVALID,
            Self::PaCodeNotApproved(_) => codes::claims::PA_CODE_NOT_APPROVED,
            Self::PaCodeExpired(_) => codes::claims::PA_CODE_EXPIRED,
            Self::InvalidStatus(_) => codes::claims::INVALID_STATUS_TRANSITION,
            Self::FacilityMismatch(_) => codes::claims::FACILITY_MISMATCH,
            Self::AmountExceeded(_) => codes::claims::AMOUNT_EXCEEDED,
            Self::NotDischarged(_) => codes::claims::ADMISSION_NOT_DISCHARGED,
            _ => return None,
        };
        Some(code)
    }
}

impl From<ClaimsError> for NicareError {
    fn from(err: ClaimsError) -> Self {
        if let Some(code) = err.rule_code() {
            return NicareError::business_rule(code, err.to_string());
        }
        match err {
            ClaimsError::Validation { message, fields } => {
                NicareError::validation_with_fields(message, fields)
            }
            ClaimsError::NotFound { resource, id } => NicareError::not_found(resource, id),
            ClaimsError::Conflict(msg) => NicareError::Conflict(msg),
            ClaimsError::Enrollment(e) => e.into(),
            ClaimsError::Rbac(e) => e.into(),
            ClaimsError::Audit(e) => e.into(),
            other => NicareError::Internal(other.to_string()),
        }
    }
}

pub type ClaimsResult<T> = Result<T, ClaimsError>;
