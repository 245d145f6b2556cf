use error_common::NicareError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RbacError {
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("Invalid permission: {0}")]
    InvalidPermission(String),

    #[error("User {user} lacks permission {permission}")]
    Forbidden { user: String, permission: String },

    #[error("Repository error: {0}")]
    RepositoryError(String),
}

impl From<RbacError> for NicareError {
    fn from(err: RbacError) -> Self {
        match err {
            RbacError::Forbidden { .. } => NicareError::Forbidden(err.to_string()),
            RbacError::RoleNotFound(name) => NicareError::not_found("Role", name),
            RbacError::InvalidPermission(p) => NicareError::validation(format!("Invalid permission: {p}")),
            RbacError::RepositoryError(msg) => NicareError::Internal(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, RbacError>;
