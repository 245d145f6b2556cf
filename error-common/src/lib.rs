//! Common error handling utilities for the NiCare engine
//!
//! This module provides the error type shared by every NiCare crate, the
//! stable error codes returned to API clients, and the conversion of errors
//! into JSON error responses.
//!
//! # Error Categories
//!
//! - **Validation**: malformed input, with optional per-field messages (422)
//! - **Unauthenticated**: missing or invalid credentials (401)
//! - **Forbidden**: the actor lacks a permission (403)
//! - **NotFound**: referenced record does not exist (404)
//! - **Conflict**: duplicate or concurrently modified record (409)
//! - **BusinessRule**: a workflow guard rejected the operation (422)
//! - **RateLimited**: too many requests (429)
//! - **Configuration / Internal**: server-side faults (500)
//!
//! # Example
//!
//! ```rust
//! use error_common::{codes, NicareError};
//!
//! fn admit(referral_approved: bool) -> Result<(), NicareError> {
//!     if !referral_approved {
//!         return Err(NicareError::business_rule(
//!             codes::claims::REFERRAL_NOT_APPROVED,
//!             "Referral must be approved before admission",
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! let err = admit(false).unwrap_err();
//! assert_eq!(err.status_code().as_u16(), 422);
//! ```

pub mod types;
pub mod context;
pub mod codes;
pub mod reporting;
pub mod response;

pub use types::*;
pub use context::*;
pub use reporting::*;
pub use response::*;
