//! Enrollment for the NiCare health insurance scheme
//!
//! - Facility registry (primary, secondary and tertiary HCPs)
//! - Enrollee register with generated enrollee numbers
//! - Premium scratch-card inventory; redeeming a PIN activates coverage
//! - Eligibility checks used by the claims workflow
//! - Bulk spreadsheet import with per-row error reporting
//!
//! All writes go through `EnrollmentService`, which checks the caller's
//! permissions and records an audit entry.

pub mod clock;
pub mod eligibility;
pub mod error;
pub mod import;
pub mod models;
pub mod premium;
pub mod repository;
pub mod service;
pub mod validation;

pub use clock::{Clock, FixedClock, SystemClock};
pub use eligibility::evaluate as evaluate_eligibility;
pub use error::{EnrollmentError, EnrollmentResult};
pub use import::{EnrolleeImportRow, EnrolleeImporter, ImportReport, RowError};
pub use models::*;
pub use repository::{EnrollmentRepository, InMemoryEnrollmentRepository};
pub use service::EnrollmentService;
