//! Role and permission based access control for the NiCare engine
//!
//! Users hold roles; roles hold permissions; users may also hold direct
//! permissions. Every service operation names the permission it needs and
//! calls `AccessControl::authorize` before touching any record.
//!
//! # Default roles
//!
//! | Role | Permissions |
//! |------|-------------|
//! | `super_admin` | `*` |
//! | `enrollment_officer` | enrollees, premiums, facilities |
//! | `facility_user` | create referrals, validate UTNs, request PA codes, admissions, create/submit claims |
//! | `claims_officer` | review and pay claims |
//! | `medical_director` | approve referrals and PA codes, manage bundles, review claims |

pub mod models;
pub mod repository;
pub mod engine;
pub mod error;

pub use models::*;
pub use engine::*;
pub use error::*;
pub use repository::{InMemoryRoleRepository, RoleRepository};
