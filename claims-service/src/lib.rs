//! Claims automation for the NiCare scheme
//!
//! The workflow a secondary or tertiary facility follows to get paid:
//!
//! 1. **Referral**: the primary facility refers an eligible enrollee; once
//!    approved it carries a UTN that the receiving facility validates.
//! 2. **PA code**: fee-for-service items need a pre-authorization code
//!    requested on the validated referral.
//! 3. **Admission**: allowed only on an approved, validated referral; the
//!    treatment bundle is matched from the diagnosis.
//! 4. **Claim**: a bundle package line at the bundle price plus itemised
//!    lines. Items inside the bundle add nothing; FFS items consume a PA
//!    code. `bundle_amount + ffs_amount = total_amount_claimed` always holds.
//! 5. **Review and payment**: submitted claims are approved or rejected and
//!    approved claims are settled per facility in payment batches.

pub mod admission;
pub mod bundle;
pub mod claim;
pub mod error;
pub mod models;
pub mod numbers;
pub mod pa_code;
pub mod payment;
pub mod referral;
pub mod service;
pub mod store;

pub use bundle::{classify, match_bundle};
pub use error::{ClaimsError, ClaimsResult};
pub use models::*;
pub use service::ClaimsAutomation;
pub use store::{ClaimsState, ClaimsStore};
