//! Audit logging for the NiCare engine
//!
//! Every write performed by the enrollment and claims services is recorded
//! as an `AuditEntry`. Entries are append-only and hash-chained: each entry
//! stores the SHA-256 of its predecessor, so editing or removing an entry
//! breaks every later link. `verify_chain` detects such breaks and
//! `merkle_root` summarises the whole trail in one digest that can be
//! published or archived for later comparison.
//!
//! # Example
//!
//! ```rust
//! use audit_engine::{AuditEngine, AuditEvent, AuditQuery};
//! use serde_json::json;
//!
//! # tokio_test_block_on(async {
//! let engine = AuditEngine::new();
//! engine.log(AuditEvent::new(
//!     "user-42",
//!     "referral.approved",
//!     "referral",
//!     "2f1c",
//!     json!({ "utn": "UTN-20240101-AB12CD" }),
//! )).await?;
//!
//! let trail = engine.search(&AuditQuery::new().subject("referral", "2f1c")).await;
//! assert_eq!(trail.len(), 1);
//! engine.verify_chain().await?;
//! # Ok::<(), audit_engine::AuditError>(())
//! # }).unwrap();
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod engine;
pub mod entry;
pub mod error;

pub use engine::*;
pub use entry::*;
pub use error::*;
