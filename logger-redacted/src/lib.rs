pub mod redactor;
pub mod macros;
pub mod config;
pub mod init;

pub use redactor::*;
pub use config::*;
pub use init::*;

// Logging for the NiCare engine with automatic PII redaction
//
// Enrollee records carry personal data that must never reach log files in
// clear text. Free-text messages logged through the `redacted_*!` macros are
// passed through `PiiRedactor` first.
//
// # Detected Data Types
//
// - **Email Addresses**: amina@example.com → a***@e***
// - **Phone Numbers**: 08031234567 / +2348031234567 → ***4567
// - **NIN**: 11-digit National Identification Numbers → ***********
// - **Premium PINs**: 8-20 digit scratch-card PINs → ****5521
// - **Custom Patterns**: configurable regex replacements
//
// With `hash_for_correlation` (the default) each value is replaced by a short
// SHA-256 digest instead, so two log lines about the same enrollee can still
// be correlated.
//
// # Example
//
// ```rust
// use logger_redacted::{init_tracing, redacted_info, LoggerConfig};
//
// init_tracing(&LoggerConfig::default())?;
// redacted_info!("PIN {} redeemed by enrollee {}", pin, phone);
// ```
