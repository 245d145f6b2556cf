// Configuration validation
use crate::error::{ConfigError, Result};
use crate::settings::NicareConfig;

pub use logger_redacted::{MAX_PIN_LENGTH, MIN_PIN_LENGTH};

impl NicareConfig {
    /// Reject settings the services cannot run with
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        let windows = [
            ("enrollment.coverage_days", self.enrollment.coverage_days),
            ("enrollment.pin_validity_days", self.enrollment.pin_validity_days),
            ("claims.referral_validity_days", self.claims.referral_validity_days),
            ("claims.pa_code_validity_days", self.claims.pa_code_validity_days),
        ];
        for (key, days) in windows {
            if days <= 0 {
                problems.push(format!("{key} must be positive (got {days})"));
            }
        }

        if !(MIN_PIN_LENGTH..=MAX_PIN_LENGTH).contains(&self.enrollment.pin_length) {
            problems.push(format!(
                "enrollment.pin_length must be between {MIN_PIN_LENGTH} and {MAX_PIN_LENGTH} (got {})",
                self.enrollment.pin_length
            ));
        }

        let prefixes = [
            ("enrollment.enrollee_number_prefix", &self.enrollment.enrollee_number_prefix),
            ("claims.utn_prefix", &self.claims.utn_prefix),
            ("claims.pa_code_prefix", &self.claims.pa_code_prefix),
            ("claims.claim_number_prefix", &self.claims.claim_number_prefix),
            ("claims.admission_number_prefix", &self.claims.admission_number_prefix),
            ("claims.payment_batch_prefix", &self.claims.payment_batch_prefix),
        ];
        for (key, prefix) in prefixes {
            if prefix.trim().is_empty() {
                problems.push(format!("{key} must not be empty"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(problems.join("; ")))
        }
    }
}
