use logger_redacted::LoggerConfig;
use serde::{Deserialize, Serialize};

/// Top-level NiCare configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NicareConfig {
    pub enrollment: EnrollmentSettings,
    pub claims: ClaimsSettings,
    pub logging: LoggerConfig,
}

/// Enrollment and premium inventory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollmentSettings {
    /// Days of coverage bought by one premium PIN
    pub coverage_days: i64,
    /// Prefix of generated enrollee numbers (`NGSCHA/BID/000001`)
    pub enrollee_number_prefix: String,
    /// Digits in a generated premium PIN
    pub pin_length: usize,
    /// Days an unused PIN stays redeemable
    pub pin_validity_days: i64,
}

impl Default for EnrollmentSettings {
    fn default() -> Self {
        Self {
            coverage_days: 365,
            enrollee_number_prefix: "NGSCHA".to_string(),
            pin_length: 12,
            pin_validity_days: 365,
        }
    }
}

/// Claims automation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimsSettings {
    /// Days an approved referral's UTN stays usable
    pub referral_validity_days: i64,
    /// Days an approved PA code stays usable
    pub pa_code_validity_days: i64,
    pub utn_prefix: String,
    pub pa_code_prefix: String,
    pub claim_number_prefix: String,
    pub admission_number_prefix: String,
    pub payment_batch_prefix: String,
    /// Claims may only be submitted once the admission is discharged
    pub require_discharge_before_submission: bool,
}

impl Default for ClaimsSettings {
    fn default() -> Self {
        Self {
            referral_validity_days: 30,
            pa_code_validity_days: 14,
            utn_prefix: "UTN".to_string(),
            pa_code_prefix: "PA".to_string(),
            claim_number_prefix: "CLM".to_string(),
            admission_number_prefix: "ADM".to_string(),
            payment_batch_prefix: "BATCH".to_string(),
            require_discharge_before_submission: true,
        }
    }
}
