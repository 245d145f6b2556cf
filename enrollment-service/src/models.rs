use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Healthcare facility level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelOfCare {
    Primary,
    Secondary,
    Tertiary,
}

impl LevelOfCare {
    /// Secondary and tertiary facilities accept referrals
    pub fn accepts_referrals(self) -> bool {
        matches!(self, Self::Secondary | Self::Tertiary)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacilityStatus {
    Active,
    Inactive,
}

/// Registered healthcare provider (HCP)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    pub id: Uuid,
    pub hcp_code: String,
    pub name: String,
    pub level_of_care: LevelOfCare,
    pub lga: String,
    pub status: FacilityStatus,
    pub created_at: DateTime<Utc>,
}

impl Facility {
    pub fn is_active(&self) -> bool {
        self.status == FacilityStatus::Active
    }
}

/// Facility registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewFacility {
    #[validate(length(min = 3, max = 20, message = "HCP code must be 3-20 characters"))]
    pub hcp_code: String,
    #[validate(length(min = 1, max = 200, message = "Facility name is required"))]
    pub name: String,
    pub level_of_care: LevelOfCare,
    #[validate(length(min = 3, message = "LGA is required"))]
    pub lga: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

/// Who pays the enrollee's premium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundingType {
    /// Civil servants, deducted at source
    Formal,
    /// Self-paying individuals and families
    Informal,
    /// Basic Health Care Provision Fund beneficiaries
    Bhcpf,
    /// State equity programme for the vulnerable
    Equity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrolleeStatus {
    Pending,
    Active,
    Suspended,
    Expired,
}

/// Scheme member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollee {
    pub id: Uuid,
    pub enrollee_number: String,
    pub first_name: String,
    pub last_name: String,
    pub nin: String,
    pub phone: String,
    pub email: Option<String>,
    pub sex: Sex,
    pub date_of_birth: NaiveDate,
    pub lga: String,
    pub primary_facility_id: Uuid,
    pub funding_type: FundingType,
    pub premium_id: Option<Uuid>,
    pub status: EnrolleeStatus,
    pub enrolled_at: Option<DateTime<Utc>>,
    pub coverage_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Enrollee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Enrollee registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewEnrollee {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    pub nin: String,
    pub phone: String,
    #[validate(email(message = "Email address is invalid"))]
    pub email: Option<String>,
    pub sex: Sex,
    pub date_of_birth: NaiveDate,
    #[validate(length(min = 3, message = "LGA is required"))]
    pub lga: String,
    pub primary_facility_id: Uuid,
    pub funding_type: FundingType,
}

/// Result of an eligibility check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub enrollee_id: Uuid,
    pub eligible: bool,
    pub status: EnrolleeStatus,
    pub coverage_expires_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PremiumType {
    Individual,
    Family,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PremiumStatus {
    Available,
    Used,
    Expired,
    Voided,
}

/// Premium scratch card: a serial number and a secret PIN
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Premium {
    pub id: Uuid,
    pub serial_number: String,
    pub pin: String,
    pub amount: Decimal,
    pub premium_type: PremiumType,
    pub status: PremiumStatus,
    pub batch_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_by: Option<Uuid>,
    pub used_at: Option<DateTime<Utc>>,
}

/// Output of a PIN generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PremiumBatch {
    pub batch_id: Uuid,
    pub premiums: Vec<Premium>,
    pub total_value: Decimal,
}

/// Count and face value of premiums in one status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTotals {
    pub count: usize,
    pub value: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventorySummary {
    pub available: StatusTotals,
    pub used: StatusTotals,
    pub expired: StatusTotals,
    pub voided: StatusTotals,
}

impl InventorySummary {
    pub fn totals_mut(&mut self, status: PremiumStatus) -> &mut StatusTotals {
        match status {
            PremiumStatus::Available => &mut self.available,
            PremiumStatus::Used => &mut self.used,
            PremiumStatus::Expired => &mut self.expired,
            PremiumStatus::Voided => &mut self.voided,
        }
    }
}
