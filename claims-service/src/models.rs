use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ClaimsError, ClaimsResult};

/// Sum of amounts, `None` when it leaves the decimal range
pub fn checked_total<I: IntoIterator<Item = Decimal>>(amounts: I) -> Option<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
}

fn out_of_range(what: &str) -> ClaimsError {
    ClaimsError::AmountExceeded(format!("{what} exceeds the supported amount range"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Routine,
    Urgent,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    Pending,
    Approved,
    Denied,
    Expired,
}

/// Referral from a primary facility to secondary or tertiary care.
///
/// Once approved it carries a UTN (unique transaction number) that the
/// receiving facility validates when the enrollee presents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Referral {
    pub id: Uuid,
    pub utn: Option<String>,
    pub enrollee_id: Uuid,
    pub referring_facility_id: Uuid,
    pub receiving_facility_id: Uuid,
    pub diagnosis_code: String,
    pub diagnosis_description: String,
    pub reason: String,
    pub severity: Severity,
    pub status: ReferralStatus,
    pub utn_validated: bool,
    pub utn_validated_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub denial_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReferral {
    pub enrollee_id: Uuid,
    pub referring_facility_id: Uuid,
    pub receiving_facility_id: Uuid,
    pub diagnosis_code: String,
    pub diagnosis_description: String,
    pub reason: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaType {
    Ffs,
    Bundle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaCodeStatus {
    Pending,
    Approved,
    Rejected,
    Used,
    Expired,
}

/// Pre-authorization for a fee-for-service item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaCode {
    pub id: Uuid,
    pub code: String,
    pub enrollee_id: Uuid,
    pub facility_id: Uuid,
    pub referral_id: Uuid,
    pub admission_id: Option<Uuid>,
    pub pa_type: PaType,
    pub service_code: String,
    pub service_description: String,
    pub requested_amount: Decimal,
    pub approved_amount: Option<Decimal>,
    pub status: PaCodeStatus,
    pub justification: String,
    pub rejection_reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPaCode {
    pub referral_id: Uuid,
    pub facility_id: Uuid,
    pub pa_type: PaType,
    pub service_code: String,
    pub service_description: String,
    pub requested_amount: Decimal,
    pub justification: String,
}

/// Fixed-price treatment package for a group of diagnoses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    /// ICD-10 codes or code prefixes (`O80` also covers `O80.1`)
    pub diagnosis_codes: Vec<String>,
    pub included_services: Vec<String>,
    pub price: Decimal,
    pub active: bool,
}

impl Bundle {
    pub fn includes(&self, service_code: &str) -> bool {
        self.included_services
            .iter()
            .any(|s| s.eq_ignore_ascii_case(service_code.trim()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBundle {
    pub code: String,
    pub name: String,
    pub diagnosis_codes: Vec<String>,
    pub included_services: Vec<String>,
    pub price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionStatus {
    Admitted,
    Discharged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admission {
    pub id: Uuid,
    pub admission_number: String,
    pub referral_id: Uuid,
    pub enrollee_id: Uuid,
    pub facility_id: Uuid,
    pub bundle_id: Option<Uuid>,
    pub diagnosis_code: String,
    pub status: AdmissionStatus,
    pub admitted_at: DateTime<Utc>,
    pub discharged_at: Option<DateTime<Utc>>,
    pub ward: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAdmission {
    pub referral_id: Uuid,
    pub facility_id: Uuid,
    pub ward: Option<String>,
}

/// How a treatment line is paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Bundle,
    Ffs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treatment {
    pub id: Uuid,
    pub service_code: String,
    pub description: String,
    pub item_type: ItemType,
    /// The single line carrying the bundle price
    pub is_bundle_package: bool,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub pa_code_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTreatment {
    pub service_code: String,
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    /// PA code string; required for fee-for-service items
    pub pa_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: Uuid,
    pub claim_number: String,
    pub admission_id: Uuid,
    pub referral_id: Uuid,
    pub enrollee_id: Uuid,
    pub facility_id: Uuid,
    pub status: ClaimStatus,
    pub treatments: Vec<Treatment>,
    pub bundle_amount: Decimal,
    pub ffs_amount: Decimal,
    pub total_amount_claimed: Decimal,
    pub approved_amount: Option<Decimal>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub payment_batch_id: Option<Uuid>,
}

impl Claim {
    /// Recompute the bundle, FFS and total amounts from the lines
    ///
    /// Leaves the claim untouched when a total leaves the decimal range.
    pub fn recalculate_totals(&mut self) -> ClaimsResult<()> {
        let sum = |kind: ItemType| {
            checked_total(
                self.treatments
                    .iter()
                    .filter(|t| t.item_type == kind)
                    .map(|t| t.total_amount),
            )
        };
        let bundle_amount = sum(ItemType::Bundle).ok_or_else(|| out_of_range("Bundle amount"))?;
        let ffs_amount = sum(ItemType::Ffs).ok_or_else(|| out_of_range("FFS amount"))?;
        let total = bundle_amount
            .checked_add(ffs_amount)
            .ok_or_else(|| out_of_range("Claim total"))?;

        self.bundle_amount = bundle_amount;
        self.ffs_amount = ffs_amount;
        self.total_amount_claimed = total;
        Ok(())
    }
}

/// Settlement of approved claims for one facility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentBatch {
    pub id: Uuid,
    pub batch_number: String,
    pub facility_id: Uuid,
    pub claim_ids: Vec<Uuid>,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
}
