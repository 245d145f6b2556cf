use auth_rbac::{permissions, Actor};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ClaimsError, ClaimsResult};
use crate::models::{NewPaCode, PaCode, PaCodeStatus, PaType, ReferralStatus};
use crate::numbers::{dated_code, random_code};
use crate::service::ClaimsAutomation;
use crate::store::ClaimsState;

const PA_SUFFIX_LEN: usize = 8;

/// What a treatment line needs from its PA code
pub(crate) struct PaUsage<'a> {
    pub code: &'a str,
    pub enrollee_id: Uuid,
    pub facility_id: Uuid,
    pub admission_id: Uuid,
    pub line_total: Decimal,
    pub at: DateTime<Utc>,
}

/// Mark an approved FFS PA code as used by a treatment line
pub(crate) fn consume(state: &mut ClaimsState, usage: &PaUsage<'_>) -> ClaimsResult<Uuid> {
    let id = state.pa_code_id_by_code(usage.code)?;
    let pa = state.pa_code_mut(id)?;

    match pa.status {
        PaCodeStatus::Approved => {}
        PaCodeStatus::Used => {
            return Err(ClaimsError::PaCodeNotApproved(format!(
                "PA code {} has already been used",
                pa.code
            )))
        }
        PaCodeStatus::Expired => {
            return Err(ClaimsError::PaCodeExpired(format!("PA code {} has expired", pa.code)))
        }
        PaCodeStatus::Pending | PaCodeStatus::Rejected => {
            return Err(ClaimsError::PaCodeNotApproved(
                "FFS treatment requires an approved PA code".to_string(),
            ))
        }
    }
    if pa.expires_at.is_some_and(|expires| expires <= usage.at) {
        return Err(ClaimsError::PaCodeExpired(format!("PA code {} has expired", pa.code)));
    }
    if pa.pa_type != PaType::Ffs {
        return Err(ClaimsError::PaCodeNotApproved(format!(
            "PA code {} does not authorize fee-for-service items",
            pa.code
        )));
    }
    if pa.enrollee_id != usage.enrollee_id || pa.facility_id != usage.facility_id {
        return Err(ClaimsError::FacilityMismatch(format!(
            "PA code {} was issued for a different enrollee or facility",
            pa.code
        )));
    }
    let approved = pa.approved_amount.unwrap_or(Decimal::ZERO);
    if usage.line_total > approved {
        return Err(ClaimsError::AmountExceeded(format!(
            "Line total {} exceeds the {approved} approved on PA code {}",
            usage.line_total, pa.code
        )));
    }

    pa.status = PaCodeStatus::Used;
    pa.admission_id = Some(usage.admission_id);
    Ok(id)
}

/// Return a used PA code to the approved pool
pub(crate) fn release(state: &mut ClaimsState, pa_code_id: Uuid) -> ClaimsResult<()> {
    let pa = state.pa_code_mut(pa_code_id)?;
    if pa.status == PaCodeStatus::Used {
        pa.status = PaCodeStatus::Approved;
        pa.admission_id = None;
    }
    Ok(())
}

impl ClaimsAutomation {
    /// Receiving facility asks for authorization of an item on a validated referral
    pub async fn request_pa_code(&self, actor: &Actor, input: NewPaCode) -> ClaimsResult<PaCode> {
        self.access.authorize(actor, permissions::PA_CODES_REQUEST).await?;
        if input.requested_amount <= Decimal::ZERO {
            return Err(ClaimsError::field("requested_amount", "Requested amount must be positive"));
        }
        let service_code = input.service_code.trim().to_ascii_uppercase();
        if service_code.is_empty() {
            return Err(ClaimsError::field("service_code", "Service code is required"));
        }
        let now = self.clock.now();

        let pa_code = self.store.transaction(|state| {
            let referral = state.referral(input.referral_id)?;
            if referral.status != ReferralStatus::Approved {
                return Err(ClaimsError::ReferralNotApproved(
                    "Referral must be approved before requesting a PA code".to_string(),
                ));
            }
            if !referral.utn_validated {
                return Err(ClaimsError::UtnNotValidated(
                    "Referral UTN must be validated before requesting a PA code".to_string(),
                ));
            }
            if referral.receiving_facility_id != input.facility_id {
                return Err(ClaimsError::FacilityMismatch(
                    "PA codes can only be requested by the receiving facility".to_string(),
                ));
            }
            let enrollee_id = referral.enrollee_id;

            let code = loop {
                let candidate = dated_code(
                    &self.settings.pa_code_prefix,
                    now,
                    &random_code(&mut rand::thread_rng(), PA_SUFFIX_LEN),
                );
                if !state.pa_code_exists(&candidate) {
                    break candidate;
                }
            };
            let pa_code = PaCode {
                id: Uuid::new_v4(),
                code,
                enrollee_id,
                facility_id: input.facility_id,
                referral_id: input.referral_id,
                admission_id: None,
                pa_type: input.pa_type,
                service_code,
                service_description: input.service_description.trim().to_string(),
                requested_amount: input.requested_amount,
                approved_amount: None,
                status: PaCodeStatus::Pending,
                justification: input.justification.trim().to_string(),
                rejection_reason: None,
                requested_at: now,
                reviewed_at: None,
                expires_at: None,
                reviewed_by: None,
            };
            state.pa_codes.insert(pa_code.id, pa_code.clone());
            Ok(pa_code)
        })?;

        self.record(
            actor,
            "pa_code.requested",
            "pa_code",
            pa_code.id,
            json!({
                "code": pa_code.code,
                "service_code": pa_code.service_code,
                "requested_amount": pa_code.requested_amount,
            }),
        )
        .await?;
        info!(code = %pa_code.code, "PA code requested");
        Ok(pa_code)
    }

    /// Approve a pending PA code; the amount defaults to the one requested
    pub async fn approve_pa_code(
        &self,
        actor: &Actor,
        pa_code_id: Uuid,
        approved_amount: Option<Decimal>,
    ) -> ClaimsResult<PaCode> {
        self.access.authorize(actor, permissions::PA_CODES_APPROVE).await?;
        let now = self.clock.now();
        let validity = Duration::days(self.settings.pa_code_validity_days);

        let pa_code = self.store.transaction(|state| {
            let pa = state.pa_code_mut(pa_code_id)?;
            if pa.status != PaCodeStatus::Pending {
                return Err(ClaimsError::InvalidStatus(
                    "Only pending PA codes can be approved".to_string(),
                ));
            }
            let amount = approved_amount.unwrap_or(pa.requested_amount);
            if amount <= Decimal::ZERO {
                return Err(ClaimsError::field("approved_amount", "Approved amount must be positive"));
            }
            if amount > pa.requested_amount {
                return Err(ClaimsError::AmountExceeded(format!(
                    "Approved amount {amount} exceeds the requested {}",
                    pa.requested_amount
                )));
            }
            pa.status = PaCodeStatus::Approved;
            pa.approved_amount = Some(amount);
            pa.reviewed_at = Some(now);
            pa.reviewed_by = Some(actor.user_id);
            pa.expires_at = Some(now + validity);
            Ok(pa.clone())
        })?;

        self.record(
            actor,
            "pa_code.approved",
            "pa_code",
            pa_code_id,
            json!({ "code": pa_code.code, "approved_amount": pa_code.approved_amount }),
        )
        .await?;
        info!(code = %pa_code.code, "PA code approved");
        Ok(pa_code)
    }

    pub async fn reject_pa_code(
        &self,
        actor: &Actor,
        pa_code_id: Uuid,
        reason: &str,
    ) -> ClaimsResult<PaCode> {
        self.access.authorize(actor, permissions::PA_CODES_APPROVE).await?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ClaimsError::field("reason", "A rejection reason is required"));
        }
        let now = self.clock.now();

        let pa_code = self.store.transaction(|state| {
            let pa = state.pa_code_mut(pa_code_id)?;
            if pa.status != PaCodeStatus::Pending {
                return Err(ClaimsError::InvalidStatus(
                    "Only pending PA codes can be rejected".to_string(),
                ));
            }
            pa.status = PaCodeStatus::Rejected;
            pa.rejection_reason = Some(reason.to_string());
            pa.reviewed_at = Some(now);
            pa.reviewed_by = Some(actor.user_id);
            Ok(pa.clone())
        })?;

        self.record(actor, "pa_code.rejected", "pa_code", pa_code_id, json!({ "reason": reason }))
            .await?;
        warn!(code = %pa_code.code, "PA code rejected");
        Ok(pa_code)
    }

    pub fn get_pa_code(&self, code: &str) -> ClaimsResult<PaCode> {
        let code = code.trim().to_ascii_uppercase();
        self.store.read(|s| {
            let id = s.pa_code_id_by_code(&code)?;
            s.pa_codes
                .get(&id)
                .cloned()
                .ok_or_else(|| ClaimsError::not_found("PA code", &code))
        })
    }

    /// Flip an approved PA code past its expiry to `Expired` and commit it
    pub(crate) async fn expire_pa_code_if_due(&self, actor: &Actor, code: &str) -> ClaimsResult<()> {
        let now = self.clock.now();
        let expired = self.store.transaction(|state| {
            let id = state.pa_code_id_by_code(code)?;
            let pa = state.pa_code_mut(id)?;
            let due = pa.status == PaCodeStatus::Approved
                && pa.expires_at.is_some_and(|expires| expires <= now);
            if due {
                pa.status = PaCodeStatus::Expired;
            }
            Ok(due.then_some(id))
        })?;
        if let Some(id) = expired {
            self.record(actor, "pa_code.expired", "pa_code", id, json!({ "code": code }))
                .await?;
            warn!(%code, "PA code expired");
        }
        Ok(())
    }
}
