use auth_rbac::{permissions, Actor};
use chrono::Duration;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{ClaimsError, ClaimsResult};
use crate::models::{NewReferral, Referral, ReferralStatus};
use crate::numbers::{dated_code, random_code};
use crate::service::ClaimsAutomation;

const UTN_SUFFIX_LEN: usize = 6;

impl ClaimsAutomation {
    /// Raise a referral from the enrollee's facility to secondary or tertiary care
    #[instrument(skip(self, actor, input), fields(enrollee_id = %input.enrollee_id))]
    pub async fn create_referral(&self, actor: &Actor, input: NewReferral) -> ClaimsResult<Referral> {
        self.access.authorize(actor, permissions::REFERRALS_CREATE).await?;

        let diagnosis_code = input.diagnosis_code.trim().to_ascii_uppercase();
        if diagnosis_code.is_empty() {
            return Err(ClaimsError::field("diagnosis_code", "Diagnosis code is required"));
        }
        if input.referring_facility_id == input.receiving_facility_id {
            return Err(ClaimsError::field(
                "receiving_facility_id",
                "A facility cannot refer to itself",
            ));
        }

        self.enrollment.require_eligible(input.enrollee_id).await?;
        self.enrollment
            .require_active_facility(input.referring_facility_id)
            .await?;
        let receiving = self
            .enrollment
            .require_active_facility(input.receiving_facility_id)
            .await?;
        if !receiving.level_of_care.accepts_referrals() {
            return Err(ClaimsError::field(
                "receiving_facility_id",
                format!("Facility {} does not accept referrals", receiving.hcp_code),
            ));
        }

        let referral = Referral {
            id: Uuid::new_v4(),
            utn: None,
            enrollee_id: input.enrollee_id,
            referring_facility_id: input.referring_facility_id,
            receiving_facility_id: input.receiving_facility_id,
            diagnosis_code,
            diagnosis_description: input.diagnosis_description.trim().to_string(),
            reason: input.reason.trim().to_string(),
            severity: input.severity,
            status: ReferralStatus::Pending,
            utn_validated: false,
            utn_validated_at: None,
            reviewed_by: None,
            denial_reason: None,
            created_at: self.clock.now(),
            approved_at: None,
            valid_until: None,
        };
        self.store.transaction(|state| {
            state.referrals.insert(referral.id, referral.clone());
            Ok(())
        })?;

        self.record(
            actor,
            "referral.created",
            "referral",
            referral.id,
            json!({
                "diagnosis_code": referral.diagnosis_code,
                "receiving_facility": receiving.hcp_code,
                "severity": referral.severity,
            }),
        )
        .await?;
        info!(referral_id = %referral.id, "referral created");
        Ok(referral)
    }

    /// Approve a pending referral and issue its UTN
    pub async fn approve_referral(&self, actor: &Actor, referral_id: Uuid) -> ClaimsResult<Referral> {
        self.access.authorize(actor, permissions::REFERRALS_APPROVE).await?;
        let now = self.clock.now();
        let validity = Duration::days(self.settings.referral_validity_days);

        let referral = self.store.transaction(|state| {
            if state.referral(referral_id)?.status != ReferralStatus::Pending {
                return Err(ClaimsError::InvalidStatus(
                    "Only pending referrals can be approved".to_string(),
                ));
            }
            let utn = loop {
                let candidate = dated_code(
                    &self.settings.utn_prefix,
                    now,
                    &random_code(&mut rand::thread_rng(), UTN_SUFFIX_LEN),
                );
                if !state.utn_exists(&candidate) {
                    break candidate;
                }
            };

            let referral = state.referral_mut(referral_id)?;
            referral.status = ReferralStatus::Approved;
            referral.utn = Some(utn);
            referral.approved_at = Some(now);
            referral.valid_until = Some(now + validity);
            referral.reviewed_by = Some(actor.user_id);
            Ok(referral.clone())
        })?;

        self.record(
            actor,
            "referral.approved",
            "referral",
            referral_id,
            json!({ "utn": referral.utn, "valid_until": referral.valid_until }),
        )
        .await?;
        info!(%referral_id, utn = ?referral.utn, "referral approved");
        Ok(referral)
    }

    pub async fn deny_referral(
        &self,
        actor: &Actor,
        referral_id: Uuid,
        reason: &str,
    ) -> ClaimsResult<Referral> {
        self.access.authorize(actor, permissions::REFERRALS_APPROVE).await?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ClaimsError::field("reason", "A denial reason is required"));
        }

        let referral = self.store.transaction(|state| {
            let referral = state.referral_mut(referral_id)?;
            if referral.status != ReferralStatus::Pending {
                return Err(ClaimsError::InvalidStatus(
                    "Only pending referrals can be denied".to_string(),
                ));
            }
            referral.status = ReferralStatus::Denied;
            referral.denial_reason = Some(reason.to_string());
            referral.reviewed_by = Some(actor.user_id);
            Ok(referral.clone())
        })?;

        self.record(actor, "referral.denied", "referral", referral_id, json!({ "reason": reason }))
            .await?;
        warn!(%referral_id, "referral denied");
        Ok(referral)
    }

    /// Receiving facility confirms the UTN when the enrollee presents
    pub async fn validate_utn(
        &self,
        actor: &Actor,
        utn: &str,
        facility_id: Uuid,
    ) -> ClaimsResult<Referral> {
        self.access
            .authorize(actor, permissions::REFERRALS_VALIDATE_UTN)
            .await?;
        let utn = utn.trim().to_ascii_uppercase();
        let now = self.clock.now();

        // lapse is committed even though validation then fails
        let lapsed = self.store.transaction(|state| {
            let id = state.referral_id_by_utn(&utn)?;
            let referral = state.referral_mut(id)?;
            let due = referral.status == ReferralStatus::Approved
                && referral.valid_until.is_some_and(|until| until <= now);
            if due {
                referral.status = ReferralStatus::Expired;
            }
            Ok(due.then_some(id))
        })?;
        if let Some(id) = lapsed {
            self.record(actor, "referral.expired", "referral", id, json!({ "utn": utn }))
                .await?;
            warn!(%utn, "expired UTN presented");
            return Err(ClaimsError::UtnInvalid(format!("UTN {utn} has expired")));
        }

        let referral = self.store.transaction(|state| {
            let id = state.referral_id_by_utn(&utn)?;
            let referral = state.referral_mut(id)?;
            if referral.status != ReferralStatus::Approved {
                return Err(ClaimsError::UtnInvalid(format!(
                    "UTN {utn} belongs to a referral that is not approved"
                )));
            }
            if referral.receiving_facility_id != facility_id {
                return Err(ClaimsError::FacilityMismatch(
                    "UTN can only be validated by the receiving facility".to_string(),
                ));
            }
            if referral.utn_validated {
                return Err(ClaimsError::UtnInvalid(format!(
                    "UTN {utn} has already been validated"
                )));
            }
            referral.utn_validated = true;
            referral.utn_validated_at = Some(now);
            Ok(referral.clone())
        })?;

        self.record(actor, "referral.utn_validated", "referral", referral.id, json!({ "utn": utn }))
            .await?;
        info!(%utn, "UTN validated");
        Ok(referral)
    }

    pub fn get_referral(&self, referral_id: Uuid) -> ClaimsResult<Referral> {
        self.store.read(|s| s.referral(referral_id).cloned())
    }

    pub fn referral_by_utn(&self, utn: &str) -> ClaimsResult<Referral> {
        let utn = utn.trim().to_ascii_uppercase();
        self.store.read(|s| {
            let id = s.referral_id_by_utn(&utn)?;
            s.referral(id).cloned()
        })
    }
}
