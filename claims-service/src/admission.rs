use auth_rbac::{permissions, Actor};
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::bundle::match_bundle;
use crate::error::{ClaimsError, ClaimsResult};
use crate::models::{Admission, AdmissionStatus, NewAdmission, Referral, ReferralStatus};
use crate::numbers::sequenced;
use crate::service::ClaimsAutomation;

/// Referral guards checked before and again inside the admission transaction
fn check_referral(referral: &Referral, facility_id: Uuid) -> ClaimsResult<()> {
    if referral.status != ReferralStatus::Approved {
        return Err(ClaimsError::ReferralNotApproved(
            "Referral must be approved before admission".to_string(),
        ));
    }
    if !referral.utn_validated {
        return Err(ClaimsError::UtnNotValidated(
            "Referral UTN must be validated before admission".to_string(),
        ));
    }
    if referral.receiving_facility_id != facility_id {
        return Err(ClaimsError::FacilityMismatch(
            "Enrollee can only be admitted at the receiving facility".to_string(),
        ));
    }
    Ok(())
}

impl ClaimsAutomation {
    /// Admit an enrollee on an approved, validated referral.
    ///
    /// The bundle is matched from the referral diagnosis; admissions whose
    /// diagnosis has no bundle are billed fee-for-service only.
    #[instrument(skip(self, actor, input), fields(referral_id = %input.referral_id))]
    pub async fn admit(&self, actor: &Actor, input: NewAdmission) -> ClaimsResult<Admission> {
        self.access.authorize(actor, permissions::ADMISSIONS_MANAGE).await?;

        let referral = self.get_referral(input.referral_id)?;
        check_referral(&referral, input.facility_id)?;
        self.enrollment.require_eligible(referral.enrollee_id).await?;

        let now = self.clock.now();
        let admission = self.store.transaction(|state| {
            let referral = state.referral(input.referral_id)?.clone();
            check_referral(&referral, input.facility_id)?;
            if state
                .admissions
                .values()
                .any(|a| a.referral_id == input.referral_id)
            {
                return Err(ClaimsError::Conflict(
                    "An admission already exists for this referral".to_string(),
                ));
            }

            let bundle_id = match_bundle(state.bundles.values(), &referral.diagnosis_code).map(|b| b.id);
            state.admission_sequence += 1;
            let admission = Admission {
                id: Uuid::new_v4(),
                admission_number: sequenced(
                    &self.settings.admission_number_prefix,
                    now,
                    state.admission_sequence,
                ),
                referral_id: referral.id,
                enrollee_id: referral.enrollee_id,
                facility_id: input.facility_id,
                bundle_id,
                diagnosis_code: referral.diagnosis_code,
                status: AdmissionStatus::Admitted,
                admitted_at: now,
                discharged_at: None,
                ward: input.ward.clone().filter(|w| !w.trim().is_empty()),
            };
            state.admissions.insert(admission.id, admission.clone());
            Ok(admission)
        })?;

        self.record(
            actor,
            "admission.created",
            "admission",
            admission.id,
            json!({
                "admission_number": admission.admission_number,
                "referral_id": admission.referral_id,
                "bundle_id": admission.bundle_id,
            }),
        )
        .await?;
        info!(
            admission = %admission.admission_number,
            bundled = admission.bundle_id.is_some(),
            "enrollee admitted"
        );
        Ok(admission)
    }

    pub async fn discharge(
        &self,
        actor: &Actor,
        admission_id: Uuid,
        discharged_at: DateTime<Utc>,
    ) -> ClaimsResult<Admission> {
        self.access.authorize(actor, permissions::ADMISSIONS_MANAGE).await?;

        let admission = self.store.transaction(|state| {
            let admission = state.admission_mut(admission_id)?;
            if admission.status != AdmissionStatus::Admitted {
                return Err(ClaimsError::InvalidStatus(format!(
                    "Admission {} is already discharged",
                    admission.admission_number
                )));
            }
            if discharged_at < admission.admitted_at {
                return Err(ClaimsError::field(
                    "discharged_at",
                    "Discharge cannot be earlier than admission",
                ));
            }
            admission.status = AdmissionStatus::Discharged;
            admission.discharged_at = Some(discharged_at);
            Ok(admission.clone())
        })?;

        self.record(
            actor,
            "admission.discharged",
            "admission",
            admission_id,
            json!({ "discharged_at": discharged_at }),
        )
        .await?;
        info!(admission = %admission.admission_number, "enrollee discharged");
        Ok(admission)
    }

    pub fn get_admission(&self, admission_id: Uuid) -> ClaimsResult<Admission> {
        self.store.read(|s| s.admission(admission_id).cloned())
    }
}
