use auth_rbac::{permissions, Actor};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::bundle::classify;
use crate::error::{ClaimsError, ClaimsResult};
use crate::models::*;
use crate::numbers::sequenced;
use crate::pa_code::{self, PaUsage};
use crate::service::ClaimsAutomation;
use crate::store::ClaimsState;

fn require_draft(claim: &Claim) -> ClaimsResult<()> {
    if claim.status == ClaimStatus::Draft {
        Ok(())
    } else {
        Err(ClaimsError::InvalidStatus(format!(
            "Claim {} is {:?}; only draft claims can be changed",
            claim.claim_number, claim.status
        )))
    }
}

fn require_submitted(claim: &Claim) -> ClaimsResult<()> {
    if claim.status == ClaimStatus::Submitted {
        Ok(())
    } else {
        Err(ClaimsError::InvalidStatus(format!(
            "Claim {} is {:?}; only submitted claims can be reviewed",
            claim.claim_number, claim.status
        )))
    }
}

/// Build a treatment line, consuming its PA code when it is billed FFS
fn build_line(
    state: &mut ClaimsState,
    claim: &Claim,
    input: &NewTreatment,
    at: chrono::DateTime<chrono::Utc>,
) -> ClaimsResult<Treatment> {
    let admission = state.admission(claim.admission_id)?;
    let bundle = admission
        .bundle_id
        .map(|id| state.bundle(id))
        .transpose()?;
    let item_type = classify(&input.service_code, bundle);

    let line_total = input
        .unit_price
        .checked_mul(Decimal::from(input.quantity))
        .ok_or_else(|| {
            ClaimsError::AmountExceeded(format!(
                "Line total for {} exceeds the supported amount range",
                input.service_code
            ))
        })?;
    let (total_amount, pa_code_id) = match item_type {
        // covered by the package line
        ItemType::Bundle => (Decimal::ZERO, None),
        ItemType::Ffs => {
            let code = input.pa_code.as_deref().ok_or_else(|| {
                ClaimsError::PaCodeNotApproved(
                    "FFS treatment requires an approved PA code".to_string(),
                )
            })?;
            let id = pa_code::consume(
                state,
                &PaUsage {
                    code,
                    enrollee_id: claim.enrollee_id,
                    facility_id: claim.facility_id,
                    admission_id: claim.admission_id,
                    line_total,
                    at,
                },
            )?;
            (line_total, Some(id))
        }
    };

    Ok(Treatment {
        id: Uuid::new_v4(),
        service_code: input.service_code.clone(),
        description: input.description.clone(),
        item_type,
        is_bundle_package: false,
        quantity: input.quantity,
        unit_price: input.unit_price,
        total_amount,
        pa_code_id,
    })
}

impl ClaimsAutomation {
    /// Open the claim for an admission, seeded with the bundle package line
    #[instrument(skip(self, actor))]
    pub async fn create_claim(&self, actor: &Actor, admission_id: Uuid) -> ClaimsResult<Claim> {
        self.access.authorize(actor, permissions::CLAIMS_CREATE).await?;
        let now = self.clock.now();

        let claim = self.store.transaction(|state| {
            let admission = state.admission(admission_id)?.clone();
            if state.claims.values().any(|c| c.admission_id == admission_id) {
                return Err(ClaimsError::Conflict(format!(
                    "Admission {} already has a claim",
                    admission.admission_number
                )));
            }

            let mut treatments = Vec::new();
            if let Some(bundle_id) = admission.bundle_id {
                let bundle = state.bundle(bundle_id)?;
                treatments.push(Treatment {
                    id: Uuid::new_v4(),
                    service_code: bundle.code.clone(),
                    description: bundle.name.clone(),
                    item_type: ItemType::Bundle,
                    is_bundle_package: true,
                    quantity: 1,
                    unit_price: bundle.price,
                    total_amount: bundle.price,
                    pa_code_id: None,
                });
            }

            state.claim_sequence += 1;
            let mut claim = Claim {
                id: Uuid::new_v4(),
                claim_number: sequenced(
                    &self.settings.claim_number_prefix,
                    now,
                    state.claim_sequence,
                ),
                admission_id,
                referral_id: admission.referral_id,
                enrollee_id: admission.enrollee_id,
                facility_id: admission.facility_id,
                status: ClaimStatus::Draft,
                treatments,
                bundle_amount: Decimal::ZERO,
                ffs_amount: Decimal::ZERO,
                total_amount_claimed: Decimal::ZERO,
                approved_amount: None,
                rejection_reason: None,
                created_at: now,
                submitted_at: None,
                reviewed_at: None,
                reviewed_by: None,
                payment_batch_id: None,
            };
            claim.recalculate_totals()?;
            state.claims.insert(claim.id, claim.clone());
            Ok(claim)
        })?;

        self.record(
            actor,
            "claim.created",
            "claim",
            claim.id,
            json!({ "claim_number": claim.claim_number, "bundle_amount": claim.bundle_amount }),
        )
        .await?;
        info!(claim = %claim.claim_number, "claim created");
        Ok(claim)
    }

    /// Add a treatment line; FFS lines consume the PA code named on the input
    pub async fn add_treatment(
        &self,
        actor: &Actor,
        claim_id: Uuid,
        input: NewTreatment,
    ) -> ClaimsResult<Claim> {
        self.access.authorize(actor, permissions::CLAIMS_CREATE).await?;
        let input = NewTreatment {
            service_code: input.service_code.trim().to_ascii_uppercase(),
            description: input.description.trim().to_string(),
            pa_code: input
                .pa_code
                .map(|c| c.trim().to_ascii_uppercase())
                .filter(|c| !c.is_empty()),
            ..input
        };
        if input.service_code.is_empty() {
            return Err(ClaimsError::field("service_code", "Service code is required"));
        }
        if input.quantity < 1 {
            return Err(ClaimsError::field("quantity", "Quantity must be at least 1"));
        }
        if input.unit_price < Decimal::ZERO {
            return Err(ClaimsError::field("unit_price", "Unit price cannot be negative"));
        }
        if let Some(code) = &input.pa_code {
            self.expire_pa_code_if_due(actor, code).await?;
        }
        let now = self.clock.now();

        let (claim, line) = self.store.transaction(|state| {
            let snapshot = state.claim(claim_id)?.clone();
            require_draft(&snapshot)?;
            let line = build_line(state, &snapshot, &input, now)?;

            let claim = state.claim_mut(claim_id)?;
            claim.treatments.push(line.clone());
            claim.recalculate_totals()?;
            Ok((claim.clone(), line))
        })?;

        self.record(
            actor,
            "claim.treatment_added",
            "claim",
            claim_id,
            json!({
                "service_code": line.service_code,
                "item_type": line.item_type,
                "total_amount": line.total_amount,
                "pa_code_id": line.pa_code_id,
            }),
        )
        .await?;
        info!(
            claim = %claim.claim_number,
            item_type = ?line.item_type,
            total = %claim.total_amount_claimed,
            "treatment added"
        );
        Ok(claim)
    }

    /// Remove a line and release its PA code
    pub async fn remove_treatment(
        &self,
        actor: &Actor,
        claim_id: Uuid,
        treatment_id: Uuid,
    ) -> ClaimsResult<Claim> {
        self.access.authorize(actor, permissions::CLAIMS_CREATE).await?;

        let (claim, removed) = self.store.transaction(|state| {
            let claim = state.claim_mut(claim_id)?;
            require_draft(claim)?;
            let position = claim
                .treatments
                .iter()
                .position(|t| t.id == treatment_id)
                .ok_or_else(|| ClaimsError::not_found("Treatment", treatment_id))?;
            if claim.treatments.get(position).is_some_and(|t| t.is_bundle_package) {
                return Err(ClaimsError::InvalidStatus(
                    "The bundle package line cannot be removed".to_string(),
                ));
            }
            let removed = claim.treatments.remove(position);
            claim.recalculate_totals()?;
            let claim = claim.clone();

            if let Some(pa_code_id) = removed.pa_code_id {
                pa_code::release(state, pa_code_id)?;
            }
            Ok((claim, removed))
        })?;

        self.record(
            actor,
            "claim.treatment_removed",
            "claim",
            claim_id,
            json!({ "service_code": removed.service_code, "pa_code_id": removed.pa_code_id }),
        )
        .await?;
        Ok(claim)
    }

    pub async fn submit_claim(&self, actor: &Actor, claim_id: Uuid) -> ClaimsResult<Claim> {
        self.access.authorize(actor, permissions::CLAIMS_SUBMIT).await?;
        let now = self.clock.now();
        let require_discharge = self.settings.require_discharge_before_submission;

        let claim = self.store.transaction(|state| {
            let discharged = {
                let claim = state.claim(claim_id)?;
                require_draft(claim)?;
                if claim.treatments.is_empty() {
                    return Err(ClaimsError::field(
                        "treatments",
                        "A claim needs at least one treatment line",
                    ));
                }
                state.admission(claim.admission_id)?.status == AdmissionStatus::Discharged
            };
            if require_discharge && !discharged {
                return Err(ClaimsError::NotDischarged(
                    "Admission must be discharged before the claim is submitted".to_string(),
                ));
            }

            let claim = state.claim_mut(claim_id)?;
            claim.status = ClaimStatus::Submitted;
            claim.submitted_at = Some(now);
            Ok(claim.clone())
        })?;

        self.record(
            actor,
            "claim.submitted",
            "claim",
            claim_id,
            json!({ "total_amount_claimed": claim.total_amount_claimed }),
        )
        .await?;
        info!(claim = %claim.claim_number, total = %claim.total_amount_claimed, "claim submitted");
        Ok(claim)
    }

    /// Approve a submitted claim, in full unless a lower amount is given
    pub async fn approve_claim(
        &self,
        actor: &Actor,
        claim_id: Uuid,
        approved_amount: Option<Decimal>,
    ) -> ClaimsResult<Claim> {
        self.access.authorize(actor, permissions::CLAIMS_REVIEW).await?;
        let now = self.clock.now();

        let claim = self.store.transaction(|state| {
            let claim = state.claim_mut(claim_id)?;
            require_submitted(claim)?;
            let amount = approved_amount.unwrap_or(claim.total_amount_claimed);
            if amount < Decimal::ZERO {
                return Err(ClaimsError::field("approved_amount", "Approved amount cannot be negative"));
            }
            if amount > claim.total_amount_claimed {
                return Err(ClaimsError::AmountExceeded(format!(
                    "Approved amount {amount} exceeds the {} claimed",
                    claim.total_amount_claimed
                )));
            }
            claim.status = ClaimStatus::Approved;
            claim.approved_amount = Some(amount);
            claim.reviewed_at = Some(now);
            claim.reviewed_by = Some(actor.user_id);
            Ok(claim.clone())
        })?;

        self.record(
            actor,
            "claim.approved",
            "claim",
            claim_id,
            json!({ "approved_amount": claim.approved_amount }),
        )
        .await?;
        info!(claim = %claim.claim_number, "claim approved");
        Ok(claim)
    }

    pub async fn reject_claim(&self, actor: &Actor, claim_id: Uuid, reason: &str) -> ClaimsResult<Claim> {
        self.access.authorize(actor, permissions::CLAIMS_REVIEW).await?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ClaimsError::field("reason", "A rejection reason is required"));
        }
        let now = self.clock.now();

        let claim = self.store.transaction(|state| {
            let claim = state.claim_mut(claim_id)?;
            require_submitted(claim)?;
            claim.status = ClaimStatus::Rejected;
            claim.rejection_reason = Some(reason.to_string());
            claim.reviewed_at = Some(now);
            claim.reviewed_by = Some(actor.user_id);
            Ok(claim.clone())
        })?;

        self.record(actor, "claim.rejected", "claim", claim_id, json!({ "reason": reason }))
            .await?;
        warn!(claim = %claim.claim_number, "claim rejected");
        Ok(claim)
    }

    pub fn get_claim(&self, claim_id: Uuid) -> ClaimsResult<Claim> {
        self.store.read(|s| s.claim(claim_id).cloned())
    }

    /// Claims of one facility in a given status, oldest first
    pub fn claims_for_facility(&self, facility_id: Uuid, status: ClaimStatus) -> Vec<Claim> {
        let mut claims: Vec<Claim> = self.store.read(|s| {
            s.claims
                .values()
                .filter(|c| c.facility_id == facility_id && c.status == status)
                .cloned()
                .collect()
        });
        claims.sort_by(|a, b| a.claim_number.cmp(&b.claim_number));
        claims
    }
}
