use std::collections::HashSet;

use auth_rbac::{permissions, Actor};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::{ClaimsError, ClaimsResult};
use crate::models::{ClaimStatus, PaymentBatch};
use crate::numbers::sequenced;
use crate::service::ClaimsAutomation;

impl ClaimsAutomation {
    /// Settle approved claims of one facility in a single batch
    pub async fn create_payment_batch(
        &self,
        actor: &Actor,
        claim_ids: &[Uuid],
    ) -> ClaimsResult<PaymentBatch> {
        self.access.authorize(actor, permissions::CLAIMS_PAY).await?;
        if claim_ids.is_empty() {
            return Err(ClaimsError::field("claim_ids", "A payment batch needs at least one claim"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = claim_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(ClaimsError::field(
                "claim_ids",
                format!("Claim {dup} is listed more than once"),
            ));
        }
        let now = self.clock.now();

        let batch = self.store.transaction(|state| {
            let mut facility_id = None;
            let mut total_amount = Decimal::ZERO;
            for id in claim_ids {
                let claim = state.claim(*id)?;
                if claim.status != ClaimStatus::Approved {
                    return Err(ClaimsError::InvalidStatus(format!(
                        "Claim {} is {:?}; only approved claims can be paid",
                        claim.claim_number, claim.status
                    )));
                }
                match facility_id {
                    None => facility_id = Some(claim.facility_id),
                    Some(f) if f != claim.facility_id => {
                        return Err(ClaimsError::FacilityMismatch(
                            "All claims in a payment batch must belong to one facility".to_string(),
                        ));
                    }
                    Some(_) => {}
                }
                total_amount = total_amount
                    .checked_add(claim.approved_amount.unwrap_or(claim.total_amount_claimed))
                    .ok_or_else(|| {
                        ClaimsError::AmountExceeded(
                            "Payment batch total exceeds the supported amount range".to_string(),
                        )
                    })?;
            }
            let facility_id = facility_id
                .ok_or_else(|| ClaimsError::field("claim_ids", "A payment batch needs at least one claim"))?;

            state.batch_sequence += 1;
            let batch = PaymentBatch {
                id: Uuid::new_v4(),
                batch_number: sequenced(&self.settings.payment_batch_prefix, now, state.batch_sequence),
                facility_id,
                claim_ids: claim_ids.to_vec(),
                total_amount,
                created_at: now,
                created_by: actor.user_id,
            };
            for id in claim_ids {
                let claim = state.claim_mut(*id)?;
                claim.status = ClaimStatus::Paid;
                claim.payment_batch_id = Some(batch.id);
            }
            state.payment_batches.insert(batch.id, batch.clone());
            Ok(batch)
        })?;

        self.record(
            actor,
            "payment_batch.created",
            "payment_batch",
            batch.id,
            json!({
                "batch_number": batch.batch_number,
                "claims": batch.claim_ids.len(),
                "total_amount": batch.total_amount,
            }),
        )
        .await?;
        info!(
            batch = %batch.batch_number,
            claims = batch.claim_ids.len(),
            total = %batch.total_amount,
            "payment batch created"
        );
        Ok(batch)
    }

    pub fn get_payment_batch(&self, batch_id: Uuid) -> ClaimsResult<PaymentBatch> {
        self.store.read(|s| {
            s.payment_batches
                .get(&batch_id)
                .cloned()
                .ok_or_else(|| ClaimsError::not_found("Payment batch", batch_id))
        })
    }
}
