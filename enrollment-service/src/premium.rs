use std::collections::HashSet;

use auth_rbac::{permissions, Actor};
use chrono::Duration;
use rand::Rng;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{EnrollmentError, EnrollmentResult};
use crate::models::*;
use crate::service::EnrollmentService;

/// Largest batch generated in one call
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Random numeric PIN; the first digit is never zero so the PIN survives
/// being stored as a number in spreadsheets
pub fn generate_pin<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    let mut pin = String::with_capacity(length);
    for i in 0..length {
        let digit: u8 = if i == 0 {
            rng.gen_range(1..=9)
        } else {
            rng.gen_range(0..=9)
        };
        pin.push(char::from(b'0' + digit));
    }
    pin
}

/// Show only the last four digits of a PIN
pub fn mask_pin(pin: &str) -> String {
    let skip = pin.chars().count().saturating_sub(4);
    let tail: String = pin.chars().skip(skip).collect();
    format!("****{tail}")
}

fn batch_short(batch_id: Uuid) -> String {
    batch_id
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>()
        .to_ascii_uppercase()
}

impl EnrollmentService {
    /// Generate `count` scratch-card PINs of one face value
    #[instrument(skip(self, actor))]
    pub async fn generate_batch(
        &self,
        actor: &Actor,
        count: usize,
        amount: Decimal,
        premium_type: PremiumType,
    ) -> EnrollmentResult<PremiumBatch> {
        self.access.authorize(actor, permissions::PREMIUMS_MANAGE).await?;
        if count == 0 || count > MAX_BATCH_SIZE {
            return Err(EnrollmentError::field(
                "count",
                format!("Batch size must be between 1 and {MAX_BATCH_SIZE}"),
            ));
        }
        if amount <= Decimal::ZERO {
            return Err(EnrollmentError::field("amount", "Premium amount must be positive"));
        }
        let total_value = Decimal::from(count as u64).checked_mul(amount).ok_or_else(|| {
            EnrollmentError::field("amount", "Batch face value exceeds the supported amount range")
        })?;

        let batch_id = Uuid::new_v4();
        let short = batch_short(batch_id);
        let now = self.clock.now();
        let expires_at = now + Duration::days(self.settings.pin_validity_days);

        let mut seen = HashSet::with_capacity(count);
        let mut premiums = Vec::with_capacity(count);
        while premiums.len() < count {
            let pin = generate_pin(&mut rand::thread_rng(), self.settings.pin_length);
            if !seen.insert(pin.clone())
                || self.repository.find_premium_by_pin(&pin).await?.is_some()
            {
                continue;
            }
            premiums.push(Premium {
                id: Uuid::new_v4(),
                serial_number: format!("PRM-{short}-{:05}", premiums.len() + 1),
                pin,
                amount,
                premium_type,
                status: PremiumStatus::Available,
                batch_id,
                generated_at: now,
                expires_at,
                used_by: None,
                used_at: None,
            });
        }

        self.repository.insert_premiums(premiums.clone()).await?;
        self.record(
            actor,
            "premium.batch_generated",
            "premium_batch",
            batch_id,
            json!({ "count": count, "amount": amount, "premium_type": premium_type, "total_value": total_value }),
        )
        .await?;
        info!(%batch_id, count, %total_value, "premium batch generated");

        Ok(PremiumBatch {
            batch_id,
            premiums,
            total_value,
        })
    }

    /// Redeem a PIN for an enrollee and start (or extend) their coverage
    pub async fn redeem_pin(
        &self,
        actor: &Actor,
        pin: &str,
        enrollee_id: Uuid,
    ) -> EnrollmentResult<Enrollee> {
        self.access.authorize(actor, permissions::ENROLLEES_MANAGE).await?;
        let pin = pin.trim();
        let premium = self
            .repository
            .find_premium_by_pin(pin)
            .await?
            .ok_or_else(|| EnrollmentError::not_found("Premium PIN", mask_pin(pin)))?;

        if premium.status != PremiumStatus::Available {
            return Err(EnrollmentError::PinUnavailable(format!(
                "PIN {} is {:?}",
                premium.serial_number, premium.status
            )));
        }

        let now = self.clock.now();
        if premium.expires_at <= now {
            let expired = self
                .repository
                .swap_premium_status(
                    PremiumStatus::Available,
                    Premium {
                        status: PremiumStatus::Expired,
                        ..premium
                    },
                )
                .await?;
            self.record(actor, "premium.expired", "premium", expired.id, json!({})).await?;
            warn!(serial = %expired.serial_number, "expired PIN presented for redemption");
            return Err(EnrollmentError::PinExpired);
        }

        let mut enrollee = self.get_enrollee(enrollee_id).await?;
        if enrollee.status == EnrolleeStatus::Suspended {
            return Err(EnrollmentError::InvalidState(format!(
                "Enrollee {} is suspended",
                enrollee.enrollee_number
            )));
        }

        // only one redemption of a PIN gets past this point
        let premium = self
            .repository
            .swap_premium_status(
                PremiumStatus::Available,
                Premium {
                    status: PremiumStatus::Used,
                    used_by: Some(enrollee.id),
                    used_at: Some(now),
                    ..premium
                },
            )
            .await?;
        self.activate_coverage(&mut enrollee, premium.id);

        self.repository.update_enrollee(enrollee.clone()).await?;
        self.record(
            actor,
            "premium.redeemed",
            "enrollee",
            enrollee.id,
            json!({
                "serial_number": premium.serial_number,
                "coverage_expires_at": enrollee.coverage_expires_at,
            }),
        )
        .await?;
        info!(
            enrollee = %enrollee.enrollee_number,
            serial = %premium.serial_number,
            "premium redeemed"
        );
        Ok(enrollee)
    }

    pub async fn void_pin(&self, actor: &Actor, pin: &str, reason: &str) -> EnrollmentResult<Premium> {
        self.access.authorize(actor, permissions::PREMIUMS_MANAGE).await?;
        let pin = pin.trim();
        let premium = self
            .repository
            .find_premium_by_pin(pin)
            .await?
            .ok_or_else(|| EnrollmentError::not_found("Premium PIN", mask_pin(pin)))?;
        if premium.status != PremiumStatus::Available {
            return Err(EnrollmentError::PinUnavailable(format!(
                "Only available PINs can be voided; {} is {:?}",
                premium.serial_number, premium.status
            )));
        }

        let premium = self
            .repository
            .swap_premium_status(
                PremiumStatus::Available,
                Premium {
                    status: PremiumStatus::Voided,
                    ..premium
                },
            )
            .await?;
        self.record(
            actor,
            "premium.voided",
            "premium",
            premium.id,
            json!({ "serial_number": premium.serial_number, "reason": reason }),
        )
        .await?;
        warn!(serial = %premium.serial_number, "premium voided");
        Ok(premium)
    }

    /// Count and face value of the inventory per status
    pub async fn inventory_summary(&self) -> EnrollmentResult<InventorySummary> {
        let mut summary = InventorySummary::default();
        for premium in self.repository.list_premiums().await? {
            let totals = summary.totals_mut(premium.status);
            totals.count += 1;
            totals.value = totals.value.checked_add(premium.amount).ok_or_else(|| {
                EnrollmentError::InvalidState(
                    "Inventory value exceeds the supported amount range".to_string(),
                )
            })?;
        }
        Ok(summary)
    }
}
