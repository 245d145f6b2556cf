use chrono::Utc;
use claims_service::{Claim, ClaimStatus, ItemType, Treatment};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

fn arb_line() -> impl Strategy<Value = Treatment> {
    (any::<bool>(), 1u32..20, 0i64..5_000_000, 0u32..3).prop_map(|(bundle, quantity, cents, scale)| {
        let unit_price = Decimal::new(cents, scale);
        let item_type = if bundle { ItemType::Bundle } else { ItemType::Ffs };
        Treatment {
            id: Uuid::new_v4(),
            service_code: "SVC".to_string(),
            description: String::new(),
            item_type,
            is_bundle_package: false,
            quantity,
            unit_price,
            total_amount: unit_price * Decimal::from(quantity),
            pa_code_id: None,
        }
    })
}

fn claim_with(treatments: Vec<Treatment>) -> Claim {
    Claim {
        id: Uuid::new_v4(),
        claim_number: "CLM-20240101-000001".to_string(),
        admission_id: Uuid::new_v4(),
        referral_id: Uuid::new_v4(),
        enrollee_id: Uuid::new_v4(),
        facility_id: Uuid::new_v4(),
        status: ClaimStatus::Draft,
        treatments,
        bundle_amount: Decimal::ONE,
        ffs_amount: Decimal::ONE,
        total_amount_claimed: Decimal::ONE,
        approved_amount: None,
        rejection_reason: None,
        created_at: Utc::now(),
        submitted_at: None,
        reviewed_at: None,
        reviewed_by: None,
        payment_batch_id: None,
    }
}

proptest! {
    #[test]
    fn totals_always_add_up(lines in prop::collection::vec(arb_line(), 0..25)) {
        let expected_bundle: Decimal = lines
            .iter()
            .filter(|t| t.item_type == ItemType::Bundle)
            .map(|t| t.total_amount)
            .sum();
        let expected_ffs: Decimal = lines
            .iter()
            .filter(|t| t.item_type == ItemType::Ffs)
            .map(|t| t.total_amount)
            .sum();

        let mut claim = claim_with(lines);
        claim.recalculate_totals().unwrap();

        prop_assert_eq!(claim.bundle_amount, expected_bundle);
        prop_assert_eq!(claim.ffs_amount, expected_ffs);
        prop_assert_eq!(claim.total_amount_claimed, claim.bundle_amount + claim.ffs_amount);
    }

    #[test]
    fn removing_a_line_keeps_totals_consistent(
        lines in prop::collection::vec(arb_line(), 1..25),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut claim = claim_with(lines);
        claim.recalculate_totals().unwrap();
        let before = claim.total_amount_claimed;

        let removed = claim.treatments.remove(pick.index(claim.treatments.len()));
        claim.recalculate_totals().unwrap();

        prop_assert_eq!(claim.total_amount_claimed, before - removed.total_amount);
        prop_assert_eq!(claim.total_amount_claimed, claim.bundle_amount + claim.ffs_amount);
    }
}
