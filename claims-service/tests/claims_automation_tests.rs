//! Claims automation scenarios
//!
//! 1. Full referral → PA code → admission → claim → payment lifecycle
//! 2. Admission guards
//! 3. FFS lines and PA code consumption
//! 4. UTN and PA code expiry
//! 5. Review, payment batches and permissions
//! 6. Bundle deactivation and amount range limits

use std::sync::Arc;

use audit_engine::{AuditEngine, AuditQuery};
use auth_rbac::{AccessControl, Actor};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use claims_service::*;
use config_engine::{ClaimsSettings, EnrollmentSettings};
use enrollment_service::{
    Clock, Enrollee, EnrollmentError, EnrollmentService, Facility, FixedClock, FundingType,
    LevelOfCare, NewEnrollee, NewFacility, PremiumType, Sex,
};
use rust_decimal::Decimal;
use uuid::Uuid;

struct World {
    claims: ClaimsAutomation,
    enrollment: Arc<EnrollmentService>,
    audit: Arc<AuditEngine>,
    clock: Arc<FixedClock>,
    officer: Actor,
    clerk: Actor,
    director: Actor,
    payer: Actor,
    phc: Facility,
    general: Facility,
    teaching: Facility,
    enrollee: Enrollee,
}

fn naira(amount: i64) -> Decimal {
    Decimal::new(amount, 0)
}

async fn facility(enrollment: &EnrollmentService, officer: &Actor, code: &str, level: LevelOfCare) -> Facility {
    enrollment
        .register_facility(
            officer,
            NewFacility {
                hcp_code: code.to_string(),
                name: format!("{code} Hospital"),
                level_of_care: level,
                lga: "Chanchaga".to_string(),
            },
        )
        .await
        .unwrap()
}

async fn enroll(enrollment: &EnrollmentService, officer: &Actor, phc: &Facility, nin: &str) -> Enrollee {
    enrollment
        .register_enrollee(
            officer,
            NewEnrollee {
                first_name: "Halima".to_string(),
                last_name: "Abubakar".to_string(),
                nin: nin.to_string(),
                phone: "08061234567".to_string(),
                email: Some("halima@example.com".to_string()),
                sex: Sex::Female,
                date_of_birth: NaiveDate::from_ymd_opt(1995, 8, 21).unwrap(),
                lga: "Chanchaga".to_string(),
                primary_facility_id: phc.id,
                funding_type: FundingType::Equity,
            },
        )
        .await
        .unwrap()
}

async fn world() -> World {
    let access = Arc::new(AccessControl::with_default_roles().await.unwrap());
    let officer = Actor::new("enrollment-officer");
    let clerk = Actor::new("gh-minna-clerk");
    let director = Actor::new("medical-director");
    let payer = Actor::new("claims-officer");
    access.assign_role(officer.user_id, "enrollment_officer").await.unwrap();
    access.assign_role(clerk.user_id, "facility_user").await.unwrap();
    access.assign_role(director.user_id, "medical_director").await.unwrap();
    access.assign_role(payer.user_id, "claims_officer").await.unwrap();

    let audit = Arc::new(AuditEngine::new());
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()));
    let enrollment = Arc::new(
        EnrollmentService::in_memory(access.clone(), audit.clone(), EnrollmentSettings::default())
            .with_clock(clock.clone()),
    );

    let phc = facility(&enrollment, &officer, "NS-PHC-001", LevelOfCare::Primary).await;
    let general = facility(&enrollment, &officer, "NS-GH-001", LevelOfCare::Secondary).await;
    let teaching = facility(&enrollment, &officer, "NS-TH-001", LevelOfCare::Tertiary).await;

    let enrollee = enroll(&enrollment, &officer, &phc, "12345678901").await;
    let batch = enrollment
        .generate_batch(&officer, 1, naira(12_000), PremiumType::Individual)
        .await
        .unwrap();
    let enrollee = enrollment
        .redeem_pin(&officer, &batch.premiums[0].pin, enrollee.id)
        .await
        .unwrap();

    let claims = ClaimsAutomation::new(
        Arc::new(ClaimsStore::new()),
        enrollment.clone(),
        access,
        audit.clone(),
        ClaimsSettings::default(),
    )
    .with_clock(clock.clone());

    claims
        .create_bundle(
            &director,
            NewBundle {
                code: "CS-BUNDLE".to_string(),
                name: "Caesarean section".to_string(),
                diagnosis_codes: vec!["O82".to_string()],
                included_services: vec!["SURG-CS".to_string(), "ANAES-SPINAL".to_string()],
                price: naira(150_000),
            },
        )
        .await
        .unwrap();

    World {
        claims,
        enrollment,
        audit,
        clock,
        officer,
        clerk,
        director,
        payer,
        phc,
        general,
        teaching,
        enrollee,
    }
}

fn referral_input(w: &World, receiving: &Facility, diagnosis: &str) -> NewReferral {
    NewReferral {
        enrollee_id: w.enrollee.id,
        referring_facility_id: w.phc.id,
        receiving_facility_id: receiving.id,
        diagnosis_code: diagnosis.to_string(),
        diagnosis_description: "Delivery by caesarean section".to_string(),
        reason: "Obstructed labour".to_string(),
        severity: Severity::Urgent,
    }
}

async fn validated_referral(w: &World, receiving: &Facility, diagnosis: &str) -> Referral {
    let referral = w
        .claims
        .create_referral(&w.clerk, referral_input(w, receiving, diagnosis))
        .await
        .unwrap();
    let approved = w.claims.approve_referral(&w.director, referral.id).await.unwrap();
    w.claims
        .validate_utn(&w.clerk, approved.utn.as_deref().unwrap(), receiving.id)
        .await
        .unwrap()
}

async fn open_claim(w: &World, receiving: &Facility, diagnosis: &str) -> (Referral, Admission, Claim) {
    let referral = validated_referral(w, receiving, diagnosis).await;
    let admission = w
        .claims
        .admit(
            &w.clerk,
            NewAdmission {
                referral_id: referral.id,
                facility_id: receiving.id,
                ward: Some("Maternity".to_string()),
            },
        )
        .await
        .unwrap();
    let claim = w.claims.create_claim(&w.clerk, admission.id).await.unwrap();
    (referral, admission, claim)
}

async fn requested_pa(w: &World, referral: &Referral, service: &str, amount: Decimal) -> PaCode {
    w.claims
        .request_pa_code(
            &w.clerk,
            NewPaCode {
                referral_id: referral.id,
                facility_id: referral.receiving_facility_id,
                pa_type: PaType::Ffs,
                service_code: service.to_string(),
                service_description: service.to_string(),
                requested_amount: amount,
                justification: "Clinically indicated".to_string(),
            },
        )
        .await
        .unwrap()
}

async fn approved_pa(w: &World, referral: &Referral, service: &str, amount: i64) -> PaCode {
    let requested = requested_pa(w, referral, service, naira(amount)).await;
    w.claims.approve_pa_code(&w.director, requested.id, None).await.unwrap()
}

fn line(service: &str, quantity: u32, unit_price: i64, pa_code: Option<&str>) -> NewTreatment {
    NewTreatment {
        service_code: service.to_string(),
        description: service.to_string(),
        quantity,
        unit_price: naira(unit_price),
        pa_code: pa_code.map(ToString::to_string),
    }
}

#[tokio::test]
async fn test_full_claims_lifecycle() {
    let w = world().await;
    let (referral, admission, claim) = open_claim(&w, &w.general, "O82.0").await;

    let utn = referral.utn.clone().unwrap();
    assert!(utn.starts_with("UTN-20240115-"));
    assert_eq!(utn.len(), "UTN-20240115-".len() + 6);
    assert_eq!(referral.valid_until, Some(w.clock.now() + Duration::days(30)));

    assert!(admission.bundle_id.is_some());
    assert!(admission.admission_number.starts_with("ADM-20240115-"));
    assert_eq!(claim.treatments.len(), 1);
    assert!(claim.treatments[0].is_bundle_package);
    assert_eq!(claim.bundle_amount, naira(150_000));
    assert_eq!(claim.total_amount_claimed, naira(150_000));

    // inside the bundle: no extra charge
    let claim = w
        .claims
        .add_treatment(&w.clerk, claim.id, line("surg-cs", 1, 80_000, None))
        .await
        .unwrap();
    assert_eq!(claim.treatments[1].item_type, ItemType::Bundle);
    assert_eq!(claim.total_amount_claimed, naira(150_000));

    let pa = approved_pa(&w, &referral, "LAB-FBC", 6_000).await;
    assert_eq!(pa.expires_at, Some(w.clock.now() + Duration::days(14)));
    let claim = w
        .claims
        .add_treatment(&w.clerk, claim.id, line("LAB-FBC", 2, 2_500, Some(&pa.code)))
        .await
        .unwrap();
    assert_eq!(claim.ffs_amount, naira(5_000));
    assert_eq!(claim.bundle_amount, naira(150_000));
    assert_eq!(claim.total_amount_claimed, naira(155_000));
    assert_eq!(w.claims.get_pa_code(&pa.code).unwrap().status, PaCodeStatus::Used);

    let early = w.claims.submit_claim(&w.clerk, claim.id).await.unwrap_err();
    assert!(matches!(early, ClaimsError::NotDischarged(_)));

    w.clock.advance(Duration::days(3));
    w.claims.discharge(&w.clerk, admission.id, w.clock.now()).await.unwrap();
    let submitted = w.claims.submit_claim(&w.clerk, claim.id).await.unwrap();
    assert_eq!(submitted.status, ClaimStatus::Submitted);

    let approved = w.claims.approve_claim(&w.payer, claim.id, None).await.unwrap();
    assert_eq!(approved.approved_amount, Some(naira(155_000)));

    let batch = w.claims.create_payment_batch(&w.payer, &[claim.id]).await.unwrap();
    assert_eq!(batch.total_amount, naira(155_000));
    assert_eq!(batch.facility_id, w.general.id);
    let paid = w.claims.get_claim(claim.id).unwrap();
    assert_eq!(paid.status, ClaimStatus::Paid);
    assert_eq!(paid.payment_batch_id, Some(batch.id));

    let trail: Vec<String> = w
        .audit
        .search(&AuditQuery::new().subject("claim", claim.id))
        .await
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(
        trail,
        [
            "claim.created",
            "claim.treatment_added",
            "claim.treatment_added",
            "claim.submitted",
            "claim.approved",
        ]
    );
    w.audit.verify_chain().await.unwrap();
    assert!(w.audit.merkle_root().await.is_some());
}

#[tokio::test]
async fn test_admission_requires_approved_and_validated_referral() {
    let w = world().await;
    let admit = |referral_id: Uuid, facility_id: Uuid| NewAdmission {
        referral_id,
        facility_id,
        ward: None,
    };

    let pending = w
        .claims
        .create_referral(&w.clerk, referral_input(&w, &w.general, "O82.0"))
        .await
        .unwrap();
    let err = w.claims.admit(&w.clerk, admit(pending.id, w.general.id)).await.unwrap_err();
    assert!(matches!(err, ClaimsError::ReferralNotApproved(_)));
    assert_eq!(err.to_string(), "Referral must be approved before admission");

    let approved = w.claims.approve_referral(&w.director, pending.id).await.unwrap();
    let err = w.claims.admit(&w.clerk, admit(approved.id, w.general.id)).await.unwrap_err();
    assert!(matches!(err, ClaimsError::UtnNotValidated(_)));
    assert_eq!(err.to_string(), "Referral UTN must be validated before admission");

    let utn = approved.utn.unwrap();
    let wrong_site = w.claims.validate_utn(&w.clerk, &utn, w.teaching.id).await.unwrap_err();
    assert!(matches!(wrong_site, ClaimsError::FacilityMismatch(_)));
    w.claims.validate_utn(&w.clerk, &utn.to_lowercase(), w.general.id).await.unwrap();
    let again = w.claims.validate_utn(&w.clerk, &utn, w.general.id).await.unwrap_err();
    assert!(matches!(again, ClaimsError::UtnInvalid(_)));

    let err = w.claims.admit(&w.clerk, admit(approved.id, w.teaching.id)).await.unwrap_err();
    assert!(matches!(err, ClaimsError::FacilityMismatch(_)));

    w.claims.admit(&w.clerk, admit(approved.id, w.general.id)).await.unwrap();
    let err = w.claims.admit(&w.clerk, admit(approved.id, w.general.id)).await.unwrap_err();
    assert!(matches!(err, ClaimsError::Conflict(_)));

    let missing = w.claims.admit(&w.clerk, admit(Uuid::new_v4(), w.general.id)).await.unwrap_err();
    assert!(matches!(missing, ClaimsError::NotFound { .. }));
}

#[tokio::test]
async fn test_admission_requires_eligible_enrollee() {
    let w = world().await;
    let referral = validated_referral(&w, &w.general, "J18.9").await;
    w.enrollment
        .suspend_enrollee(&w.officer, w.enrollee.id, "card misuse")
        .await
        .unwrap();

    let err = w
        .claims
        .admit(
            &w.clerk,
            NewAdmission {
                referral_id: referral.id,
                facility_id: w.general.id,
                ward: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClaimsError::Enrollment(EnrollmentError::NotEligible(_))));
}

#[tokio::test]
async fn test_referral_creation_guards() {
    let w = world().await;

    let to_self = w
        .claims
        .create_referral(&w.clerk, referral_input(&w, &w.phc, "O82.0"))
        .await
        .unwrap_err();
    assert!(matches!(to_self, ClaimsError::Validation { .. }));

    let other_phc = facility(&w.enrollment, &w.officer, "NS-PHC-002", LevelOfCare::Primary).await;
    let to_primary = w
        .claims
        .create_referral(&w.clerk, referral_input(&w, &other_phc, "O82.0"))
        .await
        .unwrap_err();
    match to_primary {
        ClaimsError::Validation { fields, .. } => {
            assert!(fields["receiving_facility_id"][0].contains("does not accept referrals"));
        }
        other => panic!("unexpected error {other:?}"),
    }

    let mut blank = referral_input(&w, &w.general, " ");
    let err = w.claims.create_referral(&w.clerk, blank.clone()).await.unwrap_err();
    assert!(matches!(err, ClaimsError::Validation { .. }));

    blank.diagnosis_code = "O82.0".to_string();
    blank.enrollee_id = enroll(&w.enrollment, &w.officer, &w.phc, "98765432109").await.id;
    let unpaid = w.claims.create_referral(&w.clerk, blank).await.unwrap_err();
    assert!(matches!(unpaid, ClaimsError::Enrollment(EnrollmentError::NotEligible(_))));

    let pending = w
        .claims
        .create_referral(&w.clerk, referral_input(&w, &w.teaching, "O82.0"))
        .await
        .unwrap();
    assert!(w.claims.deny_referral(&w.director, pending.id, "").await.is_err());
    let denied = w
        .claims
        .deny_referral(&w.director, pending.id, "Manage at secondary level")
        .await
        .unwrap();
    assert_eq!(denied.status, ReferralStatus::Denied);
    assert!(matches!(
        w.claims.approve_referral(&w.director, pending.id).await.unwrap_err(),
        ClaimsError::InvalidStatus(_)
    ));
}

#[tokio::test]
async fn test_ffs_lines_need_approved_pa_codes() {
    let w = world().await;
    let (referral, _, claim) = open_claim(&w, &w.general, "O82.0").await;

    let err = w
        .claims
        .add_treatment(&w.clerk, claim.id, line("RAD-XRAY", 1, 7_000, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ClaimsError::PaCodeNotApproved(_)));

    let pending = w
        .claims
        .request_pa_code(
            &w.clerk,
            NewPaCode {
                referral_id: referral.id,
                facility_id: w.general.id,
                pa_type: PaType::Ffs,
                service_code: "RAD-XRAY".to_string(),
                service_description: "Chest X-ray".to_string(),
                requested_amount: naira(7_000),
                justification: "Suspected pneumonia".to_string(),
            },
        )
        .await
        .unwrap();
    let err = w
        .claims
        .add_treatment(&w.clerk, claim.id, line("RAD-XRAY", 1, 7_000, Some(&pending.code)))
        .await
        .unwrap_err();
    assert!(matches!(err, ClaimsError::PaCodeNotApproved(_)));

    let over = w
        .claims
        .approve_pa_code(&w.director, pending.id, Some(naira(8_000)))
        .await
        .unwrap_err();
    assert!(matches!(over, ClaimsError::AmountExceeded(_)));
    let pa = w
        .claims
        .approve_pa_code(&w.director, pending.id, Some(naira(6_000)))
        .await
        .unwrap();

    // line above the approved amount rolls back, PA code untouched
    let err = w
        .claims
        .add_treatment(&w.clerk, claim.id, line("RAD-XRAY", 1, 7_000, Some(&pa.code)))
        .await
        .unwrap_err();
    assert!(matches!(err, ClaimsError::AmountExceeded(_)));
    assert_eq!(w.claims.get_pa_code(&pa.code).unwrap().status, PaCodeStatus::Approved);
    assert_eq!(w.claims.get_claim(claim.id).unwrap().treatments.len(), 1);

    let with_xray = w
        .claims
        .add_treatment(&w.clerk, claim.id, line("RAD-XRAY", 1, 6_000, Some(&pa.code)))
        .await
        .unwrap();
    assert_eq!(with_xray.ffs_amount, naira(6_000));

    let reused = w
        .claims
        .add_treatment(&w.clerk, claim.id, line("RAD-XRAY", 1, 1_000, Some(&pa.code)))
        .await
        .unwrap_err();
    assert!(matches!(reused, ClaimsError::PaCodeNotApproved(_)));

    let package = with_xray.treatments[0].id;
    let err = w.claims.remove_treatment(&w.clerk, claim.id, package).await.unwrap_err();
    assert!(matches!(err, ClaimsError::InvalidStatus(_)));

    let xray = with_xray.treatments[1].id;
    let after = w.claims.remove_treatment(&w.clerk, claim.id, xray).await.unwrap();
    assert_eq!(after.ffs_amount, Decimal::ZERO);
    assert_eq!(after.total_amount_claimed, naira(150_000));
    assert_eq!(w.claims.get_pa_code(&pa.code).unwrap().status, PaCodeStatus::Approved);
}

#[tokio::test]
async fn test_unbundled_admission_bills_everything_ffs() {
    let w = world().await;
    let (referral, admission, claim) = open_claim(&w, &w.teaching, "I21.0").await;
    assert!(admission.bundle_id.is_none());
    assert!(claim.treatments.is_empty());

    let pa = approved_pa(&w, &referral, "SURG-CS", 90_000).await;
    let claim = w
        .claims
        .add_treatment(&w.clerk, claim.id, line("SURG-CS", 1, 90_000, Some(&pa.code)))
        .await
        .unwrap();
    assert_eq!(claim.treatments[0].item_type, ItemType::Ffs);
    assert_eq!(claim.bundle_amount, Decimal::ZERO);
    assert_eq!(claim.total_amount_claimed, naira(90_000));
}

#[tokio::test]
async fn test_expired_utn_is_flagged() {
    let w = world().await;
    let referral = w
        .claims
        .create_referral(&w.clerk, referral_input(&w, &w.general, "O82.0"))
        .await
        .unwrap();
    let approved = w.claims.approve_referral(&w.director, referral.id).await.unwrap();

    w.clock.advance(Duration::days(31));
    let err = w
        .claims
        .validate_utn(&w.clerk, approved.utn.as_deref().unwrap(), w.general.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ClaimsError::UtnInvalid(_)));
    assert_eq!(w.claims.get_referral(referral.id).unwrap().status, ReferralStatus::Expired);
}

#[tokio::test]
async fn test_expired_pa_code_is_flagged() {
    let w = world().await;
    let (referral, _, claim) = open_claim(&w, &w.general, "O82.0").await;
    let pa = approved_pa(&w, &referral, "PHARM-ABX", 4_000).await;

    w.clock.advance(Duration::days(15));
    let err = w
        .claims
        .add_treatment(&w.clerk, claim.id, line("PHARM-ABX", 1, 4_000, Some(&pa.code)))
        .await
        .unwrap_err();
    assert!(matches!(err, ClaimsError::PaCodeExpired(_)));
    assert_eq!(w.claims.get_pa_code(&pa.code).unwrap().status, PaCodeStatus::Expired);
}

#[tokio::test]
async fn test_review_and_payment_batches() {
    let w = world().await;
    let (_, general_admission, general_claim) = open_claim(&w, &w.general, "O82.0").await;
    let (_, teaching_admission, teaching_claim) = open_claim(&w, &w.teaching, "O82.1").await;

    for admission in [&general_admission, &teaching_admission] {
        w.claims.discharge(&w.clerk, admission.id, w.clock.now()).await.unwrap();
    }
    for claim in [&general_claim, &teaching_claim] {
        w.claims.submit_claim(&w.clerk, claim.id).await.unwrap();
    }

    let not_approved = w
        .claims
        .create_payment_batch(&w.payer, &[general_claim.id])
        .await
        .unwrap_err();
    assert!(matches!(not_approved, ClaimsError::InvalidStatus(_)));

    let too_much = w
        .claims
        .approve_claim(&w.payer, general_claim.id, Some(naira(200_000)))
        .await
        .unwrap_err();
    assert!(matches!(too_much, ClaimsError::AmountExceeded(_)));
    let partial = w
        .claims
        .approve_claim(&w.payer, general_claim.id, Some(naira(140_000)))
        .await
        .unwrap();
    assert_eq!(partial.approved_amount, Some(naira(140_000)));
    w.claims.approve_claim(&w.payer, teaching_claim.id, None).await.unwrap();

    let mixed = w
        .claims
        .create_payment_batch(&w.payer, &[general_claim.id, teaching_claim.id])
        .await
        .unwrap_err();
    assert!(matches!(mixed, ClaimsError::FacilityMismatch(_)));
    assert_eq!(w.claims.get_claim(general_claim.id).unwrap().status, ClaimStatus::Approved);

    assert!(w.claims.create_payment_batch(&w.payer, &[]).await.is_err());
    let batch = w
        .claims
        .create_payment_batch(&w.payer, &[general_claim.id])
        .await
        .unwrap();
    assert_eq!(batch.total_amount, naira(140_000));
    assert!(batch.batch_number.starts_with("BATCH-20240115-"));
    assert_eq!(
        w.claims.claims_for_facility(w.general.id, ClaimStatus::Paid).len(),
        1
    );

    let rejected = w.claims.reject_claim(&w.payer, teaching_claim.id, "duplicate").await;
    assert!(matches!(rejected.unwrap_err(), ClaimsError::InvalidStatus(_)));
}

#[tokio::test]
async fn test_roles_gate_each_step() {
    let w = world().await;
    let referral = w
        .claims
        .create_referral(&w.clerk, referral_input(&w, &w.general, "O82.0"))
        .await
        .unwrap();

    let err = w.claims.approve_referral(&w.clerk, referral.id).await.unwrap_err();
    assert!(matches!(err, ClaimsError::Rbac(auth_rbac::RbacError::Forbidden { .. })));
    let api: error_common::NicareError = err.into();
    assert_eq!(api.status_code().as_u16(), 403);

    let err = w
        .claims
        .create_payment_batch(&w.director, &[Uuid::new_v4()])
        .await
        .unwrap_err();
    assert!(matches!(err, ClaimsError::Rbac(_)));

    // rejected calls leave no trace in the referral's audit trail
    let trail = w
        .audit
        .search(&AuditQuery::new().subject("referral", referral.id))
        .await;
    assert_eq!(trail.len(), 1);
}

#[tokio::test]
async fn test_rejected_pa_code_cannot_bill_ffs() {
    let w = world().await;
    let (referral, _, claim) = open_claim(&w, &w.general, "O82.0").await;
    let requested = requested_pa(&w, &referral, "RAD-CT", naira(45_000)).await;

    let forbidden = w.claims.reject_pa_code(&w.clerk, requested.id, "not indicated").await;
    assert!(matches!(forbidden.unwrap_err(), ClaimsError::Rbac(_)));
    let blank = w.claims.reject_pa_code(&w.director, requested.id, "  ").await;
    assert!(matches!(blank.unwrap_err(), ClaimsError::Validation { .. }));

    let rejected = w
        .claims
        .reject_pa_code(&w.director, requested.id, "CT not indicated for this diagnosis")
        .await
        .unwrap();
    assert_eq!(rejected.status, PaCodeStatus::Rejected);
    assert_eq!(
        rejected.rejection_reason.as_deref(),
        Some("CT not indicated for this diagnosis")
    );
    assert_eq!(rejected.reviewed_by, Some(w.director.user_id));

    let err = w
        .claims
        .add_treatment(&w.clerk, claim.id, line("RAD-CT", 1, 45_000, Some(&rejected.code)))
        .await
        .unwrap_err();
    assert!(matches!(err, ClaimsError::PaCodeNotApproved(_)));
    assert_eq!(err.to_string(), "FFS treatment requires an approved PA code");
    assert_eq!(w.claims.get_claim(claim.id).unwrap().total_amount_claimed, naira(150_000));

    let late = w.claims.approve_pa_code(&w.director, requested.id, None).await;
    assert!(matches!(late.unwrap_err(), ClaimsError::InvalidStatus(_)));
    let twice = w.claims.reject_pa_code(&w.director, requested.id, "again").await;
    assert!(matches!(twice.unwrap_err(), ClaimsError::InvalidStatus(_)));

    let actions: Vec<String> = w
        .audit
        .search(&AuditQuery::new().subject("pa_code", requested.id))
        .await
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert!(actions.contains(&"pa_code.rejected".to_string()));
}

#[tokio::test]
async fn test_deactivated_bundle_is_not_matched() {
    let w = world().await;
    let bundle = w.claims.match_bundle("O82.0").unwrap();
    assert_eq!(bundle.code, "CS-BUNDLE");

    let forbidden = w.claims.deactivate_bundle(&w.clerk, bundle.id).await;
    assert!(matches!(forbidden.unwrap_err(), ClaimsError::Rbac(_)));
    let missing = w.claims.deactivate_bundle(&w.director, Uuid::new_v4()).await;
    assert!(matches!(missing.unwrap_err(), ClaimsError::NotFound { .. }));

    let retired = w.claims.deactivate_bundle(&w.director, bundle.id).await.unwrap();
    assert!(!retired.active);
    assert!(w.claims.match_bundle("O82.0").is_none());
    assert!(w.claims.bundles().iter().all(|b| !b.active));

    // admissions after retirement bill every item FFS
    let (_, admission, claim) = open_claim(&w, &w.general, "O82.0").await;
    assert!(admission.bundle_id.is_none());
    assert!(claim.treatments.is_empty());
    let err = w
        .claims
        .add_treatment(&w.clerk, claim.id, line("SURG-CS", 1, 80_000, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ClaimsError::PaCodeNotApproved(_)));

    let trail = w
        .audit
        .search(&AuditQuery::new().subject("bundle", bundle.id))
        .await;
    assert!(trail.iter().any(|e| e.action == "bundle.deactivated"));
}

#[tokio::test]
async fn test_out_of_range_amounts_are_rejected() {
    let w = world().await;
    let (_, _, claim) = open_claim(&w, &w.general, "O82.0").await;

    let huge = NewTreatment {
        unit_price: Decimal::MAX,
        ..line("SURG-CS", 2, 0, None)
    };
    let err = w.claims.add_treatment(&w.clerk, claim.id, huge).await.unwrap_err();
    assert!(matches!(err, ClaimsError::AmountExceeded(_)));
    let unchanged = w.claims.get_claim(claim.id).unwrap();
    assert_eq!(unchanged.treatments.len(), 1);
    assert_eq!(unchanged.total_amount_claimed, naira(150_000));

    // each line fits, their sum does not
    let (referral, _, claim) = open_claim(&w, &w.teaching, "I21.0").await;
    let mut codes = Vec::new();
    for service in ["SURG-PCI", "ICU-DAY"] {
        let pa = requested_pa(&w, &referral, service, Decimal::MAX).await;
        codes.push(w.claims.approve_pa_code(&w.director, pa.id, None).await.unwrap().code);
    }
    let big_line = |service: &str, code: &str| NewTreatment {
        unit_price: Decimal::MAX,
        ..line(service, 1, 0, Some(code))
    };
    w.claims
        .add_treatment(&w.clerk, claim.id, big_line("SURG-PCI", &codes[0]))
        .await
        .unwrap();
    let err = w
        .claims
        .add_treatment(&w.clerk, claim.id, big_line("ICU-DAY", &codes[1]))
        .await
        .unwrap_err();
    assert!(matches!(err, ClaimsError::AmountExceeded(_)));

    let after = w.claims.get_claim(claim.id).unwrap();
    assert_eq!(after.treatments.len(), 1);
    assert_eq!(after.total_amount_claimed, Decimal::MAX);
    assert_eq!(w.claims.get_pa_code(&codes[1]).unwrap().status, PaCodeStatus::Approved);
}
