use std::sync::Arc;

use audit_engine::{AuditEngine, AuditEvent};
use auth_rbac::{permissions, AccessControl, Actor};
use chrono::Duration;
use config_engine::EnrollmentSettings;
use logger_redacted::redacted_info;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::{EnrollmentError, EnrollmentResult};
use crate::models::*;
use crate::repository::{EnrollmentRepository, InMemoryEnrollmentRepository};
use crate::validation::lga_code;

/// Facility registry, enrollee register and premium inventory
pub struct EnrollmentService {
    pub(crate) repository: Arc<dyn EnrollmentRepository>,
    pub(crate) access: Arc<AccessControl>,
    pub(crate) audit: Arc<AuditEngine>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) settings: EnrollmentSettings,
}

impl EnrollmentService {
    pub fn new(
        repository: Arc<dyn EnrollmentRepository>,
        access: Arc<AccessControl>,
        audit: Arc<AuditEngine>,
        settings: EnrollmentSettings,
    ) -> Self {
        Self {
            repository,
            access,
            audit,
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    /// In-memory service for tests and tooling
    pub fn in_memory(
        access: Arc<AccessControl>,
        audit: Arc<AuditEngine>,
        settings: EnrollmentSettings,
    ) -> Self {
        Self::new(Arc::new(InMemoryEnrollmentRepository::new()), access, audit, settings)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &EnrollmentSettings {
        &self.settings
    }

    pub(crate) async fn record(
        &self,
        actor: &Actor,
        action: &str,
        subject_type: &str,
        subject_id: Uuid,
        data: Value,
    ) -> EnrollmentResult<()> {
        self.audit
            .log(AuditEvent::new(actor.user_id, action, subject_type, subject_id, data))
            .await?;
        Ok(())
    }

    // =============================================================================
    // Facilities
    // =============================================================================

    #[instrument(skip(self, actor, input), fields(hcp_code = %input.hcp_code))]
    pub async fn register_facility(
        &self,
        actor: &Actor,
        input: NewFacility,
    ) -> EnrollmentResult<Facility> {
        self.access.authorize(actor, permissions::FACILITIES_MANAGE).await?;
        let input = input.checked()?;

        let facility = Facility {
            id: Uuid::new_v4(),
            hcp_code: input.hcp_code,
            name: input.name,
            level_of_care: input.level_of_care,
            lga: input.lga,
            status: FacilityStatus::Active,
            created_at: self.clock.now(),
        };
        self.repository.insert_facility(facility.clone()).await?;

        self.record(
            actor,
            "facility.registered",
            "facility",
            facility.id,
            json!({ "hcp_code": facility.hcp_code, "level_of_care": facility.level_of_care }),
        )
        .await?;
        info!(facility_id = %facility.id, "facility registered");
        Ok(facility)
    }

    pub async fn get_facility(&self, id: Uuid) -> EnrollmentResult<Facility> {
        self.repository
            .get_facility(id)
            .await?
            .ok_or_else(|| EnrollmentError::not_found("Facility", id))
    }

    pub async fn find_facility_by_code(&self, hcp_code: &str) -> EnrollmentResult<Option<Facility>> {
        self.repository
            .find_facility_by_code(&hcp_code.trim().to_ascii_uppercase())
            .await
    }

    pub async fn deactivate_facility(&self, actor: &Actor, id: Uuid) -> EnrollmentResult<Facility> {
        self.access.authorize(actor, permissions::FACILITIES_MANAGE).await?;
        let mut facility = self.get_facility(id).await?;
        if !facility.is_active() {
            return Err(EnrollmentError::InvalidState(format!(
                "Facility {} is already inactive",
                facility.hcp_code
            )));
        }

        facility.status = FacilityStatus::Inactive;
        self.repository.update_facility(facility.clone()).await?;
        self.record(actor, "facility.deactivated", "facility", id, json!({})).await?;
        warn!(facility_id = %id, hcp_code = %facility.hcp_code, "facility deactivated");
        Ok(facility)
    }

    pub async fn list_facilities_by_level(
        &self,
        level: LevelOfCare,
    ) -> EnrollmentResult<Vec<Facility>> {
        let facilities = self.repository.list_facilities().await?;
        Ok(facilities
            .into_iter()
            .filter(|f| f.level_of_care == level)
            .collect())
    }

    /// Facility that exists and is active
    pub async fn require_active_facility(&self, id: Uuid) -> EnrollmentResult<Facility> {
        let facility = self.get_facility(id).await?;
        if facility.is_active() {
            Ok(facility)
        } else {
            Err(EnrollmentError::FacilityInactive(format!(
                "Facility {} is inactive",
                facility.hcp_code
            )))
        }
    }

    // =============================================================================
    // Enrollees
    // =============================================================================

    #[instrument(skip(self, actor, input))]
    pub async fn register_enrollee(
        &self,
        actor: &Actor,
        input: NewEnrollee,
    ) -> EnrollmentResult<Enrollee> {
        self.access.authorize(actor, permissions::ENROLLEES_MANAGE).await?;
        let now = self.clock.now();
        let input = input.checked(now.date_naive())?;

        let facility = self.require_active_facility(input.primary_facility_id).await?;
        if facility.level_of_care != LevelOfCare::Primary {
            return Err(EnrollmentError::field(
                "primary_facility_id",
                format!("Facility {} is not a primary care facility", facility.hcp_code),
            ));
        }
        if self.repository.find_enrollee_by_nin(&input.nin).await?.is_some() {
            return Err(EnrollmentError::Conflict(
                "An enrollee with this NIN is already registered".to_string(),
            ));
        }

        // checked() guarantees the LGA has a code
        let lga = lga_code(&input.lga).unwrap_or_default();
        let sequence = self.repository.next_enrollee_sequence().await?;
        let enrollee = Enrollee {
            id: Uuid::new_v4(),
            enrollee_number: format!(
                "{}/{}/{:06}",
                self.settings.enrollee_number_prefix, lga, sequence
            ),
            first_name: input.first_name,
            last_name: input.last_name,
            nin: input.nin,
            phone: input.phone,
            email: input.email,
            sex: input.sex,
            date_of_birth: input.date_of_birth,
            lga: input.lga,
            primary_facility_id: facility.id,
            funding_type: input.funding_type,
            premium_id: None,
            status: EnrolleeStatus::Pending,
            enrolled_at: None,
            coverage_expires_at: None,
            created_at: now,
        };
        self.repository.insert_enrollee(enrollee.clone()).await?;

        self.record(
            actor,
            "enrollee.registered",
            "enrollee",
            enrollee.id,
            json!({
                "enrollee_number": enrollee.enrollee_number,
                "primary_facility": facility.hcp_code,
                "funding_type": enrollee.funding_type,
            }),
        )
        .await?;
        redacted_info!(
            "enrollee {} registered (NIN {}, phone {})",
            enrollee.enrollee_number,
            enrollee.nin,
            enrollee.phone
        );
        Ok(enrollee)
    }

    pub async fn get_enrollee(&self, id: Uuid) -> EnrollmentResult<Enrollee> {
        self.repository
            .get_enrollee(id)
            .await?
            .ok_or_else(|| EnrollmentError::not_found("Enrollee", id))
    }

    pub async fn find_enrollee_by_nin(&self, nin: &str) -> EnrollmentResult<Option<Enrollee>> {
        self.repository.find_enrollee_by_nin(nin.trim()).await
    }

    pub async fn suspend_enrollee(
        &self,
        actor: &Actor,
        id: Uuid,
        reason: &str,
    ) -> EnrollmentResult<Enrollee> {
        self.access.authorize(actor, permissions::ENROLLEES_MANAGE).await?;
        if reason.trim().is_empty() {
            return Err(EnrollmentError::field("reason", "A suspension reason is required"));
        }

        let mut enrollee = self.get_enrollee(id).await?;
        if enrollee.status == EnrolleeStatus::Suspended {
            return Err(EnrollmentError::InvalidState(format!(
                "Enrollee {} is already suspended",
                enrollee.enrollee_number
            )));
        }

        let previous = enrollee.status;
        enrollee.status = EnrolleeStatus::Suspended;
        self.repository.update_enrollee(enrollee.clone()).await?;
        self.record(
            actor,
            "enrollee.suspended",
            "enrollee",
            id,
            json!({ "previous_status": previous, "reason": reason.trim() }),
        )
        .await?;
        warn!(enrollee = %enrollee.enrollee_number, "enrollee suspended");
        Ok(enrollee)
    }

    /// Lift a suspension. The restored status follows the coverage window:
    /// Active while covered, Expired once lapsed, Pending if never paid.
    pub async fn reinstate_enrollee(&self, actor: &Actor, id: Uuid) -> EnrollmentResult<Enrollee> {
        self.access.authorize(actor, permissions::ENROLLEES_MANAGE).await?;
        let mut enrollee = self.get_enrollee(id).await?;
        if enrollee.status != EnrolleeStatus::Suspended {
            return Err(EnrollmentError::InvalidState(format!(
                "Enrollee {} is not suspended",
                enrollee.enrollee_number
            )));
        }

        let now = self.clock.now();
        enrollee.status = match enrollee.coverage_expires_at {
            Some(expires) if expires > now => EnrolleeStatus::Active,
            Some(_) => EnrolleeStatus::Expired,
            None => EnrolleeStatus::Pending,
        };
        self.repository.update_enrollee(enrollee.clone()).await?;
        self.record(
            actor,
            "enrollee.reinstated",
            "enrollee",
            id,
            json!({ "status": enrollee.status }),
        )
        .await?;
        info!(enrollee = %enrollee.enrollee_number, status = ?enrollee.status, "enrollee reinstated");
        Ok(enrollee)
    }

    /// Start or extend coverage after a premium has been paid
    pub(crate) fn activate_coverage(&self, enrollee: &mut Enrollee, premium_id: Uuid) {
        let now = self.clock.now();
        let days = Duration::days(self.settings.coverage_days);
        // renewals made before lapse extend the current window
        let start = match (enrollee.status, enrollee.coverage_expires_at) {
            (EnrolleeStatus::Active, Some(expires)) if expires > now => expires,
            _ => now,
        };
        enrollee.premium_id = Some(premium_id);
        enrollee.status = EnrolleeStatus::Active;
        enrollee.enrolled_at.get_or_insert(now);
        enrollee.coverage_expires_at = Some(start + days);
    }
}
