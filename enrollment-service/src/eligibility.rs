use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::{EnrollmentError, EnrollmentResult};
use crate::models::{EligibilityResult, Enrollee, EnrolleeStatus};
use crate::service::EnrollmentService;

/// Eligibility of an enrollee at a point in time
pub fn evaluate(enrollee: &Enrollee, at: DateTime<Utc>) -> EligibilityResult {
    let reason = match (enrollee.status, enrollee.coverage_expires_at) {
        (EnrolleeStatus::Active, Some(expires)) if expires > at => None,
        (EnrolleeStatus::Active, Some(expires)) => {
            Some(format!("Coverage expired on {}", expires.date_naive()))
        }
        (EnrolleeStatus::Active, None) => Some("Enrollee has no coverage period".to_string()),
        (EnrolleeStatus::Pending, _) => Some("Enrollee has not paid a premium".to_string()),
        (EnrolleeStatus::Suspended, _) => Some("Enrollee is suspended".to_string()),
        (EnrolleeStatus::Expired, _) => Some("Enrollee coverage has expired".to_string()),
    };

    EligibilityResult {
        enrollee_id: enrollee.id,
        eligible: reason.is_none(),
        status: enrollee.status,
        coverage_expires_at: enrollee.coverage_expires_at,
        reason,
        checked_at: at,
    }
}

impl EnrollmentService {
    pub async fn check_eligibility(
        &self,
        enrollee_id: Uuid,
        at: DateTime<Utc>,
    ) -> EnrollmentResult<EligibilityResult> {
        let enrollee = self.get_enrollee(enrollee_id).await?;
        let result = evaluate(&enrollee, at);
        debug!(
            enrollee = %enrollee.enrollee_number,
            eligible = result.eligible,
            "eligibility checked"
        );
        Ok(result)
    }

    /// The enrollee, if eligible now; `NotEligible` with the reason otherwise
    pub async fn require_eligible(&self, enrollee_id: Uuid) -> EnrollmentResult<Enrollee> {
        let enrollee = self.get_enrollee(enrollee_id).await?;
        let result = evaluate(&enrollee, self.clock.now());
        match result.reason {
            None => Ok(enrollee),
            Some(reason) => Err(EnrollmentError::NotEligible(reason)),
        }
    }
}
