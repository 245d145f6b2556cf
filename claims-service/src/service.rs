use std::sync::Arc;

use audit_engine::{AuditEngine, AuditEvent};
use auth_rbac::{AccessControl, Actor};
use config_engine::ClaimsSettings;
use enrollment_service::{Clock, EnrollmentService, SystemClock};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ClaimsResult;
use crate::store::ClaimsStore;

/// Referral → PA code → admission → claim workflow.
///
/// Eligibility and facility lookups go to the enrollment service; workflow
/// records live in the `ClaimsStore`. Each operation authorizes the actor,
/// runs its writes in one store transaction and then records an audit entry.
pub struct ClaimsAutomation {
    pub(crate) store: Arc<ClaimsStore>,
    pub(crate) enrollment: Arc<EnrollmentService>,
    pub(crate) access: Arc<AccessControl>,
    pub(crate) audit: Arc<AuditEngine>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) settings: ClaimsSettings,
}

impl ClaimsAutomation {
    pub fn new(
        store: Arc<ClaimsStore>,
        enrollment: Arc<EnrollmentService>,
        access: Arc<AccessControl>,
        audit: Arc<AuditEngine>,
        settings: ClaimsSettings,
    ) -> Self {
        Self {
            store,
            enrollment,
            access,
            audit,
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &ClaimsSettings {
        &self.settings
    }

    pub fn store(&self) -> &ClaimsStore {
        &self.store
    }

    pub(crate) async fn record(
        &self,
        actor: &Actor,
        action: &str,
        subject_type: &str,
        subject_id: Uuid,
        data: Value,
    ) -> ClaimsResult<()> {
        self.audit
            .log(AuditEvent::new(actor.user_id, action, subject_type, subject_id, data))
            .await?;
        Ok(())
    }
}
