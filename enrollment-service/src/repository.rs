use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::error::{EnrollmentError, EnrollmentResult};
use crate::models::{Enrollee, Facility, Premium, PremiumStatus};

/// Storage for facilities, enrollees and premium PINs.
///
/// Inserts enforce the natural keys (`hcp_code`, `nin`, `pin`) and return
/// `EnrollmentError::Conflict` on a duplicate.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    async fn insert_facility(&self, facility: Facility) -> EnrollmentResult<()>;

    async fn get_facility(&self, id: Uuid) -> EnrollmentResult<Option<Facility>>;

    async fn find_facility_by_code(&self, hcp_code: &str) -> EnrollmentResult<Option<Facility>>;

    async fn update_facility(&self, facility: Facility) -> EnrollmentResult<()>;

    async fn list_facilities(&self) -> EnrollmentResult<Vec<Facility>>;

    /// Next value of the scheme-wide enrollee sequence, starting at 1
    async fn next_enrollee_sequence(&self) -> EnrollmentResult<u64>;

    async fn insert_enrollee(&self, enrollee: Enrollee) -> EnrollmentResult<()>;

    async fn get_enrollee(&self, id: Uuid) -> EnrollmentResult<Option<Enrollee>>;

    async fn find_enrollee_by_nin(&self, nin: &str) -> EnrollmentResult<Option<Enrollee>>;

    async fn update_enrollee(&self, enrollee: Enrollee) -> EnrollmentResult<()>;

    async fn insert_premiums(&self, premiums: Vec<Premium>) -> EnrollmentResult<()>;

    async fn find_premium_by_pin(&self, pin: &str) -> EnrollmentResult<Option<Premium>>;

    /// Store `premium` only if the stored copy is still in `expected` status.
    ///
    /// The check and the write happen as one step, so two callers racing
    /// on the same PIN cannot both move it out of `expected`. The loser
    /// gets `PinUnavailable`.
    async fn swap_premium_status(
        &self,
        expected: PremiumStatus,
        premium: Premium,
    ) -> EnrollmentResult<Premium>;

    async fn list_premiums(&self) -> EnrollmentResult<Vec<Premium>>;
}

/// In-memory repository for testing and development
#[derive(Default)]
pub struct InMemoryEnrollmentRepository {
    facilities: DashMap<Uuid, Facility>,
    facility_codes: DashMap<String, Uuid>,
    enrollees: DashMap<Uuid, Enrollee>,
    enrollee_nins: DashMap<String, Uuid>,
    enrollee_sequence: AtomicU64,
    premiums: DashMap<Uuid, Premium>,
    premium_pins: DashMap<String, Uuid>,
}

impl InMemoryEnrollmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryEnrollmentRepository {
    async fn insert_facility(&self, facility: Facility) -> EnrollmentResult<()> {
        match self.facility_codes.entry(facility.hcp_code.clone()) {
            Entry::Occupied(_) => Err(EnrollmentError::Conflict(format!(
                "Facility with HCP code {} already exists",
                facility.hcp_code
            ))),
            Entry::Vacant(slot) => {
                slot.insert(facility.id);
                self.facilities.insert(facility.id, facility);
                Ok(())
            }
        }
    }

    async fn get_facility(&self, id: Uuid) -> EnrollmentResult<Option<Facility>> {
        Ok(self.facilities.get(&id).map(|f| f.value().clone()))
    }

    async fn find_facility_by_code(&self, hcp_code: &str) -> EnrollmentResult<Option<Facility>> {
        let id = self.facility_codes.get(hcp_code).map(|id| *id.value());
        Ok(id.and_then(|id| self.facilities.get(&id).map(|f| f.value().clone())))
    }

    async fn update_facility(&self, facility: Facility) -> EnrollmentResult<()> {
        match self.facilities.get_mut(&facility.id) {
            Some(mut existing) => {
                *existing = facility;
                Ok(())
            }
            None => Err(EnrollmentError::not_found("Facility", facility.id)),
        }
    }

    async fn list_facilities(&self) -> EnrollmentResult<Vec<Facility>> {
        let mut facilities: Vec<Facility> =
            self.facilities.iter().map(|f| f.value().clone()).collect();
        facilities.sort_by(|a, b| a.hcp_code.cmp(&b.hcp_code));
        Ok(facilities)
    }

    async fn next_enrollee_sequence(&self) -> EnrollmentResult<u64> {
        Ok(self.enrollee_sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn insert_enrollee(&self, enrollee: Enrollee) -> EnrollmentResult<()> {
        match self.enrollee_nins.entry(enrollee.nin.clone()) {
            Entry::Occupied(_) => Err(EnrollmentError::Conflict(
                "An enrollee with this NIN is already registered".to_string(),
            )),
            Entry::Vacant(slot) => {
                slot.insert(enrollee.id);
                self.enrollees.insert(enrollee.id, enrollee);
                Ok(())
            }
        }
    }

    async fn get_enrollee(&self, id: Uuid) -> EnrollmentResult<Option<Enrollee>> {
        Ok(self.enrollees.get(&id).map(|e| e.value().clone()))
    }

    async fn find_enrollee_by_nin(&self, nin: &str) -> EnrollmentResult<Option<Enrollee>> {
        let id = self.enrollee_nins.get(nin).map(|id| *id.value());
        Ok(id.and_then(|id| self.enrollees.get(&id).map(|e| e.value().clone())))
    }

    async fn update_enrollee(&self, enrollee: Enrollee) -> EnrollmentResult<()> {
        match self.enrollees.get_mut(&enrollee.id) {
            Some(mut existing) => {
                *existing = enrollee;
                Ok(())
            }
            None => Err(EnrollmentError::not_found("Enrollee", enrollee.id)),
        }
    }

    async fn insert_premiums(&self, premiums: Vec<Premium>) -> EnrollmentResult<()> {
        if let Some(dup) = premiums.iter().find(|p| self.premium_pins.contains_key(&p.pin)) {
            return Err(EnrollmentError::Conflict(format!(
                "Premium {} duplicates an existing PIN",
                dup.serial_number
            )));
        }
        for premium in premiums {
            self.premium_pins.insert(premium.pin.clone(), premium.id);
            self.premiums.insert(premium.id, premium);
        }
        Ok(())
    }

    async fn find_premium_by_pin(&self, pin: &str) -> EnrollmentResult<Option<Premium>> {
        let id = self.premium_pins.get(pin).map(|id| *id.value());
        Ok(id.and_then(|id| self.premiums.get(&id).map(|p| p.value().clone())))
    }

    async fn swap_premium_status(
        &self,
        expected: PremiumStatus,
        premium: Premium,
    ) -> EnrollmentResult<Premium> {
        let mut existing = self
            .premiums
            .get_mut(&premium.id)
            .ok_or_else(|| EnrollmentError::not_found("Premium", premium.id))?;
        if existing.status != expected {
            return Err(EnrollmentError::PinUnavailable(format!(
                "PIN {} is {:?}",
                existing.serial_number, existing.status
            )));
        }
        *existing = premium.clone();
        Ok(premium)
    }

    async fn list_premiums(&self) -> EnrollmentResult<Vec<Premium>> {
        let mut premiums: Vec<Premium> = self.premiums.iter().map(|p| p.value().clone()).collect();
        premiums.sort_by(|a, b| a.serial_number.cmp(&b.serial_number));
        Ok(premiums)
    }
}
