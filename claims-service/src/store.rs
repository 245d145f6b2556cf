use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ClaimsError, ClaimsResult};
use crate::models::*;

/// Everything the claims workflow persists
#[derive(Debug, Clone, Default)]
pub struct ClaimsState {
    pub referrals: HashMap<Uuid, Referral>,
    pub pa_codes: HashMap<Uuid, PaCode>,
    pub bundles: HashMap<Uuid, Bundle>,
    pub admissions: HashMap<Uuid, Admission>,
    pub claims: HashMap<Uuid, Claim>,
    pub payment_batches: HashMap<Uuid, PaymentBatch>,
    pub admission_sequence: u64,
    pub claim_sequence: u64,
    pub batch_sequence: u64,
}

impl ClaimsState {
    pub fn referral(&self, id: Uuid) -> ClaimsResult<&Referral> {
        self.referrals
            .get(&id)
            .ok_or_else(|| ClaimsError::not_found("Referral", id))
    }

    pub fn referral_mut(&mut self, id: Uuid) -> ClaimsResult<&mut Referral> {
        self.referrals
            .get_mut(&id)
            .ok_or_else(|| ClaimsError::not_found("Referral", id))
    }

    pub fn referral_id_by_utn(&self, utn: &str) -> ClaimsResult<Uuid> {
        self.referrals
            .values()
            .find(|r| r.utn.as_deref() == Some(utn))
            .map(|r| r.id)
            .ok_or_else(|| ClaimsError::not_found("Referral", utn))
    }

    pub fn pa_code_mut(&mut self, id: Uuid) -> ClaimsResult<&mut PaCode> {
        self.pa_codes
            .get_mut(&id)
            .ok_or_else(|| ClaimsError::not_found("PA code", id))
    }

    pub fn pa_code_id_by_code(&self, code: &str) -> ClaimsResult<Uuid> {
        self.pa_codes
            .values()
            .find(|p| p.code == code)
            .map(|p| p.id)
            .ok_or_else(|| ClaimsError::not_found("PA code", code))
    }

    pub fn bundle(&self, id: Uuid) -> ClaimsResult<&Bundle> {
        self.bundles
            .get(&id)
            .ok_or_else(|| ClaimsError::not_found("Bundle", id))
    }

    pub fn admission(&self, id: Uuid) -> ClaimsResult<&Admission> {
        self.admissions
            .get(&id)
            .ok_or_else(|| ClaimsError::not_found("Admission", id))
    }

    pub fn admission_mut(&mut self, id: Uuid) -> ClaimsResult<&mut Admission> {
        self.admissions
            .get_mut(&id)
            .ok_or_else(|| ClaimsError::not_found("Admission", id))
    }

    pub fn claim(&self, id: Uuid) -> ClaimsResult<&Claim> {
        self.claims
            .get(&id)
            .ok_or_else(|| ClaimsError::not_found("Claim", id))
    }

    pub fn claim_mut(&mut self, id: Uuid) -> ClaimsResult<&mut Claim> {
        self.claims
            .get_mut(&id)
            .ok_or_else(|| ClaimsError::not_found("Claim", id))
    }

    pub fn utn_exists(&self, utn: &str) -> bool {
        self.referrals.values().any(|r| r.utn.as_deref() == Some(utn))
    }

    pub fn pa_code_exists(&self, code: &str) -> bool {
        self.pa_codes.values().any(|p| p.code == code)
    }
}

/// In-memory store with all-or-nothing transactions.
///
/// A transaction works on a copy of the state and replaces the live state
/// only when the closure returns `Ok`; on `Err` every change is dropped.
/// Writers are serialised by the lock.
#[derive(Debug, Default)]
pub struct ClaimsStore {
    state: RwLock<ClaimsState>,
}

impl ClaimsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read<T>(&self, f: impl FnOnce(&ClaimsState) -> T) -> T {
        f(&self.state.read())
    }

    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&mut ClaimsState) -> ClaimsResult<T>,
    ) -> ClaimsResult<T> {
        let mut live = self.state.write();
        let mut working = live.clone();
        match f(&mut working) {
            Ok(value) => {
                *live = working;
                Ok(value)
            }
            Err(err) => {
                debug!(error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn bundle(code: &str) -> Bundle {
        Bundle {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: code.to_string(),
            diagnosis_codes: vec![],
            included_services: vec![],
            price: Decimal::ONE,
            active: true,
        }
    }

    #[test]
    fn test_commit_on_ok() {
        let store = ClaimsStore::new();
        let b = bundle("CS");
        let id = b.id;
        store
            .transaction(|state| {
                state.bundles.insert(b.id, b);
                Ok(())
            })
            .unwrap();
        assert!(store.read(|s| s.bundles.contains_key(&id)));
    }

    #[test]
    fn test_rollback_on_err() {
        let store = ClaimsStore::new();
        let result: ClaimsResult<()> = store.transaction(|state| {
            state.claim_sequence += 5;
            let b = bundle("CS");
            state.bundles.insert(b.id, b);
            Err(ClaimsError::Conflict("abort".into()))
        });
        assert!(result.is_err());
        store.read(|s| {
            assert_eq!(s.claim_sequence, 0);
            assert!(s.bundles.is_empty());
        });
    }
}
