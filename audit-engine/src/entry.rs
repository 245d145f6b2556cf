// Audit entry types and hash chaining
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Hash the first entry chains from
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// An event to be recorded
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub actor_id: String,
    pub action: String,
    pub subject_type: String,
    pub subject_id: String,
    pub data: serde_json::Value,
}

impl AuditEvent {
    pub fn new(
        actor_id: impl ToString,
        action: impl Into<String>,
        subject_type: impl Into<String>,
        subject_id: impl ToString,
        data: serde_json::Value,
    ) -> Self {
        Self {
            actor_id: actor_id.to_string(),
            action: action.into(),
            subject_type: subject_type.into(),
            subject_id: subject_id.to_string(),
            data,
        }
    }
}

/// A recorded, hash-chained audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub actor_id: String,
    pub action: String,
    pub subject_type: String,
    pub subject_id: String,
    pub data: serde_json::Value,
    pub previous_hash: String,
    pub hash: String,
}

impl AuditEntry {
    pub(crate) fn seal(event: AuditEvent, sequence: u64, previous_hash: String) -> Self {
        let mut entry = Self {
            id: Uuid::new_v4(),
            sequence,
            timestamp: Utc::now(),
            actor_id: event.actor_id,
            action: event.action,
            subject_type: event.subject_type,
            subject_id: event.subject_id,
            data: event.data,
            previous_hash,
            hash: String::new(),
        };
        entry.hash = entry.compute_hash();
        entry
    }

    /// SHA-256 over the previous hash and every recorded field
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.previous_hash.as_bytes());
        hasher.update(self.id.as_bytes());
        hasher.update(self.sequence.to_be_bytes());
        hasher.update(self.timestamp.to_rfc3339().as_bytes());
        for field in [&self.actor_id, &self.action, &self.subject_type, &self.subject_id] {
            hasher.update((field.len() as u64).to_be_bytes());
            hasher.update(field.as_bytes());
        }
        hasher.update(self.data.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    pub(crate) fn hash_bytes(&self) -> Option<[u8; 32]> {
        let mut out = [0u8; 32];
        hex::decode_to_slice(&self.hash, &mut out).ok()?;
        Some(out)
    }
}
