use rs_merkle::{algorithms::Sha256 as MerkleSha256, MerkleTree};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::entry::{AuditEntry, AuditEvent, GENESIS_HASH};
use crate::error::{AuditError, Result};

/// Filter for audit searches; `None` fields match everything
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub actor_id: Option<String>,
    pub action: Option<String>,
    pub subject_type: Option<String>,
    pub subject_id: Option<String>,
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor(mut self, actor_id: impl ToString) -> Self {
        self.actor_id = Some(actor_id.to_string());
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn subject(mut self, subject_type: impl Into<String>, subject_id: impl ToString) -> Self {
        self.subject_type = Some(subject_type.into());
        self.subject_id = Some(subject_id.to_string());
        self
    }

    pub fn subject_type(mut self, subject_type: impl Into<String>) -> Self {
        self.subject_type = Some(subject_type.into());
        self
    }

    fn matches(&self, entry: &AuditEntry) -> bool {
        fn field(filter: &Option<String>, value: &str) -> bool {
            filter.as_deref().map_or(true, |f| f == value)
        }
        field(&self.actor_id, &entry.actor_id)
            && field(&self.action, &entry.action)
            && field(&self.subject_type, &entry.subject_type)
            && field(&self.subject_id, &entry.subject_id)
    }
}

/// Append-only, hash-chained audit trail
#[derive(Debug, Default)]
pub struct AuditEngine {
    entries: RwLock<Vec<AuditEntry>>,
}

impl AuditEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event, chaining it to the previous entry
    pub async fn log(&self, event: AuditEvent) -> Result<AuditEntry> {
        if event.action.trim().is_empty() {
            return Err(AuditError::ValidationError("action must not be empty".into()));
        }
        if event.subject_type.trim().is_empty() {
            return Err(AuditError::ValidationError("subject type must not be empty".into()));
        }

        let mut entries = self.entries.write().await;
        let previous_hash = entries
            .last()
            .map_or_else(|| GENESIS_HASH.to_string(), |e| e.hash.clone());
        let sequence = entries.len() as u64;

        let entry = AuditEntry::seal(event, sequence, previous_hash);
        debug!(
            sequence,
            action = %entry.action,
            subject_type = %entry.subject_type,
            subject_id = %entry.subject_id,
            "audit entry recorded"
        );
        entries.push(entry.clone());
        Ok(entry)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Trail of a single record, oldest first
    pub async fn entries_for(&self, subject_type: &str, subject_id: &str) -> Vec<AuditEntry> {
        self.search(&AuditQuery::new().subject(subject_type, subject_id)).await
    }

    pub async fn search(&self, query: &AuditQuery) -> Vec<AuditEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect()
    }

    /// Recompute every hash and check each link of the chain
    pub async fn verify_chain(&self) -> Result<()> {
        let entries = self.entries.read().await;
        let mut expected_previous = GENESIS_HASH.to_string();

        for (index, entry) in entries.iter().enumerate() {
            if entry.previous_hash != expected_previous || entry.compute_hash() != entry.hash {
                warn!(index, entry_id = %entry.id, "audit chain integrity failure");
                return Err(AuditError::IntegrityCheckError {
                    index,
                    entry_id: entry.id.to_string(),
                });
            }
            expected_previous = entry.hash.clone();
        }
        Ok(())
    }

    /// Merkle root over all entry hashes, hex encoded
    pub async fn merkle_root(&self) -> Option<String> {
        let entries = self.entries.read().await;
        let leaves: Vec<[u8; 32]> = entries.iter().filter_map(AuditEntry::hash_bytes).collect();
        if leaves.is_empty() {
            return None;
        }
        MerkleTree::<MerkleSha256>::from_leaves(&leaves)
            .root()
            .map(hex::encode)
    }

    #[cfg(test)]
    pub(crate) async fn tamper(&self, index: usize, data: serde_json::Value) {
        if let Some(entry) = self.entries.write().await.get_mut(index) {
            entry.data = data;
        }
    }
}
