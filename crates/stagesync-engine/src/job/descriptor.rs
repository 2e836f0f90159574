//! Job descriptors: the replayable record of what a sync run will do.
//!
//! A [`JobDescriptor`] is append-only during adaptation and consumed by
//! replay. Each [`TransactionJobDescriptor`] inside it is one atomic
//! consistency boundary: its entries either all apply or none do.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stagesync_object::{Guid, TypeKey};

use crate::types::Command;

/// One unit of work: apply `command` to the object identified by
/// `(type_key, guid)`.
///
/// The command is assigned once, during adaptation, and never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionJobDescriptorEntry {
    /// Durable identity of the object.
    pub guid: Guid,
    /// Registered type of the object.
    pub type_key: TypeKey,
    /// Resolved target-side operation.
    pub command: Command,
}

impl TransactionJobDescriptorEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(type_key: impl Into<TypeKey>, guid: impl Into<Guid>, command: Command) -> Self {
        Self {
            guid: guid.into(),
            type_key: type_key.into(),
            command,
        }
    }
}

/// One transactional batch of entries, ordered for replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionJobDescriptor {
    /// Batch name, unique within the job.
    pub name: String,
    /// Entries in replay order.
    pub entries: Vec<TransactionJobDescriptorEntry>,
}

impl TransactionJobDescriptor {
    /// Create an empty batch.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Check whether the batch already holds an entry for an identity.
    /// Guid and type are unique within a batch.
    #[must_use]
    pub fn contains(&self, type_key: &TypeKey, guid: &Guid) -> bool {
        self.entries
            .iter()
            .any(|entry| &entry.type_key == type_key && &entry.guid == guid)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The full descriptor of one sync run, produced by adaptation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Run identifier.
    pub id: Uuid,
    /// When adaptation produced this descriptor.
    pub created_at: DateTime<Utc>,
    /// Batches in replay order.
    pub transaction_jobs: Vec<TransactionJobDescriptor>,
}

impl JobDescriptor {
    /// Create an empty descriptor with a fresh run id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            transaction_jobs: Vec::new(),
        }
    }

    /// Append a batch.
    pub fn push(&mut self, batch: TransactionJobDescriptor) {
        self.transaction_jobs.push(batch);
    }

    /// Total entry count across all batches.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.transaction_jobs.iter().map(TransactionJobDescriptor::len).sum()
    }

    /// Count entries carrying one command.
    #[must_use]
    pub fn count_of(&self, command: Command) -> usize {
        self.transaction_jobs
            .iter()
            .flat_map(|batch| batch.entries.iter())
            .filter(|entry| entry.command == command)
            .count()
    }
}

impl Default for JobDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_counts_per_command() {
        let mut job = JobDescriptor::new();
        let mut batch = TransactionJobDescriptor::new("b1");
        batch.entries.push(TransactionJobDescriptorEntry::new(
            "catalog.product",
            "P-1",
            Command::Add,
        ));
        batch.entries.push(TransactionJobDescriptorEntry::new(
            "catalog.product",
            "P-2",
            Command::Update,
        ));
        batch.entries.push(TransactionJobDescriptorEntry::new(
            "catalog.product",
            "P-3",
            Command::Delete,
        ));
        job.push(batch);

        assert_eq!(job.entry_count(), 3);
        assert_eq!(job.count_of(Command::Add), 1);
        assert_eq!(job.count_of(Command::Update), 1);
        assert_eq!(job.count_of(Command::Delete), 1);
    }

    #[test]
    fn test_batch_identity_lookup() {
        let mut batch = TransactionJobDescriptor::new("b1");
        batch.entries.push(TransactionJobDescriptorEntry::new(
            "catalog.product",
            "P-1",
            Command::Add,
        ));
        assert!(batch.contains(&TypeKey::new("catalog.product"), &Guid::new("P-1")));
        assert!(!batch.contains(&TypeKey::new("catalog.sku"), &Guid::new("P-1")));
    }

    #[test]
    fn test_descriptor_serde_roundtrip() {
        let mut job = JobDescriptor::new();
        let mut batch = TransactionJobDescriptor::new("b1");
        batch.entries.push(TransactionJobDescriptorEntry::new(
            "catalog.product",
            "P-1",
            Command::Add,
        ));
        job.push(batch);

        let json = serde_json::to_string(&job).unwrap();
        let back: JobDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
    }
}
