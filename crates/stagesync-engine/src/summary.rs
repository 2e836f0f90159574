//! Run summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stagesync_object::{Guid, TypeKey};

use crate::types::Command;

/// One successfully applied entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResultItem {
    /// Durable identity of the object.
    pub guid: Guid,
    /// Registered type of the object.
    pub type_key: TypeKey,
    /// Command that was applied.
    pub command: Command,
    /// Batch the entry belonged to.
    pub batch: String,
}

/// One failed entry, with the failure message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncErrorItem {
    /// The entry that failed.
    pub item: SyncResultItem,
    /// Failure message.
    pub message: String,
}

/// The outcome of replaying one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Run identifier, carried over from the job descriptor.
    pub job_id: Uuid,
    /// When replay started.
    pub started_at: DateTime<Utc>,
    /// When replay finished.
    pub finished_at: DateTime<Utc>,
    /// Applied entries.
    pub success_results: Vec<SyncResultItem>,
    /// Failed entries.
    pub errors: Vec<SyncErrorItem>,
}

impl Summary {
    /// Start a summary for a job.
    #[must_use]
    pub fn start(job_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            started_at: now,
            finished_at: now,
            success_results: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Stamp the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    /// Check whether any entry failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Number of failed entries.
    #[must_use]
    pub fn number_of_errors(&self) -> usize {
        self.errors.len()
    }

    /// Number of applied additions.
    #[must_use]
    pub fn added(&self) -> usize {
        self.count_of(Command::Add)
    }

    /// Number of applied updates.
    #[must_use]
    pub fn updated(&self) -> usize {
        self.count_of(Command::Update)
    }

    /// Number of applied deletions.
    #[must_use]
    pub fn deleted(&self) -> usize {
        self.count_of(Command::Delete)
    }

    fn count_of(&self, command: Command) -> usize {
        self.success_results
            .iter()
            .filter(|item| item.command == command)
            .count()
    }
}
