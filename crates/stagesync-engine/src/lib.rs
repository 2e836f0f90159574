//! Sync Core
//!
//! Staged synchronization of domain-object graphs between a source and a
//! target environment, in three sequential phases:
//!
//! ```text
//! group membership --> adaptation --> job descriptor --> replay --> summary
//!                       (commands,                      (atomic
//!                        ordering)                       batches)
//! ```
//!
//! ## Key Components
//!
//! - [`SourceSyncRequestAdapter`] - Resolves a named sync group into a
//!   replayable [`JobDescriptor`]
//! - [`CommandResolver`] - Assigns each member its [`Command`] from source
//!   and target presence; nothing downstream reassigns it
//! - [`DependencyOrdering`] - Sorts batch entries so upserts run parents
//!   first and deletes run children first
//! - [`MergeEngine`] - Copies a source object graph onto its target
//!   counterpart through the registered capability table, scoped by
//!   [`MergeConfig`]
//! - [`JobReplayer`] - Applies batches atomically through the
//!   [`TransactionDemarcation`] seam and reports a [`Summary`]
//!
//! The core is strictly sequential and synchronous; persistence and
//! transport are external collaborators behind the [`EntityLocator`] and
//! [`BatchTransaction`] traits.

pub mod boundary;
pub mod config;
pub mod env;
pub mod error;
pub mod filter;
pub mod job;
pub mod merge;
pub mod replay;
pub mod summary;
pub mod types;

pub use boundary::MergeBoundary;
pub use config::MergeConfig;
pub use env::{
    EntityLocator, GroupMembership, InMemoryEnvironment, MemberRecord, MembershipUnit, SyncSource,
};
pub use error::{SyncError, SyncResult};
pub use filter::{EntityPredicate, MergeFilterSet};
pub use job::{
    BusinessObjectDescriptor, CommandResolver, DependencyOrdering, JobDescriptor,
    SourceSyncRequestAdapter, SyncJobConfiguration, TransactionJobDescriptor,
    TransactionJobDescriptorEntry,
};
pub use merge::MergeEngine;
pub use replay::{BatchTransaction, JobReplayer, TransactionDemarcation};
pub use summary::{Summary, SyncErrorItem, SyncResultItem};
pub use types::{BatchStatus, Command, DuplicateKeyPolicy};
