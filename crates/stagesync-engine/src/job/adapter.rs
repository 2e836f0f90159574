//! Source sync request adapter: turns a named unit of work into a replayable
//! job descriptor.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use stagesync_object::TypeRegistry;

use crate::env::{EntityLocator, SyncSource};
use crate::error::SyncResult;
use crate::job::descriptor::{
    JobDescriptor, TransactionJobDescriptor, TransactionJobDescriptorEntry,
};
use crate::job::resolver::{BusinessObjectDescriptor, CommandResolver};
use crate::job::sorting::DependencyOrdering;

/// What to synchronize: an opaque group name, with an optional label prefix
/// for the batches built from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncJobConfiguration {
    /// Named unit of work on the source environment.
    pub group: String,
    /// Optional label prefix for built batches; the unit label is used when
    /// absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_label: Option<String>,
}

impl SyncJobConfiguration {
    /// Configure a sync of `group`.
    #[must_use]
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            batch_label: None,
        }
    }
}

/// Builds job descriptors from source-side group memberships.
pub struct SourceSyncRequestAdapter<'a> {
    source: &'a dyn SyncSource,
    target: &'a dyn EntityLocator,
    registry: &'a TypeRegistry,
    ordering: DependencyOrdering,
}

impl<'a> SourceSyncRequestAdapter<'a> {
    /// Create an adapter over the two environments.
    #[must_use]
    pub fn new(
        source: &'a dyn SyncSource,
        target: &'a dyn EntityLocator,
        registry: &'a TypeRegistry,
        ordering: DependencyOrdering,
    ) -> Self {
        Self {
            source,
            target,
            registry,
            ordering,
        }
    }

    /// Build the job descriptor for one sync request.
    ///
    /// Resolves the group membership against the source environment, assigns
    /// each member its command, groups members into one transactional batch
    /// per membership unit, and sorts every batch into dependency order.
    #[instrument(skip_all, fields(group = %config.group))]
    pub fn build_job_descriptor(
        &self,
        config: &SyncJobConfiguration,
    ) -> SyncResult<JobDescriptor> {
        let membership = self.source.group_membership(&config.group)?;
        let resolver = CommandResolver::new(self.source, self.target, self.registry);

        let mut job = JobDescriptor::new();
        for (index, unit) in membership.units.iter().enumerate() {
            let name = match &config.batch_label {
                Some(prefix) => format!("{prefix}-{index}"),
                None => unit.label.clone(),
            };
            let mut batch = TransactionJobDescriptor::new(name);
            for member in &unit.members {
                let descriptor = BusinessObjectDescriptor {
                    type_key: member.type_key.clone(),
                    guid: member.guid.clone(),
                    removed: member.removed,
                };
                let command = resolver.resolve_command_using_source_env(&descriptor)?;
                batch.entries.push(TransactionJobDescriptorEntry::new(
                    member.type_key.clone(),
                    member.guid.clone(),
                    command,
                ));
            }
            self.ordering.sort(&mut batch.entries);
            job.push(batch);
        }

        info!(
            job_id = %job.id,
            batches = job.transaction_jobs.len(),
            entries = job.entry_count(),
            "built job descriptor"
        );
        Ok(job)
    }
}
