//! Merge configuration.

use stagesync_object::TypeRegistry;

use crate::boundary::MergeBoundary;
use crate::error::SyncResult;
use crate::filter::MergeFilterSet;
use crate::types::DuplicateKeyPolicy;

/// The complete, immutable scope configuration for a merge engine.
///
/// Everything that scopes a merge travels through this struct rather than
/// engine state, so two engines over disjoint graphs can run concurrently
/// without sharing anything mutable.
#[derive(Debug, Clone, Default)]
pub struct MergeConfig {
    /// Types at which recursion stops.
    pub boundary: MergeBoundary,
    /// Field and entity filters.
    pub filters: MergeFilterSet,
    /// Policy for duplicate collection keys on the source side.
    pub duplicate_keys: DuplicateKeyPolicy,
}

impl MergeConfig {
    /// The default configuration: no boundary, no filters, first-wins keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the boundary.
    #[must_use]
    pub fn with_boundary(mut self, boundary: MergeBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    /// Replace the filter set.
    #[must_use]
    pub fn with_filters(mut self, filters: MergeFilterSet) -> Self {
        self.filters = filters;
        self
    }

    /// Replace the duplicate-key policy.
    #[must_use]
    pub fn with_duplicate_keys(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.duplicate_keys = policy;
        self
    }

    /// Validate the configuration against the registry.
    pub fn validate(&self, registry: &TypeRegistry) -> SyncResult<()> {
        self.filters.validate(registry)
    }
}
