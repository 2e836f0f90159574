//! Environments: opaque lookup-by-guid services for the source and target
//! sides of a sync run.
//!
//! The core never talks to a persistence engine directly. Everything it needs
//! from either side goes through these seams, so the same merge and
//! resolution logic runs against a database-backed environment in production
//! and [`InMemoryEnvironment`] in tests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use stagesync_object::{Guid, SyncObject, TypeKey};

use crate::error::{SyncError, SyncResult};

/// Lookup-by-guid over one environment.
pub trait EntityLocator {
    /// Locate the object of `type_key` with the given guid, if present.
    fn locate(
        &self,
        type_key: &TypeKey,
        guid: &Guid,
    ) -> SyncResult<Option<Box<dyn SyncObject>>>;

    /// Check whether an object exists without materializing it.
    fn exists(&self, type_key: &TypeKey, guid: &Guid) -> SyncResult<bool> {
        Ok(self.locate(type_key, guid)?.is_some())
    }
}

/// One member of a sync group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    /// Registered type of the member.
    pub type_key: TypeKey,
    /// Durable identity of the member.
    pub guid: Guid,
    /// Tombstone flag: the member was explicitly removed from the group and
    /// must be deleted on the target.
    #[serde(default)]
    pub removed: bool,
}

impl MemberRecord {
    /// A live member.
    #[must_use]
    pub fn new(type_key: impl Into<TypeKey>, guid: impl Into<Guid>) -> Self {
        Self {
            type_key: type_key.into(),
            guid: guid.into(),
            removed: false,
        }
    }

    /// A tombstoned member.
    #[must_use]
    pub fn removed(type_key: impl Into<TypeKey>, guid: impl Into<Guid>) -> Self {
        Self {
            type_key: type_key.into(),
            guid: guid.into(),
            removed: true,
        }
    }
}

/// The resolved membership of a named sync group: one ordered unit of work.
///
/// A group may carry natural sub-units; each sub-unit becomes its own
/// transactional batch at adaptation time. A group with no declared sub-units
/// is one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    /// Group name, as resolved.
    pub group: String,
    /// Sub-units in replay order. Each carries a label and its members.
    pub units: Vec<MembershipUnit>,
}

/// One consistency sub-unit of a group membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipUnit {
    /// Batch label.
    pub label: String,
    /// Members in declaration order.
    pub members: Vec<MemberRecord>,
}

impl GroupMembership {
    /// A single-unit membership.
    #[must_use]
    pub fn single(group: impl Into<String>, members: Vec<MemberRecord>) -> Self {
        let group = group.into();
        Self {
            units: vec![MembershipUnit {
                label: group.clone(),
                members,
            }],
            group,
        }
    }

    /// Total member count across all units.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.units.iter().map(|unit| unit.members.len()).sum()
    }
}

/// A source environment: a locator that can also resolve named sync groups.
pub trait SyncSource: EntityLocator {
    /// Resolve a named group to its current membership. An unresolvable name
    /// is a configuration error.
    fn group_membership(&self, group: &str) -> SyncResult<GroupMembership>;
}

/// `HashMap`-backed environment for tests and fixtures.
#[derive(Default)]
pub struct InMemoryEnvironment {
    objects: HashMap<(TypeKey, Guid), Box<dyn SyncObject>>,
    groups: HashMap<String, GroupMembership>,
}

impl InMemoryEnvironment {
    /// Create an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an object under its type and guid.
    pub fn put(&mut self, type_key: impl Into<TypeKey>, guid: impl Into<Guid>, object: Box<dyn SyncObject>) {
        self.objects.insert((type_key.into(), guid.into()), object);
    }

    /// Remove an object.
    pub fn remove(&mut self, type_key: &TypeKey, guid: &Guid) -> Option<Box<dyn SyncObject>> {
        self.objects.remove(&(type_key.clone(), guid.clone()))
    }

    /// Declare a named group membership.
    pub fn put_group(&mut self, membership: GroupMembership) {
        self.groups.insert(membership.group.clone(), membership);
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check whether the environment holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl EntityLocator for InMemoryEnvironment {
    fn locate(
        &self,
        type_key: &TypeKey,
        guid: &Guid,
    ) -> SyncResult<Option<Box<dyn SyncObject>>> {
        Ok(self
            .objects
            .get(&(type_key.clone(), guid.clone()))
            .map(|object| object.boxed_clone()))
    }
}

impl SyncSource for InMemoryEnvironment {
    fn group_membership(&self, group: &str) -> SyncResult<GroupMembership> {
        self.groups
            .get(group)
            .cloned()
            .ok_or_else(|| SyncError::configuration(format!("unknown sync group: {group}")))
    }
}
