//! Command resolution: the single authority that decides what happens to
//! each described object.
//!
//! Resolution is a pure function of three observations: the tombstone flag,
//! presence in the source environment, and presence in the target
//! environment. Present in both resolves update, present in source only
//! resolves add, tombstoned or absent from the source resolves delete.
//! Nothing downstream reassigns a command.

use tracing::debug;

use stagesync_object::{Guid, TypeKey, TypeRegistry};

use crate::env::EntityLocator;
use crate::error::{SyncError, SyncResult};
use crate::types::Command;

/// A described object awaiting command resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessObjectDescriptor {
    /// Registered type of the object.
    pub type_key: TypeKey,
    /// Durable identity of the object.
    pub guid: Guid,
    /// Tombstone flag from the group membership.
    pub removed: bool,
}

impl BusinessObjectDescriptor {
    /// Describe a live object.
    #[must_use]
    pub fn new(type_key: impl Into<TypeKey>, guid: impl Into<Guid>) -> Self {
        Self {
            type_key: type_key.into(),
            guid: guid.into(),
            removed: false,
        }
    }

    /// Describe a tombstoned object.
    #[must_use]
    pub fn removed(type_key: impl Into<TypeKey>, guid: impl Into<Guid>) -> Self {
        Self {
            type_key: type_key.into(),
            guid: guid.into(),
            removed: true,
        }
    }
}

/// Resolves commands by probing the source and target environments.
pub struct CommandResolver<'a> {
    source: &'a dyn EntityLocator,
    target: &'a dyn EntityLocator,
    registry: &'a TypeRegistry,
}

impl<'a> CommandResolver<'a> {
    /// Create a resolver over the two environments.
    #[must_use]
    pub fn new(
        source: &'a dyn EntityLocator,
        target: &'a dyn EntityLocator,
        registry: &'a TypeRegistry,
    ) -> Self {
        Self {
            source,
            target,
            registry,
        }
    }

    /// Resolve the command for one described object.
    ///
    /// An unregistered type is a configuration error.
    pub fn resolve_command_using_source_env(
        &self,
        descriptor: &BusinessObjectDescriptor,
    ) -> SyncResult<Command> {
        if !self.registry.contains(&descriptor.type_key) {
            return Err(SyncError::configuration(format!(
                "cannot resolve command for unregistered type: {}",
                descriptor.type_key
            )));
        }

        let in_source = !descriptor.removed
            && self.source.exists(&descriptor.type_key, &descriptor.guid)?;
        let command = if !in_source {
            Command::Delete
        } else if self.target.exists(&descriptor.type_key, &descriptor.guid)? {
            Command::Update
        } else {
            Command::Add
        };

        debug!(
            type_key = %descriptor.type_key,
            guid = %descriptor.guid,
            command = %command,
            "resolved command"
        );
        Ok(command)
    }
}
