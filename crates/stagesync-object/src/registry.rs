//! The type registry: the capability table the merge core dispatches on.

use std::collections::HashMap;
use std::fmt;

use crate::descriptor::TypeDescriptor;
use crate::error::{ObjectError, ObjectResult};
use crate::ids::{Guid, TypeKey};
use crate::object::SyncObject;

/// Registry of [`TypeDescriptor`]s, keyed by [`TypeKey`].
///
/// Populated once at startup; descriptors are immutable afterwards, so the
/// per-class classification the original system memoized at runtime is fixed
/// at registration here. Lookups of unregistered types are configuration
/// errors.
#[derive(Default)]
pub struct TypeRegistry {
    types: HashMap<TypeKey, TypeDescriptor>,
}

impl TypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Registering the same type twice is an error.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> ObjectResult<()> {
        let type_key = descriptor.type_key().clone();
        if self.types.contains_key(&type_key) {
            return Err(ObjectError::DuplicateType { type_key });
        }
        self.types.insert(type_key, descriptor);
        Ok(())
    }

    /// Look up the descriptor for a type.
    pub fn descriptor(&self, type_key: &TypeKey) -> ObjectResult<&TypeDescriptor> {
        self.types
            .get(type_key)
            .ok_or_else(|| ObjectError::unknown_type(type_key.clone()))
    }

    /// Check whether a type is registered.
    #[must_use]
    pub fn contains(&self, type_key: &TypeKey) -> bool {
        self.types.contains_key(type_key)
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Instantiate a blank object of the given type (bean creation).
    pub fn create(&self, type_key: &TypeKey) -> ObjectResult<Box<dyn SyncObject>> {
        let descriptor = self.descriptor(type_key)?;
        Ok((descriptor.creator())())
    }

    /// Extract an object's guid through its registered accessor.
    pub fn guid_of(&self, object: &dyn SyncObject) -> ObjectResult<Guid> {
        let type_key = object.type_key();
        let descriptor = self.descriptor(&type_key)?;
        let accessor = descriptor
            .guid_accessor()
            .ok_or(ObjectError::MissingGuid { type_key })?;
        accessor(object)
    }

    /// Check whether objects of a type carry a durable guid.
    #[must_use]
    pub fn can_qualify_by_guid(&self, type_key: &TypeKey) -> bool {
        self.types
            .get(type_key)
            .is_some_and(|descriptor| descriptor.guid_accessor().is_some())
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&TypeKey> = self.types.keys().collect();
        keys.sort();
        f.debug_struct("TypeRegistry").field("types", &keys).finish()
    }
}
