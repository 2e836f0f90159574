//! Domain Object Framework
//!
//! The framework layer the stagesync merge core is built on: erased domain
//! objects, durable identity types, and per-type capability tables.
//!
//! ## Key Components
//!
//! - [`SyncObject`] - Erased domain object trait; concrete types opt in with
//!   [`impl_sync_object!`]
//! - [`TypeRegistry`] - Capability table mapping a [`TypeKey`] to its
//!   [`TypeDescriptor`]
//! - [`TypeDescriptor`] - One type's classified persistent state: basic
//!   attributes, single- and collection-valued associations, guid extractor,
//!   blank-instance creator, and post-load hooks
//! - [`accessor`] - Typed-to-erased accessor constructors and bean-style
//!   naming helpers
//!
//! ## Override Resolution
//!
//! Building a descriptor with [`TypeDescriptorBuilder::extends`] resolves
//! overrides the way the classification of a class hierarchy would: fields
//! registered at a more-derived level shadow inherited fields with the same
//! id, so each logical attribute is classified exactly once with the
//! most-derived accessors.

pub mod accessor;
pub mod descriptor;
pub mod error;
pub mod ids;
pub mod object;
pub mod registry;

pub use accessor::{
    basic_access, collection_access, default_creator, guid_access, map_key_access, normalize_key,
    post_load, property_name, setter_name, single_access, CollectionAccess, MapKeyGet,
};
pub use descriptor::{
    FieldAccessors, FieldDescriptor, FieldKind, TypeDescriptor, TypeDescriptorBuilder,
};
pub use error::{ObjectError, ObjectResult};
pub use ids::{FieldId, Guid, TypeKey};
pub use object::{downcast_boxed, downcast_mut, downcast_ref, SyncObject};
pub use registry::TypeRegistry;
