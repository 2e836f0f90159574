//! Per-type capability descriptors.
//!
//! A [`TypeDescriptor`] is the compile-time-registered classification of one
//! concrete type's persistent state: its basic attributes, single-valued and
//! collection-valued associations, guid extractor, creator, and post-load
//! hooks. Building a descriptor with [`TypeDescriptorBuilder::extends`]
//! performs override resolution: fields registered at a more-derived level
//! shadow same-named fields inherited from the parent chain, so each logical
//! attribute appears exactly once with the most-derived accessors.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::accessor::{
    BasicGet, BasicSet, CollectionAccess, Creator, GuidGet, MapKeyGet, PostLoad, SingleGet,
    SingleGetMut, SingleSet,
};
use crate::accessor::{property_name, setter_name};
use crate::error::{ObjectError, ObjectResult};
use crate::ids::{FieldId, TypeKey};

/// Classification of a persistent field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Directly copyable scalar or value attribute.
    Basic,
    /// Reference to one related domain object.
    SingleAssociation,
    /// Collection of related domain objects.
    CollectionAssociation,
}

impl FieldKind {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Basic => "basic",
            FieldKind::SingleAssociation => "single_association",
            FieldKind::CollectionAssociation => "collection_association",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The erased accessors registered for one field.
#[derive(Clone)]
pub enum FieldAccessors {
    /// Basic attribute getter/setter pair.
    Basic {
        /// Read the value from an object.
        get: BasicGet,
        /// Write the value onto an object.
        set: BasicSet,
    },
    /// Single-valued association accessors.
    Single {
        /// Borrow the related object.
        get: SingleGet,
        /// Mutably borrow the related object.
        get_mut: SingleGetMut,
        /// Replace the related object.
        set: SingleSet,
        /// Registered type of the related object.
        target: TypeKey,
    },
    /// Collection-valued association accessors.
    Collection {
        /// Element access.
        access: CollectionAccess,
        /// Registered type of the elements.
        element: TypeKey,
        /// Optional logical-key extractor; element guid is used when absent.
        map_key: Option<MapKeyGet>,
    },
}

/// One field of a type's persistent state.
#[derive(Clone)]
pub struct FieldDescriptor {
    id: FieldId,
    accessors: FieldAccessors,
}

impl FieldDescriptor {
    /// The field's logical id.
    #[must_use]
    pub fn id(&self) -> &FieldId {
        &self.id
    }

    /// The field's classification.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self.accessors {
            FieldAccessors::Basic { .. } => FieldKind::Basic,
            FieldAccessors::Single { .. } => FieldKind::SingleAssociation,
            FieldAccessors::Collection { .. } => FieldKind::CollectionAssociation,
        }
    }

    /// The field's accessors.
    #[must_use]
    pub fn accessors(&self) -> &FieldAccessors {
        &self.accessors
    }
}

// Closure-holding types cannot derive Debug; render id and kind only.
impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .finish()
    }
}

/// The complete capability classification of one registered type.
#[derive(Clone)]
pub struct TypeDescriptor {
    type_key: TypeKey,
    parent: Option<TypeKey>,
    fields: Vec<FieldDescriptor>,
    guid: Option<GuidGet>,
    creator: Creator,
    post_load: Vec<(String, PostLoad)>,
}

impl TypeDescriptor {
    /// Start building a descriptor for `type_key` with the given creator.
    pub fn builder(type_key: TypeKey, creator: Creator) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder::new(type_key, creator)
    }

    /// The described type.
    #[must_use]
    pub fn type_key(&self) -> &TypeKey {
        &self.type_key
    }

    /// The parent type, when this descriptor extends another.
    #[must_use]
    pub fn parent(&self) -> Option<&TypeKey> {
        self.parent.as_ref()
    }

    /// All fields in declaration order, most-derived first.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up one field.
    pub fn field(&self, id: &FieldId) -> ObjectResult<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|field| field.id() == id)
            .ok_or_else(|| ObjectError::unknown_field(self.type_key.clone(), id.clone()))
    }

    /// Check whether the type declares a field.
    #[must_use]
    pub fn has_field(&self, id: &FieldId) -> bool {
        self.fields.iter().any(|field| field.id() == id)
    }

    /// The guid extractor, when the type can be qualified by guid.
    #[must_use]
    pub fn guid_accessor(&self) -> Option<&GuidGet> {
        self.guid.as_ref()
    }

    /// The blank-instance factory.
    #[must_use]
    pub fn creator(&self) -> &Creator {
        &self.creator
    }

    /// Post-load hooks in declaration order.
    #[must_use]
    pub fn post_load_hooks(&self) -> &[(String, PostLoad)] {
        &self.post_load
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_key", &self.type_key)
            .field("parent", &self.parent)
            .field("fields", &self.fields)
            .field("post_load", &self.post_load.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .finish()
    }
}

/// Declaration-order builder for [`TypeDescriptor`].
pub struct TypeDescriptorBuilder {
    type_key: TypeKey,
    parent: Option<TypeKey>,
    fields: Vec<FieldDescriptor>,
    guid: Option<GuidGet>,
    creator: Creator,
    post_load: Vec<(String, PostLoad)>,
    error: Option<ObjectError>,
}

impl TypeDescriptorBuilder {
    fn new(type_key: TypeKey, creator: Creator) -> Self {
        Self {
            type_key,
            parent: None,
            fields: Vec::new(),
            guid: None,
            creator,
            post_load: Vec::new(),
            error: None,
        }
    }

    fn push_field(&mut self, id: FieldId, accessors: FieldAccessors) {
        if self.fields.iter().any(|field| field.id() == &id) {
            if self.error.is_none() {
                self.error = Some(ObjectError::DuplicateField {
                    type_key: self.type_key.clone(),
                    field: id,
                });
            }
            return;
        }
        self.fields.push(FieldDescriptor { id, accessors });
    }

    /// Register a basic attribute.
    pub fn basic_field(mut self, id: impl Into<FieldId>, access: (BasicGet, BasicSet)) -> Self {
        let (get, set) = access;
        self.push_field(id.into(), FieldAccessors::Basic { get, set });
        self
    }

    /// Register a basic attribute from bean-style accessor metadata.
    ///
    /// The field id is derived from the getter name (`getCode` -> `code`).
    /// A getter name matching no naming convention has no conventional
    /// setter and fails descriptor construction, since an attribute with a
    /// getter but no setter cannot be merged.
    pub fn bean_basic_field(mut self, getter: &str, access: (BasicGet, BasicSet)) -> Self {
        if setter_name(getter) == getter {
            if self.error.is_none() {
                self.error = Some(ObjectError::MissingSetter {
                    type_key: self.type_key.clone(),
                    accessor: getter.to_string(),
                });
            }
            return self;
        }
        let id = FieldId::new(property_name(getter));
        let (get, set) = access;
        self.push_field(id, FieldAccessors::Basic { get, set });
        self
    }

    /// Register a single-valued association to `target`.
    pub fn single_field(
        mut self,
        id: impl Into<FieldId>,
        target: TypeKey,
        access: (SingleGet, SingleGetMut, SingleSet),
    ) -> Self {
        let (get, get_mut, set) = access;
        self.push_field(
            id.into(),
            FieldAccessors::Single {
                get,
                get_mut,
                set,
                target,
            },
        );
        self
    }

    /// Register a collection-valued association with elements of `element`.
    pub fn collection_field(
        mut self,
        id: impl Into<FieldId>,
        element: TypeKey,
        access: CollectionAccess,
        map_key: Option<MapKeyGet>,
    ) -> Self {
        self.push_field(
            id.into(),
            FieldAccessors::Collection {
                access,
                element,
                map_key,
            },
        );
        self
    }

    /// Register the guid extractor.
    pub fn guid(mut self, get: GuidGet) -> Self {
        self.guid = Some(get);
        self
    }

    /// Register a post-load hook. Hooks run in declaration order after all
    /// attributes have been copied.
    pub fn post_load(mut self, name: impl Into<String>, hook: PostLoad) -> Self {
        self.post_load.push((name.into(), hook));
        self
    }

    /// Inherit fields and hooks from a parent descriptor.
    ///
    /// Walks the already-resolved parent (which carries its own ancestors)
    /// and appends only entries whose id has not been registered at a more
    /// derived level: first-seen wins, so an override contributes exactly
    /// one entry per logical attribute.
    pub fn extends(mut self, parent: &TypeDescriptor) -> Self {
        self.parent = Some(parent.type_key().clone());
        let declared: HashSet<FieldId> = self.fields.iter().map(|field| field.id().clone()).collect();
        for field in parent.fields() {
            if !declared.contains(field.id()) {
                self.fields.push(field.clone());
            }
        }
        let hook_names: HashSet<&str> = self
            .post_load
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        let inherited: Vec<(String, PostLoad)> = parent
            .post_load_hooks()
            .iter()
            .filter(|(name, _)| !hook_names.contains(name.as_str()))
            .cloned()
            .collect();
        self.post_load.extend(inherited);
        if self.guid.is_none() {
            self.guid = parent.guid_accessor().cloned();
        }
        self
    }

    /// Finish the descriptor, surfacing any deferred configuration error.
    pub fn build(self) -> ObjectResult<TypeDescriptor> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(TypeDescriptor {
            type_key: self.type_key,
            parent: self.parent,
            fields: self.fields,
            guid: self.guid,
            creator: self.creator,
            post_load: self.post_load,
        })
    }
}
