//! Merge filters: per-field exclusions and per-type entity predicates.
//!
//! Filter keys are strongly typed `(TypeKey, FieldId)` pairs, and the whole
//! set is validated against the registry at startup so a filter referencing
//! an unknown type or field fails configuration before the first merge runs.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use stagesync_object::{FieldId, SyncObject, TypeKey, TypeRegistry};

use crate::error::{SyncError, SyncResult};

/// Predicate deciding whether a specific object is filtered out of merging.
pub type EntityPredicate = Arc<dyn Fn(&dyn SyncObject) -> bool + Send + Sync>;

/// The filters in force for one merge configuration.
///
/// A field-filtered attribute is skipped entirely. An entity-filtered
/// collection element is not deep-merged; its fresh target-side reference is
/// used instead.
#[derive(Clone, Default)]
pub struct MergeFilterSet {
    excluded_fields: HashSet<(TypeKey, FieldId)>,
    entity_filters: HashMap<TypeKey, EntityPredicate>,
}

impl MergeFilterSet {
    /// An empty filter set: everything is merged.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude one field from merging.
    pub fn exclude_field(&mut self, type_key: impl Into<TypeKey>, field: impl Into<FieldId>) {
        self.excluded_fields.insert((type_key.into(), field.into()));
    }

    /// Register an entity predicate for a type. An object for which the
    /// predicate returns `true` is filtered.
    pub fn filter_entities(
        &mut self,
        type_key: impl Into<TypeKey>,
        predicate: impl Fn(&dyn SyncObject) -> bool + Send + Sync + 'static,
    ) {
        self.entity_filters
            .insert(type_key.into(), Arc::new(predicate));
    }

    /// Check whether a field is excluded from merging.
    #[must_use]
    pub fn is_field_excluded(&self, type_key: &TypeKey, field: &FieldId) -> bool {
        self.excluded_fields
            .contains(&(type_key.clone(), field.clone()))
    }

    /// Check whether an object is entity-filtered.
    #[must_use]
    pub fn is_entity_filtered(&self, object: &dyn SyncObject) -> bool {
        self.entity_filters
            .get(&object.type_key())
            .is_some_and(|predicate| predicate(object))
    }

    /// Validate every filter key against the registry. Fails on the first
    /// unknown type or field.
    pub fn validate(&self, registry: &TypeRegistry) -> SyncResult<()> {
        for (type_key, field) in &self.excluded_fields {
            let descriptor = registry.descriptor(type_key).map_err(|_| {
                SyncError::configuration(format!(
                    "field filter references unknown type: {type_key}"
                ))
            })?;
            if !descriptor.has_field(field) {
                return Err(SyncError::configuration(format!(
                    "field filter references unknown field: {type_key}.{field}"
                )));
            }
        }
        for type_key in self.entity_filters.keys() {
            if !registry.contains(type_key) {
                return Err(SyncError::configuration(format!(
                    "entity filter references unknown type: {type_key}"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for MergeFilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<String> = self
            .excluded_fields
            .iter()
            .map(|(type_key, field)| format!("{type_key}.{field}"))
            .collect();
        fields.sort();
        let mut entities: Vec<&TypeKey> = self.entity_filters.keys().collect();
        entities.sort();
        f.debug_struct("MergeFilterSet")
            .field("excluded_fields", &fields)
            .field("entity_filters", &entities)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagesync_object::{
        basic_access, default_creator, impl_sync_object, TypeDescriptor,
    };

    #[derive(Debug, Clone, Default)]
    struct Price {
        amount: i64,
    }

    impl_sync_object!(Price, "test.price");

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        let tk = TypeKey::new("test.price");
        registry
            .register(
                TypeDescriptor::builder(tk.clone(), default_creator::<Price>())
                    .basic_field(
                        "amount",
                        basic_access::<Price, i64>(
                            &tk,
                            &FieldId::new("amount"),
                            |price| price.amount,
                            |price, value| price.amount = value,
                        ),
                    )
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_field_exclusion() {
        let mut filters = MergeFilterSet::new();
        filters.exclude_field("test.price", "amount");
        assert!(filters.is_field_excluded(&TypeKey::new("test.price"), &FieldId::new("amount")));
        assert!(!filters.is_field_excluded(&TypeKey::new("test.price"), &FieldId::new("currency")));
        filters.validate(&registry()).unwrap();
    }

    #[test]
    fn test_unknown_field_fails_validation() {
        let mut filters = MergeFilterSet::new();
        filters.exclude_field("test.price", "currency");
        let err = filters.validate(&registry()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("test.price.currency"));
    }

    #[test]
    fn test_unknown_type_fails_validation() {
        let mut filters = MergeFilterSet::new();
        filters.exclude_field("test.missing", "amount");
        assert!(filters.validate(&registry()).unwrap_err().is_configuration());

        let mut filters = MergeFilterSet::new();
        filters.filter_entities("test.missing", |_| true);
        assert!(filters.validate(&registry()).unwrap_err().is_configuration());
    }

    #[test]
    fn test_entity_predicate_dispatches_by_type() {
        let mut filters = MergeFilterSet::new();
        filters.filter_entities("test.price", |object| {
            object
                .as_any()
                .downcast_ref::<Price>()
                .is_some_and(|price| price.amount < 0)
        });
        assert!(filters.is_entity_filtered(&Price { amount: -1 }));
        assert!(!filters.is_entity_filtered(&Price { amount: 10 }));
    }
}
