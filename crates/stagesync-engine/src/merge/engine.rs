//! The merge engine: copies a source object graph onto its target
//! counterpart through registered accessors.
//!
//! One invocation of [`MergeEngine::process_merge`] walks the source graph
//! once, in registration order: basic attributes, then single-valued
//! associations, then collection-valued associations, then post-load hooks.
//! The walk mutates the target only; the source is never touched. Scope is
//! controlled entirely by the injected [`MergeConfig`]: the boundary stops
//! recursion at listed types, field filters skip attributes, entity filters
//! replace elements with fresh target-side references.
//!
//! Repeated references are tracked with a per-invocation trace of visited
//! `(type, guid)` pairs. An association reaching an already-visited object is
//! not deep-merged in place again: the located target-side copy is assigned
//! when one exists, and otherwise an instance is created and the revisited
//! source subtree is merged onto it, so an entity reachable through several
//! associations converges whether or not the target held it before the run.
//! Source graphs are owned values, so the recursion is over a finite tree
//! and always terminates.

use std::cell::Cell;
use std::collections::HashSet;

use tracing::{debug, instrument};

use stagesync_object::{
    normalize_key, CollectionAccess, FieldAccessors, Guid, MapKeyGet, SyncObject, TypeKey,
    TypeRegistry,
};

use crate::boundary::MergeBoundary;
use crate::config::MergeConfig;
use crate::env::EntityLocator;
use crate::error::{SyncError, SyncResult};
use crate::types::DuplicateKeyPolicy;

/// Visited objects of the current invocation.
#[derive(Debug, Default)]
struct MergeTrace {
    visited: HashSet<(TypeKey, Guid)>,
}

impl MergeTrace {
    fn mark(&mut self, type_key: TypeKey, guid: Guid) -> bool {
        self.visited.insert((type_key, guid))
    }

    fn seen(&self, type_key: &TypeKey, guid: &Guid) -> bool {
        self.visited.contains(&(type_key.clone(), guid.clone()))
    }
}

/// Merges source object graphs onto target counterparts.
pub struct MergeEngine<'a> {
    registry: &'a TypeRegistry,
    locator: &'a dyn EntityLocator,
    config: &'a MergeConfig,
}

impl<'a> MergeEngine<'a> {
    /// Create an engine over a registry, a target-side locator, and a merge
    /// configuration.
    #[must_use]
    pub fn new(
        registry: &'a TypeRegistry,
        locator: &'a dyn EntityLocator,
        config: &'a MergeConfig,
    ) -> Self {
        Self {
            registry,
            locator,
            config,
        }
    }

    /// Merge the source graph rooted at `source` onto `target`.
    ///
    /// Source and target must be counterparts of the same registered type.
    #[instrument(skip_all, fields(type_key = %source.type_key()))]
    pub fn process_merge(
        &self,
        source: &dyn SyncObject,
        target: &mut dyn SyncObject,
    ) -> SyncResult<()> {
        let root = source.type_key();
        if root != target.type_key() {
            return Err(SyncError::configuration(format!(
                "merge inputs differ in type: source {root}, target {}",
                target.type_key()
            )));
        }
        let boundary = self.config.boundary.initialize(root);
        let mut trace = MergeTrace::default();
        self.merge_object(source, target, &boundary, &mut trace)
    }

    fn merge_object(
        &self,
        source: &dyn SyncObject,
        target: &mut dyn SyncObject,
        boundary: &MergeBoundary,
        trace: &mut MergeTrace,
    ) -> SyncResult<()> {
        let type_key = source.type_key();
        let descriptor = self.registry.descriptor(&type_key)?;

        if self.registry.can_qualify_by_guid(&type_key) {
            let guid = self.registry.guid_of(source)?;
            debug!(%type_key, %guid, "merging object");
            trace.mark(type_key.clone(), guid);
        }

        for field in descriptor.fields() {
            if self.config.filters.is_field_excluded(&type_key, field.id()) {
                continue;
            }
            match field.accessors() {
                FieldAccessors::Basic { get, set } => {
                    let value = get(source)?;
                    set(target, value)?;
                }
                FieldAccessors::Single {
                    get,
                    get_mut,
                    set,
                    target: assoc_type,
                } => {
                    match get(source)? {
                        None => set(target, None)?,
                        Some(child) => {
                            let child_guid = self.registry.guid_of(child)?;
                            if boundary.stop_merging(assoc_type) {
                                let fresh = self.fresh_reference(assoc_type, &child_guid)?;
                                set(target, Some(fresh))?;
                                continue;
                            }
                            if trace.seen(assoc_type, &child_guid) {
                                let reference = self.revisited_reference(
                                    assoc_type,
                                    &child_guid,
                                    child,
                                    boundary,
                                    trace,
                                )?;
                                set(target, Some(reference))?;
                                continue;
                            }
                            let existing_guid = match get(&*target)? {
                                Some(counterpart) => {
                                    Some(self.registry.guid_of(counterpart)?)
                                }
                                None => None,
                            };
                            if existing_guid.as_ref() == Some(&child_guid) {
                                if let Some(counterpart) = get_mut(target)? {
                                    self.merge_object(child, counterpart, boundary, trace)?;
                                }
                            } else {
                                let mut replacement = self.registry.create(assoc_type)?;
                                self.merge_object(
                                    child,
                                    replacement.as_mut(),
                                    boundary,
                                    trace,
                                )?;
                                set(target, Some(replacement))?;
                            }
                        }
                    }
                }
                FieldAccessors::Collection {
                    access,
                    element,
                    map_key,
                } => {
                    self.merge_collection(
                        source,
                        target,
                        access,
                        element,
                        map_key.as_ref(),
                        boundary,
                        trace,
                    )?;
                }
            }
        }

        for (_, hook) in descriptor.post_load_hooks() {
            hook(target)?;
        }

        Ok(())
    }

    /// Converge a collection association: merge matched elements in place,
    /// create and insert unmatched ones, drop target-only ones.
    #[allow(clippy::too_many_arguments)]
    fn merge_collection(
        &self,
        source: &dyn SyncObject,
        target: &mut dyn SyncObject,
        access: &CollectionAccess,
        element_type: &TypeKey,
        map_key: Option<&MapKeyGet>,
        boundary: &MergeBoundary,
        trace: &mut MergeTrace,
    ) -> SyncResult<()> {
        // Source pass: keys in order, with duplicates resolved by policy.
        let source_elements = (access.elements)(source)?;
        let mut source_keys: Vec<String> = Vec::with_capacity(source_elements.len());
        let mut kept_source: Vec<usize> = Vec::with_capacity(source_elements.len());
        {
            let mut seen = HashSet::new();
            for (index, element) in source_elements.iter().enumerate() {
                let key = self.element_key(map_key, *element)?;
                if !seen.insert(key.clone()) {
                    match self.config.duplicate_keys {
                        DuplicateKeyPolicy::FirstWins => {
                            debug!(%element_type, key, "skipping duplicate collection key");
                            source_keys.push(key);
                            continue;
                        }
                        DuplicateKeyPolicy::Fail => {
                            let guid = match self.registry.guid_of(*element) {
                                Ok(guid) => guid,
                                Err(_) => Guid::new(key.clone()),
                            };
                            return Err(SyncError::identity(
                                element_type.clone(),
                                guid,
                                format!("duplicate collection key: {key}"),
                            ));
                        }
                    }
                }
                source_keys.push(key);
                kept_source.push(index);
            }
        }

        if boundary.stop_merging(element_type) {
            // The whole collection is refreshed from target-side references.
            let mut fresh: Vec<Box<dyn SyncObject>> = Vec::with_capacity(kept_source.len());
            for &index in &kept_source {
                let guid = self.registry.guid_of(source_elements[index])?;
                fresh.push(self.fresh_reference(element_type, &guid)?);
            }
            drop(source_elements);
            (access.retain)(target, &|_| false)?;
            for reference in fresh {
                (access.insert)(target, reference)?;
            }
            return Ok(());
        }

        // Match source elements to target elements by key, claiming each
        // target position at most once.
        let target_keys: Vec<String> = {
            let elements = (access.elements)(&*target)?;
            let mut keys = Vec::with_capacity(elements.len());
            for element in elements {
                keys.push(self.element_key(map_key, element)?);
            }
            keys
        };
        let mut kept_target = vec![false; target_keys.len()];
        let mut pending: Vec<Box<dyn SyncObject>> = Vec::new();

        for &index in &kept_source {
            let element = source_elements[index];
            let key = &source_keys[index];

            let guid = self.registry.guid_of(element).ok();
            if let Some(guid) = guid.as_ref().filter(|guid| trace.seen(element_type, guid)) {
                pending.push(self.revisited_reference(
                    element_type,
                    guid,
                    element,
                    boundary,
                    trace,
                )?);
                continue;
            }
            if self.config.filters.is_entity_filtered(element) {
                let guid = match guid {
                    Some(guid) => guid,
                    None => self.registry.guid_of(element)?,
                };
                pending.push(self.fresh_reference(element_type, &guid)?);
                continue;
            }

            let matched = target_keys
                .iter()
                .enumerate()
                .position(|(position, target_key)| {
                    target_key == key && !kept_target[position]
                });
            match matched {
                Some(position) => {
                    kept_target[position] = true;
                    let mut elements = (access.elements_mut)(target)?;
                    let counterpart = elements.swap_remove(position);
                    self.merge_object(element, counterpart, boundary, trace)?;
                }
                None => {
                    let mut created = self.registry.create(element_type)?;
                    self.merge_object(element, created.as_mut(), boundary, trace)?;
                    pending.push(created);
                }
            }
        }
        drop(source_elements);

        // Retain visits elements in collection order, so a position counter
        // maps each element back to its precomputed keep decision.
        let cursor = Cell::new(0usize);
        (access.retain)(target, &|_| {
            let position = cursor.get();
            cursor.set(position + 1);
            kept_target.get(position).copied().unwrap_or(false)
        })?;
        for element in pending {
            (access.insert)(target, element)?;
        }

        Ok(())
    }

    /// Derive an element's logical key: the normalized map-key value when the
    /// collection registers one, the element guid otherwise.
    fn element_key(
        &self,
        map_key: Option<&MapKeyGet>,
        element: &dyn SyncObject,
    ) -> SyncResult<String> {
        match map_key {
            Some(extract) => Ok(normalize_key(extract(element)?).to_string()),
            None => Ok(self.registry.guid_of(element)?.as_str().to_string()),
        }
    }

    /// Locate the target-side reference for an object that is not merged
    /// into. Its absence is an identity error.
    fn fresh_reference(
        &self,
        type_key: &TypeKey,
        guid: &Guid,
    ) -> SyncResult<Box<dyn SyncObject>> {
        self.locator.locate(type_key, guid)?.ok_or_else(|| {
            SyncError::identity(
                type_key.clone(),
                guid.clone(),
                "no target-side reference to refresh from",
            )
        })
    }

    /// Resolve a reference to an object already merged earlier in this
    /// invocation (the same entity reachable through more than one
    /// association). The located target-side copy is preferred; when the
    /// target has none yet because the object is being added in this same
    /// run, an instance is created and the revisited source subtree is
    /// merged onto it, converging to the same graph.
    fn revisited_reference(
        &self,
        type_key: &TypeKey,
        guid: &Guid,
        source: &dyn SyncObject,
        boundary: &MergeBoundary,
        trace: &mut MergeTrace,
    ) -> SyncResult<Box<dyn SyncObject>> {
        if let Some(existing) = self.locator.locate(type_key, guid)? {
            return Ok(existing);
        }
        debug!(%type_key, %guid, "revisited reference absent from target, merging new instance");
        let mut created = self.registry.create(type_key)?;
        self.merge_object(source, created.as_mut(), boundary, trace)?;
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::InMemoryEnvironment;
    use crate::filter::MergeFilterSet;
    use stagesync_object::{
        basic_access, collection_access, default_creator, guid_access, impl_sync_object,
        single_access, FieldId, TypeDescriptor,
    };

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Tag {
        guid: String,
        label: String,
    }

    impl_sync_object!(Tag, "test.tag");

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Article {
        guid: String,
        title: String,
        tags: Vec<Tag>,
    }

    impl_sync_object!(Article, "test.article");

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Pair {
        guid: String,
        main: Option<Tag>,
        backup: Option<Tag>,
        tags: Vec<Tag>,
    }

    impl_sync_object!(Pair, "test.pair");

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        let tag = TypeKey::new("test.tag");
        registry
            .register(
                TypeDescriptor::builder(tag.clone(), default_creator::<Tag>())
                    .guid(guid_access::<Tag>(&tag, |t| Guid::new(t.guid.clone())))
                    .basic_field(
                        "guid",
                        basic_access::<Tag, String>(
                            &tag,
                            &FieldId::new("guid"),
                            |t| t.guid.clone(),
                            |t, v| t.guid = v,
                        ),
                    )
                    .basic_field(
                        "label",
                        basic_access::<Tag, String>(
                            &tag,
                            &FieldId::new("label"),
                            |t| t.label.clone(),
                            |t, v| t.label = v,
                        ),
                    )
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let article = TypeKey::new("test.article");
        registry
            .register(
                TypeDescriptor::builder(article.clone(), default_creator::<Article>())
                    .guid(guid_access::<Article>(&article, |a| Guid::new(a.guid.clone())))
                    .basic_field(
                        "guid",
                        basic_access::<Article, String>(
                            &article,
                            &FieldId::new("guid"),
                            |a| a.guid.clone(),
                            |a, v| a.guid = v,
                        ),
                    )
                    .basic_field(
                        "title",
                        basic_access::<Article, String>(
                            &article,
                            &FieldId::new("title"),
                            |a| a.title.clone(),
                            |a, v| a.title = v,
                        ),
                    )
                    .collection_field(
                        "tags",
                        tag,
                        collection_access::<Article, Tag>(
                            &article,
                            &FieldId::new("tags"),
                            |a| &a.tags,
                            |a| &mut a.tags,
                        ),
                        None,
                    )
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let pair = TypeKey::new("test.pair");
        let tag = TypeKey::new("test.tag");
        registry
            .register(
                TypeDescriptor::builder(pair.clone(), default_creator::<Pair>())
                    .guid(guid_access::<Pair>(&pair, |p| Guid::new(p.guid.clone())))
                    .basic_field(
                        "guid",
                        basic_access::<Pair, String>(
                            &pair,
                            &FieldId::new("guid"),
                            |p| p.guid.clone(),
                            |p, v| p.guid = v,
                        ),
                    )
                    .single_field(
                        "main",
                        tag.clone(),
                        single_access::<Pair, Tag>(
                            &pair,
                            &FieldId::new("main"),
                            |p| p.main.as_ref(),
                            |p| p.main.as_mut(),
                            |p, v| p.main = v,
                        ),
                    )
                    .single_field(
                        "backup",
                        tag.clone(),
                        single_access::<Pair, Tag>(
                            &pair,
                            &FieldId::new("backup"),
                            |p| p.backup.as_ref(),
                            |p| p.backup.as_mut(),
                            |p, v| p.backup = v,
                        ),
                    )
                    .collection_field(
                        "tags",
                        tag,
                        collection_access::<Pair, Tag>(
                            &pair,
                            &FieldId::new("tags"),
                            |p| &p.tags,
                            |p| &mut p.tags,
                        ),
                        None,
                    )
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
    }

    fn tag(guid: &str, label: &str) -> Tag {
        Tag {
            guid: guid.into(),
            label: label.into(),
        }
    }

    #[test]
    fn test_mismatched_types_rejected() {
        let registry = registry();
        let env = InMemoryEnvironment::new();
        let config = MergeConfig::new();
        let engine = MergeEngine::new(&registry, &env, &config);

        let source = tag("T-1", "news");
        let mut target = Article::default();
        let err = engine.process_merge(&source, &mut target).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_collection_converges_to_source() {
        let registry = registry();
        let env = InMemoryEnvironment::new();
        let config = MergeConfig::new();
        let engine = MergeEngine::new(&registry, &env, &config);

        let source = Article {
            guid: "A-1".into(),
            title: "fresh".into(),
            tags: vec![tag("T-a", "alpha"), tag("T-b", "beta"), tag("T-c", "gamma")],
        };
        let mut target = Article {
            guid: "A-1".into(),
            title: "stale".into(),
            tags: vec![tag("T-b", "old-beta"), tag("T-c", "old-gamma"), tag("T-d", "delta")],
        };

        engine.process_merge(&source, &mut target).unwrap();

        assert_eq!(target.title, "fresh");
        let guids: Vec<&str> = target.tags.iter().map(|t| t.guid.as_str()).collect();
        assert_eq!(guids, vec!["T-b", "T-c", "T-a"]);
        assert!(target.tags.iter().all(|t| !t.label.starts_with("old")));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let registry = registry();
        let env = InMemoryEnvironment::new();
        let config = MergeConfig::new();
        let engine = MergeEngine::new(&registry, &env, &config);

        let source = Article {
            guid: "A-1".into(),
            title: "t".into(),
            tags: vec![tag("T-a", "alpha")],
        };
        let mut target = Article {
            guid: "A-1".into(),
            ..Article::default()
        };

        engine.process_merge(&source, &mut target).unwrap();
        let after_first = target.clone();
        engine.process_merge(&source, &mut target).unwrap();
        assert_eq!(target, after_first);
    }

    #[test]
    fn test_boundary_refreshes_from_target_references() {
        let registry = registry();
        let mut env = InMemoryEnvironment::new();
        env.put("test.tag", "T-a", Box::new(tag("T-a", "target-alpha")));

        let config = MergeConfig::new()
            .with_boundary(MergeBoundary::from_types([TypeKey::new("test.tag")]));
        let engine = MergeEngine::new(&registry, &env, &config);

        let source = Article {
            guid: "A-1".into(),
            title: "t".into(),
            tags: vec![tag("T-a", "source-alpha")],
        };
        let mut target = Article {
            guid: "A-1".into(),
            ..Article::default()
        };

        engine.process_merge(&source, &mut target).unwrap();
        assert_eq!(target.tags.len(), 1);
        // The boundary-stopped element is the located reference, not a copy
        // of the source element.
        assert_eq!(target.tags[0].label, "target-alpha");
    }

    #[test]
    fn test_boundary_missing_reference_is_identity_error() {
        let registry = registry();
        let env = InMemoryEnvironment::new();
        let config = MergeConfig::new()
            .with_boundary(MergeBoundary::from_types([TypeKey::new("test.tag")]));
        let engine = MergeEngine::new(&registry, &env, &config);

        let source = Article {
            guid: "A-1".into(),
            title: "t".into(),
            tags: vec![tag("T-a", "alpha")],
        };
        let mut target = Article {
            guid: "A-1".into(),
            ..Article::default()
        };

        let err = engine.process_merge(&source, &mut target).unwrap_err();
        assert!(err.is_identity());
    }

    #[test]
    fn test_duplicate_keys_first_wins() {
        let registry = registry();
        let env = InMemoryEnvironment::new();
        let config = MergeConfig::new();
        let engine = MergeEngine::new(&registry, &env, &config);

        let source = Article {
            guid: "A-1".into(),
            title: "t".into(),
            tags: vec![tag("T-a", "first"), tag("T-a", "second")],
        };
        let mut target = Article {
            guid: "A-1".into(),
            ..Article::default()
        };

        engine.process_merge(&source, &mut target).unwrap();
        assert_eq!(target.tags.len(), 1);
        assert_eq!(target.tags[0].label, "first");
    }

    #[test]
    fn test_duplicate_keys_fail_policy() {
        let registry = registry();
        let env = InMemoryEnvironment::new();
        let config = MergeConfig::new().with_duplicate_keys(DuplicateKeyPolicy::Fail);
        let engine = MergeEngine::new(&registry, &env, &config);

        let source = Article {
            guid: "A-1".into(),
            title: "t".into(),
            tags: vec![tag("T-a", "first"), tag("T-a", "second")],
        };
        let mut target = Article {
            guid: "A-1".into(),
            ..Article::default()
        };

        let err = engine.process_merge(&source, &mut target).unwrap_err();
        assert!(err.is_identity());
        assert!(err.to_string().contains("duplicate collection key"));
    }

    #[test]
    fn test_field_filter_skips_attribute() {
        let registry = registry();
        let env = InMemoryEnvironment::new();
        let mut filters = MergeFilterSet::new();
        filters.exclude_field("test.article", "title");
        let config = MergeConfig::new().with_filters(filters);
        let engine = MergeEngine::new(&registry, &env, &config);

        let source = Article {
            guid: "A-1".into(),
            title: "fresh".into(),
            tags: Vec::new(),
        };
        let mut target = Article {
            guid: "A-1".into(),
            title: "stale".into(),
            tags: Vec::new(),
        };

        engine.process_merge(&source, &mut target).unwrap();
        assert_eq!(target.title, "stale");
    }

    #[test]
    fn test_shared_reference_merges_on_add() {
        let registry = registry();
        let env = InMemoryEnvironment::new();
        let config = MergeConfig::new();
        let engine = MergeEngine::new(&registry, &env, &config);

        // The same tag reachable through two associations and a collection,
        // with no target-side copy yet: every slot converges to the source
        // state instead of failing the lookup.
        let source = Pair {
            guid: "PR-1".into(),
            main: Some(tag("T-1", "shared")),
            backup: Some(tag("T-1", "shared")),
            tags: vec![tag("T-1", "shared")],
        };
        let mut target = Pair {
            guid: "PR-1".into(),
            ..Pair::default()
        };

        engine.process_merge(&source, &mut target).unwrap();

        assert_eq!(target.main.as_ref().map(|t| t.label.as_str()), Some("shared"));
        assert_eq!(target.backup.as_ref().map(|t| t.label.as_str()), Some("shared"));
        assert_eq!(target.tags.len(), 1);
        assert_eq!(target.tags[0], tag("T-1", "shared"));
    }

    #[test]
    fn test_shared_reference_prefers_target_copy() {
        let registry = registry();
        let mut env = InMemoryEnvironment::new();
        env.put("test.tag", "T-1", Box::new(tag("T-1", "located")));
        let config = MergeConfig::new();
        let engine = MergeEngine::new(&registry, &env, &config);

        let source = Pair {
            guid: "PR-1".into(),
            main: Some(tag("T-1", "shared")),
            backup: Some(tag("T-1", "shared")),
            tags: Vec::new(),
        };
        let mut target = Pair {
            guid: "PR-1".into(),
            ..Pair::default()
        };

        engine.process_merge(&source, &mut target).unwrap();

        // First visit deep-merges; the revisit assigns the located
        // target-side reference.
        assert_eq!(target.main.as_ref().map(|t| t.label.as_str()), Some("shared"));
        assert_eq!(target.backup.as_ref().map(|t| t.label.as_str()), Some("located"));
    }
}
