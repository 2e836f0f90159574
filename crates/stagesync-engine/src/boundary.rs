//! Merge boundary: the set of types at which graph recursion stops.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use stagesync_object::TypeKey;

/// Types whose associated objects are refreshed from the target instead of
/// deep-merged.
///
/// The boundary is read-only during a merge. Initializing it with the merge
/// root exempts the root type itself, so a merge rooted at a type listed in
/// its own boundary is still performed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeBoundary {
    stop_types: HashSet<TypeKey>,
    #[serde(skip)]
    root: Option<TypeKey>,
}

impl MergeBoundary {
    /// An empty boundary: every association is deep-merged.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a boundary from stop types.
    #[must_use]
    pub fn from_types(types: impl IntoIterator<Item = TypeKey>) -> Self {
        Self {
            stop_types: types.into_iter().collect(),
            root: None,
        }
    }

    /// Add a stop type.
    pub fn add(&mut self, type_key: TypeKey) {
        self.stop_types.insert(type_key);
    }

    /// Mark the merge root. Called once per engine invocation; the returned
    /// copy carries the exemption while the original stays untouched.
    #[must_use]
    pub fn initialize(&self, root: TypeKey) -> Self {
        Self {
            stop_types: self.stop_types.clone(),
            root: Some(root),
        }
    }

    /// Check whether recursion stops at `type_key`.
    #[must_use]
    pub fn stop_merging(&self, type_key: &TypeKey) -> bool {
        if self.root.as_ref() == Some(type_key) {
            return false;
        }
        self.stop_types.contains(type_key)
    }

    /// Check whether the boundary lists any stop types.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stop_types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_boundary_never_stops() {
        let boundary = MergeBoundary::new().initialize(TypeKey::new("catalog.product"));
        assert!(!boundary.stop_merging(&TypeKey::new("catalog.brand")));
    }

    #[test]
    fn test_listed_type_stops() {
        let boundary = MergeBoundary::from_types([TypeKey::new("catalog.brand")])
            .initialize(TypeKey::new("catalog.product"));
        assert!(boundary.stop_merging(&TypeKey::new("catalog.brand")));
        assert!(!boundary.stop_merging(&TypeKey::new("catalog.sku")));
    }

    #[test]
    fn test_root_type_is_exempt() {
        let boundary = MergeBoundary::from_types([TypeKey::new("catalog.product")])
            .initialize(TypeKey::new("catalog.product"));
        assert!(!boundary.stop_merging(&TypeKey::new("catalog.product")));
    }
}
