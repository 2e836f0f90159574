//! Dependency-ordered sorting of batch entries.
//!
//! Upserts run before deletes. Within the upserts, parents come before
//! children (ascending type rank) so references resolve when an entry is
//! applied; within the deletes, children go before parents (descending type
//! rank) so nothing is removed while still referenced. Ties break on
//! ascending guid, which makes the order deterministic for any input
//! permutation.

use std::cmp::Ordering;
use std::collections::HashMap;

use stagesync_object::TypeKey;

use crate::job::descriptor::TransactionJobDescriptorEntry;

/// Type-rank table driving entry order.
///
/// A lower rank sorts earlier among upserts and later among deletes.
/// Unranked types sort after every ranked type.
#[derive(Debug, Clone, Default)]
pub struct DependencyOrdering {
    type_rank: HashMap<TypeKey, i32>,
}

impl DependencyOrdering {
    /// An empty ordering: guid order only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an ordering from ranked types, first listed ranked lowest.
    #[must_use]
    pub fn from_ranked(types: impl IntoIterator<Item = TypeKey>) -> Self {
        let type_rank = types
            .into_iter()
            .enumerate()
            .map(|(rank, type_key)| (type_key, rank as i32))
            .collect();
        Self { type_rank }
    }

    /// Assign a rank to a type.
    pub fn rank(&mut self, type_key: impl Into<TypeKey>, rank: i32) {
        self.type_rank.insert(type_key.into(), rank);
    }

    fn rank_of(&self, type_key: &TypeKey) -> i32 {
        self.type_rank.get(type_key).copied().unwrap_or(i32::MAX)
    }

    /// Sort a batch's entries into replay order.
    pub fn sort(&self, entries: &mut [TransactionJobDescriptorEntry]) {
        entries.sort_by(|a, b| self.compare(a, b));
    }

    fn compare(
        &self,
        a: &TransactionJobDescriptorEntry,
        b: &TransactionJobDescriptorEntry,
    ) -> Ordering {
        // Upserts before deletes.
        let phase = b.command.is_upsert().cmp(&a.command.is_upsert());
        if phase != Ordering::Equal {
            return phase;
        }
        let rank_a = self.rank_of(&a.type_key);
        let rank_b = self.rank_of(&b.type_key);
        let by_rank = if a.command.is_upsert() {
            rank_a.cmp(&rank_b)
        } else {
            rank_b.cmp(&rank_a)
        };
        by_rank.then_with(|| a.guid.cmp(&b.guid))
    }
}
