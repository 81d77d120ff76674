//! Keyed set reconciliation.
//!
//! Given two collections indexed by business code, work out which codes exist
//! only in the source (create), only in the target (delete), or in both
//! (candidates for update). Values are never inspected here.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

/// The three disjoint code sets produced by [`diff_keys`].
///
/// Sets are ordered so batches and log lines come out deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDiff<K: Ord> {
    /// `keys(source) - keys(target)`
    pub to_create: BTreeSet<K>,
    /// `keys(target) - keys(source)`
    pub to_delete: BTreeSet<K>,
    /// `keys(source) ∩ keys(target)`
    pub common: BTreeSet<K>,
}

impl<K: Ord> Default for KeyDiff<K> {
    fn default() -> Self {
        Self {
            to_create: BTreeSet::new(),
            to_delete: BTreeSet::new(),
            common: BTreeSet::new(),
        }
    }
}

/// Index `items` by `key`. A later item with a duplicate key replaces the earlier one.
pub fn index_by<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> HashMap<K, T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    items.into_iter().map(|item| (key(&item), item)).collect()
}

/// Diff the key sets of `source` and `target`.
///
/// Codes for which `exclude` returns `true` are ignored on both sides and never
/// show up in any output set.
pub fn diff_keys<K, S, T, F>(
    source: &HashMap<K, S>,
    target: &HashMap<K, T>,
    exclude: F,
) -> KeyDiff<K>
where
    K: Eq + Hash + Ord + Clone,
    F: Fn(&K) -> bool,
{
    let mut diff = KeyDiff::default();

    for key in source.keys().filter(|k| !exclude(k)) {
        if target.contains_key(key) {
            diff.common.insert(key.clone());
        } else {
            diff.to_create.insert(key.clone());
        }
    }
    for key in target.keys().filter(|k| !exclude(k)) {
        if !source.contains_key(key) {
            diff.to_delete.insert(key.clone());
        }
    }

    diff
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn keyed(keys: &[&'static str]) -> HashMap<&'static str, ()> {
        keys.iter().map(|k| (*k, ())).collect()
    }

    fn set(keys: &[&'static str]) -> BTreeSet<&'static str> {
        keys.iter().copied().collect()
    }

    #[test]
    fn splits_into_create_delete_common() {
        let diff = diff_keys(&keyed(&["A", "B", "C"]), &keyed(&["B", "C", "D"]), |_| false);
        assert_eq!(diff.to_create, set(&["A"]));
        assert_eq!(diff.to_delete, set(&["D"]));
        assert_eq!(diff.common, set(&["B", "C"]));
    }

    #[test]
    fn excluded_keys_never_appear() {
        let diff = diff_keys(&keyed(&["1", "2"]), &keyed(&["1", "3"]), |k| *k == "1");
        assert_eq!(diff.to_create, set(&["2"]));
        assert_eq!(diff.to_delete, set(&["3"]));
        assert!(diff.common.is_empty());

        let only_target = diff_keys(&keyed(&[]), &keyed(&["1"]), |k| *k == "1");
        assert_eq!(only_target, KeyDiff::default());
    }

    #[rstest]
    #[case(&[], &[])]
    #[case(&["A"], &[])]
    #[case(&[], &["A"])]
    #[case(&["A", "B"], &["A", "B"])]
    #[case(&["A", "B", "C", "D"], &["C", "D", "E", "F", "G"])]
    fn sets_partition_both_key_spaces(
        #[case] source: &[&'static str],
        #[case] target: &[&'static str],
    ) {
        let source = keyed(source);
        let target = keyed(target);
        let diff = diff_keys(&source, &target, |_| false);

        assert!(diff.to_create.is_disjoint(&diff.to_delete));
        assert!(diff.to_create.is_disjoint(&diff.common));
        assert!(diff.to_delete.is_disjoint(&diff.common));

        let source_keys: BTreeSet<_> = source.keys().copied().collect();
        let target_keys: BTreeSet<_> = target.keys().copied().collect();
        let created_or_common: BTreeSet<_> = diff.to_create.union(&diff.common).copied().collect();
        let deleted_or_common: BTreeSet<_> = diff.to_delete.union(&diff.common).copied().collect();
        assert_eq!(created_or_common, source_keys);
        assert_eq!(deleted_or_common, target_keys);
    }

    #[test]
    fn index_by_keeps_last_duplicate() {
        let index = index_by(vec![("A", 1), ("B", 2), ("A", 3)], |(k, _)| *k);
        assert_eq!(index.len(), 2);
        assert_eq!(index["A"], ("A", 3));
    }
}
