//! Local mirror of a remotely ordered collection.
//!
//! A [`LiveCollection`] consumes the add/modify/remove feed of a store
//! subscription and keeps both an id lookup and the display order declared by
//! the collection (username order for the directory, timestamp order for a
//! message log, recency for the inbox).

use std::{
    collections::{BTreeSet, HashMap},
    fmt::Debug,
    hash::Hash,
};

/// A document that can be mirrored by a [`LiveCollection`].
pub trait LiveDocument: Clone {
    type Key: Clone + Debug + Eq + Hash + Ord;
    type SortKey: Clone + Debug + Ord;

    fn key(&self) -> &Self::Key;

    /// Position key in the collection's declared order.
    fn sort_key(&self) -> Self::SortKey;
}

/// One entry of a live-change feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<T: LiveDocument> {
    Added(T),
    Modified(T),
    Removed(T::Key),
}

impl<T: LiveDocument> Change<T> {
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::Modified(_) => "modified",
            Self::Removed(_) => "removed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LiveCollection<T: LiveDocument> {
    by_key: HashMap<T::Key, T>,
    order: BTreeSet<(T::SortKey, T::Key)>,
}

impl<T: LiveDocument> Default for LiveCollection<T> {
    fn default() -> Self {
        Self {
            by_key: HashMap::new(),
            order: BTreeSet::new(),
        }
    }
}

impl<T: LiveDocument> LiveCollection<T> {
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.by_key.get(key)
    }

    /// Iterates documents in the collection's declared order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.order
            .iter()
            .filter_map(|(_, key)| self.by_key.get(key))
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.by_key.clear();
        self.order.clear();
    }

    /// Applies one change and reports whether local state moved.
    ///
    /// A repeated `Added` is handled as `Modified`, a `Modified` for an unknown
    /// key is handled as an insert, and removing an unknown key is a no-op.
    pub fn apply(&mut self, change: Change<T>) -> bool {
        match change {
            Change::Added(doc) | Change::Modified(doc) => self.upsert(doc),
            Change::Removed(key) => self.remove(&key),
        }
    }

    pub fn apply_all(&mut self, changes: impl IntoIterator<Item = Change<T>>) -> usize {
        changes
            .into_iter()
            .map(|change| self.apply(change))
            .filter(|changed| *changed)
            .count()
    }

    fn upsert(&mut self, doc: T) -> bool {
        let key = doc.key().clone();
        let sort_key = doc.sort_key();

        if let Some(previous) = self.by_key.get(&key) {
            let previous_sort_key = previous.sort_key();
            if previous_sort_key != sort_key {
                self.order.remove(&(previous_sort_key, key.clone()));
                self.order.insert((sort_key, key.clone()));
            }
        } else {
            self.order.insert((sort_key, key.clone()));
        }

        self.by_key.insert(key, doc);
        true
    }

    fn remove(&mut self, key: &T::Key) -> bool {
        let Some(previous) = self.by_key.remove(key) else {
            return false;
        };

        self.order.remove(&(previous.sort_key(), key.clone()));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Doc {
        id: &'static str,
        rank: u32,
        body: &'static str,
    }

    impl LiveDocument for Doc {
        type Key = &'static str;
        type SortKey = u32;

        fn key(&self) -> &Self::Key {
            &self.id
        }

        fn sort_key(&self) -> Self::SortKey {
            self.rank
        }
    }

    fn doc(id: &'static str, rank: u32, body: &'static str) -> Doc {
        Doc { id, rank, body }
    }

    fn ids(collection: &LiveCollection<Doc>) -> Vec<&'static str> {
        collection.iter().map(|doc| doc.id).collect()
    }

    #[test]
    fn inserts_by_sort_key_not_arrival_order() {
        let mut collection = LiveCollection::default();

        collection.apply(Change::Added(doc("late", 30, "")));
        collection.apply(Change::Added(doc("early", 10, "")));
        collection.apply(Change::Added(doc("middle", 20, "")));

        assert_eq!(ids(&collection), vec!["early", "middle", "late"]);
    }

    #[test]
    fn duplicate_add_is_treated_as_modify() {
        let mut collection = LiveCollection::default();

        collection.apply(Change::Added(doc("a", 1, "first")));
        collection.apply(Change::Added(doc("a", 1, "second")));

        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get(&"a").map(|d| d.body), Some("second"));
    }

    #[test]
    fn modify_keeps_position_when_sort_key_is_unchanged() {
        let mut collection = LiveCollection::default();
        collection.apply_all([
            Change::Added(doc("a", 1, "")),
            Change::Added(doc("b", 2, "")),
            Change::Added(doc("c", 3, "")),
        ]);

        collection.apply(Change::Modified(doc("b", 2, "edited")));

        assert_eq!(ids(&collection), vec!["a", "b", "c"]);
        assert_eq!(collection.get(&"b").map(|d| d.body), Some("edited"));
    }

    #[test]
    fn modify_repositions_when_sort_key_changes() {
        let mut collection = LiveCollection::default();
        collection.apply_all([
            Change::Added(doc("a", 1, "")),
            Change::Added(doc("b", 2, "")),
            Change::Added(doc("c", 3, "")),
        ]);

        collection.apply(Change::Modified(doc("a", 4, "")));

        assert_eq!(ids(&collection), vec!["b", "c", "a"]);
        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn removing_unknown_key_is_a_noop() {
        let mut collection = LiveCollection::default();
        collection.apply(Change::Added(doc("a", 1, "")));

        let changed = collection.apply(Change::Removed("missing"));

        assert!(!changed);
        assert_eq!(ids(&collection), vec!["a"]);
    }

    #[test]
    fn remove_drops_document_and_position() {
        let mut collection = LiveCollection::default();
        collection.apply_all([Change::Added(doc("a", 1, "")), Change::Added(doc("b", 1, ""))]);

        assert!(collection.apply(Change::Removed("a")));

        assert_eq!(ids(&collection), vec!["b"]);
        assert!(collection.get(&"a").is_none());
    }

    #[test]
    fn causally_consistent_orders_converge() {
        let add1 = Change::Added(doc("id1", 1, "original"));
        let add2 = Change::Added(doc("id2", 2, "other"));
        let mod1 = Change::Modified(doc("id1", 1, "updated"));

        let orders = [
            vec![add1.clone(), add2.clone(), mod1.clone()],
            vec![add1.clone(), mod1.clone(), add2.clone()],
            vec![add2.clone(), add1.clone(), mod1.clone()],
        ];

        for order in orders {
            let mut collection = LiveCollection::default();
            collection.apply_all(order);

            assert_eq!(
                collection.to_vec(),
                vec![doc("id1", 1, "updated"), doc("id2", 2, "other")]
            );
        }
    }

    #[test]
    fn equal_sort_keys_fall_back_to_key_order() {
        let mut collection = LiveCollection::default();

        collection.apply(Change::Added(doc("b", 5, "")));
        collection.apply(Change::Added(doc("a", 5, "")));

        assert_eq!(ids(&collection), vec!["a", "b"]);
    }
}
