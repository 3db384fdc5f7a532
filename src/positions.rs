use fnv::FnvBuildHasher;
use indexmap::IndexMap;
use mint::Point2;
use std::hash::Hash;

type FnvIndexMap<K, V> = IndexMap<K, V, FnvBuildHasher>;

/// Key -> exact position table, the source of truth for membership and
/// count.
///
/// Iterates in insertion order of first assignment: updating a key's
/// position keeps its slot, removing a key shifts the rest so the remaining
/// order survives.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "K: serde::Serialize",
        deserialize = "K: serde::Deserialize<'de> + Hash + Eq"
    ))
)]
pub struct PositionTable<K> {
    table: FnvIndexMap<K, Point2<f32>>,
}

impl<K> PositionTable<K> {
    pub fn new() -> Self {
        Self {
            table: FnvIndexMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            inner: self.table.iter(),
        }
    }
}

impl<K: Hash + Eq> PositionTable<K> {
    /// Upserts, returning the previous position. The first assignment claims
    /// the key's slot in iteration order; later assignments keep it.
    pub fn insert(&mut self, key: K, pos: Point2<f32>) -> Option<Point2<f32>> {
        self.table.insert(key, pos)
    }

    /// Removes, returning the stored position. Shifts instead of swapping so
    /// the insertion order of the remaining keys is preserved.
    pub fn remove(&mut self, key: &K) -> Option<Point2<f32>> {
        self.table.shift_remove(key)
    }

    pub fn get(&self, key: &K) -> Option<&Point2<f32>> {
        self.table.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.table.contains_key(key)
    }
}

/// Iterator over `(key, position)` pairs in insertion order.
/// Returned by [`SpatialMap::iter`](crate::SpatialMap::iter) and by default
/// iteration over `&SpatialMap`.
pub struct Iter<'a, K> {
    inner: indexmap::map::Iter<'a, K, Point2<f32>>,
}

impl<'a, K: Copy> Iterator for Iter<'a, K> {
    type Item = (K, Point2<f32>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(&k, &p)| (k, p))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Copy> ExactSizeIterator for Iter<'_, K> {}

#[cfg(test)]
mod tests {
    use super::PositionTable;
    use mint::Point2;

    #[test]
    fn order_survives_updates_and_removals() {
        let mut t = PositionTable::new();
        t.insert("a", [0.0, 0.0].into());
        t.insert("b", [1.0, 0.0].into());
        t.insert("c", [2.0, 0.0].into());

        // Moving a key keeps its slot.
        let old = t.insert("a", [9.0, 9.0].into());
        assert_eq!(old, Some([0.0, 0.0].into()));
        let order: Vec<_> = t.iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["a", "b", "c"]);

        // Removing a key preserves the order of the rest.
        assert_eq!(t.remove(&"b"), Some([1.0, 0.0].into()));
        let order: Vec<_> = t.iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["a", "c"]);

        assert_eq!(t.get(&"a"), Some(&Point2 { x: 9.0, y: 9.0 }));
        assert_eq!(t.get(&"b"), None);
        assert_eq!(t.len(), 2);
    }
}
