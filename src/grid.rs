use crate::error::{Error, Result};
use crate::positions::{Iter, PositionTable};
use crate::storage::SparseStorage;
use mint::Point2;
use std::hash::Hash;

/// SpatialMap is a key-addressed spatial hash map: every key owns a 2D
/// position, and the map can hand back all keys within a radius of a point
/// without scanning the whole key set.
///
/// Keys are bucketed into square cells of user-chosen width, kept in a
/// sparse two-level structure (rows of cells by cell y, buckets by cell x)
/// so the plane is unbounded and empty regions cost nothing. Buckets are
/// allocated when the first key lands in them and pruned the moment they
/// empty.
///
/// ## Choosing a cell size
/// Queries are fastest when the cell size is of the same magnitude as the
/// query radius. It only works well if the cell size is adapted to the
/// problem, much like how a tree has to be balanced to be efficient.
///
/// ## Mutation is eager
/// `set` and `remove` take effect immediately, there is no deferred
/// maintenance step. Moving a key across a cell boundary rebuckets it on the
/// spot.
///
/// ## Queries and borrows
/// [`query_around`](Self::query_around) returns a lazy iterator borrowing
/// the map, so the borrow checker rules out mutating while a query is being
/// consumed. Every call starts a fresh sequence.
///
/// ## Keys
/// Keys must be `Copy + Eq + Hash`: each key is stored both in the position
/// table and in its bucket. For a non-`Copy` payload, key the map with a
/// small id and keep the payload in a side map.
///
/// ## Example
/// ```rust
/// use spatial_map::SpatialMap;
///
/// let mut m: SpatialMap<u32> = SpatialMap::new(10.0).unwrap();
/// m.set(1, [0.0, 0.0]).set(2, [3.0, 4.0]).set(3, [40.0, 40.0]);
///
/// // (3, 4) is at distance exactly 5: the boundary is inside.
/// let near: Vec<u32> = m.query_around([0.0, 0.0], 5.0).unwrap().collect();
/// assert_eq!(near.len(), 2);
///
/// m.remove(&2);
/// assert_eq!(m.get(&2), None);
/// assert_eq!(m.len(), 2);
/// ```
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "K: serde::Serialize",
        deserialize = "K: serde::Deserialize<'de> + Hash + Eq"
    ))
)]
pub struct SpatialMap<K> {
    positions: PositionTable<K>,
    storage: SparseStorage<K>,
}

impl<K: Copy + Eq + Hash> SpatialMap<K> {
    /// Creates an empty map.
    /// The cell size should be about the same magnitude as your queries'
    /// radius.
    ///
    /// # Errors
    /// [`Error::InvalidCellSize`] if `cell_size` is zero, negative, infinite
    /// or NaN.
    ///
    /// # Example
    /// ```rust
    /// use spatial_map::SpatialMap;
    /// let m: SpatialMap<&str> = SpatialMap::new(10.0).unwrap();
    /// assert!(m.is_empty());
    /// assert!(SpatialMap::<&str>::new(0.0).is_err());
    /// ```
    pub fn new(cell_size: f32) -> Result<Self> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(Error::InvalidCellSize(cell_size));
        }
        Ok(Self {
            positions: PositionTable::new(),
            storage: SparseStorage::new(cell_size),
        })
    }

    /// Creates a map pre-filled from `(key, position)` entries, applied in
    /// order as if by [`set`](Self::set).
    ///
    /// # Errors
    /// [`Error::InvalidCellSize`] as for [`new`](Self::new).
    ///
    /// # Example
    /// ```rust
    /// use spatial_map::SpatialMap;
    /// let m = SpatialMap::with_entries(10.0, [("a", [0.0, 0.0]), ("b", [25.0, 3.0])]).unwrap();
    /// assert_eq!(m.len(), 2);
    /// ```
    pub fn with_entries<P>(
        cell_size: f32,
        entries: impl IntoIterator<Item = (K, P)>,
    ) -> Result<Self>
    where
        P: Into<Point2<f32>>,
    {
        let mut map = Self::new(cell_size)?;
        for (key, pos) in entries {
            map.set(key, pos);
        }
        Ok(map)
    }

    /// Inserts `key` at `pos`, or moves it there if it is already present.
    /// Returns `&mut Self` so calls can be chained.
    ///
    /// Moving within the same cell only updates the stored exact position;
    /// crossing a cell boundary also rebuckets the key and prunes the old
    /// bucket if it emptied. Setting a key to the position it already has is
    /// a no-op.
    ///
    /// # Example
    /// ```rust
    /// use spatial_map::SpatialMap;
    /// let mut m: SpatialMap<&str> = SpatialMap::new(10.0).unwrap();
    /// m.set("a", [5.0, 3.0]).set("b", [12.0, -8.0]);
    /// m.set("a", [15.0, 3.0]); // moved into the cell next door
    /// assert_eq!(m.get(&"a"), Some([15.0, 3.0].into()));
    /// ```
    pub fn set(&mut self, key: K, pos: impl Into<Point2<f32>>) -> &mut Self {
        let pos = pos.into();
        let cell = self.storage.cell_id(pos);
        match self.positions.insert(key, pos) {
            Some(old) => {
                let old_cell = self.storage.cell_id(old);
                if old_cell != cell {
                    self.storage.remove_from_cell(&key, old_cell);
                    self.storage.add_to_cell(key, cell);
                }
            }
            None => self.storage.add_to_cell(key, cell),
        }
        self
    }

    /// Removes `key`, returning its stored position (`is_some()` tells you
    /// whether it was present). The key's bucket is pruned if it emptied.
    ///
    /// # Example
    /// ```rust
    /// use spatial_map::SpatialMap;
    /// let mut m: SpatialMap<&str> = SpatialMap::new(10.0).unwrap();
    /// m.set("a", [5.0, 3.0]);
    /// assert_eq!(m.remove(&"a"), Some([5.0, 3.0].into()));
    /// assert_eq!(m.remove(&"a"), None);
    /// ```
    pub fn remove(&mut self, key: &K) -> Option<Point2<f32>> {
        let pos = self.positions.remove(key)?;
        let cell = self.storage.cell_id(pos);
        self.storage.remove_from_cell(key, cell);
        Some(pos)
    }

    /// Removes every key.
    ///
    /// # Example
    /// ```rust
    /// use spatial_map::SpatialMap;
    /// let mut m: SpatialMap<&str> = SpatialMap::new(10.0).unwrap();
    /// m.set("a", [5.0, 3.0]);
    /// m.clear();
    /// assert!(m.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.positions.clear();
        self.storage.clear();
    }

    /// Returns the exact position stored for `key`.
    ///
    /// # Example
    /// ```rust
    /// use spatial_map::SpatialMap;
    /// let mut m: SpatialMap<&str> = SpatialMap::new(10.0).unwrap();
    /// m.set("a", [5.0, 3.0]);
    /// assert_eq!(m.get(&"a"), Some([5.0, 3.0].into()));
    /// assert_eq!(m.get(&"b"), None);
    /// ```
    pub fn get(&self, key: &K) -> Option<Point2<f32>> {
        self.positions.get(key).copied()
    }

    /// Whether `key` is in the map.
    pub fn contains_key(&self, key: &K) -> bool {
        self.positions.contains(key)
    }

    /// Number of keys in the map.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the map holds no keys.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// The cell size the map was built with.
    pub fn cell_size(&self) -> f32 {
        self.storage.cell_size()
    }

    /// Number of populated cells. Never counts empty ones: a cell is pruned
    /// the moment its last key leaves.
    ///
    /// # Example
    /// ```rust
    /// use spatial_map::SpatialMap;
    /// let mut m: SpatialMap<&str> = SpatialMap::new(10.0).unwrap();
    /// m.set("a", [5.0, 0.0]).set("b", [5.0, 8.0]).set("c", [11.0, 0.0]);
    /// assert_eq!(m.cell_count(), 2);
    /// m.remove(&"c");
    /// assert_eq!(m.cell_count(), 1);
    /// ```
    pub fn cell_count(&self) -> usize {
        self.storage
            .rows()
            .map(|(_, row)| row.cells().count())
            .sum()
    }

    /// Iterates over `(key, position)` pairs in insertion order of first
    /// assignment. Moving a key does not change its place in the order;
    /// removing a key preserves the order of the rest.
    ///
    /// # Example
    /// ```rust
    /// use spatial_map::SpatialMap;
    /// let mut m: SpatialMap<&str> = SpatialMap::new(10.0).unwrap();
    /// m.set("a", [0.0, 0.0]).set("b", [50.0, 0.0]);
    /// m.set("a", [100.0, 0.0]); // moved, still first
    ///
    /// let keys: Vec<&str> = m.iter().map(|(k, _)| k).collect();
    /// assert_eq!(keys, vec!["a", "b"]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K> {
        self.positions.iter()
    }

    /// Iterates over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    /// Iterates over positions in key insertion order.
    pub fn values(&self) -> impl Iterator<Item = Point2<f32>> + '_ {
        self.iter().map(|(_, p)| p)
    }

    /// Queries for all keys within `radius` of `pos`, boundary included
    /// (exact distance `radius` counts as inside).
    ///
    /// The sequence is lazy: cells are visited as the iterator is pulled, so
    /// an early `break` or `take` does not pay for the rest of the circle.
    /// Each call starts a fresh sequence. A radius of `0.0` yields only keys
    /// exactly at `pos`; `f32::INFINITY` yields every key in the map.
    ///
    /// Cells whose box lies entirely inside the circle are drained without
    /// per-key distance checks, so a radius much larger than the cell size
    /// stays cheap.
    ///
    /// # Errors
    /// [`Error::InvalidRadius`] if `radius` is negative or NaN, returned
    /// before any element is produced.
    ///
    /// # Example
    /// ```rust
    /// use spatial_map::SpatialMap;
    ///
    /// let mut m: SpatialMap<&str> = SpatialMap::new(10.0).unwrap();
    /// m.set("a", [2.0, 2.0]);
    ///
    /// let around: Vec<&str> = m.query_around([0.0, 0.0], 5.0).unwrap().collect();
    /// assert_eq!(around, vec!["a"]);
    /// assert!(m.query_around([0.0, 0.0], -1.0).is_err());
    /// ```
    pub fn query_around(
        &self,
        pos: impl Into<Point2<f32>>,
        radius: f32,
    ) -> Result<impl Iterator<Item = K> + '_> {
        if radius.is_nan() || radius < 0.0 {
            return Err(Error::InvalidRadius(radius));
        }
        let pos = pos.into();
        let s = self.storage.cell_size();
        let r2 = radius * radius;

        let row_min = ((pos.y - radius) / s).floor() as i32;
        let row_max = ((pos.y + radius) / s).floor() as i32;

        let positions = &self.positions;
        Ok(self
            .storage
            .scan_rows(row_min, row_max)
            .flat_map(move |(cy, row)| {
                let row_min_y = cy as f32 * s;
                let row_max_y = row_min_y + s;

                // Vertical slack of the circle at the row edge nearest to
                // the center. A full row walk can hand out rows the circle
                // never touches: those have negative slack.
                let ym = pos.y - pos.y.clamp(row_min_y, row_max_y);
                let slack = r2 - ym * ym;

                let cols = (slack >= 0.0).then(|| {
                    // Half-width of the circle's slice through this row.
                    let off_x = slack.sqrt();
                    let col_min = ((pos.x - off_x) / s).floor() as i32;
                    let col_max = ((pos.x + off_x) / s).ceil() as i32;
                    row.scan_cols(col_min, col_max)
                });

                // Farthest vertical distance to any point of this row,
                // shared by every cell in it.
                let dy_far2 = (pos.y - row_min_y)
                    .powi(2)
                    .max((pos.y - row_max_y).powi(2));

                cols.into_iter().flatten().flat_map(move |(cx, cell)| {
                    let left = cx as f32 * s;
                    let right = left + s;
                    let dx_far = (pos.x - left).max(right - pos.x);

                    // Farthest corner inside the circle: the whole bucket is
                    // in range, skip the per-key distance tests.
                    let whole_cell = dx_far * dx_far + dy_far2 <= r2;

                    cell.keys().copied().filter(move |key| {
                        whole_cell
                            || positions.get(key).map_or(false, |p| {
                                let dx = p.x - pos.x;
                                let dy = p.y - pos.y;
                                dx * dx + dy * dy <= r2
                            })
                    })
                })
            }))
    }

    /// Queries for all keys inside the axis-aligned rectangle spanned by the
    /// corners `a` and `b` (any two opposite corners, boundary included).
    ///
    /// # Example
    /// ```rust
    /// use spatial_map::SpatialMap;
    ///
    /// let mut m: SpatialMap<&str> = SpatialMap::new(10.0).unwrap();
    /// m.set("a", [0.0, 0.0]);
    ///
    /// let inside: Vec<&str> = m.query_aabb([-1.0, -1.0], [1.0, 1.0]).collect();
    /// assert_eq!(inside, vec!["a"]);
    /// ```
    pub fn query_aabb(
        &self,
        a: impl Into<Point2<f32>>,
        b: impl Into<Point2<f32>>,
    ) -> impl Iterator<Item = K> + '_ {
        let a = a.into();
        let b = b.into();

        let ll = Point2 {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
        }; // lower left
        let ur = Point2 {
            x: a.x.max(b.x),
            y: a.y.max(b.y),
        }; // upper right

        let s = self.storage.cell_size();
        let (col_min, row_min) = self.storage.cell_id(ll);
        let (col_max, row_max) = self.storage.cell_id(ur);

        let positions = &self.positions;
        self.storage
            .scan_rows(row_min, row_max)
            .flat_map(move |(cy, row)| {
                let bottom = cy as f32 * s;
                let row_inside = ll.y <= bottom && bottom + s <= ur.y;

                row.scan_cols(col_min, col_max).flat_map(move |(cx, cell)| {
                    let left = cx as f32 * s;
                    // Cell box fully inside the rect: take the bucket as is.
                    let whole_cell = row_inside && ll.x <= left && left + s <= ur.x;

                    cell.keys().copied().filter(move |key| {
                        whole_cell
                            || positions.get(key).map_or(false, |p| {
                                (ll.x..=ur.x).contains(&p.x) && (ll.y..=ur.y).contains(&p.y)
                            })
                    })
                })
            })
    }
}

impl<'a, K: Copy + Eq + Hash> IntoIterator for &'a SpatialMap<K> {
    type Item = (K, Point2<f32>);
    type IntoIter = Iter<'a, K>;

    /// Default iteration is [`iter`](SpatialMap::iter): entries in insertion
    /// order.
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
impl<K: Copy + Eq + Hash + std::fmt::Debug> SpatialMap<K> {
    /// Asserts the structural invariants: every bucketed key is bucketed
    /// exactly where its floored position says, every bucketed key is in the
    /// position table, and no empty bucket or row survives.
    fn assert_consistent(&self) {
        let mut bucketed = 0;
        for (cy, row) in self.storage.rows() {
            let mut cells = 0;
            for (cx, cell) in row.cells() {
                assert!(!cell.is_empty(), "empty bucket at ({}, {})", cx, cy);
                for key in cell.keys() {
                    let pos = self
                        .get(key)
                        .expect("bucketed key missing from position table");
                    assert_eq!(
                        self.storage.cell_id(pos),
                        (cx, cy),
                        "key {:?} bucketed in the wrong cell",
                        key
                    );
                }
                bucketed += cell.keys().len();
                cells += 1;
            }
            assert!(cells > 0, "empty row at {}", cy);
        }
        assert_eq!(bucketed, self.len(), "position table and buckets disagree");
    }
}
