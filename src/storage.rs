use crate::cell::GridCell;
use crate::scan::AxisScan;
use fnv::FnvHashMap;
use mint::Point2;

/// Cell coordinate: `(cell x, cell y)` from floor-dividing a position by the
/// cell size.
pub type CellId = (i32, i32);

/// One populated row of the grid: cell x -> bucket.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridRow<K> {
    cells: FnvHashMap<i32, GridCell<K>>,
}

impl<K> Default for GridRow<K> {
    fn default() -> Self {
        Self {
            cells: FnvHashMap::default(),
        }
    }
}

impl<K> GridRow<K> {
    /// Ascending scan of the columns hit by `[min, max]`.
    pub fn scan_cols(&self, min: i32, max: i32) -> AxisScan<'_, GridCell<K>> {
        AxisScan::ascending(&self.cells, min, max)
    }

    pub fn cells(&self) -> impl Iterator<Item = (i32, &GridCell<K>)> + '_ {
        self.cells.iter().map(|(&x, cell)| (x, cell))
    }
}

/// Sparse two-level storage for the grid: cell y -> row, then cell x ->
/// bucket. Rows and buckets are allocated when the first key lands in them
/// and pruned as soon as they empty, so memory never outlives the keys.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SparseStorage<K> {
    cell_size: f32,
    rows: FnvHashMap<i32, GridRow<K>>,
}

impl<K> SparseStorage<K> {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            rows: FnvHashMap::default(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cell coordinate covering `pos`. True floor division: negative
    /// positions land in negative cells, and the boundary belongs to the
    /// cell it opens.
    #[inline]
    pub fn cell_id(&self, pos: Point2<f32>) -> CellId {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    /// Descending scan of the rows hit by `[min, max]`.
    pub fn scan_rows(&self, min: i32, max: i32) -> AxisScan<'_, GridRow<K>> {
        AxisScan::descending(&self.rows, min, max)
    }

    pub fn rows(&self) -> impl Iterator<Item = (i32, &GridRow<K>)> + '_ {
        self.rows.iter().map(|(&y, row)| (y, row))
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

impl<K: PartialEq> SparseStorage<K> {
    /// Inserts `key` into the bucket at `id`, allocating the row and bucket
    /// as needed.
    pub fn add_to_cell(&mut self, key: K, (cx, cy): CellId) {
        self.rows
            .entry(cy)
            .or_default()
            .cells
            .entry(cx)
            .or_default()
            .push(key);
    }

    /// Removes `key` from the bucket at `id`, pruning the bucket and the row
    /// if they empty out. Returns whether the key was there.
    pub fn remove_from_cell(&mut self, key: &K, (cx, cy): CellId) -> bool {
        let row = match self.rows.get_mut(&cy) {
            Some(row) => row,
            None => return false,
        };
        let cell = match row.cells.get_mut(&cx) {
            Some(cell) => cell,
            None => return false,
        };
        if !cell.remove(key) {
            return false;
        }
        if cell.is_empty() {
            row.cells.remove(&cx);
            if row.cells.is_empty() {
                self.rows.remove(&cy);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::SparseStorage;

    fn cell_count<K>(s: &SparseStorage<K>) -> usize {
        s.rows().map(|(_, row)| row.cells().count()).sum()
    }

    #[test]
    fn negative_positions_floor_into_negative_cells() {
        let s: SparseStorage<&str> = SparseStorage::new(10.0);

        assert_eq!(s.cell_id([0.0, 0.0].into()), (0, 0));
        assert_eq!(s.cell_id([-1.0, -1.0].into()), (-1, -1));
        assert_eq!(s.cell_id([-10.0, 9.9].into()), (-1, 0));
        assert_eq!(s.cell_id([-0.5, 20.0].into()), (-1, 2));
    }

    #[test]
    fn empty_buckets_and_rows_are_pruned() {
        let mut s: SparseStorage<&str> = SparseStorage::new(10.0);
        s.add_to_cell("a", (0, 0));
        s.add_to_cell("b", (0, 0));
        s.add_to_cell("c", (3, 0));
        assert_eq!(s.rows().count(), 1);
        assert_eq!(cell_count(&s), 2);

        assert!(s.remove_from_cell(&"a", (0, 0)));
        // "b" keeps the bucket alive.
        assert_eq!(cell_count(&s), 2);

        assert!(s.remove_from_cell(&"b", (0, 0)));
        assert_eq!(cell_count(&s), 1);
        assert_eq!(s.rows().count(), 1);

        assert!(s.remove_from_cell(&"c", (3, 0)));
        assert_eq!(s.rows().count(), 0);
    }

    #[test]
    fn removing_an_absent_key_reports_false() {
        let mut s: SparseStorage<&str> = SparseStorage::new(10.0);
        assert!(!s.remove_from_cell(&"a", (0, 0)));

        s.add_to_cell("a", (0, 0));
        assert!(!s.remove_from_cell(&"b", (0, 0)));
        assert!(!s.remove_from_cell(&"a", (1, 0)));
        assert!(s.remove_from_cell(&"a", (0, 0)));
    }
}
