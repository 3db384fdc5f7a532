/// A single cell of the grid, holds every key whose position falls inside it.
/// Never left empty: the storage prunes a cell as soon as its last key leaves.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridCell<K> {
    keys: Vec<K>,
}

impl<K> Default for GridCell<K> {
    fn default() -> Self {
        Self { keys: Vec::new() }
    }
}

impl<K> GridCell<K> {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> std::slice::Iter<'_, K> {
        self.keys.iter()
    }
}

impl<K: PartialEq> GridCell<K> {
    pub fn push(&mut self, key: K) {
        self.keys.push(key);
    }

    /// Removes `key` if present. Bucket order carries no meaning, so the
    /// last key is swapped into the hole.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.keys.iter().position(|k| k == key) {
            Some(i) => {
                self.keys.swap_remove(i);
                true
            }
            None => false,
        }
    }
}
