//! Hash index over a fixed set of columns
//!
//! Keys are hashed column by column and the per-column codes are summed, so a
//! key hash does not depend on column order. Rows sharing a hash are kept in
//! key groups; a group is matched by comparing the stored values of its first
//! row, which makes hash collisions harmless.

use ahash::{AHashMap, RandomState};

use crate::table::raw_pool::RawPool;
use crate::table::RowId;
use crate::types::Value;

/// Hash code of one column value, keyed by column position
pub(crate) fn column_hash(state: &RandomState, position: usize, value: &Value) -> u64 {
    state.hash_one((position as u32, value))
}

/// Per-column hash codes of one row, shared by every index the row goes into
#[derive(Debug)]
pub(crate) struct HashCache<'v> {
    values: &'v [Value],
    codes: Vec<Option<u64>>,
}

impl<'v> HashCache<'v> {
    pub(crate) fn new(values: &'v [Value]) -> Self {
        Self {
            values,
            codes: vec![None; values.len()],
        }
    }

    pub(crate) fn values(&self) -> &'v [Value] {
        self.values
    }

    /// Key hash of the row for the given column positions
    pub(crate) fn key_hash(&mut self, state: &RandomState, positions: &[usize]) -> u64 {
        let mut hash = 0u64;
        for &position in positions {
            let code = match self.codes[position] {
                Some(code) => code,
                None => {
                    let code = column_hash(state, position, &self.values[position]);
                    self.codes[position] = Some(code);
                    code
                }
            };
            hash = hash.wrapping_add(code);
        }
        hash
    }
}

#[derive(Debug, Clone)]
pub(crate) struct HashIndex {
    id: u32,
    unique: bool,
    /// Sorted column positions
    positions: Vec<usize>,
    /// Hash -> key groups, each group holding the rows of one key
    buckets: AHashMap<u64, Vec<Vec<RowId>>>,
    key_count: usize,
}

impl HashIndex {
    pub(crate) fn new(id: u32, unique: bool, positions: Vec<usize>) -> Self {
        Self {
            id,
            unique,
            positions,
            buckets: AHashMap::new(),
            key_count: 0,
        }
    }

    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Number of distinct keys
    pub(crate) fn key_count(&self) -> usize {
        self.key_count
    }

    /// True if every key column appears in `positions` (sorted)
    pub(crate) fn covered_by(&self, positions: &[usize]) -> bool {
        self.positions
            .iter()
            .all(|p| positions.binary_search(p).is_ok())
    }

    fn group_matches(&self, pool: &RawPool, group: &[RowId], key: &[&Value]) -> bool {
        let Some(first) = group.first() else {
            return false;
        };
        let stored = pool.values(*first);
        self.positions
            .iter()
            .zip(key)
            .all(|(&position, value)| stored.get(position) == Some(*value))
    }

    fn row_key<'v>(&self, values: &'v [Value]) -> Vec<&'v Value> {
        self.positions.iter().map(|&p| &values[p]).collect()
    }

    /// Hash of a key given in `positions` order
    pub(crate) fn key_hash(&self, state: &RandomState, key: &[&Value]) -> u64 {
        self.positions
            .iter()
            .zip(key)
            .fold(0u64, |hash, (&position, value)| {
                hash.wrapping_add(column_hash(state, position, value))
            })
    }

    /// Rows stored under `key`, in insertion order
    pub(crate) fn find(&self, pool: &RawPool, hash: u64, key: &[&Value]) -> &[RowId] {
        self.buckets
            .get(&hash)
            .and_then(|groups| {
                groups
                    .iter()
                    .find(|group| self.group_matches(pool, group, key))
            })
            .map(|group| group.as_slice())
            .unwrap_or(&[])
    }

    /// First stored row with the same key as `cache`'s row
    pub(crate) fn find_row(
        &self,
        state: &RandomState,
        pool: &RawPool,
        cache: &mut HashCache<'_>,
    ) -> Option<RowId> {
        let hash = cache.key_hash(state, &self.positions);
        let key = self.row_key(cache.values());
        self.find(pool, hash, &key).first().copied()
    }

    /// Add a stored row. The caller has already checked unique conflicts.
    pub(crate) fn insert(
        &mut self,
        state: &RandomState,
        pool: &RawPool,
        id: RowId,
        cache: &mut HashCache<'_>,
    ) {
        let hash = cache.key_hash(state, &self.positions);
        let key = self.row_key(cache.values());
        let mut groups = self.buckets.remove(&hash).unwrap_or_default();
        match groups
            .iter_mut()
            .find(|group| self.group_matches(pool, group, &key))
        {
            Some(group) => {
                debug_assert!(!self.unique, "unique index received a duplicate key");
                group.push(id);
            }
            None => {
                groups.push(vec![id]);
                self.key_count += 1;
            }
        }
        self.buckets.insert(hash, groups);
    }

    /// Drop a row whose values are `cache`'s values
    pub(crate) fn remove(&mut self, state: &RandomState, id: RowId, cache: &mut HashCache<'_>) {
        let hash = cache.key_hash(state, &self.positions);
        let Some(mut groups) = self.buckets.remove(&hash) else {
            return;
        };
        if let Some(group_index) = groups.iter().position(|group| group.contains(&id)) {
            let group = &mut groups[group_index];
            group.retain(|row| *row != id);
            if group.is_empty() {
                groups.swap_remove(group_index);
                self.key_count -= 1;
            }
        }
        if !groups.is_empty() {
            self.buckets.insert(hash, groups);
        }
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        self.buckets.reserve(additional);
    }

    pub(crate) fn clear(&mut self) {
        self.buckets.clear();
        self.key_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmentSizing;
    use crate::table::raw_pool::Raw;

    fn store(pool: &mut RawPool, index: &mut HashIndex, state: &RandomState, values: Vec<Value>) -> RowId {
        let id = pool.allocate(Raw::new(values.clone()));
        let mut cache = HashCache::new(&values);
        index.insert(state, pool, id, &mut cache);
        id
    }

    #[test]
    fn test_key_hash_matches_row_hash() {
        let state = RandomState::new();
        let values = vec![Value::Int64(4), Value::from("a"), Value::Float64(1.5)];
        let index = HashIndex::new(0, false, vec![0, 2]);
        let mut cache = HashCache::new(&values);
        assert_eq!(
            cache.key_hash(&state, index.positions()),
            index.key_hash(&state, &[&Value::Int64(4), &Value::Float64(1.5)])
        );
    }

    #[test]
    fn test_groups_and_key_count() {
        let state = RandomState::new();
        let mut pool = RawPool::new(SegmentSizing::default());
        let mut index = HashIndex::new(1, false, vec![0]);

        let a = store(&mut pool, &mut index, &state, vec![Value::Int64(1), Value::from("a")]);
        let b = store(&mut pool, &mut index, &state, vec![Value::Int64(1), Value::from("b")]);
        let c = store(&mut pool, &mut index, &state, vec![Value::Int64(2), Value::from("c")]);
        assert_eq!(index.key_count(), 2);

        let one = Value::Int64(1);
        let hash = index.key_hash(&state, &[&one]);
        assert_eq!(index.find(&pool, hash, &[&one]), &[a, b]);

        let values = pool.values(a).to_vec();
        index.remove(&state, a, &mut HashCache::new(&values));
        assert_eq!(index.find(&pool, hash, &[&one]), &[b]);

        let values = pool.values(c).to_vec();
        index.remove(&state, c, &mut HashCache::new(&values));
        assert_eq!(index.key_count(), 1);

        index.clear();
        assert_eq!(index.key_count(), 0);
        assert!(index.find(&pool, hash, &[&one]).is_empty());
    }

    #[test]
    fn test_covered_by() {
        let index = HashIndex::new(2, true, vec![1, 3]);
        assert!(index.covered_by(&[0, 1, 3]));
        assert!(!index.covered_by(&[1, 2]));
    }
}
