//! Index set of a data table
//!
//! Keeps every unique and multi hash index of one table in step with its rows.
//! Unique conflicts are always checked before any index is touched, so an
//! insert or update either reaches every index or none.

use ahash::RandomState;

use super::hash_index::{HashCache, HashIndex};
use super::{MultiHashIndex, UniqueHashIndex};
use crate::error::DataError;
use crate::table::raw_pool::RawPool;
use crate::table::RowId;
use crate::types::Value;

/// A row whose key is already taken in a unique index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UniqueViolation {
    pub(crate) index: UniqueHashIndex,
    pub(crate) existing: RowId,
}

impl From<UniqueViolation> for DataError {
    fn from(violation: UniqueViolation) -> Self {
        DataError::UniqueIndexViolation {
            index: violation.index,
            existing: violation.existing,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct DataIndexes {
    state: RandomState,
    unique: Vec<HashIndex>,
    multi: Vec<HashIndex>,
    next_id: u32,
}

impl Default for DataIndexes {
    fn default() -> Self {
        Self::new()
    }
}

impl DataIndexes {
    pub(crate) fn new() -> Self {
        Self {
            state: RandomState::new(),
            unique: Vec::new(),
            multi: Vec::new(),
            next_id: 0,
        }
    }

    pub(crate) fn state(&self) -> &RandomState {
        &self.state
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.unique.is_empty() && self.multi.is_empty()
    }

    pub(crate) fn unique_indexes(&self) -> impl Iterator<Item = &HashIndex> {
        self.unique.iter()
    }

    pub(crate) fn multi_indexes(&self) -> impl Iterator<Item = &HashIndex> {
        self.multi.iter()
    }

    pub(crate) fn unique(&self, index: UniqueHashIndex) -> Option<&HashIndex> {
        self.unique.iter().find(|i| i.id() == index.0)
    }

    pub(crate) fn multi(&self, index: MultiHashIndex) -> Option<&HashIndex> {
        self.multi.iter().find(|i| i.id() == index.0)
    }

    /// Unique index over exactly these (sorted) positions
    pub(crate) fn get_unique(&self, positions: &[usize]) -> Option<UniqueHashIndex> {
        self.unique
            .iter()
            .find(|i| i.positions() == positions)
            .map(|i| UniqueHashIndex(i.id()))
    }

    pub(crate) fn get_multi(&self, positions: &[usize]) -> Option<MultiHashIndex> {
        self.multi
            .iter()
            .find(|i| i.positions() == positions)
            .map(|i| MultiHashIndex(i.id()))
    }

    fn take_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// Build a unique index over `rows`. On a duplicate key nothing is kept.
    pub(crate) fn add_unique(
        &mut self,
        positions: Vec<usize>,
        pool: &RawPool,
        rows: &[RowId],
    ) -> Result<UniqueHashIndex, UniqueViolation> {
        if let Some(existing) = self.get_unique(&positions) {
            return Ok(existing);
        }
        let mut index = HashIndex::new(self.take_id(), true, positions);
        index.reserve(rows.len());
        for &id in rows {
            let mut cache = HashCache::new(pool.values(id));
            if let Some(existing) = index.find_row(&self.state, pool, &mut cache) {
                return Err(UniqueViolation {
                    index: UniqueHashIndex(index.id()),
                    existing,
                });
            }
            index.insert(&self.state, pool, id, &mut cache);
        }
        let handle = UniqueHashIndex(index.id());
        self.unique.push(index);
        Ok(handle)
    }

    pub(crate) fn add_multi(
        &mut self,
        positions: Vec<usize>,
        pool: &RawPool,
        rows: &[RowId],
    ) -> MultiHashIndex {
        if let Some(existing) = self.get_multi(&positions) {
            return existing;
        }
        let mut index = HashIndex::new(self.take_id(), false, positions);
        for &id in rows {
            let mut cache = HashCache::new(pool.values(id));
            index.insert(&self.state, pool, id, &mut cache);
        }
        let handle = MultiHashIndex(index.id());
        self.multi.push(index);
        handle
    }

    pub(crate) fn remove_unique(&mut self, index: UniqueHashIndex) -> bool {
        let count = self.unique.len();
        self.unique.retain(|i| i.id() != index.0);
        self.unique.len() != count
    }

    pub(crate) fn remove_multi(&mut self, index: MultiHashIndex) -> bool {
        let count = self.multi.len();
        self.multi.retain(|i| i.id() != index.0);
        self.multi.len() != count
    }

    pub(crate) fn remove_all_unique(&mut self) -> usize {
        std::mem::take(&mut self.unique).len()
    }

    pub(crate) fn remove_all_multi(&mut self) -> usize {
        std::mem::take(&mut self.multi).len()
    }

    /// First unique index whose columns are all constrained
    pub(crate) fn fit_unique(&self, positions: &[usize]) -> Option<&HashIndex> {
        self.unique.iter().find(|i| i.covered_by(positions))
    }

    /// Multi index with the most distinct keys among those whose columns are
    /// all constrained; ties go to the older index
    pub(crate) fn fit_multi(&self, positions: &[usize]) -> Option<&HashIndex> {
        self.multi
            .iter()
            .rev()
            .filter(|i| i.covered_by(positions))
            .max_by_key(|i| i.key_count())
    }

    /// Check a row that is about to be stored
    pub(crate) fn check_row(&self, pool: &RawPool, values: &[Value]) -> Result<(), UniqueViolation> {
        let mut cache = HashCache::new(values);
        for index in &self.unique {
            if let Some(existing) = index.find_row(&self.state, pool, &mut cache) {
                return Err(UniqueViolation {
                    index: UniqueHashIndex(index.id()),
                    existing,
                });
            }
        }
        Ok(())
    }

    /// Register a stored row with every index. Call `check_row` first.
    pub(crate) fn insert_row(&mut self, pool: &RawPool, id: RowId) {
        let mut cache = HashCache::new(pool.values(id));
        for index in self.unique.iter_mut().chain(self.multi.iter_mut()) {
            index.insert(&self.state, pool, id, &mut cache);
        }
    }

    /// Unregister a row that is still stored in `pool`
    pub(crate) fn remove_row(&mut self, pool: &RawPool, id: RowId) {
        let mut cache = HashCache::new(pool.values(id));
        for index in self.unique.iter_mut().chain(self.multi.iter_mut()) {
            index.remove(&self.state, id, &mut cache);
        }
    }

    /// Replace the values of a stored row and return the old ones.
    ///
    /// Only indexes with a changed key column are touched. On a unique
    /// conflict the row and every index stay as they were and the new values
    /// are handed back.
    pub(crate) fn update_row(
        &mut self,
        pool: &mut RawPool,
        id: RowId,
        values: Vec<Value>,
    ) -> Result<Vec<Value>, (UniqueViolation, Vec<Value>)> {
        let changed: Vec<usize> = {
            let old = pool.values(id);
            (0..values.len())
                .filter(|&p| old.get(p) != Some(&values[p]))
                .collect()
        };
        let touched = |positions: &[usize]| {
            positions.iter().any(|p| changed.binary_search(p).is_ok())
        };

        let mut conflict = None;
        let mut cache = HashCache::new(&values);
        for index in self.unique.iter().filter(|i| touched(i.positions())) {
            match index.find_row(&self.state, pool, &mut cache) {
                Some(existing) if existing != id => {
                    conflict = Some(UniqueViolation {
                        index: UniqueHashIndex(index.id()),
                        existing,
                    });
                    break;
                }
                _ => {}
            }
        }
        if let Some(violation) = conflict {
            return Err((violation, values));
        }

        let mut cache = HashCache::new(pool.values(id));
        for index in self
            .unique
            .iter_mut()
            .chain(self.multi.iter_mut())
            .filter(|i| touched(i.positions()))
        {
            index.remove(&self.state, id, &mut cache);
        }

        let old = match pool.get_mut(id) {
            Some(raw) => std::mem::replace(&mut raw.values, values),
            None => return Ok(values),
        };

        let mut cache = HashCache::new(pool.values(id));
        for index in self
            .unique
            .iter_mut()
            .chain(self.multi.iter_mut())
            .filter(|i| touched(i.positions()))
        {
            index.insert(&self.state, pool, id, &mut cache);
        }
        Ok(old)
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        for index in self.unique.iter_mut().chain(self.multi.iter_mut()) {
            index.reserve(additional);
        }
    }

    /// Drop every entry, keeping the index definitions
    pub(crate) fn clear(&mut self) {
        for index in self.unique.iter_mut().chain(self.multi.iter_mut()) {
            index.clear();
        }
    }
}
