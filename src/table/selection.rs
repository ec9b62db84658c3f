//! Ordered row sets returned by queries
//!
//! A [`Selection`] holds row ids of one table and borrows the table, so its
//! rows cannot change underneath it. Editing a selection (sorting, pushing,
//! removing) never touches the table itself.

use ahash::AHashMap;
use std::cmp::Ordering;
use std::ops::RangeBounds;

use crate::error::{DataError, Result};
use crate::types::{Column, DataItem, Equality, Value};

use super::core::DataTable;
use super::row::{RowId, RowRef};

#[derive(Clone)]
pub struct Selection<'t> {
    table: &'t DataTable,
    ids: Vec<RowId>,
}

impl<'t> Selection<'t> {
    pub(crate) fn new(table: &'t DataTable, ids: Vec<RowId>) -> Self {
        Self { table, ids }
    }

    /// Empty selection over `table`
    pub fn empty(table: &'t DataTable) -> Self {
        Self::new(table, Vec::new())
    }

    pub fn table(&self) -> &'t DataTable {
        self.table
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[RowId] {
        &self.ids
    }

    pub fn into_row_ids(self) -> Vec<RowId> {
        self.ids
    }

    pub fn get(&self, index: usize) -> Option<RowRef<'t>> {
        self.table.row_ref(*self.ids.get(index)?)
    }

    /// Row at `index`
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn row(&self, index: usize) -> RowRef<'t> {
        match self.get(index) {
            Some(row) => row,
            None => panic!(
                "selection index {} out of range (length {})",
                index,
                self.ids.len()
            ),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = RowRef<'t>> + '_ {
        let table = self.table;
        self.ids.iter().filter_map(move |id| table.row_ref(*id))
    }

    /// Values of one column, in selection order
    pub fn column_items<T: DataItem>(
        &self,
        column: &Column<T>,
    ) -> Result<impl Iterator<Item = &'t T> + '_> {
        let position = self.table.column_list().resolve(column)?;
        Ok(self
            .iter()
            .filter_map(move |row| T::from_value(row.value_at(position)?)))
    }

    // ==================== Ordering ====================

    fn sort_by_position(&mut self, position: usize) {
        let table = self.table;
        self.ids.sort_by(|a, b| {
            let left = table.row_ref(*a).and_then(|row| row.value_at(position));
            let right = table.row_ref(*b).and_then(|row| row.value_at(position));
            left.cmp(&right)
        });
    }

    /// Stable sort by one column
    pub fn sort<T: DataItem>(&mut self, column: &Column<T>) -> Result<()> {
        let position = self.table.column_list().resolve(column)?;
        self.sort_by_position(position);
        Ok(())
    }

    /// Stable sort by the columns of `keys`, in the order given; the values
    /// in `keys` are ignored. Prepares the selection for `lower_bound`,
    /// `upper_bound` and `binary_search`.
    pub fn sort_by_columns(&mut self, keys: &Equality) -> Result<()> {
        let positions: Vec<usize> = self
            .table
            .resolve_conditions(keys)?
            .into_iter()
            .map(|(p, _)| p)
            .collect();
        let table = self.table;
        self.ids.sort_by(|a, b| {
            let (Some(left), Some(right)) = (table.row_ref(*a), table.row_ref(*b)) else {
                return Ordering::Equal;
            };
            positions
                .iter()
                .map(|&p| left.value_at(p).cmp(&right.value_at(p)))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        Ok(())
    }

    /// Stable sort with a comparator
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&RowRef<'t>, &RowRef<'t>) -> Ordering,
    {
        let table = self.table;
        self.ids.sort_by(|a, b| match (table.row_ref(*a), table.row_ref(*b)) {
            (Some(left), Some(right)) => compare(&left, &right),
            _ => Ordering::Equal,
        });
    }

    pub fn reverse(&mut self) {
        self.ids.reverse();
    }

    /// Stable grouping: rows with equal values in `column` become adjacent,
    /// groups ordered by first appearance
    pub fn group<T: DataItem>(&mut self, column: &Column<T>) -> Result<()> {
        let position = self.table.column_list().resolve(column)?;
        let table = self.table;
        let mut groups: AHashMap<Value, usize> = AHashMap::new();
        let mut keyed: Vec<(usize, RowId)> = Vec::with_capacity(self.ids.len());
        for &id in &self.ids {
            let value = table
                .row_ref(id)
                .and_then(|row| row.value_at(position))
                .cloned()
                .unwrap_or(Value::Bool(false));
            let next = groups.len();
            let group = *groups.entry(value).or_insert(next);
            keyed.push((group, id));
        }
        keyed.sort_by_key(|(group, _)| *group);
        self.ids = keyed.into_iter().map(|(_, id)| id).collect();
        Ok(())
    }

    // ==================== Search ====================

    fn compare_key(&self, id: RowId, conditions: &[(usize, Value)]) -> Ordering {
        let Some(row) = self.table.row_ref(id) else {
            return Ordering::Less;
        };
        conditions
            .iter()
            .map(|(p, value)| match row.value_at(*p) {
                Some(stored) => stored.cmp(value),
                None => Ordering::Less,
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// First position whose row is not less than `key`. The selection must
    /// be sorted by the key's columns in the key's order.
    pub fn lower_bound(&self, key: &Equality) -> Result<usize> {
        let conditions = self.table.resolve_conditions(key)?;
        Ok(self
            .ids
            .partition_point(|id| self.compare_key(*id, &conditions) == Ordering::Less))
    }

    /// First position whose row is greater than `key`
    pub fn upper_bound(&self, key: &Equality) -> Result<usize> {
        let conditions = self.table.resolve_conditions(key)?;
        Ok(self
            .ids
            .partition_point(|id| self.compare_key(*id, &conditions) != Ordering::Greater))
    }

    /// First position whose row does not satisfy `pred`, given that `pred`
    /// holds for a prefix of the selection
    pub fn binary_search<F>(&self, mut pred: F) -> usize
    where
        F: FnMut(&RowRef<'t>) -> bool,
    {
        let table = self.table;
        self.ids
            .partition_point(|id| table.row_ref(*id).map_or(false, |row| pred(&row)))
    }

    // ==================== Editing ====================

    fn check_row(&self, id: RowId) -> Result<()> {
        if !self.table.contains_row(id) {
            return Err(DataError::StaleRow(id));
        }
        Ok(())
    }

    pub fn push(&mut self, id: RowId) -> Result<()> {
        self.check_row(id)?;
        self.ids.push(id);
        Ok(())
    }

    pub fn insert(&mut self, index: usize, id: RowId) -> Result<()> {
        self.check_row(id)?;
        if index > self.ids.len() {
            return Err(DataError::RowOutOfRange {
                number: index,
                count: self.ids.len(),
            });
        }
        self.ids.insert(index, id);
        Ok(())
    }

    /// Replace the row at `index`
    pub fn set(&mut self, index: usize, id: RowId) -> Result<()> {
        self.check_row(id)?;
        let count = self.ids.len();
        let slot = self.ids.get_mut(index).ok_or(DataError::RowOutOfRange {
            number: index,
            count,
        })?;
        *slot = id;
        Ok(())
    }

    /// Drop the rows in `range` from the selection
    pub fn remove<R: RangeBounds<usize>>(&mut self, range: R) {
        self.ids.drain(range);
    }

    /// Drop the rows matching `filter`; returns how many were dropped
    pub fn remove_by<F>(&mut self, mut filter: F) -> usize
    where
        F: FnMut(&RowRef<'t>) -> bool,
    {
        self.retain(|row| !filter(row))
    }

    /// Keep the rows matching `keep`; returns how many were dropped
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&RowRef<'t>) -> bool,
    {
        let table = self.table;
        let before = self.ids.len();
        self.ids
            .retain(|id| table.row_ref(*id).map_or(false, |row| keep(&row)));
        before - self.ids.len()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// New selection with the rows matching `filter`
    pub fn filtered<F>(&self, mut filter: F) -> Selection<'t>
    where
        F: FnMut(&RowRef<'t>) -> bool,
    {
        let ids = self
            .iter()
            .filter(|row| filter(row))
            .map(|row| row.id())
            .collect();
        Selection::new(self.table, ids)
    }

    /// Table holding copies of these rows
    pub fn to_table(&self) -> DataTable {
        DataTable::from_selection(self)
    }
}

impl std::fmt::Debug for Selection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'s, 't> IntoIterator for &'s Selection<'t> {
    type Item = RowRef<'t>;
    type IntoIter = Box<dyn Iterator<Item = RowRef<'t>> + 's>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
