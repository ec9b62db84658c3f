//! `DataTable` struct, construction and row access

use std::sync::Arc;

use crate::config::DataSettings;
use crate::error::{DataError, Result};
use crate::index::DataIndexes;
use crate::record::DataStruct;
use crate::types::{Column, ColumnInfo, ColumnList, DataItem, Equality, Value};

use super::raw_pool::RawPool;
use super::row::{Row, RowId, RowRef};

/// In-memory table of typed rows.
///
/// Rows keep a stable [`RowId`] for their whole life. Row numbers are the
/// current positions in table order and shift on insert and removal.
/// Cloning a table copies rows and index definitions.
#[derive(Debug, Clone)]
pub struct DataTable {
    pub(super) columns: Arc<ColumnList>,
    pub(super) settings: DataSettings,
    pub(super) pool: RawPool,
    /// Row ids in table order
    pub(super) order: Vec<RowId>,
    pub(super) indexes: DataIndexes,
}

impl DataTable {
    // ==================== Construction ====================

    /// Empty table with default settings
    pub fn new(columns: ColumnList) -> Self {
        Self::build(Arc::new(columns), DataSettings::default())
    }

    pub fn with_settings(columns: ColumnList, settings: DataSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self::build(Arc::new(columns), settings))
    }

    /// Empty table over a list of columns, e.g.
    /// `DataTable::with_columns([INT_COL.info(), STR_COL.mutable()])`
    pub fn with_columns<I>(columns: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<ColumnInfo>,
    {
        Ok(Self::new(ColumnList::from_columns(columns)?))
    }

    /// Empty table whose columns are the fields of `S`
    pub fn for_struct<S: DataStruct>() -> Result<Self> {
        Self::with_columns(S::column_infos())
    }

    pub(super) fn build(columns: Arc<ColumnList>, settings: DataSettings) -> Self {
        let mut pool = RawPool::new(settings.rows_segment);
        pool.reserve(settings.initial_capacity);
        Self {
            columns,
            order: Vec::with_capacity(settings.initial_capacity),
            settings,
            pool,
            indexes: DataIndexes::new(),
        }
    }

    /// Empty table with the same columns and settings, without indexes
    pub(super) fn empty_like(&self) -> Self {
        Self::build(self.columns.clone(), self.settings.clone())
    }

    // ==================== Accessors ====================

    pub fn settings(&self) -> &DataSettings {
        &self.settings
    }

    pub fn column_list(&self) -> &ColumnList {
        &self.columns
    }

    pub(crate) fn shared_column_list(&self) -> &Arc<ColumnList> {
        &self.columns
    }

    pub fn contains_column<T: DataItem>(&self, column: &Column<T>) -> bool {
        self.columns.contains(column)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of rows; same as `len`
    pub fn count(&self) -> usize {
        self.order.len()
    }

    /// Row ids in table order
    pub fn row_ids(&self) -> &[RowId] {
        &self.order
    }

    /// Row at `number`.
    ///
    /// # Panics
    /// If `number` is out of range, like slice indexing. See [`get`](Self::get).
    pub fn row(&self, number: usize) -> RowRef<'_> {
        match self.get(number) {
            Some(row) => row,
            None => panic!(
                "row number {} out of range (row count {})",
                number,
                self.order.len()
            ),
        }
    }

    pub fn get(&self, number: usize) -> Option<RowRef<'_>> {
        let id = *self.order.get(number)?;
        self.row_ref(id)
    }

    /// Row by stable id; fails with `StaleRow` once the row is gone
    pub fn row_by_id(&self, id: RowId) -> Result<RowRef<'_>> {
        self.row_ref(id).ok_or(DataError::StaleRow(id))
    }

    pub fn contains_row(&self, id: RowId) -> bool {
        self.pool.contains(id)
    }

    pub(crate) fn row_ref(&self, id: RowId) -> Option<RowRef<'_>> {
        self.pool.get(id).map(|raw| RowRef::new(self, id, raw))
    }

    /// Rows in table order
    pub fn iter(&self) -> impl Iterator<Item = RowRef<'_>> + '_ {
        self.order.iter().filter_map(move |id| self.row_ref(*id))
    }

    /// Values of one column in table order
    pub fn column_items<'a, T: DataItem>(
        &'a self,
        column: &Column<T>,
    ) -> Result<impl Iterator<Item = &'a T> + 'a> {
        let position = self.columns.resolve(column)?;
        Ok(self
            .order
            .iter()
            .filter_map(move |id| T::from_value(self.pool.values(*id).get(position)?)))
    }

    // ==================== Capacity ====================

    /// Remove every row. Index definitions are kept.
    pub fn clear(&mut self) {
        self.indexes.clear();
        self.pool.clear();
        self.order.clear();
    }

    pub fn reserve(&mut self, additional: usize) {
        self.order.reserve(additional);
        self.pool.reserve(self.pool.len() + additional);
        self.indexes.reserve(additional);
    }

    // ==================== Helpers ====================

    pub(super) fn id_at(&self, number: usize) -> Result<RowId> {
        self.order
            .get(number)
            .copied()
            .ok_or(DataError::RowOutOfRange {
                number,
                count: self.order.len(),
            })
    }

    /// Values of a detached row, which must be built for this table's columns
    pub(super) fn accept_row(&self, row: Row) -> Result<Vec<Value>> {
        let (columns, values) = row.into_parts();
        if !Arc::ptr_eq(&columns, &self.columns) && *columns != *self.columns {
            return Err(DataError::InvalidArgument(
                "row was built for a different column list".to_string(),
            ));
        }
        Ok(values)
    }

    /// Refresh stored row numbers from `from` on
    pub(super) fn renumber(&mut self, from: usize) {
        if !self.settings.keep_row_number {
            return;
        }
        for (number, id) in self.order.iter().enumerate().skip(from) {
            if let Some(raw) = self.pool.get_mut(*id) {
                raw.number = number;
            }
        }
    }

    /// Equality conditions as `(position, value)` in the order given.
    /// Every column must exist with the value's kind.
    pub(super) fn resolve_conditions(&self, equality: &Equality) -> Result<Vec<(usize, Value)>> {
        equality
            .conditions()
            .map(|(name, value)| {
                let position = self.columns.resolve_kind(name, value.kind())?;
                Ok((position, value.clone()))
            })
            .collect()
    }
}
