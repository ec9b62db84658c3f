//! Adding, inserting, updating and removing rows
//!
//! Every operation that can hit a unique index comes in two forms: the plain
//! one fails with `UniqueIndexViolation`, the `try_` one reports the conflict
//! as [`TryResult::Rejected`]. Either way a rejected change leaves rows and
//! indexes untouched.

use ahash::AHashSet;

use crate::error::{DataError, Result};
use crate::index::UniqueViolation;
use crate::record::DataStruct;
use crate::types::{Assignment, Column, DataItem, Value};

use super::core::DataTable;
use super::raw_pool::Raw;
use super::row::{Row, RowId, RowRef};
use super::TryResult;

fn rejected(violation: UniqueViolation, row: Row) -> TryResult {
    TryResult::Rejected {
        existing: violation.existing,
        index: violation.index,
        row,
    }
}

impl DataTable {
    // ==================== New Rows ====================

    /// Detached row holding the default value of every column
    pub fn new_row(&self) -> Row {
        Row::from_parts(self.columns.clone(), self.columns.default_values())
    }

    /// Detached row with the given assignments; other columns hold defaults
    pub fn new_row_with<I>(&self, assignments: I) -> Result<Row>
    where
        I: IntoIterator<Item = Assignment>,
    {
        let mut row = self.new_row();
        for assignment in assignments {
            row.apply(assignment)?;
        }
        Ok(row)
    }

    /// Detached copy of a stored row. Columns are matched by name and kind,
    /// so the source may belong to another table.
    pub fn new_row_from(&self, source: &RowRef<'_>) -> Row {
        if std::ptr::eq(source.column_list(), &*self.columns) {
            return source.to_row();
        }
        let mut row = self.new_row();
        source.visit(|column, value| {
            if let Ok(position) = self.columns.resolve_kind(&column.name, column.kind) {
                row.values_mut()[position] = value.clone();
            }
        });
        row
    }

    // ==================== Add / Insert ====================

    /// Append a row
    ///
    /// # Example
    /// ```ignore
    /// let id = table.add(table.new_row_with([INT_COL.assign(1)])?)?;
    /// ```
    pub fn add(&mut self, row: Row) -> Result<RowId> {
        self.insert(self.order.len(), row)
    }

    /// Append a row built from assignments
    pub fn add_row<I>(&mut self, assignments: I) -> Result<RowId>
    where
        I: IntoIterator<Item = Assignment>,
    {
        let row = self.new_row_with(assignments)?;
        self.add(row)
    }

    pub fn try_add(&mut self, row: Row) -> Result<TryResult> {
        self.try_insert(self.order.len(), row)
    }

    pub fn try_add_row<I>(&mut self, assignments: I) -> Result<TryResult>
    where
        I: IntoIterator<Item = Assignment>,
    {
        let row = self.new_row_with(assignments)?;
        self.try_add(row)
    }

    /// Insert a row at position `number` (`0..=len`)
    pub fn insert(&mut self, number: usize, row: Row) -> Result<RowId> {
        self.check_insert_number(number)?;
        let values = self.accept_row(row)?;
        self.place(number, values)
            .map_err(|(violation, _)| DataError::from(violation))
    }

    pub fn insert_row<I>(&mut self, number: usize, assignments: I) -> Result<RowId>
    where
        I: IntoIterator<Item = Assignment>,
    {
        let row = self.new_row_with(assignments)?;
        self.insert(number, row)
    }

    pub fn try_insert(&mut self, number: usize, row: Row) -> Result<TryResult> {
        self.check_insert_number(number)?;
        let columns = row.shared_column_list().clone();
        let values = self.accept_row(row)?;
        Ok(match self.place(number, values) {
            Ok(id) => TryResult::Applied(id),
            Err((violation, values)) => rejected(violation, Row::from_parts(columns, values)),
        })
    }

    pub fn add_struct<S: DataStruct>(&mut self, item: S) -> Result<RowId> {
        self.add_row(item.into_assignments())
    }

    pub fn try_add_struct<S: DataStruct>(&mut self, item: S) -> Result<TryResult> {
        self.try_add_row(item.into_assignments())
    }

    fn check_insert_number(&self, number: usize) -> Result<()> {
        if number > self.order.len() {
            return Err(DataError::RowOutOfRange {
                number,
                count: self.order.len(),
            });
        }
        Ok(())
    }

    /// Store values at `number`; on a unique conflict the values are handed back
    fn place(
        &mut self,
        number: usize,
        values: Vec<Value>,
    ) -> std::result::Result<RowId, (UniqueViolation, Vec<Value>)> {
        if let Err(violation) = self.indexes.check_row(&self.pool, &values) {
            return Err((violation, values));
        }
        let id = self.pool.allocate(Raw::new(values));
        self.indexes.insert_row(&self.pool, id);
        self.order.insert(number, id);
        self.renumber(number);
        Ok(id)
    }

    // ==================== Update ====================

    /// Replace the whole row at `number`
    pub fn update(&mut self, number: usize, row: Row) -> Result<RowId> {
        let id = self.id_at(number)?;
        let values = self.accept_row(row)?;
        self.indexes
            .update_row(&mut self.pool, id, values)
            .map_err(|(violation, _)| DataError::from(violation))?;
        Ok(id)
    }

    pub fn try_update(&mut self, number: usize, row: Row) -> Result<TryResult> {
        let id = self.id_at(number)?;
        let columns = row.shared_column_list().clone();
        let values = self.accept_row(row)?;
        Ok(self.replace_values(id, values, |values| Row::from_parts(columns, values)))
    }

    /// Change one column of the row at `number`, keeping every index in step
    pub fn update_row<T: DataItem>(
        &mut self,
        number: usize,
        column: &Column<T>,
        item: impl Into<T>,
    ) -> Result<RowId> {
        let (id, values) = self.changed_values(number, column, item)?;
        self.indexes
            .update_row(&mut self.pool, id, values)
            .map_err(|(violation, _)| DataError::from(violation))?;
        Ok(id)
    }

    pub fn try_update_row<T: DataItem>(
        &mut self,
        number: usize,
        column: &Column<T>,
        item: impl Into<T>,
    ) -> Result<TryResult> {
        let (id, values) = self.changed_values(number, column, item)?;
        let columns = self.columns.clone();
        Ok(self.replace_values(id, values, |values| Row::from_parts(columns, values)))
    }

    /// Change a mutable column in place. Mutable columns carry no index.
    pub fn set_mutable_value<T: DataItem>(
        &mut self,
        number: usize,
        column: &Column<T>,
        item: impl Into<T>,
    ) -> Result<()> {
        let id = self.id_at(number)?;
        let position = self.columns.resolve(column)?;
        if !self.columns.is_mutable(position) {
            return Err(DataError::ImmutableColumn(column.name().to_string()));
        }
        let raw = self.pool.get_mut(id).ok_or(DataError::StaleRow(id))?;
        let item: T = item.into();
        raw.values[position] = item.into_value();
        Ok(())
    }

    fn changed_values<T: DataItem>(
        &self,
        number: usize,
        column: &Column<T>,
        item: impl Into<T>,
    ) -> Result<(RowId, Vec<Value>)> {
        let id = self.id_at(number)?;
        let position = self.columns.resolve(column)?;
        let mut values = self.pool.values(id).to_vec();
        let item: T = item.into();
        values[position] = item.into_value();
        Ok((id, values))
    }

    fn replace_values<F>(&mut self, id: RowId, values: Vec<Value>, rejected_row: F) -> TryResult
    where
        F: FnOnce(Vec<Value>) -> Row,
    {
        match self.indexes.update_row(&mut self.pool, id, values) {
            Ok(_) => TryResult::Applied(id),
            Err((violation, values)) => rejected(violation, rejected_row(values)),
        }
    }

    // ==================== Remove ====================

    /// Remove the row at `number`
    pub fn remove(&mut self, number: usize) -> Result<()> {
        self.extract(number).map(|_| ())
    }

    /// Remove the row at `number` and return its values
    pub fn extract(&mut self, number: usize) -> Result<Row> {
        let id = self.id_at(number)?;
        let values = self.release(id).ok_or(DataError::StaleRow(id))?;
        self.order.remove(number);
        self.renumber(number);
        Ok(Row::from_parts(self.columns.clone(), values))
    }

    /// Remove a row by id
    pub fn remove_row(&mut self, id: RowId) -> Result<()> {
        let number = self
            .order
            .iter()
            .position(|row| *row == id)
            .ok_or(DataError::StaleRow(id))?;
        self.remove(number)
    }

    /// Remove every listed row, e.g. the ids of a selection. Ids that no
    /// longer resolve are skipped. Returns the number of rows removed.
    ///
    /// # Example
    /// ```ignore
    /// let ids = table.select(INT_COL.equals(2))?.into_row_ids();
    /// table.remove_rows(ids);
    /// ```
    pub fn remove_rows<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = RowId>,
    {
        let mut removed = AHashSet::new();
        for id in ids {
            if self.release(id).is_some() {
                removed.insert(id);
            }
        }
        if removed.is_empty() {
            return 0;
        }
        self.order.retain(|id| !removed.contains(id));
        self.renumber(0);
        removed.len()
    }

    /// Remove the rows matching `filter`; returns how many were removed
    pub fn remove_rows_by<F>(&mut self, mut filter: F) -> usize
    where
        F: FnMut(&RowRef<'_>) -> bool,
    {
        let ids: Vec<RowId> = self.iter().filter(|row| filter(row)).map(|row| row.id()).collect();
        self.remove_rows(ids)
    }

    /// Keep only the rows matching `keep`; returns how many were removed
    pub fn filter_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&RowRef<'_>) -> bool,
    {
        self.remove_rows_by(|row| !keep(row))
    }

    /// Make the table hold exactly `ids`, in that order. Rows not listed are
    /// removed; repeated ids are kept once.
    pub fn assign_rows<I>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = RowId>,
    {
        let mut seen = AHashSet::new();
        let mut order = Vec::new();
        for id in ids {
            if !self.pool.contains(id) {
                return Err(DataError::StaleRow(id));
            }
            if seen.insert(id) {
                order.push(id);
            }
        }
        let dropped: Vec<RowId> = self
            .order
            .iter()
            .copied()
            .filter(|id| !seen.contains(id))
            .collect();
        for id in dropped {
            self.release(id);
        }
        self.order = order;
        self.renumber(0);
        Ok(())
    }

    /// Unindex and free a row, leaving `order` to the caller
    fn release(&mut self, id: RowId) -> Option<Vec<Value>> {
        if !self.pool.contains(id) {
            return None;
        }
        self.indexes.remove_row(&self.pool, id);
        self.pool.free(id).map(|raw| raw.values)
    }
}
