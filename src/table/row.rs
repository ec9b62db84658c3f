//! Rows: detached [`Row`]s, borrowed [`RowRef`]s and stable [`RowId`]s

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

use crate::error::{DataError, Result};
use crate::record::DataStruct;
use crate::types::{Assignment, Column, ColumnInfo, ColumnList, DataItem, Value};

use super::raw_pool::Raw;
use super::DataTable;

/// Stable handle of a row stored in a table.
///
/// Survives insertion and removal of other rows. Once the row is removed the
/// handle stops resolving, even if its slot is reused later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowId {
    slot: u32,
    generation: u32,
}

impl RowId {
    pub(crate) fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub(crate) fn slot(&self) -> u32 {
        self.slot
    }

    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.slot, self.generation)
    }
}

fn missing_column(name: &str) -> ! {
    panic!("column '{}' is not part of the row's column list", name)
}

/// Row that is not (yet) stored in a table.
///
/// Created by `DataTable::new_row*`; columns without an explicit value hold
/// the default of their type.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<ColumnList>,
    values: Vec<Value>,
}

impl Row {
    pub(crate) fn from_parts(columns: Arc<ColumnList>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub(crate) fn into_parts(self) -> (Arc<ColumnList>, Vec<Value>) {
        (self.columns, self.values)
    }

    pub fn column_list(&self) -> &ColumnList {
        &self.columns
    }

    pub(crate) fn shared_column_list(&self) -> &Arc<ColumnList> {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [Value] {
        &mut self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn get<T: DataItem>(&self, column: &Column<T>) -> Option<&T> {
        let position = self.columns.resolve(column).ok()?;
        T::from_value(&self.values[position])
    }

    pub fn get_mut<T: DataItem>(&mut self, column: &Column<T>) -> Option<&mut T> {
        let position = self.columns.resolve(column).ok()?;
        T::from_value_mut(&mut self.values[position])
    }

    pub fn set<T: DataItem>(&mut self, column: &Column<T>, item: impl Into<T>) -> Result<()> {
        let position = self.columns.resolve(column)?;
        let item: T = item.into();
        self.values[position] = item.into_value();
        Ok(())
    }

    /// Apply an untyped assignment, checking the value kind
    pub fn apply(&mut self, assignment: Assignment) -> Result<()> {
        let position = self
            .columns
            .resolve_kind(&assignment.column, assignment.value.kind())?;
        self.values[position] = assignment.value;
        Ok(())
    }

    pub fn to_struct<S: DataStruct>(&self) -> Result<S> {
        S::from_values(&self.columns, &self.values)
    }
}

impl<T: DataItem> Index<&Column<T>> for Row {
    type Output = T;

    fn index(&self, column: &Column<T>) -> &T {
        match self.get(column) {
            Some(item) => item,
            None => missing_column(column.name()),
        }
    }
}

impl<T: DataItem> IndexMut<&Column<T>> for Row {
    fn index_mut(&mut self, column: &Column<T>) -> &mut T {
        match self.get_mut(column) {
            Some(item) => item,
            None => missing_column(column.name()),
        }
    }
}

/// Read-only view of a row stored in a table
#[derive(Clone, Copy)]
pub struct RowRef<'t> {
    table: &'t DataTable,
    id: RowId,
    raw: &'t Raw,
}

impl<'t> RowRef<'t> {
    pub(crate) fn new(table: &'t DataTable, id: RowId, raw: &'t Raw) -> Self {
        Self { table, id, raw }
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    /// Current position of the row in its table
    pub fn number(&self) -> usize {
        if self.table.settings().keep_row_number {
            self.raw.number
        } else {
            self.table
                .row_ids()
                .iter()
                .position(|id| *id == self.id)
                .unwrap_or(usize::MAX)
        }
    }

    pub fn column_list(&self) -> &'t ColumnList {
        self.table.column_list()
    }

    pub fn values(&self) -> &'t [Value] {
        &self.raw.values
    }

    pub fn value_at(&self, position: usize) -> Option<&'t Value> {
        self.raw.values.get(position)
    }

    pub fn get<T: DataItem>(&self, column: &Column<T>) -> Option<&'t T> {
        let position = self.table.column_list().resolve(column).ok()?;
        T::from_value(&self.raw.values[position])
    }

    pub fn try_get<T: DataItem>(&self, column: &Column<T>) -> Result<&'t T> {
        let position = self.table.column_list().resolve(column)?;
        T::from_value(&self.raw.values[position]).ok_or_else(|| DataError::TypeMismatch {
            column: column.name().to_string(),
            expected: T::KIND,
            actual: self.raw.values[position].kind(),
        })
    }

    /// Call `visitor` with every column and its value, in column order
    pub fn visit<F: FnMut(&'t ColumnInfo, &'t Value)>(&self, mut visitor: F) {
        for (column, value) in self.table.column_list().iter().zip(&self.raw.values) {
            visitor(column, value);
        }
    }

    /// Detached copy of this row
    pub fn to_row(&self) -> Row {
        Row::from_parts(self.table.shared_column_list().clone(), self.raw.values.clone())
    }

    pub fn to_struct<S: DataStruct>(&self) -> Result<S> {
        S::from_values(self.table.column_list(), &self.raw.values)
    }
}

impl<'t, T: DataItem> Index<&Column<T>> for RowRef<'t> {
    type Output = T;

    fn index(&self, column: &Column<T>) -> &T {
        match self.get(column) {
            Some(item) => item,
            None => missing_column(column.name()),
        }
    }
}

impl fmt::Debug for RowRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowRef")
            .field("id", &self.id)
            .field("values", &self.raw.values)
            .finish()
    }
}

impl PartialEq for RowRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.table, other.table) && self.id == other.id
    }
}
