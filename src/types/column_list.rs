//! Ordered column schema of a data table

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use super::{ColumnInfo, ColumnSet, DataItem, Value, ValueKind};
use super::column::Column;
use crate::error::{DataError, Result};

/// Ordered list of columns. Column names are unique.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColumnInfo>", into = "Vec<ColumnInfo>")]
pub struct ColumnList {
    columns: Vec<ColumnInfo>,
    /// Column name -> position
    positions: AHashMap<String, usize>,
}

impl PartialEq for ColumnList {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for ColumnList {}

impl ColumnList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of columns, e.g. `[INT_COL.info(), DBL_COL.mutable()]`
    pub fn from_columns<I>(columns: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<ColumnInfo>,
    {
        let mut list = Self::new();
        for column in columns {
            list.add(column)?;
        }
        Ok(list)
    }

    /// Append a column and return its position
    pub fn add(&mut self, column: impl Into<ColumnInfo>) -> Result<usize> {
        let column = column.into();
        if self.positions.contains_key(&column.name) {
            return Err(DataError::DuplicateColumn(column.name));
        }
        let position = self.columns.len();
        self.positions.insert(column.name.clone(), position);
        self.columns.push(column);
        Ok(position)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnInfo> {
        self.columns.iter()
    }

    pub fn get(&self, position: usize) -> Option<&ColumnInfo> {
        self.columns.get(position)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains<T: DataItem>(&self, column: &Column<T>) -> bool {
        self.resolve(column).is_ok()
    }

    /// Position of a typed column; its name and kind must both match
    pub fn resolve<T: DataItem>(&self, column: &Column<T>) -> Result<usize> {
        self.resolve_kind(column.name(), T::KIND)
    }

    pub fn resolve_kind(&self, name: &str, kind: ValueKind) -> Result<usize> {
        let position = self
            .position(name)
            .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))?;
        let expected = self.columns[position].kind;
        if expected != kind {
            return Err(DataError::TypeMismatch {
                column: name.to_string(),
                expected,
                actual: kind,
            });
        }
        Ok(position)
    }

    /// Positions of a column set, in the order given
    pub fn resolve_set<S: ColumnSet + ?Sized>(&self, columns: &S) -> Result<Vec<usize>> {
        columns
            .column_infos()
            .iter()
            .map(|info| self.resolve_kind(&info.name, info.kind))
            .collect()
    }

    /// Flag columns as mutable
    pub fn set_mutable<S: ColumnSet + ?Sized>(&mut self, columns: &S) -> Result<()> {
        for position in self.resolve_set(columns)? {
            self.columns[position].mutable = true;
        }
        Ok(())
    }

    /// Clear every mutable flag
    pub fn reset_mutable(&mut self) {
        for column in &mut self.columns {
            column.mutable = false;
        }
    }

    pub fn is_mutable(&self, position: usize) -> bool {
        self.columns.get(position).map_or(false, |c| c.mutable)
    }

    /// Values of a freshly created row
    pub fn default_values(&self) -> Vec<Value> {
        self.columns.iter().map(|c| c.kind.default_value()).collect()
    }

    /// Check that `values` has one value of the right kind per column
    pub fn validate_values(&self, values: &[Value]) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(DataError::InvalidArgument(format!(
                "Column count mismatch: expected {}, got {}",
                self.columns.len(),
                values.len()
            )));
        }
        for (column, value) in self.columns.iter().zip(values) {
            if column.kind != value.kind() {
                return Err(DataError::TypeMismatch {
                    column: column.name.clone(),
                    expected: column.kind,
                    actual: value.kind(),
                });
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<ColumnInfo>> for ColumnList {
    type Error = DataError;

    fn try_from(columns: Vec<ColumnInfo>) -> Result<Self> {
        Self::from_columns(columns)
    }
}

impl From<ColumnList> for Vec<ColumnInfo> {
    fn from(list: ColumnList) -> Self {
        list.columns
    }
}

impl<'a> IntoIterator for &'a ColumnList {
    type Item = &'a ColumnInfo;
    type IntoIter = std::slice::Iter<'a, ColumnInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}
