//! Index management and index lookups
//!
//! Indexes are defined by a set of columns: `INT_COL`, `(STR_COL, INT_COL)`
//! or a list of [`ColumnInfo`](crate::types::ColumnInfo). Column order does
//! not matter; `(A, B)` and `(B, A)` name the same index.

use crate::error::{DataError, Result};
use crate::index::{HashIndex, MultiHashIndex, UniqueHashIndex};
use crate::types::{ColumnSet, Equality, Value};

use super::core::DataTable;
use super::row::{Row, RowId, RowRef};
use super::selection::Selection;

impl DataTable {
    // ==================== Index Management ====================

    /// Sorted, deduplicated key positions of an index over `columns`
    fn index_positions<S: ColumnSet + ?Sized>(&self, columns: &S) -> Result<Vec<usize>> {
        let mut positions = self.columns.resolve_set(columns)?;
        positions.sort_unstable();
        positions.dedup();
        if positions.is_empty() {
            return Err(DataError::InvalidArgument(
                "an index needs at least one column".to_string(),
            ));
        }
        if let Some(&position) = positions.iter().find(|&&p| self.columns.is_mutable(p)) {
            let name = self
                .columns
                .get(position)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            return Err(DataError::MutableColumnIndex(name));
        }
        Ok(positions)
    }

    pub(super) fn column_names(&self, positions: &[usize]) -> Vec<String> {
        positions
            .iter()
            .filter_map(|&p| self.columns.get(p).map(|c| c.name.clone()))
            .collect()
    }

    /// Add a unique hash index, or return the one already defined over the
    /// same columns. Fails if existing rows already share a key; the table is
    /// then left without the index.
    ///
    /// # Example
    /// ```ignore
    /// let index = table.add_unique_hash_index((STR_COL, INT_COL))?;
    /// ```
    pub fn add_unique_hash_index<S: ColumnSet>(&mut self, columns: S) -> Result<UniqueHashIndex> {
        let positions = self.index_positions(&columns)?;
        let names = self.column_names(&positions);
        let index = self.indexes.add_unique(positions, &self.pool, &self.order)?;
        tracing::debug!(columns = ?names, rows = self.order.len(), "unique hash index ready");
        Ok(index)
    }

    /// Add a multi hash index, or return the one already defined over the
    /// same columns
    pub fn add_multi_hash_index<S: ColumnSet>(&mut self, columns: S) -> Result<MultiHashIndex> {
        let positions = self.index_positions(&columns)?;
        let names = self.column_names(&positions);
        let index = self.indexes.add_multi(positions, &self.pool, &self.order);
        tracing::debug!(columns = ?names, rows = self.order.len(), "multi hash index ready");
        Ok(index)
    }

    pub fn get_unique_hash_index<S: ColumnSet>(&self, columns: S) -> Option<UniqueHashIndex> {
        let positions = self.index_positions(&columns).ok()?;
        self.indexes.get_unique(&positions)
    }

    pub fn get_multi_hash_index<S: ColumnSet>(&self, columns: S) -> Option<MultiHashIndex> {
        let positions = self.index_positions(&columns).ok()?;
        self.indexes.get_multi(&positions)
    }

    /// Remove the unique hash index over `columns`; false if there is none
    pub fn remove_unique_hash_index<S: ColumnSet>(&mut self, columns: S) -> bool {
        let Some(index) = self.get_unique_hash_index(columns) else {
            return false;
        };
        let removed = self.indexes.remove_unique(index);
        tracing::debug!(?index, "unique hash index removed");
        removed
    }

    pub fn remove_multi_hash_index<S: ColumnSet>(&mut self, columns: S) -> bool {
        let Some(index) = self.get_multi_hash_index(columns) else {
            return false;
        };
        let removed = self.indexes.remove_multi(index);
        tracing::debug!(?index, "multi hash index removed");
        removed
    }

    /// Remove every unique hash index; returns how many there were
    pub fn remove_unique_hash_indexes(&mut self) -> usize {
        let count = self.indexes.remove_all_unique();
        tracing::debug!(count, "unique hash indexes removed");
        count
    }

    pub fn remove_multi_hash_indexes(&mut self) -> usize {
        let count = self.indexes.remove_all_multi();
        tracing::debug!(count, "multi hash indexes removed");
        count
    }

    // ==================== Index Lookups ====================

    /// Key of `index` taken from an equality over exactly its columns
    fn index_key(&self, index: &HashIndex, equality: &Equality) -> Result<Vec<Value>> {
        let mut conditions = self.resolve_conditions(equality)?;
        conditions.sort_by_key(|(position, _)| *position);
        let positions: Vec<usize> = conditions.iter().map(|(p, _)| *p).collect();
        if positions != index.positions() {
            return Err(DataError::IndexMismatch(format!(
                "equality over {:?} does not match index columns {:?}",
                self.column_names(&positions),
                self.column_names(index.positions())
            )));
        }
        Ok(conditions.into_iter().map(|(_, value)| value).collect())
    }

    fn lookup<'t>(&'t self, index: &'t HashIndex, key: &[Value]) -> &'t [RowId] {
        let key: Vec<&Value> = key.iter().collect();
        let hash = index.key_hash(self.indexes.state(), &key);
        index.find(&self.pool, hash, &key)
    }

    /// Row holding `equality`'s key in a unique index. The equality must
    /// cover exactly the index columns.
    ///
    /// # Example
    /// ```ignore
    /// let row = table.find_by_unique_hash(index, STR_COL.equals("b") & INT_COL.equals(1))?;
    /// ```
    pub fn find_by_unique_hash(
        &self,
        index: UniqueHashIndex,
        equality: Equality,
    ) -> Result<Option<RowRef<'_>>> {
        let hash_index = self.indexes.unique(index).ok_or(DataError::IndexNotFound)?;
        let key = self.index_key(hash_index, &equality)?;
        Ok(self
            .lookup(hash_index, &key)
            .first()
            .and_then(|id| self.row_ref(*id)))
    }

    /// Row holding the same key as `row` in a unique index
    pub fn find_by_unique_hash_row(
        &self,
        index: UniqueHashIndex,
        row: &Row,
    ) -> Result<Option<RowRef<'_>>> {
        let hash_index = self.indexes.unique(index).ok_or(DataError::IndexNotFound)?;
        if *row.column_list() != *self.columns {
            return Err(DataError::InvalidArgument(
                "row was built for a different column list".to_string(),
            ));
        }
        let key: Vec<Value> = hash_index
            .positions()
            .iter()
            .map(|&p| row.values()[p].clone())
            .collect();
        Ok(self
            .lookup(hash_index, &key)
            .first()
            .and_then(|id| self.row_ref(*id)))
    }

    /// Rows holding `equality`'s key in a multi index, in insertion order
    pub fn find_by_multi_hash(
        &self,
        index: MultiHashIndex,
        equality: Equality,
    ) -> Result<Selection<'_>> {
        let hash_index = self.indexes.multi(index).ok_or(DataError::IndexNotFound)?;
        let key = self.index_key(hash_index, &equality)?;
        Ok(Selection::new(self, self.lookup(hash_index, &key).to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DataError;
    use crate::table::DataTable;
    use crate::types::{Column, ColumnList};

    const INT_COL: Column<i64> = Column::new("intCol");
    const DBL_COL: Column<f64> = Column::new("dblCol");
    const STR_COL: Column<String> = Column::new("strCol");

    fn table() -> DataTable {
        DataTable::with_columns([INT_COL.info(), DBL_COL.info(), STR_COL.info()]).unwrap()
    }

    #[test]
    fn test_index_definitions_are_order_insensitive() {
        let mut table = table();
        let index = table.add_unique_hash_index((STR_COL, INT_COL)).unwrap();
        assert_eq!(table.add_unique_hash_index((INT_COL, STR_COL)).unwrap(), index);
        assert_eq!(table.get_unique_hash_index((INT_COL, STR_COL)), Some(index));
        assert!(table.get_unique_hash_index(INT_COL).is_none());
        assert!(table.get_multi_hash_index((STR_COL, INT_COL)).is_none());

        assert!(table.remove_unique_hash_index((INT_COL, STR_COL)));
        assert!(!table.remove_unique_hash_index((INT_COL, STR_COL)));
        assert!(matches!(
            table.find_by_unique_hash(index, INT_COL.equals(1) & STR_COL.equals("a")),
            Err(DataError::IndexNotFound)
        ));
    }

    #[test]
    fn test_unique_index_over_duplicates_fails() {
        let mut table = table();
        let first = table.add_row([INT_COL.assign(1)]).unwrap();
        table.add_row([INT_COL.assign(1)]).unwrap();
        let err = table.add_unique_hash_index(INT_COL).unwrap_err();
        assert!(matches!(err, DataError::UniqueIndexViolation { existing, .. } if existing == first));
        assert!(table.get_unique_hash_index(INT_COL).is_none());
        assert_eq!(table.len(), 2);
        assert!(table.add_multi_hash_index(INT_COL).is_ok());
    }

    #[test]
    fn test_find_by_unique_hash() {
        let mut table = table();
        let index = table.add_unique_hash_index((STR_COL, INT_COL)).unwrap();
        table
            .add_row([STR_COL.assign("b"), INT_COL.assign(1), DBL_COL.assign(0.5)])
            .unwrap();
        table.add_row([INT_COL.assign(2), DBL_COL.assign(0.5)]).unwrap();

        let row = table
            .find_by_unique_hash(index, INT_COL.equals(1) & STR_COL.equals("b"))
            .unwrap()
            .unwrap();
        assert_eq!(row[&DBL_COL], 0.5);
        assert!(table
            .find_by_unique_hash(index, STR_COL.equals("b") & INT_COL.equals(2))
            .unwrap()
            .is_none());
        assert!(matches!(
            table.find_by_unique_hash(index, INT_COL.equals(1)),
            Err(DataError::IndexMismatch(_))
        ));

        let probe = table.new_row_with([INT_COL.assign(2)]).unwrap();
        let found = table.find_by_unique_hash_row(index, &probe).unwrap().unwrap();
        assert_eq!(found.number(), 1);
    }

    #[test]
    fn test_find_by_multi_hash() {
        let mut table = table();
        let index = table.add_multi_hash_index(DBL_COL).unwrap();
        for i in 0..6 {
            table
                .add_row([INT_COL.assign(i), DBL_COL.assign((i % 2) as f64)])
                .unwrap();
        }
        let selection = table.find_by_multi_hash(index, DBL_COL.equals(1.0)).unwrap();
        let items: Vec<i64> = selection.column_items(&INT_COL).unwrap().copied().collect();
        assert_eq!(items, vec![1, 3, 5]);
        assert!(table
            .find_by_multi_hash(index, DBL_COL.equals(7.0))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_mutable_column_cannot_be_indexed() {
        let columns = ColumnList::from_columns([INT_COL.info(), STR_COL.mutable()]).unwrap();
        let mut table = DataTable::new(columns);
        let err = table.add_unique_hash_index((INT_COL, STR_COL)).unwrap_err();
        assert!(matches!(&err, DataError::MutableColumnIndex(name) if name == "strCol"));
        assert_eq!(err.to_string(), "Cannot add index on mutable column 'strCol'");
    }

    #[test]
    fn test_remove_all_indexes() {
        let mut table = table();
        table.add_unique_hash_index(INT_COL).unwrap();
        table.add_unique_hash_index(STR_COL).unwrap();
        table.add_multi_hash_index(DBL_COL).unwrap();
        assert_eq!(table.remove_unique_hash_indexes(), 2);
        assert_eq!(table.remove_multi_hash_indexes(), 1);
        table.add_row([INT_COL.assign(1)]).unwrap();
        table.add_row([INT_COL.assign(1)]).unwrap();
        assert_eq!(table.len(), 2);
    }
}
