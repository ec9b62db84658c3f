//! Data table: typed rows with unique and multi hash indexes
//!
//! # Module Structure
//! - `core`: `DataTable` struct, construction and row access
//! - `crud`: adding, inserting, updating and removing rows
//! - `indexes`: index management and index lookups
//! - `query`: select, count and projection
//! - `selection`: ordered row sets returned by queries
//! - `snapshot`: saving and loading whole tables
//!
//! # Example
//! ```ignore
//! const INT_COL: Column<i64> = Column::new("intCol");
//! const DBL_COL: Column<f64> = Column::new("dblCol");
//! const STR_COL: Column<String> = Column::new("strCol");
//!
//! let mut table = DataTable::with_columns([INT_COL.info(), DBL_COL.info(), STR_COL.info()])?;
//! table.add_unique_hash_index((STR_COL, INT_COL))?;
//! table.add_row([STR_COL.assign("b"), INT_COL.assign(1), DBL_COL.assign(0.5)])?;
//! table.add_row([INT_COL.assign(2), DBL_COL.assign(0.5)])?;
//!
//! // same key as the second row: rejected, nothing added
//! assert!(!table.try_add_row([INT_COL.assign(2)])?.is_applied());
//! assert_eq!(table.select_count(DBL_COL.equals(0.5))?, 2);
//! ```

mod core;
mod crud;
mod indexes;
mod query;
pub(crate) mod raw_pool;
mod row;
mod selection;
mod snapshot;

pub use self::core::DataTable;
pub use row::{Row, RowId, RowRef};
pub use selection::Selection;
pub use snapshot::{IndexDefinition, TableSnapshot};

use crate::index::UniqueHashIndex;

/// Outcome of a `try_*` operation
#[derive(Debug, Clone)]
pub enum TryResult {
    /// The row was stored
    Applied(RowId),
    /// A unique index already holds the key; nothing was changed
    Rejected {
        existing: RowId,
        index: UniqueHashIndex,
        /// The row that was not stored
        row: Row,
    },
}

impl TryResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, TryResult::Applied(_))
    }

    /// Id of the stored row, if any
    pub fn applied(&self) -> Option<RowId> {
        match self {
            TryResult::Applied(id) => Some(*id),
            TryResult::Rejected { .. } => None,
        }
    }

    /// Row that already holds the key, if rejected
    pub fn existing(&self) -> Option<RowId> {
        match self {
            TryResult::Applied(_) => None,
            TryResult::Rejected { existing, .. } => Some(*existing),
        }
    }

    /// Violated index, if rejected
    pub fn unique_hash_index(&self) -> Option<UniqueHashIndex> {
        match self {
            TryResult::Applied(_) => None,
            TryResult::Rejected { index, .. } => Some(*index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use crate::types::{Column, Value};

    const INT_COL: Column<i64> = Column::new("intCol");
    const DBL_COL: Column<f64> = Column::new("dblCol");
    const STR_COL: Column<String> = Column::new("strCol");

    fn table() -> DataTable {
        DataTable::with_columns([INT_COL.info(), DBL_COL.info(), STR_COL.info()]).unwrap()
    }

    #[test]
    fn test_primary_key_table() {
        let mut table = table();
        table.add_unique_hash_index((STR_COL, INT_COL)).unwrap();

        table
            .add_row([STR_COL.assign("b"), INT_COL.assign(1), DBL_COL.assign(0.5)])
            .unwrap();
        table.add_row([INT_COL.assign(2), DBL_COL.assign(0.5)]).unwrap();
        assert_eq!(table.row(1)[&STR_COL], "");

        let result = table.try_add_row([INT_COL.assign(2)]).unwrap();
        assert!(!result.is_applied());
        assert_eq!(table.count(), 2);

        table.update_row(0, &DBL_COL, 1.5).unwrap();
        table.update_row(1, &STR_COL, "a").unwrap();
        let rows: Vec<(i64, f64, String)> = table
            .iter()
            .map(|row| (row[&INT_COL], row[&DBL_COL], row[&STR_COL].clone()))
            .collect();
        assert_eq!(rows, vec![(1, 1.5, "b".to_string()), (2, 0.5, "a".to_string())]);

        let selection = table.select(INT_COL.equals(1)).unwrap();
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.row(0)[&DBL_COL], 1.5);

        let mut selection = table.select_all();
        selection.sort(&STR_COL).unwrap();
        let keys: Vec<&String> = selection.column_items(&STR_COL).unwrap().collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn test_multi_index_table() {
        let mut table = table();
        table.add_multi_hash_index(STR_COL).unwrap();

        let mut row = table.new_row_with([INT_COL.assign(1), STR_COL.assign("b")]).unwrap();
        row[&DBL_COL] = 1.5;
        table.add(row).unwrap();

        let mut row = table.new_row();
        row[&INT_COL] = 2;
        row[&DBL_COL] = 0.5;
        row[&STR_COL] = "a".to_string();
        table.add(row).unwrap();

        let mut printed = Vec::new();
        for row in table.iter() {
            let mut line = Vec::new();
            row.visit(|_, value| line.push(value.to_string()));
            printed.push(line.join(" "));
        }
        assert_eq!(printed, ["1 1.5 b", "2 0.5 a"]);

        let ids = table.select(STR_COL.equals("a")).unwrap().into_row_ids();
        assert_eq!(ids.len(), 1);
        assert_eq!(table.remove_rows(ids), 1);
        assert_eq!(table.count(), 1);

        assert_eq!(
            table
                .select_count(INT_COL.equals(2) & DBL_COL.equals(0.5))
                .unwrap(),
            0
        );
        assert_eq!(table.select_by(|row| row[&DBL_COL] > 0.0).len(), 1);

        table.remove_rows_by(|row| row[&DBL_COL] > 1.0);
        assert_eq!(table.count(), 0);
    }

    #[test]
    fn test_insert_visit_and_remove() {
        let mut table = table();
        table
            .add_row([INT_COL.assign(2), DBL_COL.assign(0.5), STR_COL.assign("a")])
            .unwrap();
        table
            .insert_row(0, [INT_COL.assign(1), DBL_COL.assign(1.5), STR_COL.assign("b")])
            .unwrap();

        let mut named = Vec::new();
        table.row(0).visit(|column, value| named.push(format!("{}={}", column.name, value)));
        assert_eq!(named, ["intCol=1", "dblCol=1.5", "strCol=b"]);

        let first = table.row(0).id();
        table.remove_row(first).unwrap();
        assert_eq!(table.row(0)[&DBL_COL], 0.5);
        assert!(matches!(table.row_by_id(first), Err(DataError::StaleRow(_))));
    }

    #[test]
    fn test_indexes_added_after_rows() {
        let mut table = table();
        let mut row = table.new_row();
        row[&INT_COL] = 1;
        row[&DBL_COL] = 1.5;
        row[&STR_COL] = "a".to_string();
        table.add(row).unwrap();
        let mut row = table.new_row_with([INT_COL.assign(2), STR_COL.assign("a")]).unwrap();
        row[&DBL_COL] = 0.5;
        table.add(row).unwrap();

        let unique = table.add_unique_hash_index((STR_COL, INT_COL)).unwrap();
        let multi = table.add_multi_hash_index(STR_COL).unwrap();

        let found = table
            .find_by_unique_hash(unique, INT_COL.equals(1) & STR_COL.equals("a"))
            .unwrap()
            .unwrap();
        assert_eq!(found[&DBL_COL], 1.5);

        let rows = table.find_by_multi_hash(multi, STR_COL.equals("a")).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_multi_index_matches_scan_regardless_of_creation_time() {
        let mut before = table();
        let index = before.add_multi_hash_index(INT_COL).unwrap();
        let mut after = table();
        for i in 0..30 {
            let assignments = [INT_COL.assign(i % 7), STR_COL.assign(format!("{}", i))];
            before.add_row(assignments.clone()).unwrap();
            after.add_row(assignments).unwrap();
        }
        before.remove_rows_by(|row| row[&STR_COL].ends_with('3'));
        after.remove_rows_by(|row| row[&STR_COL].ends_with('3'));
        let late = after.add_multi_hash_index(INT_COL).unwrap();

        for key in 0..7i64 {
            let expected = before.select_by(|row| row[&INT_COL] == key).len();
            let early_rows = before.find_by_multi_hash(index, INT_COL.equals(key)).unwrap();
            let late_rows = after.find_by_multi_hash(late, INT_COL.equals(key)).unwrap();
            assert_eq!(early_rows.len(), expected);
            assert_eq!(late_rows.len(), expected);
            assert!(early_rows.iter().all(|row| row[&INT_COL] == key));
        }
    }

    #[test]
    fn test_try_result_accessors() {
        let mut table = table();
        let index = table.add_unique_hash_index(INT_COL).unwrap();
        let applied = table.try_add_row([INT_COL.assign(1)]).unwrap();
        let id = applied.applied().unwrap();
        assert!(applied.existing().is_none());

        let rejected = table.try_add_row([INT_COL.assign(1)]).unwrap();
        assert_eq!(rejected.existing(), Some(id));
        assert_eq!(rejected.unique_hash_index(), Some(index));
        match rejected {
            TryResult::Rejected { row, .. } => assert_eq!(row.values()[0], Value::Int64(1)),
            TryResult::Applied(_) => panic!("duplicate key was stored"),
        }
    }
}
