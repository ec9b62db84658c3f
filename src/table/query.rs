//! Select, count and projection
//!
//! An equality select is answered through an index whenever the columns of
//! some index are all constrained: the first fitting unique index is used,
//! otherwise the fitting multi index with the most distinct keys. The other
//! conditions then filter the index result. Without a fitting index the
//! table is scanned in order.

use ahash::AHashSet;

use crate::error::Result;
use crate::types::{ColumnInfo, ColumnSet, ColumnList, Equality, Value};

use super::core::DataTable;
use super::row::{RowId, RowRef};
use super::selection::Selection;

/// Equality conditions resolved against a table
struct Conditions {
    /// `(position, value)` sorted by position, one entry per column
    sorted: Vec<(usize, Value)>,
    /// Sorted positions usable for index matching
    index_positions: Vec<usize>,
}

impl Conditions {
    fn value_at(&self, position: usize) -> Option<&Value> {
        self.sorted
            .binary_search_by_key(&position, |(p, _)| *p)
            .ok()
            .map(|i| &self.sorted[i].1)
    }

    fn matches(&self, values: &[Value]) -> bool {
        self.sorted
            .iter()
            .all(|(position, value)| values.get(*position) == Some(value))
    }
}

impl DataTable {
    /// `None` when two conditions on one column contradict each other
    fn conditions(&self, equality: &Equality) -> Result<Option<Conditions>> {
        let resolved = self.resolve_conditions(equality)?;
        let mut index_positions: Vec<usize> = resolved
            .iter()
            .take(self.settings.select_equality_max_count)
            .map(|(p, _)| *p)
            .collect();
        index_positions.sort_unstable();
        index_positions.dedup();

        let mut sorted = resolved;
        sorted.sort_by_key(|(p, _)| *p);
        sorted.dedup();
        if sorted.windows(2).any(|pair| pair[0].0 == pair[1].0) {
            return Ok(None);
        }
        Ok(Some(Conditions {
            sorted,
            index_positions,
        }))
    }

    /// Feed every row matching `equality` and `filter` to `sink`
    fn visit_matches<F, S>(&self, equality: &Equality, mut filter: F, mut sink: S) -> Result<()>
    where
        F: FnMut(&RowRef<'_>) -> bool,
        S: FnMut(RowRef<'_>),
    {
        let Some(conditions) = self.conditions(equality)? else {
            tracing::trace!("contradicting equality, nothing selected");
            return Ok(());
        };
        let mut check = |id: RowId| {
            if let Some(row) = self.row_ref(id) {
                if conditions.matches(row.values()) && filter(&row) {
                    sink(row);
                }
            }
        };

        if !conditions.index_positions.is_empty() && !self.indexes.is_empty() {
            let fit = match self.indexes.fit_unique(&conditions.index_positions) {
                Some(index) => Some(("unique", index)),
                None => self
                    .indexes
                    .fit_multi(&conditions.index_positions)
                    .map(|index| ("multi", index)),
            };
            if let Some((kind, index)) = fit {
                let key: Vec<&Value> = index
                    .positions()
                    .iter()
                    .filter_map(|&p| conditions.value_at(p))
                    .collect();
                let hash = index.key_hash(self.indexes.state(), &key);
                let ids = index.find(&self.pool, hash, &key);
                tracing::trace!(index = kind, columns = ?self.column_names(index.positions()), candidates = ids.len(), "select through index");
                for &id in ids {
                    check(id);
                }
                return Ok(());
            }
        }

        tracing::trace!(rows = self.order.len(), "select by scan");
        for &id in &self.order {
            check(id);
        }
        Ok(())
    }

    fn collect_ids<F>(&self, equality: &Equality, filter: F) -> Result<Vec<RowId>>
    where
        F: FnMut(&RowRef<'_>) -> bool,
    {
        let mut ids = Vec::new();
        self.visit_matches(equality, filter, |row| ids.push(row.id()))?;
        Ok(ids)
    }

    // ==================== Select ====================

    /// Rows matching every condition of `equality`
    ///
    /// # Example
    /// ```ignore
    /// let selection = table.select(INT_COL.equals(2) & DBL_COL.equals(0.5))?;
    /// ```
    pub fn select(&self, equality: Equality) -> Result<Selection<'_>> {
        self.select_with(equality, |_| true)
    }

    /// Rows matching `equality` and then `filter`
    pub fn select_with<F>(&self, equality: Equality, filter: F) -> Result<Selection<'_>>
    where
        F: FnMut(&RowRef<'_>) -> bool,
    {
        Ok(Selection::new(self, self.collect_ids(&equality, filter)?))
    }

    /// Rows matching `filter`, in table order
    pub fn select_by<F>(&self, mut filter: F) -> Selection<'_>
    where
        F: FnMut(&RowRef<'_>) -> bool,
    {
        let ids = self
            .iter()
            .filter(|row| filter(row))
            .map(|row| row.id())
            .collect();
        Selection::new(self, ids)
    }

    /// Every row, in table order
    pub fn select_all(&self) -> Selection<'_> {
        Selection::new(self, self.order.clone())
    }

    // ==================== Count ====================

    pub fn select_count(&self, equality: Equality) -> Result<usize> {
        self.select_count_with(equality, |_| true)
    }

    pub fn select_count_with<F>(&self, equality: Equality, filter: F) -> Result<usize>
    where
        F: FnMut(&RowRef<'_>) -> bool,
    {
        let mut count = 0;
        self.visit_matches(&equality, filter, |_| count += 1)?;
        Ok(count)
    }

    pub fn select_count_by<F>(&self, mut filter: F) -> usize
    where
        F: FnMut(&RowRef<'_>) -> bool,
    {
        self.iter().filter(|row| filter(row)).count()
    }

    // ==================== Copies ====================

    /// Table holding copies of the selected rows, in selection order.
    /// Index definitions are not copied.
    pub fn from_selection(selection: &Selection<'_>) -> DataTable {
        let source = selection.table();
        let mut table = source.empty_like();
        table.reserve(selection.len());
        for row in selection.iter() {
            table.push_unchecked(row.values().to_vec());
        }
        table
    }

    /// Copy holding the rows matching `filter`, with the same indexes
    pub fn filtered_clone<F>(&self, mut filter: F) -> Result<DataTable>
    where
        F: FnMut(&RowRef<'_>) -> bool,
    {
        let mut table = self.empty_like();
        for index in self.indexes.unique_indexes() {
            table
                .indexes
                .add_unique(index.positions().to_vec(), &table.pool, &[])?;
        }
        for index in self.indexes.multi_indexes() {
            table
                .indexes
                .add_multi(index.positions().to_vec(), &table.pool, &[]);
        }
        for row in self.iter().filter(|row| filter(row)) {
            table.add(row.to_row())?;
        }
        Ok(table)
    }

    /// Table over a subset of columns holding the projected rows that match
    /// `filter`
    ///
    /// # Example
    /// ```ignore
    /// let names = table.project((STR_COL,), |row| row[&INT_COL] > 0)?;
    /// ```
    pub fn project<S, F>(&self, columns: S, filter: F) -> Result<DataTable>
    where
        S: ColumnSet,
        F: FnMut(&RowRef<'_>) -> bool,
    {
        self.project_rows(&columns, filter, false)
    }

    /// Like `project`, keeping one row per distinct projected tuple
    pub fn project_distinct<S, F>(&self, columns: S, filter: F) -> Result<DataTable>
    where
        S: ColumnSet,
        F: FnMut(&RowRef<'_>) -> bool,
    {
        self.project_rows(&columns, filter, true)
    }

    fn project_rows<S, F>(&self, columns: &S, mut filter: F, distinct: bool) -> Result<DataTable>
    where
        S: ColumnSet,
        F: FnMut(&RowRef<'_>) -> bool,
    {
        let positions = self.columns.resolve_set(columns)?;
        let infos: Vec<ColumnInfo> = positions
            .iter()
            .filter_map(|&p| self.columns.get(p).cloned())
            .collect();
        let mut table = DataTable::with_settings(
            ColumnList::from_columns(infos)?,
            self.settings.clone(),
        )?;
        let mut seen = AHashSet::new();
        for row in self.iter().filter(|row| filter(row)) {
            let values: Vec<Value> = positions.iter().map(|&p| row.values()[p].clone()).collect();
            if distinct && !seen.insert(values.clone()) {
                continue;
            }
            table.push_unchecked(values);
        }
        Ok(table)
    }

    /// Append values known to fit the column list, on a table without
    /// unique indexes
    fn push_unchecked(&mut self, values: Vec<Value>) {
        let id = self.pool.allocate(super::raw_pool::Raw::new(values));
        self.indexes.insert_row(&self.pool, id);
        self.order.push(id);
        self.renumber(self.order.len() - 1);
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::config::DataSettings;
    use crate::table::DataTable;
    use crate::types::{Column, ColumnList, Equality};

    const INT_COL: Column<i64> = Column::new("intCol");
    const DBL_COL: Column<f64> = Column::new("dblCol");
    const STR_COL: Column<String> = Column::new("strCol");

    fn table() -> DataTable {
        DataTable::with_columns([INT_COL.info(), DBL_COL.info(), STR_COL.info()]).unwrap()
    }

    fn ints(selection: &crate::table::Selection<'_>) -> Vec<i64> {
        selection.column_items(&INT_COL).unwrap().copied().collect()
    }

    #[test]
    fn test_select_scan_and_index_agree() {
        let mut table = table();
        for i in 0..20 {
            table
                .add_row([
                    INT_COL.assign(i % 4),
                    DBL_COL.assign((i % 3) as f64),
                    STR_COL.assign(format!("s{}", i % 5)),
                ])
                .unwrap();
        }
        let equality = INT_COL.equals(1) & DBL_COL.equals(2.0);
        let scanned = table.select(equality.clone()).unwrap().into_row_ids();

        table.add_multi_hash_index(INT_COL).unwrap();
        let mut indexed = table.select(equality.clone()).unwrap().into_row_ids();
        indexed.sort();
        let mut expected = scanned.clone();
        expected.sort();
        assert_eq!(indexed, expected);
        assert_eq!(table.select_count(equality).unwrap(), scanned.len());
    }

    #[test]
    fn test_select_variants() {
        let mut table = table();
        for i in 0..10 {
            table
                .add_row([INT_COL.assign(i), DBL_COL.assign(0.5 * (i % 2) as f64)])
                .unwrap();
        }
        let odd = table.select(DBL_COL.equals(0.5)).unwrap();
        assert_eq!(ints(&odd), vec![1, 3, 5, 7, 9]);

        let big_odd = table
            .select_with(DBL_COL.equals(0.5), |row| row[&INT_COL] > 4)
            .unwrap();
        assert_eq!(ints(&big_odd), vec![5, 7, 9]);
        assert_eq!(table.select_by(|row| row[&INT_COL] < 3).len(), 3);
        assert_eq!(table.select_all().len(), 10);
        assert_eq!(table.select_count_by(|row| row[&INT_COL] >= 8), 2);
        assert_eq!(
            table
                .select_count_with(DBL_COL.equals(0.0), |row| row[&INT_COL] != 0)
                .unwrap(),
            4
        );
        assert_eq!(table.select_count(Equality::new()).unwrap(), 10);
    }

    #[test]
    fn test_select_errors_and_contradictions() {
        let table = table();
        let wrong_kind: Column<i32> = Column::new("intCol");
        assert!(table.select(wrong_kind.equals(1)).is_err());
        let missing: Column<i64> = Column::new("nope");
        assert!(table.select(missing.equals(1)).is_err());

        let mut table = table;
        table.add_row([INT_COL.assign(1)]).unwrap();
        assert_eq!(table.select_count(INT_COL.equals(1) & INT_COL.equals(1)).unwrap(), 1);
        assert_eq!(table.select_count(INT_COL.equals(1) & INT_COL.equals(2)).unwrap(), 0);
    }

    #[test]
    fn test_unique_index_wins_over_multi() {
        let mut table = table();
        table.add_multi_hash_index(DBL_COL).unwrap();
        table.add_unique_hash_index(INT_COL).unwrap();
        for i in 0..5 {
            table.add_row([INT_COL.assign(i), DBL_COL.assign(1.0)]).unwrap();
        }
        let selection = table.select(DBL_COL.equals(1.0) & INT_COL.equals(3)).unwrap();
        assert_eq!(ints(&selection), vec![3]);
    }

    #[test]
    fn test_equality_limit_falls_back_to_filters() {
        let columns = ColumnList::from_columns([INT_COL.info(), DBL_COL.info()]).unwrap();
        let settings = DataSettings::default().with_select_equality_max_count(1);
        let mut table = DataTable::with_settings(columns, settings).unwrap();
        table.add_unique_hash_index(DBL_COL).unwrap();
        table.add_row([INT_COL.assign(1), DBL_COL.assign(1.0)]).unwrap();
        table.add_row([INT_COL.assign(1), DBL_COL.assign(2.0)]).unwrap();
        // only the first condition is matched against indexes
        let selection = table.select(INT_COL.equals(1) & DBL_COL.equals(2.0)).unwrap();
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_random_index_and_scan_consistency() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut plain = table();
        let mut indexed = table();
        indexed.add_multi_hash_index(INT_COL).unwrap();
        indexed.add_multi_hash_index((INT_COL, STR_COL)).unwrap();
        indexed.add_multi_hash_index(DBL_COL).unwrap();

        for _ in 0..500 {
            let assignments = [
                INT_COL.assign(rng.gen_range(0..8i64)),
                DBL_COL.assign(rng.gen_range(0..4) as f64),
                STR_COL.assign(format!("k{}", rng.gen_range(0..6))),
            ];
            plain.add_row(assignments.clone()).unwrap();
            indexed.add_row(assignments).unwrap();
            if rng.gen_bool(0.1) {
                let number = rng.gen_range(0..plain.len());
                plain.remove(number).unwrap();
                indexed.remove(number).unwrap();
            }
        }

        for _ in 0..100 {
            let int = rng.gen_range(0..8i64);
            let key = format!("k{}", rng.gen_range(0..6));
            let dbl = rng.gen_range(0..4) as f64;
            let equality = match rng.gen_range(0..3) {
                0 => INT_COL.equals(int),
                1 => INT_COL.equals(int) & STR_COL.equals(key),
                _ => STR_COL.equals(key) & DBL_COL.equals(dbl) & INT_COL.equals(int),
            };
            let mut expected: Vec<usize> = plain
                .select(equality.clone())
                .unwrap()
                .iter()
                .map(|row| row.number())
                .collect();
            let mut actual: Vec<usize> = indexed
                .select(equality.clone())
                .unwrap()
                .iter()
                .map(|row| row.number())
                .collect();
            expected.sort_unstable();
            actual.sort_unstable();
            assert_eq!(actual, expected);
            assert_eq!(indexed.select_count(equality).unwrap(), expected.len());
        }
    }

    #[test]
    fn test_projection() {
        let mut table = table();
        for i in 0..6 {
            table
                .add_row([INT_COL.assign(i), STR_COL.assign(if i < 3 { "a" } else { "b" })])
                .unwrap();
        }
        let projected = table.project((STR_COL,), |row| row[&INT_COL] > 0).unwrap();
        assert_eq!(projected.len(), 5);
        assert_eq!(projected.column_list().len(), 1);
        assert!(!projected.contains_column(&INT_COL));

        let distinct = table.project_distinct(STR_COL, |_| true).unwrap();
        let keys: Vec<String> = distinct.column_items(&STR_COL).unwrap().cloned().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_copies() {
        let mut table = table();
        table.add_unique_hash_index(INT_COL).unwrap();
        for i in 0..6 {
            table.add_row([INT_COL.assign(i)]).unwrap();
        }

        let evens = table.filtered_clone(|row| row[&INT_COL] % 2 == 0).unwrap();
        assert_eq!(evens.len(), 3);
        assert!(evens.get_unique_hash_index(INT_COL).is_some());
        let mut evens = evens;
        assert!(evens.add_row([INT_COL.assign(2)]).is_err());

        let selection = table.select_by(|row| row[&INT_COL] > 3);
        let copy = DataTable::from_selection(&selection);
        assert_eq!(copy.len(), 2);
        assert!(copy.get_unique_hash_index(INT_COL).is_none());

        let mut clone = table.clone();
        assert!(clone.add_row([INT_COL.assign(5)]).is_err());
        clone.add_row([INT_COL.assign(6)]).unwrap();
        assert_eq!(table.len(), 6);
        assert_eq!(clone.select_count(INT_COL.equals(6)).unwrap(), 1);
    }
}
