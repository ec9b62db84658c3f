//! momo data tables
//!
//! In-memory tables of typed rows with unique and multi hash indexes.
//!
//! ## Features
//! - Typed columns declared once as constants: `Column<i64>`, `Column<String>`, ...
//! - Unique hash indexes (one row per key) and multi hash indexes (many rows per key)
//! - Equality selects answered through the best fitting index, scans otherwise
//! - Non-failing `try_*` variants that report unique conflicts as values
//! - Stable row ids, segmented row storage and framed snapshot files
//!
//! ## Architecture
//! - `types`: cell values, columns and column lists
//! - `containers`: segmented array with stable item addresses
//! - `index`: hash indexes and the per-table index set
//! - `table`: the data table, selections and snapshots
//! - `record`: tables whose columns come from a struct
//!
//! ## Example
//! ```ignore
//! use momo::{Column, DataTable};
//!
//! const INT_COL: Column<i64> = Column::new("intCol");
//! const STR_COL: Column<String> = Column::new("strCol");
//!
//! let mut table = DataTable::with_columns([INT_COL.info(), STR_COL.info()])?;
//! table.add_multi_hash_index(STR_COL)?;
//! table.add_row([INT_COL.assign(1), STR_COL.assign("a")])?;
//! let selection = table.select(STR_COL.equals("a"))?;
//! ```

pub mod config;
pub mod containers;
pub mod error;
pub mod index;
pub mod record;
pub mod table;
pub mod types;

pub use config::{DataSettings, SegmentSizing};
pub use containers::SegmentedArray;
pub use error::{DataError, Result};
pub use index::{IndexKind, MultiHashIndex, UniqueHashIndex};
pub use record::DataStruct;
pub use table::{
    DataTable, IndexDefinition, Row, RowId, RowRef, Selection, TableSnapshot, TryResult,
};
pub use types::{
    Assignment, Column, ColumnInfo, ColumnList, ColumnSet, DataItem, Equality, Value, ValueKind,
};
