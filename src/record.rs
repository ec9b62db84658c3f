//! Tables whose columns come from a plain struct
//!
//! The [`data_struct!`](crate::data_struct) macro declares a struct,
//! implements [`DataStruct`] for it and adds one [`Column`] constant per
//! field, named after the field:
//!
//! ```ignore
//! data_struct! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct Item {
//!         pub id: i64,
//!         pub name: String,
//!     }
//! }
//!
//! let mut table = DataTable::for_struct::<Item>()?;
//! table.add_unique_hash_index(Item::id)?;
//! table.add_struct(Item { id: 1, name: "one".into() })?;
//! let item: Item = table.row(0).to_struct()?;
//! let found = table.select(Item::name.equals("one"))?;
//! ```

use crate::error::{DataError, Result};
use crate::types::{Assignment, Column, ColumnInfo, ColumnList, DataItem, Value};

/// A struct stored as one table row, one column per field
pub trait DataStruct: Sized {
    /// Columns in field order
    fn column_infos() -> Vec<ColumnInfo>;

    fn into_assignments(self) -> Vec<Assignment>;

    /// Rebuild from the values of a row laid out by `columns`
    fn from_values(columns: &ColumnList, values: &[Value]) -> Result<Self>;
}

/// Field value of a `data_struct!` struct, used by the macro
#[doc(hidden)]
pub fn field_value<T: DataItem>(
    columns: &ColumnList,
    values: &[Value],
    column: &Column<T>,
) -> Result<T> {
    let position = columns.resolve(column)?;
    let value = values.get(position).ok_or_else(|| {
        DataError::InvalidArgument(format!("row has no value for column '{}'", column.name()))
    })?;
    T::from_value(value)
        .cloned()
        .ok_or_else(|| DataError::TypeMismatch {
            column: column.name().to_string(),
            expected: T::KIND,
            actual: value.kind(),
        })
}

/// Declare a struct usable as a table row. See the [module docs](crate::record).
#[macro_export]
macro_rules! data_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        #[allow(non_upper_case_globals)]
        impl $name {
            $(
                pub const $field: $crate::types::Column<$ty> =
                    $crate::types::Column::new(stringify!($field));
            )*
        }

        impl $crate::record::DataStruct for $name {
            fn column_infos() -> ::std::vec::Vec<$crate::types::ColumnInfo> {
                ::std::vec![$(Self::$field.info()),*]
            }

            fn into_assignments(self) -> ::std::vec::Vec<$crate::types::Assignment> {
                ::std::vec![$(Self::$field.assign(self.$field)),*]
            }

            fn from_values(
                columns: &$crate::types::ColumnList,
                values: &[$crate::types::Value],
            ) -> $crate::error::Result<Self> {
                Ok(Self {
                    $(
                        $field: $crate::record::field_value(columns, values, &Self::$field)?,
                    )*
                })
            }
        }
    };
}
