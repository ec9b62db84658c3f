//! Typed columns and the expressions built from them
//!
//! A [`Column`] is a named, typed handle declared once (usually as a `const`)
//! and used both to build rows and to query them:
//!
//! ```ignore
//! const INT_COL: Column<i64> = Column::new("intCol");
//! const STR_COL: Column<String> = Column::new("strCol");
//!
//! table.add_row([STR_COL.assign("b"), INT_COL.assign(1)])?;
//! let selection = table.select(INT_COL.equals(1) & STR_COL.equals("b"))?;
//! ```

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::ops::BitAnd;

use super::{DataItem, Value, ValueKind};

/// Named, typed column handle. Identity is `(name, T::KIND)`.
pub struct Column<T> {
    name: &'static str,
    _item: PhantomData<fn() -> T>,
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Column<T> {}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Column").field(&self.name).finish()
    }
}

impl<T: DataItem> Column<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _item: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> ValueKind {
        T::KIND
    }

    /// Schema entry for this column
    pub fn info(&self) -> ColumnInfo {
        ColumnInfo::new(self.name, T::KIND)
    }

    /// Schema entry flagged mutable: values may be changed in place, but the
    /// column cannot be indexed.
    pub fn mutable(&self) -> ColumnInfo {
        self.info().into_mutable()
    }

    /// `column = value`
    pub fn assign(&self, item: impl Into<T>) -> Assignment {
        let item: T = item.into();
        Assignment {
            column: Cow::Borrowed(self.name),
            value: item.into_value(),
        }
    }

    /// `column == value`
    pub fn equals(&self, item: impl Into<T>) -> Equality {
        Equality::new().and(self, item)
    }
}

/// Untyped column description stored in a [`ColumnList`](super::ColumnList)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ValueKind,
    pub mutable: bool,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            mutable: false,
        }
    }

    pub fn into_mutable(mut self) -> Self {
        self.mutable = true;
        self
    }
}

impl<T: DataItem> From<Column<T>> for ColumnInfo {
    fn from(column: Column<T>) -> Self {
        column.info()
    }
}

/// `column = value`, used to build rows
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: Cow<'static, str>,
    pub value: Value,
}

impl Assignment {
    /// Untyped assignment; the kind is checked against the column list on use
    pub fn new(column: impl Into<Cow<'static, str>>, value: Value) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }
}

/// Conjunction of `column == value` conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Equality {
    conditions: Vec<(Cow<'static, str>, Value)>,
}

impl Equality {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and<T: DataItem>(mut self, column: &Column<T>, item: impl Into<T>) -> Self {
        let item: T = item.into();
        self.conditions
            .push((Cow::Borrowed(column.name()), item.into_value()));
        self
    }

    /// Untyped condition; the kind is checked against the column list on use
    pub fn and_value(mut self, column: impl Into<Cow<'static, str>>, value: Value) -> Self {
        self.conditions.push((column.into(), value));
        self
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.conditions.iter().map(|(name, value)| (name.as_ref(), value))
    }
}

impl BitAnd for Equality {
    type Output = Equality;

    fn bitand(mut self, rhs: Equality) -> Equality {
        self.conditions.extend(rhs.conditions);
        self
    }
}

/// A set of columns naming an index: a single column, a tuple of columns,
/// or a list of [`ColumnInfo`].
pub trait ColumnSet {
    fn column_infos(&self) -> Vec<ColumnInfo>;
}

impl<T: DataItem> ColumnSet for Column<T> {
    fn column_infos(&self) -> Vec<ColumnInfo> {
        vec![self.info()]
    }
}

impl ColumnSet for ColumnInfo {
    fn column_infos(&self) -> Vec<ColumnInfo> {
        vec![self.clone()]
    }
}

impl ColumnSet for [ColumnInfo] {
    fn column_infos(&self) -> Vec<ColumnInfo> {
        self.to_vec()
    }
}

impl<const N: usize> ColumnSet for [ColumnInfo; N] {
    fn column_infos(&self) -> Vec<ColumnInfo> {
        self.to_vec()
    }
}

impl ColumnSet for Vec<ColumnInfo> {
    fn column_infos(&self) -> Vec<ColumnInfo> {
        self.clone()
    }
}

impl<S: ColumnSet + ?Sized> ColumnSet for &S {
    fn column_infos(&self) -> Vec<ColumnInfo> {
        (**self).column_infos()
    }
}

macro_rules! impl_column_set_tuple {
    ($($ty:ident $idx:tt),+) => {
        impl<$($ty: DataItem),+> ColumnSet for ($(Column<$ty>,)+) {
            fn column_infos(&self) -> Vec<ColumnInfo> {
                vec![$(self.$idx.info()),+]
            }
        }
    };
}

impl_column_set_tuple!(A 0);
impl_column_set_tuple!(A 0, B 1);
impl_column_set_tuple!(A 0, B 1, C 2);
impl_column_set_tuple!(A 0, B 1, C 2, D 3);
impl_column_set_tuple!(A 0, B 1, C 2, D 3, E 4);
impl_column_set_tuple!(A 0, B 1, C 2, D 3, E 4, F 5);
