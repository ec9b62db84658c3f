//! Hash indexes of a data table
//!
//! A table owns any number of unique and multi hash indexes, each defined by
//! a set of immutable columns. Handles returned to callers stay valid until
//! the index is removed.

mod hash_index;
mod manager;

pub(crate) use hash_index::HashIndex;
pub(crate) use manager::{DataIndexes, UniqueViolation};

use serde::{Deserialize, Serialize};

/// Handle of a unique hash index: at most one row per key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniqueHashIndex(pub(crate) u32);

/// Handle of a multi hash index: any number of rows per key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MultiHashIndex(pub(crate) u32);

/// Kind of an index definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    UniqueHash,
    MultiHash,
}
