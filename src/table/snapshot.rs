//! Saving and loading whole tables
//!
//! File layout (little endian):
//!
//! ```text
//! | magic "MOMO" | version u32 | crc32 u32 | payload len u64 | payload (bincode) |
//! ```
//!
//! The payload is a [`TableSnapshot`]: settings, column list, rows in table
//! order and index definitions. Indexes are rebuilt on load.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::DataSettings;
use crate::error::{DataError, Result};
use crate::index::IndexKind;
use crate::types::{ColumnInfo, ColumnList, Value};

use super::core::DataTable;

const SNAPSHOT_MAGIC: &[u8; 4] = b"MOMO";
const SNAPSHOT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Index definition stored in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub kind: IndexKind,
    /// Key column names, in column list order
    pub columns: Vec<String>,
}

/// Serializable image of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub settings: DataSettings,
    pub columns: ColumnList,
    pub rows: Vec<Vec<Value>>,
    pub indexes: Vec<IndexDefinition>,
}

impl DataTable {
    pub fn to_snapshot(&self) -> TableSnapshot {
        let definition = |kind, positions: &[usize]| IndexDefinition {
            kind,
            columns: self.column_names(positions),
        };
        let indexes = self
            .indexes
            .unique_indexes()
            .map(|index| definition(IndexKind::UniqueHash, index.positions()))
            .chain(
                self.indexes
                    .multi_indexes()
                    .map(|index| definition(IndexKind::MultiHash, index.positions())),
            )
            .collect();
        TableSnapshot {
            settings: self.settings.clone(),
            columns: (*self.columns).clone(),
            rows: self.iter().map(|row| row.values().to_vec()).collect(),
            indexes,
        }
    }

    /// Rebuild a table. Fails if a row does not fit the column list or
    /// breaks a unique index.
    pub fn from_snapshot(snapshot: TableSnapshot) -> Result<DataTable> {
        let mut table = DataTable::with_settings(snapshot.columns, snapshot.settings)?;
        for definition in &snapshot.indexes {
            let infos: Vec<ColumnInfo> = definition
                .columns
                .iter()
                .map(|name| {
                    table
                        .columns
                        .position(name)
                        .and_then(|p| table.columns.get(p).cloned())
                        .ok_or_else(|| DataError::ColumnNotFound(name.clone()))
                })
                .collect::<Result<_>>()?;
            match definition.kind {
                IndexKind::UniqueHash => {
                    table.add_unique_hash_index(infos)?;
                }
                IndexKind::MultiHash => {
                    table.add_multi_hash_index(infos)?;
                }
            }
        }
        table.reserve(snapshot.rows.len());
        for values in snapshot.rows {
            table.columns.validate_values(&values)?;
            let row = super::row::Row::from_parts(table.columns.clone(), values);
            table.add(row)?;
        }
        Ok(table)
    }

    /// Write the table to `path`, replacing any existing file
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let payload = bincode::serialize(&self.to_snapshot())?;
        let crc = crc32fast::hash(&payload);

        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(SNAPSHOT_MAGIC)?;
        writer.write_all(&SNAPSHOT_VERSION.to_le_bytes())?;
        writer.write_all(&crc.to_le_bytes())?;
        writer.write_all(&(payload.len() as u64).to_le_bytes())?;
        writer.write_all(&payload)?;
        writer.flush()?;

        tracing::debug!(path = %path.display(), rows = self.len(), bytes = payload.len(), "snapshot saved");
        Ok(())
    }

    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<DataTable> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        if data.len() < HEADER_LEN {
            return Err(DataError::Corruption(format!(
                "snapshot too short: {} bytes",
                data.len()
            )));
        }
        if &data[0..4] != SNAPSHOT_MAGIC {
            return Err(DataError::Corruption("bad snapshot magic".to_string()));
        }
        let version = read_u32(&data[4..8]);
        if version != SNAPSHOT_VERSION {
            return Err(DataError::Corruption(format!(
                "unsupported snapshot version {}",
                version
            )));
        }
        let stored_crc = read_u32(&data[8..12]);
        let mut len_buf = [0u8; 8];
        len_buf.copy_from_slice(&data[12..HEADER_LEN]);
        let len = u64::from_le_bytes(len_buf) as usize;

        let payload = &data[HEADER_LEN..];
        if payload.len() != len {
            return Err(DataError::Corruption(format!(
                "snapshot payload length {} but header says {}",
                payload.len(),
                len
            )));
        }
        let computed_crc = crc32fast::hash(payload);
        if computed_crc != stored_crc {
            tracing::warn!(path = %path.display(), stored_crc, computed_crc, "snapshot checksum mismatch");
            return Err(DataError::Corruption("snapshot checksum mismatch".to_string()));
        }

        let snapshot: TableSnapshot = bincode::deserialize(payload)?;
        let table = DataTable::from_snapshot(snapshot)?;
        tracing::debug!(path = %path.display(), rows = table.len(), "snapshot loaded");
        Ok(table)
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}
