//! Table and container configuration
//!
//! Settings are plain serde values so they can be embedded in snapshots or
//! loaded from a JSON file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{DataError, Result};

/// Segment sizing policy of a [`SegmentedArray`](crate::containers::SegmentedArray).
///
/// - `Constant`: every segment holds `2^log_segment_len` items. Cheap index
///   math, segment count grows linearly.
/// - `Sqrt`: segment sizes grow with the array so that the number of segments
///   stays around `O(sqrt(n))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentSizing {
    Constant { log_segment_len: u32 },
    Sqrt { log_initial_len: u32 },
}

impl Default for SegmentSizing {
    fn default() -> Self {
        SegmentSizing::Constant { log_segment_len: 5 }
    }
}

impl SegmentSizing {
    /// Constant segments of `2^log_segment_len` items
    pub fn constant(log_segment_len: u32) -> Self {
        Self::Constant { log_segment_len }
    }

    /// Square-root growth starting from `2^log_initial_len` items
    pub fn sqrt(log_initial_len: u32) -> Self {
        Self::Sqrt { log_initial_len }
    }

    /// Largest shift accepted for either policy
    pub const MAX_LOG_LEN: u32 = 20;

    fn log_len(&self) -> u32 {
        match *self {
            Self::Constant { log_segment_len } => log_segment_len,
            Self::Sqrt { log_initial_len } => log_initial_len,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.log_len() > Self::MAX_LOG_LEN {
            return Err(DataError::InvalidArgument(format!(
                "segment log length {} exceeds {}",
                self.log_len(),
                Self::MAX_LOG_LEN
            )));
        }
        Ok(())
    }
}

/// Data table settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Store the current row number inside every row so that
    /// `RowRef::number` is O(1). Without it the number is found by a scan.
    pub keep_row_number: bool,

    /// Rows reserved when the table is created
    pub initial_capacity: usize,

    /// Maximum number of equality conditions matched against index column
    /// sets when choosing an index for a select. Conditions past this limit
    /// are applied as plain filters.
    pub select_equality_max_count: usize,

    /// Segment policy of the row pool
    pub rows_segment: SegmentSizing,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            keep_row_number: false,
            initial_capacity: 0,
            select_equality_max_count: 8,
            rows_segment: SegmentSizing::default(),
        }
    }
}

impl DataSettings {
    /// Small lookup tables: constant small segments, O(1) row numbers
    pub fn for_small_tables() -> Self {
        Self {
            keep_row_number: true,
            rows_segment: SegmentSizing::constant(4),
            ..Default::default()
        }
    }

    /// Large tables: sqrt segment growth keeps the segment list short
    pub fn for_large_tables() -> Self {
        Self {
            keep_row_number: false,
            initial_capacity: 1024,
            rows_segment: SegmentSizing::sqrt(5),
            ..Default::default()
        }
    }

    pub fn with_keep_row_number(mut self, keep: bool) -> Self {
        self.keep_row_number = keep;
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_select_equality_max_count(mut self, count: usize) -> Self {
        self.select_equality_max_count = count;
        self
    }

    pub fn with_rows_segment(mut self, sizing: SegmentSizing) -> Self {
        self.rows_segment = sizing;
        self
    }

    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.select_equality_max_count == 0 {
            return Err(DataError::InvalidArgument(
                "select_equality_max_count must be positive".to_string(),
            ));
        }
        self.rows_segment.validate()
    }
}
