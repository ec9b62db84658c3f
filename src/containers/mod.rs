//! Low-level containers

pub mod segmented_array;

pub use segmented_array::SegmentedArray;
