//! Staging buffer for bulk region edits and the block generation hook.
#![forbid(unsafe_code)]

pub mod generate;
pub mod vmanip;

pub use generate::{BlockMakeData, FlatGenerator, Generator};
pub use vmanip::{CellState, VoxelManip};
