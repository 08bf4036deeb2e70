#![cfg_attr(feature = "strict", deny(warnings))]

//! A sparse byte-range store for partially downloaded resources.
//!
//! Fetchers insert validated byte ranges as [`DenseData`] blocks into a [`SparseData`], which merges
//! overlapping and adjacent ranges into maximal runs.  Readers call [`SparseData::lookup`] to get the
//! bytes at an offset, or the length of the gap before the next known byte.  [`SparseDataCache`] holds
//! one `SparseData` per resource behind a lock and tracks the memory they use.

mod dense_data;
pub mod error;
mod interval;
mod memory;
mod sparse_data;
mod spans;

pub use dense_data::DenseData;
pub use error::SparseDataError;
pub use interval::Interval;
pub use memory::{CacheLookup, ResourceKey, SparseDataCache};
pub use sparse_data::{Extent, Lookup, OverlapPolicy, SparseData};
