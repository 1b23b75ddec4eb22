//! Stream PostgreSQL DataRow messages into bounded record blocks.
//!
//! Rows are kept exactly as they arrived on the wire inside one arena per
//! block; fields are `(offset, len)` views into it.

pub mod arena;
pub mod buffer_pool;
pub mod constant;
pub mod error;
mod opts;
pub mod protocol;
pub mod record_block;

#[cfg(feature = "sync")]
pub mod sync;

#[cfg(feature = "tokio")]
pub mod tokio;

pub use arena::{Arena, ByteView};
pub use opts::Opts;
pub use record_block::{ReadRows, RecordBlock, Row};

#[cfg(test)]
mod opts_test;
