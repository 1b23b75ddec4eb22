//! Async transport on tokio. Every read is a suspension point; the reads for
//! one block are still issued strictly one after another.

mod reader;
mod stream;

pub use reader::{BlockReader, drain_message_body, read_data_row, read_message_header, read_rows};
pub use stream::Stream;
