//! Blocking transport. Every read blocks the calling thread until the
//! requested bytes have arrived.

mod reader;
mod stream;

pub use reader::{BlockReader, drain_message_body, read_data_row, read_message_header, read_rows};
pub use stream::Stream;
