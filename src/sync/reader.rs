use std::io::Read;
use std::sync::Arc;

use tracing::{debug, instrument};
use zerocopy::{FromZeros, IntoBytes};

use crate::buffer_pool::ArenaPool;
use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::protocol::message::MessageHeader;
use crate::record_block::{BlockSize, ReadRows, RecordBlock, Step, classify};

/// Read the 5-byte envelope of the next message
pub fn read_message_header<R: Read>(reader: &mut R) -> Result<MessageHeader> {
    let mut header = MessageHeader::new_zeroed();
    reader.read_exact(header.as_mut_bytes())?;
    Ok(header)
}

/// Consume and discard a message body of `bytes` bytes
pub fn drain_message_body<R: Read>(reader: &mut R, bytes: usize) -> Result<()> {
    let drained = std::io::copy(&mut reader.by_ref().take(bytes as u64), &mut std::io::sink())?;
    if drained < bytes as u64 {
        return Err(Error::IoError(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed inside a message body",
        )));
    }
    Ok(())
}

/// Read one DataRow body of `bytes` bytes into `block` and index its fields
///
/// # Panics
///
/// Panics if `bytes > block.remaining()`.
pub fn read_data_row<R: Read>(reader: &mut R, block: &mut RecordBlock, bytes: usize) -> Result<()> {
    let (region, dst) = block.prepare_data_row(bytes);
    reader.read_exact(dst)?;
    block.decode_data_row(region)
}

/// Fill `block` with DataRow messages, the first of which has a body of
/// `bytes` bytes and whose envelope has already been read.
///
/// Returns [`ReadRows::Continue`] with the body size of the next row when it
/// does not fit; its envelope has been consumed but its body has not.
/// Returns [`ReadRows::Done`] after CommandComplete has been drained.
#[instrument(skip_all)]
pub fn read_rows<R: Read>(
    reader: &mut R,
    block: &mut RecordBlock,
    mut bytes: usize,
) -> Result<ReadRows> {
    loop {
        read_data_row(reader, block, bytes)?;
        let header = read_message_header(reader)?;
        match block.next_step(&header)? {
            Step::Row(next) => bytes = next,
            Step::Full(next) => {
                debug!(
                    rows = block.row_count(),
                    used = block.used_bytes(),
                    next,
                    "record block full"
                );
                return Ok(ReadRows::Continue(next));
            }
            Step::Complete(body) => {
                drain_message_body(reader, body)?;
                debug!(
                    rows = block.row_count(),
                    used = block.used_bytes(),
                    "row stream complete"
                );
                return Ok(ReadRows::Done);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Next {
    /// The next message header has not been read yet
    Start,
    /// A DataRow envelope was read; its body is pending
    Row(usize),
    Finished,
}

/// Splits a row stream into successive [`RecordBlock`]s.
///
/// [`BlockReader::next_block`] returns the empty block once the stream is
/// complete. The iterator yields each filled block and stops after the last.
/// After any error the reader is finished: the stream position is lost.
pub struct BlockReader<R> {
    reader: R,
    columns: usize,
    size: BlockSize,
    pool: Arc<ArenaPool>,
    next: Next,
}

impl<R: Read> BlockReader<R> {
    /// A reader positioned right before the first message of the row stream,
    /// after RowDescription.
    pub fn new(reader: R, columns: usize, opts: &Opts) -> Self {
        Self {
            reader,
            columns,
            size: opts.block_size(),
            pool: Arc::clone(&opts.arena_pool),
            next: Next::Start,
        }
    }

    /// A reader that has already consumed the envelope of a DataRow whose
    /// body is `bytes` long, such as the value of [`ReadRows::Continue`].
    pub fn resume(reader: R, columns: usize, opts: &Opts, bytes: usize) -> Self {
        Self {
            next: Next::Row(bytes),
            ..Self::new(reader, columns, opts)
        }
    }

    pub fn is_finished(&self) -> bool {
        self.next == Next::Finished
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read the next block, or the empty block when no rows are left
    pub fn next_block(&mut self) -> Result<RecordBlock> {
        let result = self.fill_next();
        if result.is_err() {
            self.next = Next::Finished;
        }
        result
    }

    fn fill_next(&mut self) -> Result<RecordBlock> {
        let bytes = match self.next {
            Next::Finished => return Ok(RecordBlock::empty()),
            Next::Row(bytes) => bytes,
            Next::Start => {
                let header = read_message_header(&mut self.reader)?;
                match classify(&header, usize::MAX)? {
                    Step::Row(bytes) | Step::Full(bytes) => bytes,
                    Step::Complete(body) => {
                        drain_message_body(&mut self.reader, body)?;
                        self.next = Next::Finished;
                        return Ok(RecordBlock::empty());
                    }
                }
            }
        };

        let mut block = self.size.new_block(&self.pool, self.columns, bytes);
        self.next = match read_rows(&mut self.reader, &mut block, bytes)? {
            ReadRows::Continue(next) => Next::Row(next),
            ReadRows::Done => Next::Finished,
        };
        Ok(block)
    }
}

impl<R: Read> Iterator for BlockReader<R> {
    type Item = Result<RecordBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_block() {
            Ok(block) if !block.has_data() => None,
            other => Some(other),
        }
    }
}
