use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, instrument};
use zerocopy::{FromZeros, IntoBytes};

use crate::buffer_pool::ArenaPool;
use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::protocol::message::MessageHeader;
use crate::record_block::{BlockSize, ReadRows, RecordBlock, Step, classify};

/// Read the 5-byte envelope of the next message
pub async fn read_message_header<R: AsyncRead + Unpin>(reader: &mut R) -> Result<MessageHeader> {
    let mut header = MessageHeader::new_zeroed();
    reader.read_exact(header.as_mut_bytes()).await?;
    Ok(header)
}

/// Consume and discard a message body of `bytes` bytes
pub async fn drain_message_body<R: AsyncRead + Unpin>(reader: &mut R, bytes: usize) -> Result<()> {
    let mut body = (&mut *reader).take(bytes as u64);
    let drained = tokio::io::copy(&mut body, &mut tokio::io::sink()).await?;
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
pub async fn read_data_row<R: AsyncRead + Unpin>(
    reader: &mut R,
    block: &mut RecordBlock,
    bytes: usize,
) -> Result<()> {
    let (region, dst) = block.prepare_data_row(bytes);
    reader.read_exact(dst).await?;
    block.decode_data_row(region)
}

/// Fill `block` with DataRow messages, the first of which has a body of
/// `bytes` bytes and whose envelope has already been read.
///
/// See [`crate::sync::read_rows`] for the meaning of the result.
#[instrument(skip_all)]
pub async fn read_rows<R: AsyncRead + Unpin>(
    reader: &mut R,
    block: &mut RecordBlock,
    mut bytes: usize,
) -> Result<ReadRows> {
    loop {
        read_data_row(reader, block, bytes).await?;
        let header = read_message_header(reader).await?;
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
                drain_message_body(reader, body).await?;
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
    Start,
    Row(usize),
    Finished,
}

/// Splits a row stream into successive [`RecordBlock`]s.
///
/// Async counterpart of [`crate::sync::BlockReader`]. Call
/// [`BlockReader::next_block`] until it returns the empty block.
pub struct BlockReader<R> {
    reader: R,
    columns: usize,
    size: BlockSize,
    pool: Arc<ArenaPool>,
    next: Next,
}

impl<R: AsyncRead + Unpin> BlockReader<R> {
    pub fn new(reader: R, columns: usize, opts: &Opts) -> Self {
        Self {
            reader,
            columns,
            size: opts.block_size(),
            pool: Arc::clone(&opts.arena_pool),
            next: Next::Start,
        }
    }

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
    pub async fn next_block(&mut self) -> Result<RecordBlock> {
        let result = self.fill_next().await;
        if result.is_err() {
            self.next = Next::Finished;
        }
        result
    }

    async fn fill_next(&mut self) -> Result<RecordBlock> {
        let bytes = match self.next {
            Next::Finished => return Ok(RecordBlock::empty()),
            Next::Row(bytes) => bytes,
            Next::Start => {
                let header = read_message_header(&mut self.reader).await?;
                match classify(&header, usize::MAX)? {
                    Step::Row(bytes) | Step::Full(bytes) => bytes,
                    Step::Complete(body) => {
                        drain_message_body(&mut self.reader, body).await?;
                        self.next = Next::Finished;
                        return Ok(RecordBlock::empty());
                    }
                }
            }
        };

        let mut block = self.size.new_block(&self.pool, self.columns, bytes);
        self.next = match read_rows(&mut self.reader, &mut block, bytes).await? {
            ReadRows::Continue(next) => Next::Row(next),
            ReadRows::Done => Next::Finished,
        };
        Ok(block)
    }
}
