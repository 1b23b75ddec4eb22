//! Bounded blocks of DataRow messages.
//!
//! A [`RecordBlock`] owns one [`Arena`] holding raw DataRow bodies exactly as
//! they arrived from the server, plus a flat list of [`ByteView`]s pointing at
//! each field inside those bodies. Field payloads are never copied.
//!
//! The block itself does no I/O. A reader (`sync::BlockReader` or
//! `tokio::BlockReader`) drives it:
//!
//! 1. [`RecordBlock::prepare_data_row`] reserves room for the next body and
//!    hands back the region to fill from the socket.
//! 2. [`RecordBlock::decode_data_row`] indexes the fields of that body.
//! 3. [`RecordBlock::next_step`] looks at the following message header and
//!    decides whether the block keeps filling, is full, or the rows are done.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::arena::{Arena, ByteView};
use crate::buffer_pool::ArenaPool;
use crate::constant::{MessageType, NULL_FIELD_LENGTH};
use crate::error::{Error, Result};
use crate::protocol::cursor::Cursor;
use crate::protocol::message::MessageHeader;

/// Outcome of filling a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRows {
    /// The next DataRow body does not fit. Start a new block with this body size.
    /// None of its bytes have been consumed from the stream.
    Continue(usize),
    /// CommandComplete was read and drained. No more rows.
    Done,
}

/// What to do after peeking the next message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Another DataRow of this body size fits into the block
    Row(usize),
    /// Another DataRow of this body size does not fit
    Full(usize),
    /// CommandComplete with this body size, which must be drained
    Complete(usize),
}

/// A block of data rows with zero-copy field views.
///
/// Not `Clone`: a copy would either duplicate the arena or leave views pointing
/// at the wrong storage. Move it to the consumer instead.
///
/// `column_count() == 0` marks the empty block meaning "no data, no more to
/// come".
#[derive(Debug)]
pub struct RecordBlock {
    columns: usize,
    fields: Vec<ByteView>,
    arena: Arena,
}

impl RecordBlock {
    /// Create a block holding up to `bytes` bytes of DataRow bodies.
    ///
    /// `record_size` is the expected mean body size. It only presizes the
    /// field list.
    pub fn new(column_count: usize, record_size: usize, bytes: usize) -> Self {
        Self::with_arena(column_count, record_size, Arena::new(bytes))
    }

    /// Like [`RecordBlock::new`] but with arena storage recycled through `pool`
    pub fn with_pool(
        pool: &Arc<ArenaPool>,
        column_count: usize,
        record_size: usize,
        bytes: usize,
    ) -> Self {
        Self::with_arena(column_count, record_size, Arena::pooled(pool, bytes))
    }

    fn with_arena(column_count: usize, record_size: usize, arena: Arena) -> Self {
        let expected_records = arena.capacity().div_ceil(record_size.max(1));
        Self {
            columns: column_count,
            fields: Vec::with_capacity(column_count * expected_records),
            arena,
        }
    }

    /// The empty block
    pub fn empty() -> Self {
        Self {
            columns: 0,
            fields: Vec::new(),
            arena: Arena::new(0),
        }
    }

    /// `true` if the block carries rows, `false` for the empty block
    pub fn has_data(&self) -> bool {
        self.columns > 0
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }

    /// Bytes of row data still available in this block
    pub fn remaining(&self) -> usize {
        self.arena.remaining()
    }

    /// Bytes of row data used so far
    pub fn used_bytes(&self) -> usize {
        self.arena.allocated()
    }

    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Reserve `bytes` for the next DataRow body and return the region to fill.
    ///
    /// # Panics
    ///
    /// Panics if `bytes > self.remaining()`. The fill loop never asks for more
    /// than fits; it returns [`ReadRows::Continue`] instead.
    pub fn prepare_data_row(&mut self, bytes: usize) -> (ByteView, &mut [u8]) {
        let region = self.arena.allocate(bytes);
        (region, self.arena.get_mut(region))
    }

    /// Index the fields of a DataRow body previously filled through
    /// [`RecordBlock::prepare_data_row`].
    ///
    /// On error no fields of this row are kept, but the block should be
    /// considered unusable: the stream is out of sync.
    pub fn decode_data_row(&mut self, region: ByteView) -> Result<()> {
        let start = self.fields.len();
        if let Err(e) = self.decode_fields(region) {
            self.fields.truncate(start);
            return Err(e);
        }
        trace!(
            fields = self.fields.len() - start,
            bytes = region.len(),
            "decoded data row"
        );
        if self.columns == 0 || self.fields.len() % self.columns != 0 {
            let fields = self.fields.len();
            self.fields.truncate(start);
            return Err(Error::MisalignedRow {
                fields,
                columns: self.columns,
            });
        }
        Ok(())
    }

    fn decode_fields(&mut self, region: ByteView) -> Result<()> {
        let mut cursor = Cursor::new(self.arena.get(region));
        // The embedded field count is trusted, only the framing matters
        cursor.read_int16()?;
        while cursor.remaining() > 0 {
            let len = cursor.read_int32()?;
            if len == NULL_FIELD_LENGTH {
                self.fields.push(ByteView::NULL);
                continue;
            }
            let len = usize::try_from(len).map_err(|_| Error::InvalidFieldLength(len))?;
            let offset = cursor.position();
            cursor.read_bytes(len)?;
            self.fields.push(region.slice(offset, len));
        }
        Ok(())
    }

    /// Decide how to continue given the header of the message after a DataRow
    pub fn next_step(&self, header: &MessageHeader) -> Result<Step> {
        classify(header, self.remaining())
    }

    /// The field views of every row held, row after row
    pub fn fields(&self) -> &[ByteView] {
        &self.fields
    }

    /// Resolve a field view of this block. `None` is SQL NULL.
    pub fn field(&self, view: ByteView) -> Option<&[u8]> {
        if view.is_null() {
            None
        } else {
            Some(self.arena.get(view))
        }
    }

    pub fn row_count(&self) -> usize {
        self.fields.len().checked_div(self.columns).unwrap_or(0)
    }

    pub fn rows(&self) -> Rows<'_> {
        Rows {
            arena: &self.arena,
            chunks: self.fields.chunks_exact(self.columns.max(1)),
        }
    }
}

impl Default for RecordBlock {
    fn default() -> Self {
        Self::empty()
    }
}

/// Classify the header of a message in a row stream against `remaining`
/// bytes of block capacity.
pub fn classify(header: &MessageHeader, remaining: usize) -> Result<Step> {
    match header.message_type() {
        Some(MessageType::DataRow) => {
            let bytes = header.body_size()?;
            if bytes <= remaining {
                Ok(Step::Row(bytes))
            } else {
                Ok(Step::Full(bytes))
            }
        }
        Some(MessageType::CommandComplete) => Ok(Step::Complete(header.body_size()?)),
        _ => {
            let tag = header.tag;
            warn!(tag, "unexpected message in row stream");
            Err(Error::UnexpectedMessage { tag })
        }
    }
}

/// Block sizing used when a reader starts new blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSize {
    pub record_size: usize,
    pub capacity: usize,
}

impl BlockSize {
    /// Start a block whose first row body is `first_row` bytes.
    ///
    /// A row larger than the configured capacity gets a block of exactly its
    /// own size, with room for one row of field views. That storage bypasses
    /// `pool` so oversize buffers are never recycled.
    pub fn new_block(
        &self,
        pool: &Arc<ArenaPool>,
        column_count: usize,
        first_row: usize,
    ) -> RecordBlock {
        if first_row > self.capacity {
            return RecordBlock::new(column_count, first_row, first_row);
        }
        RecordBlock::with_pool(pool, column_count, self.record_size, self.capacity)
    }
}

/// Iterator over the rows of a block
#[derive(Debug, Clone)]
pub struct Rows<'a> {
    arena: &'a Arena,
    chunks: std::slice::ChunksExact<'a, ByteView>,
}

impl<'a> Iterator for Rows<'a> {
    type Item = Row<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.chunks.next().map(|fields| Row {
            arena: self.arena,
            fields,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Rows<'_> {}

/// One row of a block
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    arena: &'a Arena,
    fields: &'a [ByteView],
}

impl<'a> Row<'a> {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `None` if `idx` is out of range, `Some(None)` for SQL NULL
    pub fn get(&self, idx: usize) -> Option<Option<&'a [u8]>> {
        let view = *self.fields.get(idx)?;
        Some(self.resolve(view))
    }

    pub fn is_null(&self, idx: usize) -> bool {
        self.fields.get(idx).is_some_and(ByteView::is_null)
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&'a [u8]>> + use<'a> {
        let row = *self;
        self.fields.iter().map(move |view| row.resolve(*view))
    }

    fn resolve(&self, view: ByteView) -> Option<&'a [u8]> {
        (!view.is_null()).then(|| self.arena.get(view))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::protocol::primitive::{data_row_body_size, write_data_row};

    /// Body of a DataRow, without the envelope
    fn body(fields: &[Option<&[u8]>]) -> Vec<u8> {
        let mut out = Vec::new();
        write_data_row(&mut out, fields);
        out.split_off(5)
    }

    fn push_row(block: &mut RecordBlock, body: &[u8]) -> Result<()> {
        let (region, dst) = block.prepare_data_row(body.len());
        dst.copy_from_slice(body);
        block.decode_data_row(region)
    }

    fn values(block: &RecordBlock) -> Vec<Option<Vec<u8>>> {
        block
            .fields()
            .iter()
            .map(|view| block.field(*view).map(<[u8]>::to_vec))
            .collect()
    }

    #[test]
    fn decodes_values_and_nulls() {
        let mut block = RecordBlock::new(2, 64, 256);
        push_row(&mut block, &body(&[Some(b"ab".as_slice()), None])).unwrap();

        assert_eq!(values(&block), vec![Some(b"ab".to_vec()), None]);
        let null = block.fields()[1];
        assert!(null.is_null());
        assert_eq!(null.len(), 0);
        assert_eq!(block.row_count(), 1);
    }

    #[test]
    fn fields_point_into_arena() {
        let mut block = RecordBlock::new(1, 64, 64);
        let row = body(&[Some(b"hello".as_slice())]);
        push_row(&mut block, &row).unwrap();
        // field count (2) + length (4) precede the payload
        let view = block.fields()[0];
        assert_eq!(view.offset(), 6);
        assert_eq!(block.used_bytes(), row.len());
    }

    #[test]
    fn empty_value_differs_from_null() {
        let mut block = RecordBlock::new(2, 64, 64);
        push_row(&mut block, &body(&[Some(b"".as_slice()), None])).unwrap();
        assert_eq!(values(&block), vec![Some(Vec::new()), None]);
    }

    #[test]
    fn accounting_holds_across_rows() {
        let mut block = RecordBlock::new(1, 16, 100);
        assert_eq!(block.remaining() + block.used_bytes(), 100);
        for value in [b"a".as_slice(), b"bcd".as_slice(), b"".as_slice()] {
            push_row(&mut block, &body(&[Some(value)])).unwrap();
            assert_eq!(block.remaining() + block.used_bytes(), 100);
            assert_eq!(block.fields().len() % block.column_count(), 0);
        }
        assert_eq!(block.row_count(), 3);
    }

    #[test]
    fn misaligned_row_is_rejected() {
        let mut block = RecordBlock::new(2, 64, 256);
        let err = push_row(&mut block, &body(&[Some(b"x".as_slice())])).unwrap_err();
        assert!(matches!(
            err,
            Error::MisalignedRow {
                fields: 1,
                columns: 2
            }
        ));
        assert!(block.fields().is_empty());
    }

    #[test]
    fn negative_length_is_rejected() {
        let mut block = RecordBlock::new(1, 64, 64);
        let row = [0, 1, 0xff, 0xff, 0xff, 0xfe];
        let err = push_row(&mut block, &row).unwrap_err();
        assert!(matches!(err, Error::InvalidFieldLength(-2)));
        assert!(block.fields().is_empty());
    }

    #[test]
    fn field_overrunning_body_is_truncated() {
        let mut block = RecordBlock::new(1, 64, 64);
        let row = [0, 1, 0, 0, 0, 9, b'a', b'b'];
        let err = push_row(&mut block, &row).unwrap_err();
        assert!(matches!(err, Error::TruncatedMessage));
    }

    #[test]
    fn embedded_field_count_is_not_checked() {
        let mut block = RecordBlock::new(1, 64, 64);
        let mut row = body(&[Some(b"z".as_slice())]);
        row[1] = 7;
        push_row(&mut block, &row).unwrap();
        assert_eq!(values(&block), vec![Some(b"z".to_vec())]);
    }

    #[test]
    fn empty_block() {
        let block = RecordBlock::default();
        assert!(!block.has_data());
        assert_eq!(block.remaining(), 0);
        assert_eq!(block.used_bytes(), 0);
        assert_eq!(block.row_count(), 0);
        assert_eq!(block.rows().count(), 0);
        assert!(RecordBlock::new(3, 512, 1024).has_data());
    }

    #[test]
    #[should_panic(expected = "exceeds")]
    fn preparing_more_than_remaining_panics() {
        let mut block = RecordBlock::new(1, 8, 10);
        block.prepare_data_row(11);
    }

    #[test]
    fn next_step_decisions() {
        let mut block = RecordBlock::new(1, 8, 20);
        push_row(&mut block, &body(&[Some(b"abcd".as_slice())])).unwrap();
        assert_eq!(block.remaining(), 10);

        let fits = MessageHeader::encode(b'D', 10);
        assert_eq!(block.next_step(&fits).unwrap(), Step::Row(10));
        let too_big = MessageHeader::encode(b'D', 50);
        assert_eq!(block.next_step(&too_big).unwrap(), Step::Full(50));
        let complete = MessageHeader::encode(b'C', 9);
        assert_eq!(block.next_step(&complete).unwrap(), Step::Complete(9));
        let error = MessageHeader::encode(b'E', 30);
        assert!(matches!(
            block.next_step(&error),
            Err(Error::UnexpectedMessage { tag: b'E' })
        ));
        // Deciding never allocates
        assert_eq!(block.remaining(), 10);
    }

    #[test]
    fn rows_iterate_in_order() {
        let mut block = RecordBlock::new(2, 16, 256);
        push_row(&mut block, &body(&[Some(b"1".as_slice()), Some(b"one".as_slice())])).unwrap();
        push_row(&mut block, &body(&[Some(b"2".as_slice()), None])).unwrap();

        let rows: Vec<Vec<Option<&[u8]>>> = block.rows().map(|row| row.iter().collect()).collect();
        assert_eq!(
            rows,
            vec![
                vec![Some(b"1".as_slice()), Some(b"one".as_slice())],
                vec![Some(b"2".as_slice()), None],
            ]
        );

        let second = block.rows().nth(1).unwrap();
        assert_eq!(second.len(), 2);
        assert!(second.is_null(1));
        assert_eq!(second.get(1), Some(None));
        assert_eq!(second.get(2), None);
    }

    #[test]
    fn field_list_is_presized_from_hint() {
        let block = RecordBlock::new(3, 100, 1000);
        assert!(block.fields.capacity() >= 30);
        let body_size = data_row_body_size(&[None, None, None]);
        assert_eq!(body_size, 14);
    }

    #[test]
    fn pooled_block_recycles_arena() {
        let pool = Arc::new(ArenaPool::new(2));
        let block = RecordBlock::with_pool(&pool, 1, 16, 128);
        assert_eq!(block.capacity(), 128);
        drop(block);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn oversize_row_gets_its_own_capacity() {
        let pool = Arc::new(ArenaPool::new(2));
        let size = BlockSize {
            record_size: 16,
            capacity: 64,
        };

        let regular = size.new_block(&pool, 2, 10);
        assert_eq!(regular.capacity(), 64);
        assert!(regular.fields.capacity() >= 8);

        let oversize = size.new_block(&pool, 2, 500);
        assert_eq!(oversize.capacity(), 500);
        drop(regular);
        drop(oversize);
        // Only the regular block came from the pool
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn oversize_block_reserves_views_for_one_row() {
        let pool = Arc::new(ArenaPool::new(2));
        let size = BlockSize {
            record_size: 512,
            capacity: 4 << 10,
        };
        let block = size.new_block(&pool, 10, 1 << 20);
        assert_eq!(block.capacity(), 1 << 20);
        assert!(block.fields.capacity() >= 10);
        assert!(block.fields.capacity() < 20);
    }
}
