use zerocopy::FromBytes;
use zerocopy::byteorder::big_endian::{I16 as I16BE, I32 as I32BE};

use crate::error::{Error, Result};

/// Sequential big-endian reader over one message body.
///
/// Every read borrows from the underlying region; nothing is copied.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes consumed so far, measured from the start of the region
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn read_int16(&mut self) -> Result<i16> {
        let bytes = self.take(2)?;
        let value = I16BE::read_from_bytes(bytes).map_err(|_| Error::TruncatedMessage)?;
        Ok(value.get())
    }

    pub fn read_int32(&mut self) -> Result<i32> {
        let bytes = self.take(4)?;
        let value = I32BE::read_from_bytes(bytes).map_err(|_| Error::TruncatedMessage)?;
        Ok(value.get())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::TruncatedMessage);
        }
        let bytes = &self.data[self.position..self.position + n];
        self.position += n;
        Ok(bytes)
    }
}
