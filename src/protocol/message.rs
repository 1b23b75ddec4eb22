use zerocopy::byteorder::big_endian::U32 as U32BE;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

#[cfg(test)]
use crate::constant::MESSAGE_HEADER_SIZE;
use crate::constant::{MAX_MESSAGE_SIZE, MessageType};
use crate::error::{Error, Result};

/// Backend message envelope (zero-copy)
///
/// Layout matches the wire:
/// - tag: 1 byte message type
/// - length: 4 bytes big-endian, counting itself but not the tag
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct MessageHeader {
    pub tag: u8,
    pub length: U32BE,
}

impl MessageHeader {
    #[cfg(test)]
    pub(crate) fn encode(tag: u8, body_size: usize) -> Self {
        Self {
            tag,
            length: U32BE::new(
                u32::try_from(body_size)
                    .ok()
                    .and_then(|size| size.checked_add(4))
                    .unwrap_or(u32::MAX),
            ),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(data: &[u8]) -> Result<&Self> {
        if data.len() < MESSAGE_HEADER_SIZE {
            return Err(Error::TruncatedMessage);
        }
        Self::ref_from_bytes(&data[..MESSAGE_HEADER_SIZE]).map_err(|_| Error::TruncatedMessage)
    }

    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_tag(self.tag)
    }

    /// Size of the body that follows the header.
    ///
    /// Lengths below 4 or bodies above [`MAX_MESSAGE_SIZE`] are rejected
    /// before anything is allocated for them.
    pub fn body_size(&self) -> Result<usize> {
        let length = self.length.get();
        length
            .checked_sub(4)
            .map(|size| size as usize)
            .filter(|size| *size <= MAX_MESSAGE_SIZE)
            .ok_or(Error::InvalidMessageLength(length))
    }
}
