/// Backend message type tags
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    CommandComplete = b'C',
    DataRow = b'D',
    ErrorResponse = b'E',
    EmptyQueryResponse = b'I',
    NoticeResponse = b'N',
    ParameterStatus = b'S',
    RowDescription = b'T',
    ReadyForQuery = b'Z',
    NotificationResponse = b'A',
    PortalSuspended = b's',
}

impl MessageType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            b'C' => Self::CommandComplete,
            b'D' => Self::DataRow,
            b'E' => Self::ErrorResponse,
            b'I' => Self::EmptyQueryResponse,
            b'N' => Self::NoticeResponse,
            b'S' => Self::ParameterStatus,
            b'T' => Self::RowDescription,
            b'Z' => Self::ReadyForQuery,
            b'A' => Self::NotificationResponse,
            b's' => Self::PortalSuspended,
            _ => return None,
        })
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Size of the envelope preceding every backend message: tag + length
pub const MESSAGE_HEADER_SIZE: usize = 5;

/// Largest message body a backend may declare (1 GiB)
pub const MAX_MESSAGE_SIZE: usize = 1 << 30;

/// Length value marking a NULL field in a DataRow
pub const NULL_FIELD_LENGTH: i32 = -1;

/// Default mean record size used to presize the field list
pub const DEFAULT_RECORD_SIZE: usize = 512;

/// Default arena capacity of a record block
pub const DEFAULT_BLOCK_CAPACITY: usize = 4 << 20;
