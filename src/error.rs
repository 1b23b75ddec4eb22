use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Bad config error: {0}")]
    BadConfigError(String),

    /// A message other than DataRow or CommandComplete arrived inside a row stream
    #[error("Unexpected message type: 0x{tag:02x}")]
    UnexpectedMessage { tag: u8 },

    /// The number of decoded fields is not a multiple of the column count
    #[error("Row framing out of sync: {fields} fields for {columns} columns")]
    MisalignedRow { fields: usize, columns: usize },

    #[error("Invalid field length: {0}")]
    InvalidFieldLength(i32),

    #[error("Invalid message length: {0}")]
    InvalidMessageLength(u32),

    #[error("Message ended before the declared data")]
    TruncatedMessage,
}

pub type Result<T> = std::result::Result<T, Error>;
