pub mod cursor;
pub mod message;
pub mod primitive;

pub use cursor::Cursor;
pub use message::MessageHeader;
