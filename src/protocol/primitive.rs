use crate::constant::{MAX_MESSAGE_SIZE, MessageType, NULL_FIELD_LENGTH};

/// Write 2-byte big-endian integer
pub fn write_int_2(out: &mut Vec<u8>, value: i16) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Write 4-byte big-endian integer
pub fn write_int_4(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Write a message envelope declaring `body_size` bytes of body
///
/// # Panics
///
/// Panics if `body_size > MAX_MESSAGE_SIZE`.
pub fn write_message_header(out: &mut Vec<u8>, tag: u8, body_size: usize) {
    assert!(
        body_size <= MAX_MESSAGE_SIZE,
        "message body of {body_size} bytes exceeds the protocol limit"
    );
    out.push(tag);
    // Fits: MAX_MESSAGE_SIZE + 4 < i32::MAX
    write_int_4(out, body_size as i32 + 4);
}

/// Write a complete DataRow message, `None` encoding SQL NULL
///
/// # Panics
///
/// Panics if the row has more than `i16::MAX` fields or its body exceeds
/// `MAX_MESSAGE_SIZE`.
pub fn write_data_row(out: &mut Vec<u8>, fields: &[Option<&[u8]>]) {
    assert!(
        fields.len() <= i16::MAX as usize,
        "{} fields exceed the protocol limit",
        fields.len()
    );
    write_message_header(out, MessageType::DataRow.tag(), data_row_body_size(fields));
    write_int_2(out, fields.len() as i16);
    for field in fields {
        match field {
            Some(bytes) => {
                write_int_4(out, bytes.len() as i32);
                out.extend_from_slice(bytes);
            }
            None => write_int_4(out, NULL_FIELD_LENGTH),
        }
    }
}

/// Write a CommandComplete message carrying a null-terminated command tag
pub fn write_command_complete(out: &mut Vec<u8>, command_tag: &str) {
    write_message_header(out, MessageType::CommandComplete.tag(), command_tag.len() + 1);
    out.extend_from_slice(command_tag.as_bytes());
    out.push(0);
}

/// Body size of the DataRow `write_data_row` would produce for `fields`
pub fn data_row_body_size(fields: &[Option<&[u8]>]) -> usize {
    2 + fields
        .iter()
        .map(|field| 4 + field.map_or(0, <[u8]>::len))
        .sum::<usize>()
}
