use crate::{file::io::read_le, Error::OutOfBounds, Result};

/// Longest stream name allowed by ECMA-335 II.24.2.2, including the terminator
const MAX_NAME_LENGTH: usize = 32;

/// A stream header from the metadata root: where a stream lives and what it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream, relative to the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Name of the stream, e.g. `#~` or `#Strings`
    pub name: String,
}

impl StreamHeader {
    /// Parse a stream header from the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on short input and [`crate::Error::Malformed`] for
    /// an unterminated or non-ASCII name.
    pub fn from(data: &[u8]) -> Result<StreamHeader> {
        if data.len() < 9 {
            return Err(OutOfBounds);
        }

        let name_area = &data[8..data.len().min(8 + MAX_NAME_LENGTH)];
        let Some(terminator) = name_area.iter().position(|&byte| byte == 0) else {
            return Err(malformed_error!("Stream header name is not terminated"));
        };

        let name_bytes = &name_area[..terminator];
        if !name_bytes.is_ascii() {
            return Err(malformed_error!("Stream header name is not ASCII"));
        }

        Ok(StreamHeader {
            offset: read_le::<u32>(data)?,
            size: read_le::<u32>(&data[4..])?,
            name: String::from_utf8_lossy(name_bytes).into_owned(),
        })
    }

    /// Number of bytes this header occupies, including the 4-byte aligned name
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        8 + ((self.name.len() + 1 + 3) & !3)
    }
}
