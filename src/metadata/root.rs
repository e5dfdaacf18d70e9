//! The metadata root (ECMA-335 II.24.2.1).
//!
//! ```text
//! u32     signature ("BSJB")
//! u16     major_version
//! u16     minor_version
//! u32     reserved
//! u32     length (of the version string, padded to 4)
//! u8[]    version ("v4.0.30319", NUL padded)
//! u16     flags
//! u16     streams
//! ...     stream headers
//! ```

use crate::{
    file::io::{read_le, read_le_at},
    metadata::streams::StreamHeader,
    Error::OutOfBounds,
    Result,
};

/// Magic value at the start of the metadata root
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// Upper bound for the stream count; a valid image has at most a handful
const MAX_STREAMS: u16 = 16;

/// The parsed metadata root.
#[derive(Debug, Clone)]
pub struct Root {
    /// Always [`CIL_HEADER_MAGIC`]
    pub signature: u32,
    /// Major version of the metadata format
    pub major_version: u16,
    /// Minor version of the metadata format
    pub minor_version: u16,
    /// Padded length of the version string
    pub length: u32,
    /// The runtime version string, without NUL padding
    pub version: String,
    /// Reserved flags
    pub flags: u16,
    /// The stream headers, in file order
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Parse the metadata root at the start of `data` (the whole metadata block).
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a bad signature, version string or stream table,
    /// and [`crate::Error::OutOfBounds`] if any stream lies outside `data`.
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < 20 {
            return Err(OutOfBounds);
        }

        let signature = read_le::<u32>(data)?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - 0x{:08X}",
                signature
            ));
        }

        let length = read_le::<u32>(&data[12..])?;
        let Some(version_end) = (length as usize).checked_add(16) else {
            return Err(malformed_error!(
                "Version string length causing integer overflow - {}",
                length
            ));
        };

        if version_end > data.len() {
            return Err(OutOfBounds);
        }

        let version_bytes = &data[16..version_end];
        let version_bytes = match version_bytes.iter().position(|&byte| byte == 0) {
            Some(terminator) => &version_bytes[..terminator],
            None => version_bytes,
        };

        let version = match std::str::from_utf8(version_bytes) {
            Ok(version) => version.to_string(),
            Err(_) => return Err(malformed_error!("Metadata version string is not UTF-8")),
        };

        let mut offset = version_end;
        let flags = read_le_at::<u16>(data, &mut offset)?;
        let stream_count = read_le_at::<u16>(data, &mut offset)?;
        if stream_count == 0 || stream_count > MAX_STREAMS {
            return Err(malformed_error!("Invalid stream count - {}", stream_count));
        }

        let mut stream_headers = Vec::with_capacity(stream_count as usize);
        for _ in 0..stream_count {
            if offset >= data.len() {
                return Err(OutOfBounds);
            }

            let stream = StreamHeader::from(&data[offset..])?;
            match (stream.offset as usize).checked_add(stream.size as usize) {
                Some(end) if end <= data.len() => {}
                Some(_) => return Err(OutOfBounds),
                None => {
                    return Err(malformed_error!(
                        "Stream offset and size cause integer overflow - {} + {}",
                        stream.offset,
                        stream.size
                    ))
                }
            }

            if stream_headers
                .iter()
                .any(|known: &StreamHeader| known.name == stream.name)
            {
                return Err(malformed_error!("Duplicate stream - {}", stream.name));
            }

            offset += stream.encoded_size();
            stream_headers.push(stream);
        }

        Ok(Root {
            signature,
            major_version: read_le::<u16>(&data[4..])?,
            minor_version: read_le::<u16>(&data[6..])?,
            length,
            version,
            flags,
            stream_headers,
        })
    }

    /// The data of the stream called `name`, if present.
    ///
    /// `data` must be the same metadata block the root was read from.
    #[must_use]
    pub fn stream_data<'a>(&self, data: &'a [u8], name: &str) -> Option<&'a [u8]> {
        let stream = self.stream_headers.iter().find(|stream| stream.name == name)?;
        let start = stream.offset as usize;

        data.get(start..start + stream.size as usize)
    }
}
