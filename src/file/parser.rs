//! Sequential cursor over a byte slice.
//!
//! [`Parser`] is used wherever metadata is encoded as a stream rather than at fixed offsets:
//! blob heap entries, method signatures and custom attribute values. It understands the
//! ECMA-335 compressed integer encoding (II.23.2) and the `SerString` format used by custom
//! attribute blobs (II.23.3).
//!
//! # Examples
//!
//! ```rust,ignore
//! use dotinfo::file::parser::Parser;
//!
//! let mut parser = Parser::new(&[0x81, 0x00, 0x03, b'a', b'b', b'c']);
//! assert_eq!(parser.read_compressed_uint()?, 0x100);
//! assert_eq!(parser.read_ser_string()?, Some("abc".to_string()));
//! # Ok::<(), dotinfo::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, CilIO},
    Result,
};

/// A forward-only reader with bounds-checked access.
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser positioned at the start of `data`
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Current read position
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Number of bytes left to read
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Skip a single byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn advance(&mut self) -> Result<()> {
        if self.position >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position += 1;
        Ok(())
    }

    /// Look at the next byte without consuming it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data
            .get(self.position)
            .copied()
            .ok_or(out_of_bounds_error!())
    }

    /// Read a little-endian primitive.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if not enough data is left.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read `length` raw bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if not enough data is left.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(length)
            .ok_or(out_of_bounds_error!())?;

        if end > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Read a compressed unsigned integer (ECMA-335 II.23.2).
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated input, or
    /// [`crate::Error::Malformed`] for an invalid leading byte.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_le::<u8>()?;

        // 1-byte encoding: 0xxxxxxx
        if (first_byte & 0x80) == 0 {
            return Ok(u32::from(first_byte));
        }

        // 2-byte encoding: 10xxxxxx xxxxxxxx
        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_le::<u8>()?;
            return Ok(((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte));
        }

        // 4-byte encoding: 110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx
        if (first_byte & 0xE0) == 0xC0 {
            let b1 = u32::from(self.read_le::<u8>()?);
            let b2 = u32::from(self.read_le::<u8>()?);
            let b3 = u32::from(self.read_le::<u8>()?);
            return Ok(((u32::from(first_byte) & 0x1F) << 24) | (b1 << 16) | (b2 << 8) | b3);
        }

        Err(malformed_error!("Invalid compressed uint - {}", first_byte))
    }

    /// Read a compressed signed integer (ECMA-335 II.23.2), as used for array lower bounds.
    ///
    /// # Errors
    /// Returns an error on truncated input or an invalid leading byte.
    pub fn read_compressed_int(&mut self) -> Result<i32> {
        let first_byte = self.peek_byte()?;
        let encoded = self.read_compressed_uint()?;

        // The sign is stored in the lowest bit, the value is rotated left by one
        let (bias, value) = match first_byte {
            byte if byte & 0x80 == 0 => (0x40_i32, (encoded >> 1) as i32),
            byte if byte & 0xC0 == 0x80 => (0x2000_i32, (encoded >> 1) as i32),
            _ => (0x1000_0000_i32, (encoded >> 1) as i32),
        };

        if encoded & 1 == 1 {
            Ok(value - bias)
        } else {
            Ok(value)
        }
    }

    /// Read a `SerString`: a compressed length followed by UTF-8 bytes. The single byte `0xFF`
    /// encodes a null string and yields `None`.
    ///
    /// # Errors
    /// Returns an error on truncated input or invalid UTF-8.
    pub fn read_ser_string(&mut self) -> Result<Option<String>> {
        if self.peek_byte()? == 0xFF {
            self.advance()?;
            return Ok(None);
        }

        let length = self.read_compressed_uint()? as usize;
        let start = self.position;
        let bytes = self.read_bytes(length)?;

        match std::str::from_utf8(bytes) {
            Ok(string) => Ok(Some(string.to_string())),
            Err(error) => Err(malformed_error!(
                "Invalid UTF-8 string at offset {}-{}: {}",
                start,
                self.position,
                error
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressed_uint() {
        #[rustfmt::skip]
        let data = [
            0x03,
            0x7F,
            0x80, 0x80,
            0xAE, 0x57,
            0xBF, 0xFF,
            0xC0, 0x00, 0x40, 0x00,
            0xDF, 0xFF, 0xFF, 0xFF,
        ];

        let mut parser = Parser::new(&data);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x03);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x7F);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x80);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x2E57);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x3FFF);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x4000);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x1FFF_FFFF);
        assert_eq!(parser.remaining(), 0);
    }

    #[test]
    fn compressed_uint_invalid() {
        let mut parser = Parser::new(&[0xE0, 0x00, 0x00, 0x00]);
        assert!(matches!(
            parser.read_compressed_uint(),
            Err(crate::Error::Malformed { .. })
        ));

        let mut parser = Parser::new(&[0x80]);
        assert!(matches!(
            parser.read_compressed_uint(),
            Err(crate::Error::OutOfBounds)
        ));
    }

    #[test]
    fn compressed_int() {
        // Examples from ECMA-335 II.23.2
        #[rustfmt::skip]
        let data = [
            0x06,
            0x7B,
            0x80, 0x80,
            0x01,
            0xC0, 0x00, 0x40, 0x00,
            0x80, 0x01,
            0xDF, 0xFF, 0xFF, 0xFE,
            0xC0, 0x00, 0x00, 0x01,
        ];

        let mut parser = Parser::new(&data);
        assert_eq!(parser.read_compressed_int().unwrap(), 3);
        assert_eq!(parser.read_compressed_int().unwrap(), -3);
        assert_eq!(parser.read_compressed_int().unwrap(), 64);
        assert_eq!(parser.read_compressed_int().unwrap(), -64);
        assert_eq!(parser.read_compressed_int().unwrap(), 8192);
        assert_eq!(parser.read_compressed_int().unwrap(), -8192);
        assert_eq!(parser.read_compressed_int().unwrap(), 268_435_455);
        assert_eq!(parser.read_compressed_int().unwrap(), -268_435_456);
    }

    #[test]
    fn ser_string() {
        let mut parser = Parser::new(&[0x05, b'H', b'e', b'l', b'l', b'o', 0xFF, 0x00]);
        assert_eq!(parser.read_ser_string().unwrap().as_deref(), Some("Hello"));
        assert_eq!(parser.read_ser_string().unwrap(), None);
        assert_eq!(parser.read_ser_string().unwrap().as_deref(), Some(""));
        assert_eq!(parser.remaining(), 0);
    }

    #[test]
    fn ser_string_truncated() {
        let mut parser = Parser::new(&[0x05, b'H', b'e']);
        assert!(parser.read_ser_string().is_err());
    }

    #[test]
    fn ser_string_invalid_utf8() {
        let mut parser = Parser::new(&[0x02, 0xC3, 0x28]);
        assert!(matches!(
            parser.read_ser_string(),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn read_bytes_and_peek() {
        let mut parser = Parser::new(&[0x01, 0x02, 0x03]);
        assert_eq!(parser.peek_byte().unwrap(), 0x01);
        assert_eq!(parser.read_bytes(2).unwrap(), &[0x01, 0x02]);
        assert_eq!(parser.remaining(), 1);
        assert!(parser.read_bytes(2).is_err());
        assert_eq!(parser.pos(), 2);
        parser.advance().unwrap();
        assert!(parser.advance().is_err());
        assert!(parser.peek_byte().is_err());
    }
}
