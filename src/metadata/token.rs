//! Metadata tokens.
//!
//! A token identifies a single row of a metadata table: the high byte is the table id, the
//! remaining 24 bits are the 1-based row index (RID). Tokens are how diagnostics point at the
//! attribute or reference they are about.

use std::fmt;

use crate::metadata::tables::TableId;

/// A metadata token (table id in the high byte, RID in the low 24 bits).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Build a token from its raw value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Build the token for row `rid` of `table`
    #[must_use]
    pub fn from_parts(table: TableId, rid: u32) -> Self {
        Token(((table as u32) << 24) | (rid & 0x00FF_FFFF))
    }

    /// The raw value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The table id byte
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The 1-based row index
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts() {
        let token = Token::from_parts(TableId::CustomAttribute, 3);
        assert_eq!(token.value(), 0x0C00_0003);
        assert_eq!(token.table(), 0x0C);
        assert_eq!(token.row(), 3);
        assert_eq!(Token::new(0x0C00_0003), token);
    }

    #[test]
    fn formatting() {
        let token = Token(0x2300_0001);
        assert_eq!(token.to_string(), "0x23000001");
        assert_eq!(
            format!("{token:?}"),
            "Token(0x23000001, table: 0x23, row: 1)"
        );
    }
}
