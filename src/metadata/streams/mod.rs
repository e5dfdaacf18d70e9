//! Metadata streams (ECMA-335 II.24.2).
//!
//! The metadata root lists a set of named streams. Only three carry information this crate
//! reads:
//!
//! - `#~` / `#-` - the tables, see [`TablesHeader`]
//! - `#Strings` - identifiers, see [`Strings`]
//! - `#Blob` - signatures, public keys and attribute values, see [`Blob`]
//!
//! `#GUID` and `#US` are recognized and skipped.

mod blob;
mod streamheader;
mod strings;
mod tablesheader;

pub use blob::Blob;
pub use streamheader::StreamHeader;
pub use strings::Strings;
pub use tablesheader::TablesHeader;
