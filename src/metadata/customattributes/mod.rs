//! Custom attribute value decoding (ECMA-335 II.23.3).
//!
//! A `CustomAttribute` row references a constructor and a blob. The blob holds a prolog,
//! the constructor arguments serialized according to the constructor's parameter types, and
//! a list of named field/property assignments that carry their own type tags.
//!
//! [`parse_custom_attribute`] decodes such a blob given the parameter types as
//! [`ArgumentType`] values; resolving a signature into argument types needs the metadata
//! tables and happens in [`crate::metadata::moduleview::ModuleView`].
//!
//! # Examples
//!
//! ```rust
//! use dotinfo::metadata::customattributes::{
//!     parse_custom_attribute, ArgumentType, CustomAttributeArgument,
//! };
//!
//! let blob = [0x01, 0x00, 0x03, b'A', b'B', b'C', 0x00, 0x00];
//! let value = parse_custom_attribute(&blob, &[ArgumentType::String])?;
//! assert_eq!(
//!     value.fixed_args[0],
//!     CustomAttributeArgument::String(Some("ABC".to_string()))
//! );
//! # Ok::<(), dotinfo::Error>(())
//! ```

mod parser;
mod types;

pub use parser::parse_custom_attribute;
pub use types::{
    ArgumentType, CustomAttributeArgument, CustomAttributeNamedArgument, CustomAttributeValue,
    SERIALIZATION_TYPE,
};
