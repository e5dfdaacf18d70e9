//! Method signature parsing (ECMA-335 II.23.2.1).
//!
//! Custom attribute blobs are not self-describing: the types of the fixed arguments come from
//! the signature of the attribute constructor. This module decodes a `MethodDefSig` /
//! `MethodRefSig` far enough to know every parameter type.

use crate::{
    file::parser::Parser,
    metadata::tables::{CodedIndex, CodedIndexType},
    Result,
};

/// Element type constants (ECMA-335 II.23.1.16).
#[allow(non_snake_case, missing_docs)]
pub mod ELEMENT_TYPE {
    pub const END: u8 = 0x00;
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    // Followed by type
    pub const PTR: u8 = 0x0f;
    // Followed by type
    pub const BYREF: u8 = 0x10;
    // Followed by TypeDef or TypeRef token
    pub const VALUETYPE: u8 = 0x11;
    // Followed by TypeDef or TypeRef token
    pub const CLASS: u8 = 0x12;
    pub const VAR: u8 = 0x13;
    pub const ARRAY: u8 = 0x14;
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    pub const I: u8 = 0x18;
    pub const U: u8 = 0x19;
    pub const FNPTR: u8 = 0x1b;
    pub const OBJECT: u8 = 0x1c;
    pub const SZARRAY: u8 = 0x1d;
    pub const MVAR: u8 = 0x1e;
    pub const CMOD_REQD: u8 = 0x1f;
    pub const CMOD_OPT: u8 = 0x20;
    pub const SENTINEL: u8 = 0x41;
    pub const PINNED: u8 = 0x45;
}

const MAX_RECURSION_DEPTH: usize = 50;

/// A type as it appears in a signature.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSignature {
    /// `void`
    Void,
    /// `bool`
    Boolean,
    /// `char`
    Char,
    /// `sbyte`
    I1,
    /// `byte`
    U1,
    /// `short`
    I2,
    /// `ushort`
    U2,
    /// `int`
    I4,
    /// `uint`
    U4,
    /// `long`
    I8,
    /// `ulong`
    U8,
    /// `float`
    R4,
    /// `double`
    R8,
    /// `nint`
    I,
    /// `nuint`
    U,
    /// `string`
    String,
    /// `object`
    Object,
    /// A value type (struct or enum) defined in `TypeDef`, `TypeRef` or `TypeSpec`
    ValueType(CodedIndex),
    /// A reference type defined in `TypeDef`, `TypeRef` or `TypeSpec`
    Class(CodedIndex),
    /// Single dimensional, zero based array
    SzArray(Box<TypeSignature>),
    /// Any type that cannot occur in a custom attribute constructor (pointers, generic
    /// instances, multi-dimensional arrays, ...), identified by its element type
    Other(u8),
}

/// A parsed method signature.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSignature {
    /// Instance method
    pub has_this: bool,
    /// `this` is passed explicitly
    pub explicit_this: bool,
    /// Number of generic parameters
    pub generic_param_count: u32,
    /// Return type
    pub return_type: TypeSignature,
    /// Parameter types, in order
    pub params: Vec<TypeSignature>,
}

/// Parse a method signature blob.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] for truncated blobs and [`crate::Error::Malformed`] for
/// invalid element types or excessive nesting.
pub fn parse_method_signature(data: &[u8]) -> Result<MethodSignature> {
    SignatureParser::new(data).parse_method_signature()
}

struct SignatureParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> SignatureParser<'a> {
    fn new(data: &'a [u8]) -> Self {
        SignatureParser {
            parser: Parser::new(data),
            depth: 0,
        }
    }

    fn parse_method_signature(&mut self) -> Result<MethodSignature> {
        let convention_byte = self.parser.read_le::<u8>()?;

        let generic_param_count = if convention_byte & 0x10 != 0 {
            self.parser.read_compressed_uint()?
        } else {
            0
        };

        let param_count = self.parser.read_compressed_uint()?;
        let return_type = self.parse_param()?;

        let mut params = Vec::with_capacity(param_count.min(64) as usize);
        for _ in 0..param_count {
            if self.parser.peek_byte()? == ELEMENT_TYPE::SENTINEL {
                self.parser.advance()?;
            }

            params.push(self.parse_param()?);
        }

        Ok(MethodSignature {
            has_this: convention_byte & 0x20 != 0,
            explicit_this: convention_byte & 0x40 != 0,
            generic_param_count,
            return_type,
            params,
        })
    }

    fn parse_param(&mut self) -> Result<TypeSignature> {
        self.skip_custom_mods()?;

        match self.parser.peek_byte()? {
            ELEMENT_TYPE::BYREF => {
                self.parser.advance()?;
                self.parse_type()?;
                Ok(TypeSignature::Other(ELEMENT_TYPE::BYREF))
            }
            ELEMENT_TYPE::TYPEDBYREF => {
                self.parser.advance()?;
                Ok(TypeSignature::Other(ELEMENT_TYPE::TYPEDBYREF))
            }
            _ => self.parse_type(),
        }
    }

    fn skip_custom_mods(&mut self) -> Result<()> {
        while matches!(
            self.parser.peek_byte()?,
            ELEMENT_TYPE::CMOD_REQD | ELEMENT_TYPE::CMOD_OPT
        ) {
            self.parser.advance()?;
            self.read_type_def_or_ref()?;
        }

        Ok(())
    }

    fn read_type_def_or_ref(&mut self) -> Result<CodedIndex> {
        let encoded = self.parser.read_compressed_uint()?;
        CodedIndex::decode(encoded, CodedIndexType::TypeDefOrRef)
    }

    fn parse_type(&mut self) -> Result<TypeSignature> {
        self.depth += 1;
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(malformed_error!(
                "Signature nesting exceeds {} levels",
                MAX_RECURSION_DEPTH
            ));
        }

        let current_byte = self.parser.read_le::<u8>()?;
        let signature = match current_byte {
            ELEMENT_TYPE::VOID => TypeSignature::Void,
            ELEMENT_TYPE::BOOLEAN => TypeSignature::Boolean,
            ELEMENT_TYPE::CHAR => TypeSignature::Char,
            ELEMENT_TYPE::I1 => TypeSignature::I1,
            ELEMENT_TYPE::U1 => TypeSignature::U1,
            ELEMENT_TYPE::I2 => TypeSignature::I2,
            ELEMENT_TYPE::U2 => TypeSignature::U2,
            ELEMENT_TYPE::I4 => TypeSignature::I4,
            ELEMENT_TYPE::U4 => TypeSignature::U4,
            ELEMENT_TYPE::I8 => TypeSignature::I8,
            ELEMENT_TYPE::U8 => TypeSignature::U8,
            ELEMENT_TYPE::R4 => TypeSignature::R4,
            ELEMENT_TYPE::R8 => TypeSignature::R8,
            ELEMENT_TYPE::I => TypeSignature::I,
            ELEMENT_TYPE::U => TypeSignature::U,
            ELEMENT_TYPE::STRING => TypeSignature::String,
            ELEMENT_TYPE::OBJECT => TypeSignature::Object,
            ELEMENT_TYPE::VALUETYPE => TypeSignature::ValueType(self.read_type_def_or_ref()?),
            ELEMENT_TYPE::CLASS => TypeSignature::Class(self.read_type_def_or_ref()?),
            ELEMENT_TYPE::SZARRAY => {
                self.skip_custom_mods()?;
                TypeSignature::SzArray(Box::new(self.parse_type()?))
            }
            ELEMENT_TYPE::PTR => {
                self.skip_custom_mods()?;
                self.parse_type()?;
                TypeSignature::Other(current_byte)
            }
            ELEMENT_TYPE::VAR | ELEMENT_TYPE::MVAR => {
                self.parser.read_compressed_uint()?;
                TypeSignature::Other(current_byte)
            }
            ELEMENT_TYPE::GENERICINST => {
                self.parser.read_le::<u8>()?;
                self.read_type_def_or_ref()?;
                let arg_count = self.parser.read_compressed_uint()?;
                for _ in 0..arg_count {
                    self.parse_type()?;
                }
                TypeSignature::Other(current_byte)
            }
            ELEMENT_TYPE::ARRAY => {
                self.parse_type()?;
                let _rank = self.parser.read_compressed_uint()?;
                let num_sizes = self.parser.read_compressed_uint()?;
                for _ in 0..num_sizes {
                    self.parser.read_compressed_uint()?;
                }
                let num_lo_bounds = self.parser.read_compressed_uint()?;
                for _ in 0..num_lo_bounds {
                    self.parser.read_compressed_int()?;
                }
                TypeSignature::Other(current_byte)
            }
            ELEMENT_TYPE::FNPTR => {
                self.parse_method_signature()?;
                TypeSignature::Other(current_byte)
            }
            _ => {
                return Err(malformed_error!(
                    "Unsupported element type in signature - 0x{:02X}",
                    current_byte
                ))
            }
        };

        self.depth -= 1;
        Ok(signature)
    }
}
