/// A decoded custom attribute blob.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttributeValue {
    /// Constructor arguments, in parameter order
    pub fixed_args: Vec<CustomAttributeArgument>,
    /// Field and property assignments
    pub named_args: Vec<CustomAttributeNamedArgument>,
    /// Why decoding stopped inside the named arguments, if it did. `named_args` then holds the
    /// assignments read before the failure; `fixed_args` is complete.
    pub named_args_error: Option<String>,
}

/// A single decoded argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomAttributeArgument {
    /// `bool`
    Bool(bool),
    /// `char`
    Char(char),
    /// `sbyte`
    I1(i8),
    /// `byte`
    U1(u8),
    /// `short`
    I2(i16),
    /// `ushort`
    U2(u16),
    /// `int`
    I4(i32),
    /// `uint`
    U4(u32),
    /// `long`
    I8(i64),
    /// `ulong`
    U8(u64),
    /// `float`
    R4(f32),
    /// `double`
    R8(f64),
    /// `string`, `None` for a null reference
    String(Option<String>),
    /// `System.Type`, stored as its serialized type name; `None` for a null reference
    Type(Option<String>),
    /// Single dimensional array; `None` for a null reference
    Array(Option<Vec<CustomAttributeArgument>>),
    /// Enum value: the enum type name and its underlying value
    Enum(String, Box<CustomAttributeArgument>),
}

/// A named argument (`Name = value`) of a custom attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttributeNamedArgument {
    /// True for a field, false for a property
    pub is_field: bool,
    /// Field or property name
    pub name: String,
    /// The decoded value
    pub value: CustomAttributeArgument,
}

/// The type of a constructor parameter, resolved far enough to decode its value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentType {
    /// A primitive, identified by its [`SERIALIZATION_TYPE`] tag (`BOOLEAN` to `R8`)
    Primitive(u8),
    /// `string`
    String,
    /// `System.Type`
    Type,
    /// `object`: the value carries its own type tag
    Boxed,
    /// An enum; the value is stored with the enum's underlying type
    Enum {
        /// Full name of the enum type
        name: String,
        /// [`SERIALIZATION_TYPE`] tag of the underlying integer type
        underlying: u8,
    },
    /// Single dimensional array of the element type
    Array(Box<ArgumentType>),
}

/// Serialization type tags used in custom attribute blobs (ECMA-335 II.23.3).
#[allow(non_snake_case, missing_docs)]
pub mod SERIALIZATION_TYPE {
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0A;
    pub const U8: u8 = 0x0B;
    pub const R4: u8 = 0x0C;
    pub const R8: u8 = 0x0D;
    pub const STRING: u8 = 0x0E;
    pub const SZARRAY: u8 = 0x1D;
    pub const TYPE: u8 = 0x50;
    pub const TAGGED_OBJECT: u8 = 0x51;
    pub const FIELD: u8 = 0x53;
    pub const PROPERTY: u8 = 0x54;
    pub const ENUM: u8 = 0x55;
}
