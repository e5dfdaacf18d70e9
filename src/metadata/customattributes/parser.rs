use crate::{
    file::parser::Parser,
    metadata::customattributes::types::{
        ArgumentType, CustomAttributeArgument, CustomAttributeNamedArgument, CustomAttributeValue,
        SERIALIZATION_TYPE,
    },
    Result,
};

const MAX_NESTING_DEPTH: usize = 16;

/// Custom attribute blobs always start with this prolog
const PROLOG: u16 = 0x0001;

/// Decode a custom attribute blob, given the resolved types of the constructor parameters.
///
/// An empty blob is accepted for parameterless constructors. A failure inside the named
/// arguments does not fail the decode; it is reported in
/// [`CustomAttributeValue::named_args_error`].
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for a bad prolog, unknown type tags or invalid strings,
/// and [`crate::Error::OutOfBounds`] for truncated blobs.
pub fn parse_custom_attribute(
    data: &[u8],
    params: &[ArgumentType],
) -> Result<CustomAttributeValue> {
    if data.is_empty() && params.is_empty() {
        return Ok(CustomAttributeValue {
            fixed_args: Vec::new(),
            named_args: Vec::new(),
            named_args_error: None,
        });
    }

    CustomAttributeParser::new(data).parse(params)
}

struct CustomAttributeParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> CustomAttributeParser<'a> {
    fn new(data: &'a [u8]) -> Self {
        CustomAttributeParser {
            parser: Parser::new(data),
            depth: 0,
        }
    }

    fn parse(&mut self, params: &[ArgumentType]) -> Result<CustomAttributeValue> {
        let prolog = self.parser.read_le::<u16>()?;
        if prolog != PROLOG {
            return Err(malformed_error!(
                "Invalid custom attribute prolog - expected 0x0001, got 0x{:04X}",
                prolog
            ));
        }

        let mut fixed_args = Vec::with_capacity(params.len());
        for param in params {
            fixed_args.push(self.parse_value(param)?);
        }

        let mut named_args = Vec::new();
        let named_args_error = self
            .parse_named_arguments(&mut named_args)
            .err()
            .map(|error| error.to_string());

        Ok(CustomAttributeValue {
            fixed_args,
            named_args,
            named_args_error,
        })
    }

    fn parse_named_arguments(
        &mut self,
        named_args: &mut Vec<CustomAttributeNamedArgument>,
    ) -> Result<()> {
        if self.parser.remaining() < 2 {
            return Ok(());
        }

        let num_named = self.parser.read_le::<u16>()?;
        for _ in 0..num_named {
            named_args.push(self.parse_named_argument()?);
        }

        Ok(())
    }

    fn parse_value(&mut self, arg_type: &ArgumentType) -> Result<CustomAttributeArgument> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(malformed_error!(
                "Custom attribute nesting exceeds {} levels",
                MAX_NESTING_DEPTH
            ));
        }

        let value = match arg_type {
            ArgumentType::Primitive(tag) => self.parse_primitive(*tag)?,
            ArgumentType::String => CustomAttributeArgument::String(self.parser.read_ser_string()?),
            ArgumentType::Type => CustomAttributeArgument::Type(self.parser.read_ser_string()?),
            ArgumentType::Boxed => {
                let boxed_type = self.parse_field_or_prop_type()?;
                self.parse_value(&boxed_type)?
            }
            ArgumentType::Enum { name, underlying } => CustomAttributeArgument::Enum(
                name.clone(),
                Box::new(self.parse_primitive(*underlying)?),
            ),
            ArgumentType::Array(element_type) => {
                let length = self.parser.read_le::<u32>()?;
                if length == u32::MAX {
                    CustomAttributeArgument::Array(None)
                } else {
                    if length as usize > self.parser.remaining() {
                        return Err(out_of_bounds_error!());
                    }

                    let mut elements = Vec::with_capacity(length as usize);
                    for _ in 0..length {
                        elements.push(self.parse_value(element_type)?);
                    }
                    CustomAttributeArgument::Array(Some(elements))
                }
            }
        };

        self.depth -= 1;
        Ok(value)
    }

    fn parse_primitive(&mut self, tag: u8) -> Result<CustomAttributeArgument> {
        Ok(match tag {
            SERIALIZATION_TYPE::BOOLEAN => {
                CustomAttributeArgument::Bool(self.parser.read_le::<u8>()? != 0)
            }
            SERIALIZATION_TYPE::CHAR => {
                let code_unit = self.parser.read_le::<u16>()?;
                CustomAttributeArgument::Char(
                    char::from_u32(u32::from(code_unit)).unwrap_or(char::REPLACEMENT_CHARACTER),
                )
            }
            SERIALIZATION_TYPE::I1 => CustomAttributeArgument::I1(self.parser.read_le::<i8>()?),
            SERIALIZATION_TYPE::U1 => CustomAttributeArgument::U1(self.parser.read_le::<u8>()?),
            SERIALIZATION_TYPE::I2 => CustomAttributeArgument::I2(self.parser.read_le::<i16>()?),
            SERIALIZATION_TYPE::U2 => CustomAttributeArgument::U2(self.parser.read_le::<u16>()?),
            SERIALIZATION_TYPE::I4 => CustomAttributeArgument::I4(self.parser.read_le::<i32>()?),
            SERIALIZATION_TYPE::U4 => CustomAttributeArgument::U4(self.parser.read_le::<u32>()?),
            SERIALIZATION_TYPE::I8 => CustomAttributeArgument::I8(self.parser.read_le::<i64>()?),
            SERIALIZATION_TYPE::U8 => CustomAttributeArgument::U8(self.parser.read_le::<u64>()?),
            SERIALIZATION_TYPE::R4 => CustomAttributeArgument::R4(self.parser.read_le::<f32>()?),
            SERIALIZATION_TYPE::R8 => CustomAttributeArgument::R8(self.parser.read_le::<f64>()?),
            _ => {
                return Err(malformed_error!(
                    "Invalid primitive type tag in custom attribute - 0x{:02X}",
                    tag
                ))
            }
        })
    }

    /// Read a `FieldOrPropType`, the explicit type tag used by named and boxed arguments.
    fn parse_field_or_prop_type(&mut self) -> Result<ArgumentType> {
        let tag = self.parser.read_le::<u8>()?;
        Ok(match tag {
            SERIALIZATION_TYPE::BOOLEAN..=SERIALIZATION_TYPE::R8 => ArgumentType::Primitive(tag),
            SERIALIZATION_TYPE::STRING => ArgumentType::String,
            SERIALIZATION_TYPE::TYPE => ArgumentType::Type,
            SERIALIZATION_TYPE::TAGGED_OBJECT => ArgumentType::Boxed,
            SERIALIZATION_TYPE::SZARRAY => {
                ArgumentType::Array(Box::new(self.parse_field_or_prop_type()?))
            }
            SERIALIZATION_TYPE::ENUM => {
                let Some(name) = self.parser.read_ser_string()? else {
                    return Err(malformed_error!("Enum argument without a type name"));
                };

                // The underlying type of an external enum is not recorded in the blob
                ArgumentType::Enum {
                    name,
                    underlying: SERIALIZATION_TYPE::I4,
                }
            }
            _ => {
                return Err(malformed_error!(
                    "Invalid type tag in custom attribute - 0x{:02X}",
                    tag
                ))
            }
        })
    }

    fn parse_named_argument(&mut self) -> Result<CustomAttributeNamedArgument> {
        let is_field = match self.parser.read_le::<u8>()? {
            SERIALIZATION_TYPE::FIELD => true,
            SERIALIZATION_TYPE::PROPERTY => false,
            kind => {
                return Err(malformed_error!(
                    "Invalid named argument kind - 0x{:02X}",
                    kind
                ))
            }
        };

        let arg_type = self.parse_field_or_prop_type()?;
        let Some(name) = self.parser.read_ser_string()? else {
            return Err(malformed_error!("Named argument without a name"));
        };

        Ok(CustomAttributeNamedArgument {
            is_field,
            name,
            value: self.parse_value(&arg_type)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_argument() {
        let data = [0x01, 0x00, 0x05, b'T', b'i', b't', b'l', b'e', 0x00, 0x00];

        let value = parse_custom_attribute(&data, &[ArgumentType::String]).unwrap();
        assert_eq!(
            value.fixed_args,
            vec![CustomAttributeArgument::String(Some("Title".to_string()))]
        );
        assert!(value.named_args.is_empty());
        assert!(value.named_args_error.is_none());
    }

    #[test]
    fn null_and_empty_strings() {
        let data = [0x01, 0x00, 0xFF, 0x00, 0x00];
        let value = parse_custom_attribute(&data, &[ArgumentType::String]).unwrap();
        assert_eq!(value.fixed_args, vec![CustomAttributeArgument::String(None)]);

        let data = [0x01, 0x00, 0x00, 0x00, 0x00];
        let value = parse_custom_attribute(&data, &[ArgumentType::String]).unwrap();
        assert_eq!(
            value.fixed_args,
            vec![CustomAttributeArgument::String(Some(String::new()))]
        );
    }

    #[test]
    fn enum_argument() {
        // DebuggableAttribute(DebuggingModes.Default | DisableOptimizations | ...) = 0x107
        let data = [0x01, 0x00, 0x07, 0x01, 0x00, 0x00, 0x00, 0x00];
        let params = [ArgumentType::Enum {
            name: "System.Diagnostics.DebuggableAttribute+DebuggingModes".to_string(),
            underlying: SERIALIZATION_TYPE::I4,
        }];

        let value = parse_custom_attribute(&data, &params).unwrap();
        match &value.fixed_args[0] {
            CustomAttributeArgument::Enum(name, value) => {
                assert!(name.ends_with("DebuggingModes"));
                assert_eq!(**value, CustomAttributeArgument::I4(0x107));
            }
            other => panic!("Expected Enum, got {other:?}"),
        }
    }

    #[test]
    fn two_booleans() {
        let data = [0x01, 0x00, 0x01, 0x00, 0x00, 0x00];
        let params = [
            ArgumentType::Primitive(SERIALIZATION_TYPE::BOOLEAN),
            ArgumentType::Primitive(SERIALIZATION_TYPE::BOOLEAN),
        ];

        let value = parse_custom_attribute(&data, &params).unwrap();
        assert_eq!(
            value.fixed_args,
            vec![
                CustomAttributeArgument::Bool(true),
                CustomAttributeArgument::Bool(false)
            ]
        );
    }

    #[test]
    fn named_arguments() {
        #[rustfmt::skip]
        let data = [
            0x01, 0x00,
            0x02, 0x00,                                         // two named arguments
            0x54, 0x02, 0x0C, b'W', b'r', b'a', b'p', b'N', b'o', b'n', b'E', b'x', b'c', b'e', b'p', 0x01,
            0x53, 0x55, 0x03, b'E', b'n', b'm', 0x04, b'M', b'o', b'd', b'e', 0x02, 0x00, 0x00, 0x00,
        ];

        let value = parse_custom_attribute(&data, &[]).unwrap();
        assert!(value.fixed_args.is_empty());
        assert_eq!(value.named_args.len(), 2);

        assert!(!value.named_args[0].is_field);
        assert_eq!(value.named_args[0].name, "WrapNonExcep");
        assert_eq!(value.named_args[0].value, CustomAttributeArgument::Bool(true));

        assert!(value.named_args[1].is_field);
        assert_eq!(value.named_args[1].name, "Mode");
        assert_eq!(
            value.named_args[1].value,
            CustomAttributeArgument::Enum("Enm".to_string(), Box::new(CustomAttributeArgument::I4(2)))
        );
    }

    #[test]
    fn damaged_named_arguments_keep_fixed_arguments() {
        #[rustfmt::skip]
        let data = [
            0x01, 0x00,
            0x03, b'A', b'B', b'C',
            0x02, 0x00,                                         // two named arguments
            0x53, 0x02, 0x01, b'X', 0x01,                       // field bool X = true
            0x54, 0x99, 0x01, b'Y',                             // property of unknown type
        ];

        let value = parse_custom_attribute(&data, &[ArgumentType::String]).unwrap();
        assert_eq!(
            value.fixed_args,
            vec![CustomAttributeArgument::String(Some("ABC".to_string()))]
        );
        assert_eq!(value.named_args.len(), 1);
        assert_eq!(value.named_args[0].name, "X");
        assert!(value
            .named_args_error
            .as_deref()
            .is_some_and(|error| error.contains("0x99")));

        // Unknown named argument kind
        let value = parse_custom_attribute(&[0x01, 0x00, 0x01, 0x00, 0x60], &[]).unwrap();
        assert!(value.named_args.is_empty());
        assert!(value.named_args_error.is_some());
    }

    #[test]
    fn arrays_and_boxed_values() {
        #[rustfmt::skip]
        let data = [
            0x01, 0x00,
            0x02, 0x00, 0x00, 0x00, 0x01, b'a', 0xFF,           // string[] { "a", null }
            0xFF, 0xFF, 0xFF, 0xFF,                             // null int[]
            0x08, 0x2A, 0x00, 0x00, 0x00,                       // (object)42
            0x00, 0x00,
        ];
        let params = [
            ArgumentType::Array(Box::new(ArgumentType::String)),
            ArgumentType::Array(Box::new(ArgumentType::Primitive(SERIALIZATION_TYPE::I4))),
            ArgumentType::Boxed,
        ];

        let value = parse_custom_attribute(&data, &params).unwrap();
        assert_eq!(
            value.fixed_args[0],
            CustomAttributeArgument::Array(Some(vec![
                CustomAttributeArgument::String(Some("a".to_string())),
                CustomAttributeArgument::String(None),
            ]))
        );
        assert_eq!(value.fixed_args[1], CustomAttributeArgument::Array(None));
        assert_eq!(value.fixed_args[2], CustomAttributeArgument::I4(42));
    }

    #[test]
    fn empty_blob() {
        let value = parse_custom_attribute(&[], &[]).unwrap();
        assert!(value.fixed_args.is_empty());

        assert!(parse_custom_attribute(&[], &[ArgumentType::String]).is_err());
    }

    #[test]
    fn invalid_blobs() {
        assert!(matches!(
            parse_custom_attribute(&[0x02, 0x00, 0x00, 0x00], &[]),
            Err(crate::Error::Malformed { .. })
        ));

        // Truncated string
        assert!(parse_custom_attribute(&[0x01, 0x00, 0x05, b'a'], &[ArgumentType::String]).is_err());

        // Array length exceeding the blob
        let params = [ArgumentType::Array(Box::new(ArgumentType::String))];
        assert!(parse_custom_attribute(&[0x01, 0x00, 0x00, 0x00, 0x01, 0x00], &params).is_err());
    }
}
