//! The closed set of assembly attributes that populate [`ModuleInfo`] fields.

use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::{
    metadata::customattributes::{CustomAttributeArgument, CustomAttributeValue},
    moduleinfo::{ModuleInfo, TargetFramework},
    ExtractionError,
};

/// An assembly attribute type recognized by the extractor, keyed by its full type name.
///
/// Most variants fill a single [`ModuleInfo`] field from their first constructor argument.
/// The compiler-generated ones (`CompilationRelaxations`, `RuntimeCompatibility`, ...) are
/// recognized so they are not mistaken for unknown attributes, but set nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr, EnumIter)]
pub enum KnownAttribute {
    /// `DebuggableAttribute`, sets `debug_info`
    #[strum(serialize = "System.Diagnostics.DebuggableAttribute")]
    Debuggable,
    /// `AssemblyProductAttribute`, sets `product`
    #[strum(serialize = "System.Reflection.AssemblyProductAttribute")]
    Product,
    /// `AssemblyTrademarkAttribute`, sets `trademark`
    #[strum(serialize = "System.Reflection.AssemblyTrademarkAttribute")]
    Trademark,
    /// `AssemblyTitleAttribute`, sets `title`
    #[strum(serialize = "System.Reflection.AssemblyTitleAttribute")]
    Title,
    /// `AssemblyDescriptionAttribute`, sets `description`
    #[strum(serialize = "System.Reflection.AssemblyDescriptionAttribute")]
    Description,
    /// `AssemblyCompanyAttribute`, sets `company`
    #[strum(serialize = "System.Reflection.AssemblyCompanyAttribute")]
    Company,
    /// `GuidAttribute`, sets `guid`
    #[strum(serialize = "System.Runtime.InteropServices.GuidAttribute")]
    Guid,
    /// `AssemblyCopyrightAttribute`, sets `copyright`
    #[strum(serialize = "System.Reflection.AssemblyCopyrightAttribute")]
    Copyright,
    /// `TargetFrameworkAttribute`, sets `target_framework`
    #[strum(serialize = "System.Runtime.Versioning.TargetFrameworkAttribute")]
    TargetFramework,
    /// Ignored
    #[strum(serialize = "System.Runtime.CompilerServices.CompilationRelaxationsAttribute")]
    CompilationRelaxations,
    /// Ignored
    #[strum(serialize = "System.Runtime.CompilerServices.RuntimeCompatibilityAttribute")]
    RuntimeCompatibility,
    /// Ignored
    #[strum(serialize = "System.Reflection.AssemblyConfigurationAttribute")]
    Configuration,
    /// Ignored
    #[strum(serialize = "System.Runtime.InteropServices.ComVisibleAttribute")]
    ComVisible,
    /// Ignored
    #[strum(serialize = "System.Reflection.AssemblyFileVersionAttribute")]
    FileVersion,
    /// Ignored
    #[strum(serialize = "System.Reflection.AssemblyInformationalVersionAttribute")]
    InformationalVersion,
}

impl KnownAttribute {
    /// Look up the attribute kind of a fully qualified type name
    #[must_use]
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        type_name.parse().ok()
    }

    /// The fully qualified type name
    #[must_use]
    pub fn type_name(self) -> &'static str {
        self.into()
    }

    /// False for the attributes that are recognized but set no field
    #[must_use]
    pub fn sets_field(self) -> bool {
        !matches!(
            self,
            KnownAttribute::CompilationRelaxations
                | KnownAttribute::RuntimeCompatibility
                | KnownAttribute::Configuration
                | KnownAttribute::ComVisible
                | KnownAttribute::FileVersion
                | KnownAttribute::InformationalVersion
        )
    }

    /// Decode the first constructor argument of `value` and store it in `info`.
    ///
    /// Attributes without constructor arguments leave `info` untouched.
    ///
    /// # Errors
    /// Returns [`ExtractionError::AttributeDecode`] if the first argument has the wrong type;
    /// `info` is left untouched in that case.
    pub(crate) fn apply(
        self,
        value: &CustomAttributeValue,
        info: &mut ModuleInfo,
    ) -> Result<(), ExtractionError> {
        if self == KnownAttribute::Debuggable {
            if let Some(modes) = self.first_int32(value)? {
                info.debug_info = Some(format!("{modes:b}"));
            }
            return Ok(());
        }

        let Some(text) = self.first_string(value)? else {
            return Ok(());
        };

        match self {
            KnownAttribute::Product => info.product = Some(text),
            KnownAttribute::Trademark => info.trademark = Some(text),
            KnownAttribute::Title => info.title = Some(text),
            KnownAttribute::Description => info.description = Some(text),
            KnownAttribute::Company => info.company = Some(text),
            KnownAttribute::Guid => info.guid = Some(text),
            KnownAttribute::Copyright => info.copyright = Some(text),
            KnownAttribute::TargetFramework => {
                info.target_framework = Some(TargetFramework::new(text));
            }
            _ => {}
        }

        Ok(())
    }

    /// Unset the field this attribute kind populates.
    ///
    /// Used when a later occurrence fails to decode, so the field never keeps the value of an
    /// earlier occurrence. Clearing `TargetFramework` also clears the derived framework version.
    pub(crate) fn clear(self, info: &mut ModuleInfo) {
        match self {
            KnownAttribute::Debuggable => info.debug_info = None,
            KnownAttribute::Product => info.product = None,
            KnownAttribute::Trademark => info.trademark = None,
            KnownAttribute::Title => info.title = None,
            KnownAttribute::Description => info.description = None,
            KnownAttribute::Company => info.company = None,
            KnownAttribute::Guid => info.guid = None,
            KnownAttribute::Copyright => info.copyright = None,
            KnownAttribute::TargetFramework => info.target_framework = None,
            _ => {}
        }
    }

    fn first_string(self, value: &CustomAttributeValue) -> Result<Option<String>, ExtractionError> {
        match value.fixed_args.first() {
            None => Ok(None),
            Some(CustomAttributeArgument::String(Some(text))) => Ok(Some(text.clone())),
            Some(CustomAttributeArgument::String(None)) => {
                Err(self.decode_error("first argument is a null string".to_string()))
            }
            Some(other) => Err(self.decode_error(format!(
                "expected a string argument, found {other:?}"
            ))),
        }
    }

    fn first_int32(self, value: &CustomAttributeValue) -> Result<Option<i32>, ExtractionError> {
        match value.fixed_args.first() {
            None => Ok(None),
            Some(CustomAttributeArgument::I4(modes)) => Ok(Some(*modes)),
            Some(CustomAttributeArgument::Enum(_, underlying)) => match underlying.as_ref() {
                CustomAttributeArgument::I4(modes) => Ok(Some(*modes)),
                other => Err(self.decode_error(format!(
                    "expected an int32 enum argument, found {other:?}"
                ))),
            },
            Some(other) => Err(self.decode_error(format!(
                "expected an int32 argument, found {other:?}"
            ))),
        }
    }

    fn decode_error(self, message: String) -> ExtractionError {
        ExtractionError::AttributeDecode {
            attribute: self.type_name().to_string(),
            message,
        }
    }
}
