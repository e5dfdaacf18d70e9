//! Read-only view over the metadata of a single .NET module.
//!
//! [`ModuleView`] owns the module bytes (memory-mapped or buffered) and the parsed structures
//! that borrow from them: the CLR header, the metadata root, the tables stream and the
//! `#Strings` / `#Blob` heaps. Nothing is resolved up front; rows are decoded when asked for.
//!
//! On top of the raw structures the view answers the questions module information needs:
//!
//! - [`ModuleView::assembly`] - identity of the module's own assembly
//! - [`ModuleView::references`] - identities of all referenced assemblies
//! - [`ModuleView::assembly_attributes`] - custom attributes applied to the assembly, with
//!   their constructor resolved to a type name
//! - [`ModuleView::decode_attribute`] - the decoded arguments of one of those attributes
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotinfo::metadata::{diagnostics::Diagnostics, moduleview::ModuleView};
//! use std::path::Path;
//!
//! let view = ModuleView::from_file(Path::new("Sample.dll"))?;
//! println!("{} ({})", view.assembly()?.display_name(), view.runtime_version());
//!
//! let mut diagnostics = Diagnostics::new();
//! for attribute in view.assembly_attributes(&mut diagnostics) {
//!     println!("[{}]", attribute.type_name);
//! }
//! # Ok::<(), dotinfo::Error>(())
//! ```

use std::{path::Path, sync::Arc};

use ouroboros::self_referencing;

use crate::{
    file::File,
    metadata::{
        cor20header::Cor20Header,
        customattributes::{
            parse_custom_attribute, ArgumentType, CustomAttributeValue, SERIALIZATION_TYPE,
        },
        diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics},
        identity::AssemblyIdentity,
        root::Root,
        signatures::{parse_method_signature, TypeSignature},
        streams::{Blob, Strings, TablesHeader},
        tables::{
            AssemblyRaw, AssemblyRefRaw, CodedIndex, CustomAttributeRaw, MemberRefRaw,
            MethodDefRaw, NestedClassRaw, RowReadable, TableId, TypeDefRaw, TypeRefRaw,
        },
        token::Token,
    },
    Result,
};

/// Nesting limit when walking enclosing types
const MAX_NESTING_DEPTH: usize = 16;

/// A custom attribute applied to the assembly, with its constructor resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyAttribute {
    /// Token of the `CustomAttribute` row
    pub token: Token,
    /// Full name of the attribute type, nested types joined with `+`
    pub type_name: String,
    /// The constructor (`MethodDef` or `MemberRef`)
    pub constructor: CodedIndex,
    /// Index of the value blob
    pub value: u32,
}

/// Parsed metadata structures, borrowing from the module bytes.
pub(crate) struct ModuleViewData<'a> {
    cor20header: Cor20Header,
    root: Root,
    tables: TablesHeader<'a>,
    strings: Strings<'a>,
    blobs: Option<Blob<'a>>,
}

impl<'a> ModuleViewData<'a> {
    fn from_file(file: &'a File, strict: bool) -> Result<Self> {
        let (clr_rva, clr_size) = file.clr();
        let clr_offset = file.rva_to_offset(clr_rva)?;
        let cor20header = Cor20Header::read(file.data_slice(clr_offset, clr_size)?, strict)?;

        let metadata_offset = file.rva_to_offset(cor20header.meta_data_rva as usize)?;
        let metadata = file.data_slice(metadata_offset, cor20header.meta_data_size as usize)?;
        let root = Root::read(metadata)?;

        let tables_data = match root
            .stream_data(metadata, "#~")
            .or_else(|| root.stream_data(metadata, "#-"))
        {
            Some(data) => data,
            None => return Err(malformed_error!("Module has no metadata tables stream")),
        };
        let Some(strings_data) = root.stream_data(metadata, "#Strings") else {
            return Err(malformed_error!("Module has no #Strings heap"));
        };

        let blobs = match root.stream_data(metadata, "#Blob") {
            Some(data) => Some(Blob::from(data)?),
            None => None,
        };

        Ok(ModuleViewData {
            tables: TablesHeader::from(tables_data)?,
            strings: Strings::from(strings_data)?,
            blobs,
            cor20header,
            root,
        })
    }

    fn blob(&self, index: u32) -> Result<&'a [u8]> {
        match &self.blobs {
            Some(blobs) => blobs.get(index as usize),
            None => Err(malformed_error!(
                "Blob index {} used, but the module has no #Blob heap",
                index
            )),
        }
    }

    fn assembly(&self) -> Result<AssemblyIdentity> {
        let row = match self.tables.table::<AssemblyRaw>() {
            Some(table) if table.row_count() > 0 => table.get(1)?,
            _ => return Err(malformed_error!("Module has no Assembly row")),
        };

        AssemblyIdentity::from_assembly(&row, &self.strings, self.blobs.as_ref())
    }

    fn references(&self) -> Result<Vec<AssemblyIdentity>> {
        let Some(table) = self.tables.table::<AssemblyRefRaw>() else {
            return Ok(Vec::new());
        };

        let mut references = Vec::with_capacity(table.row_count() as usize);
        for row in &table {
            references.push(AssemblyIdentity::from_assembly_ref(
                &row?,
                &self.strings,
                self.blobs.as_ref(),
            )?);
        }

        Ok(references)
    }

    fn assembly_attributes(&self, diagnostics: &mut Diagnostics) -> Vec<AssemblyAttribute> {
        let Some(table) = self.tables.table::<CustomAttributeRaw>() else {
            return Vec::new();
        };

        let mut attributes = Vec::new();
        for (index, row) in table.iter().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(error) => {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticSeverity::Error,
                            DiagnosticCategory::Table,
                            format!("Failed to read CustomAttribute row: {error}"),
                        )
                        .with_token(Token::from_parts(TableId::CustomAttribute, index as u32 + 1)),
                    );
                    continue;
                }
            };

            if row.parent.tag != TableId::Assembly || row.parent.row != 1 {
                continue;
            }

            match self.constructor_type_name(&row.constructor) {
                Ok(type_name) => attributes.push(AssemblyAttribute {
                    token: row.token,
                    type_name,
                    constructor: row.constructor,
                    value: row.value,
                }),
                Err(error) => diagnostics.push(
                    Diagnostic::new(
                        DiagnosticSeverity::Warning,
                        DiagnosticCategory::Type,
                        format!("Failed to resolve attribute constructor: {error}"),
                    )
                    .with_token(row.token),
                ),
            }
        }

        attributes
    }

    fn decode_attribute(&self, attribute: &AssemblyAttribute) -> Result<CustomAttributeValue> {
        let signature = match attribute.constructor.tag {
            TableId::MethodDef => self.row::<MethodDefRaw>(attribute.constructor.row)?.signature,
            TableId::MemberRef => self.row::<MemberRefRaw>(attribute.constructor.row)?.signature,
            _ => {
                return Err(malformed_error!(
                    "Invalid attribute constructor - {}",
                    attribute.constructor.token
                ))
            }
        };

        let signature = parse_method_signature(self.blob(signature)?)?;

        let mut params = Vec::with_capacity(signature.params.len());
        for param in &signature.params {
            params.push(self.argument_type(param)?);
        }

        let value: &[u8] = if attribute.value == 0 {
            &[]
        } else {
            self.blob(attribute.value)?
        };

        parse_custom_attribute(value, &params)
    }

    fn row<T: RowReadable>(&self, rid: u32) -> Result<T> {
        match self.tables.table::<T>() {
            Some(table) => table.get(rid),
            None => Err(malformed_error!(
                "Reference to row {} of missing table {:?}",
                rid,
                T::TABLE_ID
            )),
        }
    }

    fn constructor_type_name(&self, constructor: &CodedIndex) -> Result<String> {
        match constructor.tag {
            TableId::MemberRef => {
                let member = self.row::<MemberRefRaw>(constructor.row)?;
                self.type_name(&member.class)
            }
            TableId::MethodDef => {
                let owner = self.method_owner(constructor.row)?;
                self.typedef_name(owner, 0)
            }
            _ => Err(malformed_error!(
                "Invalid attribute constructor - {}",
                constructor.token
            )),
        }
    }

    /// Full name of a `TypeDef` or `TypeRef` target.
    fn type_name(&self, index: &CodedIndex) -> Result<String> {
        match index.tag {
            TableId::TypeRef => self.typeref_name(index.row, 0),
            TableId::TypeDef => self.typedef_name(index.row, 0),
            _ => Err(malformed_error!(
                "Cannot resolve a type name for {}",
                index.token
            )),
        }
    }

    fn typeref_name(&self, rid: u32, depth: usize) -> Result<String> {
        if depth > MAX_NESTING_DEPTH {
            return Err(malformed_error!("TypeRef nesting too deep at row {}", rid));
        }

        let row = self.row::<TypeRefRaw>(rid)?;
        let name = self.strings.get(row.type_name as usize)?;

        if row.resolution_scope.tag == TableId::TypeRef && row.resolution_scope.row != 0 {
            let enclosing = self.typeref_name(row.resolution_scope.row, depth + 1)?;
            return Ok(format!("{enclosing}+{name}"));
        }

        let namespace = self.strings.get(row.type_namespace as usize)?;
        Ok(join_name(namespace, name))
    }

    fn typedef_name(&self, rid: u32, depth: usize) -> Result<String> {
        if depth > MAX_NESTING_DEPTH {
            return Err(malformed_error!("TypeDef nesting too deep at row {}", rid));
        }

        let row = self.row::<TypeDefRaw>(rid)?;
        let name = self.strings.get(row.type_name as usize)?;

        if let Some(nested) = self.tables.table::<NestedClassRaw>() {
            for entry in &nested {
                let entry = entry?;
                if entry.nested_class == rid {
                    let enclosing = self.typedef_name(entry.enclosing_class, depth + 1)?;
                    return Ok(format!("{enclosing}+{name}"));
                }
            }
        }

        let namespace = self.strings.get(row.type_namespace as usize)?;
        Ok(join_name(namespace, name))
    }

    /// The `TypeDef` whose method list contains `method`.
    fn method_owner(&self, method: u32) -> Result<u32> {
        let method_count = self.tables.row_count(TableId::MethodDef);
        if method == 0 || method > method_count {
            return Err(malformed_error!("Invalid MethodDef row {}", method));
        }

        let Some(types) = self.tables.table::<TypeDefRaw>() else {
            return Err(malformed_error!("Module has methods but no TypeDef table"));
        };

        let mut owner = None;
        for row in &types {
            let row = row?;
            if row.method_list != 0 && row.method_list <= method && row.method_list <= method_count
            {
                owner = Some(row.rid);
            } else if row.method_list > method {
                break;
            }
        }

        owner.ok_or_else(|| malformed_error!("No TypeDef owns MethodDef row {}", method))
    }

    fn argument_type(&self, signature: &TypeSignature) -> Result<ArgumentType> {
        Ok(match signature {
            TypeSignature::Boolean => ArgumentType::Primitive(SERIALIZATION_TYPE::BOOLEAN),
            TypeSignature::Char => ArgumentType::Primitive(SERIALIZATION_TYPE::CHAR),
            TypeSignature::I1 => ArgumentType::Primitive(SERIALIZATION_TYPE::I1),
            TypeSignature::U1 => ArgumentType::Primitive(SERIALIZATION_TYPE::U1),
            TypeSignature::I2 => ArgumentType::Primitive(SERIALIZATION_TYPE::I2),
            TypeSignature::U2 => ArgumentType::Primitive(SERIALIZATION_TYPE::U2),
            TypeSignature::I4 => ArgumentType::Primitive(SERIALIZATION_TYPE::I4),
            TypeSignature::U4 => ArgumentType::Primitive(SERIALIZATION_TYPE::U4),
            TypeSignature::I8 => ArgumentType::Primitive(SERIALIZATION_TYPE::I8),
            TypeSignature::U8 => ArgumentType::Primitive(SERIALIZATION_TYPE::U8),
            TypeSignature::R4 => ArgumentType::Primitive(SERIALIZATION_TYPE::R4),
            TypeSignature::R8 => ArgumentType::Primitive(SERIALIZATION_TYPE::R8),
            TypeSignature::String => ArgumentType::String,
            TypeSignature::Object => ArgumentType::Boxed,
            TypeSignature::SzArray(element) => {
                ArgumentType::Array(Box::new(self.argument_type(element)?))
            }
            TypeSignature::Class(index) => {
                let name = self.type_name(index)?;
                if name != "System.Type" {
                    return Err(malformed_error!(
                        "Unsupported attribute parameter type - {}",
                        name
                    ));
                }
                ArgumentType::Type
            }
            // Enums defined elsewhere cannot be inspected; int32 is by far the common case
            TypeSignature::ValueType(index) => ArgumentType::Enum {
                name: self.type_name(index)?,
                underlying: SERIALIZATION_TYPE::I4,
            },
            other => {
                return Err(malformed_error!(
                    "Unsupported attribute parameter type - {:?}",
                    other
                ))
            }
        })
    }
}

fn join_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

/// A loaded .NET module, read as data only.
///
/// The view owns the module bytes and keeps the parsed metadata structures next to them.
/// It is `Send` and `Sync`; all operations are read-only.
#[self_referencing]
pub struct ModuleView {
    file: Arc<File>,

    #[borrows(file)]
    #[not_covariant]
    data: ModuleViewData<'this>,
}

impl ModuleView {
    /// Memory-map the module at `path` and parse its metadata.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a .NET module.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_file_with(path, false)
    }

    /// Like [`ModuleView::from_file`], optionally rejecting CLR headers with undefined flags or
    /// non-zero reserved fields.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a .NET module.
    pub fn from_file_with(path: &Path, strict: bool) -> Result<Self> {
        Self::load(Arc::new(File::from_file(path)?), strict)
    }

    /// Parse a module held in memory.
    ///
    /// # Errors
    /// Returns an error if `data` is not a .NET module.
    pub fn from_mem(data: Vec<u8>) -> Result<Self> {
        Self::from_mem_with(data, false)
    }

    /// Like [`ModuleView::from_mem`], with optional strict CLR header checks.
    ///
    /// # Errors
    /// Returns an error if `data` is not a .NET module.
    pub fn from_mem_with(data: Vec<u8>, strict: bool) -> Result<Self> {
        Self::load(Arc::new(File::from_mem(data)?), strict)
    }

    fn load(file: Arc<File>, strict: bool) -> Result<Self> {
        ModuleView::try_new(file, |file| ModuleViewData::from_file(file, strict))
    }

    /// The CLR runtime header
    #[must_use]
    pub fn cor20header(&self) -> &Cor20Header {
        self.with_data(|data| &data.cor20header)
    }

    /// The metadata root, with its stream directory
    #[must_use]
    pub fn metadata_root(&self) -> &Root {
        self.with_data(|data| &data.root)
    }

    /// The runtime version the module was built against, e.g. `v4.0.30319`
    #[must_use]
    pub fn runtime_version(&self) -> &str {
        self.with_data(|data| data.root.version.as_str())
    }

    /// Number of rows in `table`, 0 if the module has no such table
    #[must_use]
    pub fn row_count(&self, table: TableId) -> u32 {
        self.with_data(|data| data.tables.row_count(table))
    }

    /// The underlying PE image
    #[must_use]
    pub fn file(&self) -> &Arc<File> {
        self.borrow_file()
    }

    /// Identity of the module's own assembly.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for modules without an `Assembly` row (netmodules)
    /// or with damaged identity data.
    pub fn assembly(&self) -> Result<AssemblyIdentity> {
        self.with_data(|data| data.assembly())
    }

    /// Identities of all referenced assemblies, in table order.
    ///
    /// # Errors
    /// Returns an error if an `AssemblyRef` row cannot be decoded.
    pub fn references(&self) -> Result<Vec<AssemblyIdentity>> {
        self.with_data(|data| data.references())
    }

    /// Custom attributes applied to the assembly, in table order.
    ///
    /// Rows that cannot be read or whose constructor cannot be resolved are reported to
    /// `diagnostics` and skipped.
    pub fn assembly_attributes(&self, diagnostics: &mut Diagnostics) -> Vec<AssemblyAttribute> {
        self.with_data(|data| data.assembly_attributes(diagnostics))
    }

    /// Decode the arguments of `attribute` using its constructor signature.
    ///
    /// # Errors
    /// Returns an error if the signature uses a parameter type that cannot appear in a custom
    /// attribute, or the value blob is damaged.
    pub fn decode_attribute(&self, attribute: &AssemblyAttribute) -> Result<CustomAttributeValue> {
        self.with_data(|data| data.decode_attribute(attribute))
    }
}
