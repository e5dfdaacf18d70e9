//! Metadata tables (ECMA-335 II.22).
//!
//! The tables stream is a sequence of fixed-width row arrays. Row widths depend on the row
//! counts of other tables and on the heap size flags, so every table that is present must be
//! sized (see [`TableInfo`]) even though only a handful are ever decoded:
//!
//! - [`AssemblyRaw`] - identity of the module's own assembly
//! - [`AssemblyRefRaw`] - referenced assemblies
//! - [`CustomAttributeRaw`] - attribute instances
//! - [`MemberRefRaw`], [`MethodDefRaw`] - attribute constructors
//! - [`TypeRefRaw`], [`TypeDefRaw`], [`NestedClassRaw`] - attribute type names
//!
//! Rows are decoded lazily through [`MetadataTable`].

mod assembly;
mod assemblyref;
mod codedindex;
mod customattribute;
mod memberref;
mod methoddef;
mod nestedclass;
mod table;
mod tableid;
mod tableinfo;
mod typedef;
mod typeref;

pub use assembly::AssemblyRaw;
pub use assemblyref::AssemblyRefRaw;
pub use codedindex::{CodedIndex, CodedIndexType};
pub use customattribute::CustomAttributeRaw;
pub use memberref::MemberRefRaw;
pub use methoddef::MethodDefRaw;
pub use nestedclass::NestedClassRaw;
pub use table::{MetadataTable, RowReadable, TableIterator};
pub use tableid::TableId;
pub use tableinfo::{Column, TableInfo, TableRowInfo};
pub use typedef::TypeDefRaw;
pub use typeref::TypeRefRaw;
