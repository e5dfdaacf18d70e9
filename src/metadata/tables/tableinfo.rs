use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::io::{read_le, read_le_at},
    metadata::tables::{CodedIndexType, TableId},
    Error::OutOfBounds,
    Result,
};

/// `HeapSizes` bit for 4-byte `#Strings` indexes
const HEAP_LARGE_STRINGS: u8 = 0x01;
/// `HeapSizes` bit for 4-byte `#GUID` indexes
const HEAP_LARGE_GUID: u8 = 0x02;
/// `HeapSizes` bit for 4-byte `#Blob` indexes
const HEAP_LARGE_BLOB: u8 = 0x04;
/// `HeapSizes` bit announcing an extra 4-byte value after the row counts
const HEAP_EXTRA_DATA: u8 = 0x40;

/// Row count of a single table and the number of bits needed to index it.
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct TableRowInfo {
    /// Number of rows
    pub rows: u32,
    /// Bits required to address every row
    pub bits: u8,
    /// True if a simple index into this table needs 4 bytes
    pub is_large: bool,
}

impl TableRowInfo {
    /// Derive the index width for a table with `rows` rows
    #[must_use]
    pub fn new(rows: u32) -> Self {
        let bits = if rows == 0 {
            1
        } else {
            (32 - rows.leading_zeros()) as u8
        };

        Self {
            rows,
            bits,
            is_large: rows > u32::from(u16::MAX),
        }
    }
}

/// A single column of a table row, as far as its on-disk width is concerned.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Column {
    /// A fixed-width value of the given byte length
    Fixed(u8),
    /// Index into `#Strings`
    Str,
    /// Index into `#GUID`
    Guid,
    /// Index into `#Blob`
    Blob,
    /// Simple index into another table
    Table(TableId),
    /// Coded index
    Coded(CodedIndexType),
}

use Column::{Blob, Coded, Fixed, Guid, Str, Table};

/// Row layouts of every table, ECMA-335 II.22.
#[rustfmt::skip]
fn columns(table: TableId) -> &'static [Column] {
    match table {
        TableId::Module => &[Fixed(2), Str, Guid, Guid, Guid],
        TableId::TypeRef => &[Coded(CodedIndexType::ResolutionScope), Str, Str],
        TableId::TypeDef => &[Fixed(4), Str, Str, Coded(CodedIndexType::TypeDefOrRef), Table(TableId::Field), Table(TableId::MethodDef)],
        TableId::FieldPtr => &[Table(TableId::Field)],
        TableId::Field => &[Fixed(2), Str, Blob],
        TableId::MethodPtr => &[Table(TableId::MethodDef)],
        TableId::MethodDef => &[Fixed(4), Fixed(2), Fixed(2), Str, Blob, Table(TableId::Param)],
        TableId::ParamPtr => &[Table(TableId::Param)],
        TableId::Param => &[Fixed(2), Fixed(2), Str],
        TableId::InterfaceImpl => &[Table(TableId::TypeDef), Coded(CodedIndexType::TypeDefOrRef)],
        TableId::MemberRef => &[Coded(CodedIndexType::MemberRefParent), Str, Blob],
        TableId::Constant => &[Fixed(2), Coded(CodedIndexType::HasConstant), Blob],
        TableId::CustomAttribute => &[Coded(CodedIndexType::HasCustomAttribute), Coded(CodedIndexType::CustomAttributeType), Blob],
        TableId::FieldMarshal => &[Coded(CodedIndexType::HasFieldMarshal), Blob],
        TableId::DeclSecurity => &[Fixed(2), Coded(CodedIndexType::HasDeclSecurity), Blob],
        TableId::ClassLayout => &[Fixed(2), Fixed(4), Table(TableId::TypeDef)],
        TableId::FieldLayout => &[Fixed(4), Table(TableId::Field)],
        TableId::StandAloneSig => &[Blob],
        TableId::EventMap => &[Table(TableId::TypeDef), Table(TableId::Event)],
        TableId::EventPtr => &[Table(TableId::Event)],
        TableId::Event => &[Fixed(2), Str, Coded(CodedIndexType::TypeDefOrRef)],
        TableId::PropertyMap => &[Table(TableId::TypeDef), Table(TableId::Property)],
        TableId::PropertyPtr => &[Table(TableId::Property)],
        TableId::Property => &[Fixed(2), Str, Blob],
        TableId::MethodSemantics => &[Fixed(2), Table(TableId::MethodDef), Coded(CodedIndexType::HasSemantics)],
        TableId::MethodImpl => &[Table(TableId::TypeDef), Coded(CodedIndexType::MethodDefOrRef), Coded(CodedIndexType::MethodDefOrRef)],
        TableId::ModuleRef => &[Str],
        TableId::TypeSpec => &[Blob],
        TableId::ImplMap => &[Fixed(2), Coded(CodedIndexType::MemberForwarded), Str, Table(TableId::ModuleRef)],
        TableId::FieldRVA => &[Fixed(4), Table(TableId::Field)],
        TableId::EncLog => &[Fixed(4), Fixed(4)],
        TableId::EncMap => &[Fixed(4)],
        TableId::Assembly => &[Fixed(4), Fixed(2), Fixed(2), Fixed(2), Fixed(2), Fixed(4), Blob, Str, Str],
        TableId::AssemblyProcessor => &[Fixed(4)],
        TableId::AssemblyOS => &[Fixed(4), Fixed(4), Fixed(4)],
        TableId::AssemblyRef => &[Fixed(2), Fixed(2), Fixed(2), Fixed(2), Fixed(4), Blob, Str, Str, Blob],
        TableId::AssemblyRefProcessor => &[Fixed(4), Table(TableId::AssemblyRef)],
        TableId::AssemblyRefOS => &[Fixed(4), Fixed(4), Fixed(4), Table(TableId::AssemblyRef)],
        TableId::File => &[Fixed(4), Str, Blob],
        TableId::ExportedType => &[Fixed(4), Fixed(4), Str, Str, Coded(CodedIndexType::Implementation)],
        TableId::ManifestResource => &[Fixed(4), Fixed(4), Str, Coded(CodedIndexType::Implementation)],
        TableId::NestedClass => &[Table(TableId::TypeDef), Table(TableId::TypeDef)],
        TableId::GenericParam => &[Fixed(2), Fixed(2), Coded(CodedIndexType::TypeOrMethodDef), Str],
        TableId::MethodSpec => &[Coded(CodedIndexType::MethodDefOrRef), Blob],
        TableId::GenericParamConstraint => &[Table(TableId::GenericParam), Coded(CodedIndexType::TypeDefOrRef)],
    }
}

/// Row counts and index widths of a tables stream.
///
/// Everything needed to compute the width of a row: the number of rows in each table (which
/// decides simple and coded index widths) and the `HeapSizes` flags.
#[derive(Clone, Default, Debug)]
pub struct TableInfo {
    rows: Vec<TableRowInfo>,
    coded_indexes: Vec<u8>,
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
    has_extra_data: bool,
}

impl TableInfo {
    /// Read row counts and heap size flags from the header of a tables stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on short data and [`crate::Error::Malformed`] if the
    /// `valid` vector announces a table this crate cannot size (such as portable PDB tables).
    pub fn new(data: &[u8], valid_bitvec: u64) -> Result<Self> {
        if data.len() < 24 {
            return Err(OutOfBounds);
        }

        let mut table_info = vec![TableRowInfo::default(); TableId::COUNT];
        let mut next_row_offset = 24;

        for bit in 0..64_u8 {
            if (valid_bitvec & (1_u64 << bit)) == 0 {
                continue;
            }

            let Some(table_id) = TableId::from_id(bit) else {
                return Err(malformed_error!(
                    "Tables stream announces unsupported table 0x{:02X}",
                    bit
                ));
            };

            let row_count = read_le_at::<u32>(data, &mut next_row_offset)?;
            table_info[table_id as usize] = TableRowInfo::new(row_count);
        }

        let heap_size_flags = read_le::<u8>(&data[6..])?;
        let mut table_info = TableInfo {
            rows: table_info,
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: heap_size_flags & HEAP_LARGE_STRINGS != 0,
            is_large_index_guid: heap_size_flags & HEAP_LARGE_GUID != 0,
            is_large_index_blob: heap_size_flags & HEAP_LARGE_BLOB != 0,
            has_extra_data: heap_size_flags & HEAP_EXTRA_DATA != 0,
        };

        table_info.calculate_coded_index_bits();

        Ok(table_info)
    }

    #[cfg(test)]
    pub(crate) fn new_test(
        valid_tables: &[(TableId, u32)],
        large_str: bool,
        large_blob: bool,
        large_guid: bool,
    ) -> Self {
        let mut table_info = TableInfo {
            rows: vec![TableRowInfo::default(); TableId::COUNT],
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: large_str,
            is_large_index_guid: large_guid,
            is_large_index_blob: large_blob,
            has_extra_data: false,
        };

        for valid_table in valid_tables {
            table_info.rows[valid_table.0 as usize] = TableRowInfo::new(valid_table.1);
        }

        table_info.calculate_coded_index_bits();
        table_info
    }

    /// True if the header carries the extra 4-byte value after the row counts
    #[must_use]
    pub fn has_extra_data(&self) -> bool {
        self.has_extra_data
    }

    /// True if `#Strings` indexes are 4 bytes wide
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// True if `#Blob` indexes are 4 bytes wide
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// True if simple indexes into `table` are 4 bytes wide
    #[must_use]
    pub fn is_large(&self, table: TableId) -> bool {
        self.table_index_bytes(table) == 4
    }

    /// Row information of `table`
    #[must_use]
    pub fn get(&self, table: TableId) -> &TableRowInfo {
        &self.rows[table as usize]
    }

    /// Width in bytes of a simple index into `table`
    #[must_use]
    pub fn table_index_bytes(&self, table: TableId) -> u8 {
        if self.rows[table as usize].bits > 16 {
            4
        } else {
            2
        }
    }

    /// Width in bytes of a coded index of kind `coded_index_type`
    #[must_use]
    pub fn coded_index_bytes(&self, coded_index_type: CodedIndexType) -> u8 {
        if self.coded_indexes[coded_index_type as usize] > 16 {
            4
        } else {
            2
        }
    }

    /// Width in bytes of a single `column`
    #[must_use]
    pub fn column_size(&self, column: Column) -> u8 {
        match column {
            Column::Fixed(size) => size,
            Column::Str => heap_bytes(self.is_large_index_str),
            Column::Guid => heap_bytes(self.is_large_index_guid),
            Column::Blob => heap_bytes(self.is_large_index_blob),
            Column::Table(table) => self.table_index_bytes(table),
            Column::Coded(coded_index_type) => self.coded_index_bytes(coded_index_type),
        }
    }

    /// Width in bytes of a single row of `table`
    #[must_use]
    pub fn row_size(&self, table: TableId) -> u32 {
        columns(table)
            .iter()
            .map(|column| u32::from(self.column_size(*column)))
            .sum()
    }

    fn calculate_coded_index_bits(&mut self) {
        for coded_index in CodedIndexType::iter() {
            let max_bits = coded_index
                .tables()
                .iter()
                .flatten()
                .map(|table| self.rows[*table as usize].bits)
                .max()
                .unwrap_or(1);

            self.coded_indexes[coded_index as usize] = max_bits + coded_index.tag_bits();
        }
    }
}

fn heap_bytes(is_large: bool) -> u8 {
    if is_large {
        4
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_info_bits() {
        assert_eq!(TableRowInfo::new(0).bits, 1);
        assert_eq!(TableRowInfo::new(1).bits, 1);
        assert_eq!(TableRowInfo::new(255).bits, 8);
        assert_eq!(TableRowInfo::new(256).bits, 9);
        assert!(!TableRowInfo::new(0xFFFF).is_large);
        assert!(TableRowInfo::new(0x10000).is_large);
    }

    #[test]
    fn small_row_sizes() {
        let info = TableInfo::new_test(&[(TableId::Assembly, 1)], false, false, false);

        assert_eq!(info.row_size(TableId::Module), 10);
        assert_eq!(info.row_size(TableId::TypeRef), 6);
        assert_eq!(info.row_size(TableId::TypeDef), 14);
        assert_eq!(info.row_size(TableId::MethodDef), 14);
        assert_eq!(info.row_size(TableId::MemberRef), 6);
        assert_eq!(info.row_size(TableId::Constant), 6);
        assert_eq!(info.row_size(TableId::CustomAttribute), 6);
        assert_eq!(info.row_size(TableId::Assembly), 22);
        assert_eq!(info.row_size(TableId::AssemblyRef), 20);
        assert_eq!(info.row_size(TableId::NestedClass), 4);
    }

    #[test]
    fn large_heaps_and_tables() {
        let info = TableInfo::new_test(&[(TableId::MethodDef, 0x1_0000)], true, true, true);

        assert_eq!(info.row_size(TableId::Module), 2 + 4 + 4 * 3);
        assert_eq!(info.row_size(TableId::AssemblyRef), 12 + 4 * 4);
        // Simple index into MethodDef is large
        assert_eq!(info.row_size(TableId::MethodPtr), 4);
        assert!(info.is_large(TableId::MethodDef));
        // HasCustomAttribute and CustomAttributeType both reference MethodDef
        assert_eq!(info.row_size(TableId::CustomAttribute), 4 + 4 + 4);
        // MemberRefParent (3 tag bits) -> 17 + 3 bits
        assert_eq!(info.coded_index_bytes(CodedIndexType::MemberRefParent), 4);
        assert_eq!(info.coded_index_bytes(CodedIndexType::ResolutionScope), 2);
    }

    #[test]
    fn coded_index_threshold() {
        // HasCustomAttribute uses 5 tag bits: 2^11 rows still fit in 2 bytes, 2^11 + 1 don't
        let info = TableInfo::new_test(&[(TableId::TypeRef, 0x7FF)], false, false, false);
        assert_eq!(info.coded_index_bytes(CodedIndexType::HasCustomAttribute), 2);

        let info = TableInfo::new_test(&[(TableId::TypeRef, 0x800)], false, false, false);
        assert_eq!(info.coded_index_bytes(CodedIndexType::HasCustomAttribute), 4);
    }

    #[rustfmt::skip]
    #[test]
    fn from_header() {
        let data = [
            0x00, 0x00, 0x00, 0x00,     // reserved
            0x02, 0x00,                 // version
            0x05,                       // heap sizes: large strings, large blob
            0x01,                       // reserved
            0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, // valid: Module, Assembly
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // sorted
            0x01, 0x00, 0x00, 0x00,     // Module rows
            0x01, 0x00, 0x00, 0x00,     // Assembly rows
        ];

        let info = TableInfo::new(&data, 0x0000_0001_0000_0001).unwrap();
        assert_eq!(info.get(TableId::Module).rows, 1);
        assert_eq!(info.get(TableId::Assembly).rows, 1);
        assert_eq!(info.get(TableId::TypeDef).rows, 0);
        assert!(info.is_large_str());
        assert!(info.is_large_blob());
        assert!(!info.is_large_index_guid);
        assert!(!info.has_extra_data());
    }

    #[test]
    fn rejects_unknown_tables() {
        let mut data = vec![0_u8; 32];
        data[24] = 1;
        // Portable PDB Document table (0x30)
        assert!(TableInfo::new(&data, 1_u64 << 0x30).is_err());
        assert!(matches!(TableInfo::new(&data[..20], 1), Err(OutOfBounds)));
    }
}
