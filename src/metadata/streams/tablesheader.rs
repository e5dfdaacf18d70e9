use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::io::read_le,
    metadata::tables::{MetadataTable, RowReadable, TableId, TableInfo},
    Error::OutOfBounds,
    Result,
};

/// The header of the `#~` (or uncompressed `#-`) stream, with the location of every table.
///
/// ```text
/// u32  reserved
/// u8   major_version
/// u8   minor_version
/// u8   heap_sizes
/// u8   reserved
/// u64  valid
/// u64  sorted
/// u32  rows[popcount(valid)]
/// u32  extra data (only if heap_sizes & 0x40)
/// ...  table rows, in table id order
/// ```
pub struct TablesHeader<'a> {
    /// Major schema version
    pub major_version: u8,
    /// Minor schema version
    pub minor_version: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sorted tables
    pub sorted: u64,
    /// Row counts and index widths
    pub info: TableInfo,
    data: &'a [u8],
    tables: Vec<Option<(usize, u32)>>,
}

impl<'a> TablesHeader<'a> {
    /// Parse the header and locate every table in `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if a table extends past the stream, and
    /// [`crate::Error::Malformed`] for an empty or unsupported table set.
    pub fn from(data: &'a [u8]) -> Result<TablesHeader<'a>> {
        if data.len() < 24 {
            return Err(OutOfBounds);
        }

        let valid = read_le::<u64>(&data[8..])?;
        if valid == 0 {
            return Err(malformed_error!("No valid rows in any of the tables"));
        }

        let info = TableInfo::new(data, valid)?;

        let mut current_offset = 24 + valid.count_ones() as usize * 4;
        if info.has_extra_data() {
            current_offset += 4;
        }

        let mut tables = vec![None; TableId::COUNT];
        for table_id in TableId::iter() {
            let rows = info.get(table_id).rows;
            if (valid & (1_u64 << table_id as u8)) == 0 || rows == 0 {
                continue;
            }

            let size = (info.row_size(table_id) as usize)
                .checked_mul(rows as usize)
                .ok_or(OutOfBounds)?;
            let end = current_offset.checked_add(size).ok_or(OutOfBounds)?;
            if end > data.len() {
                return Err(OutOfBounds);
            }

            tables[table_id as usize] = Some((current_offset, rows));
            current_offset = end;
        }

        Ok(TablesHeader {
            major_version: read_le::<u8>(&data[4..])?,
            minor_version: read_le::<u8>(&data[5..])?,
            valid,
            sorted: read_le::<u64>(&data[16..])?,
            info,
            data,
            tables,
        })
    }

    /// Number of rows in `table_id`, 0 if absent
    #[must_use]
    pub fn row_count(&self, table_id: TableId) -> u32 {
        self.info.get(table_id).rows
    }

    /// Typed access to the table of row type `T`, `None` if the module has no such table.
    #[must_use]
    pub fn table<T: RowReadable>(&self) -> Option<MetadataTable<'_, T>> {
        let (offset, rows) = (*self.tables.get(T::TABLE_ID as usize)?)?;

        MetadataTable::new(&self.data[offset..], rows, &self.info).ok()
    }
}
