use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A row of the `CustomAttribute` table (II.22.10): one attribute instance attached to a
/// metadata row.
#[derive(Clone, Debug)]
pub struct CustomAttributeRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// The row the attribute is attached to
    pub parent: CodedIndex,
    /// The attribute constructor, a `MethodDef` or `MemberRef`
    pub constructor: CodedIndex,
    /// `#Blob` index of the encoded arguments
    pub value: u32,
}

impl RowReadable for CustomAttributeRaw {
    const TABLE_ID: TableId = TableId::CustomAttribute;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(CustomAttributeRaw {
            rid,
            token: Token::from_parts(TableId::CustomAttribute, rid),
            parent: CodedIndex::read(data, offset, sizes, CodedIndexType::HasCustomAttribute)?,
            constructor: CodedIndex::read(
                data,
                offset,
                sizes,
                CodedIndexType::CustomAttributeType,
            )?,
            value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::MetadataTable;

    #[test]
    fn crafted_short() {
        #[rustfmt::skip]
        let data = vec![
            0x2E, 0x00, // parent: Assembly row 1
            0x0B, 0x00, // constructor: MemberRef row 1
            0x10, 0x00, // value
            0x0E, 0x00, // parent: Assembly row 0 (null)
            0x12, 0x00, // constructor: MethodDef row 2
            0x00, 0x00, // value
        ];

        let sizes = TableInfo::new_test(&[(TableId::CustomAttribute, 2)], false, false, false);
        let table = MetadataTable::<CustomAttributeRaw>::new(&data, 2, &sizes).unwrap();

        let rows: Vec<_> = table.iter().map(|row| row.unwrap()).collect();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].token.value(), 0x0C00_0001);
        assert_eq!(rows[0].parent.tag, TableId::Assembly);
        assert_eq!(rows[0].parent.row, 1);
        assert_eq!(rows[0].constructor.tag, TableId::MemberRef);
        assert_eq!(rows[0].constructor.row, 1);
        assert_eq!(rows[0].value, 0x10);

        assert_eq!(rows[1].parent.tag, TableId::Assembly);
        assert_eq!(rows[1].parent.row, 0);
        assert_eq!(rows[1].constructor.tag, TableId::MethodDef);
        assert_eq!(rows[1].constructor.row, 2);
    }
}
