use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A row of the `TypeDef` table (II.22.37): a type defined in this module.
#[derive(Clone, Debug)]
pub struct TypeDefRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// `TypeAttributes`
    pub flags: u32,
    /// `#Strings` index of the type name
    pub type_name: u32,
    /// `#Strings` index of the namespace
    pub type_namespace: u32,
    /// Base type
    pub extends: CodedIndex,
    /// First row of this type's run in the `Field` table
    pub field_list: u32,
    /// First row of this type's run in the `MethodDef` table
    pub method_list: u32,
}

impl RowReadable for TypeDefRaw {
    const TABLE_ID: TableId = TableId::TypeDef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(TypeDefRaw {
            rid,
            token: Token::from_parts(TableId::TypeDef, rid),
            flags: read_le_at::<u32>(data, offset)?,
            type_name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            type_namespace: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            extends: CodedIndex::read(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
            field_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::Field))?,
            method_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::MethodDef))?,
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
            0x01, 0x00, 0x10, 0x00, // flags
            0x02, 0x00,             // type_name
            0x03, 0x00,             // type_namespace
            0x05, 0x00,             // extends: TypeRef row 1
            0x01, 0x00,             // field_list
            0x04, 0x00,             // method_list
        ];

        let sizes = TableInfo::new_test(&[(TableId::TypeDef, 1)], false, false, false);
        let table = MetadataTable::<TypeDefRaw>::new(&data, 1, &sizes).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.token.value(), 0x0200_0001);
        assert_eq!(row.flags, 0x0010_0001);
        assert_eq!(row.type_name, 2);
        assert_eq!(row.type_namespace, 3);
        assert_eq!(row.extends.tag, TableId::TypeRef);
        assert_eq!(row.extends.row, 1);
        assert_eq!(row.field_list, 1);
        assert_eq!(row.method_list, 4);
    }

    #[test]
    fn crafted_large_method_index() {
        #[rustfmt::skip]
        let data = vec![
            0x00, 0x00, 0x00, 0x00,
            0x02, 0x00,
            0x03, 0x00,
            0x00, 0x00,
            0x01, 0x00,
            0x04, 0x00, 0x01, 0x00, // method_list
        ];

        let sizes = TableInfo::new_test(
            &[(TableId::TypeDef, 1), (TableId::MethodDef, 0x1_0000)],
            false,
            false,
            false,
        );
        let table = MetadataTable::<TypeDefRaw>::new(&data, 1, &sizes).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.method_list, 0x0001_0004);
    }
}
