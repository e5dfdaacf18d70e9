//! The CLR runtime header (`IMAGE_COR20_HEADER`, ECMA-335 II.25.3.3).
//!
//! Located through PE data directory 14, the header points at the metadata root and carries
//! runtime flags. Only the fields needed to locate metadata are always validated; the stricter
//! ECMA-335 checks (undefined flag bits, reserved fields) are opt-in through
//! [`crate::ExtractorConfig::strict_headers`].

use crate::{file::parser::Parser, Error::OutOfBounds, Result};

/// Size of the header, which is also the only valid value of `cb`.
pub const COR20_HEADER_SIZE: usize = 72;

/// Flag bits defined by ECMA-335 (`COMIMAGE_FLAGS_*`), including the 32BITPREFERRED bit
const VALID_FLAGS: u32 = 0x0002_001F;

/// The parsed CLR runtime header.
#[derive(Debug, Clone)]
pub struct Cor20Header {
    /// Size of the header in bytes
    pub cb: u32,
    /// Minimum runtime major version
    pub major_runtime_version: u16,
    /// Minimum runtime minor version
    pub minor_runtime_version: u16,
    /// RVA of the metadata root
    pub meta_data_rva: u32,
    /// Size of the metadata
    pub meta_data_size: u32,
    /// `COMIMAGE_FLAGS_*`
    pub flags: u32,
    /// Entry point token or RVA
    pub entry_point_token: u32,
    /// RVA of managed resources
    pub resource_rva: u32,
    /// Size of managed resources
    pub resource_size: u32,
    /// RVA of the strong name signature
    pub strong_name_signature_rva: u32,
    /// Size of the strong name signature
    pub strong_name_signature_size: u32,
    /// Reserved, should be zero
    pub code_manager_table_rva: u32,
    /// Reserved, should be zero
    pub code_manager_table_size: u32,
    /// RVA of the vtable fixups
    pub vtable_fixups_rva: u32,
    /// Size of the vtable fixups
    pub vtable_fixups_size: u32,
    /// Reserved, should be zero
    pub export_address_table_jmp_rva: u32,
    /// Reserved, should be zero
    pub export_address_table_jmp_size: u32,
    /// Precompiled image info (ReadyToRun / NGEN)
    pub managed_native_header_rva: u32,
    /// Size of the managed native header
    pub managed_native_header_size: u32,
}

impl Cor20Header {
    /// Parse the header from `data`.
    ///
    /// With `strict` set, undefined flag bits and non-zero reserved fields are rejected.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for short input and [`crate::Error::Malformed`] for
    /// a header that cannot locate metadata (or fails the strict checks).
    pub fn read(data: &[u8], strict: bool) -> Result<Cor20Header> {
        if data.len() < COR20_HEADER_SIZE {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(data);

        let cb = parser.read_le::<u32>()?;
        if cb as usize != COR20_HEADER_SIZE {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }

        let major_runtime_version = parser.read_le::<u16>()?;
        let minor_runtime_version = parser.read_le::<u16>()?;

        let meta_data_rva = parser.read_le::<u32>()?;
        if meta_data_rva == 0 {
            return Err(malformed_error!("Metadata RVA cannot be zero"));
        }

        let meta_data_size = parser.read_le::<u32>()?;
        if meta_data_size == 0 {
            return Err(malformed_error!("Metadata size cannot be zero"));
        }

        let header = Cor20Header {
            cb,
            major_runtime_version,
            minor_runtime_version,
            meta_data_rva,
            meta_data_size,
            flags: parser.read_le::<u32>()?,
            entry_point_token: parser.read_le::<u32>()?,
            resource_rva: parser.read_le::<u32>()?,
            resource_size: parser.read_le::<u32>()?,
            strong_name_signature_rva: parser.read_le::<u32>()?,
            strong_name_signature_size: parser.read_le::<u32>()?,
            code_manager_table_rva: parser.read_le::<u32>()?,
            code_manager_table_size: parser.read_le::<u32>()?,
            vtable_fixups_rva: parser.read_le::<u32>()?,
            vtable_fixups_size: parser.read_le::<u32>()?,
            export_address_table_jmp_rva: parser.read_le::<u32>()?,
            export_address_table_jmp_size: parser.read_le::<u32>()?,
            managed_native_header_rva: parser.read_le::<u32>()?,
            managed_native_header_size: parser.read_le::<u32>()?,
        };

        if strict {
            header.validate()?;
        }

        Ok(header)
    }

    fn validate(&self) -> Result<()> {
        if self.major_runtime_version == 0 || self.major_runtime_version > 10 {
            return Err(malformed_error!(
                "Invalid major runtime version: {}",
                self.major_runtime_version
            ));
        }

        if self.flags & !VALID_FLAGS != 0 {
            return Err(malformed_error!(
                "Invalid CLR flags: 0x{:08X} contains undefined bits",
                self.flags
            ));
        }

        if self.code_manager_table_rva != 0 || self.code_manager_table_size != 0 {
            return Err(malformed_error!(
                "Code Manager Table fields must be zero (reserved)"
            ));
        }

        if self.export_address_table_jmp_rva != 0 || self.export_address_table_jmp_size != 0 {
            return Err(malformed_error!(
                "Export Address Table Jump fields must be zero (reserved)"
            ));
        }

        Ok(())
    }
}
