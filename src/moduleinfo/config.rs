//! Extraction configuration
//!
//! Controls how much data a single extraction may read, how the module bytes are accessed and
//! how strictly the CLR header is checked.

/// Default size limit, large enough for any framework assembly
const DEFAULT_MAX_FILE_SIZE: u64 = 512 * 1024 * 1024;

/// Configuration for [`crate::extract_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Files larger than this are rejected with [`crate::Error::FileTooLarge`] before any data
    /// is read
    pub max_file_size: u64,

    /// Read the whole file into memory instead of memory-mapping it
    pub load_into_memory: bool,

    /// Reject CLR headers with undefined flag bits or non-zero reserved fields
    pub strict_headers: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            load_into_memory: false,
            strict_headers: false,
        }
    }
}

impl ExtractorConfig {
    /// Accepts anything a runtime would load: no size limit, relaxed header checks
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            max_file_size: u64::MAX,
            load_into_memory: false,
            strict_headers: false,
        }
    }

    /// Enforces the reserved fields of the CLR header
    ///
    /// Modules produced by obfuscators or unusual compilers may fail these checks even though
    /// the runtime loads them.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            load_into_memory: false,
            strict_headers: true,
        }
    }
}
