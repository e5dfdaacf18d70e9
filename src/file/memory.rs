//! Owned in-memory backend.

use super::Backend;
use crate::{Error::OutOfBounds, Result};

/// Serves module bytes from an owned buffer, used for [`crate::ExtractorConfig::load_into_memory`]
/// and for images that never touched the disk.
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Take ownership of `data`
    pub fn new(data: Vec<u8>) -> Memory {
        Memory { data }
    }
}

impl Backend for Memory {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(OutOfBounds);
        };

        if offset_end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_within_bounds() {
        let mut data = vec![0xCC_u8; 64];
        data[10..15].copy_from_slice(&[0xBB; 5]);

        let memory = Memory::new(data);

        assert_eq!(memory.len(), 64);
        assert_eq!(memory.data()[0], 0xCC);
        assert_eq!(memory.data_slice(10, 5).unwrap(), &[0xBB; 5]);
        assert_eq!(memory.data_slice(64, 0).unwrap(), &[] as &[u8]);
    }

    #[test]
    fn rejects_out_of_bounds() {
        let memory = Memory::new(vec![0; 16]);

        assert!(matches!(memory.data_slice(8, 9), Err(OutOfBounds)));
        assert!(matches!(
            memory.data_slice(usize::MAX, 2),
            Err(OutOfBounds)
        ));
    }
}
