//! Memory snapshot: a file holding a span of an inspected process's memory.
//!
//! Byte 0 of the file corresponds to virtual address `base_address`, so
//! pointers read out of the snapshot can be followed directly.

use crate::memory::error::{MemoryError, MemoryResult};
use crate::memory::layers::MmapFileLayer;
use crate::memory::traits::MemoryLayer;
use memlayout::MemoryAccess;
use std::sync::Arc;

/// A memory-mapped snapshot placed at a base address.
pub struct MemoryImage {
    layer: Arc<dyn MemoryLayer>,
    base_address: u64,
}

impl MemoryImage {
    /// Open a snapshot file mapped at `base_address`.
    pub fn open(path: &str, base_address: u64) -> MemoryResult<Self> {
        let layer = MmapFileLayer::open("snapshot", path)?;
        Ok(Self::with_layer(Arc::new(layer), base_address))
    }

    /// Place an already opened layer at `base_address`.
    pub fn with_layer(layer: Arc<dyn MemoryLayer>, base_address: u64) -> Self {
        MemoryImage {
            layer,
            base_address,
        }
    }

    /// First address covered by the snapshot.
    pub fn base_address(&self) -> u64 {
        self.base_address
    }

    /// Size of the snapshot in bytes.
    pub fn size(&self) -> u64 {
        if self.layer.is_valid(0, 1) {
            self.layer.maximum_address() + 1
        } else {
            0
        }
    }

    fn to_offset(&self, addr: u64) -> MemoryResult<u64> {
        addr.checked_sub(self.base_address).ok_or_else(|| {
            MemoryError::invalid_address(self.layer.name(), addr, "below the snapshot base address")
        })
    }

    /// Read bytes at a virtual address.
    pub fn read_virtual(&self, addr: u64, length: usize) -> MemoryResult<Vec<u8>> {
        let offset = self.to_offset(addr)?;
        self.layer.read(offset, length)
    }

    /// Check if a virtual address range lies inside the snapshot.
    pub fn is_valid_virtual(&self, addr: u64, length: u64) -> bool {
        match addr.checked_sub(self.base_address) {
            Some(offset) => self.layer.is_valid(offset, length),
            None => false,
        }
    }
}

/// Implement memlayout's MemoryAccess trait for direct use with FieldReader.
impl MemoryAccess for MemoryImage {
    fn read(
        &self,
        offset: u64,
        length: usize,
    ) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        self.read_virtual(offset, length)
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
    }

    fn is_valid(&self, offset: u64, length: u64) -> bool {
        self.is_valid_virtual(offset, length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_base_address_translation() {
        let mut tmpfile = NamedTempFile::new().unwrap();
        tmpfile.write_all(&[0xaa; 16]).unwrap();
        tmpfile.write_all(&0x7ffd_0000_1010u64.to_le_bytes()).unwrap();
        tmpfile.flush().unwrap();

        let image = MemoryImage::open(tmpfile.path().to_str().unwrap(), 0x7ffd_0000_1000).unwrap();
        assert_eq!(image.size(), 24);
        assert_eq!(image.base_address(), 0x7ffd_0000_1000);

        let bytes = MemoryAccess::read(&image, 0x7ffd_0000_1010, 8).unwrap();
        assert_eq!(u64::from_le_bytes(bytes.try_into().unwrap()), 0x7ffd_0000_1010);

        assert!(MemoryAccess::is_valid(&image, 0x7ffd_0000_1000, 24));
        assert!(!MemoryAccess::is_valid(&image, 0x7ffd_0000_1000, 25));
        assert!(!MemoryAccess::is_valid(&image, 0x7ffd_0000_0fff, 1));
    }

    #[test]
    fn test_read_below_base() {
        let mut tmpfile = NamedTempFile::new().unwrap();
        tmpfile.write_all(b"snapshot").unwrap();
        tmpfile.flush().unwrap();

        let image = MemoryImage::open(tmpfile.path().to_str().unwrap(), 0x1000).unwrap();
        let err = image.read_virtual(0x800, 4).unwrap_err();
        assert!(err.to_string().contains("below the snapshot base address"));
    }
}
