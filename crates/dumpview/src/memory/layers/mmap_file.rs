//! Memory-mapped snapshot file layer.
//!
//! Snapshots are mapped read-only; the debugger never writes back into them.

use crate::memory::error::{MemoryError, MemoryResult};
use crate::memory::traits::MemoryLayer;
use memmap2::{Mmap, MmapOptions};
use parking_lot::RwLock;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

/// Internal state for the memory-mapped layer.
struct MmapState {
    /// None for empty files, which cannot be mapped.
    mmap: Option<Mmap>,
    size: u64,
}

impl MmapState {
    fn as_slice(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }
}

/// A read-only memory-mapped file layer.
///
/// # Example
///
/// ```rust,ignore
/// let layer = MmapFileLayer::open("snapshot", "/tmp/heap.bin")?;
/// let data = layer.read_bytes(0, 4096, false)?;
/// ```
pub struct MmapFileLayer {
    name: String,
    /// File location as given (file:// URL or path).
    location: String,
    path: PathBuf,
    /// None once the layer has been destroyed.
    state: Option<Arc<RwLock<MmapState>>>,
}

impl MmapFileLayer {
    /// Parse a file:// URL to a path.
    fn parse_location(location: &str) -> PathBuf {
        let path_str = match location.strip_prefix("file://") {
            // file:///C:/path -> C:/path
            Some(url_path)
                if url_path.starts_with('/')
                    && url_path.len() > 2
                    && url_path.chars().nth(2) == Some(':') =>
            {
                &url_path[1..]
            }
            Some(url_path) => url_path,
            None => location,
        };

        PathBuf::from(urlencoding_decode(path_str))
    }

    fn create_mmap(path: &PathBuf) -> MemoryResult<MmapState> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        if size == 0 {
            return Ok(MmapState { mmap: None, size: 0 });
        }

        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Ok(MmapState {
            mmap: Some(mmap),
            size,
        })
    }

    fn get_state(&self) -> MemoryResult<&Arc<RwLock<MmapState>>> {
        self.state
            .as_ref()
            .ok_or_else(|| MemoryError::layer_destroyed(&self.name))
    }

    /// Open a snapshot file.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the layer
    /// * `path` - File location (file:// URL or plain filesystem path)
    pub fn open(name: impl Into<String>, path: impl Into<String>) -> MemoryResult<Self> {
        let name = name.into();
        let location = path.into();
        let resolved = Self::parse_location(&location);
        let state = Self::create_mmap(&resolved)?;

        Ok(MmapFileLayer {
            name,
            location,
            path: resolved,
            state: Some(Arc::new(RwLock::new(state))),
        })
    }

    /// Read bytes from the layer.
    ///
    /// # Arguments
    ///
    /// * `offset` - Starting offset to read from
    /// * `length` - Number of bytes to read
    /// * `pad` - If true, pad with zeros for out-of-range reads; otherwise return an error
    pub fn read_bytes(&self, offset: u64, length: usize, pad: bool) -> MemoryResult<Vec<u8>> {
        let state = self.get_state()?;
        let state_guard = state.read();

        let data = state_guard.as_slice();
        let size = state_guard.size;

        if offset > size || (offset == size && length > 0) {
            if pad {
                return Ok(vec![0u8; length]);
            }
            return Err(MemoryError::invalid_address(
                &self.name,
                offset,
                "Offset outside of the snapshot",
            ));
        }

        let start = offset as usize;
        let available = (size - offset) as usize;

        if length <= available {
            Ok(data[start..start + length].to_vec())
        } else if pad {
            let mut result = Vec::with_capacity(length);
            result.extend_from_slice(&data[start..]);
            result.resize(length, 0);
            Ok(result)
        } else {
            Err(MemoryError::invalid_address(
                &self.name,
                offset + available as u64,
                "Could not read sufficient bytes from the snapshot",
            ))
        }
    }

    /// Check if an offset range is valid.
    pub fn is_valid(&self, offset: u64, length: u64) -> bool {
        if length == 0 {
            return false;
        }

        let Ok(state) = self.get_state() else {
            return false;
        };
        let size = state.read().size;
        if size == 0 {
            return false;
        }

        let max_addr = size - 1;
        let end_offset = offset.saturating_add(length).saturating_sub(1);
        offset <= max_addr && end_offset <= max_addr
    }

    /// Destroy the layer, releasing the mapping.
    pub fn destroy(&mut self) {
        self.state = None;
    }

    /// Size of the mapped file in bytes.
    pub fn size(&self) -> u64 {
        self.get_state().map(|s| s.read().size).unwrap_or(0)
    }

    /// The file location as given.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The resolved filesystem path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl MemoryLayer for MmapFileLayer {
    fn read(&self, offset: u64, length: usize) -> MemoryResult<Vec<u8>> {
        self.read_bytes(offset, length, false)
    }

    fn is_valid(&self, offset: u64, length: u64) -> bool {
        MmapFileLayer::is_valid(self, offset, length)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn maximum_address(&self) -> u64 {
        self.size().saturating_sub(1)
    }
}

/// Simple URL decoding for file paths.
fn urlencoding_decode(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            if hex.len() == 2 {
                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                    result.push(byte as char);
                    continue;
                }
            }
            result.push('%');
            result.push_str(&hex);
        } else {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn snapshot(bytes: &[u8]) -> NamedTempFile {
        let mut tmpfile = NamedTempFile::new().unwrap();
        tmpfile.write_all(bytes).unwrap();
        tmpfile.flush().unwrap();
        tmpfile
    }

    #[test]
    fn test_parse_file_url() {
        let path = MmapFileLayer::parse_location("file:///tmp/heap.bin");
        assert_eq!(path, PathBuf::from("/tmp/heap.bin"));
    }

    #[test]
    fn test_parse_plain_path() {
        let path = MmapFileLayer::parse_location("/tmp/heap.bin");
        assert_eq!(path, PathBuf::from("/tmp/heap.bin"));
    }

    #[test]
    fn test_url_decode() {
        let path = MmapFileLayer::parse_location("file:///tmp/heap%20dump.bin");
        assert_eq!(path, PathBuf::from("/tmp/heap dump.bin"));
    }

    #[test]
    fn test_open_and_read_bytes() {
        let tmpfile = snapshot(b"Hello, World!");
        let layer = MmapFileLayer::open("test", tmpfile.path().to_str().unwrap()).unwrap();

        assert_eq!(&layer.read_bytes(0, 5, false).unwrap(), b"Hello");
        assert_eq!(&layer.read_bytes(7, 5, false).unwrap(), b"World");
        assert_eq!(layer.size(), 13);
    }

    #[test]
    fn test_read_bytes_with_padding() {
        let tmpfile = snapshot(b"Hello");
        let layer = MmapFileLayer::open("test", tmpfile.path().to_str().unwrap()).unwrap();

        assert_eq!(&layer.read_bytes(3, 5, true).unwrap(), b"lo\0\0\0");
        assert_eq!(&layer.read_bytes(100, 3, true).unwrap(), b"\0\0\0");
        assert!(layer.read_bytes(100, 3, false).is_err());
        assert!(layer.read_bytes(3, 5, false).is_err());
    }

    #[test]
    fn test_is_valid() {
        let tmpfile = snapshot(b"0123456789");
        let layer = MmapFileLayer::open("test", tmpfile.path().to_str().unwrap()).unwrap();

        assert!(layer.is_valid(0, 1));
        assert!(layer.is_valid(0, 10));
        assert!(layer.is_valid(9, 1));
        assert!(!layer.is_valid(10, 1));
        assert!(!layer.is_valid(0, 11));
        assert!(!layer.is_valid(0, 0));
    }

    #[test]
    fn test_empty_file() {
        let tmpfile = snapshot(b"");
        let layer = MmapFileLayer::open("empty", tmpfile.path().to_str().unwrap()).unwrap();
        assert_eq!(layer.size(), 0);
        assert!(!layer.is_valid(0, 1));
        assert!(layer.read_bytes(0, 1, false).is_err());
    }

    #[test]
    fn test_memory_layer_trait() {
        let tmpfile = snapshot(b"Hello, World!");
        let layer = MmapFileLayer::open("test", tmpfile.path().to_str().unwrap()).unwrap();

        let layer_ref: &dyn MemoryLayer = &layer;
        assert_eq!(layer_ref.name(), "test");
        assert_eq!(layer_ref.maximum_address(), 12);
        assert_eq!(&layer_ref.read(0, 5).unwrap(), b"Hello");
    }

    #[test]
    fn test_destroy() {
        let tmpfile = snapshot(b"data");
        let mut layer = MmapFileLayer::open("test", tmpfile.path().to_str().unwrap()).unwrap();

        assert!(layer.read_bytes(0, 4, false).is_ok());
        layer.destroy();
        assert!(matches!(
            layer.read_bytes(0, 4, false),
            Err(MemoryError::LayerDestroyed(_))
        ));
        assert!(!layer.is_valid(0, 1));
    }
}
