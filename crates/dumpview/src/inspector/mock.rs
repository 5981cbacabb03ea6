//! Sparse in-memory address space for decoder tests.

use memlayout::MemoryAccess;
use parking_lot::Mutex;

/// Mapped regions plus a log of every read and validity query.
#[derive(Default)]
pub struct MockMemory {
    regions: Vec<(u64, Vec<u8>)>,
    reads: Mutex<Vec<(u64, usize)>>,
    probes: Mutex<Vec<u64>>,
}

impl MockMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `bytes` at `addr`.
    pub fn with(mut self, addr: u64, bytes: &[u8]) -> Self {
        self.regions.push((addr, bytes.to_vec()));
        self
    }

    /// Map consecutive little-endian 64-bit words at `addr`.
    pub fn with_words(self, addr: u64, words: &[u64]) -> Self {
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        self.with(addr, &bytes)
    }

    /// Map a zeroed region of `len` bytes at `addr`.
    pub fn with_zeroed(self, addr: u64, len: usize) -> Self {
        self.with(addr, &vec![0u8; len])
    }

    pub fn read_log(&self) -> Vec<(u64, usize)> {
        self.reads.lock().clone()
    }

    pub fn read_count(&self) -> usize {
        self.reads.lock().len()
    }

    pub fn probe_log(&self) -> Vec<u64> {
        self.probes.lock().clone()
    }

    pub fn clear_logs(&self) {
        self.reads.lock().clear();
        self.probes.lock().clear();
    }

    fn find(&self, addr: u64, len: u64) -> Option<&[u8]> {
        self.regions.iter().find_map(|(start, bytes)| {
            let end = start + bytes.len() as u64;
            if addr >= *start && addr.checked_add(len)? <= end {
                let offset = (addr - start) as usize;
                Some(&bytes[offset..offset + len as usize])
            } else {
                None
            }
        })
    }
}

impl MemoryAccess for MockMemory {
    fn read(&self, offset: u64, length: usize) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        self.reads.lock().push((offset, length));
        self.find(offset, length as u64)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| format!("unmapped read at {:#x}", offset).into())
    }

    fn is_valid(&self, offset: u64, length: u64) -> bool {
        self.probes.lock().push(offset);
        length > 0 && self.find(offset, length).is_some()
    }
}
