//! Core trait for abstracting snapshot storage.
//!
//! The [`MemoryLayer`] trait lets a [`MemoryImage`](crate::memory::image::MemoryImage)
//! sit on top of any byte source addressed from zero.

use crate::memory::error::MemoryResult;

/// Trait for reading from a zero-based byte layer.
pub trait MemoryLayer: Send + Sync {
    /// Read `length` bytes starting at `offset`.
    fn read(&self, offset: u64, length: usize) -> MemoryResult<Vec<u8>>;

    /// Check if the range `[offset, offset+length)` is valid.
    fn is_valid(&self, offset: u64, length: u64) -> bool;

    /// The name of this layer.
    fn name(&self) -> &str;

    /// Maximum valid offset in this layer.
    fn maximum_address(&self) -> u64;
}
