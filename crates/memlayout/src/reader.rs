//! FieldReader: reads layout patterns out of raw memory.
//!
//! This is the bridge between layout descriptors and the bytes of an inspected
//! process. Given a pattern and an address, it reads every scalar slot in a
//! single memory access and locates every typed sub-value.

use crate::error::{LayoutError, LayoutResult};
use crate::pattern::{FieldKind, LayoutPattern};
use crate::typename::TypeName;
use crate::types::TypeMetrics;
use tracing::debug;

/// Trait for reading raw bytes from the inspected address space.
pub trait MemoryAccess: Send + Sync {
    fn read(&self, offset: u64, length: usize) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>>;
    fn is_valid(&self, offset: u64, length: u64) -> bool;
}

/// One decoded slot of a pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Pointer(u64),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    /// Padding bytes skipped before the next slot.
    Padding(usize),
    /// A sub-value located at `addr`; its bytes are left to the caller.
    Typed { addr: u64, type_name: TypeName },
}

impl FieldValue {
    pub fn as_pointer(&self) -> Option<u64> {
        match self {
            FieldValue::Pointer(p) => Some(*p),
            _ => None,
        }
    }

    /// Integer view of pointer and integer slots.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::Pointer(v) | FieldValue::Unsigned(v) => Some(*v),
            FieldValue::Signed(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_typed(&self) -> Option<(u64, &TypeName)> {
        match self {
            FieldValue::Typed { addr, type_name } => Some((*addr, type_name)),
            _ => None,
        }
    }
}

/// Reads patterns from memory.
///
/// # Example
///
/// ```rust,ignore
/// let reader = FieldReader::new(&memory, &profile);
/// let (fields, _) = reader.split(&LayoutPattern::parse("ppp")?, vec_addr)?;
/// let first = fields[0].as_pointer();
/// ```
pub struct FieldReader<'a> {
    memory: &'a dyn MemoryAccess,
    metrics: &'a dyn TypeMetrics,
}

impl<'a> FieldReader<'a> {
    pub fn new(memory: &'a dyn MemoryAccess, metrics: &'a dyn TypeMetrics) -> Self {
        FieldReader { memory, metrics }
    }

    /// Read raw bytes.
    pub fn read_bytes(&self, addr: u64, length: usize) -> LayoutResult<Vec<u8>> {
        let bytes = self
            .memory
            .read(addr, length)
            .map_err(|e| LayoutError::MemoryRead {
                offset: addr,
                msg: e.to_string(),
            })?;
        if bytes.len() < length {
            return Err(LayoutError::MemoryRead {
                offset: addr,
                msg: format!("short read: {} of {} bytes", bytes.len(), length),
            });
        }
        Ok(bytes)
    }

    /// Read a pointer-sized value at a raw address.
    pub fn read_pointer(&self, addr: u64) -> LayoutResult<u64> {
        let size = self.metrics.pointer_size();
        let bytes = self.read_bytes(addr, size)?;
        Ok(le_unsigned(&bytes))
    }

    /// Read the fields described by `pattern` at `addr`.
    ///
    /// Returns one value per slot plus the address just past the last slot.
    /// Scalar slots are read with a single memory access.
    pub fn split(&self, pattern: &LayoutPattern, addr: u64) -> LayoutResult<(Vec<FieldValue>, u64)> {
        let layout = pattern.layout(self.metrics)?;
        let bytes = if pattern.has_scalars() {
            self.read_bytes(addr, layout.size)?
        } else {
            Vec::new()
        };

        let mut values = Vec::with_capacity(pattern.len());
        for (kind, slot) in pattern.slots().iter().zip(&layout.slots) {
            let raw = || &bytes[slot.offset..slot.offset + slot.size];
            let value = match kind {
                FieldKind::Pointer => FieldValue::Pointer(le_unsigned(raw())),
                FieldKind::Int { signed: false, .. } => FieldValue::Unsigned(le_unsigned(raw())),
                FieldKind::Int { signed: true, size } => {
                    FieldValue::Signed(sign_extend(le_unsigned(raw()), *size))
                }
                FieldKind::Float { size: 4 } => {
                    FieldValue::Float(f32::from_bits(le_unsigned(raw()) as u32) as f64)
                }
                FieldKind::Float { .. } => FieldValue::Float(f64::from_bits(le_unsigned(raw()))),
                FieldKind::Padding => FieldValue::Padding(slot.size),
                FieldKind::Typed(type_name) => FieldValue::Typed {
                    addr: offset_addr(addr, slot.offset as u64)?,
                    type_name: type_name.clone(),
                },
            };
            values.push(value);
        }

        Ok((values, offset_addr(addr, layout.size as u64)?))
    }

    /// Walk a singly-linked chain of records.
    ///
    /// # Arguments
    ///
    /// * `pattern` - Layout of one chain record
    /// * `start` - Address of the first record
    /// * `next_index` - Index of the pointer slot holding the next record's address
    /// * `steps` - Exact number of records to visit
    pub fn walk_chain(
        &self,
        pattern: &'a LayoutPattern,
        start: u64,
        next_index: usize,
        steps: usize,
    ) -> LayoutResult<ChainWalker<'a>> {
        if !matches!(pattern.slots().get(next_index), Some(FieldKind::Pointer)) {
            return Err(LayoutError::BadPattern {
                pattern: pattern.to_string(),
                msg: format!("slot {} is not a pointer", next_index),
            });
        }
        Ok(ChainWalker {
            reader: FieldReader::new(self.memory, self.metrics),
            pattern,
            next_index,
            current: start,
            remaining: steps,
            steps_taken: 0,
        })
    }
}

/// Iterator over the records of a singly-linked chain.
///
/// Visits exactly the requested number of records; the chain's own terminator
/// is not consulted, so a chain that ends early yields an error instead.
pub struct ChainWalker<'a> {
    reader: FieldReader<'a>,
    pattern: &'a LayoutPattern,
    next_index: usize,
    current: u64,
    remaining: usize,
    steps_taken: usize,
}

impl<'a> ChainWalker<'a> {
    /// Decode the next record, or None once the step budget is spent.
    pub fn next_record(&mut self) -> LayoutResult<Option<Vec<FieldValue>>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        if self.current == 0 {
            return Err(LayoutError::InvalidPointer(0));
        }

        let (values, _) = self.reader.split(self.pattern, self.current)?;
        let next = values
            .get(self.next_index)
            .and_then(FieldValue::as_pointer)
            .unwrap_or(0);
        debug!(
            "chain step {} at {:#x} -> {:#x}",
            self.steps_taken, self.current, next
        );

        self.current = next;
        self.remaining -= 1;
        self.steps_taken += 1;
        Ok(Some(values))
    }

    /// Number of records visited so far.
    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// Collect all remaining records into a vector.
    pub fn collect_all(&mut self) -> LayoutResult<Vec<Vec<FieldValue>>> {
        let mut results = Vec::new();
        while let Some(record) = self.next_record()? {
            results.push(record);
        }
        Ok(results)
    }
}

/// `addr + offset`, or an error when the sum leaves the address space.
pub fn offset_addr(addr: u64, offset: u64) -> LayoutResult<u64> {
    addr.checked_add(offset).ok_or(LayoutError::AddressOverflow { addr, offset })
}

/// Little-endian unsigned integer of up to 8 bytes.
pub fn le_unsigned(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let n = bytes.len().min(8);
    buf[..n].copy_from_slice(&bytes[..n]);
    u64::from_le_bytes(buf)
}

fn sign_extend(value: u64, size: usize) -> i64 {
    if size == 0 || size >= 8 {
        return value as i64;
    }
    let shift = 64 - size * 8;
    ((value << shift) as i64) >> shift
}
