//! Error types for the memlayout crate.

use thiserror::Error;

/// Layout profile parsing and raw field reading errors.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Layout profile not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("XZ/LZMA decompression error: {0}")]
    Decompression(String),

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("Type not found: {0}")]
    TypeNotFound(String),

    #[error("Field not found: {field} in type {type_name}")]
    FieldNotFound { type_name: String, field: String },

    #[error("Memory read error at offset {offset:#x}: {msg}")]
    MemoryRead { offset: u64, msg: String },

    #[error("Invalid pointer: {0:#x}")]
    InvalidPointer(u64),

    #[error("Address {addr:#x} + {offset:#x} is outside the address space")]
    AddressOverflow { addr: u64, offset: u64 },

    #[error("Unsupported byte order '{endian}' for base type '{type_name}'")]
    UnsupportedEndian { type_name: String, endian: String },

    #[error("Bad layout pattern '{pattern}': {msg}")]
    BadPattern { pattern: String, msg: String },

    #[error("Bad type name '{0}'")]
    BadTypeName(String),

    #[error("Size of type '{0}' is unknown")]
    UnknownSize(String),
}

pub type LayoutResult<T> = Result<T, LayoutError>;
