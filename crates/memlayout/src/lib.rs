//! Layout profiles and raw memory field readers for debugger pretty-printers.
//!
//! This crate describes how runtime objects are laid out in the memory of an
//! inspected process, and reads them back. It provides:
//!
//! - Parsing of `.json` and `.json.xz` (LZMA-compressed) layout profiles
//! - [`TypeName`] for splitting C++ type names into template name and arguments
//! - [`LayoutPattern`], a field descriptor list built from strings like `"ppp"`
//!   or `"@{int}@{float}pp"`
//! - [`FieldReader`] for reading a pattern's fields at an address in one go
//! - [`ChainWalker`] for walking singly-linked node chains a fixed number of steps
//!
//! # Example
//!
//! ```rust,ignore
//! use memlayout::{parse_profile_file, FieldReader, LayoutPattern};
//!
//! let profile = parse_profile_file("layouts/x86_64.json")?;
//! let reader = FieldReader::new(&memory, &profile);
//! let (fields, next) = reader.split(&LayoutPattern::parse("ppp")?, 0x7ffd_1000)?;
//! ```

pub mod error;
pub mod parser;
pub mod pattern;
pub mod reader;
pub mod typename;
pub mod types;

// Re-export key types at crate root.
pub use error::{LayoutError, LayoutResult};
pub use parser::{parse_profile_bytes, parse_profile_file, parse_profile_str};
pub use pattern::{FieldKind, LayoutPattern, PatternLayout, SlotLayout};
pub use reader::{le_unsigned, offset_addr, ChainWalker, FieldReader, FieldValue, MemoryAccess};
pub use typename::TypeName;
pub use types::{BaseType, FieldDef, LayoutProfile, TypeInfo, TypeMetrics, UserType};
