//! Layout decoders, one per recognized type shape, and the registry that
//! maps type names to them.
//!
//! Every decoder has the same shape: read a fixed layout through the
//! inspector, validate it, and report a display string, a child count and
//! (when expanded) children. Decoders hold no state between calls.

pub mod glm;
pub mod nanoem;
pub mod tinystl;

use crate::inspector::{DisplayFormat, DumpResult, Inspector, Value};
use memlayout::{offset_addr, FieldKind, FieldValue, LayoutError, LayoutPattern, TypeName};
use std::collections::HashMap;
use tracing::debug;

/// Decodes one value through the inspector.
pub type DumpFn = fn(&mut dyn Inspector, &Value) -> DumpResult<()>;

/// Static layout of a type shape, for sizing values the profile does not describe.
pub type LayoutFn = fn(&TypeName) -> Option<LayoutPattern>;

/// A registered decoder.
pub struct DumperEntry {
    /// Template name the decoder is selected by, e.g. `tinystl::vector`.
    pub name: &'static str,
    pub description: &'static str,
    pub dump: DumpFn,
    /// Display formats offered, in order. Empty means automatic only.
    pub formats: &'static [DisplayFormat],
    pub layout: LayoutFn,
}

/// Mapping from template name to decoder, built once at startup.
pub struct Registry {
    entries: HashMap<&'static str, &'static DumperEntry>,
}

impl Registry {
    /// All decoders shipped with the crate.
    pub fn builtin() -> Self {
        let registry = Self::from_entries(
            tinystl::DUMPERS
                .iter()
                .chain(glm::DUMPERS)
                .chain(nanoem::DUMPERS),
        );
        debug!("Registered {} dumpers", registry.len());
        registry
    }

    fn from_entries(entries: impl IntoIterator<Item = &'static DumperEntry>) -> Self {
        Registry {
            entries: entries.into_iter().map(|e| (e.name, e)).collect(),
        }
    }

    pub fn lookup(&self, template_name: &str) -> Option<&'static DumperEntry> {
        self.entries.get(template_name).copied()
    }

    /// Entries sorted by name.
    pub fn entries(&self) -> Vec<&'static DumperEntry> {
        let mut entries: Vec<_> = self.entries.values().copied().collect();
        entries.sort_by_key(|e| e.name);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A pattern of `count` pointer slots.
pub(crate) fn pointers(count: usize) -> LayoutPattern {
    LayoutPattern::new(vec![FieldKind::Pointer; count])
}

/// Address of a member: from the layout profile when it describes the type,
/// else at `default_offset`.
pub(crate) fn member_addr(
    d: &dyn Inspector,
    value: &Value,
    name: &str,
    default_offset: u64,
) -> DumpResult<u64> {
    match d.field(value, name) {
        Some(member) => Ok(member.addr),
        None => Ok(offset_addr(value.addr, default_offset)?),
    }
}

/// The sub-value located by slot `index` of a split.
pub(crate) fn slot_value(fields: &[FieldValue], index: usize) -> DumpResult<Value> {
    fields
        .get(index)
        .and_then(FieldValue::as_typed)
        .map(|(addr, type_name)| Value::new(addr, type_name.clone()))
        .ok_or_else(|| {
            LayoutError::BadPattern {
                pattern: format!("{} slots", fields.len()),
                msg: format!("slot {} is not a sub-value", index),
            }
            .into()
        })
}

/// The pointer held by slot `index` of a split.
pub(crate) fn slot_pointer(fields: &[FieldValue], index: usize) -> DumpResult<u64> {
    fields
        .get(index)
        .and_then(FieldValue::as_u64)
        .ok_or_else(|| {
            LayoutError::BadPattern {
                pattern: format!("{} slots", fields.len()),
                msg: format!("slot {} is not a pointer", index),
            }
            .into()
        })
}

/// The (first, last, capacity) pointers of a growable buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTriple {
    pub first: u64,
    pub last: u64,
    pub capacity: u64,
}

impl BufferTriple {
    pub fn read(d: &dyn Inspector, addr: u64) -> DumpResult<Self> {
        let (fields, _) = d.split(&pointers(3), addr)?;
        Ok(BufferTriple {
            first: slot_pointer(&fields, 0)?,
            last: slot_pointer(&fields, 1)?,
            capacity: slot_pointer(&fields, 2)?,
        })
    }

    /// Never allocated, or already released.
    pub fn is_null(&self) -> bool {
        self.first == 0 || self.last == 0
    }

    /// Ordering of the three bounds.
    pub fn check(&self, d: &dyn Inspector) -> DumpResult<()> {
        d.check(self.first <= self.last, "buffer end before its start")?;
        d.check(self.last <= self.capacity, "buffer end past its capacity")
    }

    /// Plausibility of all three bounds.
    pub fn check_pointers(&self, d: &dyn Inspector) -> DumpResult<()> {
        d.check_pointer(self.first)?;
        d.check_pointer(self.last)?;
        d.check_pointer(self.capacity)
    }

    /// Bytes in use. Only meaningful once [`check`](Self::check) has passed.
    pub fn byte_len(&self) -> usize {
        (self.last - self.first) as usize
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::dumpers::Registry;
    use crate::inspector::mock::MockMemory;
    use crate::inspector::{DecodedView, DumpOptions, Dumper, Value};
    use memlayout::LayoutProfile;

    /// Dump one value with the builtin registry and a default profile.
    pub fn dump(memory: &MockMemory, type_name: &str, addr: u64, options: &DumpOptions) -> DecodedView {
        let profile = LayoutProfile::default();
        dump_with_profile(memory, &profile, type_name, addr, options)
    }

    pub fn dump_with_profile(
        memory: &MockMemory,
        profile: &LayoutProfile,
        type_name: &str,
        addr: u64,
        options: &DumpOptions,
    ) -> DecodedView {
        let registry = Registry::builtin();
        let value = Value::parse(addr, type_name).unwrap();
        Dumper::new(memory, profile, &registry, options).dump_value("v", &value)
    }

    pub fn names(view: &DecodedView) -> Vec<&str> {
        view.children.iter().map(|c| c.name.as_str()).collect()
    }
}
