//! nanoem buffers: `ByteArray`, `MutableString` and `MutableWideString`.
//!
//! Each wraps a tinystl buffer in its `m_buffer` member.

use crate::dumpers::{member_addr, pointers, BufferTriple, DumperEntry};
use crate::inspector::format::{STRING_FORMATS, WIDE_STRING_FORMATS};
use crate::inspector::{DumpResult, Inspector, Value};
use memlayout::{LayoutPattern, TypeName};

pub const DUMPERS: &[DumperEntry] = &[
    DumperEntry {
        name: "nanoem::ByteArray",
        description: "Opaque byte buffer shown as its length",
        dump: dump_byte_array,
        formats: &[],
        layout: buffer_layout,
    },
    DumperEntry {
        name: "nanoem::MutableString",
        description: "Narrow string buffer",
        dump: dump_mutable_string,
        formats: STRING_FORMATS,
        layout: buffer_layout,
    },
    DumperEntry {
        name: "nanoem::MutableWideString",
        description: "Wide (wchar_t) string buffer",
        dump: dump_mutable_wide_string,
        formats: WIDE_STRING_FORMATS,
        layout: buffer_layout,
    },
];

const EMPTY: &str = "(empty)";

fn buffer_layout(_: &TypeName) -> Option<LayoutPattern> {
    Some(pointers(3))
}

/// The validated buffer, or None when it was never allocated.
fn read_buffer(d: &mut dyn Inspector, value: &Value) -> DumpResult<Option<BufferTriple>> {
    let buffer = BufferTriple::read(d, member_addr(d, value, "m_buffer", 0)?)?;
    if buffer.is_null() {
        d.put_value(EMPTY.to_string());
        d.put_num_child(0);
        return Ok(None);
    }
    buffer.check(d)?;
    if buffer.byte_len() > 0 {
        buffer.check_pointers(d)?;
    }
    Ok(Some(buffer))
}

pub fn dump_byte_array(d: &mut dyn Inspector, value: &Value) -> DumpResult<()> {
    if let Some(buffer) = read_buffer(d, value)? {
        d.put_value(format!("{} bytes", buffer.byte_len()));
        d.put_num_child(0);
    }
    Ok(())
}

fn dump_text(d: &mut dyn Inspector, value: &Value, char_type: &str) -> DumpResult<()> {
    let Some(buffer) = read_buffer(d, value)? else {
        return Ok(());
    };
    let format = d.current_item_format();
    d.put_char_array(buffer.first, buffer.byte_len(), &TypeName::parse(char_type)?, format)
}

pub fn dump_mutable_string(d: &mut dyn Inspector, value: &Value) -> DumpResult<()> {
    dump_text(d, value, "char")
}

pub fn dump_mutable_wide_string(d: &mut dyn Inspector, value: &Value) -> DumpResult<()> {
    dump_text(d, value, "wchar_t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dumpers::testing::dump;
    use crate::inspector::mock::MockMemory;
    use crate::inspector::{DisplayFormat, DumpOptions};

    fn wide(text: &str) -> Vec<u8> {
        text.chars().flat_map(|c| (c as u32).to_le_bytes()).collect()
    }

    #[test]
    fn test_byte_array_length() {
        let memory = MockMemory::new()
            .with_words(0x100, &[0x1000, 0x1400, 0x2000])
            .with_zeroed(0x1000, 0x1000);
        let view = dump(&memory, "nanoem::ByteArray", 0x100, &DumpOptions::default());

        assert_eq!(view.value.as_deref(), Some("1024 bytes"));
        assert_eq!(view.num_child, 0);
        assert!(view.children.is_empty());
        // The contents are never read.
        assert_eq!(memory.read_count(), 1);
    }

    #[test]
    fn test_null_buffers_are_empty() {
        for type_name in ["nanoem::ByteArray", "nanoem::MutableString", "nanoem::MutableWideString"] {
            for words in [[0, 0, 0x40], [0x1000, 0, 0x40], [0, 0x1000, 0]] {
                let memory = MockMemory::new().with_words(0x100, &words);
                let view = dump(&memory, type_name, 0x100, &DumpOptions::default());
                assert_eq!(view.value.as_deref(), Some("(empty)"), "{}", type_name);
                assert_eq!(view.num_child, 0);
                assert!(view.error.is_none());
            }
        }
    }

    #[test]
    fn test_corruption_stops_reads() {
        for type_name in ["nanoem::ByteArray", "nanoem::MutableString", "nanoem::MutableWideString"] {
            let memory = MockMemory::new()
                .with_words(0x100, &[0x1000, 0x1100, 0x1080])
                .with_zeroed(0x1000, 0x100);
            let view = dump(&memory, type_name, 0x100, &DumpOptions::default());

            assert_eq!(view.value.as_deref(), Some("<corrupted>"));
            assert_eq!(memory.read_log(), [(0x100, 24)]);
            assert!(memory.probe_log().is_empty());
        }
    }

    #[test]
    fn test_mutable_string() {
        let memory = MockMemory::new()
            .with_words(0x100, &[0x1000, 0x1005, 0x1008])
            .with(0x1000, b"model\0\0\0");
        let view = dump(&memory, "nanoem::MutableString", 0x100, &DumpOptions::default());
        assert_eq!(view.value.as_deref(), Some("\"model\""));

        let mut options = DumpOptions::default();
        options
            .formats
            .insert("nanoem::MutableString".to_string(), DisplayFormat::SeparateUtf8String);
        let view = dump(&memory, "nanoem::MutableString", 0x100, &options);
        assert_eq!(view.value.as_deref(), Some("\"model\""));
        assert!(view.separate);
    }

    #[test]
    fn test_mutable_wide_string() {
        let text = wide("初音ミク");
        let memory = MockMemory::new()
            .with_words(0x100, &[0x1000, 0x1000 + text.len() as u64, 0x1020])
            .with(0x1000, &text)
            .with_zeroed(0x1000 + text.len() as u64, 0x20 - text.len());
        let view = dump(&memory, "nanoem::MutableWideString", 0x100, &DumpOptions::default());
        assert_eq!(view.value.as_deref(), Some("\"初音ミク\""));
        assert!(!view.separate);

        let mut options = DumpOptions {
            display_string_limit: 2,
            ..Default::default()
        };
        let view = dump(&memory, "nanoem::MutableWideString", 0x100, &options);
        assert_eq!(view.value.as_deref(), Some("\"初音...\""));

        options.formats.insert("v".to_string(), DisplayFormat::Separate);
        let view = dump(&memory, "nanoem::MutableWideString", 0x100, &options);
        assert_eq!(view.value.as_deref(), Some("\"初音ミク\""));
        assert!(view.separate);
    }
}
