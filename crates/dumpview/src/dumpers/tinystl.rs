//! tinystl containers: pair, stringT, vector, unordered_map, unordered_set.
//!
//! All growable tinystl containers sit on a `buffer` of three pointers
//! (first, last, capacity). The hash containers chain every node of every
//! bucket into one list starting at `*m_buckets.first`; node layout is the
//! key (and value) followed by `next` and `prev`.

use crate::dumpers::{member_addr, pointers, slot_value, BufferTriple, DumperEntry};
use crate::inspector::format::{ARRAY_FORMATS, MAP_FORMATS, STRING_FORMATS};
use crate::inspector::{with_children, DumpResult, Inspector, Value};
use memlayout::{FieldKind, LayoutPattern, TypeName};

pub const DUMPERS: &[DumperEntry] = &[
    DumperEntry {
        name: "tinystl::pair",
        description: "Two members shown as [ first, second ]",
        dump: dump_pair,
        formats: &[],
        layout: pair_layout,
    },
    DumperEntry {
        name: "tinystl::stringT",
        description: "Narrow string held in a first/last/capacity buffer",
        dump: dump_string,
        formats: STRING_FORMATS,
        layout: buffer_layout,
    },
    DumperEntry {
        name: "tinystl::vector",
        description: "Dynamic array; item count, then items or plot data",
        dump: dump_vector,
        formats: ARRAY_FORMATS,
        layout: buffer_layout,
    },
    DumperEntry {
        name: "tinystl::unordered_map",
        description: "Hash map; entries in node chain order",
        dump: dump_unordered_map,
        formats: MAP_FORMATS,
        layout: hash_layout,
    },
    DumperEntry {
        name: "tinystl::unordered_set",
        description: "Hash set; keys in node chain order",
        dump: dump_unordered_set,
        formats: &[],
        layout: hash_layout,
    },
];

/// Slots of a map node: key, value, next, prev, each aligned.
const MAP_KEY: usize = 1;
const MAP_VALUE: usize = 3;
const MAP_NEXT: usize = 5;

/// Slots of a set node: key, next, prev.
const SET_KEY: usize = 1;
const SET_NEXT: usize = 3;

fn pair_pattern(first: &TypeName, second: &TypeName) -> LayoutPattern {
    LayoutPattern::new(vec![
        FieldKind::Typed(first.clone()),
        FieldKind::Padding,
        FieldKind::Typed(second.clone()),
    ])
}

fn pair_layout(type_name: &TypeName) -> Option<LayoutPattern> {
    Some(pair_pattern(type_name.arg(0)?, type_name.arg(1)?))
}

fn buffer_layout(_: &TypeName) -> Option<LayoutPattern> {
    Some(pointers(3))
}

/// `m_buckets` buffer followed by the pointer-sized `m_size`.
fn hash_layout(_: &TypeName) -> Option<LayoutPattern> {
    Some(pointers(4))
}

fn map_node(key: &TypeName, value: &TypeName) -> LayoutPattern {
    LayoutPattern::new(vec![
        FieldKind::Padding,
        FieldKind::Typed(key.clone()),
        FieldKind::Padding,
        FieldKind::Typed(value.clone()),
        FieldKind::Padding,
        FieldKind::Pointer,
        FieldKind::Pointer,
    ])
}

fn set_node(key: &TypeName) -> LayoutPattern {
    LayoutPattern::new(vec![
        FieldKind::Padding,
        FieldKind::Typed(key.clone()),
        FieldKind::Padding,
        FieldKind::Pointer,
        FieldKind::Pointer,
    ])
}

pub fn dump_pair(d: &mut dyn Inspector, value: &Value) -> DumpResult<()> {
    let pattern = pair_pattern(value.type_arg(0)?, value.type_arg(1)?);
    let (fields, _) = d.split(&pattern, value.addr)?;
    let first = slot_value(&fields, 0)?;
    let second = slot_value(&fields, 2)?;

    let shown = format!("[ {}, {} ]", d.display(&first), d.display(&second));
    d.put_value(shown);
    d.put_num_child(2);
    if d.is_expanded() {
        with_children(d, Some(2), |d| {
            d.put_sub_item("first", &first);
            d.put_sub_item("second", &second);
            Ok(())
        })?;
    }
    Ok(())
}

pub fn dump_string(d: &mut dyn Inspector, value: &Value) -> DumpResult<()> {
    let buffer = BufferTriple::read(d, value.addr)?;
    if buffer.is_null() {
        d.put_value("(null)".to_string());
        d.put_num_child(0);
        return Ok(());
    }
    buffer.check(d)?;
    if buffer.byte_len() > 0 {
        buffer.check_pointers(d)?;
    }
    let format = d.current_item_format();
    d.put_char_array(buffer.first, buffer.byte_len(), &TypeName::parse("char")?, format)
}

pub fn dump_vector(d: &mut dyn Inspector, value: &Value) -> DumpResult<()> {
    let elem = value.type_arg(0)?.clone();
    let buffer = BufferTriple::read(d, member_addr(d, value, "m_buffer", 0)?)?;
    if buffer.is_null() {
        d.put_item_count(0);
        d.put_value("(empty)".to_string());
        return Ok(());
    }
    buffer.check(d)?;

    let count = buffer.byte_len() / d.type_size(&elem)?;
    if count > 0 {
        buffer.check_pointers(d)?;
    }
    d.put_item_count(count);
    d.put_plot_data(buffer.first, count, &elem)
}

/// Head of the node chain and the stored element count.
fn read_hash(d: &dyn Inspector, value: &Value) -> DumpResult<(u64, usize)> {
    let buckets_addr = member_addr(d, value, "m_buckets", 0)?;
    let size_addr = member_addr(d, value, "m_size", 3 * d.pointer_size() as u64)?;
    let size = d.read_pointer(size_addr)? as usize;
    if size == 0 {
        return Ok((0, 0));
    }

    let buckets = BufferTriple::read(d, buckets_addr)?;
    d.check(!buckets.is_null(), "elements stored without buckets")?;
    buckets.check(d)?;
    buckets.check_pointers(d)?;
    Ok((d.read_pointer(buckets.first)?, size))
}

pub fn dump_unordered_map(d: &mut dyn Inspector, value: &Value) -> DumpResult<()> {
    let key = value.type_arg(0)?.clone();
    let mapped = value.type_arg(1)?.clone();
    let (head, size) = read_hash(d, value)?;
    d.put_item_count(size);

    if d.is_expanded() && size > 0 {
        let node = map_node(&key, &mapped);
        with_children(d, Some(size), |d| {
            let records = d.walk_chain(&node, head, MAP_NEXT, d.child_range().len())?;
            for (i, record) in records.iter().enumerate() {
                let key = slot_value(record, MAP_KEY)?;
                let val = slot_value(record, MAP_VALUE)?;
                d.put_pair_item(i, &key, &val);
            }
            Ok(())
        })?;
    }
    Ok(())
}

pub fn dump_unordered_set(d: &mut dyn Inspector, value: &Value) -> DumpResult<()> {
    let key = value.type_arg(0)?.clone();
    let (head, size) = read_hash(d, value)?;
    d.put_item_count(size);

    if d.is_expanded() && size > 0 {
        let node = set_node(&key);
        with_children(d, Some(size), |d| {
            let records = d.walk_chain(&node, head, SET_NEXT, d.child_range().len())?;
            for (i, record) in records.iter().enumerate() {
                d.put_sub_item(&format!("[{}]", i), &slot_value(record, SET_KEY)?);
            }
            Ok(())
        })?;
    }
    Ok(())
}
