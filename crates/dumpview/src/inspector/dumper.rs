//! The concrete inspector: runs dumpers against a memory image and collects
//! their output into a [`DecodedView`] tree.
//!
//! Each value is decoded in its own frame. Entering a child swaps a fresh
//! frame in, runs the child's dumper, and swaps the parent back, so a dumper
//! only ever sees the value it was invoked for. Any error a dumper returns is
//! caught at the frame boundary and turned into a degraded display for that
//! one value.

use crate::dumpers::Registry;
use crate::inspector::format::DisplayFormat;
use crate::inspector::scalar::{as_f64, decode_chars, format_base};
use crate::inspector::view::{DecodedView, PlotData};
use crate::inspector::{with_children, DumpError, DumpResult, Inspector, Value};
use memlayout::{
    offset_addr, FieldReader, FieldValue, LayoutError, LayoutPattern, LayoutProfile,
    MemoryAccess, PatternLayout, TypeMetrics, TypeName,
};
use std::collections::{HashMap, HashSet};
use std::mem;
use std::ops::Range;
use tracing::{debug, warn};

/// Frames nested deeper than this are not decoded.
const MAX_DEPTH: usize = 64;

/// Upper bound on elements handed over as plot data.
const MAX_PLOT_COUNT: usize = 1 << 16;

/// Per-request knobs.
#[derive(Debug, Clone)]
pub struct DumpOptions {
    /// Values shallower than this are expanded.
    pub expand_depth: usize,
    /// Inames expanded regardless of depth.
    pub expanded: HashSet<String>,
    /// Requested formats, keyed by iname or by dumper name.
    pub formats: HashMap<String, DisplayFormat>,
    /// Most children emitted for one container.
    pub max_array_count: usize,
    /// Most characters shown inline.
    pub display_string_limit: usize,
    /// Most characters shown with a separate-view format.
    pub separate_string_limit: usize,
}

impl Default for DumpOptions {
    fn default() -> Self {
        DumpOptions {
            expand_depth: 1,
            expanded: HashSet::new(),
            formats: HashMap::new(),
            max_array_count: 100,
            display_string_limit: 100,
            separate_string_limit: 10_000,
        }
    }
}

impl DumpOptions {
    /// The format requested for a value, by iname first, then by dumper name.
    pub fn format_for(&self, iname: &str, dumper: &str) -> DisplayFormat {
        self.formats
            .get(iname)
            .or_else(|| self.formats.get(dumper))
            .copied()
            .unwrap_or_default()
    }
}

/// Type metrics from the layout profile, falling back to the dumpers' own
/// layouts for container types the profile does not describe.
pub struct TypeResolver<'a> {
    profile: &'a LayoutProfile,
    registry: &'a Registry,
}

impl<'a> TypeResolver<'a> {
    pub fn new(profile: &'a LayoutProfile, registry: &'a Registry) -> Self {
        TypeResolver { profile, registry }
    }

    pub fn profile(&self) -> &'a LayoutProfile {
        self.profile
    }

    fn shape(&self, type_name: &TypeName) -> Option<PatternLayout> {
        let entry = self.registry.lookup(type_name.template_name())?;
        let pattern = (entry.layout)(type_name)?;
        pattern.layout(self).ok()
    }
}

impl TypeMetrics for TypeResolver<'_> {
    fn pointer_size(&self) -> usize {
        self.profile.pointer_size
    }

    fn size_of(&self, type_name: &TypeName) -> Option<usize> {
        if type_name.is_pointer() {
            return Some(self.profile.pointer_size);
        }
        if let Some((elem, count)) = type_name.array_parts() {
            return self.size_of(&elem).map(|s| s * count as usize);
        }
        self.profile
            .type_size(type_name.as_str())
            .or_else(|| self.shape(type_name).map(|l| l.padded_size()))
    }

    fn align_of(&self, type_name: &TypeName) -> Option<usize> {
        if let Some((elem, _)) = type_name.array_parts() {
            return self.align_of(&elem);
        }
        self.profile
            .align_of(type_name)
            .or_else(|| self.shape(type_name).map(|l| l.align))
    }
}

/// State of the value currently being decoded.
struct Frame {
    view: DecodedView,
    depth: usize,
    /// Decoded only for its display text; never expanded.
    detached: bool,
    format: DisplayFormat,
}

impl Frame {
    fn new(view: DecodedView, depth: usize, detached: bool) -> Self {
        Frame {
            view,
            depth,
            detached,
            format: DisplayFormat::Automatic,
        }
    }
}

/// Decodes values into views.
///
/// # Example
///
/// ```rust,ignore
/// let registry = Registry::builtin();
/// let options = DumpOptions::default();
/// let mut dumper = Dumper::new(&image, &profile, &registry, &options);
/// let view = dumper.dump_value("bones", &Value::parse(0x7ffd_1000, "tinystl::vector<int>")?);
/// ```
pub struct Dumper<'a> {
    memory: &'a dyn MemoryAccess,
    types: TypeResolver<'a>,
    registry: &'a Registry,
    options: &'a DumpOptions,
    frame: Frame,
}

impl<'a> Dumper<'a> {
    pub fn new(
        memory: &'a dyn MemoryAccess,
        profile: &'a LayoutProfile,
        registry: &'a Registry,
        options: &'a DumpOptions,
    ) -> Self {
        Dumper {
            memory,
            types: TypeResolver::new(profile, registry),
            registry,
            options,
            frame: Frame::new(DecodedView::default(), 0, true),
        }
    }

    /// Decode `value` as a root named `name`. Never fails; problems show up
    /// as degraded values in the returned tree.
    pub fn dump_value(&mut self, name: &str, value: &Value) -> DecodedView {
        let view = DecodedView::new(name.to_string(), name, value.type_name.as_str(), value.addr);
        self.run_frame(Frame::new(view, 0, false), value)
    }

    fn reader(&self) -> FieldReader<'_> {
        FieldReader::new(self.memory, &self.types)
    }

    fn run_frame(&mut self, frame: Frame, value: &Value) -> DecodedView {
        let parent = mem::replace(&mut self.frame, frame);
        if let Err(err) = self.dispatch(value) {
            self.degrade(err);
        }
        mem::replace(&mut self.frame, parent).view
    }

    fn child_view(&mut self, name: &str, key: &str, value: &Value) -> DecodedView {
        let iname = format!("{}.{}", self.frame.view.iname, key);
        let view = DecodedView::new(iname, name, value.type_name.as_str(), value.addr);
        let frame = Frame::new(view, self.frame.depth + 1, self.frame.detached);
        self.run_frame(frame, value)
    }

    fn detached_view(&mut self, value: &Value) -> DecodedView {
        let view = DecodedView::new(
            self.frame.view.iname.clone(),
            "",
            value.type_name.as_str(),
            value.addr,
        );
        self.run_frame(Frame::new(view, self.frame.depth + 1, true), value)
    }

    fn dispatch(&mut self, value: &Value) -> DumpResult<()> {
        if self.frame.depth > MAX_DEPTH {
            self.put_value("<too deep>".to_string());
            return Ok(());
        }

        let registry = self.registry;
        let Some(entry) = registry.lookup(value.type_name.template_name()) else {
            return self.dump_generic(value);
        };

        let requested = self.options.format_for(&self.frame.view.iname, entry.name);
        self.frame.format = if requested == DisplayFormat::Automatic || entry.formats.contains(&requested) {
            requested
        } else {
            debug!(
                "{} does not offer format {}, using automatic",
                entry.name, requested
            );
            DisplayFormat::Automatic
        };

        debug!(
            "dumping {} at {:#x} with {}",
            value.type_name, value.addr, entry.name
        );
        (entry.dump)(self, value)
    }

    fn degrade(&mut self, err: DumpError) {
        let marker = match err {
            DumpError::Corrupted(_) => "<corrupted>",
            _ => "<not accessible>",
        };
        if !self.frame.detached {
            warn!(
                "{} ({}) at {}: {}",
                self.frame.view.iname, self.frame.view.type_name, self.frame.view.address, err
            );
        }

        let view = &mut self.frame.view;
        view.value = Some(marker.to_string());
        view.num_child = 0;
        view.item_count = None;
        view.children.clear();
        view.plot = None;
        view.separate = false;
        view.error = Some(err.to_string());
    }

    /// Values without a dumper: primitives, pointers, arrays and profile structs.
    fn dump_generic(&mut self, value: &Value) -> DumpResult<()> {
        let type_name = &value.type_name;

        if type_name.is_pointer() {
            let target = self.read_pointer(value.addr)?;
            self.put_value(format!("{:#x}", target));
            self.put_num_child(0);
            return Ok(());
        }

        if let Some((elem, count)) = type_name.array_parts() {
            let count = count as usize;
            self.put_item_count(count);
            if self.is_expanded() {
                let size = self.type_size(&elem)?;
                with_children(self, Some(count), |d| {
                    for i in d.child_range() {
                        let item_addr = offset_addr(value.addr, (i * size) as u64)?;
                        let item = Value::new(item_addr, elem.clone());
                        d.put_sub_item(&format!("[{}]", i), &item);
                    }
                    Ok(())
                })?;
            }
            return Ok(());
        }

        let profile = self.types.profile();
        if let Some(base) = profile.get_base_type(type_name.as_str()) {
            let bytes = self.reader().read_bytes(value.addr, base.size)?;
            self.put_value(format_base(&bytes, base));
            self.put_num_child(0);
            return Ok(());
        }

        if let Some(fields) = profile.ordered_fields(type_name.as_str()) {
            self.put_value("{...}".to_string());
            self.put_num_child(fields.len());
            if self.is_expanded() {
                with_children(self, Some(fields.len()), |d| {
                    for (name, field) in &fields {
                        let field_type = profile.field_type_name(&field.type_info).ok_or_else(|| {
                            DumpError::UnknownType(format!("{}::{}", type_name, name))
                        })?;
                        let field_addr = offset_addr(value.addr, field.offset as u64)?;
                        d.put_sub_item(name, &Value::new(field_addr, field_type));
                    }
                    Ok(())
                })?;
            }
            return Ok(());
        }

        Err(DumpError::UnknownType(type_name.to_string()))
    }
}

impl Inspector for Dumper<'_> {
    fn split(&self, pattern: &LayoutPattern, addr: u64) -> DumpResult<(Vec<FieldValue>, u64)> {
        Ok(self.reader().split(pattern, addr)?)
    }

    fn walk_chain(
        &self,
        pattern: &LayoutPattern,
        start: u64,
        next_index: usize,
        steps: usize,
    ) -> DumpResult<Vec<Vec<FieldValue>>> {
        let reader = self.reader();
        let mut walker = reader.walk_chain(pattern, start, next_index, steps)?;
        Ok(walker.collect_all()?)
    }

    fn read_pointer(&self, addr: u64) -> DumpResult<u64> {
        Ok(self.reader().read_pointer(addr)?)
    }

    fn pointer_size(&self) -> usize {
        self.types.pointer_size()
    }

    fn field(&self, value: &Value, name: &str) -> Option<Value> {
        let profile = self.types.profile();
        let field = profile.get_type(value.type_name.as_str())?.fields.get(name)?;
        let type_name = profile.field_type_name(&field.type_info)?;
        Some(Value::new(value.addr.checked_add(field.offset as u64)?, type_name))
    }

    fn check_pointer(&self, addr: u64) -> DumpResult<()> {
        // One past the end of a mapped range is a valid bound.
        let plausible = addr != 0
            && (self.memory.is_valid(addr, 1) || self.memory.is_valid(addr - 1, 1));
        if plausible {
            Ok(())
        } else {
            Err(DumpError::InvalidPointer(addr))
        }
    }

    fn check(&self, cond: bool, what: &str) -> DumpResult<()> {
        if cond {
            Ok(())
        } else {
            Err(DumpError::Corrupted(what.to_string()))
        }
    }

    fn type_size(&self, type_name: &TypeName) -> DumpResult<usize> {
        self.types
            .size_of(type_name)
            .filter(|size| *size > 0)
            .ok_or_else(|| LayoutError::UnknownSize(type_name.to_string()).into())
    }

    fn display(&mut self, value: &Value) -> String {
        self.detached_view(value).value.unwrap_or_default()
    }

    fn put_value(&mut self, value: String) {
        self.frame.view.value = Some(value);
    }

    fn put_num_child(&mut self, count: usize) {
        self.frame.view.num_child = count;
    }

    fn put_item_count(&mut self, count: usize) {
        self.frame.view.item_count = Some(count);
        self.frame.view.num_child = count;
        self.put_value(format!("<{} items>", count));
    }

    fn is_expanded(&self) -> bool {
        !self.frame.detached
            && (self.frame.depth < self.options.expand_depth
                || self.options.expanded.contains(&self.frame.view.iname))
    }

    fn current_item_format(&self) -> DisplayFormat {
        self.frame.format
    }

    fn child_range(&self) -> Range<usize> {
        0..self.frame.view.num_child.min(self.options.max_array_count)
    }

    fn begin_children(&mut self, count: Option<usize>) {
        if let Some(count) = count {
            self.frame.view.num_child = count;
        }
    }

    fn end_children(&mut self) {
        let view = &mut self.frame.view;
        view.num_child = view.num_child.max(view.children.len());
    }

    fn put_sub_item(&mut self, name: &str, value: &Value) {
        let key = name.trim_start_matches('[').trim_end_matches(']');
        let child = self.child_view(name, key, value);
        self.frame.view.children.push(child);
    }

    fn put_pair_item(&mut self, index: usize, key: &Value, value: &Value) {
        let key_view = self.detached_view(key);
        let simple_key = key_view.num_child == 0 && key_view.error.is_none();

        let child = if simple_key || self.frame.format == DisplayFormat::CompactMap {
            let name = key_view.value.unwrap_or_else(|| format!("[{}]", index));
            self.child_view(&name, &index.to_string(), value)
        } else {
            let iname = format!("{}.{}", self.frame.view.iname, index);
            let mut node = DecodedView::new(iname, &format!("[{}]", index), "", key.addr);
            node.value = key_view.value;
            node.num_child = 2;
            let frame = Frame::new(node, self.frame.depth + 1, self.frame.detached);
            let parent = mem::replace(&mut self.frame, frame);
            if self.is_expanded() {
                self.put_sub_item("key", key);
                self.put_sub_item("value", value);
            }
            mem::replace(&mut self.frame, parent).view
        };
        self.frame.view.children.push(child);
    }

    fn put_plot_data(&mut self, addr: u64, count: usize, elem_type: &TypeName) -> DumpResult<()> {
        if count == 0 {
            return Ok(());
        }
        let size = self.type_size(elem_type)?;

        let profile = self.types.profile();
        if self.frame.format == DisplayFormat::ArrayPlot {
            if let Some(base) = profile.get_base_type(elem_type.as_str()) {
                let shown = count.min(MAX_PLOT_COUNT);
                let bytes = self.reader().read_bytes(addr, shown * size)?;
                let values = bytes.chunks_exact(size).filter_map(|c| as_f64(c, base)).collect();
                self.frame.view.plot = Some(PlotData {
                    address: format!("{:#x}", addr),
                    count: shown,
                    elem_type: elem_type.to_string(),
                    values,
                });
                return Ok(());
            }
            debug!("{} cannot be plotted, listing items", elem_type);
        }

        if self.is_expanded() {
            with_children(self, None, |d| {
                for i in d.child_range() {
                    let item = Value::new(offset_addr(addr, (i * size) as u64)?, elem_type.clone());
                    d.put_sub_item(&format!("[{}]", i), &item);
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    fn put_char_array(
        &mut self,
        addr: u64,
        size: usize,
        char_type: &TypeName,
        format: DisplayFormat,
    ) -> DumpResult<()> {
        let width = self.type_size(char_type)?;
        let limit = if format.is_separate() {
            self.options.separate_string_limit
        } else {
            self.options.display_string_limit
        };

        let shown = size.min(limit.saturating_mul(width)) / width * width;
        let bytes = if shown > 0 {
            self.reader().read_bytes(addr, shown)?
        } else {
            Vec::new()
        };
        let text = decode_chars(&bytes, width, format.is_latin1());

        let ellipsis = if shown < size { "..." } else { "" };
        self.put_value(format!("\"{}{}\"", text, ellipsis));
        self.frame.view.separate = format.is_separate();
        self.put_num_child(0);
        Ok(())
    }
}
