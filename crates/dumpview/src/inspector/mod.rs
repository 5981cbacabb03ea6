//! The host side of the dumpers: the capability surface a dumper talks to.
//!
//! A dumper never sees raw memory or the output tree directly. It reads
//! fields through [`Inspector::split`], validates what it read with
//! [`Inspector::check`] and [`Inspector::check_pointer`], and reports through
//! the `put_*` sinks. [`Dumper`] is the implementation that turns those calls
//! into a [`DecodedView`] tree.

pub mod dumper;
pub mod format;
pub mod scalar;
pub mod view;

#[cfg(test)]
pub(crate) mod mock;

pub use dumper::{DumpOptions, Dumper, TypeResolver};
pub use format::DisplayFormat;
pub use view::{DecodedView, PlotData};

use memlayout::{FieldValue, LayoutError, LayoutPattern, TypeName};
use std::ops::Range;
use thiserror::Error;

/// Errors raised while decoding one value.
///
/// None of these escape a dump: the affected view is degraded instead.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("Corrupted value: {0}")]
    Corrupted(String),

    #[error("Implausible pointer {0:#x}")]
    InvalidPointer(u64),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("No layout known for type '{0}'")]
    UnknownType(String),

    #[error("Bad template argument: {0}")]
    BadTemplateArgument(String),
}

pub type DumpResult<T> = Result<T, DumpError>;

/// A typed handle to a value in the inspected address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    pub addr: u64,
    pub type_name: TypeName,
}

impl Value {
    pub fn new(addr: u64, type_name: TypeName) -> Self {
        Value { addr, type_name }
    }

    /// Build a handle from an unparsed type name.
    pub fn parse(addr: u64, type_name: &str) -> DumpResult<Self> {
        Ok(Value::new(addr, TypeName::parse(type_name)?))
    }

    /// Template argument `index` of this value's type.
    pub fn type_arg(&self, index: usize) -> DumpResult<&TypeName> {
        self.type_name.arg(index).ok_or_else(|| {
            DumpError::BadTemplateArgument(format!(
                "{} has no template argument {}",
                self.type_name, index
            ))
        })
    }
}

/// What a dumper may ask of its host.
pub trait Inspector {
    /// Read the fields of `pattern` at `addr`; returns the values and the
    /// address just past the last field.
    fn split(&self, pattern: &LayoutPattern, addr: u64) -> DumpResult<(Vec<FieldValue>, u64)>;

    /// Walk a singly-linked chain of `steps` records starting at `start`.
    fn walk_chain(
        &self,
        pattern: &LayoutPattern,
        start: u64,
        next_index: usize,
        steps: usize,
    ) -> DumpResult<Vec<Vec<FieldValue>>>;

    fn read_pointer(&self, addr: u64) -> DumpResult<u64>;

    fn pointer_size(&self) -> usize;

    /// A member of `value`, if the layout profile describes its type.
    fn field(&self, value: &Value, name: &str) -> Option<Value>;

    /// Fail unless `addr` is a plausible address in the inspected memory.
    fn check_pointer(&self, addr: u64) -> DumpResult<()>;

    /// Fail with a corruption error unless `cond` holds.
    fn check(&self, cond: bool, what: &str) -> DumpResult<()>;

    fn type_size(&self, type_name: &TypeName) -> DumpResult<usize>;

    /// One-line display of another value, without adding it to the tree.
    fn display(&mut self, value: &Value) -> String;

    fn put_value(&mut self, value: String);

    fn put_num_child(&mut self, count: usize);

    /// Report a container size; also sets the child count.
    fn put_item_count(&mut self, count: usize);

    /// Whether the current value's children are wanted.
    fn is_expanded(&self) -> bool;

    /// Display format negotiated for the current value.
    fn current_item_format(&self) -> DisplayFormat;

    /// Indices of the children to emit, capped by the array limit.
    fn child_range(&self) -> Range<usize>;

    fn begin_children(&mut self, count: Option<usize>);

    fn end_children(&mut self);

    /// Decode `value` as a named child of the current value.
    fn put_sub_item(&mut self, name: &str, value: &Value);

    /// Emit entry `index` of a map.
    fn put_pair_item(&mut self, index: usize, key: &Value, value: &Value);

    /// Hand over `count` contiguous elements starting at `addr`.
    fn put_plot_data(&mut self, addr: u64, count: usize, elem_type: &TypeName) -> DumpResult<()>;

    /// Display `size` bytes of character data at `addr` in `format`.
    fn put_char_array(
        &mut self,
        addr: u64,
        size: usize,
        char_type: &TypeName,
        format: DisplayFormat,
    ) -> DumpResult<()>;
}

/// Run `f` inside a children scope, closing the scope even when `f` fails.
pub fn with_children<F>(d: &mut dyn Inspector, count: Option<usize>, f: F) -> DumpResult<()>
where
    F: FnOnce(&mut dyn Inspector) -> DumpResult<()>,
{
    d.begin_children(count);
    let result = f(d);
    d.end_children();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_args() {
        let value = Value::parse(0x10, "tinystl::pair<int, float>").unwrap();
        assert_eq!(value.type_arg(1).unwrap().as_str(), "float");
        assert!(matches!(
            value.type_arg(2),
            Err(DumpError::BadTemplateArgument(_))
        ));
    }

    #[test]
    fn test_layout_errors_convert() {
        let err: DumpError = LayoutError::UnknownSize("Opaque".to_string()).into();
        assert_eq!(err.to_string(), "Size of type 'Opaque' is unknown");
    }
}
