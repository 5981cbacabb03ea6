//! Layout patterns: ordered field descriptors for a fixed binary layout.
//!
//! A pattern is written as a compact string, one code per field:
//!
//! | Code | Field |
//! |---|---|
//! | `p` | pointer (profile pointer width) |
//! | `b` / `B` | signed / unsigned 8-bit integer |
//! | `h` / `H` | signed / unsigned 16-bit integer |
//! | `i` / `I` | signed / unsigned 32-bit integer |
//! | `q` / `Q` | signed / unsigned 64-bit integer |
//! | `f` / `d` | 32-bit / 64-bit float |
//! | `@` | padding up to the alignment of the next field |
//! | `{T}` | a sub-value of type `T`, not read, only located |
//!
//! So a tinystl buffer is `"ppp"` and a hash node holding an `int` key and a
//! `float` value is `"@{int}@{float}pp"`.

use crate::error::{LayoutError, LayoutResult};
use crate::typename::TypeName;
use crate::types::TypeMetrics;
use std::fmt;
use std::str::FromStr;

/// The kind of one field slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Pointer,
    Int { size: usize, signed: bool },
    Float { size: usize },
    Padding,
    Typed(TypeName),
}

/// Offset and size of one slot once a pattern is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    pub offset: usize,
    pub size: usize,
}

/// A pattern laid out against concrete type metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternLayout {
    pub slots: Vec<SlotLayout>,
    /// Bytes covered by the slots, without trailing padding.
    pub size: usize,
    /// Largest slot alignment.
    pub align: usize,
}

impl PatternLayout {
    /// Size rounded up to the alignment, i.e. the size of a struct with this layout.
    pub fn padded_size(&self) -> usize {
        align_up(self.size, self.align)
    }
}

/// An ordered list of field slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPattern {
    slots: Vec<FieldKind>,
}

impl LayoutPattern {
    pub fn new(slots: Vec<FieldKind>) -> Self {
        LayoutPattern { slots }
    }

    /// Parse a pattern string.
    pub fn parse(pattern: &str) -> LayoutResult<Self> {
        let bad = |msg: String| LayoutError::BadPattern {
            pattern: pattern.to_string(),
            msg,
        };

        let mut slots = Vec::new();
        let mut chars = pattern.char_indices();
        while let Some((pos, c)) = chars.next() {
            let kind = match c {
                'p' => FieldKind::Pointer,
                'b' => FieldKind::Int { size: 1, signed: true },
                'B' => FieldKind::Int { size: 1, signed: false },
                'h' => FieldKind::Int { size: 2, signed: true },
                'H' => FieldKind::Int { size: 2, signed: false },
                'i' => FieldKind::Int { size: 4, signed: true },
                'I' => FieldKind::Int { size: 4, signed: false },
                'q' => FieldKind::Int { size: 8, signed: true },
                'Q' => FieldKind::Int { size: 8, signed: false },
                'f' => FieldKind::Float { size: 4 },
                'd' => FieldKind::Float { size: 8 },
                '@' => FieldKind::Padding,
                '{' => {
                    let rest = &pattern[pos + 1..];
                    let end = rest
                        .find('}')
                        .ok_or_else(|| bad(format!("unterminated '{{' at {}", pos)))?;
                    let type_name = TypeName::parse(&rest[..end])
                        .map_err(|_| bad(format!("bad type name at {}", pos)))?;
                    // Skip past the closing brace.
                    for _ in 0..rest[..=end].chars().count() {
                        chars.next();
                    }
                    FieldKind::Typed(type_name)
                }
                c if c.is_whitespace() => continue,
                other => return Err(bad(format!("unknown code '{}' at {}", other, pos))),
            };
            slots.push(kind);
        }

        Ok(LayoutPattern { slots })
    }

    pub fn slots(&self) -> &[FieldKind] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether any slot needs its bytes read (i.e. is not padding or a typed sub-value).
    pub fn has_scalars(&self) -> bool {
        self.slots
            .iter()
            .any(|k| !matches!(k, FieldKind::Padding | FieldKind::Typed(_)))
    }

    /// Compute slot offsets and sizes.
    pub fn layout(&self, metrics: &dyn TypeMetrics) -> LayoutResult<PatternLayout> {
        let mut slots = Vec::with_capacity(self.slots.len());
        let mut offset = 0usize;
        let mut max_align = 1usize;

        for (i, kind) in self.slots.iter().enumerate() {
            if let FieldKind::Padding = kind {
                let next_align = match self.slots[i + 1..]
                    .iter()
                    .find(|k| !matches!(k, FieldKind::Padding))
                {
                    Some(next) => slot_metrics(next, metrics)?.1,
                    None => 1,
                };
                let padded = align_up(offset, next_align);
                slots.push(SlotLayout {
                    offset,
                    size: padded - offset,
                });
                offset = padded;
                continue;
            }

            let (size, align) = slot_metrics(kind, metrics)?;
            max_align = max_align.max(align);
            slots.push(SlotLayout { offset, size });
            offset += size;
        }

        Ok(PatternLayout {
            slots,
            size: offset,
            align: max_align,
        })
    }
}

impl FromStr for LayoutPattern {
    type Err = LayoutError;

    fn from_str(s: &str) -> LayoutResult<Self> {
        LayoutPattern::parse(s)
    }
}

impl fmt::Display for LayoutPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for kind in &self.slots {
            match kind {
                FieldKind::Pointer => f.write_str("p")?,
                FieldKind::Int { size, signed } => {
                    let code = match (*size, *signed) {
                        (1, true) => "b",
                        (1, false) => "B",
                        (2, true) => "h",
                        (2, false) => "H",
                        (4, true) => "i",
                        (4, false) => "I",
                        (_, true) => "q",
                        (_, false) => "Q",
                    };
                    f.write_str(code)?
                }
                FieldKind::Float { size: 4 } => f.write_str("f")?,
                FieldKind::Float { .. } => f.write_str("d")?,
                FieldKind::Padding => f.write_str("@")?,
                FieldKind::Typed(t) => write!(f, "{{{}}}", t)?,
            }
        }
        Ok(())
    }
}

fn slot_metrics(kind: &FieldKind, metrics: &dyn TypeMetrics) -> LayoutResult<(usize, usize)> {
    match kind {
        FieldKind::Pointer => Ok((metrics.pointer_size(), metrics.pointer_size())),
        FieldKind::Int { size, .. } | FieldKind::Float { size } => Ok((*size, *size)),
        FieldKind::Padding => Ok((0, 1)),
        FieldKind::Typed(t) => {
            let size = metrics
                .size_of(t)
                .ok_or_else(|| LayoutError::UnknownSize(t.to_string()))?;
            let align = metrics.align_of(t).unwrap_or(1).max(1);
            Ok((size, align))
        }
    }
}

fn align_up(offset: usize, align: usize) -> usize {
    if align <= 1 {
        offset
    } else {
        offset.div_ceil(align) * align
    }
}
