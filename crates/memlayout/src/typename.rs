//! C++ type names as reported by a debugger, split into template name and arguments.
//!
//! Names are normalized so that `tinystl::vector< int >`, `tinystl::vector<int>`
//! and `tinystl::vector<int >` all compare equal, and pointers are always
//! written as `T *`.

use crate::error::{LayoutError, LayoutResult};
use std::fmt;

/// A parsed type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    full: String,
    template: String,
    args: Vec<TypeName>,
}

impl TypeName {
    /// Parse and normalize a type name.
    pub fn parse(name: &str) -> LayoutResult<Self> {
        let full = normalize(name);
        if full.is_empty() {
            return Err(LayoutError::BadTypeName(name.to_string()));
        }

        let Some(open) = full.find('<') else {
            if full.contains('>') {
                return Err(LayoutError::BadTypeName(name.to_string()));
            }
            return Ok(TypeName {
                template: full.clone(),
                full,
                args: Vec::new(),
            });
        };

        let mut depth = 0usize;
        let mut close = None;
        let mut arg_start = open + 1;
        let mut raw_args = Vec::new();
        for (i, c) in full.char_indices().skip_while(|(i, _)| *i < open) {
            match c {
                '<' => depth += 1,
                '>' => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| LayoutError::BadTypeName(name.to_string()))?;
                    if depth == 0 && close.is_none() {
                        raw_args.push(&full[arg_start..i]);
                        close = Some(i);
                    }
                }
                ',' if depth == 1 && close.is_none() => {
                    raw_args.push(&full[arg_start..i]);
                    arg_start = i + 1;
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(LayoutError::BadTypeName(name.to_string()));
        }

        // Nested names like `Foo<int>::Bar` and pointers like `Foo<int> *` are
        // not template instantiations themselves.
        let close = close.ok_or_else(|| LayoutError::BadTypeName(name.to_string()))?;
        if close + 1 != full.len() {
            return Ok(TypeName {
                template: full.clone(),
                full,
                args: Vec::new(),
            });
        }

        let args = raw_args
            .into_iter()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(TypeName::parse)
            .collect::<LayoutResult<Vec<_>>>()?;

        Ok(TypeName {
            template: full[..open].to_string(),
            full,
            args,
        })
    }

    /// The full normalized name.
    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// The name without template arguments (`tinystl::vector` for `tinystl::vector<int>`).
    pub fn template_name(&self) -> &str {
        &self.template
    }

    /// Template arguments, in declaration order.
    pub fn args(&self) -> &[TypeName] {
        &self.args
    }

    /// The template argument at `index`.
    pub fn arg(&self, index: usize) -> Option<&TypeName> {
        self.args.get(index)
    }

    /// A non-type integer template argument, e.g. the `3` of `glm::vec<3, float, ...>`.
    ///
    /// Accepts integer literal suffixes (`3u`, `4ul`) and C-style casts (`(glm::length_t)3`).
    pub fn int_arg(&self, index: usize) -> Option<u64> {
        let raw = self.args.get(index)?.as_str();
        let raw = match raw.rfind(')') {
            Some(pos) if raw.starts_with('(') => &raw[pos + 1..],
            _ => raw,
        };
        raw.trim()
            .trim_end_matches(['u', 'U', 'l', 'L'])
            .parse()
            .ok()
    }

    /// Whether this is a pointer type (`T *`).
    pub fn is_pointer(&self) -> bool {
        self.args.is_empty() && self.full.ends_with('*')
    }

    /// Element type and count of a fixed-size array type (`T[N]`).
    pub fn array_parts(&self) -> Option<(TypeName, u64)> {
        if !self.args.is_empty() || !self.full.ends_with(']') {
            return None;
        }
        let open = self.full.rfind('[')?;
        let count = self.full[open + 1..self.full.len() - 1].trim().parse().ok()?;
        let elem = TypeName::parse(&self.full[..open]).ok()?;
        Some((elem, count))
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

/// Collapse whitespace and put separators in canonical form.
fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;
    for c in name.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        match c {
            '<' | '>' | '[' | ']' => {
                if out.ends_with(' ') {
                    out.pop();
                }
                out.push(c);
            }
            ',' => {
                if out.ends_with(' ') {
                    out.pop();
                }
                out.push_str(", ");
            }
            '*' | '&' => {
                if !out.is_empty() && !out.ends_with(['*', '&', ' ']) {
                    out.push(' ');
                }
                out.push(c);
            }
            _ => {
                if pending_space && !out.is_empty() && !out.ends_with(['<', '[', ' ']) {
                    out.push(' ');
                } else if out.ends_with(['*', '&']) {
                    out.push(' ');
                }
                out.push(c);
            }
        }
        pending_space = false;
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name() {
        let t = TypeName::parse("  unsigned   int ").unwrap();
        assert_eq!(t.as_str(), "unsigned int");
        assert_eq!(t.template_name(), "unsigned int");
        assert!(t.args().is_empty());
    }

    #[test]
    fn test_template_args() {
        let t = TypeName::parse("tinystl::unordered_map< int , tinystl::vector<float> >").unwrap();
        assert_eq!(t.as_str(), "tinystl::unordered_map<int, tinystl::vector<float>>");
        assert_eq!(t.template_name(), "tinystl::unordered_map");
        assert_eq!(t.args().len(), 2);
        assert_eq!(t.arg(0).unwrap().as_str(), "int");
        let inner = t.arg(1).unwrap();
        assert_eq!(inner.template_name(), "tinystl::vector");
        assert_eq!(inner.arg(0).unwrap().as_str(), "float");
    }

    #[test]
    fn test_int_arg() {
        let t = TypeName::parse("glm::vec<3, float, (glm::qualifier)0>").unwrap();
        assert_eq!(t.int_arg(0), Some(3));
        assert_eq!(t.arg(1).unwrap().as_str(), "float");
        assert_eq!(t.int_arg(2), Some(0));

        let t = TypeName::parse("glm::vec<4ul, double>").unwrap();
        assert_eq!(t.int_arg(0), Some(4));
        assert_eq!(t.int_arg(1), None);
    }

    #[test]
    fn test_pointer() {
        let t = TypeName::parse("tinystl::pair<int, float>*").unwrap();
        assert_eq!(t.as_str(), "tinystl::pair<int, float> *");
        assert!(t.is_pointer());
        assert!(t.args().is_empty());

        let t = TypeName::parse("char **").unwrap();
        assert_eq!(t.as_str(), "char **");
        assert!(t.is_pointer());
    }

    #[test]
    fn test_array() {
        let t = TypeName::parse("float [4]").unwrap();
        assert_eq!(t.as_str(), "float[4]");
        let (elem, count) = t.array_parts().unwrap();
        assert_eq!(elem.as_str(), "float");
        assert_eq!(count, 4);
    }

    #[test]
    fn test_nested_name_is_not_template() {
        let t = TypeName::parse("tinystl::vector<int>::iterator").unwrap();
        assert_eq!(t.template_name(), "tinystl::vector<int>::iterator");
        assert!(t.args().is_empty());
    }

    #[test]
    fn test_unbalanced() {
        assert!(TypeName::parse("tinystl::vector<int").is_err());
        assert!(TypeName::parse("int>").is_err());
        assert!(TypeName::parse("   ").is_err());
    }
}
