//! Type definitions for parsed layout profiles.

use crate::typename::TypeName;
use serde::Deserialize;
use std::collections::HashMap;

/// Top-level layout profile file structure.
#[derive(Debug, Deserialize)]
pub struct ProfileFile {
    pub metadata: Metadata,
    #[serde(default)]
    pub base_types: HashMap<String, BaseType>,
    #[serde(default)]
    pub user_types: HashMap<String, UserType>,
}

/// Profile metadata block.
#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub format: String,
    #[serde(default)]
    pub producer: Option<Producer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Producer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// A base (primitive) type definition.
#[derive(Debug, Clone, Deserialize)]
pub struct BaseType {
    pub size: usize,
    pub signed: bool,
    /// One of "int", "float", "bool", "char".
    pub kind: String,
    #[serde(default = "default_endian")]
    pub endian: String,
}

fn default_endian() -> String {
    "little".to_string()
}

impl BaseType {
    pub fn new(size: usize, signed: bool, kind: &str) -> Self {
        BaseType {
            size,
            signed,
            kind: kind.to_string(),
            endian: default_endian(),
        }
    }
}

/// A user-defined (struct) type.
#[derive(Debug, Clone, Deserialize)]
pub struct UserType {
    pub size: usize,
    /// Alignment override. Computed from the fields when absent.
    #[serde(default)]
    pub align: Option<usize>,
    #[serde(default)]
    pub fields: HashMap<String, FieldDef>,
}

/// A field within a user type.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    pub offset: usize,
    #[serde(rename = "type")]
    pub type_info: TypeInfo,
}

/// Type information for a field, recursive to handle pointers and arrays.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeInfo {
    /// One of "base", "struct", "pointer", "array".
    pub kind: String,

    /// For kind="struct" or kind="base": the type name.
    #[serde(default)]
    pub name: Option<String>,

    /// For kind="pointer" or kind="array": the pointee / element type.
    #[serde(default)]
    pub subtype: Option<Box<TypeInfo>>,

    /// For kind="array": element count.
    #[serde(default)]
    pub count: Option<usize>,

    /// Size override.
    #[serde(default)]
    pub size: Option<usize>,
}

// ============================================================================
// Resolved profile for runtime use
// ============================================================================

/// Size and alignment queries by type name.
///
/// Layout patterns resolve their `{T}` slots through this trait, so callers
/// can layer extra knowledge (e.g. container shapes) over a profile.
pub trait TypeMetrics {
    /// Pointer width in bytes (4 or 8).
    fn pointer_size(&self) -> usize;

    /// Size of a value of this type, if known.
    fn size_of(&self, type_name: &TypeName) -> Option<usize>;

    /// Alignment of this type, if known.
    fn align_of(&self, type_name: &TypeName) -> Option<usize>;
}

/// Fully resolved layout profile ready for use.
#[derive(Debug, Clone)]
pub struct LayoutProfile {
    /// Base (primitive) types, built-ins merged with the profile's own.
    pub base_types: HashMap<String, BaseType>,
    /// User-defined struct types, keyed by normalized name.
    pub user_types: HashMap<String, UserType>,
    /// Metadata.
    pub metadata: Metadata,
    /// Pointer size in bytes (4 or 8).
    pub pointer_size: usize,
}

impl Default for LayoutProfile {
    fn default() -> Self {
        LayoutProfile {
            base_types: crate::parser::builtin_base_types(8),
            user_types: HashMap::new(),
            metadata: Metadata {
                format: "builtin".to_string(),
                producer: None,
            },
            pointer_size: 8,
        }
    }
}

impl LayoutProfile {
    /// Look up a struct definition by name.
    pub fn get_type(&self, name: &str) -> Option<&UserType> {
        self.user_types.get(name)
    }

    /// Look up a primitive definition by name.
    pub fn get_base_type(&self, name: &str) -> Option<&BaseType> {
        self.base_types.get(name)
    }

    /// Get the size of a type (user type or base type) by its exact name.
    pub fn type_size(&self, type_name: &str) -> Option<usize> {
        if let Some(ut) = self.user_types.get(type_name) {
            Some(ut.size)
        } else {
            self.base_types.get(type_name).map(|bt| bt.size)
        }
    }

    /// Fields of a user type ordered by offset (ties broken by name).
    pub fn ordered_fields(&self, type_name: &str) -> Option<Vec<(&str, &FieldDef)>> {
        let ut = self.user_types.get(type_name)?;
        let mut fields: Vec<(&str, &FieldDef)> =
            ut.fields.iter().map(|(n, f)| (n.as_str(), f)).collect();
        fields.sort_by(|a, b| a.1.offset.cmp(&b.1.offset).then(a.0.cmp(b.0)));
        Some(fields)
    }

    /// The type name a field's `TypeInfo` describes.
    pub fn field_type_name(&self, type_info: &TypeInfo) -> Option<TypeName> {
        let name = match type_info.kind.as_str() {
            "pointer" => {
                let pointee = type_info
                    .subtype
                    .as_ref()
                    .and_then(|st| self.field_type_name(st))
                    .map(|t| t.as_str().to_string())
                    .unwrap_or_else(|| "void".to_string());
                format!("{} *", pointee)
            }
            "array" => {
                let elem = self.field_type_name(type_info.subtype.as_ref()?)?;
                format!("{}[{}]", elem, type_info.count.unwrap_or(0))
            }
            _ => type_info.name.clone()?,
        };
        TypeName::parse(&name).ok()
    }

    fn user_type_align(&self, ut: &UserType, depth: usize) -> usize {
        if let Some(align) = ut.align {
            return align;
        }
        if depth > 32 {
            return 1;
        }
        ut.fields
            .values()
            .filter_map(|f| self.field_type_name(&f.type_info))
            .filter_map(|t| self.align_at_depth(&t, depth + 1))
            .max()
            .unwrap_or(1)
    }

    fn align_at_depth(&self, type_name: &TypeName, depth: usize) -> Option<usize> {
        if type_name.is_pointer() {
            return Some(self.pointer_size);
        }
        if let Some((elem, _)) = type_name.array_parts() {
            return self.align_at_depth(&elem, depth + 1);
        }
        if let Some(bt) = self.base_types.get(type_name.as_str()) {
            return Some(bt.size.clamp(1, 16));
        }
        self.user_types
            .get(type_name.as_str())
            .map(|ut| self.user_type_align(ut, depth))
    }
}

impl TypeMetrics for LayoutProfile {
    fn pointer_size(&self) -> usize {
        self.pointer_size
    }

    fn size_of(&self, type_name: &TypeName) -> Option<usize> {
        if type_name.is_pointer() {
            return Some(self.pointer_size);
        }
        if let Some((elem, count)) = type_name.array_parts() {
            return self.size_of(&elem).map(|s| s * count as usize);
        }
        self.type_size(type_name.as_str())
    }

    fn align_of(&self, type_name: &TypeName) -> Option<usize> {
        self.align_at_depth(type_name, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_profile_str;

    const PROFILE: &str = r#"{
        "metadata": { "format": "1.0.0" },
        "user_types": {
            "Vertex": {
                "size": 24,
                "fields": {
                    "position": { "offset": 0, "type": { "kind": "array", "count": 3, "subtype": { "kind": "base", "name": "float" } } },
                    "next": { "offset": 16, "type": { "kind": "pointer", "subtype": { "kind": "struct", "name": "Vertex" } } },
                    "flags": { "offset": 12, "type": { "kind": "base", "name": "unsigned int" } }
                }
            },
            "Packed": { "size": 5, "align": 1, "fields": {} }
        }
    }"#;

    #[test]
    fn test_ordered_fields() {
        let profile = parse_profile_str(PROFILE).unwrap();
        let fields = profile.ordered_fields("Vertex").unwrap();
        let names: Vec<&str> = fields.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["position", "flags", "next"]);
    }

    #[test]
    fn test_field_type_names() {
        let profile = parse_profile_str(PROFILE).unwrap();
        let ut = profile.get_type("Vertex").unwrap();
        let pos = profile.field_type_name(&ut.fields["position"].type_info).unwrap();
        assert_eq!(pos.as_str(), "float[3]");
        let next = profile.field_type_name(&ut.fields["next"].type_info).unwrap();
        assert_eq!(next.as_str(), "Vertex *");
    }

    #[test]
    fn test_metrics() {
        let profile = parse_profile_str(PROFILE).unwrap();
        let vertex = TypeName::parse("Vertex").unwrap();
        assert_eq!(profile.size_of(&vertex), Some(24));
        // Widest field is the pointer.
        assert_eq!(profile.align_of(&vertex), Some(8));

        let packed = TypeName::parse("Packed").unwrap();
        assert_eq!(profile.align_of(&packed), Some(1));

        let arr = TypeName::parse("double[4]").unwrap();
        assert_eq!(profile.size_of(&arr), Some(32));
        assert_eq!(profile.align_of(&arr), Some(8));

        let unknown = TypeName::parse("Mystery").unwrap();
        assert_eq!(profile.size_of(&unknown), None);
    }
}
