//! Layout profile parser: handles both plain JSON and .json.xz compressed files.

use crate::error::{LayoutError, LayoutResult};
use crate::typename::TypeName;
use crate::types::{BaseType, LayoutProfile, ProfileFile};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;
use xz2::read::XzDecoder;

/// Parse a layout profile from a filesystem path.
///
/// Automatically detects compression:
/// - `.json.xz` or `.xz` → LZMA decompression then JSON parse
/// - `.json` or anything else → direct JSON parse
pub fn parse_profile_file(path: impl AsRef<Path>) -> LayoutResult<LayoutProfile> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(LayoutError::FileNotFound(path.display().to_string()));
    }

    let file = File::open(path)
        .map_err(|e| LayoutError::Io(format!("opening {}: {}", path.display(), e)))?;
    let reader = BufReader::new(file);
    let mut buf = Vec::new();

    let path_str = path.to_string_lossy().to_lowercase();
    if path_str.ends_with(".xz") {
        XzDecoder::new(reader)
            .read_to_end(&mut buf)
            .map_err(|e| LayoutError::Decompression(format!("{}: {}", path.display(), e)))?;
    } else {
        let mut reader = reader;
        reader
            .read_to_end(&mut buf)
            .map_err(|e| LayoutError::Io(format!("reading {}: {}", path.display(), e)))?;
    }

    parse_profile_bytes(&buf)
}

/// Parse a layout profile from raw JSON bytes (already decompressed).
pub fn parse_profile_bytes(json_bytes: &[u8]) -> LayoutResult<LayoutProfile> {
    let file: ProfileFile = serde_json::from_slice(json_bytes)
        .map_err(|e| LayoutError::JsonParse(format!("{}", e)))?;

    convert_to_profile(file)
}

/// Parse a layout profile from a JSON string.
pub fn parse_profile_str(json_str: &str) -> LayoutResult<LayoutProfile> {
    let file: ProfileFile = serde_json::from_str(json_str)
        .map_err(|e| LayoutError::JsonParse(format!("{}", e)))?;

    convert_to_profile(file)
}

/// Primitive types every profile starts from (LP64 model).
///
/// `size_t`-like types follow `pointer_size`.
pub fn builtin_base_types(pointer_size: usize) -> HashMap<String, BaseType> {
    let mut types = HashMap::new();
    let mut add = |names: &[&str], size: usize, signed: bool, kind: &str| {
        for name in names {
            types.insert(name.to_string(), BaseType::new(size, signed, kind));
        }
    };

    add(&["char", "signed char"], 1, true, "char");
    add(&["unsigned char"], 1, false, "char");
    add(&["bool"], 1, false, "bool");
    add(&["wchar_t"], 4, true, "char");
    add(&["char16_t"], 2, false, "char");
    add(&["char32_t"], 4, false, "char");
    add(&["short", "short int", "int16_t", "nanoem_i16_t"], 2, true, "int");
    add(&["unsigned short", "unsigned short int", "uint16_t", "nanoem_u16_t"], 2, false, "int");
    add(&["int", "int32_t", "nanoem_i32_t", "nanoem_rsize_t"], 4, true, "int");
    add(&["unsigned int", "uint32_t", "nanoem_u32_t"], 4, false, "int");
    add(&["long long", "long long int", "int64_t", "nanoem_i64_t"], 8, true, "int");
    add(&["unsigned long long", "unsigned long long int", "uint64_t", "nanoem_u64_t"], 8, false, "int");
    add(&["int8_t", "nanoem_i8_t"], 1, true, "int");
    add(&["uint8_t", "nanoem_u8_t"], 1, false, "int");
    add(&["float", "nanoem_f32_t"], 4, true, "float");
    add(&["double", "nanoem_f64_t"], 8, true, "float");
    add(&["long", "long int", "ssize_t", "ptrdiff_t", "intptr_t"], pointer_size, true, "int");
    add(&["unsigned long", "unsigned long int", "size_t", "uintptr_t"], pointer_size, false, "int");
    add(&["pointer"], pointer_size, false, "int");

    types
}

/// Convert a parsed ProfileFile into a resolved LayoutProfile.
fn convert_to_profile(file: ProfileFile) -> LayoutResult<LayoutProfile> {
    // Determine pointer size from base_types
    let pointer_size = file
        .base_types
        .get("pointer")
        .map(|bt| bt.size)
        .unwrap_or(8); // default to 64-bit

    if pointer_size != 4 && pointer_size != 8 {
        return Err(LayoutError::JsonParse(format!(
            "unsupported pointer size: {}",
            pointer_size
        )));
    }

    // Values are decoded little-endian.
    if let Some((name, bt)) = file.base_types.iter().find(|(_, bt)| bt.endian != "little") {
        return Err(LayoutError::UnsupportedEndian {
            type_name: name.clone(),
            endian: bt.endian.clone(),
        });
    }

    let mut base_types = builtin_base_types(pointer_size);
    base_types.extend(file.base_types);

    // Key user types by normalized name so lookups by TypeName hit.
    let mut user_types = HashMap::with_capacity(file.user_types.len());
    for (name, ut) in file.user_types {
        let key = TypeName::parse(&name)?;
        user_types.insert(key.as_str().to_string(), ut);
    }

    debug!(
        "Loaded layout profile (format {}): {} base types, {} user types, pointer size {}",
        file.metadata.format,
        base_types.len(),
        user_types.len(),
        pointer_size
    );

    Ok(LayoutProfile {
        base_types,
        user_types,
        metadata: file.metadata,
        pointer_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_PROFILE: &str = r#"{
        "metadata": { "format": "1.0.0", "producer": { "name": "dwarf2layout", "version": "0.3" } },
        "base_types": {
            "pointer": { "size": 8, "signed": false, "kind": "int", "endian": "little" },
            "wchar_t": { "size": 2, "signed": false, "kind": "char" }
        },
        "user_types": {
            "nanoem::Vertex": {
                "size": 16,
                "fields": {
                    "origin": { "offset": 0, "type": { "kind": "struct", "name": "glm::vec<3, float>" } },
                    "weight": { "offset": 12, "type": { "kind": "base", "name": "float" } }
                }
            },
            "glm::vec< 3,float >": {
                "size": 12,
                "fields": {}
            }
        }
    }"#;

    #[test]
    fn test_parse_minimal_profile() {
        let profile = parse_profile_str(MINIMAL_PROFILE).unwrap();

        assert_eq!(profile.pointer_size, 8);
        assert_eq!(profile.metadata.format, "1.0.0");
        assert_eq!(
            profile.metadata.producer.as_ref().and_then(|p| p.name.as_deref()),
            Some("dwarf2layout")
        );

        let vertex = profile.get_type("nanoem::Vertex").unwrap();
        assert_eq!(vertex.size, 16);
        assert_eq!(vertex.fields["weight"].offset, 12);
        assert!(!vertex.fields.contains_key("NonExistent"));

        // Keys are normalized.
        assert_eq!(profile.type_size("glm::vec<3, float>"), Some(12));
    }

    #[test]
    fn test_builtins_and_overrides() {
        let profile = parse_profile_str(MINIMAL_PROFILE).unwrap();
        assert_eq!(profile.type_size("int"), Some(4));
        assert_eq!(profile.type_size("size_t"), Some(8));
        assert_eq!(profile.type_size("nanoem_u8_t"), Some(1));
        // Profile wins over the built-in 4-byte wchar_t.
        assert_eq!(profile.type_size("wchar_t"), Some(2));
    }

    #[test]
    fn test_parse_32bit() {
        let json = r#"{
            "metadata": { "format": "1.0.0" },
            "base_types": {
                "pointer": { "size": 4, "signed": false, "kind": "int" }
            }
        }"#;

        let profile = parse_profile_str(json).unwrap();
        assert_eq!(profile.pointer_size, 4);
        assert_eq!(profile.type_size("size_t"), Some(4));
        assert_eq!(profile.type_size("long"), Some(4));
    }

    #[test]
    fn test_bad_pointer_size() {
        let json = r#"{
            "metadata": { "format": "1.0.0" },
            "base_types": { "pointer": { "size": 3, "signed": false, "kind": "int" } }
        }"#;
        assert!(matches!(parse_profile_str(json), Err(LayoutError::JsonParse(_))));
    }

    #[test]
    fn test_big_endian_types_rejected() {
        let json = r#"{
            "metadata": { "format": "1.0.0" },
            "base_types": { "int": { "size": 4, "signed": true, "kind": "int", "endian": "big" } }
        }"#;
        match parse_profile_str(json) {
            Err(LayoutError::UnsupportedEndian { type_name, endian }) => {
                assert_eq!(type_name, "int");
                assert_eq!(endian, "big");
            }
            other => panic!("Expected UnsupportedEndian, got: {:?}", other),
        }
    }

    #[test]
    fn test_parse_plain_file() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(MINIMAL_PROFILE.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let profile = parse_profile_file(tmp.path()).unwrap();
        assert!(profile.get_type("nanoem::Vertex").is_some());
    }

    #[test]
    fn test_parse_xz_file() {
        let tmp = tempfile::Builder::new().suffix(".json.xz").tempfile().unwrap();
        {
            let mut encoder = xz2::write::XzEncoder::new(tmp.reopen().unwrap(), 6);
            encoder.write_all(MINIMAL_PROFILE.as_bytes()).unwrap();
            encoder.finish().unwrap();
        }

        let profile = parse_profile_file(tmp.path()).unwrap();
        assert_eq!(profile.type_size("nanoem::Vertex"), Some(16));
    }

    #[test]
    fn test_parse_file_not_found() {
        let result = parse_profile_file("/nonexistent/path.json");
        assert!(result.is_err());
        match result.unwrap_err() {
            LayoutError::FileNotFound(path) => assert!(path.contains("nonexistent")),
            other => panic!("Expected FileNotFound, got: {:?}", other),
        }
    }
}
