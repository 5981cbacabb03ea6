//! Request/response types for MCP tools.

use crate::inspector::{DisplayFormat, DumpOptions};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Deserialize an optional u64 that accepts decimal numbers, hex strings ("0x7ffd1000"),
/// or plain decimal strings ("1234").
fn deserialize_optional_u64_hex<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    let val: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match val {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| de::Error::custom("expected unsigned 64-bit integer")),
        Some(serde_json::Value::String(s)) => {
            let s = s.trim();
            if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                u64::from_str_radix(hex, 16)
                    .map(Some)
                    .map_err(de::Error::custom)
            } else {
                s.parse::<u64>().map(Some).map_err(de::Error::custom)
            }
        }
        _ => Err(de::Error::custom("expected number or hex string")),
    }
}

fn deserialize_u64_hex<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_optional_u64_hex(deserializer)?
        .ok_or_else(|| serde::de::Error::custom("expected an address"))
}

/// Request to open a memory snapshot.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct OpenSnapshotRequest {
    /// Path to the raw snapshot file.
    pub image_path: String,
    /// Virtual address of the first byte of the file. Accepts decimal or hex ("0x7ffd0000"). Defaults to 0.
    #[serde(default, deserialize_with = "deserialize_optional_u64_hex")]
    pub base_address: Option<u64>,
    /// Optional layout profile (.json or .json.xz). Built-in primitive types are used when absent.
    pub layout_path: Option<String>,
}

/// Request requiring only a session ID.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SessionRequest {
    /// Session ID from a previous dump_open_snapshot call.
    pub session_id: String,
}

/// Request to decode one value.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct FormatValueRequest {
    /// Session ID from a previous dump_open_snapshot call.
    pub session_id: String,
    /// Address of the value. Accepts decimal or hex ("0x7ffd1000").
    #[serde(deserialize_with = "deserialize_u64_hex")]
    pub address: u64,
    /// C++ type of the value, e.g. "tinystl::vector<int, tinystl::allocator>".
    pub type_name: String,
    /// Name of the root item. Defaults to "value".
    pub name: Option<String>,
    /// Values shallower than this are expanded. Defaults to 1.
    pub expand_depth: Option<usize>,
    /// Inames to expand regardless of depth, e.g. ["value.3"].
    #[serde(default)]
    pub expanded: Vec<String>,
    /// Display format for the root value.
    pub format: Option<DisplayFormat>,
    /// Display formats keyed by iname or dumper name, e.g. {"tinystl::stringT": "latin1_string"}.
    #[serde(default)]
    pub formats: HashMap<String, DisplayFormat>,
    /// Most children listed per container. Defaults to 100.
    pub max_array_count: Option<usize>,
    /// Most characters shown inline. Defaults to 100.
    pub display_string_limit: Option<usize>,
}

impl FormatValueRequest {
    pub fn root_name(&self) -> &str {
        self.name.as_deref().unwrap_or("value")
    }

    pub fn options(&self) -> DumpOptions {
        let defaults = DumpOptions::default();
        let mut formats = self.formats.clone();
        if let Some(format) = self.format {
            formats.insert(self.root_name().to_string(), format);
        }
        DumpOptions {
            expand_depth: self.expand_depth.unwrap_or(defaults.expand_depth),
            expanded: self.expanded.iter().cloned().collect(),
            formats,
            max_array_count: self.max_array_count.unwrap_or(defaults.max_array_count),
            display_string_limit: self
                .display_string_limit
                .unwrap_or(defaults.display_string_limit),
            separate_string_limit: defaults.separate_string_limit,
        }
    }
}

/// Request to read raw bytes.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadRawRequest {
    /// Session ID from a previous dump_open_snapshot call.
    pub session_id: String,
    /// Start address. Accepts decimal or hex ("0x7ffd1000").
    #[serde(deserialize_with = "deserialize_u64_hex")]
    pub address: u64,
    /// Bytes to read. Defaults to 256, at most 4096.
    pub length: Option<usize>,
}

/// Session info for listing.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SessionInfo {
    pub session_id: String,
    pub image_path: String,
    pub image_size: u64,
    pub base_address: String,
    pub layout_path: Option<String>,
    pub pointer_size: usize,
    pub created_at: String,
}

/// Server status information.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ServerStatus {
    pub version: String,
    pub active_sessions: usize,
    pub available_dumpers: Vec<String>,
    pub engine: String,
}

/// Dumper info.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DumperInfo {
    pub name: String,
    pub description: String,
    pub formats: Vec<DisplayFormat>,
}
