//! MCP tool definitions for the dumpview server.

use crate::dumpers::Registry;
use crate::inspector::{DecodedView, Dumper, Value};
use crate::memory::image::MemoryImage;
use crate::server::session::{MemorySession, SessionStore};
use crate::server::types::*;
use memlayout::{parse_profile_file, LayoutProfile};
use rmcp::handler::server::{router::tool::ToolRouter, wrapper::Parameters};
use rmcp::model::*;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest raw read served by dump_read_raw.
const MAX_RAW_READ: usize = 4096;

/// Format a byte slice as a classic hex dump with address markers and ASCII sidebar.
fn format_hex_dump(data: &[u8], base_address: u64) -> String {
    let mut out = String::new();
    for (i, chunk) in data.chunks(16).enumerate() {
        out.push_str(&format!("{:016x}  ", base_address + (i * 16) as u64));

        for j in 0..16 {
            if j == 8 {
                out.push(' ');
            }
            match chunk.get(j) {
                Some(byte) => out.push_str(&format!("{:02x} ", byte)),
                None => out.push_str("   "),
            }
        }

        out.push_str(" |");
        for &b in chunk {
            if b.is_ascii_graphic() || b == b' ' {
                out.push(b as char);
            } else {
                out.push('.');
            }
        }
        out.push_str("|\n");
    }
    out
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Failed to serialize result: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn session_info(session: &MemorySession) -> SessionInfo {
    SessionInfo {
        session_id: session.id.clone(),
        image_path: session.image_path.clone(),
        image_size: session.image_size(),
        base_address: format!("{:#x}", session.image.base_address()),
        layout_path: session.layout_path.clone(),
        pointer_size: session.profile.pointer_size,
        created_at: session.created_at.to_rfc3339(),
    }
}

/// Open a snapshot and its layout profile.
fn open_snapshot(req: &OpenSnapshotRequest) -> Result<(MemoryImage, LayoutProfile), McpError> {
    let image = MemoryImage::open(&req.image_path, req.base_address.unwrap_or(0))
        .map_err(|e| McpError::internal_error(format!("Failed to open snapshot: {}", e), None))?;

    let profile = match req.layout_path {
        Some(ref path) => parse_profile_file(path).map_err(|e| {
            McpError::invalid_params(format!("Failed to load layout profile {}: {}", path, e), None)
        })?,
        None => LayoutProfile::default(),
    };
    Ok((image, profile))
}

/// Decode one value of a session.
fn format_value(
    session: &MemorySession,
    registry: &Registry,
    req: &FormatValueRequest,
) -> Result<DecodedView, McpError> {
    let value = Value::parse(req.address, &req.type_name)
        .map_err(|e| McpError::invalid_params(format!("Invalid type name: {}", e), None))?;
    let options = req.options();
    let mut dumper = Dumper::new(&session.image, session.profile.as_ref(), registry, &options);
    Ok(dumper.dump_value(req.root_name(), &value))
}

/// Read up to MAX_RAW_READ bytes of a session as a hex dump.
fn read_raw(session: &MemorySession, req: &ReadRawRequest) -> Result<serde_json::Value, McpError> {
    let length = req.length.unwrap_or(256).min(MAX_RAW_READ);
    let data = session
        .image
        .read_virtual(req.address, length)
        .map_err(|e| McpError::invalid_params(format!("Failed to read memory: {}", e), None))?;

    Ok(json!({
        "session_id": session.id,
        "address": format!("{:#x}", req.address),
        "length": data.len(),
        "hex_dump": format_hex_dump(&data, req.address),
    }))
}

/// The dumpview MCP server.
#[derive(Clone)]
pub struct DumpviewServer {
    sessions: SessionStore,
    registry: Arc<Registry>,
    tool_router: ToolRouter<Self>,
}

impl Default for DumpviewServer {
    fn default() -> Self {
        Self::new()
    }
}

impl DumpviewServer {
    async fn session(&self, session_id: &str) -> Result<Arc<MemorySession>, McpError> {
        self.sessions.get_session(session_id).await.ok_or_else(|| {
            McpError::invalid_params(format!("Session not found: {}", session_id), None)
        })
    }
}

#[tool_router]
impl DumpviewServer {
    pub fn new() -> Self {
        DumpviewServer {
            sessions: SessionStore::new(),
            registry: Arc::new(Registry::builtin()),
            tool_router: Self::tool_router(),
        }
    }

    /// Open a memory snapshot.
    #[tool(description = "Open a raw memory snapshot for value inspection. Returns a session_id for subsequent calls. Fields: image_path (raw snapshot file), base_address (optional virtual address of the file's first byte, decimal or hex string, default 0), layout_path (optional layout profile .json or .json.xz describing struct layouts and primitive sizes).")]
    async fn dump_open_snapshot(
        &self,
        Parameters(req): Parameters<OpenSnapshotRequest>,
    ) -> Result<CallToolResult, McpError> {
        info!("Opening snapshot: {}", req.image_path);
        let (image, profile) = open_snapshot(&req)?;
        let session_id = self
            .sessions
            .create_session(req.image_path.clone(), image, profile, req.layout_path.clone())
            .await;

        let session = self.session(&session_id).await?;
        info!(
            "Session {} ready: {} bytes at {:#x}",
            session_id,
            session.image_size(),
            session.image.base_address()
        );
        json_result(&session_info(&session))
    }

    /// Close a session.
    #[tool(description = "Close a snapshot session and release its memory mapping. Requires session_id.")]
    async fn dump_close_session(
        &self,
        Parameters(req): Parameters<SessionRequest>,
    ) -> Result<CallToolResult, McpError> {
        if !self.sessions.remove_session(&req.session_id).await {
            return Err(McpError::invalid_params(
                format!("Session not found: {}", req.session_id),
                None,
            ));
        }
        info!("Closed session {}", req.session_id);
        json_result(&json!({ "session_id": req.session_id, "closed": true }))
    }

    /// List all open sessions.
    #[tool(description = "List all open snapshot sessions with their details (image path, size, base address, layout profile, creation time).")]
    async fn dump_list_sessions(&self) -> Result<CallToolResult, McpError> {
        let infos: Vec<SessionInfo> = self
            .sessions
            .list_sessions()
            .await
            .iter()
            .map(|s| session_info(s))
            .collect();
        json_result(&infos)
    }

    /// Get server status.
    #[tool(description = "Get dumpview server status including version, open session count, and available dumpers.")]
    async fn dump_get_status(&self) -> Result<CallToolResult, McpError> {
        let status = ServerStatus {
            version: VERSION.to_string(),
            active_sessions: self.sessions.count().await,
            available_dumpers: self
                .registry
                .entries()
                .iter()
                .map(|e| e.name.to_string())
                .collect(),
            engine: "dumpview (pure Rust)".to_string(),
        };
        json_result(&status)
    }

    /// List registered dumpers.
    #[tool(description = "List the registered dumpers (type templates with custom display) with descriptions and the display formats each one offers.")]
    async fn dump_list_dumpers(&self) -> Result<CallToolResult, McpError> {
        let dumpers: Vec<DumperInfo> = self
            .registry
            .entries()
            .iter()
            .map(|e| DumperInfo {
                name: e.name.to_string(),
                description: e.description.to_string(),
                formats: e.formats.to_vec(),
            })
            .collect();
        json_result(&dumpers)
    }

    /// Decode a value.
    #[tool(description = "Decode the value of a C++ type at an address into a display tree: display string, child count and children. Fields: session_id, address (decimal or hex string), type_name (e.g. \"tinystl::vector<int, tinystl::allocator>\"), name (root item name, default \"value\"), expand_depth (default 1), expanded (inames to expand, e.g. [\"value.3\"]), format (root display format), formats (formats keyed by iname or dumper name), max_array_count (default 100), display_string_limit (default 100). Formats: latin1_string, separate_latin1_string, utf8_string, separate_utf8_string, simple, separate, array_plot, compact_map.")]
    async fn dump_format_value(
        &self,
        Parameters(req): Parameters<FormatValueRequest>,
    ) -> Result<CallToolResult, McpError> {
        let session = self.session(&req.session_id).await?;
        let view = format_value(&session, &self.registry, &req)?;
        json_result(&view)
    }

    /// Read raw bytes.
    #[tool(description = "Read raw bytes of a snapshot as a hex dump. Fields: session_id, address (decimal or hex string like \"0x7ffd1000\"), length (default 256, max 4096).")]
    async fn dump_read_raw(
        &self,
        Parameters(req): Parameters<ReadRawRequest>,
    ) -> Result<CallToolResult, McpError> {
        let session = self.session(&req.session_id).await?;
        json_result(&read_raw(&session, &req)?)
    }
}

#[tool_handler]
impl ServerHandler for DumpviewServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "dumpview: debugger-style pretty printers for tinystl, glm and nanoem values \
                 in raw memory snapshots. Start by calling dump_open_snapshot with a snapshot \
                 path and its base address, then call dump_format_value with an address and \
                 a C++ type name. Call dump_list_dumpers to see which types have custom \
                 display and which formats they offer."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
