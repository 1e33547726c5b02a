//! MCP tool implementations.
//!
//! This module contains all tools exposed by the bandrelay server.

pub mod albums_get;
pub mod band_get;
pub mod cache_clear;

pub use albums_get::{AlbumsGetParams, albums_get_impl};
pub use band_get::{BandGetParams, band_get_impl};
pub use cache_clear::{CacheClearParams, cache_clear_impl};

use bandrelay_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
