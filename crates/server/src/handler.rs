//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::state::AppState;
use crate::tools::{
    AlbumsGetParams, BandGetParams, CacheClearParams, albums_get_impl, band_get_impl, cache_clear_impl,
};
use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for bandrelay.
#[derive(Clone)]
pub struct McpRelayServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl McpRelayServer {
    /// Create a new server handler.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    /// Get a band record.
    ///
    /// Served from cache when fresh. Otherwise the page is parsed, relayed to the
    /// remote API when configured, and cached.
    #[tool(
        description = "Get the band record for a band page URL: name, origin, genre, status, themes, label and its album list. Cached for the configured TTL; force_refresh bypasses the cache."
    )]
    async fn band_get(&self, params: Parameters<BandGetParams>) -> Result<CallToolResult, McpError> {
        band_get_impl(&self.state, params.0).await
    }

    /// Get album details for a list of album page URLs.
    #[tool(
        description = "Get album details (title, type, release date, tracks) for album page URLs. Pages are fetched in small paced groups; failed pages are reported, not fatal. With band_url, albums are relayed under that band."
    )]
    async fn albums_get(&self, params: Parameters<AlbumsGetParams>) -> Result<CallToolResult, McpError> {
        albums_get_impl(&self.state, params.0).await
    }

    #[tool(description = "Clear cached entries, either one namespace (\"band\" or \"albums\") or everything.")]
    async fn cache_clear(&self, params: Parameters<CacheClearParams>) -> Result<CallToolResult, McpError> {
        cache_clear_impl(&self.state, params.0).await
    }
}

impl ServerHandler for McpRelayServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "bandrelay".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StubPages, state};

    #[test]
    fn test_registers_three_tools() {
        let server = McpRelayServer::new(Arc::new(state(Arc::new(StubPages::default()), None)));
        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["albums_get", "band_get", "cache_clear"]);
    }

    #[test]
    fn test_server_info() {
        let server = McpRelayServer::new(Arc::new(state(Arc::new(StubPages::default()), None)));
        assert_eq!(server.get_info().server_info.name, "bandrelay");
    }
}
