//! cache_clear tool implementation.
//!
//! Clears one namespace, or every entry carrying the configured prefix.

use bandrelay_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::{ALBUMS_NAMESPACE, AppState, BAND_NAMESPACE};
use crate::tools::json_result;

/// Parameters for the cache_clear tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearParams {
    /// Namespace to clear ("band" or "albums"). Clears everything when omitted.
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Output from the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    /// Number of entries removed.
    pub cleared: usize,
}

/// Implementation of the cache_clear tool.
pub async fn cache_clear_impl(state: &AppState, params: CacheClearParams) -> Result<CallToolResult, McpError> {
    let cleared = match params.namespace.as_deref() {
        None => state.cache.clear_all().await?,
        Some(ns @ (BAND_NAMESPACE | ALBUMS_NAMESPACE)) => state.cache.clear_namespace(ns).await?,
        Some(other) => {
            return Err(Error::InvalidInput(format!(
                "unknown namespace {other:?}, expected \"{BAND_NAMESPACE}\" or \"{ALBUMS_NAMESPACE}\""
            ))
            .into());
        }
    };

    json_result(&CacheClearOutput { cleared })
}
