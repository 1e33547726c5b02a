//! band_get tool implementation.
//!
//! Returns the band record for a band page, from cache when fresh. On a miss
//! the page is parsed (from the supplied HTML or a fetch), relayed to the
//! remote API when one is configured, and cached with its relay outcome.

use bandrelay_client::extract::{BandRecord, parse_band};
use bandrelay_client::fetch::canonicalize;
use bandrelay_client::relay::RelayedBand;
use bandrelay_core::Error;
use chrono::{DateTime, Utc};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::{AppState, BAND_NAMESPACE};
use crate::tools::json_result;

/// Parameters for the band_get tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct BandGetParams {
    /// Band page URL.
    pub url: String,

    /// Page HTML, when the caller already has it. Skips the fetch.
    #[serde(default)]
    pub html: Option<String>,

    /// Bypass the cache read. The fresh result is still cached.
    #[serde(default)]
    pub force_refresh: bool,
}

/// What is cached per band page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BandSnapshot {
    pub record: BandRecord,
    /// `None` when relaying is disabled or failed.
    pub relay: Option<RelayedBand>,
}

/// Output from the band_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BandGetOutput {
    pub band: BandRecord,
    /// Album page URLs in page order, ready to hand to albums_get.
    pub album_urls: Vec<String>,
    pub relay: Option<RelayedBand>,
    /// Why the relay did not happen on this call, if it was attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay_error: Option<String>,
    pub from_cache: bool,
    pub cached_at: DateTime<Utc>,
}

/// Look up the cached snapshot for a canonical band URL.
pub async fn cached_snapshot(state: &AppState, band_url: &str) -> Result<Option<BandSnapshot>, Error> {
    let key = state.cache.derive_key(BAND_NAMESPACE, band_url);
    Ok(state.cache.get::<BandSnapshot>(&key).await?.map(|hit| hit.value))
}

/// Implementation of the band_get tool.
pub async fn band_get_impl(state: &AppState, params: BandGetParams) -> Result<CallToolResult, McpError> {
    let output = band_get(state, params).await?;
    json_result(&output)
}

async fn band_get(state: &AppState, params: BandGetParams) -> Result<BandGetOutput, Error> {
    let url = canonicalize(&params.url)?;
    let key = state.cache.derive_key(BAND_NAMESPACE, url.as_str());

    if !params.force_refresh
        && let Some(hit) = state.cache.get::<BandSnapshot>(&key).await?
    {
        return Ok(BandGetOutput {
            album_urls: hit.value.record.album_urls(),
            band: hit.value.record,
            relay: hit.value.relay,
            relay_error: None,
            from_cache: true,
            cached_at: hit.captured_at,
        });
    }

    let html = match params.html {
        Some(html) if !html.trim().is_empty() => html,
        Some(_) => return Err(Error::InvalidInput("html cannot be empty".into())),
        None => state.pages.fetch_html(url.as_str()).await?,
    };

    let record = parse_band(&html, &url);
    record.validate()?;

    let (relay, relay_error) = match &state.relay {
        Some(client) => match client.relay_band(&record).await {
            Ok(relayed) => (Some(relayed), None),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "band relay failed, caching without relay");
                (None, Some(e.to_string()))
            }
        },
        None => (None, None),
    };

    let snapshot = BandSnapshot { record, relay };
    let cached_at = state.cache.set(&key, &snapshot).await?;

    Ok(BandGetOutput {
        album_urls: snapshot.record.album_urls(),
        band: snapshot.record,
        relay: snapshot.relay,
        relay_error,
        from_cache: false,
        cached_at,
    })
}
