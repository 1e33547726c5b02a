//! albums_get tool implementation.
//!
//! Fetches album pages through the group-paced batch fetcher and caches the
//! list under the order-insensitive identity of the requested URLs. A list
//! is only cached when every album was retrieved.

use bandrelay_client::extract::{AlbumRecord, parse_album};
use bandrelay_client::fetch::{canonicalize, canonicalize_all};
use bandrelay_client::relay::{BandContext, RelayClient, RelayReport};
use bandrelay_core::cache::list_identity;
use bandrelay_core::{Error, FetchFailure, FetchItem};
use chrono::{DateTime, Utc};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::{ALBUMS_NAMESPACE, AppState};
use crate::tools::band_get::cached_snapshot;
use crate::tools::json_result;

/// Parameters for the albums_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AlbumsGetParams {
    /// Album page URLs.
    pub urls: Vec<String>,

    /// Band page the albums belong to. When set and that band was relayed,
    /// the fetched albums are relayed under its remote id.
    #[serde(default)]
    pub band_url: Option<String>,

    /// Bypass the cache read. The fresh result is still cached.
    #[serde(default)]
    pub force_refresh: bool,

    /// Wait for album deliveries and return their report (default: true).
    /// When false, deliveries continue in the background and are logged.
    #[serde(default = "default_true")]
    pub wait_for_relay: bool,
}

fn default_true() -> bool {
    true
}

/// Output from the albums_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AlbumsGetOutput {
    /// Retrieved albums, in request order.
    pub albums: Vec<AlbumRecord>,
    /// Degraded count, e.g. "4 of 5 retrieved".
    pub summary: String,
    pub failures: Vec<FetchFailure>,
    /// True when shutdown interrupted the batch.
    pub cancelled: bool,
    pub from_cache: bool,
    /// Capture time of the cached list; `None` when the list was not cached.
    pub cached_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay: Option<RelayReport>,
    /// Deliveries still running in the background.
    pub relay_pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay_error: Option<String>,
}

/// Implementation of the albums_get tool.
pub async fn albums_get_impl(state: &AppState, params: AlbumsGetParams) -> Result<CallToolResult, McpError> {
    let output = albums_get(state, params).await?;
    json_result(&output)
}

async fn albums_get(state: &AppState, params: AlbumsGetParams) -> Result<AlbumsGetOutput, Error> {
    if params.urls.is_empty() {
        return Err(Error::InvalidInput("urls cannot be empty".into()));
    }

    let urls = canonicalize_all(&params.urls)?;
    let key = state.cache.derive_key(ALBUMS_NAMESPACE, &list_identity(&urls));

    if !params.force_refresh
        && let Some(hit) = state.cache.get::<Vec<AlbumRecord>>(&key).await?
    {
        let count = hit.value.len();
        return Ok(AlbumsGetOutput {
            albums: hit.value,
            summary: format!("{count} of {count} retrieved"),
            failures: Vec::new(),
            cancelled: false,
            from_cache: true,
            cached_at: Some(hit.captured_at),
            relay: None,
            relay_pending: false,
            relay_error: None,
        });
    }

    let items: Vec<FetchItem> = urls.iter().map(FetchItem::new).collect();
    let pages = &state.pages;
    let jitter = state.jitter;
    let result = state
        .batch
        .fetch_all_until(
            &items,
            |url| async move {
                jitter.pause().await;
                let html = pages.fetch_html(&url).await?;
                let album = parse_album(&html, &url);
                album.validate()?;
                Ok::<_, Error>(album)
            },
            &state.shutdown,
        )
        .await;

    let cached_at = if result.is_complete() {
        Some(state.cache.set(&key, &result.items).await?)
    } else {
        tracing::warn!(summary = %result.summary(), cancelled = result.cancelled, "album list incomplete, not caching");
        None
    };

    let mut output = AlbumsGetOutput {
        summary: result.summary(),
        albums: result.items,
        failures: result.failures,
        cancelled: result.cancelled,
        from_cache: false,
        cached_at,
        relay: None,
        relay_pending: false,
        relay_error: None,
    };

    if let Some(band_url) = params.band_url.as_deref() {
        relay_albums(state, band_url, params.wait_for_relay, &mut output).await;
    }

    Ok(output)
}

async fn relay_albums(state: &AppState, band_url: &str, wait: bool, output: &mut AlbumsGetOutput) {
    if output.albums.is_empty() {
        return;
    }

    let (client, context) = match band_context(state, band_url).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(band_url, error = %e, "skipping album relay");
            output.relay_error = Some(e.to_string());
            return;
        }
    };

    if wait {
        output.relay = Some(client.relay_albums(&output.albums, &context).await);
        return;
    }

    let client = client.clone();
    let albums = output.albums.clone();
    tokio::spawn(async move {
        let report = client.relay_albums(&albums, &context).await;
        if !report.is_clean() {
            tracing::warn!(failed = report.failed.len(), band_id = %context.band_id, "background album relay had failures");
        }
    });
    output.relay_pending = true;
}

/// The relay client and the remote band id and genre ids from the cached
/// band snapshot.
async fn band_context<'a>(state: &'a AppState, band_url: &str) -> Result<(&'a RelayClient, BandContext), Error> {
    let client = state.relay()?;
    let band_url = canonicalize(band_url)?;
    let snapshot = cached_snapshot(state, band_url.as_str())
        .await?
        .ok_or_else(|| Error::InvalidInput(format!("band {band_url} is not cached, call band_get first")))?;
    let relayed = snapshot
        .relay
        .ok_or_else(|| Error::RelayFailed(format!("band {band_url} was not relayed")))?;
    Ok((client, BandContext::from(&relayed)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::band_get::{BandGetParams, band_get_impl};
    use crate::tools::testing::{BAND_URL, StubPages, album_page, album_url, band_page, output, state};
    use std::sync::Arc;
    use std::time::Duration;

    fn pages(albums: usize) -> StubPages {
        (1..=albums).fold(StubPages::default().with(BAND_URL, &band_page(albums)), |pages, n| {
            pages.with(&album_url(n), &album_page(n))
        })
    }

    fn params(urls: Vec<String>) -> AlbumsGetParams {
        AlbumsGetParams { urls, band_url: None, force_refresh: false, wait_for_relay: true }
    }

    #[tokio::test]
    async fn test_complete_batch_is_cached() {
        let pages = Arc::new(pages(3));
        let state = state(pages.clone(), None);
        let urls: Vec<String> = (1..=3).map(album_url).collect();

        let first: AlbumsGetOutput = output(&albums_get_impl(&state, params(urls.clone())).await.unwrap());
        assert_eq!(first.summary, "3 of 3 retrieved");
        assert!(!first.from_cache);
        assert!(first.cached_at.is_some());
        let titles: Vec<_> = first.albums.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Record 1", "Record 2", "Record 3"]);
        assert_eq!(first.albums[0].release_date, "2001-05-01");
        assert_eq!(pages.calls(), 3);

        let mut reversed = urls;
        reversed.reverse();
        let second = albums_get(&state, params(reversed)).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.albums.len(), 3);
        assert_eq!(pages.calls(), 3);
    }

    #[tokio::test]
    async fn test_partial_batch_is_reported_not_cached() {
        let pages = Arc::new(pages(4));
        let state = state(pages.clone(), None);
        let urls: Vec<String> = (1..=5).map(album_url).collect();

        let out = albums_get(&state, params(urls.clone())).await.unwrap();
        assert_eq!(out.summary, "4 of 5 retrieved");
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].identity, album_url(5));
        assert!(out.cached_at.is_none());

        let again = albums_get(&state, params(urls)).await.unwrap();
        assert!(!again.from_cache);
        assert_eq!(pages.calls(), 10);
    }

    #[tokio::test]
    async fn test_force_refresh_refetches() {
        let pages = Arc::new(pages(2));
        let state = state(pages.clone(), None);
        let urls: Vec<String> = (1..=2).map(album_url).collect();

        albums_get(&state, params(urls.clone())).await.unwrap();
        let forced = albums_get(&state, AlbumsGetParams { force_refresh: true, ..params(urls) })
            .await
            .unwrap();
        assert!(!forced.from_cache);
        assert_eq!(pages.calls(), 4);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_batch() {
        let pages = Arc::new(pages(2));
        let state = state(pages, None);
        state.shutdown.cancel();

        let out = albums_get(&state, params((1..=2).map(album_url).collect())).await.unwrap();
        assert!(out.cancelled);
        assert!(out.albums.is_empty());
        assert!(out.cached_at.is_none());
    }

    #[tokio::test]
    async fn test_empty_urls_rejected() {
        let state = state(Arc::new(StubPages::default()), None);
        let result = albums_get(&state, params(vec![])).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_band_url_without_relay_reports_disabled() {
        let state = state(Arc::new(pages(1)), None);
        let out = albums_get(&state, AlbumsGetParams { band_url: Some(BAND_URL.into()), ..params(vec![album_url(1)]) })
            .await
            .unwrap();
        assert_eq!(out.albums.len(), 1);
        assert_eq!(out.relay_error.as_deref(), Some("RELAY_DISABLED"));
        assert!(out.relay.is_none());
    }

    async fn relay_server() -> (mockito::ServerGuard, Vec<mockito::Mock>) {
        let mut server = mockito::Server::new_async().await;
        let genres = server
            .mock("GET", "/genre")
            .with_status(200)
            .with_body(r#"[{"_id":"g-doom","name":"Doom"}]"#)
            .create_async()
            .await;
        let group = server
            .mock("POST", "/group")
            .with_status(201)
            .with_body(r#"{"_id":"band-9"}"#)
            .create_async()
            .await;
        let album = server
            .mock("POST", "/album")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({ "groups": ["band-9"], "genres": ["g-doom"] })))
            .with_status(201)
            .with_body(r#"{"_id":"album"}"#)
            .expect_at_least(1)
            .create_async()
            .await;
        (server, vec![genres, group, album])
    }

    #[tokio::test]
    async fn test_albums_relayed_with_band_context() {
        let (server, _mocks) = relay_server().await;
        let relay = RelayClient::new(&server.url(), "secret", Duration::from_secs(5)).unwrap();
        let state = state(Arc::new(pages(2)), Some(relay));

        band_get_impl(&state, BandGetParams { url: BAND_URL.into(), ..Default::default() })
            .await
            .unwrap();

        let urls: Vec<String> = (1..=2).map(album_url).collect();
        let out = albums_get(&state, AlbumsGetParams { band_url: Some(BAND_URL.into()), ..params(urls.clone()) })
            .await
            .unwrap();

        let report = out.relay.unwrap();
        assert_eq!(report.delivered, urls);
        assert!(report.is_clean());
        assert!(!out.relay_pending);
    }

    #[tokio::test]
    async fn test_relay_needs_cached_band() {
        let (server, _mocks) = relay_server().await;
        let relay = RelayClient::new(&server.url(), "secret", Duration::from_secs(5)).unwrap();
        let state = state(Arc::new(pages(1)), Some(relay));

        let out = albums_get(&state, AlbumsGetParams { band_url: Some(BAND_URL.into()), ..params(vec![album_url(1)]) })
            .await
            .unwrap();
        assert!(out.relay.is_none());
        assert!(out.relay_error.unwrap().starts_with("INVALID_INPUT"));
    }

    #[tokio::test]
    async fn test_background_relay() {
        let (server, _mocks) = relay_server().await;
        let relay = RelayClient::new(&server.url(), "secret", Duration::from_secs(5)).unwrap();
        let state = state(Arc::new(pages(1)), Some(relay));

        band_get_impl(&state, BandGetParams { url: BAND_URL.into(), ..Default::default() })
            .await
            .unwrap();
        let out = albums_get(
            &state,
            AlbumsGetParams { band_url: Some(BAND_URL.into()), wait_for_relay: false, ..params(vec![album_url(1)]) },
        )
        .await
        .unwrap();

        assert!(out.relay_pending);
        assert!(out.relay.is_none());
        assert!(out.relay_error.is_none());
    }
}
