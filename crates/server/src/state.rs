//! Shared server state handed to every tool call.

use bandrelay_client::{FetchClient, FetchConfig, Jitter, PageSource, RelayClient};
use bandrelay_core::{AppConfig, BatchFetcher, CacheDb, CacheStore, Error, KvStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Cache namespace for band snapshots.
pub const BAND_NAMESPACE: &str = "band";

/// Cache namespace for album lists.
pub const ALBUMS_NAMESPACE: &str = "albums";

pub struct AppState {
    pub cache: CacheStore,
    pub pages: Arc<dyn PageSource>,
    pub relay: Option<RelayClient>,
    pub batch: BatchFetcher,
    pub jitter: Jitter,
    /// Fired on shutdown; in-flight batches stop at the next group boundary.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Build the production state: SQLite cache, HTTP page fetcher and,
    /// when configured, the relay client.
    pub async fn from_config(config: &AppConfig, shutdown: CancellationToken) -> Result<Self, Error> {
        let db = CacheDb::open(&config.db_path).await?;
        let pages = FetchClient::new(FetchConfig::from(config))?;

        let relay = match config
            .relay_endpoint()
            .map_err(|e| Error::InvalidInput(e.to_string()))?
        {
            Some((base_url, token)) => Some(RelayClient::new(base_url, token, config.timeout())?),
            None => {
                tracing::info!("no api_base_url configured, relaying disabled");
                None
            }
        };

        Self::new(config, Arc::new(db), Arc::new(pages), relay, shutdown)
    }

    /// Assemble state from explicit parts.
    pub fn new(
        config: &AppConfig, kv: Arc<dyn KvStore>, pages: Arc<dyn PageSource>, relay: Option<RelayClient>,
        shutdown: CancellationToken,
    ) -> Result<Self, Error> {
        let cache = CacheStore::new(kv, config.cache_config());
        let batch = BatchFetcher::new(config.batch_options())?;
        let (min, max) = config.jitter_bounds();

        Ok(Self { cache, pages, relay, batch, jitter: Jitter::new(min, max), shutdown })
    }

    pub fn relay(&self) -> Result<&RelayClient, Error> {
        self.relay.as_ref().ok_or(Error::RelayDisabled)
    }
}
