//! Delivery of extracted records to the remote API.
//!
//! ### Endpoints
//! - `GET  {base}/genre`: known genres with their ids
//! - `POST {base}/group`: a band, answered with its remote `_id`
//! - `POST {base}/album`: one album, linked to a band id
//!
//! The token is sent as-is in the `Authorization` header.
//!
//! Album delivery is fire-and-collect: every post is awaited and its
//! outcome lands in a [`RelayReport`], nothing is dropped silently.

use bandrelay_core::Error;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use reqwest::{Client, Url, header};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::extract::{AlbumRecord, BandRecord, Track};

/// A genre known to the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

/// Outcome of a successful band relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RelayedBand {
    /// Remote `_id` of the band.
    pub id: String,
    /// Remote ids of the genres the band's genre string resolved to.
    pub genres: Vec<String>,
    pub relayed_at: DateTime<Utc>,
}

/// What an album needs to be linked to its band remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandContext {
    pub band_id: String,
    pub genre_ids: Vec<String>,
}

impl From<&RelayedBand> for BandContext {
    fn from(band: &RelayedBand) -> Self {
        Self { band_id: band.id.clone(), genre_ids: band.genres.clone() }
    }
}

#[derive(Debug, Serialize)]
struct BandPayload<'a> {
    #[serde(flatten)]
    record: &'a BandRecord,
    genres: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AlbumPayload<'a> {
    title: &'a str,
    groups: [&'a str; 1],
    genres: &'a [String],
    #[serde(rename = "type")]
    kind: &'a str,
    release_date: &'a str,
    tracks: &'a [Track],
}

impl<'a> AlbumPayload<'a> {
    fn new(album: &'a AlbumRecord, context: &'a BandContext) -> Self {
        Self {
            title: &album.title,
            groups: [context.band_id.as_str()],
            genres: &context.genre_ids,
            kind: &album.kind,
            release_date: &album.release_date,
            tracks: &album.tracks,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Created {
    #[serde(rename = "_id")]
    id: String,
}

/// An album that could not be delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RelayFailure {
    pub url: String,
    pub reason: String,
}

/// Per-album delivery outcome of one relay run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RelayReport {
    /// Source URLs of the delivered albums.
    pub delivered: Vec<String>,
    pub failed: Vec<RelayFailure>,
}

impl RelayReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Client for the remote API.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: Client,
    base: Url,
    token: String,
}

impl RelayClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, Error> {
        let mut base = Url::parse(base_url).map_err(|e| Error::InvalidUrl(format!("{base_url}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = Client::builder()
            .timeout(timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, base, token: token.to_string() })
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base
            .join(path)
            .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Created, Error> {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .post(url)
            .header(header::AUTHORIZATION, &self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::RelayFailed(format!("POST /{path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::RelayFailed(format!("POST /{path}: status {}", status.as_u16())));
        }

        response
            .json::<Created>()
            .await
            .map_err(|e| Error::RelayFailed(format!("POST /{path}: unreadable response: {e}")))
    }

    /// Fetch the genre list.
    pub async fn genres(&self) -> Result<Vec<Genre>, Error> {
        let response = self
            .http
            .get(self.endpoint("genre")?)
            .header(header::AUTHORIZATION, &self.token)
            .send()
            .await
            .map_err(|e| Error::RelayFailed(format!("GET /genre: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::RelayFailed(format!("GET /genre: status {}", status.as_u16())));
        }

        response
            .json()
            .await
            .map_err(|e| Error::RelayFailed(format!("GET /genre: unreadable response: {e}")))
    }

    /// Post a band and return its remote id with the resolved genre ids.
    ///
    /// Genre names without a remote counterpart are left out.
    pub async fn relay_band(&self, record: &BandRecord) -> Result<RelayedBand, Error> {
        let known = self.genres().await?;
        let genres = resolve_genres(record, &known);

        let created = self
            .post("group", &BandPayload { record, genres: &genres })
            .await?;

        tracing::info!(band = %record.name, id = %created.id, genres = genres.len(), "relayed band");
        Ok(RelayedBand { id: created.id, genres, relayed_at: Utc::now() })
    }

    /// Post every album concurrently and report each outcome.
    pub async fn relay_albums(&self, albums: &[AlbumRecord], context: &BandContext) -> RelayReport {
        let outcomes = join_all(albums.iter().map(|album| async move {
            let result = self.post("album", &AlbumPayload::new(album, context)).await;
            (album.url.clone(), result)
        }))
        .await;

        let mut report = RelayReport::default();
        for (url, result) in outcomes {
            match result {
                Ok(_) => report.delivered.push(url),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "album relay failed");
                    report.failed.push(RelayFailure { url, reason: e.to_string() });
                }
            }
        }

        tracing::info!(
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            band_id = %context.band_id,
            "album relay finished"
        );
        report
    }
}

fn resolve_genres(record: &BandRecord, known: &[Genre]) -> Vec<String> {
    record
        .genre_names()
        .into_iter()
        .filter_map(|name| known.iter().find(|g| g.name == name).map(|g| g.id.clone()))
        .collect()
}
