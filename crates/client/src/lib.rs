//! Client code for bandrelay.
//!
//! Page fetching, band/album field extraction and the remote API relay,
//! used by the server's tools.

pub mod extract;
pub mod fetch;
pub mod relay;

pub use extract::{AlbumRecord, AlbumSummary, BandRecord, Track, parse_album, parse_band};
pub use fetch::{FetchClient, FetchConfig, Jitter, PageSource};
pub use relay::{BandContext, RelayClient, RelayFailure, RelayReport, RelayedBand};
