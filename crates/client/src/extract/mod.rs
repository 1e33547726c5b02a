//! Field extraction from band and album pages.
//!
//! ### Records
//! - [`BandRecord`]: the primary entity, with summaries of its albums.
//! - [`AlbumRecord`]: one album with its track list.
//!
//! ### Missing fields
//! Text fields that cannot be found carry an explicit sentinel
//! ([`NOT_FOUND`] on bands, [`UNKNOWN`] on album summaries) instead of being
//! left out, so downstream consumers always see the full shape.
//!
//! ### Validation
//! Records are checked with `validate()` before they are cached or relayed.

pub mod album;
pub mod band;
pub mod date;

pub use album::parse_album;
pub use band::parse_band;
pub use date::{DateFormat, format_date};

use bandrelay_core::Error;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// Sentinel for band fields missing from the page.
pub const NOT_FOUND: &str = "not found";

/// Sentinel for album summary fields missing from the page.
pub const UNKNOWN: &str = "unknown";

/// A band and the albums listed on its page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BandRecord {
    pub name: String,
    pub country: String,
    pub city: String,
    pub genre: String,
    pub status: String,
    /// `None` when the page has no parsable year.
    pub formed_year: Option<i32>,
    pub years_active: String,
    pub themes: Vec<String>,
    pub label: String,
    pub albums: Vec<AlbumSummary>,
    pub last_updated: DateTime<Utc>,
}

impl BandRecord {
    /// Genre names, split on `/` as the site lists them.
    pub fn genre_names(&self) -> Vec<&str> {
        if self.genre == NOT_FOUND {
            return Vec::new();
        }
        self.genre.split('/').map(str::trim).filter(|g| !g.is_empty()).collect()
    }

    /// Album page URLs in page order.
    pub fn album_urls(&self) -> Vec<String> {
        self.albums
            .iter()
            .filter(|a| !a.url.is_empty())
            .map(|a| a.url.clone())
            .collect()
    }

    /// Reject records that are not worth caching.
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() || self.name == NOT_FOUND {
            return Err(Error::ExtractFailed("band page has no name".into()));
        }
        Ok(())
    }
}

/// One row of a band's discography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AlbumSummary {
    pub name: String,
    pub url: String,
    pub year: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// An album page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlbumRecord {
    pub title: String,
    /// Band names as printed on the album page.
    pub groups: Vec<String>,
    #[serde(rename = "type")]
    pub kind: String,
    /// `YYYY-MM-DD`, or empty when the page date cannot be read.
    pub release_date: String,
    pub tracks: Vec<Track>,
    /// Page the album was read from.
    pub url: String,
}

impl AlbumRecord {
    pub fn validate(&self) -> Result<(), Error> {
        if self.title.trim().is_empty() {
            return Err(Error::ExtractFailed(format!("album page {} has no title", self.url)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub number: u32,
    pub title: String,
    pub disc_number: u32,
    /// `HH:MM:SS`.
    pub duration: String,
    pub lyrics: String,
}

pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("invalid selector")
}

/// Whitespace-collapsed text of an element, `None` when blank.
pub(crate) fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<Vec<_>>().join(" ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() { None } else { Some(collapsed) }
}

/// Text of the first element matching `sel`.
pub(crate) fn first_text(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel).next().and_then(element_text)
}

/// Leading decimal digits of `s`, like a lenient integer parse.
pub(crate) fn leading_int(s: &str) -> Option<i64> {
    let trimmed = s.trim_start();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(name: &str, genre: &str) -> BandRecord {
        BandRecord {
            name: name.into(),
            country: NOT_FOUND.into(),
            city: NOT_FOUND.into(),
            genre: genre.into(),
            status: NOT_FOUND.into(),
            formed_year: None,
            years_active: NOT_FOUND.into(),
            themes: Vec::new(),
            label: NOT_FOUND.into(),
            albums: vec![
                AlbumSummary { name: "A".into(), url: "https://example.com/albums/x/A/1".into(), year: "1999".into(), kind: "Full-length".into() },
                AlbumSummary { name: UNKNOWN.into(), url: String::new(), year: UNKNOWN.into(), kind: UNKNOWN.into() },
            ],
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_band_validation() {
        assert!(band("Opeth", NOT_FOUND).validate().is_ok());
        assert!(matches!(band(NOT_FOUND, NOT_FOUND).validate(), Err(Error::ExtractFailed(_))));
        assert!(band("  ", NOT_FOUND).validate().is_err());
    }

    #[test]
    fn test_genre_names() {
        assert_eq!(band("x", "Melodic Death/Doom").genre_names(), vec!["Melodic Death", "Doom"]);
        assert!(band("x", NOT_FOUND).genre_names().is_empty());
    }

    #[test]
    fn test_album_urls_skip_blank() {
        assert_eq!(band("x", "Doom").album_urls(), vec!["https://example.com/albums/x/A/1"]);
    }

    #[test]
    fn test_album_validation() {
        let album = AlbumRecord {
            title: String::new(),
            groups: vec![],
            kind: String::new(),
            release_date: String::new(),
            tracks: vec![],
            url: "https://example.com/albums/x".into(),
        };
        assert!(matches!(album.validate(), Err(Error::ExtractFailed(msg)) if msg.contains("example.com")));
    }

    #[test]
    fn test_record_wire_names() {
        let json = serde_json::to_value(band("x", "Doom")).unwrap();
        assert!(json.get("formedYear").is_some());
        assert!(json.get("yearsActive").is_some());
        assert_eq!(json["albums"][0]["type"], "Full-length");
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("12."), Some(12));
        assert_eq!(leading_int(" 1994 (as Foo)"), Some(1994));
        assert_eq!(leading_int("N/A"), None);
    }
}
