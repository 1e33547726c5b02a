//! Album page parsing.

use super::date::{DateFormat, format_date};
use super::{AlbumRecord, Track, element_text, first_text, leading_int, selector};
use scraper::{ElementRef, Html};

const TITLE: &str = "#album_info > h1 > a";
const BAND: &str = "#album_info > h2 > a";
const KIND: &str = "#album_info > dl.float_left > dd:nth-child(2)";
const RELEASE_DATE: &str = "#album_info > dl.float_left > dd:nth-child(4)";
const TRACK_ROWS: &str = "#album_tabs_tracklist > div.ui-tabs-panel-content.block_spacer_top_20 > table > tbody > tr";

/// Placeholder duration for tracks without a listed length.
const NO_DURATION: &str = "00:00:01";

/// Parse an album page fetched from `url`.
///
/// Only track rows with more than three cells are kept; side headers and
/// total-length rows are shorter.
pub fn parse_album(html: &str, url: &str) -> AlbumRecord {
    let doc = Html::parse_document(html);
    let text = |css: &str| first_text(&doc, &selector(css)).unwrap_or_default();

    let cell = selector("td");
    let tracks = doc
        .select(&selector(TRACK_ROWS))
        .filter_map(|row| {
            let cells: Vec<ElementRef<'_>> = row.select(&cell).collect();
            if cells.len() <= 3 {
                return None;
            }
            let number = element_text(cells[0])
                .and_then(|n| leading_int(&n))
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n > 0)
                .unwrap_or(1);
            let duration = element_text(cells[2])
                .map(|d| format!("00:{d}"))
                .unwrap_or_else(|| NO_DURATION.to_string());

            Some(Track {
                number,
                title: element_text(cells[1]).unwrap_or_default(),
                disc_number: 1,
                duration,
                lyrics: String::new(),
            })
        })
        .collect();

    AlbumRecord {
        title: text(TITLE),
        groups: vec![text(BAND)],
        kind: text(KIND).to_lowercase(),
        release_date: format_date(&text(RELEASE_DATE), DateFormat::Iso),
        tracks,
        url: url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALBUM_PAGE: &str = r#"
        <html><body>
          <div id="album_info">
            <h1 class="album_name"><a href="/albums/Ghostfire/Ashen/101">Ashen</a></h1>
            <h2 class="band_name"><a href="/bands/Ghostfire/42">Ghostfire</a></h2>
            <dl class="float_left">
              <dt>Type:</dt><dd>Full-length</dd>
              <dt>Release date:</dt><dd>March 20th, 1997</dd>
            </dl>
          </div>
          <div id="album_tabs_tracklist">
            <div class="ui-tabs-panel-content block_spacer_top_20">
              <table><tbody>
                <tr><td>1.</td><td>Embers</td><td>05:12</td><td><a>Show lyrics</a></td></tr>
                <tr><td>2.</td><td>Grey Dawn</td><td></td><td>instrumental</td></tr>
                <tr><td colspan="2">Side B</td></tr>
                <tr><td></td><td>Hidden</td><td>01:00</td><td></td></tr>
                <tr><td></td><td></td><td><strong>43:10</strong></td></tr>
              </tbody></table>
            </div>
          </div>
        </body></html>
    "#;

    const URL: &str = "https://www.example.com/albums/Ghostfire/Ashen/101";

    #[test]
    fn test_parse_album_header() {
        let album = parse_album(ALBUM_PAGE, URL);
        assert_eq!(album.title, "Ashen");
        assert_eq!(album.groups, vec!["Ghostfire"]);
        assert_eq!(album.kind, "full-length");
        assert_eq!(album.release_date, "1997-03-20");
        assert_eq!(album.url, URL);
        assert!(album.validate().is_ok());
    }

    #[test]
    fn test_parse_album_tracks() {
        let album = parse_album(ALBUM_PAGE, URL);
        assert_eq!(album.tracks.len(), 3);

        assert_eq!(album.tracks[0].number, 1);
        assert_eq!(album.tracks[0].title, "Embers");
        assert_eq!(album.tracks[0].duration, "00:05:12");
        assert_eq!(album.tracks[0].disc_number, 1);
        assert_eq!(album.tracks[0].lyrics, "");

        assert_eq!(album.tracks[1].number, 2);
        assert_eq!(album.tracks[1].duration, NO_DURATION);

        assert_eq!(album.tracks[2].number, 1);
        assert_eq!(album.tracks[2].title, "Hidden");
    }

    #[test]
    fn test_parse_album_empty_page() {
        let album = parse_album("<html></html>", URL);
        assert_eq!(album.title, "");
        assert_eq!(album.groups, vec![String::new()]);
        assert_eq!(album.release_date, "");
        assert!(album.tracks.is_empty());
        assert!(album.validate().is_err());
    }
}
