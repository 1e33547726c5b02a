//! Band page parsing.

use super::{AlbumSummary, BandRecord, NOT_FOUND, UNKNOWN, element_text, first_text, leading_int, selector};
use chrono::Utc;
use scraper::{ElementRef, Html};
use url::Url;

const NAME: &str = ".band_name a";
const COUNTRY: &str = "#band_stats > dl.float_left > dd:nth-child(2) > a";
const CITY: &str = "#band_stats > dl.float_left > dd:nth-child(4)";
const STATUS: &str = "#band_stats > dl.float_left > dd:nth-child(6)";
const FORMED: &str = "#band_stats > dl.float_left > dd:nth-child(8)";
const GENRE: &str = "#band_stats > dl.float_right > dd:nth-child(2)";
const THEMES: &str = "#band_stats > dl.float_right > dd:nth-child(4)";
const LABEL: &str = "#band_stats > dl.float_right > dd:nth-child(6)";
const YEARS_ACTIVE: &str = "#band_stats > dl.clear > dd";

/// Discography tables, tried in order until one has rows.
const ALBUM_ROWS: [&str; 4] = [
    "#ui-tabs-3 > table > tbody > tr",
    "#ui-tabs-4 > table > tbody > tr",
    "#ui-tabs-5 > table > tbody > tr",
    "table.discog > tbody > tr",
];

/// Parse a band page. Relative album links are resolved against `base_url`.
pub fn parse_band(html: &str, base_url: &Url) -> BandRecord {
    let doc = Html::parse_document(html);
    let text_or_missing = |css: &str| first_text(&doc, &selector(css)).unwrap_or_else(|| NOT_FOUND.to_string());

    let themes = first_text(&doc, &selector(THEMES))
        .map(|t| t.split(", ").map(str::to_string).collect())
        .unwrap_or_default();

    let record = BandRecord {
        name: text_or_missing(NAME),
        country: text_or_missing(COUNTRY),
        city: text_or_missing(CITY),
        genre: text_or_missing(GENRE),
        status: first_text(&doc, &selector(STATUS))
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|| NOT_FOUND.to_string()),
        formed_year: first_text(&doc, &selector(FORMED))
            .and_then(|s| leading_int(&s))
            .and_then(|y| i32::try_from(y).ok()),
        years_active: text_or_missing(YEARS_ACTIVE),
        themes,
        label: text_or_missing(LABEL),
        albums: album_rows(&doc, base_url),
        last_updated: Utc::now(),
    };

    tracing::debug!(band = %record.name, albums = record.albums.len(), "parsed band page");
    record
}

fn album_rows(doc: &Html, base_url: &Url) -> Vec<AlbumSummary> {
    let cell = selector("td");
    let link = selector("a[href]");

    for css in ALBUM_ROWS {
        let rows: Vec<ElementRef<'_>> = doc.select(&selector(css)).collect();
        if rows.is_empty() {
            continue;
        }

        return rows
            .into_iter()
            .filter_map(|row| {
                let cells: Vec<ElementRef<'_>> = row.select(&cell).collect();
                let anchor = cells.first()?.select(&link).next()?;
                let href = anchor.value().attr("href")?;
                let url = match base_url.join(href) {
                    Ok(u) => u.to_string(),
                    Err(e) => {
                        tracing::warn!(href, error = %e, "skipping album row with unusable link");
                        return None;
                    }
                };
                let cell_text = |i: usize| {
                    cells.get(i).and_then(|c| element_text(*c)).unwrap_or_else(|| UNKNOWN.to_string())
                };

                Some(AlbumSummary {
                    name: element_text(anchor).unwrap_or_else(|| UNKNOWN.to_string()),
                    url,
                    year: cell_text(2),
                    kind: cell_text(1),
                })
            })
            .collect();
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BAND_PAGE: &str = r#"
        <html><body>
          <h1 class="band_name"><a href="/bands/Ghostfire/42">Ghostfire</a></h1>
          <div id="band_stats">
            <dl class="float_left">
              <dt>Country of origin:</dt><dd><a href="/lists/FI">Finland</a></dd>
              <dt>Location:</dt><dd>Tampere</dd>
              <dt>Status:</dt><dd>Active</dd>
              <dt>Formed in:</dt><dd>1994</dd>
            </dl>
            <dl class="float_right">
              <dt>Genre:</dt><dd>Melodic Death/Doom</dd>
              <dt>Themes:</dt><dd>Death, Winter, Solitude</dd>
              <dt>Current label:</dt><dd>Frozen Records</dd>
            </dl>
            <dl class="clear">
              <dt>Years active:</dt><dd>1994-2001, 2005-present</dd>
            </dl>
          </div>
          <div id="ui-tabs-3">
            <table><tbody>
              <tr><td><a href="/albums/Ghostfire/Ashen/101">Ashen</a></td><td>Full-length</td><td>1997</td></tr>
              <tr><td><a href="https://www.example.com/albums/Ghostfire/Cinder/102">Cinder</a></td><td>EP</td><td></td></tr>
              <tr><td colspan="3"><em>Nothing entered yet.</em></td></tr>
            </tbody></table>
          </div>
        </body></html>
    "#;

    fn base() -> Url {
        Url::parse("https://www.example.com/bands/Ghostfire/42").unwrap()
    }

    #[test]
    fn test_parse_band_fields() {
        let band = parse_band(BAND_PAGE, &base());
        assert_eq!(band.name, "Ghostfire");
        assert_eq!(band.country, "Finland");
        assert_eq!(band.city, "Tampere");
        assert_eq!(band.status, "active");
        assert_eq!(band.formed_year, Some(1994));
        assert_eq!(band.genre, "Melodic Death/Doom");
        assert_eq!(band.themes, vec!["Death", "Winter", "Solitude"]);
        assert_eq!(band.label, "Frozen Records");
        assert_eq!(band.years_active, "1994-2001, 2005-present");
    }

    #[test]
    fn test_parse_band_albums() {
        let band = parse_band(BAND_PAGE, &base());
        assert_eq!(band.albums.len(), 2);
        assert_eq!(band.albums[0].url, "https://www.example.com/albums/Ghostfire/Ashen/101");
        assert_eq!(band.albums[0].kind, "Full-length");
        assert_eq!(band.albums[0].year, "1997");
        assert_eq!(band.albums[1].name, "Cinder");
        assert_eq!(band.albums[1].year, UNKNOWN);
    }

    #[test]
    fn test_parse_band_later_tab() {
        let html = r#"
            <h1 class="band_name"><a>Late</a></h1>
            <div id="ui-tabs-5"><table><tbody>
              <tr><td><a href="/albums/Late/One/7">One</a></td><td>Demo</td><td>2010</td></tr>
            </tbody></table></div>
        "#;
        let band = parse_band(html, &base());
        assert_eq!(band.albums.len(), 1);
        assert_eq!(band.albums[0].kind, "Demo");
    }

    #[test]
    fn test_parse_band_missing_fields() {
        let band = parse_band("<html><body><p>blocked</p></body></html>", &base());
        assert_eq!(band.name, NOT_FOUND);
        assert_eq!(band.country, NOT_FOUND);
        assert_eq!(band.status, NOT_FOUND);
        assert_eq!(band.formed_year, None);
        assert!(band.themes.is_empty());
        assert!(band.albums.is_empty());
        assert!(band.validate().is_err());
    }

    #[test]
    fn test_formed_year_not_numeric() {
        let html = r#"<div id="band_stats"><dl class="float_left">
            <dt>a</dt><dd>x</dd><dt>b</dt><dd>y</dd><dt>c</dt><dd>z</dd><dt>Formed in:</dt><dd>N/A</dd>
        </dl></div>"#;
        assert_eq!(parse_band(html, &base()).formed_year, None);
    }
}
