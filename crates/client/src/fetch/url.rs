//! Page URL canonicalization.
//!
//! Identities are derived from the canonical form so that the same page
//! reached through a slightly different spelling hits the same cache entry.

use bandrelay_core::Error;
use url::Url;

/// Canonicalize a page URL.
///
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host (done by the parser for http(s))
/// 4. Remove the fragment
/// 5. Keep the query string intact
pub fn canonicalize(input: &str) -> Result<Url, Error> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("empty URL".into()));
    }

    let with_scheme = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };
    let mut parsed = Url::parse(&with_scheme).map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(format!("unsupported scheme: {}", parsed.scheme())));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(Error::InvalidUrl(format!("{trimmed}: missing host")));
    }

    parsed.set_fragment(None);
    Ok(parsed)
}

/// Canonicalize every URL in `inputs`, failing on the first invalid one.
pub fn canonicalize_all<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<String>, Error> {
    inputs
        .iter()
        .map(|s| canonicalize(s.as_ref()).map(String::from))
        .collect()
}
