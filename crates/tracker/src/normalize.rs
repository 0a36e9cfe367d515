//! URL normalization.
//!
//! The normalized form of a URL is `origin + path`: query and fragment are
//! dropped, relative input is resolved against the page origin. It is the
//! dedup key of the history store.

use url::Url;

/// The page origin as a base URL for resolving relative input.
///
/// Opaque origins (`data:`, `about:` …) cannot act as a base, so the location
/// itself is used instead.
pub fn origin_base(location: &Url) -> Url {
    let origin = location.origin();
    if origin.is_tuple() {
        if let Ok(base) = Url::parse(&origin.ascii_serialization()) {
            return base;
        }
    }
    location.clone()
}

/// Resolve `raw` against `base`; absolute input ignores the base.
pub fn resolve_url(raw: &str, base: &Url) -> Option<Url> {
    base.join(raw).ok()
}

/// Map `raw` to its comparison key. Unparseable input comes back unchanged.
pub fn normalize_url(raw: &str, origin: &Url) -> String {
    match origin.join(raw) {
        Ok(url) => format!("{}{}", url.origin().ascii_serialization(), url.path()),
        Err(err) => {
            log::warn!(target: "linktrail::normalize", "failed to normalize {raw:?}: {err}");
            raw.to_string()
        }
    }
}
