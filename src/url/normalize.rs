use crate::UrlError;
use url::Url;

/// Query parameters the catalog adds for click tracking
const TRACKING_PARAMS: &[&str] = &[
    "from_search",
    "from_srp",
    "qid",
    "rank",
    "ref",
    "ac",
    "fbclid",
    "gclid",
];

/// Normalizes an item URL so the same item reached through different links
/// compares equal
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not HTTP(S)
/// 2. Lowercase the host (done by the parser)
/// 3. Remove a trailing slash (except for root /)
/// 4. Remove the fragment
/// 5. Remove tracking query parameters and sort the rest
///
/// The scheme and host are otherwise kept as given, so normalized URLs stay
/// fetchable.
///
/// # Examples
///
/// ```
/// use edition_scout::url::normalize_url;
///
/// let url = normalize_url("https://WWW.Example.com/book/show/1/?from_search=true#x").unwrap();
/// assert_eq!(url.as_str(), "https://www.example.com/book/show/1");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        url.set_path(if trimmed.is_empty() { "/" } else { &trimmed });
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        params.sort();

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
