use url::Url;

/// Extracts the lowercase host from a URL
///
/// Returns None if the URL has no host, which cannot happen for URLs that
/// passed normalization.
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether a URL's host exactly equals the given scope host
///
/// Exact equality only: subdomains of the scope host do not match. This is
/// the same-domain filter applied by the frontier when `--same-domain-only`
/// is set.
pub fn same_host(url: &Url, scope: &str) -> bool {
    match extract_host(url) {
        Some(host) => host == scope,
        None => false,
    }
}
