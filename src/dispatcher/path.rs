/// Normalises a raw request URL for route matching.
///
/// Strips the mount prefix `endpoint`, collapses duplicate slashes, ensures a
/// leading slash and drops a trailing slash (except for the root). The query
/// string is kept untouched.
///
/// ```rust
/// use jsonrest::dispatcher::normalize_path;
///
/// assert_eq!(normalize_path("/api//users/?x=1", "/api"), "/users?x=1");
/// assert_eq!(normalize_path("", ""), "/");
/// ```
#[must_use]
pub fn normalize_path(raw_url: &str, endpoint: &str) -> String {
    let (path, query) = match raw_url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (raw_url, None),
    };

    let path = strip_endpoint(path, endpoint);

    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    if let Some(query) = query {
        normalized.push('?');
        normalized.push_str(query);
    }
    normalized
}

/// Removes `endpoint` from the front of `path` when it ends on a segment boundary.
fn strip_endpoint<'a>(path: &'a str, endpoint: &str) -> &'a str {
    let endpoint = endpoint.trim_matches('/');
    if endpoint.is_empty() {
        return path;
    }
    let trimmed = path.trim_start_matches('/');
    match trimmed.get(..endpoint.len()) {
        Some(head) if head.eq_ignore_ascii_case(endpoint) => {
            let rest = &trimmed[endpoint.len()..];
            if rest.is_empty() || rest.starts_with('/') {
                rest
            } else {
                path
            }
        }
        _ => path,
    }
}
