//! Ambient per-request data available to service methods.
//!
//! A method parameter of type [`RequestContext`] is never read from the body:
//! the resolver fills it with a clone of the dispatcher's context.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::ids::RequestId;

/// Maximum inline headers/cookies before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Maximum inline query parameters before heap allocation
pub const MAX_INLINE_PARAMS: usize = 8;

/// Header and cookie storage. Names are shared, values are per request.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Query parameter storage.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// What the dispatcher knows about the request being served.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    /// Correlation id for log lines
    pub request_id: RequestId,
    /// Normalised request path, query string included
    pub path: String,
    /// Peer address as reported by the host
    pub remote_addr: Option<String>,
    /// Request headers; names are lowercased
    pub headers: HeaderVec,
    /// Cookies parsed from the `cookie` header
    pub cookies: HeaderVec,
    /// Query string parameters, decoded
    pub query: ParamVec,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("/")
    }
}

impl RequestContext {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let query = parse_query(&path);
        Self {
            request_id: RequestId::new(),
            path,
            remote_addr: None,
            headers: HeaderVec::new(),
            cookies: HeaderVec::new(),
            query,
        }
    }

    /// Adds a header. The name is lowercased; a `cookie` header also
    /// populates [`RequestContext::cookies`].
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        let name = name.to_ascii_lowercase();
        if name == "cookie" {
            self.cookies.extend(parse_cookies(&value));
        }
        self.headers.push((Arc::from(name), value));
        self
    }

    #[must_use]
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Header value by name (case-insensitive).
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Cookie value by name.
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Query parameter by name; the last occurrence wins.
    #[must_use]
    pub fn get_query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Splits a `cookie` header into name/value pairs.
pub fn parse_cookies(header: &str) -> HeaderVec {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim().to_string();
            Some((Arc::from(name), value))
        })
        .collect()
}

/// Decodes the query string following `?` in `path`.
pub fn parse_query(path: &str) -> ParamVec {
    match path.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
            .collect(),
        None => ParamVec::new(),
    }
}
