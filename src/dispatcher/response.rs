use std::sync::Arc;

use http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};

use crate::context::HeaderVec;

/// Content type of every response
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Response for the HTTP host to write out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 401, 404, ...)
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    /// JSON body; `null` means an empty body
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response with the content type set.
    #[must_use]
    pub fn json(status: StatusCode, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), JSON_CONTENT_TYPE.to_string()));
        Self {
            status: status.as_u16(),
            headers,
            body,
        }
    }

    /// `{"error": message}`
    #[must_use]
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::json(status, json!({ "error": message }))
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Adds or replaces a header.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Serialized body; empty for `null`.
    #[must_use]
    pub fn body_bytes(&self) -> Vec<u8> {
        if self.body.is_null() {
            Vec::new()
        } else {
            self.body.to_string().into_bytes()
        }
    }
}
