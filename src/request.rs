//! The request facet consumed from the transport adapter.
//!
//! The adapter parses the raw connection (environment, headers, body stream,
//! multipart forms) and hands the dispatch core a normalized [`Request`]. The
//! core only ever reads from it.

use std::sync::Arc;

use anyhow::Context;
use http::Method;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;

use crate::ids::RequestId;

/// Maximum number of path/query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Maximum inline headers/cookies before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated parameter storage.
///
/// Names are `Arc<str>` because they are repeated across requests; values are
/// per-request data.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Stack-allocated header/cookie storage.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// A plain form field from a parsed form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

/// A file part from a parsed multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFile {
    pub field_name: Option<String>,
    pub filename: Option<String>,
    pub content: Vec<u8>,
}

/// Form body already parsed by the adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pub fields: Vec<FormField>,
    pub files: Vec<FormFile>,
}

/// An uploaded file bound to a handler parameter.
///
/// Carried through the dispatch context as JSON; `content` is base64 encoded
/// on the wire and decoded back into bytes here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFile {
    pub filename: Option<String>,
    pub size: usize,
    #[serde(with = "crate::context::base64_bytes")]
    pub content: Vec<u8>,
}

impl From<&FormFile> for UploadFile {
    fn from(file: &FormFile) -> Self {
        UploadFile {
            filename: file.filename.clone(),
            size: file.content.len(),
            content: file.content.clone(),
        }
    }
}

/// Normalized request handed over by the transport adapter.
#[derive(Debug, Clone)]
pub struct Request {
    pub request_id: RequestId,
    pub method: Method,
    /// Request path, normalized to end with `/`
    pub path: String,
    /// Path parameters already extracted by the adapter (may be empty)
    pub path_params: ParamVec,
    /// Query parameters in arrival order; repeated keys are kept
    pub query_params: ParamVec,
    pub headers: HeaderVec,
    pub cookies: HeaderVec,
    pub body: Vec<u8>,
    pub form: Option<FormData>,
    json: OnceCell<Value>,
}

impl Request {
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            path: ensure_trailing_slash(path),
            path_params: ParamVec::new(),
            query_params: ParamVec::new(),
            headers: HeaderVec::new(),
            cookies: HeaderVec::new(),
            body: Vec::new(),
            form: None,
            json: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn with_path_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.path_params.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn with_query_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query_params.push((Arc::from(name), value.into()));
        self
    }

    /// Add a header. A valid `x-request-id` also becomes the request id.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if name.eq_ignore_ascii_case("x-request-id") {
            self.request_id = RequestId::from_header_or_new(Some(&value));
        }
        self.headers.push((Arc::from(name), value));
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, name: &str, value: impl Into<String>) -> Self {
        self.cookies.push((Arc::from(name), value.into()));
        self
    }

    /// Parse a raw `Cookie` header (`a=1; b=2`) into the cookie list.
    #[must_use]
    pub fn with_cookie_header(mut self, raw: &str) -> Self {
        for pair in raw.split(';') {
            if let Some((name, value)) = pair.split_once('=') {
                let value = value.trim().trim_matches('"');
                self.cookies.push((Arc::from(name.trim()), value.to_string()));
            }
        }
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self.json = OnceCell::new();
        self
    }

    #[must_use]
    pub fn with_json(self, value: &Value) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        self.with_header("content-type", "application/json")
            .with_body(body)
    }

    #[must_use]
    pub fn with_form(mut self, form: FormData) -> Self {
        self.form = Some(form);
        self
    }

    /// Get a path parameter by name (last write wins).
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name (last write wins).
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Body decoded as JSON. Decoded once and cached.
    ///
    /// An empty body decodes as an empty object.
    pub fn json(&self) -> anyhow::Result<&Value> {
        self.json.get_or_try_init(|| {
            if self.body.is_empty() {
                return Ok(Value::Object(Map::new()));
            }
            serde_json::from_slice(&self.body).context("request body is not valid JSON")
        })
    }

    /// Query parameters as a map; repeated keys collapse into an array.
    #[must_use]
    pub fn query_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for (k, v) in &self.query_params {
            let value = Value::String(v.clone());
            match map.get_mut(k.as_ref()) {
                None => {
                    map.insert(k.to_string(), value);
                }
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            }
        }
        map
    }
}

/// Append the trailing slash the router expects on every path.
#[must_use]
pub fn ensure_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn propagated_request_id_is_kept() {
        let id = RequestId::new();
        let request = Request::new(Method::GET, "/").with_header("X-Request-Id", id.to_string());
        assert_eq!(request.request_id, id);
    }

    #[test]
    fn path_is_normalized() {
        assert_eq!(Request::new(Method::GET, "/items").path, "/items/");
        assert_eq!(Request::new(Method::GET, "/").path, "/");
    }

    #[test]
    fn repeated_query_keys_become_arrays() {
        let req = Request::new(Method::GET, "/")
            .with_query_param("name", "a")
            .with_query_param("name", "b")
            .with_query_param("age", "3");
        let map = req.query_map();
        assert_eq!(map["name"], json!(["a", "b"]));
        assert_eq!(map["age"], json!("3"));
    }

    #[test]
    fn cookie_header_is_split() {
        let req = Request::new(Method::GET, "/").with_cookie_header("age=20; name=\"John\"");
        assert_eq!(req.get_cookie("age"), Some("20"));
        assert_eq!(req.get_cookie("name"), Some("John"));
    }

    #[test]
    fn invalid_json_body_is_an_error() {
        let req = Request::new(Method::POST, "/").with_body("{not json");
        assert!(req.json().is_err());
    }
}
