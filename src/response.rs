//! Response types handed back to the transport adapter.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::HeaderVec;

/// Declared response class used to wrap a handler's plain return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    #[default]
    Json,
    PlainText,
    Html,
}

impl ResponseKind {
    /// Media type written into the `Content-Type` header.
    #[must_use]
    pub fn media_type(self) -> &'static str {
        match self {
            ResponseKind::Json => "application/json",
            ResponseKind::PlainText => "text/plain",
            ResponseKind::Html => "text/html",
        }
    }

    /// Build a response of this kind around an already-serialized value.
    ///
    /// JSON renders the value as a JSON document. Text kinds render strings
    /// verbatim and anything else through its JSON representation.
    #[must_use]
    pub fn render(self, status: u16, value: &Value) -> Response {
        let body = match (self, value) {
            (ResponseKind::Json, v) => serde_json::to_vec(v).unwrap_or_default(),
            (_, Value::String(s)) => s.clone().into_bytes(),
            (_, Value::Null) => Vec::new(),
            (_, v) => v.to_string().into_bytes(),
        };
        Response::new(status, self.media_type(), body)
    }
}

/// Lazily produced body chunks for streamed content.
pub type ChunkIter = Box<dyn Iterator<Item = Vec<u8>> + Send>;

/// Response body: fully rendered bytes or a lazy chunk iterator.
pub enum Body {
    Bytes(Vec<u8>),
    Stream(ChunkIter),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Body::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Response produced by a handler or synthesized by the framework.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderVec,
    pub media_type: Option<String>,
    pub charset: String,
    pub body: Body,
}

impl Response {
    #[must_use]
    pub fn new(status: u16, media_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            media_type: Some(media_type.to_string()),
            charset: "utf-8".to_string(),
            body: Body::Bytes(body.into()),
        }
    }

    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(200, "text/plain", content.into())
    }

    #[must_use]
    pub fn html(content: impl Into<String>) -> Self {
        Self::new(200, "text/html", content.into())
    }

    #[must_use]
    pub fn json(body: &Value) -> Self {
        ResponseKind::Json.render(200, body)
    }

    /// Empty response with no media type (e.g. 204, 304).
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            media_type: None,
            charset: "utf-8".to_string(),
            body: Body::Bytes(Vec::new()),
        }
    }

    /// 307 redirect to `location`.
    #[must_use]
    pub fn redirect(location: &str) -> Self {
        let mut response = Self::empty(307);
        response.set_header("location", location.to_string());
        response
    }

    /// Streamed response whose body is produced chunk by chunk by the adapter.
    #[must_use]
    pub fn stream<I>(chunks: I, media_type: &str) -> Self
    where
        I: Iterator<Item = Vec<u8>> + Send + 'static,
    {
        Self {
            status: 200,
            headers: HeaderVec::new(),
            media_type: Some(media_type.to_string()),
            charset: "utf-8".to_string(),
            body: Body::Stream(Box::new(chunks)),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// `Content-Type` value including the charset, if a media type is set.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.media_type
            .as_ref()
            .map(|m| format!("{}; charset={}", m, self.charset))
    }

    /// Rendered body bytes, `None` for streamed bodies.
    #[must_use]
    pub fn body_bytes(&self) -> Option<&[u8]> {
        match &self.body {
            Body::Bytes(b) => Some(b),
            Body::Stream(_) => None,
        }
    }

    /// Body as UTF-8 text, `None` for streamed or non-UTF-8 bodies.
    #[must_use]
    pub fn body_text(&self) -> Option<&str> {
        self.body_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header (case-insensitive).
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Append a header without replacing existing values (e.g. `set-cookie`).
    pub fn append_header(&mut self, name: &str, value: String) {
        self.headers.push((Arc::from(name), value));
    }

    pub fn set_cookie(&mut self, name: &str, value: &str, http_only: bool) {
        let mut cookie = format!("{}={}; Path=/", name, value);
        if http_only {
            cookie.push_str("; HttpOnly");
        }
        self.append_header("set-cookie", cookie);
    }

    pub fn delete_cookie(&mut self, name: &str) {
        self.append_header(
            "set-cookie",
            format!("{}=\"\"; Max-Age=0; Path=/", name),
        );
    }
}

/// What the dispatch engine hands back to the adapter.
///
/// `Unhandled` is distinct from every response, including empty ones; the
/// adapter translates it into a 404 (see [`crate::App::not_found`]).
#[derive(Debug)]
pub enum Outcome {
    Response(Response),
    Unhandled,
}

impl Outcome {
    #[must_use]
    pub fn is_unhandled(&self) -> bool {
        matches!(self, Outcome::Unhandled)
    }

    #[must_use]
    pub fn into_response(self) -> Option<Response> {
        match self {
            Outcome::Response(r) => Some(r),
            Outcome::Unhandled => None,
        }
    }
}

/// A handler's return value before serialization.
#[derive(Debug)]
pub enum Reply {
    /// A fully built response, passed through untouched
    Response(Response),
    /// A plain value, validated against the declared shape and wrapped in the
    /// route's response kind
    Value(Value),
    /// Abort this candidate only; dispatch moves on to the next one
    Skip,
}

impl From<Response> for Reply {
    fn from(r: Response) -> Self {
        Reply::Response(r)
    }
}

impl From<Value> for Reply {
    fn from(v: Value) -> Self {
        Reply::Value(v)
    }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Reply::Value(Value::String(s.to_string()))
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Reply::Value(Value::String(s))
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Value(Value::Null)
    }
}
