//! Dispatch context and callable binding.
//!
//! A [`Data`] map is created per request (and per raised error), seeded from the
//! application's workflow data, and enriched by filters, middleware and
//! resolved parameters. Callables never see it whole unless they ask to: each
//! one is registered with a [`Manifest`] naming the keys it reads, and receives
//! an [`Args`] view restricted to those keys.

use std::fmt;

use anyhow::{anyhow, Context as _};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::app::App;
use crate::ids::RequestId;
use crate::request::{ParamVec, Request, UploadFile};
use crate::route::Route;
use crate::router::RouterId;

/// Declared parameter names of a filter, handler or error handler.
///
/// Computed once at registration time and stored next to the callable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    params: Vec<String>,
    open: bool,
}

impl Manifest {
    /// A callable that reads exactly these keys.
    pub fn of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut params: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !params.contains(&name) {
                params.push(name);
            }
        }
        Self {
            params,
            open: false,
        }
    }

    /// A callable that accepts the full, open-ended map.
    #[must_use]
    pub fn open() -> Self {
        Self {
            params: Vec::new(),
            open: true,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    #[inline]
    #[must_use]
    pub fn accepts(&self, key: &str) -> bool {
        self.open || self.params.iter().any(|p| p == key)
    }

    /// Add names, keeping declaration order and skipping duplicates.
    #[must_use]
    pub fn with<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.params.contains(&name) {
                self.params.push(name);
            }
        }
        self
    }

    /// The subset of `values` this callable is allowed to see.
    ///
    /// Declared keys come out in declaration order; an open manifest gets
    /// everything in context order.
    #[must_use]
    pub fn bind(&self, values: &Map<String, Value>) -> Map<String, Value> {
        if self.open {
            return values.clone();
        }
        self.params
            .iter()
            .filter_map(|p| values.get(p).map(|v| (p.clone(), v.clone())))
            .collect()
    }
}

/// Per-dispatch context threaded through filters, middleware and the handler.
pub struct Data<'a> {
    values: Map<String, Value>,
    app: &'a App,
    request: &'a Request,
    router: RouterId,
    route: Option<&'a Route>,
    error: Option<&'a anyhow::Error>,
    path_params: ParamVec,
}

impl fmt::Debug for Data<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("request_id", &self.request.request_id)
            .field("router", &self.router)
            .field("route", &self.route.map(Route::name))
            .field("error", &self.error.map(ToString::to_string))
            .field("values", &self.values)
            .finish()
    }
}

impl<'a> Data<'a> {
    pub(crate) fn new(app: &'a App, request: &'a Request, router: RouterId) -> Self {
        Self {
            values: app.workflow().clone(),
            app,
            request,
            router,
            route: None,
            error: None,
            path_params: ParamVec::new(),
        }
    }

    /// A fresh context for the error path, carrying the same user values.
    pub(crate) fn for_error<'e>(&self, error: &'e anyhow::Error) -> Data<'e>
    where
        'a: 'e,
    {
        Data {
            values: self.values.clone(),
            app: self.app,
            request: self.request,
            router: self.router,
            route: self.route,
            error: Some(error),
            path_params: self.path_params.clone(),
        }
    }

    pub(crate) fn set_route(&mut self, route: &'a Route, path_params: ParamVec) {
        self.route = Some(route);
        self.path_params = path_params;
    }

    pub(crate) fn set_router(&mut self, router: RouterId) {
        self.router = router;
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Deserialize a value out of the context.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<T> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| anyhow!("missing context value '{}'", key))?;
        serde_json::from_value(value.clone())
            .with_context(|| format!("context value '{}' has an unexpected shape", key))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.shift_remove(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Merge a mapping into the context, later keys overwriting earlier ones.
    pub fn extend(&mut self, values: Map<String, Value>) {
        for (k, v) in values {
            self.values.insert(k, v);
        }
    }

    #[must_use]
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    #[must_use]
    pub fn app(&self) -> &'a App {
        self.app
    }

    #[must_use]
    pub fn request(&self) -> &'a Request {
        self.request
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request.request_id
    }

    /// Router whose candidate is being dispatched.
    #[must_use]
    pub fn router(&self) -> RouterId {
        self.router
    }

    /// Route being dispatched (also set on the error path when a route raised).
    #[must_use]
    pub fn route(&self) -> Option<&'a Route> {
        self.route
    }

    /// The error being dispatched, on the error path only.
    #[must_use]
    pub fn error(&self) -> Option<&'a anyhow::Error> {
        self.error
    }

    /// Path parameters of the matched route.
    #[must_use]
    pub fn path_params(&self) -> &ParamVec {
        &self.path_params
    }
}

/// A callable's view of the dispatch context, restricted to its [`Manifest`].
pub struct Args<'d, 'a> {
    data: &'d mut Data<'a>,
    manifest: &'d Manifest,
}

impl<'d, 'a> Args<'d, 'a> {
    pub(crate) fn new(data: &'d mut Data<'a>, manifest: &'d Manifest) -> Self {
        Self { data, manifest }
    }

    /// Raw value of a declared key.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        if self.manifest.accepts(name) {
            self.data.get(name)
        } else {
            None
        }
    }

    /// Deserialize a declared key; missing keys are an error.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self
            .value(name)
            .ok_or_else(|| anyhow!("parameter '{}' is not available", name))?;
        serde_json::from_value(value.clone())
            .with_context(|| format!("parameter '{}' has an unexpected shape", name))
    }

    /// Deserialize a declared key if present.
    pub fn opt<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<Option<T>> {
        match self.value(name) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => serde_json::from_value(v.clone())
                .map(Some)
                .with_context(|| format!("parameter '{}' has an unexpected shape", name)),
        }
    }

    /// Raw bytes of a form-file parameter.
    pub fn bytes(&self, name: &str) -> anyhow::Result<Vec<u8>> {
        let encoded: String = self.get(name)?;
        base64_bytes::decode(&encoded)
            .with_context(|| format!("parameter '{}' is not a file payload", name))
    }

    /// A positional uploaded file.
    pub fn upload(&self, name: &str) -> anyhow::Result<UploadFile> {
        self.get(name)
    }

    /// The catch-all list of uploaded files (empty when none were sent).
    pub fn uploads(&self, name: &str) -> anyhow::Result<Vec<UploadFile>> {
        Ok(self.opt(name)?.unwrap_or_default())
    }

    /// The declared keys as a detached map.
    #[must_use]
    pub fn bound(&self) -> Map<String, Value> {
        self.manifest.bind(self.data.values())
    }

    /// Write a value back into the dispatch context.
    ///
    /// Visible to every middleware that runs after this callable returns.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(key, value)
    }

    #[must_use]
    pub fn app(&self) -> &'a App {
        self.data.app()
    }

    #[must_use]
    pub fn request(&self) -> &'a Request {
        self.data.request()
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.data.request_id()
    }

    #[must_use]
    pub fn route(&self) -> Option<&'a Route> {
        self.data.route()
    }

    #[must_use]
    pub fn error(&self) -> Option<&'a anyhow::Error> {
        self.data.error()
    }

    /// The error being dispatched, if it is an `E`.
    #[must_use]
    pub fn error_as<E>(&self) -> Option<&'a E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.data.error().and_then(|e| e.downcast_ref::<E>())
    }
}

/// Serde adapter carrying raw bytes through the JSON context as base64 text.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[must_use]
    pub fn encode(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    pub fn decode(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(text)
    }

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        decode(&text).map_err(serde::de::Error::custom)
    }
}
