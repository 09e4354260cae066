//! Terminal callables: route handlers and error handlers.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::context::{Args, Data, Manifest};
use crate::response::{Reply, Response};

/// Conversion of a handler's return value into a [`Reply`].
pub trait IntoReply {
    fn into_reply(self) -> anyhow::Result<Reply>;
}

impl IntoReply for Reply {
    fn into_reply(self) -> anyhow::Result<Reply> {
        Ok(self)
    }
}

impl IntoReply for Response {
    fn into_reply(self) -> anyhow::Result<Reply> {
        Ok(Reply::Response(self))
    }
}

impl IntoReply for Value {
    fn into_reply(self) -> anyhow::Result<Reply> {
        Ok(Reply::Value(self))
    }
}

impl IntoReply for Map<String, Value> {
    fn into_reply(self) -> anyhow::Result<Reply> {
        Ok(Reply::Value(Value::Object(self)))
    }
}

impl IntoReply for String {
    fn into_reply(self) -> anyhow::Result<Reply> {
        Ok(self.into())
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> anyhow::Result<Reply> {
        Ok(self.into())
    }
}

impl IntoReply for () {
    fn into_reply(self) -> anyhow::Result<Reply> {
        Ok(Reply::Value(Value::Null))
    }
}

impl<T: IntoReply> IntoReply for anyhow::Result<T> {
    fn into_reply(self) -> anyhow::Result<Reply> {
        self?.into_reply()
    }
}

type HandlerFn = dyn Fn(&mut Args<'_, '_>) -> anyhow::Result<Reply> + Send + Sync;

/// A callable plus the manifest of context keys it reads.
#[derive(Clone)]
pub struct Handler {
    callback: Arc<HandlerFn>,
    manifest: Manifest,
    label: Cow<'static, str>,
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("label", &self.label)
            .field("manifest", &self.manifest)
            .finish()
    }
}

impl Handler {
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&mut Args<'_, '_>) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        Self {
            callback: Arc::new(move |args: &mut Args<'_, '_>| f(args).into_reply()),
            manifest: Manifest::default(),
            label: Cow::Borrowed(std::any::type_name::<F>()),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub(crate) fn set_manifest(&mut self, manifest: Manifest) {
        self.manifest = manifest;
    }

    pub(crate) fn call(&self, data: &mut Data<'_>) -> anyhow::Result<Reply> {
        let mut args = Args::new(data, &self.manifest);
        (self.callback)(&mut args)
    }
}

/// Short name of a callable type, used as the default route name.
///
/// Function items yield their own name; closures have no usable name and
/// yield `None`.
pub(crate) fn callable_name(label: &str) -> Option<&str> {
    if label.contains("{{closure}}") {
        return None;
    }
    let base = label.split('<').next().unwrap_or(label);
    base.rsplit("::").next().filter(|s| !s.is_empty())
}
