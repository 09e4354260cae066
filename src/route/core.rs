use http::Method;
use serde_json::Value;

use super::params::{Classification, ParamSpec};
use super::path::PathTemplate;
use crate::context::{Args, Manifest};
use crate::error::ConfigError;
use crate::filter::{Filter, FilterChain};
use crate::handler::{callable_name, Handler, IntoReply};
use crate::request::{ParamVec, Request};
use crate::response::ResponseKind;
use crate::router::Router;

/// Methods a route may be registered for.
pub const STANDARD_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::TRACE,
    Method::CONNECT,
];

/// Parse a method token, accepting only the standard HTTP methods.
pub fn parse_method(token: &str) -> Result<Method, ConfigError> {
    STANDARD_METHODS
        .iter()
        .find(|m| m.as_str() == token)
        .cloned()
        .ok_or_else(|| ConfigError::InvalidMethod {
            method: token.to_string(),
        })
}

/// A single method + path + handler binding.
///
/// Immutable once registered. The parameter classification is computed at
/// construction and reused for every request.
#[derive(Debug, Clone)]
pub struct Route {
    name: String,
    named: bool,
    template: PathTemplate,
    path: PathTemplate,
    method: Method,
    status: u16,
    response_kind: Option<ResponseKind>,
    response_model: Option<Value>,
    filters: FilterChain,
    params: Vec<ParamSpec>,
    classification: Classification,
    handler: Handler,
}

impl Route {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if the name was given explicitly at registration.
    #[must_use]
    pub fn is_named(&self) -> bool {
        self.named
    }

    /// Full path template, router prefix included.
    #[must_use]
    pub fn path(&self) -> &PathTemplate {
        &self.path
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn response_kind(&self) -> Option<ResponseKind> {
        self.response_kind
    }

    #[must_use]
    pub fn response_model(&self) -> Option<&Value> {
        self.response_model.as_ref()
    }

    #[must_use]
    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    #[must_use]
    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    #[must_use]
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Match method and path.
    ///
    /// When the adapter already extracted path parameters, the template is
    /// rendered with them and compared against the request path. Otherwise
    /// the path is matched segment-wise.
    #[must_use]
    pub fn matches(&self, request: &Request) -> Option<ParamVec> {
        if self.method != request.method {
            return None;
        }
        if request.path_params.is_empty() {
            return self.path.matches(&request.path);
        }
        let rendered = self
            .path
            .render(|name| request.get_path_param(name).map(str::to_string))?;
        (rendered == request.path).then(|| request.path_params.clone())
    }

    /// Render this route's path if `name` and the parameter names line up.
    #[must_use]
    pub fn url_path_for(&self, name: &str, params: &[(&str, &str)]) -> Option<String> {
        if self.name != name || params.len() != self.path.params().len() {
            return None;
        }
        self.path.render(|key| {
            params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        })
    }

    /// Same route under another router prefix.
    pub(crate) fn rebase(&self, prefix: &str) -> Result<Route, ConfigError> {
        let mut route = self.clone();
        route.path = self.template.with_prefix(prefix)?;
        Ok(route)
    }
}

/// Registration of one route on a router.
///
/// Nothing is added until [`RouteBuilder::register`] is called.
#[must_use = "routes are only added by calling `register`"]
pub struct RouteBuilder<'r> {
    router: &'r mut Router,
    method: String,
    path: String,
    handler: Handler,
    name: Option<String>,
    status: u16,
    response_kind: Option<ResponseKind>,
    response_model: Option<Value>,
    filters: Vec<Filter>,
    params: Vec<ParamSpec>,
    reads: Vec<String>,
    open: bool,
}

impl<'r> RouteBuilder<'r> {
    pub(crate) fn new<F, R>(router: &'r mut Router, method: &str, path: &str, f: F) -> Self
    where
        F: Fn(&mut Args<'_, '_>) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        Self {
            router,
            method: method.to_string(),
            path: path.to_string(),
            handler: Handler::new(f),
            name: None,
            status: 200,
            response_kind: None,
            response_model: None,
            filters: Vec::new(),
            params: Vec::new(),
            reads: Vec::new(),
            open: false,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn response_kind(mut self, kind: ResponseKind) -> Self {
        self.response_kind = Some(kind);
        self
    }

    /// JSON schema the handler's plain return value must satisfy.
    pub fn response_model(mut self, schema: Value) -> Self {
        self.response_model = Some(schema);
        self
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Context keys (set by filters, middleware or workflow data) the handler reads.
    pub fn reads<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reads.extend(names.into_iter().map(Into::into));
        self
    }

    /// Hand the whole context to the handler.
    pub fn open(mut self) -> Self {
        self.open = true;
        self
    }

    /// Validate and add the route to its router.
    pub fn register(self) -> Result<&'r Route, ConfigError> {
        let RouteBuilder {
            router,
            method,
            path,
            mut handler,
            name,
            status,
            response_kind,
            response_model,
            filters,
            params,
            reads,
            open,
        } = self;

        let method = parse_method(&method)?;
        let template = PathTemplate::parse(&path)?;
        let full = template.with_prefix(router.prefix())?;
        if http::StatusCode::from_u16(status).is_err() {
            return Err(ConfigError::InvalidStatusCode { status });
        }
        let classification = Classification::of(full.as_str(), &params, full.params())?;

        let manifest = if open {
            Manifest::open()
        } else {
            Manifest::of(params.iter().map(|p| p.name().to_string())).with(reads)
        };
        handler.set_manifest(manifest);

        let named = name.is_some();
        let name = name
            .or_else(|| callable_name(handler.label()).map(str::to_string))
            .unwrap_or_else(|| format!("{} {}", method, full.as_str()));

        router.push_route(Route {
            name,
            named,
            template,
            path: full,
            method,
            status,
            response_kind,
            response_model,
            filters: FilterChain::new(filters),
            params,
            classification,
            handler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_standard_methods_parse() {
        assert_eq!(parse_method("GET").ok(), Some(Method::GET));
        assert_eq!(parse_method("CONNECT").ok(), Some(Method::CONNECT));
        assert!(matches!(
            parse_method("PURGE"),
            Err(ConfigError::InvalidMethod { .. })
        ));
        assert!(parse_method("get").is_err());
    }
}
