use std::fmt;

use tracing::debug;

use crate::context::{Args, Manifest};
use crate::error::ConfigError;
use crate::filter::{Filter, FilterChain};
use crate::handler::{Handler, IntoReply};
use crate::middleware::Middleware;
use crate::response::{Outcome, Reply, ResponseKind};
use crate::route::{Route, RouteBuilder};

/// Root filters and middleware stacks of one dispatch path.
///
/// Every router owns two: one for requests and one for errors.
#[derive(Debug, Clone, Default)]
pub struct Layers {
    filters: FilterChain,
    outer: Vec<Middleware<Outcome>>,
    inner: Vec<Middleware<Reply>>,
}

impl Layers {
    /// Root filters gating every candidate of this router and its descendants.
    #[must_use]
    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    #[must_use]
    pub fn outer(&self) -> &[Middleware<Outcome>] {
        &self.outer
    }

    #[must_use]
    pub fn inner(&self) -> &[Middleware<Reply>] {
        &self.inner
    }

    fn remove_outer(&mut self, middleware: &Middleware<Outcome>) -> bool {
        let before = self.outer.len();
        self.outer.retain(|m| !m.same_as(middleware));
        before != self.outer.len()
    }

    fn remove_inner(&mut self, middleware: &Middleware<Reply>) -> bool {
        let before = self.inner.len();
        self.inner.retain(|m| !m.same_as(middleware));
        before != self.inner.len()
    }
}

/// A registered error handler and its filters.
#[derive(Debug, Clone)]
pub struct ErrorHandler {
    filters: FilterChain,
    handler: Handler,
}

impl ErrorHandler {
    #[must_use]
    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    #[must_use]
    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

/// Error handlers of one router plus the error path's filters and middleware.
#[derive(Debug, Clone, Default)]
pub struct ErrorTable {
    handlers: Vec<ErrorHandler>,
    layers: Layers,
}

impl ErrorTable {
    /// Start registering an error handler.
    pub fn handler<F, R>(&mut self, f: F) -> ErrorBuilder<'_>
    where
        F: Fn(&mut Args<'_, '_>) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        ErrorBuilder {
            table: self,
            handler: Handler::new(f),
            filters: Vec::new(),
            reads: Vec::new(),
            open: false,
        }
    }

    /// Root filter applied to every error reaching this router's handlers.
    pub fn filter(&mut self, filter: Filter) -> &mut Self {
        self.layers.filters.push(filter);
        self
    }

    pub fn outer_middleware(&mut self, middleware: Middleware<Outcome>) -> &mut Self {
        self.layers.outer.push(middleware);
        self
    }

    pub fn middleware(&mut self, middleware: Middleware<Reply>) -> &mut Self {
        self.layers.inner.push(middleware);
        self
    }

    #[must_use]
    pub fn handlers(&self) -> &[ErrorHandler] {
        &self.handlers
    }

    #[must_use]
    pub fn layers(&self) -> &Layers {
        &self.layers
    }
}

/// Registration of one error handler.
#[must_use = "error handlers are only added by calling `register`"]
pub struct ErrorBuilder<'t> {
    table: &'t mut ErrorTable,
    handler: Handler,
    filters: Vec<Filter>,
    reads: Vec<String>,
    open: bool,
}

impl<'t> ErrorBuilder<'t> {
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn reads<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reads.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn open(mut self) -> Self {
        self.open = true;
        self
    }

    pub fn register(self) -> &'t ErrorHandler {
        let ErrorBuilder {
            table,
            mut handler,
            filters,
            reads,
            open,
        } = self;
        handler.set_manifest(if open {
            Manifest::open()
        } else {
            Manifest::of(reads)
        });
        let index = table.handlers.len();
        table.handlers.push(ErrorHandler {
            filters: FilterChain::new(filters),
            handler,
        });
        &table.handlers[index]
    }
}

pub(crate) fn validate_prefix(prefix: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidPrefix {
        prefix: prefix.to_string(),
        reason: reason.to_string(),
    };
    if !prefix.is_empty() && !prefix.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }
    if prefix.ends_with('/') {
        return Err(invalid("must not end with '/'"));
    }
    Ok(())
}

/// A named node of the composition tree.
///
/// Owns its routes, the request path's root filters and middleware, and the
/// error table. Built detached, then handed to [`crate::App::include`] or
/// [`crate::App::add_router`].
#[derive(Debug, Clone)]
pub struct Router {
    name: String,
    prefix: String,
    default_response_kind: Option<ResponseKind>,
    routes: Vec<Route>,
    layers: Layers,
    errors: ErrorTable,
}

impl Router {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: String::new(),
            default_response_kind: None,
            routes: Vec::new(),
            layers: Layers::default(),
            errors: ErrorTable::default(),
        }
    }

    /// Prefix prepended to the paths of routes registered afterwards.
    pub fn with_prefix(mut self, prefix: &str) -> Result<Self, ConfigError> {
        self.set_prefix(prefix)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_default_response_kind(mut self, kind: ResponseKind) -> Self {
        self.default_response_kind = Some(kind);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn default_response_kind(&self) -> Option<ResponseKind> {
        self.default_response_kind
    }

    pub(crate) fn set_default_response_kind(&mut self, kind: ResponseKind) {
        self.default_response_kind = Some(kind);
    }

    /// Change the prefix and re-base every route already registered.
    pub(crate) fn set_prefix(&mut self, prefix: &str) -> Result<(), ConfigError> {
        validate_prefix(prefix)?;
        let routes = self
            .routes
            .iter()
            .map(|r| r.rebase(prefix))
            .collect::<Result<Vec<_>, _>>()?;
        self.routes = routes;
        self.prefix = prefix.to_string();
        Ok(())
    }

    /// Start registering a route for an arbitrary method token.
    pub fn route<F, R>(&mut self, method: &str, path: &str, f: F) -> RouteBuilder<'_>
    where
        F: Fn(&mut Args<'_, '_>) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        RouteBuilder::new(self, method, path, f)
    }

    pub fn get<F, R>(&mut self, path: &str, f: F) -> RouteBuilder<'_>
    where
        F: Fn(&mut Args<'_, '_>) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        self.route("GET", path, f)
    }

    pub fn post<F, R>(&mut self, path: &str, f: F) -> RouteBuilder<'_>
    where
        F: Fn(&mut Args<'_, '_>) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        self.route("POST", path, f)
    }

    pub fn put<F, R>(&mut self, path: &str, f: F) -> RouteBuilder<'_>
    where
        F: Fn(&mut Args<'_, '_>) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        self.route("PUT", path, f)
    }

    pub fn patch<F, R>(&mut self, path: &str, f: F) -> RouteBuilder<'_>
    where
        F: Fn(&mut Args<'_, '_>) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        self.route("PATCH", path, f)
    }

    pub fn delete<F, R>(&mut self, path: &str, f: F) -> RouteBuilder<'_>
    where
        F: Fn(&mut Args<'_, '_>) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        self.route("DELETE", path, f)
    }

    pub fn head<F, R>(&mut self, path: &str, f: F) -> RouteBuilder<'_>
    where
        F: Fn(&mut Args<'_, '_>) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        self.route("HEAD", path, f)
    }

    pub fn options<F, R>(&mut self, path: &str, f: F) -> RouteBuilder<'_>
    where
        F: Fn(&mut Args<'_, '_>) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        self.route("OPTIONS", path, f)
    }

    pub fn trace<F, R>(&mut self, path: &str, f: F) -> RouteBuilder<'_>
    where
        F: Fn(&mut Args<'_, '_>) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        self.route("TRACE", path, f)
    }

    pub fn connect<F, R>(&mut self, path: &str, f: F) -> RouteBuilder<'_>
    where
        F: Fn(&mut Args<'_, '_>) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        self.route("CONNECT", path, f)
    }

    pub(crate) fn push_route(&mut self, route: Route) -> Result<&Route, ConfigError> {
        if route.is_named()
            && self.routes.iter().any(|r| r.is_named() && r.name() == route.name())
        {
            return Err(ConfigError::DuplicateRoute {
                router: self.name.clone(),
                name: route.name().to_string(),
            });
        }
        debug!(
            router = %self.name,
            route = %route.name(),
            method = %route.method(),
            path = %route.path().as_str(),
            "Route registered"
        );
        let index = self.routes.len();
        self.routes.push(route);
        Ok(&self.routes[index])
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Root filter for the request path.
    pub fn filter(&mut self, filter: Filter) -> &mut Self {
        self.layers.filters.push(filter);
        self
    }

    /// Middleware around admission and dispatch of every candidate.
    pub fn outer_middleware(&mut self, middleware: Middleware<Outcome>) -> &mut Self {
        self.layers.outer.push(middleware);
        self
    }

    /// Middleware around the handler call only.
    pub fn middleware(&mut self, middleware: Middleware<Reply>) -> &mut Self {
        self.layers.inner.push(middleware);
        self
    }

    /// Unregister an outer middleware; true if it was registered.
    pub fn remove_outer_middleware(&mut self, middleware: &Middleware<Outcome>) -> bool {
        self.layers.remove_outer(middleware)
    }

    /// Unregister an inner middleware; true if it was registered.
    pub fn remove_middleware(&mut self, middleware: &Middleware<Reply>) -> bool {
        self.layers.remove_inner(middleware)
    }

    #[must_use]
    pub fn layers(&self) -> &Layers {
        &self.layers
    }

    /// The error path's table.
    pub fn errors(&mut self) -> &mut ErrorTable {
        &mut self.errors
    }

    #[must_use]
    pub fn error_table(&self) -> &ErrorTable {
        &self.errors
    }

    /// Shorthand for `errors().handler(f)`.
    pub fn error<F, R>(&mut self, f: F) -> ErrorBuilder<'_>
    where
        F: Fn(&mut Args<'_, '_>) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        self.errors.handler(f)
    }

    /// First route of this router named `name` whose placeholders are exactly
    /// the supplied parameters.
    #[must_use]
    pub fn url_path_for(&self, name: &str, params: &[(&str, &str)]) -> Option<String> {
        self.routes.iter().find_map(|r| r.url_path_for(name, params))
    }
}

impl fmt::Display for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Router '{}'", self.name)
    }
}
