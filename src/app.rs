//! The application: root router, router arena, workflow data, validator and
//! configuration.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::context::Data;
use crate::error::{ConfigError, NoMatchFound};
use crate::middleware::errors_middleware;
use crate::request::Request;
use crate::response::{Outcome, Response, ResponseKind};
use crate::router::{validate_prefix, Router, RouterId, RouterTree};
use crate::validator::{SchemaValidator, Validator};
use crate::dispatcher;

/// Options applied to a router when it is included into a parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeOptions {
    prefix: Option<String>,
    default_response_kind: Option<ResponseKind>,
}

impl IncludeOptions {
    /// Replace the included router's prefix; existing routes are re-based.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn default_response_kind(mut self, kind: ResponseKind) -> Self {
        self.default_response_kind = Some(kind);
        self
    }
}

/// A composed application.
///
/// Built once at startup, then shared read-only by every request. The root
/// router is named `app` and carries [`errors_middleware`] as its first outer
/// middleware.
pub struct App {
    tree: RouterTree,
    workflow: Map<String, Value>,
    validator: Arc<dyn Validator>,
    config: AppConfig,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("routers", &self.tree.len())
            .field("workflow", &self.workflow)
            .field("config", &self.config)
            .finish()
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    #[must_use]
    pub fn with_config(config: AppConfig) -> Self {
        let mut root = Router::new("app");
        root.outer_middleware(errors_middleware());
        Self {
            tree: RouterTree::new(root),
            workflow: Map::new(),
            validator: Arc::new(SchemaValidator::new()),
            config,
        }
    }

    /// Replace the validation backend.
    #[must_use]
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn validator(&self) -> &dyn Validator {
        self.validator.as_ref()
    }

    #[must_use]
    pub fn tree(&self) -> &RouterTree {
        &self.tree
    }

    #[must_use]
    pub fn root(&self) -> &Router {
        self.tree.root()
    }

    /// Register routes, filters and middleware on the application itself.
    pub fn root_mut(&mut self) -> &mut Router {
        self.tree.root_mut()
    }

    pub fn router(&self, id: RouterId) -> Result<&Router, ConfigError> {
        self.tree.get(id)
    }

    pub fn router_mut(&mut self, id: RouterId) -> Result<&mut Router, ConfigError> {
        self.tree.get_mut(id)
    }

    /// Add a detached router; it takes part in dispatch once attached.
    pub fn add_router(&mut self, router: Router) -> RouterId {
        self.tree.add(router)
    }

    pub fn attach(&mut self, child: RouterId, parent: RouterId) -> Result<(), ConfigError> {
        self.tree.attach(child, parent)
    }

    /// Add `router` as a sub-router of `parent`.
    pub fn include(
        &mut self,
        parent: RouterId,
        mut router: Router,
        options: IncludeOptions,
    ) -> Result<RouterId, ConfigError> {
        self.tree.get(parent)?;
        if let Some(prefix) = &options.prefix {
            router.set_prefix(prefix)?;
        }
        if let Some(kind) = options.default_response_kind {
            router.set_default_response_kind(kind);
        }
        let id = self.tree.add(router);
        self.tree.attach(id, parent)?;
        Ok(id)
    }

    /// Attach an already added router, applying `options` to it.
    pub fn include_router(
        &mut self,
        parent: RouterId,
        child: RouterId,
        options: IncludeOptions,
    ) -> Result<(), ConfigError> {
        if let Some(prefix) = &options.prefix {
            validate_prefix(prefix)?;
        }
        self.tree.attach(child, parent)?;
        let router = self.tree.get_mut(child)?;
        if let Some(prefix) = &options.prefix {
            router.set_prefix(prefix)?;
        }
        if let Some(kind) = options.default_response_kind {
            router.set_default_response_kind(kind);
        }
        Ok(())
    }

    /// Set a workflow value, seeded into every dispatch context.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.workflow.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.workflow.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.workflow.shift_remove(key)
    }

    #[must_use]
    pub fn workflow(&self) -> &Map<String, Value> {
        &self.workflow
    }

    /// Dispatch `request`.
    ///
    /// `Ok(Outcome::Unhandled)` means no candidate accepted it; an `Err` is an
    /// error no error handler claimed.
    pub fn propagate(&self, request: &Request) -> anyhow::Result<Outcome> {
        debug!(
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path,
            "Dispatching request"
        );
        let outcome = dispatcher::propagate(self, request)?;
        if outcome.is_unhandled() {
            info!(
                request_id = %request.request_id,
                method = %request.method,
                path = %request.path,
                "Request unhandled"
            );
        }
        Ok(outcome)
    }

    /// Run the error dispatch engine for an error raised outside any route,
    /// starting at the root router.
    pub fn propagate_error(
        &self,
        error: anyhow::Error,
        request: &Request,
    ) -> anyhow::Result<Response> {
        let data = Data::new(self, request, RouterId::ROOT);
        dispatcher::handle_error(self, error, &data)
    }

    /// Path of the first route named `name` whose placeholders are exactly
    /// `params`, searching the whole tree in dispatch order.
    pub fn url_path_for(
        &self,
        name: &str,
        params: &[(&str, &str)],
    ) -> Result<String, NoMatchFound> {
        self.tree
            .chain_tail(RouterId::ROOT)
            .filter_map(|id| self.tree.get(id).ok())
            .find_map(|router| router.url_path_for(name, params))
            .ok_or_else(|| NoMatchFound {
                name: name.to_string(),
            })
    }

    /// The canonical response for an unhandled request.
    #[must_use]
    pub fn not_found() -> Response {
        ResponseKind::Json.render(404, &json!({ "detail": "Not Found" }))
    }
}
