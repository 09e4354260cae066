//! # treeroute
//!
//! **treeroute** is a transport-independent request dispatch core. It routes an
//! already-parsed HTTP request through a tree of routers to exactly one handler,
//! and routes any error raised along the way through the same tree to an error
//! handler.
//!
//! ## Overview
//!
//! Routers are composed into a tree rooted at the [`App`]. Each router owns
//! routes, root filters, two middleware stacks (outer and inner) and an error
//! table with the same shape. A request is tried against every matching route
//! in tree order until one accepts it; an error is tried against the error
//! tables from the raising router up to the root.
//!
//! ## Architecture
//!
//! - **[`router`]** - Router tree, route registration, error tables
//! - **[`route`]** - Path templates, parameter declarations and classification
//! - **[`filter`]** - Admission predicates with merge semantics
//! - **[`middleware`]** - Continuation-style onion middleware
//! - **[`validator`]** - Pluggable parameter and response validation
//! - **[`config`]** / **[`logging`]** - Application defaults and log setup
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Adapter
//!     participant App
//!     participant Outer as Outer middleware
//!     participant Filters
//!     participant Resolver
//!     participant Inner as Inner middleware
//!     participant Handler
//!
//!     Adapter->>App: propagate(&request)
//!     loop every matching route, tree order
//!         App->>Outer: candidate
//!         Outer->>Filters: root filters, then route filters
//!         Filters-->>Outer: reject (next candidate)
//!         Filters->>Resolver: bind parameters
//!         Resolver->>Inner: validated arguments
//!         Inner->>Handler: call
//!         Handler-->>App: Response / value / skip
//!     end
//!     App-->>Adapter: Outcome
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use serde_json::json;
//! use treeroute::{App, Args, ParamSpec, Request};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut app = App::new();
//! app.root_mut()
//!     .get("/items/{id}/", |args: &mut Args<'_, '_>| {
//!         let id: i64 = args.get("id")?;
//!         Ok::<_, anyhow::Error>(json!({ "id": id }))
//!     })
//!     .param(ParamSpec::path("id").schema(json!({ "type": "integer" })))
//!     .register()?;
//!
//! let outcome = app.propagate(&Request::new(Method::GET, "/items/7/"))?;
//! let response = outcome.into_response().unwrap_or_else(treeroute::App::not_found);
//! assert_eq!(response.status, 200);
//! # Ok(())
//! # }
//! ```

mod app;
pub mod config;
mod context;
mod dispatcher;
pub mod error;
pub mod filter;
mod handler;
mod ids;
pub mod logging;
pub mod middleware;
pub mod request;
pub mod resolver;
pub mod response;
pub mod route;
pub mod router;
pub mod validator;

pub use app::{App, IncludeOptions};
pub use config::{AppConfig, LogConfig, LogFormat};
pub use context::{base64_bytes, Args, Data, Manifest};
pub use error::{
    ConfigError, HttpError, NoMatchFound, PathMismatch, RequestValidationError,
    ResponseValidationError, ValidationIssue,
};
pub use filter::{
    error_type, status_code, ErrorTypeFilter, Filter, FilterChain, IntoVerdict, Verdict,
};
pub use handler::{Handler, IntoReply};
pub use ids::RequestId;
pub use middleware::{errors_middleware, tracing_middleware, wrap, Chain, Middleware, Next};
pub use request::{FormData, FormField, FormFile, Request, UploadFile};
pub use response::{Body, Outcome, Reply, Response, ResponseKind};
pub use route::{extract_path_params, ParamSource, ParamSpec, PathTemplate, Route, RouteBuilder};
pub use router::{Router, RouterId, RouterTree};
pub use validator::{SchemaValidator, Validator};
