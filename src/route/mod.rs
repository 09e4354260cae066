//! # Route Module
//!
//! A [`Route`] binds one HTTP method and path template to a handler, together
//! with its admission filters, declared parameters and response metadata.
//!
//! ## Path templates
//!
//! Templates start and end with `/` and use single curly-brace placeholders,
//! one per segment: `/items/{name}/{id}/`. A router prefix (`/api`) is
//! prepended at registration.
//!
//! ## Parameters
//!
//! Handlers declare their parameters as [`ParamSpec`] values. The declaration
//! is partitioned by source once, when the route is registered, and the
//! resolver only visits the sources a route actually uses.

mod core;
mod params;
mod path;

pub use self::core::{parse_method, Route, RouteBuilder, STANDARD_METHODS};
pub use params::{BodyModelBinding, Classification, ParamSource, ParamSpec};
pub use path::{extract_path_params, PathTemplate};
