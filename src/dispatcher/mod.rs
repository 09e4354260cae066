//! # Dispatcher Module
//!
//! The two dispatch engines of an application: one for requests, one for
//! errors raised while handling them.
//!
//! ## Request Flow
//!
//! 1. Every router reachable from the root is visited in tail order (a
//!    router, then its sub-routers depth first, in attachment order)
//! 2. Each route whose method and path template match becomes a candidate
//! 3. The candidate runs inside the outer middleware of its router chain,
//!    root first
//! 4. Root filters of the chain run from the root down, then the route's own
//!    filters; any rejection moves the search to the next candidate
//! 5. Parameters are resolved and validated
//! 6. The handler runs inside the inner middleware of the chain
//! 7. A skip moves the search on; a plain value is validated and serialized
//!    with the route's response kind
//!
//! ## Error Flow
//!
//! An error raised anywhere inside a candidate is caught by the
//! [`errors_middleware`](crate::middleware::errors_middleware) that every
//! application installs first. It is dispatched against the error table of
//! the raising router, then its parent, up to the root. The first handler
//! whose filters accept the error produces the response. Unclaimed
//! [`HttpError`](crate::HttpError) and
//! [`RequestValidationError`](crate::RequestValidationError) get built-in
//! responses; anything else is returned to the caller unchanged.

mod core;
mod errors;

use crate::error::ConfigError;
use crate::middleware::Middleware;
use crate::router::{Router, RouterId, RouterTree};

pub(crate) use self::core::propagate;
pub(crate) use self::errors::handle_error;

/// Middleware of `id`'s router chain, root router's first.
fn stack<'t, T>(
    tree: &'t RouterTree,
    id: RouterId,
    pick: impl Fn(&'t Router) -> &'t [Middleware<T>],
) -> Result<Vec<&'t Middleware<T>>, ConfigError> {
    let head: Vec<RouterId> = tree.chain_head(id).collect();
    let mut layers = Vec::new();
    for id in head.into_iter().rev() {
        layers.extend(pick(tree.get(id)?));
    }
    Ok(layers)
}
