//! # Router Module
//!
//! Routers are the nodes of the application's composition tree. Each one owns
//! a list of routes, the request path's root filters and middleware, and an
//! error table with its own filters, middleware and handlers.
//!
//! ## Tree
//!
//! Routers live in a [`RouterTree`] arena owned by the application and are
//! referenced by [`RouterId`]. The tree gives dispatch its two traversals:
//!
//! - `chain_head(id)`: `id`, its parent, ... up to the root. Root filters and
//!   middleware are resolved along this chain, applied root first.
//! - `chain_tail(id)`: `id` and all descendants depth first. Route search walks
//!   this chain from the root, so parents are tried before children and
//!   siblings in attachment order.
//!
//! ## Example
//!
//! ```rust
//! use treeroute::{App, IncludeOptions, Router, RouterId};
//!
//! # fn main() -> Result<(), treeroute::ConfigError> {
//! let mut app = App::new();
//! let mut users = Router::new("users");
//! users.get("/users/", |_args| "all users").register()?;
//! let id = app.include(RouterId::ROOT, users, IncludeOptions::default().prefix("/api"))?;
//! assert_eq!(app.router(id)?.routes()[0].path().as_str(), "/api/users/");
//! # Ok(())
//! # }
//! ```

mod core;
#[cfg(test)]
mod tests;
mod tree;

pub use self::core::{ErrorBuilder, ErrorHandler, ErrorTable, Layers, Router};
pub(crate) use self::core::validate_prefix;
pub use tree::{ChainHead, ChainTail, RouterId, RouterTree};
