//! # Middleware Module
//!
//! Continuation-style middleware wrapped around dispatch in an onion.
//!
//! Every router owns two independent stacks per path (request and error):
//!
//! - **outer** middleware wraps the whole admission and dispatch of a
//!   candidate, including root-filter rejection
//! - **inner** middleware wraps only the final handler call, after all filters
//!   have passed
//!
//! Stacks are resolved along the router chain from the application root down
//! to the candidate's router, so middleware registered on a parent wraps the
//! middleware of its children.

mod core;
mod errors;
mod tracing;

pub use self::core::{wrap, Chain, Middleware, Next};
pub use self::errors::errors_middleware;
pub use self::tracing::tracing_middleware;
