use super::Middleware;
use crate::response::Outcome;

/// Outer middleware that routes failures into the error dispatch engine.
///
/// Installed first on every application, so it wraps the whole chain. A
/// response produced by an error handler replaces the failure; an error no
/// handler claims is returned unchanged.
#[must_use]
pub fn errors_middleware() -> Middleware<Outcome> {
    Middleware::new(|data, next| match next(data) {
        Ok(outcome) => Ok(outcome),
        Err(error) => {
            crate::dispatcher::handle_error(data.app(), error, data).map(Outcome::Response)
        }
    })
    .labelled("errors")
}
