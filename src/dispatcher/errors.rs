//! Error dispatch engine.
//!
//! Walks the error tables from the raising router up to the root. Within one
//! router, root error filters of the chain run first (root to leaf), then each
//! registered handler in order until one produces a response.

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::stack;
use crate::app::App;
use crate::context::Data;
use crate::error::{HttpError, RequestValidationError};
use crate::middleware::{wrap, Chain};
use crate::response::{Outcome, Reply, Response, ResponseKind};
use crate::router::RouterId;

/// Turn `error` into a response, or hand it back if nothing claims it.
pub(crate) fn handle_error(
    app: &App,
    error: anyhow::Error,
    origin: &Data<'_>,
) -> anyhow::Result<Response> {
    let tree = app.tree();
    debug!(
        request_id = %origin.request_id(),
        error = %error,
        "Dispatching error"
    );
    for router_id in tree.chain_head(origin.router()) {
        let outcome = {
            let mut data = origin.for_error(&error);
            data.set_router(router_id);
            let outer = stack(tree, router_id, |r| r.error_table().layers().outer())?;
            let terminal: Chain<'_, Outcome> =
                Box::new(move |data: &mut Data<'_>| trigger_errors(app, router_id, data));
            wrap(outer, terminal)(&mut data)?
        };
        if let Outcome::Response(response) = outcome {
            return Ok(response);
        }
    }
    fallback(origin, error)
}

fn trigger_errors(app: &App, router_id: RouterId, data: &mut Data<'_>) -> anyhow::Result<Outcome> {
    let tree = app.tree();
    let head: Vec<RouterId> = tree.chain_head(router_id).collect();
    for id in head.into_iter().rev() {
        if !tree.get(id)?.error_table().layers().filters().check(data)? {
            debug!(
                request_id = %data.request_id(),
                router = %tree.get(id)?.name(),
                "Error root filter rejected"
            );
            return Ok(Outcome::Unhandled);
        }
    }

    let router = tree.get(router_id)?;
    for entry in router.error_table().handlers() {
        if !entry.filters().check(data)? {
            continue;
        }
        let inner = stack(tree, router_id, |r| r.error_table().layers().inner())?;
        let terminal: Chain<'_, Reply> =
            Box::new(move |data: &mut Data<'_>| entry.handler().call(data));
        match wrap(inner, terminal)(data)? {
            Reply::Skip => continue,
            Reply::Response(response) => {
                info!(
                    request_id = %data.request_id(),
                    router = %router.name(),
                    handler = %entry.handler().label(),
                    status = response.status,
                    "Error handled"
                );
                return Ok(Outcome::Response(response));
            }
            Reply::Value(value) => {
                let kind = router
                    .default_response_kind()
                    .unwrap_or(app.config().default_response_kind);
                info!(
                    request_id = %data.request_id(),
                    router = %router.name(),
                    handler = %entry.handler().label(),
                    "Error handled"
                );
                return Ok(Outcome::Response(kind.render(500, &value)));
            }
        }
    }
    Ok(Outcome::Unhandled)
}

/// Built-in responses for framework errors no handler claimed.
fn fallback(origin: &Data<'_>, error: anyhow::Error) -> anyhow::Result<Response> {
    if let Some(http) = error.downcast_ref::<HttpError>() {
        let body = match http.response_kind {
            ResponseKind::Json => json!({ "detail": http.detail }),
            _ => Value::String(http.detail.clone()),
        };
        let mut response = http.response_kind.render(http.status, &body);
        for (name, value) in &http.headers {
            response.append_header(name, value.clone());
        }
        debug!(
            request_id = %origin.request_id(),
            status = http.status,
            "HTTP error rendered by fallback"
        );
        return Ok(response);
    }
    if let Some(invalid) = error.downcast_ref::<RequestValidationError>() {
        let detail = serde_json::to_value(&invalid.issues)?;
        debug!(
            request_id = %origin.request_id(),
            issues = invalid.issues.len(),
            "Validation error rendered by fallback"
        );
        return Ok(ResponseKind::Json.render(422, &json!({ "detail": detail })));
    }
    warn!(
        request_id = %origin.request_id(),
        error = %error,
        "Error re-raised"
    );
    Err(error)
}
