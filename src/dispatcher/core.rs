//! Request dispatch engine.
//!
//! ```text
//! SEARCHING ──match──▶ ROOT_FILTERING ──▶ ROUTE_FILTERING ──▶ RESOLVING
//!     ▲                      │ reject           │ reject           │
//!     └──────────────────────┴──────────────────┘                  ▼
//!     ▲                                                        INVOKING
//!     └────────────────────── skip ◀───────────────────────────────┤
//!                                                                  ▼
//!                                                SERIALIZING ──▶ DONE
//! ```
//!
//! Candidates are tried in tail order from the root. A rejected or skipped
//! candidate moves the search on; running out of candidates ends in
//! [`Outcome::Unhandled`].

use tracing::{debug, info};

use super::stack;
use crate::app::App;
use crate::context::Data;
use crate::middleware::{wrap, Chain};
use crate::request::Request;
use crate::resolver;
use crate::response::{Outcome, Reply};
use crate::route::Route;
use crate::router::RouterId;

/// Find and run the first candidate route that accepts `request`.
pub(crate) fn propagate(app: &App, request: &Request) -> anyhow::Result<Outcome> {
    let tree = app.tree();
    for router_id in tree.chain_tail(RouterId::ROOT) {
        let router = tree.get(router_id)?;
        for route in router.routes() {
            let Some(path_params) = route.matches(request) else {
                continue;
            };
            debug!(
                request_id = %request.request_id,
                router = %router.name(),
                route = %route.name(),
                "Candidate matched"
            );
            let mut data = Data::new(app, request, router_id);
            data.set_route(route, path_params);
            match run_candidate(app, router_id, route, &mut data)? {
                Outcome::Unhandled => continue,
                outcome => return Ok(outcome),
            }
        }
    }
    debug!(
        request_id = %request.request_id,
        method = %request.method,
        path = %request.path,
        "No candidate accepted the request"
    );
    Ok(Outcome::Unhandled)
}

/// Outer middleware of the whole router chain around admission and dispatch.
fn run_candidate(
    app: &App,
    router_id: RouterId,
    route: &Route,
    data: &mut Data<'_>,
) -> anyhow::Result<Outcome> {
    let outer = stack(app.tree(), router_id, |r| r.layers().outer())?;
    let terminal: Chain<'_, Outcome> =
        Box::new(move |data: &mut Data<'_>| admit(app, router_id, route, data));
    wrap(outer, terminal)(data)
}

fn admit(
    app: &App,
    router_id: RouterId,
    route: &Route,
    data: &mut Data<'_>,
) -> anyhow::Result<Outcome> {
    let tree = app.tree();
    let head: Vec<RouterId> = tree.chain_head(router_id).collect();
    for id in head.into_iter().rev() {
        let router = tree.get(id)?;
        if !router.layers().filters().check(data)? {
            debug!(
                request_id = %data.request_id(),
                router = %router.name(),
                route = %route.name(),
                "Root filter rejected candidate"
            );
            return Ok(Outcome::Unhandled);
        }
    }

    if !route.filters().check(data)? {
        debug!(
            request_id = %data.request_id(),
            route = %route.name(),
            "Route filter rejected candidate"
        );
        return Ok(Outcome::Unhandled);
    }

    resolver::resolve(route, data)?;

    let inner = stack(tree, router_id, |r| r.layers().inner())?;
    let terminal: Chain<'_, Reply> =
        Box::new(move |data: &mut Data<'_>| route.handler().call(data));
    let reply = wrap(inner, terminal)(data)?;

    let value = match reply {
        Reply::Skip => {
            debug!(
                request_id = %data.request_id(),
                route = %route.name(),
                "Handler skipped"
            );
            return Ok(Outcome::Unhandled);
        }
        Reply::Response(response) => {
            info!(
                request_id = %data.request_id(),
                route = %route.name(),
                status = response.status,
                "Request handled"
            );
            return Ok(Outcome::Response(response));
        }
        Reply::Value(value) => value,
    };

    let value = if app.config().validate_responses {
        app.validator().validate_response(value, route.response_model())?
    } else {
        value
    };
    let kind = route
        .response_kind()
        .or(tree.get(router_id)?.default_response_kind())
        .unwrap_or(app.config().default_response_kind);
    let response = kind.render(route.status(), &value);
    info!(
        request_id = %data.request_id(),
        route = %route.name(),
        status = response.status,
        "Request handled"
    );
    Ok(Outcome::Response(response))
}
