use std::time::Instant;

use ::tracing::{info, info_span};

use super::Middleware;
use crate::response::Outcome;

/// Outer middleware that opens a span per candidate and logs its latency.
#[must_use]
pub fn tracing_middleware() -> Middleware<Outcome> {
    Middleware::new(|data, next| {
        let request = data.request();
        let span = info_span!(
            "dispatch",
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path,
            route = data.route().map(|r| r.name()).unwrap_or("<none>"),
        );
        let _guard = span.enter();
        let start = Instant::now();
        let result = next(data);
        let status = match &result {
            Ok(Outcome::Response(r)) => Some(r.status),
            _ => None,
        };
        info!(
            status = ?status,
            unhandled = matches!(result, Ok(Outcome::Unhandled)),
            failed = result.is_err(),
            latency_us = start.elapsed().as_micros() as u64,
            "Candidate finished"
        );
        result
    })
    .labelled("tracing")
}
