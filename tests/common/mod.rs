#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use http::Method;
use serde_json::Value;
use treeroute::{App, Outcome, Request, Response};

/// Shared, ordered log of events recorded by filters, middleware and handlers.
#[derive(Clone, Default)]
pub struct Trail(Arc<Mutex<Vec<String>>>);

impl Trail {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == event).count()
    }
}

pub fn get(path: &str) -> Request {
    Request::new(Method::GET, path)
}

pub fn post(path: &str) -> Request {
    Request::new(Method::POST, path)
}

/// Dispatch and expect a response.
pub fn respond(app: &App, request: &Request) -> Response {
    match app.propagate(request).expect("dispatch failed") {
        Outcome::Response(response) => response,
        Outcome::Unhandled => panic!("request {} {} was unhandled", request.method, request.path),
    }
}

pub fn body_json(response: &Response) -> Value {
    serde_json::from_slice(response.body_bytes().expect("buffered body")).expect("JSON body")
}
