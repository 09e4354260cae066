//! Error types for setup-time configuration and request-time application errors.
//!
//! Two families live here:
//!
//! - [`ConfigError`] is returned by every registration and attachment API. A bad
//!   path template, an invalid method or a cyclic router graph is reported when
//!   the application is assembled, never while serving.
//! - [`HttpError`], [`RequestValidationError`] and [`ResponseValidationError`] are
//!   raised while dispatching. They travel as `anyhow::Error` through the error
//!   dispatch engine, where filters match them by downcasting.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::response::ResponseKind;

/// Setup-time configuration error.
///
/// Returned by route registration, router composition and filter construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Path template rejected (missing leading/trailing slash, bad placeholder)
    InvalidPath {
        /// The offending template
        path: String,
        /// Human readable reason
        reason: String,
    },
    /// Router prefix rejected
    InvalidPrefix {
        /// The offending prefix
        prefix: String,
        /// Human readable reason
        reason: String,
    },
    /// Method token is not one of the standard HTTP methods
    InvalidMethod {
        /// The offending method token
        method: String,
    },
    /// Status code is not a registered HTTP status
    InvalidStatusCode {
        /// The offending code
        status: u16,
    },
    /// A route with the same explicit name already exists on this router
    DuplicateRoute {
        /// Router name
        router: String,
        /// Route name
        name: String,
    },
    /// Router already has a parent
    AlreadyAttached {
        /// Router being attached
        router: String,
        /// Its current parent
        parent: String,
    },
    /// Router attached to itself
    SelfAttachment {
        /// Router name
        router: String,
    },
    /// Attachment would create a cycle
    CircularAttachment {
        /// Router being attached
        router: String,
        /// Intended parent, which is a descendant of `router`
        parent: String,
    },
    /// The application root can never acquire a parent
    RootAttachment,
    /// Router id does not belong to this application
    UnknownRouter {
        /// Raw arena index
        id: usize,
    },
    /// A filter constructor was given nothing to match
    EmptyFilter {
        /// Filter kind
        filter: &'static str,
    },
    /// A route's declared parameters are inconsistent
    InvalidParam {
        /// Route path
        route: String,
        /// Parameter name
        name: String,
        /// Human readable reason
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPath { path, reason } => {
                write!(f, "Invalid path '{}': {}", path, reason)
            }
            ConfigError::InvalidPrefix { prefix, reason } => {
                write!(f, "Invalid prefix '{}': {}", prefix, reason)
            }
            ConfigError::InvalidMethod { method } => {
                write!(f, "Method '{}' is not a valid HTTP method", method)
            }
            ConfigError::InvalidStatusCode { status } => {
                write!(f, "Invalid status code: {}", status)
            }
            ConfigError::DuplicateRoute { router, name } => {
                write!(f, "Route '{}' is already registered on router '{}'", name, router)
            }
            ConfigError::AlreadyAttached { router, parent } => {
                write!(f, "Router '{}' is already attached to '{}'", router, parent)
            }
            ConfigError::SelfAttachment { router } => {
                write!(f, "Router '{}' cannot be attached to itself", router)
            }
            ConfigError::CircularAttachment { router, parent } => {
                write!(
                    f,
                    "Attaching router '{}' to '{}' would create a cycle",
                    router, parent
                )
            }
            ConfigError::RootAttachment => {
                write!(f, "The application router cannot be attached to a parent")
            }
            ConfigError::UnknownRouter { id } => {
                write!(f, "Router id {} does not belong to this application", id)
            }
            ConfigError::EmptyFilter { filter } => {
                write!(f, "{} requires at least one value to match", filter)
            }
            ConfigError::InvalidParam {
                route,
                name,
                reason,
            } => write!(f, "Invalid parameter '{}' on '{}': {}", name, route, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

/// One problem found while validating request parameters or a response value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Where the problem was found (parameter name, or `response`)
    pub location: String,
    /// Short machine-readable category (`missing`, `type`, `schema`)
    pub kind: String,
    /// Human readable message
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        location: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ValidationIssue {
            location: location.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.location, self.message)
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// An intentional application error carrying an HTTP status.
///
/// If no registered error handler claims it, the error dispatch engine turns it
/// into a response directly.
#[derive(Debug, Clone)]
pub struct HttpError {
    pub status: u16,
    pub detail: String,
    pub headers: Vec<(String, String)>,
    pub response_kind: ResponseKind,
}

impl HttpError {
    /// Create an error whose detail is the canonical reason phrase of `status`.
    #[must_use]
    pub fn new(status: u16) -> Self {
        let detail = http::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown Status")
            .to_string();
        HttpError {
            status,
            detail,
            headers: Vec::new(),
            response_kind: ResponseKind::Json,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_response_kind(mut self, kind: ResponseKind) -> Self {
        self.response_kind = kind;
        self
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.detail)
    }
}

impl std::error::Error for HttpError {}

/// Request parameters failed validation.
///
/// The framework fallback turns this into a 422 response when no user handler
/// claims it first.
#[derive(Debug, Clone)]
pub struct RequestValidationError {
    pub issues: Vec<ValidationIssue>,
    /// The raw parameter map that was rejected
    pub params: Value,
}

impl fmt::Display for RequestValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Request validation failed: {}", join_issues(&self.issues))
    }
}

impl std::error::Error for RequestValidationError {}

/// A handler returned a value inconsistent with its declared response shape.
///
/// This is a programming error and has no built-in fallback.
#[derive(Debug, Clone)]
pub struct ResponseValidationError {
    pub issues: Vec<ValidationIssue>,
    pub value: Value,
}

impl fmt::Display for ResponseValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Response validation failed: {}", join_issues(&self.issues))
    }
}

impl std::error::Error for ResponseValidationError {}

/// Reverse routing found no route with the given name and parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoMatchFound {
    pub name: String,
}

impl fmt::Display for NoMatchFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No route named '{}' matches the given parameters", self.name)
    }
}

impl std::error::Error for NoMatchFound {}

/// A concrete path does not fit a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMismatch {
    /// Different number of segments
    PartCount {
        path: String,
        expected: usize,
        got: usize,
    },
    /// A literal segment differs
    Segment {
        path: String,
        expected: String,
        got: String,
    },
}

impl fmt::Display for PathMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathMismatch::PartCount {
                path,
                expected,
                got,
            } => write!(
                f,
                "Invalid path: '{}'. Expected {} parts, got {}",
                path, expected, got
            ),
            PathMismatch::Segment {
                path,
                expected,
                got,
            } => write!(
                f,
                "Invalid path: '{}'. Expected '{}', got '{}'",
                path, expected, got
            ),
        }
    }
}

impl std::error::Error for PathMismatch {}
