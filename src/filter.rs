//! Filter chains: gated, context-mutating predicates.
//!
//! Filters run in registration order. Each returns a [`Verdict`]:
//!
//! - `Reject` stops the chain and the candidate is skipped
//! - `Merge(map)` merges `map` into the dispatch context and continues
//! - `Pass` continues without touching the context
//!
//! Later filters and the handler see keys merged by earlier filters. An empty
//! mapping counts as a rejection, the same as any other falsy result.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::context::{Args, Data, Manifest};
use crate::error::{ConfigError, HttpError};

/// Outcome of evaluating one filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Reject,
    Pass,
    Merge(Map<String, Value>),
}

/// Conversion of a filter's return value into a [`Verdict`].
pub trait IntoVerdict {
    fn into_verdict(self) -> anyhow::Result<Verdict>;
}

impl IntoVerdict for Verdict {
    fn into_verdict(self) -> anyhow::Result<Verdict> {
        Ok(self)
    }
}

impl IntoVerdict for bool {
    fn into_verdict(self) -> anyhow::Result<Verdict> {
        Ok(if self { Verdict::Pass } else { Verdict::Reject })
    }
}

impl IntoVerdict for Map<String, Value> {
    fn into_verdict(self) -> anyhow::Result<Verdict> {
        Ok(if self.is_empty() {
            Verdict::Reject
        } else {
            Verdict::Merge(self)
        })
    }
}

impl IntoVerdict for Option<Map<String, Value>> {
    fn into_verdict(self) -> anyhow::Result<Verdict> {
        match self {
            Some(map) => map.into_verdict(),
            None => Ok(Verdict::Reject),
        }
    }
}

impl IntoVerdict for Value {
    fn into_verdict(self) -> anyhow::Result<Verdict> {
        let verdict = match self {
            Value::Object(map) => return map.into_verdict(),
            Value::Null | Value::Bool(false) => Verdict::Reject,
            Value::Number(n) if n.as_f64() == Some(0.0) => Verdict::Reject,
            Value::String(s) if s.is_empty() => Verdict::Reject,
            Value::Array(a) if a.is_empty() => Verdict::Reject,
            _ => Verdict::Pass,
        };
        Ok(verdict)
    }
}

impl<T: IntoVerdict> IntoVerdict for anyhow::Result<T> {
    fn into_verdict(self) -> anyhow::Result<Verdict> {
        self?.into_verdict()
    }
}

type ErrorCheck = fn(&anyhow::Error) -> bool;

type FilterFn = dyn Fn(&Args<'_, '_>) -> anyhow::Result<Verdict> + Send + Sync;

/// A predicate plus its declared parameter manifest.
#[derive(Clone)]
pub struct Filter {
    callback: Arc<FilterFn>,
    manifest: Manifest,
    label: Cow<'static, str>,
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("label", &self.label)
            .field("manifest", &self.manifest)
            .finish()
    }
}

impl Filter {
    /// Wrap a predicate that reads no context keys until [`Filter::reads`] says so.
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&Args<'_, '_>) -> R + Send + Sync + 'static,
        R: IntoVerdict,
    {
        Self {
            callback: Arc::new(move |args: &Args<'_, '_>| f(args).into_verdict()),
            manifest: Manifest::default(),
            label: Cow::Borrowed(std::any::type_name::<F>()),
        }
    }

    /// Declare the context keys this filter reads.
    #[must_use]
    pub fn reads<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.manifest = self.manifest.with(names);
        self
    }

    /// Let this filter see the whole context.
    #[must_use]
    pub fn open(mut self) -> Self {
        self.manifest = Manifest::open();
        self
    }

    #[must_use]
    pub fn labelled(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub(crate) fn call(&self, data: &mut Data<'_>) -> anyhow::Result<Verdict> {
        let args = Args::new(data, &self.manifest);
        (self.callback)(&args)
    }
}

/// Ordered filter list evaluated with short-circuit and merge semantics.
#[derive(Clone, Default, Debug)]
pub struct FilterChain {
    filters: Vec<Filter>,
}

impl FilterChain {
    #[must_use]
    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    pub fn push(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    pub fn extend(&mut self, filters: impl IntoIterator<Item = Filter>) {
        self.filters.extend(filters);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Evaluate the chain against `data`.
    ///
    /// Returns `Ok(false)` on the first rejection. Mappings returned by
    /// filters that ran before the rejection stay merged.
    pub fn check(&self, data: &mut Data<'_>) -> anyhow::Result<bool> {
        for filter in &self.filters {
            match filter.call(data)? {
                Verdict::Reject => {
                    tracing::debug!(
                        request_id = %data.request_id(),
                        filter = %filter.label(),
                        "Filter rejected"
                    );
                    return Ok(false);
                }
                Verdict::Pass => {}
                Verdict::Merge(values) => data.extend(values),
            }
        }
        Ok(true)
    }
}

fn error_is<E>(error: &anyhow::Error) -> bool
where
    E: fmt::Display + fmt::Debug + Send + Sync + 'static,
{
    error.is::<E>()
}

/// Matches the dispatched error by concrete type.
#[derive(Clone)]
pub struct ErrorTypeFilter {
    checks: Vec<(&'static str, ErrorCheck)>,
}

impl ErrorTypeFilter {
    #[must_use]
    pub fn of<E>() -> Self
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self {
            checks: vec![(std::any::type_name::<E>(), error_is::<E> as ErrorCheck)],
        }
    }

    /// Also match errors of type `E`.
    #[must_use]
    pub fn or<E>(mut self) -> Self
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.checks.push((std::any::type_name::<E>(), error_is::<E> as ErrorCheck));
        self
    }

    #[must_use]
    pub fn matches(&self, error: &anyhow::Error) -> bool {
        self.checks.iter().any(|(_, check)| check(error))
    }
}

impl From<ErrorTypeFilter> for Filter {
    fn from(filter: ErrorTypeFilter) -> Self {
        let label = filter
            .checks
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(" | ");
        Filter::new(move |args| args.error().is_some_and(|e| filter.matches(e)))
            .labelled(format!("error_type({})", label))
    }
}

/// Shorthand for `ErrorTypeFilter::of::<E>().into()`.
#[must_use]
pub fn error_type<E>() -> Filter
where
    E: fmt::Display + fmt::Debug + Send + Sync + 'static,
{
    ErrorTypeFilter::of::<E>().into()
}

/// Matches an [`HttpError`] whose status is one of `codes`.
pub fn status_code(codes: &[u16]) -> Result<Filter, ConfigError> {
    if codes.is_empty() {
        return Err(ConfigError::EmptyFilter {
            filter: "status_code filter",
        });
    }
    for &code in codes {
        let known = http::StatusCode::from_u16(code)
            .ok()
            .and_then(|s| s.canonical_reason())
            .is_some();
        if !known {
            return Err(ConfigError::InvalidStatusCode { status: code });
        }
    }
    let codes = codes.to_vec();
    let label = format!("status_code({:?})", codes);
    Ok(Filter::new(move |args| {
        args.error_as::<HttpError>()
            .is_some_and(|e| codes.contains(&e.status))
    })
    .labelled(label))
}
