//! Path templates: validation, matching, extraction and rendering.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ConfigError, PathMismatch};
use crate::request::ParamVec;

#[allow(clippy::expect_used)]
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}]+?)\}").expect("placeholder regex should be valid"));

#[allow(clippy::expect_used)]
static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex should be valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(Arc<str>),
}

/// A validated path template such as `/items/{name}/{id}/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    params: Vec<Arc<str>>,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse and validate a template.
    ///
    /// The template must start and end with `/`. Placeholders must be unique
    /// identifiers, each filling a whole segment, and no stray brace may
    /// remain once they are substituted.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };
        if !raw.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }
        if !raw.ends_with('/') {
            return Err(invalid("must end with '/'"));
        }

        let mut params: Vec<Arc<str>> = Vec::new();
        for cap in PLACEHOLDER.captures_iter(raw) {
            let name = &cap[1];
            if !IDENTIFIER.is_match(name) {
                return Err(invalid(&format!(
                    "parameter name '{}' is not a valid identifier",
                    name
                )));
            }
            if params.iter().any(|p| p.as_ref() == name) {
                return Err(invalid("parameters must be unique"));
            }
            params.push(Arc::from(name));
        }
        let substituted = PLACEHOLDER.replace_all(raw, "1");
        if substituted.contains('{') || substituted.contains('}') {
            return Err(invalid("unbalanced braces"));
        }

        let segments = split(raw)
            .map(|part| match whole_placeholder(part) {
                Some(name) => Segment::Param(Arc::from(name)),
                None => Segment::Literal(part.to_string()),
            })
            .collect::<Vec<_>>();
        if segments
            .iter()
            .any(|s| matches!(s, Segment::Literal(part) if part.contains('{')))
        {
            return Err(invalid("placeholder must span a whole segment"));
        }

        Ok(Self {
            raw: raw.to_string(),
            params,
            segments,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in template order.
    #[must_use]
    pub fn params(&self) -> &[Arc<str>] {
        &self.params
    }

    #[must_use]
    pub fn has_params(&self) -> bool {
        !self.params.is_empty()
    }

    /// Prepend a router prefix (`""` or `/x` without trailing slash).
    pub(crate) fn with_prefix(&self, prefix: &str) -> Result<Self, ConfigError> {
        if prefix.is_empty() {
            return Ok(self.clone());
        }
        Self::parse(&format!("{}{}", prefix, self.raw))
    }

    /// Substitute every placeholder. `None` if any placeholder is unbound.
    #[must_use]
    pub fn render(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        let mut missing = false;
        let rendered = PLACEHOLDER.replace_all(&self.raw, |cap: &regex::Captures<'_>| {
            lookup(&cap[1]).unwrap_or_else(|| {
                missing = true;
                String::new()
            })
        });
        if missing {
            None
        } else {
            Some(rendered.into_owned())
        }
    }

    /// Match a normalized path, returning the bound parameters on success.
    ///
    /// Templates without placeholders compare verbatim. Otherwise the path is
    /// split segment-wise and every placeholder must bind a non-empty value.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<ParamVec> {
        if !self.has_params() {
            return (self.raw == path).then(ParamVec::new);
        }
        let values: Vec<&str> = split(path).collect();
        if values.len() != self.segments.len() {
            return None;
        }
        let mut bound = ParamVec::new();
        for (segment, value) in self.segments.iter().zip(values) {
            match segment {
                Segment::Literal(lit) if lit == value => {}
                Segment::Param(name) if !value.is_empty() => {
                    bound.push((Arc::clone(name), value.to_string()));
                }
                _ => return None,
            }
        }
        Some(bound)
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    let trimmed = path.trim_matches('/');
    trimmed.split('/').filter(move |_| !trimmed.is_empty())
}

fn whole_placeholder(part: &str) -> Option<&str> {
    part.strip_prefix('{')?
        .strip_suffix('}')
        .filter(|name| !name.contains(['{', '}']))
}

/// Extract path parameters by comparing `path` against `template` segment-wise.
///
/// A template with no segments (`/`) accepts any path and binds nothing.
pub fn extract_path_params(template: &str, path: &str) -> Result<ParamVec, PathMismatch> {
    let parts: Vec<&str> = split(template).collect();
    if parts.is_empty() {
        return Ok(ParamVec::new());
    }
    let values: Vec<&str> = path.trim_matches('/').split('/').collect();
    if parts.len() != values.len() {
        return Err(PathMismatch::PartCount {
            path: path.to_string(),
            expected: parts.len(),
            got: values.len(),
        });
    }
    let mut params = ParamVec::new();
    for (part, value) in parts.into_iter().zip(values) {
        if part == value {
            continue;
        }
        match whole_placeholder(part) {
            Some(name) => params.push((Arc::from(name), value.to_string())),
            None => {
                return Err(PathMismatch::Segment {
                    path: path.to_string(),
                    expected: part.to_string(),
                    got: value.to_string(),
                })
            }
        }
    }
    Ok(params)
}
