//! # Validator Module
//!
//! The validation boundary between raw request data and handler parameters.
//!
//! The resolver assembles a raw parameter map from the request and hands it to
//! a [`Validator`] together with the route's declared parameters. The
//! validator returns the bound object, one key per declared parameter, or a
//! [`RequestValidationError`]. On the way out, plain handler return values are
//! checked against the route's declared response shape.
//!
//! [`SchemaValidator`] is the default backend. It checks each parameter
//! against its optional JSON schema with the `jsonschema` crate and caches
//! compiled schemas across requests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{RequestValidationError, ResponseValidationError, ValidationIssue};
use crate::route::{ParamSource, ParamSpec};

/// Pluggable validation and serialization capability.
pub trait Validator: Send + Sync {
    /// Validate `raw` against the declared parameters and produce the bound
    /// object (a JSON object keyed by parameter name).
    fn validate_request(&self, raw: &Map<String, Value>, params: &[ParamSpec])
        -> anyhow::Result<Value>;

    /// Check a handler's plain return value against its declared shape and
    /// return its wire form.
    fn validate_response(&self, value: Value, shape: Option<&Value>) -> anyhow::Result<Value>;
}

/// JSON-schema backed validator with a compiled-schema cache.
#[derive(Clone, Default)]
pub struct SchemaValidator {
    cache: Arc<RwLock<HashMap<String, Arc<jsonschema::Validator>>>>,
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size = self.cache.read().map(|c| c.len()).unwrap_or_default();
        f.debug_struct("SchemaValidator")
            .field("cached_schemas", &size)
            .finish()
    }
}

impl SchemaValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of compiled schemas currently cached.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or_default()
    }

    fn compiled(&self, schema: &Value) -> Result<Arc<jsonschema::Validator>, String> {
        let key = schema.to_string();
        if let Ok(cache) = self.cache.read() {
            if let Some(v) = cache.get(&key) {
                return Ok(Arc::clone(v));
            }
        }
        let validator = jsonschema::validator_for(schema).map_err(|e| e.to_string())?;
        let validator = Arc::new(validator);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, Arc::clone(&validator));
            debug!(cached = cache.len(), "Schema compiled");
        }
        Ok(validator)
    }

    fn check(
        &self,
        location: &str,
        schema: &Value,
        value: &Value,
        issues: &mut Vec<ValidationIssue>,
    ) {
        match self.compiled(schema) {
            Ok(validator) => {
                for error in validator.iter_errors(value) {
                    issues.push(ValidationIssue::new(location, "schema", error.to_string()));
                }
            }
            Err(message) => {
                warn!(location = %location, error = %message, "Invalid parameter schema");
                issues.push(ValidationIssue::new(location, "schema", message));
            }
        }
    }
}

fn schema_type(schema: Option<&Value>) -> Option<&str> {
    schema.and_then(|s| s.get("type")).and_then(Value::as_str)
}

/// Coerce a string scalar to the schema's primitive type; anything that does
/// not parse is left as a string for the schema check to report.
fn convert_primitive(value: Value, schema: Option<&Value>) -> Value {
    let Value::String(text) = value else {
        return value;
    };
    let converted = match schema_type(schema) {
        Some("integer") => text.parse::<i64>().ok().map(Value::from),
        Some("number") => text.parse::<f64>().ok().map(Value::from),
        Some("boolean") => text.parse::<bool>().ok().map(Value::from),
        _ => None,
    };
    converted.unwrap_or(Value::String(text))
}

/// Coerce request-side text values (path, query, header, cookie, form) to the
/// declared schema. Array schemas accept a single value.
fn coerce(value: Value, schema: Option<&Value>) -> Value {
    if schema_type(schema) == Some("array") {
        let items = schema.and_then(|s| s.get("items"));
        let values = match value {
            Value::Array(values) => values,
            other => vec![other],
        };
        return Value::Array(values.into_iter().map(|v| convert_primitive(v, items)).collect());
    }
    convert_primitive(value, schema)
}

fn is_text_source(source: &ParamSource) -> bool {
    matches!(
        source,
        ParamSource::Path
            | ParamSource::Query
            | ParamSource::Header
            | ParamSource::Cookie
            | ParamSource::Field
    )
}

impl Validator for SchemaValidator {
    fn validate_request(
        &self,
        raw: &Map<String, Value>,
        params: &[ParamSpec],
    ) -> anyhow::Result<Value> {
        let mut bound = Map::new();
        let mut issues = Vec::new();

        for spec in params {
            let name = spec.name();
            let value = match raw.get(name) {
                Some(v) => v.clone(),
                None => match (spec.default_value(), spec.source()) {
                    (Some(default), _) => {
                        bound.insert(name.to_string(), default.clone());
                        continue;
                    }
                    (None, ParamSource::UploadFiles) => Value::Array(Vec::new()),
                    (None, _) => {
                        issues.push(ValidationIssue::new(name, "missing", "field required"));
                        continue;
                    }
                },
            };
            let value = if is_text_source(spec.source()) {
                coerce(value, spec.schema_ref())
            } else {
                value
            };
            if let Some(schema) = spec.schema_ref() {
                self.check(name, schema, &value, &mut issues);
            }
            bound.insert(name.to_string(), value);
        }

        if issues.is_empty() {
            Ok(Value::Object(bound))
        } else {
            debug!(issues = issues.len(), "Request validation failed");
            Err(RequestValidationError {
                issues,
                params: Value::Object(raw.clone()),
            }
            .into())
        }
    }

    fn validate_response(&self, value: Value, shape: Option<&Value>) -> anyhow::Result<Value> {
        let Some(schema) = shape else {
            return Ok(value);
        };
        let mut issues = Vec::new();
        self.check("response", schema, &value, &mut issues);
        if issues.is_empty() {
            Ok(value)
        } else {
            Err(ResponseValidationError { issues, value }.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn coerces_text_inputs_to_schema_types() {
        let v = SchemaValidator::new();
        let params = [
            ParamSpec::path("id").schema(json!({"type": "integer"})),
            ParamSpec::query("flag").schema(json!({"type": "boolean"})),
            ParamSpec::query("tags").schema(json!({"type": "array", "items": {"type": "integer"}})),
        ];
        let out = v
            .validate_request(
                &raw(&[("id", json!("7")), ("flag", json!("true")), ("tags", json!("3"))]),
                &params,
            )
            .expect("valid");
        assert_eq!(out, json!({"id": 7, "flag": true, "tags": [3]}));
    }

    #[test]
    fn reports_missing_and_invalid_fields() {
        let v = SchemaValidator::new();
        let params = [
            ParamSpec::path("id").schema(json!({"type": "integer"})),
            ParamSpec::query("q"),
        ];
        let err = v
            .validate_request(&raw(&[("id", json!("abc"))]), &params)
            .expect_err("invalid");
        let err = err.downcast::<RequestValidationError>().expect("typed error");
        assert_eq!(err.issues.len(), 2);
        assert_eq!(err.issues[0].location, "id");
        assert_eq!(err.issues[1].kind, "missing");
    }

    #[test]
    fn defaults_fill_absent_values() {
        let v = SchemaValidator::new();
        let params = [ParamSpec::query("limit").with_default(json!(10)), ParamSpec::upload_files("files")];
        let out = v.validate_request(&Map::new(), &params).expect("valid");
        assert_eq!(out, json!({"limit": 10, "files": []}));
    }

    #[test]
    fn response_shape_is_enforced() {
        let v = SchemaValidator::new();
        let shape = json!({"type": "object", "required": ["id"]});
        assert!(v.validate_response(json!({"id": 1}), Some(&shape)).is_ok());
        let err = v.validate_response(json!({}), Some(&shape)).expect_err("missing id");
        assert!(err.is::<ResponseValidationError>());
        assert_eq!(v.cached(), 1);
    }
}
