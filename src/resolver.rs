//! Parameter resolution: request facets to bound handler arguments.
//!
//! Only the sources a route declares are visited. The raw map built here is
//! passed to the application's [`Validator`](crate::Validator); its output is
//! read back one declared name at a time into the dispatch context.

use serde_json::{Map, Value};

use crate::context::{base64_bytes, Data};
use crate::error::{RequestValidationError, ValidationIssue};
use crate::request::{Request, UploadFile};
use crate::route::{Classification, Route};

/// Build the raw parameter map for `route` from the request and matched path.
pub fn raw_params(route: &Route, data: &Data<'_>) -> anyhow::Result<Map<String, Value>> {
    let request = data.request();
    let c = route.classification();
    let mut raw = Map::new();

    if !c.path.is_empty() {
        for (name, value) in data.path_params() {
            raw.insert(name.to_string(), Value::String(value.clone()));
        }
    }
    if !c.query.is_empty() {
        raw.extend(request.query_map());
    }
    if !c.bodies.is_empty() {
        if let Value::Object(body) = json_body(request)? {
            raw.extend(body.clone());
        }
    }
    if !c.body_models.is_empty() {
        body_models(c, request, &mut raw)?;
    }
    if !c.fields.is_empty() {
        form_fields(c, request, &mut raw);
    }
    if !c.files.is_empty() {
        form_files(c, request, &mut raw);
    }
    if !c.upload_files.is_empty() || c.upload_files_param.is_some() {
        upload_files(c, request, &mut raw)?;
    }
    if !c.headers.is_empty() {
        headers(c, request, &mut raw);
    }
    if !c.cookies.is_empty() {
        for (name, value) in &request.cookies {
            raw.insert(name.to_string(), Value::String(value.clone()));
        }
    }
    Ok(raw)
}

/// A body that fails to decode is a request-side validation failure.
fn json_body(request: &Request) -> anyhow::Result<&Value> {
    request.json().map_err(|err| {
        RequestValidationError {
            issues: vec![ValidationIssue::new(
                "body",
                "json_invalid",
                err.root_cause().to_string(),
            )],
            params: Value::Null,
        }
        .into()
    })
}

fn body_models(
    c: &Classification,
    request: &Request,
    raw: &mut Map<String, Value>,
) -> anyhow::Result<()> {
    let body = json_body(request)?;
    for model in &c.body_models {
        let source = if model.embedded {
            body.get(&model.name)
        } else {
            Some(body)
        };
        let mut object = Map::new();
        if let Some(source) = source {
            for field in &model.fields {
                if let Some(value) = source.get(field) {
                    object.insert(field.clone(), value.clone());
                }
            }
        }
        raw.insert(model.name.clone(), Value::Object(object));
    }
    Ok(())
}

fn form_fields(c: &Classification, request: &Request, raw: &mut Map<String, Value>) {
    let Some(form) = &request.form else {
        return;
    };
    for name in &c.fields {
        for field in form.fields.iter().filter(|f| &f.name == name) {
            raw.insert(name.clone(), Value::String(field.value.clone()));
        }
    }
}

fn form_files(c: &Classification, request: &Request, raw: &mut Map<String, Value>) {
    let Some(form) = &request.form else {
        return;
    };
    for name in &c.files {
        for file in form.files.iter().filter(|f| f.field_name.as_ref() == Some(name)) {
            raw.insert(name.clone(), Value::String(base64_bytes::encode(&file.content)));
        }
    }
}

/// Positional uploads pop files in arrival order; the catch-all takes the rest.
fn upload_files(
    c: &Classification,
    request: &Request,
    raw: &mut Map<String, Value>,
) -> anyhow::Result<()> {
    let Some(form) = &request.form else {
        return Ok(());
    };
    if form.files.is_empty() {
        return Ok(());
    }
    let mut remaining = form.files.iter().map(UploadFile::from);
    for name in &c.upload_files {
        match remaining.next() {
            Some(file) => {
                raw.insert(name.clone(), serde_json::to_value(file)?);
            }
            None => return Ok(()),
        }
    }
    if let Some(name) = &c.upload_files_param {
        let rest = remaining.collect::<Vec<_>>();
        raw.insert(name.clone(), serde_json::to_value(rest)?);
    }
    Ok(())
}

/// Header keys are lowercased; a declared `x_token` also picks up `x-token`.
fn headers(c: &Classification, request: &Request, raw: &mut Map<String, Value>) {
    for (name, value) in &request.headers {
        raw.insert(name.to_ascii_lowercase(), Value::String(value.clone()));
    }
    for name in &c.headers {
        if raw.contains_key(name) {
            continue;
        }
        if let Some(value) = request.get_header(&name.replace('_', "-")) {
            raw.insert(name.clone(), Value::String(value.to_string()));
        }
    }
}

/// Resolve, validate and merge the route's parameters into `data`.
pub fn resolve(route: &Route, data: &mut Data<'_>) -> anyhow::Result<()> {
    if route.params().is_empty() {
        return Ok(());
    }
    let raw = raw_params(route, data)?;
    let bound = data.app().validator().validate_request(&raw, route.params())?;
    for spec in route.params() {
        if let Some(value) = bound.get(spec.name()) {
            data.insert(spec.name(), value.clone());
        }
    }
    Ok(())
}
