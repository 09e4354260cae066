//! Declared handler parameters and their per-source classification.

use serde_json::Value;

use crate::error::ConfigError;

/// Where a handler parameter is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSource {
    Path,
    Query,
    /// Single field read from the JSON body root
    Body,
    /// Object assembled from the JSON body, either from the body root or from
    /// under the parameter's own key when embedded
    BodyModel { embed: bool },
    /// Plain form field
    Field,
    /// Raw bytes of the form file part with the same field name
    File,
    Header,
    Cookie,
    /// Next uploaded file, in arrival order
    UploadFile,
    /// Every uploaded file not taken by an [`ParamSource::UploadFile`]
    UploadFiles,
}

/// One declared handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    name: String,
    source: ParamSource,
    schema: Option<Value>,
    default: Option<Value>,
}

impl ParamSpec {
    fn new(name: impl Into<String>, source: ParamSource) -> Self {
        Self {
            name: name.into(),
            source,
            schema: None,
            default: None,
        }
    }

    pub fn path(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::Path)
    }

    pub fn query(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::Query)
    }

    pub fn body(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::Body)
    }

    /// A body model described by an object schema; its fields are the
    /// schema's `properties`.
    pub fn body_model(name: impl Into<String>, schema: Value) -> Self {
        Self::new(name, ParamSource::BodyModel { embed: false }).schema(schema)
    }

    pub fn field(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::Field)
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::File)
    }

    pub fn header(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::Header)
    }

    pub fn cookie(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::Cookie)
    }

    pub fn upload_file(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::UploadFile)
    }

    pub fn upload_files(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::UploadFiles)
    }

    #[must_use]
    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Value used when the request does not supply one. Parameters without a
    /// default are required.
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Always read a body model from under its own key.
    #[must_use]
    pub fn embed(mut self) -> Self {
        if let ParamSource::BodyModel { embed } = &mut self.source {
            *embed = true;
        }
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn source(&self) -> &ParamSource {
        &self.source
    }

    #[must_use]
    pub fn schema_ref(&self) -> Option<&Value> {
        self.schema.as_ref()
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Field names of a body model, in schema order.
    #[must_use]
    pub fn model_fields(&self) -> Vec<String> {
        self.schema
            .as_ref()
            .and_then(|s| s.get("properties"))
            .and_then(Value::as_object)
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// A body model after the embedding rule has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyModelBinding {
    pub name: String,
    pub embedded: bool,
    pub fields: Vec<String>,
}

/// Parameters partitioned by source, computed once per route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub path: Vec<String>,
    pub query: Vec<String>,
    pub bodies: Vec<String>,
    pub body_models: Vec<BodyModelBinding>,
    pub fields: Vec<String>,
    pub files: Vec<String>,
    pub headers: Vec<String>,
    pub cookies: Vec<String>,
    pub upload_files: Vec<String>,
    pub upload_files_param: Option<String>,
}

impl Classification {
    /// Partition `params` and apply the body embedding rule.
    ///
    /// A body model reads from the body root only when it is the single
    /// body-sourced parameter of the route and was not marked embedded. In
    /// every other case each model reads from under its own key.
    pub fn of(
        route: &str,
        params: &[ParamSpec],
        path_params: &[std::sync::Arc<str>],
    ) -> Result<Self, ConfigError> {
        let invalid = |name: &str, reason: &str| ConfigError::InvalidParam {
            route: route.to_string(),
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let mut c = Classification::default();
        let mut seen: Vec<&str> = Vec::new();
        let mut models: Vec<(&ParamSpec, bool)> = Vec::new();

        for p in params {
            if seen.contains(&p.name()) {
                return Err(invalid(p.name(), "declared more than once"));
            }
            seen.push(p.name());
            let name = p.name.clone();
            match p.source {
                ParamSource::Path => {
                    if !path_params.iter().any(|t| t.as_ref() == p.name()) {
                        return Err(invalid(p.name(), "not a placeholder of the path template"));
                    }
                    c.path.push(name);
                }
                ParamSource::Query => c.query.push(name),
                ParamSource::Body => c.bodies.push(name),
                ParamSource::BodyModel { embed } => models.push((p, embed)),
                ParamSource::Field => c.fields.push(name),
                ParamSource::File => c.files.push(name),
                ParamSource::Header => c.headers.push(name),
                ParamSource::Cookie => c.cookies.push(name),
                ParamSource::UploadFile => c.upload_files.push(name),
                ParamSource::UploadFiles => {
                    if c.upload_files_param.is_some() {
                        return Err(invalid(p.name(), "only one catch-all upload list is allowed"));
                    }
                    c.upload_files_param = Some(name);
                }
            }
        }

        let single = models.len() + c.bodies.len() == 1;
        c.body_models = models
            .into_iter()
            .map(|(p, embed)| BodyModelBinding {
                name: p.name.clone(),
                embedded: !(single && !embed),
                fields: p.model_fields(),
            })
            .collect();

        Ok(c)
    }

    /// True when no parameter reads the request at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Classification::default()
    }
}
