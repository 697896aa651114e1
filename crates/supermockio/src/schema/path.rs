//! Concrete path synthesis for templated operation paths.

use super::generate::ExampleGenerator;
use super::refs::RefResolver;
use crate::ai::{clean_reply, AiGateway};
use crate::error::SchemaError;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// A path parameter of one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub schema: Value,
    pub example: Option<Value>,
}

impl Parameter {
    /// Collect the `in: path` parameters that apply to an operation.
    ///
    /// Path-item parameters come first; an operation parameter with the same
    /// name replaces it. `$ref` entries are resolved.
    pub fn collect(
        path_item_parameters: Option<&Value>,
        operation_parameters: Option<&Value>,
        refs: &RefResolver<'_>,
    ) -> Result<Vec<Parameter>, SchemaError> {
        let mut collected: Vec<Parameter> = Vec::new();
        for source in [path_item_parameters, operation_parameters].into_iter().flatten() {
            for parameter in Self::array_from(source, refs)? {
                match collected.iter_mut().find(|p| p.name == parameter.name) {
                    Some(existing) => *existing = parameter,
                    None => collected.push(parameter),
                }
            }
        }
        Ok(collected)
    }

    /// Path parameters declared in one `parameters` array.
    pub fn array_from(
        parameters: &Value,
        refs: &RefResolver<'_>,
    ) -> Result<Vec<Parameter>, SchemaError> {
        let Some(entries) = parameters.as_array() else {
            return Ok(Vec::new());
        };

        let mut result = Vec::new();
        for entry in entries {
            let entry = match entry.get("$ref").and_then(Value::as_str) {
                Some(reference) => refs.resolve_ref(reference)?,
                None => entry,
            };
            if entry.get("in").and_then(Value::as_str) != Some("path") {
                continue;
            }
            let Some(name) = entry.get("name").and_then(Value::as_str) else {
                continue;
            };
            result.push(Parameter {
                name: name.to_string(),
                schema: entry.get("schema").cloned().unwrap_or(Value::Null),
                example: entry.get("example").filter(|v| !v.is_null()).cloned(),
            });
        }
        Ok(result)
    }
}

/// Fills `{name}` segments of a path template with example values.
#[derive(Clone)]
pub struct PathGenerator {
    generator: Arc<ExampleGenerator>,
    ai: Arc<AiGateway>,
}

impl PathGenerator {
    pub fn new(generator: Arc<ExampleGenerator>, ai: Arc<AiGateway>) -> Self {
        Self { generator, ai }
    }

    /// Substitute every `{name}` segment of `template`.
    ///
    /// Sources, in order: the parameter example, the schema `default`, the
    /// AI collaborator (when enabled), then a generated example. Segments
    /// without a matching parameter are left untouched.
    pub async fn generate_path(
        &self,
        template: &str,
        parameters: &[Parameter],
        refs: &RefResolver<'_>,
    ) -> String {
        if parameters.is_empty() {
            return template.to_string();
        }

        let mut segments = Vec::new();
        for segment in template.split('/') {
            let placeholder = segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'));
            let parameter =
                placeholder.and_then(|name| parameters.iter().find(|p| p.name == name));

            match parameter {
                Some(parameter) => {
                    segments.push(self.parameter_value(template, parameter, refs).await)
                }
                None => segments.push(segment.to_string()),
            }
        }
        segments.join("/")
    }

    async fn parameter_value(
        &self,
        template: &str,
        parameter: &Parameter,
        refs: &RefResolver<'_>,
    ) -> String {
        if let Some(example) = &parameter.example {
            return render_segment(example);
        }

        let schema = match parameter.schema.get("$ref").and_then(Value::as_str) {
            Some(reference) => match refs.resolve_ref(reference) {
                Ok(target) => target,
                Err(e) => {
                    warn!("Path parameter '{}': {}", parameter.name, e);
                    &parameter.schema
                }
            },
            None => &parameter.schema,
        };

        if let Some(default) = schema.get("default").filter(|v| !v.is_null()) {
            return render_segment(default);
        }

        if self.ai.is_enabled() {
            let prompt = format!(
                "I want you to generate an example value for my path param: {} used in this OpenAPI path: {}. Return only the generated value.",
                parameter.name, template
            );
            match self.ai.ask(&prompt).await {
                Ok(reply) => {
                    let value = clean_reply(&reply);
                    let value = value.trim_matches('"').trim();
                    if !value.is_empty() && !value.contains('/') {
                        debug!("AI value for path parameter '{}': {}", parameter.name, value);
                        return value.to_string();
                    }
                    warn!(
                        "Unusable AI value for path parameter '{}', generating from schema",
                        parameter.name
                    );
                }
                Err(e) => warn!(
                    "AI value for path parameter '{}' failed: {}",
                    parameter.name, e
                ),
            }
        }

        render_segment(&self.generator.generate(schema, refs))
    }
}

/// Strings are used verbatim; anything else as its JSON text.
fn render_segment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
