//! Schema-driven example synthesis.

use super::refs::RefResolver;
use crate::error::SchemaError;
use chrono::{Duration, SecondsFormat, Utc};
use fake::faker::internet::en::{DomainSuffix, SafeEmail};
use fake::faker::lorem::en::Word;
use fake::faker::name::en::FirstName;
use fake::Fake;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

/// Number of elements synthesized for `type: array`.
pub const ARRAY_SAMPLE_LEN: usize = 3;

/// Nesting bound for deeply nested inline schemas.
const MAX_DEPTH: usize = 16;

/// Builds plausible example values from JSON-Schema-like nodes.
///
/// The random source is owned by the generator; use [`ExampleGenerator::with_seed`]
/// for reproducible `oneOf` choices and scalar values.
pub struct ExampleGenerator {
    rng: Mutex<StdRng>,
}

impl Default for ExampleGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ExampleGenerator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Generate an example for `schema`.
    ///
    /// Never fails: an unresolvable reference or an unsupported type turns
    /// the affected value into `{}`. A `$ref` re-entered on its own branch
    /// also yields `{}`, so recursive schemas expand once.
    pub fn generate(&self, schema: &Value, refs: &RefResolver<'_>) -> Value {
        let mut active = Vec::new();
        self.generate_at(schema, refs, 0, &mut active)
    }

    fn generate_at(
        &self,
        schema: &Value,
        refs: &RefResolver<'_>,
        depth: usize,
        active: &mut Vec<String>,
    ) -> Value {
        match self.try_generate(schema, refs, depth, active) {
            Ok(value) => value,
            Err(e @ SchemaError::Reference(_)) => {
                warn!("Example generation degraded to empty object: {}", e);
                empty_object()
            }
            Err(e @ SchemaError::Unsupported(_)) => {
                debug!("Example generation degraded to empty object: {}", e);
                empty_object()
            }
        }
    }

    fn try_generate(
        &self,
        schema: &Value,
        refs: &RefResolver<'_>,
        depth: usize,
        active: &mut Vec<String>,
    ) -> Result<Value, SchemaError> {
        if depth > MAX_DEPTH {
            return Ok(empty_object());
        }

        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            if active.iter().any(|r| r == reference) {
                return Ok(empty_object());
            }
            let target = refs.resolve_ref(reference)?;
            active.push(reference.to_string());
            let value = self.try_generate(target, refs, depth + 1, active);
            active.pop();
            return value;
        }

        let Value::Object(node) = schema else {
            return Err(SchemaError::Unsupported(schema.to_string()));
        };

        if let Some(format) = node.get("format").and_then(Value::as_str) {
            if let Some(value) = self.format_value(format) {
                return Ok(value);
            }
        }

        if let Some(Value::Array(branches)) = node.get("allOf") {
            let mut merged = Map::new();
            for branch in branches {
                if let Value::Object(fields) =
                    self.generate_at(branch, refs, depth + 1, active)
                {
                    merged.extend(fields);
                }
            }
            return Ok(Value::Object(merged));
        }

        for keyword in ["oneOf", "anyOf"] {
            if let Some(Value::Array(branches)) = node.get(keyword) {
                if !branches.is_empty() {
                    let index = self.rng.lock().gen_range(0..branches.len());
                    return Ok(self.generate_at(&branches[index], refs, depth + 1, active));
                }
            }
        }

        let declared_enum = node
            .get("enum")
            .and_then(Value::as_array)
            .and_then(|values| values.first());

        match schema_type(node) {
            Some(kind @ ("string" | "number" | "integer" | "boolean")) => {
                if let Some(first) = declared_enum {
                    return Ok(first.clone());
                }
                Ok(self.scalar_value(kind))
            }
            Some("array") => {
                let items = node.get("items").cloned().unwrap_or_else(empty_object);
                let samples = (0..ARRAY_SAMPLE_LEN)
                    .map(|_| self.generate_at(&items, refs, depth + 1, active))
                    .collect();
                Ok(Value::Array(samples))
            }
            Some("object") => {
                let mut object = Map::new();
                if let Some(Value::Object(properties)) = node.get("properties") {
                    for (name, property) in properties {
                        let value = self.generate_at(property, refs, depth + 1, active);
                        object.insert(name.clone(), value);
                    }
                }
                if let Some(additional @ Value::Object(_)) = node.get("additionalProperties") {
                    match self.generate_at(additional, refs, depth + 1, active) {
                        Value::Object(extra) => object.extend(extra),
                        other => {
                            object.insert("additionalProp1".to_string(), other);
                        }
                    }
                }
                Ok(Value::Object(object))
            }
            other => Err(SchemaError::Unsupported(
                other.unwrap_or("<missing>").to_string(),
            )),
        }
    }

    /// Realistic values for well-known string formats.
    fn format_value(&self, format: &str) -> Option<Value> {
        let mut rng = self.rng.lock();
        let value = match format {
            "date-time" => {
                let seconds_ago = rng.gen_range(0..=7 * 24 * 3600);
                let at = Utc::now() - Duration::seconds(seconds_ago);
                at.to_rfc3339_opts(SecondsFormat::Millis, true)
            }
            "email" => SafeEmail().fake_with_rng::<String, _>(&mut *rng),
            "url" => {
                let host: String = Word().fake_with_rng(&mut *rng);
                let suffix: String = DomainSuffix().fake_with_rng(&mut *rng);
                format!("https://{host}.{suffix}")
            }
            "uuid" => uuid::Builder::from_random_bytes(rng.gen())
                .into_uuid()
                .to_string(),
            _ => return None,
        };
        Some(Value::String(value))
    }

    fn scalar_value(&self, kind: &str) -> Value {
        let mut rng = self.rng.lock();
        match kind {
            "string" => Value::String(FirstName().fake_with_rng(&mut *rng)),
            "number" => {
                let n: f64 = rng.gen::<f64>() * 10.0;
                json!((n * 100.0).round() / 100.0)
            }
            "integer" => json!(rng.gen_range(1..=10_000_i64)),
            _ => Value::Bool(rng.gen_bool(0.5)),
        }
    }
}

/// Declared `type`; for OAS 3.1 type arrays, the first non-null entry.
fn schema_type(node: &Map<String, Value>) -> Option<&str> {
    match node.get("type")? {
        Value::String(kind) => Some(kind.as_str()),
        Value::Array(kinds) => kinds
            .iter()
            .filter_map(Value::as_str)
            .find(|kind| *kind != "null"),
        _ => None,
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}
