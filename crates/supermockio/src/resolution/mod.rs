//! Picks the example payloads for one response definition.
//!
//! The [`ExampleResolutionEngine`] walks an ordered list of [`ExampleRule`]s
//! and returns the first result. The chain ends with the AI rule, which
//! never defers, so resolution always yields at least one example.

mod rules;

use crate::ai::AiGateway;
use crate::schema::RefResolver;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub use rules::{
    json_content, ExampleRule, NAME_AI_DISABLED, NAME_AI_ERROR, NAME_AI_GENERATED, NAME_DEFAULT,
    NAME_NO_SCHEMA,
};

/// Returned when every rule declined or failed.
pub const NAME_CHAIN_FALLBACK: &str = "fallback-error";

/// Operation metadata passed along to the rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationMeta {
    pub path: String,
    pub method: String,
    pub operation_id: Option<String>,
    pub description: Option<String>,
}

impl OperationMeta {
    pub fn from_operation(path: &str, method: &str, operation: &Value) -> Self {
        let text = |key: &str| operation.get(key).and_then(Value::as_str).map(String::from);
        Self {
            path: path.to_string(),
            method: method.to_string(),
            operation_id: text("operationId"),
            description: text("description").or_else(|| text("summary")),
        }
    }
}

/// Input of one resolution.
#[derive(Clone, Copy)]
pub struct ExampleResolutionContext<'a, 'doc> {
    pub response_definition: &'a Value,
    pub openapi: &'a RefResolver<'doc>,
    pub operation: Option<&'a OperationMeta>,
}

impl<'a, 'doc> ExampleResolutionContext<'a, 'doc> {
    pub fn new(
        response_definition: &'a Value,
        openapi: &'a RefResolver<'doc>,
        operation: Option<&'a OperationMeta>,
    ) -> Self {
        Self {
            response_definition,
            openapi,
            operation,
        }
    }
}

/// Examples with their names, as parallel lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExampleResolutionResult {
    pub examples: Vec<Value>,
    pub example_names: Vec<Option<String>>,
}

impl ExampleResolutionResult {
    pub fn single(example: Value, name: Option<String>) -> Self {
        Self {
            examples: vec![example],
            example_names: vec![name],
        }
    }

    pub fn push(&mut self, example: Value, name: Option<String>) {
        self.examples.push(example);
        self.example_names.push(name);
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Consume into `(example, name)` pairs.
    pub fn into_pairs(self) -> impl Iterator<Item = (Value, Option<String>)> {
        self.examples.into_iter().zip(self.example_names)
    }
}

/// Evaluates the rule chain.
pub struct ExampleResolutionEngine {
    rules: Vec<ExampleRule>,
    ai: Arc<AiGateway>,
}

impl ExampleResolutionEngine {
    pub fn new(ai: Arc<AiGateway>) -> Self {
        Self::with_rules(ExampleRule::default_chain(), ai)
    }

    pub fn with_rules(rules: Vec<ExampleRule>, ai: Arc<AiGateway>) -> Self {
        Self { rules, ai }
    }

    pub async fn resolve(&self, ctx: &ExampleResolutionContext<'_, '_>) -> ExampleResolutionResult {
        for rule in &self.rules {
            match rule.apply(ctx, &self.ai).await {
                Ok(Some(result)) if !result.is_empty() => {
                    debug!(rule = rule.name(), examples = result.len(), "Examples resolved");
                    return result;
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!(rule = rule.name(), "Example rule failed: {}", e);
                    continue;
                }
            }
        }

        ExampleResolutionResult::single(json!({}), Some(NAME_CHAIN_FALLBACK.to_string()))
    }
}
