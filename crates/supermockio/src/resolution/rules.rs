//! Example resolution strategies.
//!
//! Each rule either produces examples, or returns `Ok(None)` to let the next
//! rule try. The AI rule is terminal and always produces a result.

use super::{ExampleResolutionContext, ExampleResolutionResult};
use crate::ai::{parse_json_reply, AiGateway};
use crate::error::SchemaError;
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const NAME_DEFAULT: &str = "default";
pub const NAME_AI_GENERATED: &str = "aiGenerated";
pub const NAME_AI_DISABLED: &str = "fallback-ai-disabled";
pub const NAME_AI_ERROR: &str = "fallback-ai-error";
pub const NAME_NO_SCHEMA: &str = "fallback-no-schema";

/// A strategy in the resolution chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleRule {
    /// `content[json].example`
    SingleExample,
    /// `content[json].examples`, a map of named examples
    MultipleExamples,
    /// Ask the AI collaborator for an example matching `content[json].schema`
    AiGeneration,
}

impl ExampleRule {
    /// The default chain, in evaluation order.
    pub fn default_chain() -> Vec<ExampleRule> {
        vec![
            ExampleRule::SingleExample,
            ExampleRule::MultipleExamples,
            ExampleRule::AiGeneration,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExampleRule::SingleExample => "single-example",
            ExampleRule::MultipleExamples => "multiple-examples",
            ExampleRule::AiGeneration => "ai-generation",
        }
    }

    pub async fn apply(
        &self,
        ctx: &ExampleResolutionContext<'_, '_>,
        ai: &AiGateway,
    ) -> Result<Option<ExampleResolutionResult>, SchemaError> {
        match self {
            ExampleRule::SingleExample => Ok(single_example(ctx)),
            ExampleRule::MultipleExamples => multiple_examples(ctx),
            ExampleRule::AiGeneration => Ok(Some(ai_generation(ctx, ai).await)),
        }
    }
}

/// The JSON media-type entry of a response definition.
///
/// `application/json` wins; otherwise the first media type mentioning json.
pub fn json_content(response_definition: &Value) -> Option<&Value> {
    let content = response_definition.get("content")?.as_object()?;
    content.get("application/json").or_else(|| {
        content
            .iter()
            .find(|(media_type, _)| media_type.contains("json"))
            .map(|(_, entry)| entry)
    })
}

fn single_example(ctx: &ExampleResolutionContext<'_, '_>) -> Option<ExampleResolutionResult> {
    let example = json_content(ctx.response_definition)?
        .get("example")
        .filter(|v| !v.is_null())?;
    Some(ExampleResolutionResult::single(
        example.clone(),
        Some(NAME_DEFAULT.to_string()),
    ))
}

fn multiple_examples(
    ctx: &ExampleResolutionContext<'_, '_>,
) -> Result<Option<ExampleResolutionResult>, SchemaError> {
    let Some(examples) = json_content(ctx.response_definition)
        .and_then(|content| content.get("examples"))
        .and_then(Value::as_object)
    else {
        return Ok(None);
    };

    let mut result = ExampleResolutionResult::default();
    for (name, entry) in examples {
        let entry = match entry.get("$ref").and_then(Value::as_str) {
            Some(reference) => match ctx.openapi.resolve_ref(reference) {
                Ok(target) => target,
                Err(e) => {
                    warn!("Skipping example '{}': {}", name, e);
                    continue;
                }
            },
            None => entry,
        };
        let value = entry.get("value").unwrap_or(entry);
        result.push(value.clone(), Some(name.clone()));
    }

    Ok((!result.is_empty()).then_some(result))
}

async fn ai_generation(ctx: &ExampleResolutionContext<'_, '_>, ai: &AiGateway) -> ExampleResolutionResult {
    let Some(schema) = json_content(ctx.response_definition)
        .and_then(|content| content.get("schema"))
        .filter(|v| !v.is_null())
    else {
        return fallback(NAME_NO_SCHEMA);
    };

    if !ai.is_enabled() {
        return fallback(NAME_AI_DISABLED);
    }

    let resolved = match ctx.openapi.resolve_refs(schema) {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!("Cannot expand schema for AI prompt: {}", e);
            return fallback(NAME_AI_ERROR);
        }
    };

    let prompt = build_prompt(ctx, &resolved);
    let reply = match ai.ask(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(
                path = ctx.operation.map(|op| op.path.as_str()).unwrap_or("-"),
                "AI example generation failed: {}", e
            );
            return fallback(NAME_AI_ERROR);
        }
    };

    match parse_json_reply(&reply) {
        Ok(value) => {
            debug!("AI generated example accepted");
            ExampleResolutionResult::single(value, Some(NAME_AI_GENERATED.to_string()))
        }
        Err(e) => {
            warn!("Discarding AI example: {}", e);
            fallback(NAME_AI_ERROR)
        }
    }
}

fn build_prompt(ctx: &ExampleResolutionContext<'_, '_>, resolved_schema: &Value) -> String {
    let info = ctx.openapi.root().get("info");
    let api_title = info
        .and_then(|i| i.get("title"))
        .and_then(Value::as_str)
        .unwrap_or("API");
    let api_description = info
        .and_then(|i| i.get("description"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let operation_description = ctx
        .operation
        .and_then(|op| op.description.as_deref())
        .unwrap_or("");
    let schema = serde_json::to_string_pretty(resolved_schema).unwrap_or_default();

    format!(
        "I want to generate an OpenAPI response example for an endpoint of the \"{api_title}\".\n\
         Please generate an example that fits the context of this API.\n\
         API Description: {api_description}\n\
         Operation Description: {operation_description}\n\
         Do not add any attributes that are not defined in the schema below.\n\
         Here is the schema definition:\n\
         {schema}\n\
         Provide only the generated example as response."
    )
}

fn fallback(name: &str) -> ExampleResolutionResult {
    ExampleResolutionResult::single(json!({}), Some(name.to_string()))
}
