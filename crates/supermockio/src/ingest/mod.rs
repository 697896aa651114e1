//! Turns an uploaded document into stored example responses.
//!
//! Every `(path, method, status)` triple is an independent unit. A unit that
//! fails still stores a fallback record, so one malformed operation never
//! costs the rest of the document.

use crate::ai::AiGateway;
use crate::resolution::{ExampleResolutionContext, ExampleResolutionEngine, OperationMeta};
use crate::schema::{ExampleGenerator, Parameter, PathGenerator, RefResolver};
use crate::store::{ResponseRecord, ResponseStore, Service};
use futures::future::join_all;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Path-item keys treated as operations.
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

pub const NAME_EMPTY_FALLBACK: &str = "fallback";
pub const NAME_ERROR_FALLBACK: &str = "error-fallback";

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub operations: usize,
    pub records: usize,
    pub fallbacks: usize,
}

impl IngestReport {
    fn absorb(&mut self, unit: UnitOutcome) {
        self.records += unit.records;
        self.fallbacks += unit.fallbacks;
    }
}

#[derive(Debug, Default)]
struct UnitOutcome {
    records: usize,
    fallbacks: usize,
}

/// An operation found in `paths`.
struct PendingOperation<'d> {
    meta: OperationMeta,
    path_item: &'d Value,
    operation: &'d Value,
}

/// Map a `responses` key to a status code.
///
/// Numeric codes are taken as-is, `default` becomes 200 and a range such
/// as `4XX` becomes its first code. Anything else is not a status.
pub fn status_from_key(key: &str) -> Option<u16> {
    if key == "default" {
        return Some(200);
    }
    if let Ok(code) = key.parse::<u16>() {
        return (100..=599).contains(&code).then_some(code);
    }
    match key.as_bytes() {
        [class @ b'1'..=b'5', b'X' | b'x', b'X' | b'x'] => Some(u16::from(class - b'0') * 100),
        _ => None,
    }
}

fn is_fallback(name: Option<&str>) -> bool {
    name.map_or(false, |n| n.starts_with("fallback") || n == NAME_ERROR_FALLBACK)
}

/// Walks a document and persists one record per resolved example.
pub struct ServiceIngestor {
    engine: Arc<ExampleResolutionEngine>,
    paths: PathGenerator,
    responses: Arc<dyn ResponseStore>,
}

impl ServiceIngestor {
    pub fn new(
        ai: Arc<AiGateway>,
        generator: Arc<ExampleGenerator>,
        responses: Arc<dyn ResponseStore>,
    ) -> Self {
        Self {
            engine: Arc::new(ExampleResolutionEngine::new(Arc::clone(&ai))),
            paths: PathGenerator::new(generator, ai),
            responses,
        }
    }

    /// Generate and store responses for every operation of `service`.
    ///
    /// Completes when all units have settled. There is no transaction: a
    /// crash part way leaves the records stored so far.
    pub async fn ingest(&self, service: &Service) -> IngestReport {
        let refs = RefResolver::new(&service.openapi);
        let operations = collect_operations(&service.openapi);

        info!(
            service = %service.name,
            version = %service.version,
            operations = operations.len(),
            "Generating example responses"
        );

        let pending: Vec<_> = operations
            .iter()
            .map(|op| self.ingest_operation(service.id, op, &refs))
            .collect();
        let outcomes = join_all(pending).await;

        let mut report = IngestReport {
            operations: operations.len(),
            ..Default::default()
        };
        for unit in outcomes.into_iter().flatten() {
            report.absorb(unit);
        }

        info!(
            service = %service.name,
            records = report.records,
            fallbacks = report.fallbacks,
            refs_cached = refs.cached_len(),
            "Example generation finished"
        );
        report
    }

    async fn ingest_operation(
        &self,
        service_id: Uuid,
        op: &PendingOperation<'_>,
        refs: &RefResolver<'_>,
    ) -> Vec<UnitOutcome> {
        let Some(responses) = op.operation.get("responses").and_then(Value::as_object) else {
            warn!(
                path = %op.meta.path,
                method = %op.meta.method,
                "Operation declares no responses"
            );
            return Vec::new();
        };

        // The concrete path is computed once and shared by every status code
        let concrete_path = match Parameter::collect(
            op.path_item.get("parameters"),
            op.operation.get("parameters"),
            refs,
        ) {
            Ok(parameters) => Some(
                self.paths
                    .generate_path(&op.meta.path, &parameters, refs)
                    .await,
            ),
            Err(e) => {
                error!(
                    path = %op.meta.path,
                    method = %op.meta.method,
                    "Cannot resolve path parameters: {}", e
                );
                None
            }
        };

        let units: Vec<_> = responses
            .iter()
            .filter_map(|(key, definition)| {
                let Some(status) = status_from_key(key) else {
                    warn!(
                        path = %op.meta.path,
                        method = %op.meta.method,
                        "Skipping unrecognised response key '{}'", key
                    );
                    return None;
                };
                Some(self.ingest_response(
                    service_id,
                    op,
                    status,
                    definition,
                    concrete_path.as_deref(),
                    refs,
                ))
            })
            .collect();

        join_all(units).await
    }

    async fn ingest_response(
        &self,
        service_id: Uuid,
        op: &PendingOperation<'_>,
        status: u16,
        definition: &Value,
        concrete_path: Option<&str>,
        refs: &RefResolver<'_>,
    ) -> UnitOutcome {
        let error_fallback = |path: &str| {
            ResponseRecord::new(
                service_id,
                path,
                &op.meta.method,
                status,
                json!({"error": "Error generating example"}),
                Some(NAME_ERROR_FALLBACK.to_string()),
            )
        };

        let Some(path) = concrete_path else {
            return self.persist(vec![error_fallback(&op.meta.path)]);
        };

        let definition = match definition.get("$ref").and_then(Value::as_str) {
            Some(reference) => match refs.resolve_ref(reference) {
                Ok(target) => target,
                Err(e) => {
                    error!(
                        path = %op.meta.path,
                        method = %op.meta.method,
                        status,
                        "Cannot resolve response definition: {}", e
                    );
                    return self.persist(vec![error_fallback(path)]);
                }
            },
            None => definition,
        };

        let ctx = ExampleResolutionContext::new(definition, refs, Some(&op.meta));
        let result = self.engine.resolve(&ctx).await;

        let records: Vec<ResponseRecord> = if result.is_empty() {
            vec![ResponseRecord::new(
                service_id,
                path,
                &op.meta.method,
                status,
                json!({}),
                Some(NAME_EMPTY_FALLBACK.to_string()),
            )]
        } else {
            result
                .into_pairs()
                .map(|(content, name)| {
                    ResponseRecord::new(service_id, path, &op.meta.method, status, content, name)
                })
                .collect()
        };

        debug!(
            operation_id = op.meta.operation_id.as_deref().unwrap_or("-"),
            path = %path,
            method = %op.meta.method,
            status,
            examples = records.len(),
            "Responses generated"
        );
        self.persist(records)
    }

    fn persist(&self, records: Vec<ResponseRecord>) -> UnitOutcome {
        let fallbacks = records
            .iter()
            .filter(|r| is_fallback(r.example_name.as_deref()))
            .count();
        match self.responses.persist_responses(records) {
            Ok(stored) => UnitOutcome {
                records: stored,
                fallbacks,
            },
            Err(e) => {
                error!("Failed to persist responses: {:#}", e);
                UnitOutcome::default()
            }
        }
    }
}

fn collect_operations(openapi: &Value) -> Vec<PendingOperation<'_>> {
    let Some(paths) = openapi.get("paths").and_then(Value::as_object) else {
        warn!("Document has no paths");
        return Vec::new();
    };

    let mut operations = Vec::new();
    for (template, path_item) in paths {
        for method in HTTP_METHODS {
            let Some(operation) = path_item.get(method).filter(|op| op.is_object()) else {
                continue;
            };
            operations.push(PendingOperation {
                meta: OperationMeta::from_operation(template, method, operation),
                path_item,
                operation,
            });
        }
    }
    operations
}
