//! Shared state handed to every request.

use crate::ai::AiGateway;
use crate::config::{Config, StrictMode};
use crate::dispatch::MockDispatcher;
use crate::ingest::ServiceIngestor;
use crate::schema::ExampleGenerator;
use crate::store::{InMemoryResponseStore, InMemoryServiceStore, ResponseStore, ServiceStore};
use std::sync::Arc;

pub struct AppState {
    pub services: Arc<dyn ServiceStore>,
    pub responses: Arc<dyn ResponseStore>,
    pub ingestor: ServiceIngestor,
    pub dispatcher: MockDispatcher,
}

impl AppState {
    /// In-memory stores and the AI gateway described by `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(InMemoryServiceStore::new()),
            Arc::new(InMemoryResponseStore::new()),
            Arc::new(AiGateway::from_config(&config.ai)),
            Arc::new(ExampleGenerator::new()),
            StrictMode::Env,
        )
    }

    pub fn new(
        services: Arc<dyn ServiceStore>,
        responses: Arc<dyn ResponseStore>,
        ai: Arc<AiGateway>,
        generator: Arc<ExampleGenerator>,
        strict: StrictMode,
    ) -> Self {
        Self {
            ingestor: ServiceIngestor::new(ai, generator, Arc::clone(&responses)),
            dispatcher: MockDispatcher::new(
                Arc::clone(&services),
                Arc::clone(&responses),
                strict,
            ),
            services,
            responses,
        }
    }
}
