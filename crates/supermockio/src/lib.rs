//! SuperMockio: mock servers generated from OpenAPI documents.
//!
//! An uploaded document is walked once at ingestion: every operation and
//! declared status code gets one or more stored example responses, taken
//! from the document's own examples or generated from its schemas. Mock
//! traffic is then answered from those stored records.

pub mod ai;
pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod resolution;
pub mod schema;
pub mod store;

pub use api::{AppState, MockioServer};
pub use config::Config;
