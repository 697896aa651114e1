//! HTTP surface: service management under `/api/services` and mock
//! traffic under `/mocks`.
//!
//! Admin routes require an `X-User-Id` header. Mock routes are open and
//! reply with the stored status and content verbatim.

mod auth;
mod handlers;
mod router;
mod server;
mod state;
mod types;

pub use auth::{AuthContext, Permission, HEADER_USER_ID, HEADER_USER_ROLES};
pub use handlers::mocks::{HEADER_EXAMPLE, HEADER_STATUS};
pub use handlers::services::parse_document;
pub use router::{route_request, ServiceIdentity};
pub use server::MockioServer;
pub use state::AppState;
pub use types::{ApiResponse, Envelope};
