// crates/grid-service/src/error.rs
// ============================================================================
// Module: Service Errors
// Description: Error type for the HTTP surface, and its translation to an
//              HTTP response.
// Purpose: Give every route handler one `Result` type whose `Err` arm
//          already knows how to render itself as a structured response.
// Dependencies: axum, grid-registry, grid-config
// ============================================================================

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;

/// Errors the HTTP surface reports to a caller.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The registry rejected the operation (unknown id, invalid filter, …).
    #[error("registry error: {0}")]
    Registry(#[from] grid_registry::RegistryError),
    /// A request body failed shape or value validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// A `commands` payload named an action this service does not
    /// recognize.
    #[error("unrecognized command action: {0}")]
    UnrecognizedAction(String),
    /// The strategic agent could not complete the request.
    #[error("agent error: {0}")]
    Agent(#[from] grid_agent::AgentError),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Registry(grid_registry::RegistryError::UnknownServer(_) | grid_registry::RegistryError::UnknownTool(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::InvalidRequest(_) | Self::UnrecognizedAction(_) => StatusCode::BAD_REQUEST,
            Self::Registry(_) | Self::Agent(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}
