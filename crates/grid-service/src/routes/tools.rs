// crates/grid-service/src/routes/tools.rs
// ============================================================================
// Module: Tool Catalog HTTP Routes
// Description: Read-only view of C6's flattened tool catalog.
// Purpose: What the strategic agent's `ToolCatalog::refresh` fetches on
//          bootstrap, and what an operator dashboard can browse.
// Dependencies: axum, grid-registry
// ============================================================================

use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ServiceError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ToolView {
    pub external_name: String,
    pub server_id: String,
    pub description: String,
    pub safety_class: grid_contract::SafetyClass,
    pub input_schema: serde_json::Value,
}

impl From<grid_registry::CatalogEntry> for ToolView {
    fn from(entry: grid_registry::CatalogEntry) -> Self {
        Self {
            external_name: entry.external_name,
            server_id: entry.server_id.to_string(),
            description: entry.descriptor.description,
            safety_class: entry.descriptor.safety_class,
            input_schema: entry.descriptor.input_schema,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ToolsQuery {
    pub domain: Option<String>,
}

/// `GET /tools?domain`. `domain` is accepted for spec.md §6's filter
/// surface; the catalog itself is already a flat, domain-agnostic view,
/// so this filters by matching server records in the registry.
pub async fn list_tools(State(state): State<AppState>, Query(query): Query<ToolsQuery>) -> Json<Vec<ToolView>> {
    let catalog = state.dispatcher.full_catalog();
    let views = match query.domain {
        None => catalog.into_iter().map(ToolView::from).collect(),
        Some(domain) => catalog
            .into_iter()
            .filter(|entry| {
                state
                    .registry
                    .lookup(&entry.server_id)
                    .is_some_and(|record| record.domain.0 == domain)
            })
            .map(ToolView::from)
            .collect(),
    };
    Json(views)
}

/// `GET /tools/{name}`: looks up one tool by its flattened external name.
///
/// # Errors
///
/// Returns [`ServiceError::Registry`] with [`grid_registry::RegistryError::UnknownTool`]
/// if no catalog entry has that external name.
pub async fn get_tool(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<ToolView>, ServiceError> {
    state
        .dispatcher
        .full_catalog()
        .into_iter()
        .find(|entry| entry.external_name == name)
        .map(|entry| Json(ToolView::from(entry)))
        .ok_or(ServiceError::Registry(grid_registry::RegistryError::UnknownTool(name)))
}
