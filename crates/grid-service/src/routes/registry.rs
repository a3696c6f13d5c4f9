// crates/grid-service/src/routes/registry.rs
// ============================================================================
// Module: Registry HTTP Routes
// Description: CRUD surface over C4's registry: register, unregister,
//              heartbeat, list with filters, and single-record lookup.
// Purpose: Give any endpoint process — in this workspace or a future
//          out-of-process one — the same way to join the registry.
// Dependencies: axum, grid-registry, grid-core
// ============================================================================

//! ## Overview
//! A registrant reached only through this HTTP surface (as opposed to one
//! the startup wiring sequence builds in-process via the domain adapter)
//! has a descriptor in the registry but no live [`grid_registry::Endpoint`]
//! handle for the dispatcher to invoke. That degrades to the dispatcher's
//! existing `no_live_server` response rather than a panic, matching
//! spec.md §4.6's fail-closed invocation contract.

use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::Json;
use grid_core::ServerId;
use grid_core::Timestamp;
use grid_core::ZoneId;
use grid_registry::EndpointStatus;
use grid_registry::ServerFilter;
use grid_registry::ServerRecord;
use grid_registry::Tier;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ServiceError;
use crate::state::AppState;

/// Body accepted by `POST /register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub kind: String,
    pub tier: Tier,
    pub domain: String,
    pub zone: Option<ZoneId>,
    #[serde(default)]
    pub tools: Vec<grid_contract::ToolDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: String,
}

/// `POST /register`: mints a server id and stores a new registry record.
///
/// # Errors
///
/// Returns [`ServiceError::Registry`] if snapshot persistence is
/// configured and the write fails.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ServiceError> {
    let id = grid_registry::mint_server_id(&request.kind, request.zone);
    let now = Timestamp::now();
    let record = ServerRecord {
        id: id.clone(),
        kind: request.kind,
        tier: request.tier,
        domain: grid_registry::Domain(request.domain),
        zone: request.zone,
        tools: request.tools,
        status: EndpointStatus::Active,
        registered_at: now,
        last_heartbeat: now,
    };
    state.registry.register(record)?;
    state.dispatcher.refresh(&state.registry);
    Ok(Json(RegisterResponse { id: id.to_string() }))
}

/// `DELETE /unregister/{id}`.
///
/// # Errors
///
/// Returns [`ServiceError::Registry`] if snapshot persistence is
/// configured and the write fails.
pub async fn unregister(State(state): State<AppState>, Path(id): Path<String>) -> Result<(), ServiceError> {
    let id = ServerId::from(id);
    state.registry.unregister(&id)?;
    state.dispatcher.unregister_live(&id);
    state.dispatcher.refresh(&state.registry);
    Ok(())
}

/// `POST /heartbeat/{id}`.
///
/// # Errors
///
/// Returns [`ServiceError::Registry`] if `id` is not registered.
pub async fn heartbeat(State(state): State<AppState>, Path(id): Path<String>) -> Result<(), ServiceError> {
    state.registry.heartbeat(&ServerId::from(id))?;
    Ok(())
}

/// Query parameters accepted by `GET /servers`.
#[derive(Debug, Deserialize, Default)]
pub struct ServersQuery {
    pub tier: Option<Tier>,
    pub domain: Option<String>,
    pub zone: Option<ZoneId>,
    pub status: Option<EndpointStatus>,
}

/// `GET /servers?tier&domain&zone&status`.
pub async fn list_servers(State(state): State<AppState>, Query(query): Query<ServersQuery>) -> Json<Vec<ServerRecord>> {
    let filter = ServerFilter { tier: query.tier, domain: query.domain, zone: query.zone, status: query.status };
    Json(state.registry.list(&filter))
}

/// `GET /servers/{id}`.
///
/// # Errors
///
/// Returns [`ServiceError::Registry`] if `id` is not registered.
pub async fn get_server(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<ServerRecord>, ServiceError> {
    state
        .registry
        .lookup(&ServerId::from(id.clone()))
        .map(Json)
        .ok_or_else(|| ServiceError::Registry(grid_registry::RegistryError::UnknownServer(id)))
}

/// `GET /health`: liveness probe. Always `200 OK` with a small status
/// summary; this process being able to answer at all is the signal.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "registered_servers": state.registry.list(&ServerFilter::default()).len(),
    }))
}
