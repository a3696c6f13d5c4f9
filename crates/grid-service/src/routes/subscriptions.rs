// crates/grid-service/src/routes/subscriptions.rs
// ============================================================================
// Module: Subscription HTTP Routes
// Description: Server-sent-event bridges from C2's `grid_state`,
//              `agent_log`, and `guardian_event` channels, plus the
//              `commands` client-to-server ingress.
// Purpose: Give a dashboard client the long-lived, server-push half of
//          spec.md §6's subscription surface without adding a websocket
//          dependency this workspace otherwise has no use for.
// Dependencies: axum, grid-bus, grid-agent
// ============================================================================

//! ## Overview
//! `grid_state`, `agent_log`, and `guardian_event` are push-only from the
//! service's point of view, so each is exposed as a `GET` SSE stream over
//! [`grid_bus::EventBus::subscribe`]. `commands` is the one channel a
//! client pushes into; it is a plain `POST` rather than a stream, since a
//! command is a single request-response exchange, not a subscription.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::Path;
use axum::extract::State;
use axum::response::sse::Event;
use axum::response::sse::KeepAlive;
use axum::response::Sse;
use axum::Json;
use futures::stream::Stream;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ServiceError;
use crate::state::AppState;

/// `GET /subscribe/{channel}`: streams every message published on
/// `channel` as a `text/event-stream` of JSON payloads.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidRequest`] if `channel` is not one of
/// `grid_state`, `agent_log`, or `guardian_event`.
pub async fn subscribe(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServiceError> {
    if !grid_bus::REQUIRED_CHANNELS.contains(&channel.as_str()) {
        return Err(ServiceError::InvalidRequest(format!(
            "unknown subscription channel '{channel}', expected one of {:?}",
            grid_bus::REQUIRED_CHANNELS
        )));
    }

    let subscription = state.bus.subscribe(&channel);
    let stream = futures::stream::unfold(subscription, |mut subscription| async move {
        subscription.recv().await.map(|message| (Ok(Event::default().data(message.to_string())), subscription))
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default().interval(Duration::from_secs(15))))
}

/// Body accepted by `POST /commands`: spec.md §6's `{action, payload}`
/// client-to-server command shape.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub action: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub result: serde_json::Value,
}

/// `POST /commands`. Recognized actions: `nl_query` (forwards
/// `payload.query` to the strategic agent) and `trigger_scenario`
/// (nudges one load by `payload.factor`, for demo and test scenarios).
///
/// # Errors
///
/// Returns [`ServiceError::UnrecognizedAction`] for any other `action`,
/// [`ServiceError::InvalidRequest`] if the payload is malformed for the
/// recognized action, and [`ServiceError::Agent`] if `nl_query` fails.
pub async fn commands(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, ServiceError> {
    match request.action.as_str() {
        "nl_query" => {
            let query = request
                .payload
                .get("query")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| ServiceError::InvalidRequest("nl_query requires a string 'query' field".to_string()))?;
            let agent = state
                .agent
                .as_ref()
                .ok_or_else(|| ServiceError::InvalidRequest("nl_query is unavailable in demo mode".to_string()))?;
            let answer = agent.query(query, false).await?;
            Ok(Json(CommandResponse { result: serde_json::json!({"answer": answer}) }))
        }
        "trigger_scenario" => {
            let load_id = request
                .payload
                .get("load_id")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| ServiceError::InvalidRequest("trigger_scenario requires a string 'load_id' field".to_string()))?;
            let factor = request.payload.get("factor").and_then(serde_json::Value::as_f64).unwrap_or(1.0);
            let mut facade = state.facade.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            facade
                .scale_load(&grid_core::LoadId::from(load_id), factor)
                .map_err(|err| ServiceError::InvalidRequest(err.to_string()))?;
            Ok(Json(CommandResponse { result: serde_json::json!({"scaled": load_id, "factor": factor}) }))
        }
        other => Err(ServiceError::UnrecognizedAction(other.to_string())),
    }
}
