// crates/grid-service/src/state.rs
// ============================================================================
// Module: Shared Application State
// Description: The handles every axum route handler needs, cloned cheaply
//              behind `Arc`s.
// Purpose: One `Clone`-able struct instead of threading a dozen individual
//          handles through every handler signature.
// Dependencies: grid-bus, grid-registry, grid-agent, grid-guardian
// ============================================================================

use std::sync::Arc;

use grid_agent::StrategicAgent;
use grid_bus::EventBus;
use grid_registry::Registry;
use grid_registry::SharedFacade;
use grid_registry::ToolDispatcher;

/// Handles shared across the HTTP surface.
///
/// # Invariants
/// - `agent` is `None` in demo mode (spec.md §4.12's mock publisher path),
///   in which case `/commands` rejects `nl_query` rather than panicking.
#[derive(Clone)]
pub struct AppState {
    pub facade: SharedFacade,
    pub bus: Arc<EventBus>,
    pub registry: Arc<Registry>,
    pub dispatcher: Arc<ToolDispatcher>,
    pub agent: Option<Arc<StrategicAgent>>,
}
