// crates/grid-service/src/lib.rs
// ============================================================================
// Crate: grid-service
// Description: External Service Shell (C12): the registry CRUD HTTP
//              surface, the C2 subscription bridge, the domain adapter
//              contract, and the startup wiring sequence that constructs
//              the rest of the control plane.
// Purpose: The one crate that turns every other crate's library code into
//          a running process.
// ============================================================================

//! ## Overview
//! [`router`] builds the full `axum::Router` spec.md §6 describes over a
//! [`state::AppState`]; [`wiring::boot`] and [`wiring::demo`] build that
//! state (and, in the real-boot case, the monitoring loop alongside it).
//! `main.rs` is a thin binary: resolve [`grid_config::GridConfig`], boot
//! one of the two sequences, spawn the monitoring loop if present, serve
//! the router, and await a cooperative shutdown signal.

pub mod adapter;
pub mod error;
pub mod routes;
pub mod state;
pub mod wiring;

use std::time::Duration;

use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::AllowOrigin;
use tower_http::cors::CorsLayer;

pub use state::AppState;
pub use wiring::BootError;
pub use wiring::Booted;
pub use wiring::StorePaths;

/// Builds the HTTP surface spec.md §6 describes: registry CRUD, the tool
/// catalog, the subscription bridge, and the command ingress.
///
/// `allowed_origin` is the single local-development origin spec.md §4.12's
/// CORS policy names; `None` disables the CORS layer entirely (e.g. for a
/// same-origin test harness).
#[must_use]
pub fn router(state: AppState, allowed_origin: Option<&str>) -> Router {
    let mut app = Router::new()
        .route("/health", get(routes::registry::health))
        .route("/register", post(routes::registry::register))
        .route("/unregister/:id", delete(routes::registry::unregister))
        .route("/heartbeat/:id", post(routes::registry::heartbeat))
        .route("/servers", get(routes::registry::list_servers))
        .route("/servers/:id", get(routes::registry::get_server))
        .route("/tools", get(routes::tools::list_tools))
        .route("/tools/:name", get(routes::tools::get_tool))
        .route("/subscribe/:channel", get(routes::subscriptions::subscribe))
        .route("/commands", post(routes::subscriptions::commands))
        .with_state(state);

    if let Some(origin) = allowed_origin {
        if let Ok(origin) = origin.parse() {
            let cors = CorsLayer::new()
                .allow_origin(AllowOrigin::exact(origin))
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST, axum::http::Method::DELETE])
                .allow_headers([axum::http::header::CONTENT_TYPE])
                .max_age(Duration::from_secs(3600));
            app = app.layer(cors);
        }
    }
    app
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use grid_bus::EventBus;
    use grid_core::SimulationFacade;
    use grid_registry::Registry;
    use grid_registry::ToolDispatcher;

    use super::*;

    fn empty_state() -> AppState {
        AppState {
            facade: Arc::new(Mutex::new(SimulationFacade::with_canonical_case())),
            bus: Arc::new(EventBus::new()),
            registry: Arc::new(Registry::new()),
            dispatcher: Arc::new(ToolDispatcher::new()),
            agent: None,
        }
    }

    #[test]
    fn router_builds_with_no_cors_layer_when_origin_is_none() {
        let _app = router(empty_state(), None);
    }

    #[test]
    fn router_builds_with_a_cors_layer_for_a_valid_origin() {
        let _app = router(empty_state(), Some("http://localhost:5173"));
    }

    #[test]
    fn router_ignores_an_unparseable_origin_rather_than_panicking() {
        let _app = router(empty_state(), Some("not a valid origin \n"));
    }
}
