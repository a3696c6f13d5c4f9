// crates/grid-service/src/wiring.rs
// ============================================================================
// Module: Startup Wiring
// Description: Builds every component in the control plane's construction
//              DAG in dependency order and hands back the pieces the
//              binary needs to serve HTTP and run the monitoring loop
//              (spec.md §4.12, §9's "explicit construction DAG with
//              injection").
// Purpose: Keep the composition root in one place instead of scattered
//          across `main.rs`, so a test can build the same graph with a
//          mock oracle and an in-memory store.
// Dependencies: grid-core, grid-bus, grid-store, grid-registry, grid-zone,
//               grid-guardian, grid-agent, grid-monitor, grid-providers,
//               grid-config
// ============================================================================

//! ## Overview
//! [`boot`] is the real sequence spec.md §4.12 describes: construct C1,
//! build every endpoint via the domain adapter, register each with C4,
//! construct C11/C8/C9, call `C9::discover_tools`, construct C10 with the
//! zone coordinators, and return everything the binary needs to serve
//! HTTP and drive the monitoring loop. [`demo`] is the mock-publisher
//! alternative for `GRID_DEMO_MODE=true`: no LLM oracle, no registry
//! network round trip, just a background task that republishes a
//! synthetic grid-state snapshot on a timer.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use grid_agent::StrategicAgent;
use grid_bus::EventBus;
use grid_config::GridConfig;
use grid_core::telemetry::Metrics;
use grid_core::telemetry::NoopMetrics;
use grid_core::SimulationFacade;
use grid_core::Timestamp;
use grid_guardian::Guardian;
use grid_monitor::MonitorConfig;
use grid_monitor::MonitoringLoop;
use grid_monitor::RandomWalkLoadGenerator;
use grid_providers::HttpLlmClient;
use grid_providers::LlmClient;
use grid_providers::MockLlmClient;
use grid_registry::Registry;
use grid_registry::ServerRecord;
use grid_registry::ToolDispatcher;
use grid_store::AuditLog;
use grid_store::ContextMemory;

use crate::adapter::DomainAdapter;
use crate::adapter::PowerGridAdapter;
use crate::state::AppState;

/// Filesystem locations the real boot sequence persists to.
pub struct StorePaths {
    pub registry_snapshot: Option<std::path::PathBuf>,
    pub audit_db: std::path::PathBuf,
    pub context_db: std::path::PathBuf,
}

impl Default for StorePaths {
    fn default() -> Self {
        Self {
            registry_snapshot: Some(std::path::PathBuf::from("grid_registry_snapshot.json")),
            audit_db: std::path::PathBuf::from("grid_audit.sqlite3"),
            context_db: std::path::PathBuf::from("grid_context.sqlite3"),
        }
    }
}

/// Everything the binary needs after boot: the HTTP app state and the
/// monitoring loop to drive in the background.
pub struct Booted {
    pub app_state: AppState,
    pub monitor: Option<Arc<MonitoringLoop>>,
}

/// Spawns the background task that sweeps `registry` for stale endpoints
/// every [`grid_registry::SWEEP_INTERVAL_SECS`] (spec.md §4.4).
fn spawn_registry_sweeper(registry: Arc<Registry>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(grid_registry::SWEEP_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            registry.sweep_stale(Timestamp::now(), grid_registry::STALE_AFTER_SECS);
        }
    });
}

/// Registers one [`crate::adapter::EndpointBlueprint`] with both the
/// registry (descriptor) and the dispatcher (live instance).
fn register_blueprint(
    registry: &Registry,
    dispatcher: &ToolDispatcher,
    blueprint: crate::adapter::EndpointBlueprint,
    domain: &grid_registry::Domain,
) {
    let id = grid_registry::mint_server_id(&blueprint.kind, blueprint.zone);
    let now = Timestamp::now();
    let record = ServerRecord {
        id: id.clone(),
        kind: blueprint.kind,
        tier: blueprint.tier,
        domain: grid_registry::Domain(domain.0.clone()),
        zone: blueprint.zone,
        tools: blueprint.endpoint.tool_descriptors(),
        status: grid_registry::EndpointStatus::Active,
        registered_at: now,
        last_heartbeat: now,
    };
    if registry.register(record).is_ok() {
        dispatcher.register_live(id, blueprint.endpoint);
    }
}

/// Runs the real boot sequence: construct C1, build and register every
/// endpoint the domain adapter offers, construct C11/C8/C9, discover
/// tools, and construct C10.
///
/// # Errors
///
/// Returns a startup-fatal error if any persistent store fails to open,
/// the oracle configuration is invalid, or the strategic agent cannot
/// reach the registry's tool catalog at bootstrap.
pub async fn boot(config: &GridConfig, paths: &StorePaths) -> Result<Booted, BootError> {
    let facade: grid_registry::SharedFacade = Arc::new(Mutex::new(SimulationFacade::with_canonical_case()));
    let metrics: Arc<dyn Metrics> = Arc::new(NoopMetrics);
    let bus = Arc::new(EventBus::with_metrics(metrics.clone()));

    let audit = Arc::new(AuditLog::open(&paths.audit_db).map_err(BootError::Store)?);
    let context = Arc::new(ContextMemory::open(&paths.context_db).map_err(BootError::Store)?);

    let registry = match &paths.registry_snapshot {
        Some(path) => Arc::new(Registry::with_snapshot_path(path.clone()).map_err(BootError::Registry)?),
        None => Arc::new(Registry::new()),
    };
    let dispatcher = Arc::new(ToolDispatcher::new());

    let adapter = PowerGridAdapter;
    let domain = adapter.domain();
    for blueprint in adapter.create_sensors(&facade) {
        register_blueprint(&registry, &dispatcher, blueprint, &domain);
    }
    for blueprint in adapter.create_actuators(&facade) {
        register_blueprint(&registry, &dispatcher, blueprint, &domain);
    }
    let coordinators = adapter.create_coordinators(&facade, &bus, &audit, &metrics);
    for (zone, coordinator) in &coordinators {
        let id = grid_registry::mint_server_id("zone_coordinator", Some(*zone));
        let now = Timestamp::now();
        let record = ServerRecord {
            id: id.clone(),
            kind: "zone_coordinator".to_string(),
            tier: grid_registry::Tier::Coordination,
            domain: grid_registry::Domain(domain.0.clone()),
            zone: Some(*zone),
            tools: coordinator.tool_descriptors(),
            status: grid_registry::EndpointStatus::Active,
            registered_at: now,
            last_heartbeat: now,
        };
        if registry.register(record).is_ok() {
            let live: Arc<dyn grid_registry::Endpoint> = coordinator.clone();
            dispatcher.register_live(id, live);
        }
    }
    dispatcher.refresh(&registry);

    let oracle: Arc<dyn LlmClient> = Arc::new(HttpLlmClient::new(config.oracle.http.clone()).map_err(BootError::Llm)?);
    let guardian = Arc::new(Guardian::new(oracle.clone(), config.oracle.guardian_model.clone(), bus.clone(), metrics.clone()));

    let registry_url = format!("http://{}:{}", config.registry_host, config.registry_port);
    let agent = Arc::new(StrategicAgent::new(
        oracle,
        config.oracle.strategic_model.clone(),
        context,
        guardian.clone(),
        dispatcher.clone(),
        registry_url,
        bus.clone(),
        metrics.clone(),
    ));
    agent.discover_tools().await.map_err(BootError::Agent)?;

    let monitor = Arc::new(MonitoringLoop::new(
        facade.clone(),
        bus.clone(),
        coordinators,
        agent.clone(),
        metrics,
        Some(Arc::new(RandomWalkLoadGenerator::default())),
        MonitorConfig { interval: config.monitor_interval, ..MonitorConfig::default() },
    ));

    spawn_registry_sweeper(registry.clone());

    Ok(Booted {
        app_state: AppState { facade, bus, registry, dispatcher, agent: Some(agent) },
        monitor: Some(monitor),
    })
}

/// Builds the mock demo publisher alternative: an in-memory registry and
/// dispatcher with no live endpoints, a bus a background task republishes
/// a synthetic grid-state snapshot onto, and no strategic agent (`/commands`
/// with `nl_query` is unavailable in this mode, per [`crate::state::AppState`]'s
/// doc comment).
#[must_use]
pub fn demo() -> Booted {
    let facade: grid_registry::SharedFacade = Arc::new(Mutex::new(SimulationFacade::with_canonical_case()));
    let bus = Arc::new(EventBus::new());
    let registry = Arc::new(Registry::new());
    let dispatcher = Arc::new(ToolDispatcher::new());

    let bus_for_task = bus.clone();
    let facade_for_task = facade.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(5));
        loop {
            ticker.tick().await;
            let snapshot = {
                let facade = facade_for_task.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                grid_monitor::build_snapshot(facade.state(), facade.detect_violations())
            };
            if let Ok(value) = serde_json::to_value(snapshot) {
                let _ = bus_for_task.publish_value("grid_state", value);
            }
        }
    });

    spawn_registry_sweeper(registry.clone());

    Booted { app_state: AppState { facade, bus, registry, dispatcher, agent: None }, monitor: None }
}

/// Errors that abort startup before the service can bind its listener.
#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error("store error: {0}")]
    Store(grid_store::StoreError),
    #[error("registry error: {0}")]
    Registry(grid_registry::RegistryError),
    #[error("oracle error: {0}")]
    Llm(grid_providers::LlmError),
    #[error("agent bootstrap error: {0}")]
    Agent(grid_agent::AgentError),
}

/// Builds a [`MockLlmClient`] oracle for tests that need [`boot`]'s shape
/// without a real LLM endpoint.
#[must_use]
pub fn mock_oracle(responses: Vec<grid_providers::ChatCompletionResponse>) -> Arc<dyn LlmClient> {
    Arc::new(MockLlmClient::new(responses))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_boots_with_no_agent_and_no_monitor() {
        let booted = demo();
        assert!(booted.app_state.agent.is_none());
        assert!(booted.monitor.is_none());
        assert!(booted.app_state.registry.list(&grid_registry::ServerFilter::default()).is_empty());
    }

    #[tokio::test]
    async fn demo_app_state_bus_delivers_published_messages_to_subscribers() {
        let booted = demo();
        let mut sub = booted.app_state.bus.subscribe("grid_state");
        let delivered = booted.app_state.bus.publish_value("grid_state", serde_json::json!({"ok": true}));
        assert_eq!(delivered.unwrap_or_else(|err| panic!("publish: {err}")), 1);
        let received = sub.recv().await;
        assert_eq!(received.unwrap_or_else(|| panic!("expected a message"))["ok"], true);
    }

    #[test]
    fn mock_oracle_builds_a_usable_llm_client_handle() {
        let oracle = mock_oracle(Vec::new());
        assert!(Arc::strong_count(&oracle) >= 1);
    }

    #[test]
    fn store_paths_default_uses_working_directory_relative_files() {
        let paths = StorePaths::default();
        assert_eq!(paths.audit_db, std::path::PathBuf::from("grid_audit.sqlite3"));
        assert_eq!(paths.context_db, std::path::PathBuf::from("grid_context.sqlite3"));
        assert!(paths.registry_snapshot.is_some());
    }
}
