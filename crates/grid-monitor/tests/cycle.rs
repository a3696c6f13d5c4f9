// crates/grid-monitor/tests/cycle.rs
// ============================================================================
// Integration tests: the monitoring loop (C10) wired end to end against a
// real facade, the three zone coordinators, and a mocked strategic agent.
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use grid_agent::StrategicAgent;
use grid_bus::EventBus;
use grid_core::telemetry::NoopMetrics;
use grid_core::ProtectionThresholds;
use grid_core::SimulationFacade;
use grid_core::ZoneId;
use grid_guardian::Guardian;
use grid_monitor::MonitorConfig;
use grid_monitor::MonitoringLoop;
use grid_providers::MockLlmClient;
use grid_registry::ToolDispatcher;
use grid_store::ContextMemory;
use grid_zone::ZoneCoordinator;
use grid_zone::ZoneEngine;

struct Wired {
    monitor: MonitoringLoop,
    facade: Arc<StdMutex<SimulationFacade>>,
    coordinators: BTreeMap<ZoneId, Arc<ZoneCoordinator>>,
}

fn wired_loop(zone_timeout: std::time::Duration) -> Wired {
    let facade = Arc::new(StdMutex::new(SimulationFacade::with_canonical_case()));
    let bus = Arc::new(EventBus::new());

    let mut coordinators = BTreeMap::new();
    for zone in ZoneId::ALL {
        let engine = ZoneEngine::new(zone, Arc::clone(&facade), Arc::clone(&bus), audit(), Arc::new(NoopMetrics));
        coordinators.insert(zone, Arc::new(ZoneCoordinator::new(engine)));
    }

    let guardian = Arc::new(Guardian::new(
        Arc::new(MockLlmClient::always_text("safe")),
        "guardian-model",
        Arc::clone(&bus),
        Arc::new(NoopMetrics),
    ));
    let context = Arc::new(ContextMemory::open_in_memory().expect("open context memory"));
    let dispatcher = Arc::new(ToolDispatcher::new());
    let agent = Arc::new(StrategicAgent::new(
        Arc::new(MockLlmClient::always_text("Handled the escalation.")),
        "strategic-model",
        context,
        guardian,
        dispatcher,
        "http://localhost:9000",
        Arc::clone(&bus),
        Arc::new(NoopMetrics),
    ));

    let config = MonitorConfig { zone_timeout, ..MonitorConfig::default() };
    let monitor =
        MonitoringLoop::new(Arc::clone(&facade), bus, coordinators.clone(), agent, Arc::new(NoopMetrics), None, config);
    Wired { monitor, facade, coordinators }
}

fn audit() -> Arc<grid_store::AuditLog> {
    Arc::new(grid_store::AuditLog::open_in_memory().expect("open audit log"))
}

/// Tightens both the facade's global thresholds (so the monitor's own
/// detection step notices) and every zone engine's own thresholds (so
/// each zone's `execute_safety_rules` agrees) the same way an operator
/// calling `update_protection_settings` on every zone would.
fn tighten_thresholds(wired: &Wired, thresholds: ProtectionThresholds) {
    wired.facade.lock().expect("lock facade").set_thresholds(thresholds);
    for coordinator in wired.coordinators.values() {
        coordinator.engine().update_protection_settings(thresholds);
    }
}

#[tokio::test]
async fn a_clean_cycle_reports_no_violations_and_no_escalation() {
    let wired = wired_loop(std::time::Duration::from_secs(10));
    let report = wired.monitor.run_cycle().await;
    assert!(report.violations.is_empty());
    assert!(!report.escalated());
}

#[tokio::test]
async fn a_tightened_threshold_corrects_locally_without_escalating_on_the_first_cycle() {
    let wired = wired_loop(std::time::Duration::from_secs(10));
    let base = wired.facade.lock().expect("lock facade").thresholds();
    tighten_thresholds(&wired, ProtectionThresholds { max_line_loading_percent: 1.0, ..base });

    let report = wired.monitor.run_cycle().await;
    assert!(!report.violations.is_empty());
    assert!(!report.escalated());
}

#[tokio::test]
async fn three_consecutive_violating_cycles_escalate_exactly_the_third_time() {
    let wired = wired_loop(std::time::Duration::from_secs(10));
    let base = wired.facade.lock().expect("lock facade").thresholds();
    tighten_thresholds(&wired, ProtectionThresholds { over_voltage_pu: 0.5, ..base });

    let first = wired.monitor.run_cycle().await;
    let second = wired.monitor.run_cycle().await;
    let third = wired.monitor.run_cycle().await;

    assert!(!first.escalated());
    assert!(!second.escalated());
    assert!(third.escalated());
}

#[tokio::test]
async fn a_zone_timeout_is_treated_as_an_escalation() {
    let wired = wired_loop(std::time::Duration::from_nanos(1));
    let base = wired.facade.lock().expect("lock facade").thresholds();
    tighten_thresholds(&wired, ProtectionThresholds { max_line_loading_percent: 1.0, ..base });

    let report = wired.monitor.run_cycle().await;
    assert!(report.escalated());
}
