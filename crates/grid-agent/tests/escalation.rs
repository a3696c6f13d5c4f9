// crates/grid-agent/tests/escalation.rs
// ============================================================================
// Integration test: spec.md §8's escalation hand-off from a violation set
// to a synthesized directive to the agent's bounded tool-use loop.
// ============================================================================

use std::sync::Arc;

use grid_agent::build_escalation_directive;
use grid_agent::StrategicAgent;
use grid_bus::EventBus;
use grid_core::telemetry::NoopMetrics;
use grid_core::Severity;
use grid_core::SimulationFacade;
use grid_core::Timestamp;
use grid_core::ViolationEvent;
use grid_core::ViolationKind;
use grid_core::ZoneId;
use grid_guardian::Guardian;
use grid_providers::MockLlmClient;
use grid_registry::ToolDispatcher;
use grid_store::ContextMemory;

#[tokio::test]
async fn escalation_directive_drives_the_agent_to_a_final_answer() {
    let facade = SimulationFacade::with_canonical_case();
    let violation = ViolationEvent {
        kind: ViolationKind::VoltageLow,
        zone: Some(ZoneId::Zone2),
        severity: Severity::Critical,
        component: "bus12".to_string(),
        measured: 0.89,
        limit: 0.95,
        at: Timestamp::now(),
    };
    let directive = build_escalation_directive(facade.state(), &[violation]);
    assert!(directive.contains("Zone protection escalated"));
    assert!(directive.contains("Low-voltage buses"));

    let bus = Arc::new(EventBus::new());
    let guardian = Arc::new(Guardian::new(
        Arc::new(MockLlmClient::always_text("safe")),
        "guardian-model",
        Arc::clone(&bus),
        Arc::new(NoopMetrics),
    ));
    let context = Arc::new(ContextMemory::open_in_memory().expect("open context memory"));
    let dispatcher = Arc::new(ToolDispatcher::new());
    let agent = StrategicAgent::new(
        Arc::new(MockLlmClient::always_text("Raised gen1's setpoint by 10 MW.")),
        "strategic-model",
        context,
        guardian,
        dispatcher,
        "http://localhost:9000",
        bus,
        Arc::new(NoopMetrics),
    );

    let answer = agent.query(&directive, true).await.expect("query");
    assert_eq!(answer, "Raised gen1's setpoint by 10 MW.");
}
