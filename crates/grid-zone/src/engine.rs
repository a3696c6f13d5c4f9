// crates/grid-zone/src/engine.rs
// ============================================================================
// Module: Zone Protection Engine (C7)
// Description: Per-zone violation detection, the three-strike escalation
//              deadband, and emergency islanding.
// Purpose: Resolve what local rules can resolve, and wake the strategic
//          agent only when they genuinely can't (spec.md §4.7).
// Dependencies: grid-core, grid-bus, grid-store, crate::optimizer
// ============================================================================

//! ## Overview
//! `execute_safety_rules` is the engine's one stateful entry point: it
//! advances a per-zone consecutive-violation counter and a
//! [`ZoneState`] machine together. A clean cycle resets both; a violating
//! cycle steps the state machine forward and, below the deadband, attempts
//! a local correction. On the third consecutive violating cycle the engine
//! stops correcting and reports [`crate::report::SafetyRuleOutcome::EscalationRequired`]
//! instead (spec.md §4.7, §8 scenario 2).

use std::sync::Arc;
use std::sync::Mutex;

use grid_core::telemetry::Metrics;
use grid_core::FacadeError;
use grid_core::ProtectionThresholds;
use grid_core::Timestamp;
use grid_core::ViolationEvent;
use grid_core::ViolationKind;
use grid_core::ZoneDescriptor;
use grid_core::ZoneId;
use grid_bus::EventBus;
use grid_registry::SharedFacade;
use grid_store::AuditEntry;
use grid_store::AuditLog;

use crate::optimizer;
use crate::report::CorrectiveAction;
use crate::report::EmergencyIslandingReport;
use crate::report::SafetyRuleOutcome;

/// Consecutive violating cycles before the engine stops correcting locally
/// and requires the strategic agent to take over (spec.md §4.7).
pub const ESCALATION_DEADBAND_CYCLES: u32 = 3;

/// A zone's coarse health, advanced in lock-step with the consecutive
/// violation counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneState {
    /// No violations on the most recent cycle.
    Normal,
    /// First consecutive violating cycle; corrected locally.
    Warning,
    /// Second consecutive violating cycle; corrected locally.
    Alarm,
    /// Third or later consecutive violating cycle; escalated to C9.
    Escalating,
}

/// Owns one zone's protection thresholds, consecutive-violation counter, and
/// state machine. Reads and mutates the shared facade only through
/// components its own [`ZoneDescriptor`] owns.
pub struct ZoneEngine {
    zone: ZoneId,
    facade: SharedFacade,
    bus: Arc<EventBus>,
    audit: Arc<AuditLog>,
    metrics: Arc<dyn Metrics>,
    thresholds: Mutex<ProtectionThresholds>,
    consecutive_violation_cycles: Mutex<u32>,
    state: Mutex<ZoneState>,
}

impl ZoneEngine {
    /// Builds an engine for `zone`, starting at [`ZoneState::Normal`] with
    /// the facade's default thresholds.
    #[must_use]
    pub fn new(zone: ZoneId, facade: SharedFacade, bus: Arc<EventBus>, audit: Arc<AuditLog>, metrics: Arc<dyn Metrics>) -> Self {
        Self {
            zone,
            facade,
            bus,
            audit,
            metrics,
            thresholds: Mutex::new(ProtectionThresholds::default()),
            consecutive_violation_cycles: Mutex::new(0),
            state: Mutex::new(ZoneState::Normal),
        }
    }

    /// The zone this engine owns.
    #[must_use]
    pub const fn zone(&self) -> ZoneId {
        self.zone
    }

    /// Current coarse health.
    #[must_use]
    pub fn state(&self) -> ZoneState {
        *self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Current consecutive-violation count.
    #[must_use]
    pub fn consecutive_violation_cycles(&self) -> u32 {
        *self.consecutive_violation_cycles.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// This zone's active protection thresholds.
    #[must_use]
    pub fn thresholds(&self) -> ProtectionThresholds {
        *self.thresholds.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Overrides this zone's protection thresholds (the `update_protection_settings`
    /// tool). Recorded to the audit trail as `SETTINGS_UPDATED`.
    pub fn update_protection_settings(&self, thresholds: ProtectionThresholds) {
        *self.thresholds.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = thresholds;
        self.audit.append(
            &AuditEntry {
                timestamp: Timestamp::now(),
                zone: Some(self.zone.to_string()),
                event_type: "SETTINGS_UPDATED".to_string(),
                message: format!("protection thresholds updated for {}", self.zone),
                details: serde_json::to_value(thresholds).ok(),
                action_taken: None,
            },
            self.metrics.as_ref(),
        );
    }

    /// Detection sweep: every violation on a component this zone owns,
    /// evaluated against this zone's own thresholds. System-wide frequency
    /// violations (no owning zone) are never included here — they are
    /// handled at the monitoring-loop level (C10), not per-zone.
    #[must_use]
    pub fn detect(&self) -> Vec<ViolationEvent> {
        let facade = lock_facade(&self.facade);
        let thresholds = self.thresholds();
        facade.detect_violations_with(thresholds).into_iter().filter(|v| v.zone == Some(self.zone)).collect()
    }

    /// Runs one evaluation cycle: detect, advance the state machine and
    /// deadband counter, and either correct locally or hand off to
    /// escalation. This is the engine's sole mutator of the consecutive
    /// counter and state machine; callers that only want a read should use
    /// [`Self::detect`] instead.
    pub fn execute_safety_rules(&self) -> SafetyRuleOutcome {
        let violations = self.detect();

        if violations.is_empty() {
            *self.consecutive_violation_cycles.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = 0;
            *self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = ZoneState::Normal;
            return SafetyRuleOutcome::Clean;
        }

        let cycles = {
            let mut counter = self.consecutive_violation_cycles.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            *counter += 1;
            *counter
        };
        *self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = match cycles {
            1 => ZoneState::Warning,
            2 => ZoneState::Alarm,
            _ => ZoneState::Escalating,
        };

        if cycles >= ESCALATION_DEADBAND_CYCLES {
            self.audit.append(
                &AuditEntry {
                    timestamp: Timestamp::now(),
                    zone: Some(self.zone.to_string()),
                    event_type: "ESCALATION".to_string(),
                    message: format!("{} unresolved for {cycles} consecutive cycles", self.zone),
                    details: serde_json::to_value(&violations).ok(),
                    action_taken: None,
                },
                self.metrics.as_ref(),
            );
            self.publish("escalation_required", &violations, cycles);
            return SafetyRuleOutcome::EscalationRequired { violations, consecutive_cycles: cycles };
        }

        let mut actions = Vec::new();
        if violations.iter().any(|v| matches!(v.kind, ViolationKind::VoltageLow | ViolationKind::VoltageHigh)) {
            let mut facade = lock_facade(&self.facade);
            let descriptor = ZoneDescriptor::derive(facade.state(), self.zone);
            let report = optimizer::regulate_voltage(&mut facade, &descriptor, self.thresholds());
            actions.push(CorrectiveAction::VoltageRegulated(report));
        }
        if violations.iter().any(|v| v.kind == ViolationKind::Thermal) {
            let mut facade = lock_facade(&self.facade);
            let descriptor = ZoneDescriptor::derive(facade.state(), self.zone);
            let target = self.thresholds().max_line_loading_percent * 0.95;
            let report = optimizer::balance_loading(&mut facade, &descriptor, target);
            actions.push(CorrectiveAction::LoadBalanced(report));
        }

        self.audit.append(
            &AuditEntry {
                timestamp: Timestamp::now(),
                zone: Some(self.zone.to_string()),
                event_type: "RELAY_TRIP".to_string(),
                message: format!("{} corrected {} violation(s) locally, cycle {cycles}", self.zone, violations.len()),
                details: serde_json::to_value(&actions).ok(),
                action_taken: Some("local_correction".to_string()),
            },
            self.metrics.as_ref(),
        );
        self.publish("relay_trip", &violations, cycles);

        SafetyRuleOutcome::Corrected { violations, actions, consecutive_cycles: cycles }
    }

    /// Opens every tie-line with exactly one endpoint in this zone,
    /// disconnecting it from the rest of the network. Rolls back
    /// completely if any tie-line fails to converge open.
    ///
    /// # Errors
    ///
    /// Returns the [`FacadeError`] from the tie-line that failed to
    /// converge; the zone's topology is left unchanged.
    pub fn emergency_islanding(&self) -> Result<EmergencyIslandingReport, FacadeError> {
        let mut facade = lock_facade(&self.facade);
        let descriptor = ZoneDescriptor::derive(facade.state(), self.zone);
        let tie_lines = descriptor.tie_lines(facade.state());

        let snapshot = facade.save_snapshot();
        let mut opened = Vec::new();
        let mut failure = None;
        for line in &tie_lines {
            match facade.set_line_in_service(*line, false) {
                Ok(()) => opened.push(*line),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        if let Some(err) = failure {
            let _ = facade.restore_snapshot(snapshot);
            self.audit.append(
                &AuditEntry {
                    timestamp: Timestamp::now(),
                    zone: Some(self.zone.to_string()),
                    event_type: "ISLANDING_FAILED".to_string(),
                    message: format!("emergency islanding aborted for {}: {err}", self.zone),
                    details: None,
                    action_taken: Some("rolled_back".to_string()),
                },
                self.metrics.as_ref(),
            );
            return Err(err);
        }

        self.audit.append(
            &AuditEntry {
                timestamp: Timestamp::now(),
                zone: Some(self.zone.to_string()),
                event_type: "EMERGENCY_ISLANDING".to_string(),
                message: format!("{} islanded, {} tie-line(s) opened", self.zone, opened.len()),
                details: serde_json::to_value(&opened).ok(),
                action_taken: Some("opened_tie_lines".to_string()),
            },
            self.metrics.as_ref(),
        );
        let _ = self.bus.publish(
            "guardian_event",
            serde_json::json!({"zone": self.zone.to_string(), "event": "emergency_islanding", "opened_tie_lines": opened}),
            || Timestamp::now().as_millis(),
        );

        Ok(EmergencyIslandingReport { opened_tie_lines: opened })
    }

    /// Direct facade lock access for `coordinator`'s optimizer-only tool
    /// calls (ones that don't go through `execute_safety_rules`). Not
    /// exposed outside this crate.
    pub(crate) fn lock_facade_for_coordinator(&self) -> std::sync::MutexGuard<'_, grid_core::SimulationFacade> {
        lock_facade(&self.facade)
    }

    fn publish(&self, event: &str, violations: &[ViolationEvent], cycles: u32) {
        let _ = self.bus.publish(
            "agent_log",
            serde_json::json!({
                "zone": self.zone.to_string(),
                "event": event,
                "consecutive_cycles": cycles,
                "violation_count": violations.len(),
            }),
            || Timestamp::now().as_millis(),
        );
    }
}

fn lock_facade(facade: &SharedFacade) -> std::sync::MutexGuard<'_, grid_core::SimulationFacade> {
    facade.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use grid_core::telemetry::NoopMetrics;
    use grid_core::SimulationFacade;

    use super::*;

    fn test_engine() -> ZoneEngine {
        let facade = Arc::new(StdMutex::new(SimulationFacade::with_canonical_case()));
        let bus = Arc::new(EventBus::new());
        let audit = Arc::new(AuditLog::open_in_memory().expect("open"));
        ZoneEngine::new(ZoneId::Zone1, facade, bus, audit, Arc::new(NoopMetrics))
    }

    #[test]
    fn clean_grid_resets_counter_and_state() {
        let engine = test_engine();
        let outcome = engine.execute_safety_rules();
        assert!(matches!(outcome, SafetyRuleOutcome::Clean));
        assert_eq!(engine.consecutive_violation_cycles(), 0);
        assert_eq!(engine.state(), ZoneState::Normal);
    }

    #[test]
    fn escalation_fires_on_exactly_the_third_consecutive_violating_cycle() {
        let engine = test_engine();
        // Every bus now reads as over-voltage; the zone's own correction
        // (deactivate active shunts) is a no-op since none start active, so
        // the violation persists unchanged across cycles.
        let mut tight = engine.thresholds();
        tight.over_voltage_pu = 0.5;
        engine.update_protection_settings(tight);

        let first = engine.execute_safety_rules();
        assert!(matches!(first, SafetyRuleOutcome::Corrected { consecutive_cycles: 1, .. }));
        let second = engine.execute_safety_rules();
        assert!(matches!(second, SafetyRuleOutcome::Corrected { consecutive_cycles: 2, .. }));
        let third = engine.execute_safety_rules();
        assert!(matches!(third, SafetyRuleOutcome::EscalationRequired { consecutive_cycles: 3, .. }));
    }

    #[test]
    fn emergency_islanding_opens_only_this_zones_tie_lines() {
        let engine = test_engine();
        let report = engine.emergency_islanding().expect("islanding should converge");
        assert!(!report.opened_tie_lines.is_empty());
        let facade = engine.facade.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let descriptor = ZoneDescriptor::derive(facade.state(), ZoneId::Zone1);
        for line in &report.opened_tie_lines {
            assert!(!descriptor.lines.contains(line));
        }
    }

    #[test]
    fn update_protection_settings_changes_detection_threshold() {
        let engine = test_engine();
        let mut tight = engine.thresholds();
        tight.under_voltage_pu = 1.5; // force every bus under this threshold
        engine.update_protection_settings(tight);
        let violations = engine.detect();
        assert!(violations.iter().all(|v| v.kind == ViolationKind::VoltageLow));
        assert!(!violations.is_empty());
    }
}
