// crates/grid-zone/src/report.rs
// ============================================================================
// Module: Zone Engine Reports
// Description: Serializable outcome shapes for each zone operation, returned
//              to both in-process callers and the coordinator's tool
//              invocations.
// Dependencies: grid-core, serde
// ============================================================================

use grid_core::BusId;
use grid_core::GeneratorId;
use grid_core::LineId;
use grid_core::LoadId;
use grid_core::ShuntId;
use grid_core::ViolationEvent;
use serde::Deserialize;
use serde::Serialize;

/// One generator setpoint change made by [`crate::optimizer::minimize_losses`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorAdjustment {
    pub generator: GeneratorId,
    pub from_mw: f64,
    pub to_mw: f64,
}

/// Outcome of the loss-minimization optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossMinimizationReport {
    pub before_losses_mw: f64,
    pub after_losses_mw: f64,
    pub adjustments: Vec<GeneratorAdjustment>,
}

/// One shunt switched by [`crate::optimizer::regulate_voltage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShuntChange {
    pub shunt: ShuntId,
    pub now_in_service: bool,
}

/// Outcome of the voltage-regulation optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageRegulationReport {
    pub shunt_changes: Vec<ShuntChange>,
    pub final_voltages: Vec<(BusId, f64)>,
    pub remaining_violations: Vec<ViolationEvent>,
}

/// One load scaled by [`crate::optimizer::balance_loading`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadAdjustment {
    pub line: LineId,
    pub load: LoadId,
    pub factor: f64,
}

/// Outcome of the line-loading optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancingReport {
    pub adjustments: Vec<LoadAdjustment>,
}

/// Outcome of emergency islanding: the tie-lines opened, or why it failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyIslandingReport {
    pub opened_tie_lines: Vec<LineId>,
}

/// One corrective action taken by [`crate::engine::ZoneEngine::execute_safety_rules`],
/// recorded for the audit trail and the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CorrectiveAction {
    VoltageRegulated(VoltageRegulationReport),
    LoadBalanced(LoadBalancingReport),
}

/// The result of one `execute_safety_rules` evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SafetyRuleOutcome {
    /// No violations this cycle; the deadband counter was reset.
    Clean,
    /// Violations present but within the deadband; corrective actions were
    /// attempted locally.
    Corrected { violations: Vec<ViolationEvent>, actions: Vec<CorrectiveAction>, consecutive_cycles: u32 },
    /// The deadband has been exceeded three consecutive cycles running;
    /// the strategic agent must be woken.
    EscalationRequired { violations: Vec<ViolationEvent>, consecutive_cycles: u32 },
}
