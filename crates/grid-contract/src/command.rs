// crates/grid-contract/src/command.rs
// ============================================================================
// Module: Actuator Command / Response
// Description: The wire record that crosses the guardian gate between a
//              dispatched actuator tool call and its outcome.
// Purpose: Give every actuator the same before/after attribute-bag shape so
//          the guardian, audit log, and agent can reason about it uniformly.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! An [`ActuatorCommand`] describes what is being asked of a device; an
//! [`ActuatorResponse`] describes what happened. Both carry an
//! [`AttributeBag`] — a free-form, serializable key/value map — rather than
//! a per-device-kind struct, since the set of devices is open-ended.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// A free-form attribute map, used for command parameters and for the
/// before/after state captured in an [`ActuatorResponse`].
///
/// `BTreeMap` keeps serialized output and audit log rendering
/// deterministic, which matters when the same bag is diffed for a human
/// operator.
pub type AttributeBag = BTreeMap<String, serde_json::Value>;

/// A request to operate a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorCommand {
    /// The device being operated (e.g. a circuit breaker id).
    pub device_id: String,
    /// The device kind (e.g. `"circuit_breaker"`, `"generator"`).
    pub device_kind: String,
    /// The zone owning the device, if known.
    pub zone: Option<String>,
    /// The action identifier (e.g. `"open"`, `"set_output"`).
    pub action: String,
    /// Free-form action parameters.
    pub parameters: AttributeBag,
}

/// The outcome of executing an [`ActuatorCommand`].
///
/// # Invariants
/// - `validated` is `false` whenever the command was rejected before
///   execution (by the guardian or by endpoint-side validation); in that
///   case `previous_state` and `new_state` are identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorResponse {
    /// Whether the command passed validation and was allowed to execute.
    pub validated: bool,
    /// Whether execution itself succeeded.
    pub success: bool,
    /// A human-readable outcome message.
    pub message: String,
    /// Device attributes immediately before execution.
    pub previous_state: AttributeBag,
    /// Device attributes immediately after execution.
    pub new_state: AttributeBag,
}

impl ActuatorResponse {
    /// Builds a rejected response: not validated, not executed, state
    /// unchanged.
    #[must_use]
    pub fn rejected(message: impl Into<String>, state: AttributeBag) -> Self {
        Self {
            validated: false,
            success: false,
            message: message.into(),
            previous_state: state.clone(),
            new_state: state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_response_leaves_state_unchanged() {
        let mut state = AttributeBag::new();
        state.insert("status".to_string(), serde_json::json!("closed"));
        let response = ActuatorResponse::rejected("guardian denied", state.clone());
        assert!(!response.validated);
        assert!(!response.success);
        assert_eq!(response.previous_state, state);
        assert_eq!(response.new_state, state);
    }
}
