// crates/grid-guardian/src/command.rs
// ============================================================================
// Module: Command Normalization
// Description: Normalizes a proposed actuation request into a canonical
//              `CommandRecord` before it reaches the policy oracle,
//              tolerating the hallucinated field shapes a tool-using
//              model sometimes produces.
// Purpose: The oracle prompt and the audit trail both need one stable
//          shape; this is where that shape gets enforced.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! spec.md §4.8: "if `action` is a dict, extract its `operation` or
//! `action` field; if absent, scan other string fields for a recognized
//! verb from a fixed whitelist. Similarly normalize target."

use serde_json::Value;

/// Verbs the guardian recognizes when a command's `action` field is
/// missing or not a plain string. Anything outside this list is left as
/// whatever text was found — the oracle still gets to see it, it just
/// was not confidently normalized.
const KNOWN_VERBS: &[&str] = &[
    "control",
    "trip",
    "close",
    "open",
    "set_output",
    "scale_load",
    "switch",
    "emergency_shutdown",
    "island",
    "regulate_voltage",
    "balance_loading",
];

/// A command proposed for actuation, normalized to a stable shape before
/// it is shown to the policy oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    /// The normalized action verb, or the raw text if no known verb was
    /// found.
    pub action: String,
    /// The normalized target device id, or empty if none could be
    /// extracted.
    pub target: String,
    /// Parameters as supplied, untouched.
    pub parameters: Value,
    /// Short textual grid context supplied alongside the command.
    pub context: String,
}

impl CommandRecord {
    /// Builds a `CommandRecord` from the raw tool-call arguments a
    /// strategic-agent tool-use turn proposed.
    ///
    /// `raw` is expected to carry `action`, `target`, `parameters`, and
    /// `context` fields, but none of that is guaranteed: the normalizer
    /// degrades gracefully when fields are missing, misnamed, or
    /// misshapen.
    #[must_use]
    pub fn from_raw(raw: &Value) -> Self {
        let action = normalize_action(raw);
        let target = normalize_target(raw);
        let parameters = raw.get("parameters").cloned().unwrap_or(Value::Null);
        let context = raw
            .get("context")
            .or_else(|| raw.get("grid_context"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self { action, target, parameters, context }
    }
}

fn normalize_action(raw: &Value) -> String {
    match raw.get("action") {
        Some(Value::String(s)) => return s.clone(),
        Some(Value::Object(map)) => {
            if let Some(op) = map.get("operation").and_then(Value::as_str) {
                return op.to_string();
            }
            if let Some(op) = map.get("action").and_then(Value::as_str) {
                return op.to_string();
            }
        }
        _ => {}
    }
    scan_for_verb(raw).unwrap_or_default()
}

fn scan_for_verb(raw: &Value) -> Option<String> {
    let Value::Object(map) = raw else { return None };
    for value in map.values() {
        if let Value::String(text) = value {
            let lowered = text.to_lowercase();
            if let Some(verb) = KNOWN_VERBS.iter().find(|verb| lowered.contains(**verb)) {
                return Some((*verb).to_string());
            }
        }
    }
    None
}

fn normalize_target(raw: &Value) -> String {
    match raw.get("target").or_else(|| raw.get("target_device")) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(map)) => map
            .get("id")
            .or_else(|| map.get("device_id"))
            .or_else(|| map.get("target"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_shape_passes_through_unchanged() {
        let raw = serde_json::json!({
            "action": "trip",
            "target": "line12",
            "parameters": {},
            "context": "zone1 overloaded",
        });
        let record = CommandRecord::from_raw(&raw);
        assert_eq!(record.action, "trip");
        assert_eq!(record.target, "line12");
        assert_eq!(record.context, "zone1 overloaded");
    }

    #[test]
    fn dict_shaped_action_extracts_operation_field() {
        let raw = serde_json::json!({
            "action": {"operation": "set_output", "extra": "ignored"},
            "target": {"device_id": "gen2"},
        });
        let record = CommandRecord::from_raw(&raw);
        assert_eq!(record.action, "set_output");
        assert_eq!(record.target, "gen2");
    }

    #[test]
    fn missing_action_field_scans_other_strings_for_a_known_verb() {
        let raw = serde_json::json!({
            "target": "bus7",
            "note": "please switch this breaker now",
        });
        let record = CommandRecord::from_raw(&raw);
        assert_eq!(record.action, "switch");
    }

    #[test]
    fn no_recognizable_verb_anywhere_yields_empty_action() {
        let raw = serde_json::json!({"target": "bus7", "note": "do the thing"});
        let record = CommandRecord::from_raw(&raw);
        assert_eq!(record.action, "");
    }
}
