// crates/grid-contract/src/tool.rs
// ============================================================================
// Module: Tool Descriptor
// Description: The published shape of an invocable endpoint operation, and
//              the flat external naming scheme the dispatcher builds from a
//              server name + tool name pair.
// Purpose: Give the registry (C4), endpoints (C5), and dispatcher (C6) one
//          shared, immutable-after-registration tool shape.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`ToolDescriptor`] is immutable once an endpoint registers it. The
//! dispatcher never mutates descriptors; it only indexes them under a
//! flattened external name (`<server_name>_<tool_name>`, normalized).

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// A tool's safety classification, used by the dispatcher to build the
/// actuator-only filtered view presented during escalations (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyClass {
    /// Pure reads; never gated by the guardian.
    ReadOnly,
    /// Low-risk actuation (e.g. threshold tuning).
    LowRisk,
    /// Moderate-risk actuation (e.g. load scaling).
    MediumRisk,
    /// High-risk actuation (e.g. breaker operation).
    HighRisk,
    /// Emergency actuation (e.g. islanding, shutdown).
    Emergency,
}

impl SafetyClass {
    /// Whether this class represents an actuation (anything but reads).
    #[must_use]
    pub const fn is_actuation(self) -> bool {
        !matches!(self, Self::ReadOnly)
    }
}

/// A strongly typed, interned tool name (the tool's own name, not the
/// dispatcher's flattened external name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolName(pub String);

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ToolName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// An endpoint-published operation descriptor.
///
/// # Invariants
/// - Immutable after registration; a changed signature registers as a new
///   tool, it does not mutate an existing descriptor in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name, unique within its owning server.
    pub name: ToolName,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for accepted input.
    pub input_schema: serde_json::Value,
    /// JSON Schema for returned output.
    pub output_schema: serde_json::Value,
    /// Safety classification.
    pub safety_class: SafetyClass,
}

/// The wire shape of one entry in C12's `GET /tools` response: a tool
/// descriptor paired with its flattened external name and originating
/// server, for callers (chiefly C9) that discover the catalog over HTTP
/// instead of linking the dispatcher directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlattenedTool {
    /// The flattened external name (`<server_name>_<tool_name>`).
    pub external_name: String,
    /// The owning server's id.
    pub server_id: String,
    /// The tool's original name, as the endpoint itself knows it.
    pub original_name: String,
    pub description: String,
    pub safety_class: SafetyClass,
    pub input_schema: serde_json::Value,
}

/// Builds the dispatcher's flat, namespaced external tool name from a
/// server name and the tool's own name: `<server_name>_<tool_name>`,
/// lower-cased with spaces and parentheses stripped (spec.md §4.6).
#[must_use]
pub fn external_tool_name(server_name: &str, tool_name: &ToolName) -> String {
    let raw = format!("{server_name}_{}", tool_name.0);
    normalize_identifier(&raw)
}

/// Normalizes a raw identifier into the dispatcher's flat namespace:
/// lower-cased, with spaces and parentheses removed.
fn normalize_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '(' && *c != ')')
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect::<String>()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_tool_name_strips_spaces_and_parens_and_lowercases() {
        let name = external_tool_name("Zone 1 Coordinator (primary)", &ToolName::from("Get Status"));
        assert_eq!(name, "zone_1_coordinator_primary_get_status");
    }

    #[test]
    fn read_only_is_not_an_actuation() {
        assert!(!SafetyClass::ReadOnly.is_actuation());
        assert!(SafetyClass::HighRisk.is_actuation());
        assert!(SafetyClass::Emergency.is_actuation());
    }
}
