// crates/grid-guardian/src/verdict.rs
// ============================================================================
// Module: Guardian Verdict
// Description: The guardian's output schema plus tolerant parsing of the
//              policy oracle's raw completion text.
// Purpose: The oracle is free text; everything downstream needs a typed,
//          fail-closed verdict.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! spec.md §4.8: output is `{safe, risk_level, reasoning, conditions}`.
//! Parsing tolerates Markdown code fences and bare "safe"/"unsafe"
//! shorthand; anything else defaults to [`GuardianVerdict::fail_closed`].

use serde::Deserialize;
use serde::Serialize;

/// Risk level attached to a guardian verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// The guardian's verdict on a proposed actuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardianVerdict {
    pub safe: bool,
    pub risk_level: RiskLevel,
    pub reasoning: String,
    #[serde(default)]
    pub conditions: Vec<String>,
}

impl GuardianVerdict {
    /// The default verdict for any parse failure or oracle exception
    /// (spec.md §4.8): never actuate on an answer the guardian could not
    /// understand.
    #[must_use]
    pub fn fail_closed() -> Self {
        Self {
            safe: false,
            risk_level: RiskLevel::High,
            reasoning: "Guardian could not evaluate".to_string(),
            conditions: vec!["Manual review required".to_string()],
        }
    }

    /// Parses the oracle's raw completion text into a verdict, tolerating
    /// Markdown code fences around a JSON object and bare
    /// "safe"/"unsafe" shorthand. Falls back to [`Self::fail_closed`] on
    /// any other shape.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = strip_code_fence(raw.trim());
        if let Ok(verdict) = serde_json::from_str::<Self>(trimmed) {
            return verdict;
        }
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if let Some(verdict) = Self::from_loose_json(&value) {
                return verdict;
            }
        }
        if let Some(verdict) = Self::from_shorthand(trimmed) {
            return verdict;
        }
        Self::fail_closed()
    }

    /// Accepts a JSON object using non-canonical field names or a lower
    /// or mixed-case `risk_level`, rather than requiring exact schema
    /// conformance.
    fn from_loose_json(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        let safe = object.get("safe").and_then(serde_json::Value::as_bool)?;
        let risk_level = object
            .get("risk_level")
            .or_else(|| object.get("riskLevel"))
            .and_then(serde_json::Value::as_str)
            .map(parse_risk_level)
            .unwrap_or(RiskLevel::High);
        let reasoning = object
            .get("reasoning")
            .or_else(|| object.get("reason"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or("no reasoning given")
            .to_string();
        let conditions = object
            .get("conditions")
            .and_then(serde_json::Value::as_array)
            .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        Some(Self { safe, risk_level, reasoning, conditions })
    }

    /// Accepts a bare `safe` / `unsafe` answer with no structure at all.
    fn from_shorthand(text: &str) -> Option<Self> {
        let lowered = text.to_lowercase();
        let first_word = lowered.split_whitespace().next()?;
        match first_word.trim_matches(|c: char| !c.is_alphabetic()) {
            "safe" => Some(Self { safe: true, risk_level: RiskLevel::Low, reasoning: text.to_string(), conditions: Vec::new() }),
            "unsafe" => Some(Self { safe: false, risk_level: RiskLevel::High, reasoning: text.to_string(), conditions: Vec::new() }),
            _ => None,
        }
    }
}

fn parse_risk_level(text: &str) -> RiskLevel {
    match text.to_uppercase().as_str() {
        "LOW" => RiskLevel::Low,
        "MEDIUM" => RiskLevel::Medium,
        "CRITICAL" => RiskLevel::Critical,
        _ => RiskLevel::High,
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(after_open) = text.strip_prefix("```") else { return text };
    let after_open = after_open.strip_prefix("json").unwrap_or(after_open);
    let after_open = after_open.trim_start_matches(['\n', '\r']);
    after_open.strip_suffix("```").map_or(after_open, str::trim_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_json() {
        let verdict = GuardianVerdict::parse(
            r#"{"safe": false, "risk_level": "CRITICAL", "reasoning": "opens every breaker in the zone", "conditions": ["deny"]}"#,
        );
        assert!(!verdict.safe);
        assert_eq!(verdict.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn strips_a_markdown_code_fence() {
        let raw = "```json\n{\"safe\": true, \"risk_level\": \"LOW\", \"reasoning\": \"fine\", \"conditions\": []}\n```";
        let verdict = GuardianVerdict::parse(raw);
        assert!(verdict.safe);
        assert_eq!(verdict.risk_level, RiskLevel::Low);
    }

    #[test]
    fn accepts_bare_safe_shorthand() {
        let verdict = GuardianVerdict::parse("safe, this only nudges a setpoint by 10 MW");
        assert!(verdict.safe);
    }

    #[test]
    fn accepts_bare_unsafe_shorthand() {
        let verdict = GuardianVerdict::parse("unsafe - would de-energize the whole zone");
        assert!(!verdict.safe);
        assert_eq!(verdict.risk_level, RiskLevel::High);
    }

    #[test]
    fn unparseable_text_fails_closed() {
        let verdict = GuardianVerdict::parse("I cannot determine the safety of this action.");
        assert_eq!(verdict, GuardianVerdict::fail_closed());
    }

    #[test]
    fn loose_json_with_lowercase_risk_level_is_still_accepted() {
        let verdict = GuardianVerdict::parse(r#"{"safe": true, "risk_level": "low", "reasoning": "ok"}"#);
        assert!(verdict.safe);
        assert_eq!(verdict.risk_level, RiskLevel::Low);
    }
}
