// crates/grid-agent/src/error.rs
// ============================================================================
// Module: Agent Errors
// Description: Failure modes the strategic agent's tool-use loop surfaces
//              to its caller (spec.md §7's "LLM failure or timeout" and
//              "transient transport failure" policies).
// Dependencies: thiserror, grid-providers, grid-store
// ============================================================================

use grid_providers::LlmError;
use grid_store::StoreError;

/// Errors the strategic agent can return. None of these mean the process
/// should crash: every call site logs and degrades per spec.md §7.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Fetching the tool catalog from the registry's HTTP surface failed.
    #[error("tool discovery failed: {0}")]
    Discovery(String),
    /// The oracle itself failed or timed out.
    #[error("llm failure: {0}")]
    Llm(#[from] LlmError),
    /// Context memory could not be read or written.
    #[error("context memory failure: {0}")]
    Store(#[from] StoreError),
    /// The tool-use loop ran for the maximum number of rounds without the
    /// model producing a final answer.
    #[error("tool-use loop exhausted its round budget without a final answer")]
    LoopExhausted,
}
