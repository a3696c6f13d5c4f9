// crates/grid-agent/src/lib.rs
// ============================================================================
// Crate: grid-agent
// Description: Strategic Agent (C9): the bounded tool-use loop that
//              answers operator queries and synthesizes escalation
//              directives, gated end-to-end by the Safety Guardian (C8).
// Purpose: The one collaborator in this workspace that is allowed to use
//          free-form reasoning; everything it proposes still passes
//          through deterministic gates before it touches C1.
// ============================================================================

//! ## Overview
//! [`StrategicAgent`] discovers tools over HTTP from C4's flattened
//! catalog (spec.md §4.9) but invokes them in-process through a shared
//! [`grid_registry::ToolDispatcher`], since this workspace runs as one
//! address space (spec.md §5). [`directive::build_escalation_directive`]
//! is the text the monitoring loop (C10) hands the agent on escalation.

pub mod agent;
pub mod catalog;
pub mod directive;
pub mod error;

pub use agent::StrategicAgent;
pub use agent::MAX_TOOL_ROUNDS;
pub use catalog::ToolCatalog;
pub use directive::build_escalation_directive;
pub use error::AgentError;
