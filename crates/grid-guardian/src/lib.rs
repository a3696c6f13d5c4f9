// crates/grid-guardian/src/lib.rs
// ============================================================================
// Crate: grid-guardian
// Description: Safety Guardian (C8): a stateless policy-oracle gate in
//              front of every actuation request the strategic agent (C9)
//              proposes.
// Purpose: Give the agent's tool-use loop a fail-closed veto that never
//          trusts the oracle's raw text and never crashes the caller.
// ============================================================================

//! ## Overview
//! [`Guardian`] normalizes a possibly-hallucinated command shape, asks a
//! [`grid_providers::LlmClient`] policy oracle for a verdict, tolerantly
//! parses the reply, and remembers the last 50 verdicts. Every verdict is
//! published to the `guardian_event` channel regardless of outcome.

pub mod command;
pub mod guardian;
pub mod verdict;

pub use command::CommandRecord;
pub use guardian::Guardian;
pub use verdict::GuardianVerdict;
pub use verdict::RiskLevel;
