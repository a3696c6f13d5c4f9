// crates/grid-store/src/lib.rs
// ============================================================================
// Crate: grid-store
// Description: SQLite-backed durable audit log (C3) and context memory
//              (C11).
// Purpose: Give the rest of the workspace durable, queryable records of
//          what happened and what the agent decided, without either one
//          ever blocking a caller on disk I/O failure.
// ============================================================================

//! ## Overview
//! Both stores here open their own `SQLite` file and serialize access
//! through a single `Mutex<Connection>` — no writer thread, no batching.
//! That is a deliberate simplification from the workspace's other
//! `SQLite`-backed store: audit entries and agent decisions are low
//! enough volume, and forgiving enough of a few milliseconds of lock
//! contention, that the added machinery would not pay for itself.

pub mod audit;
pub mod context;
pub mod error;

pub use audit::AuditEntry;
pub use audit::AuditLog;
pub use context::AgentDecision;
pub use context::ContextMemory;
pub use context::ContextSummary;
pub use error::StoreError;
