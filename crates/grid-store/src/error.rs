// crates/grid-store/src/error.rs
// ============================================================================
// Module: Store Errors
// Description: Error taxonomy shared by the audit log and context memory.
// Purpose: Let callers distinguish fatal open/schema failures (which the
//          service shell treats as startup-fatal) from ordinary query
//          failures.
// ============================================================================

use thiserror::Error;

/// Errors surfaced by `grid-store`.
///
/// # Invariants
/// - `Open` and `Schema` are only produced during construction; every
///   operation after a successful `open` reports `Query` at worst.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database file could not be opened.
    #[error("store open failed: {0}")]
    Open(String),
    /// Schema initialization failed.
    #[error("store schema init failed: {0}")]
    Schema(String),
    /// A read or write query failed.
    #[error("store query failed: {0}")]
    Query(String),
    /// Stored JSON failed to (de)serialize.
    #[error("store serialization failed: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
