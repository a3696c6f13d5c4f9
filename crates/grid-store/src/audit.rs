// crates/grid-store/src/audit.rs
// ============================================================================
// Module: Audit Log (C3)
// Description: Durable append-only event journal backed by SQLite, queryable
//              by zone and recency.
// Purpose: Give every component a single place to record "what happened"
//          without taking on the critical path: a write failure here must
//          never propagate.
// Dependencies: rusqlite, serde_json
// ============================================================================

//! ## Overview
//! [`AuditLog`] serializes writes under a process-local mutex around a
//! single `SQLite` connection, mirroring the simpler of the two durability
//! tiers this workspace uses — no writer thread, no batching, since the
//! audit log is an observer and never gates a caller's progress.

use std::path::Path;
use std::sync::Mutex;

use grid_core::telemetry::MetricEvent;
use grid_core::telemetry::Metrics;
use grid_core::Timestamp;
use rusqlite::params;
use rusqlite::Connection;
use serde::Deserialize;
use serde::Serialize;

use crate::error::StoreError;

/// One row of the audit journal.
///
/// # Invariants
/// - Append-only: rows are never updated or deleted through this API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the event occurred.
    pub timestamp: Timestamp,
    /// Owning zone, if any (system-wide events use `None`).
    pub zone: Option<String>,
    /// Event type label (e.g. `"violation_detected"`, `"guardian_veto"`).
    pub event_type: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail blob.
    pub details: Option<serde_json::Value>,
    /// Optional description of the action taken in response.
    pub action_taken: Option<String>,
}

/// Durable, append-only audit journal.
pub struct AuditLog {
    conn: Mutex<Connection>,
}

impl AuditLog {
    /// Opens (creating if absent) the audit database at `path` and ensures
    /// its schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] or [`StoreError::Schema`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|err| StoreError::Open(err.to_string()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS audit_entries (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp_ms  INTEGER NOT NULL,
                zone          TEXT,
                event_type    TEXT NOT NULL,
                message       TEXT NOT NULL,
                details       TEXT,
                action_taken  TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_entries(timestamp_ms);
            CREATE INDEX IF NOT EXISTS idx_audit_zone ON audit_entries(zone, timestamp_ms);",
        )
        .map_err(|err| StoreError::Schema(err.to_string()))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Opens an in-memory audit log, for tests.
    ///
    /// # Errors
    ///
    /// See [`Self::open`].
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::open(":memory:")
    }

    /// Appends an entry. A write failure is recorded on `metrics` and
    /// swallowed: the audit log is never on the critical path (spec.md
    /// §4.3 / §7).
    pub fn append(&self, entry: &AuditEntry, metrics: &dyn Metrics) {
        if let Err(err) = self.try_append(entry) {
            metrics.record(MetricEvent { name: "grid_store.audit_write", outcome: "failed" });
            let _ = err; // observed via the counter above, not propagated.
        }
    }

    /// Appends an entry, surfacing any failure to the caller. Used by
    /// callers (tests, and components that want to know) that need to
    /// observe write failures directly instead of through a metrics sink.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] or [`StoreError::Serialization`].
    pub fn try_append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let details_json = entry.details.as_ref().map(serde_json::to_string).transpose()?;
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "INSERT INTO audit_entries (timestamp_ms, zone, event_type, message, details, \
             action_taken) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.timestamp.as_millis(),
                entry.zone,
                entry.event_type,
                entry.message,
                details_json,
                entry.action_taken,
            ],
        )?;
        Ok(())
    }

    /// Returns the most recent `limit` entries across all zones, newest
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`].
    pub fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        query_entries(
            &conn,
            "SELECT timestamp_ms, zone, event_type, message, details, action_taken FROM \
             audit_entries ORDER BY timestamp_ms DESC, id DESC LIMIT ?1",
            params![i64::try_from(limit).unwrap_or(i64::MAX)],
        )
    }

    /// Returns the most recent `limit` entries for `zone`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`].
    pub fn recent_for_zone(&self, zone: &str, limit: usize) -> Result<Vec<AuditEntry>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        query_entries(
            &conn,
            "SELECT timestamp_ms, zone, event_type, message, details, action_taken FROM \
             audit_entries WHERE zone = ?1 ORDER BY timestamp_ms DESC, id DESC LIMIT ?2",
            params![zone, i64::try_from(limit).unwrap_or(i64::MAX)],
        )
    }
}

fn query_entries(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<AuditEntry>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| {
        let timestamp_ms: i64 = row.get(0)?;
        let zone: Option<String> = row.get(1)?;
        let event_type: String = row.get(2)?;
        let message: String = row.get(3)?;
        let details_raw: Option<String> = row.get(4)?;
        let action_taken: Option<String> = row.get(5)?;
        Ok((timestamp_ms, zone, event_type, message, details_raw, action_taken))
    })?;
    let mut entries = Vec::new();
    for row in rows {
        let (timestamp_ms, zone, event_type, message, details_raw, action_taken) = row?;
        let details = details_raw
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(StoreError::from)?;
        entries.push(AuditEntry {
            timestamp: Timestamp::from_millis(timestamp_ms),
            zone,
            event_type,
            message,
            details,
            action_taken,
        });
    }
    Ok(entries)
}
