// crates/grid-store/src/context.rs
// ============================================================================
// Module: Context Memory (C11)
// Description: Persistent journal of agent decisions and opaque keyed
//              context snapshots, for continuity across process restarts.
// Purpose: Give the strategic agent a durable memory it can rebuild a
//          context block from at the start of every query.
// Dependencies: rusqlite, serde_json
// ============================================================================

//! ## Overview
//! [`ContextMemory`] owns two tables: `decisions` (append-only, indexed by
//! timestamp) and `context_snapshots` (keyed, last-write-wins, indexed by
//! key). Both share the audit log's single-mutex-around-one-connection
//! model since nothing here is on a hot path dense enough to need a writer
//! thread.

use std::path::Path;
use std::sync::Mutex;

use grid_core::Timestamp;
use rusqlite::params;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use serde::Deserialize;
use serde::Serialize;

use crate::error::StoreError;

/// One durable record of a strategic-agent decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDecision {
    /// Unique decision identifier.
    pub id: String,
    /// The trigger text (user query or escalation directive) that produced
    /// this decision.
    pub trigger: String,
    /// A summary of the agent's reasoning.
    pub reasoning: String,
    /// Actions the agent took, in order.
    pub actions_taken: Vec<String>,
    /// The outcome text.
    pub outcome: String,
    /// When the decision was recorded.
    pub timestamp: Timestamp,
}

/// A summary view over recent decisions, used to build an agent context
/// block without shipping full history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSummary {
    /// Total number of decisions ever recorded.
    pub decision_count: u64,
    /// Trigger text of the three most recent decisions, newest first.
    pub recent_triggers: Vec<String>,
}

/// Durable decision journal and opaque context snapshot store.
pub struct ContextMemory {
    conn: Mutex<Connection>,
}

impl ContextMemory {
    /// Opens (creating if absent) the context memory database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] or [`StoreError::Schema`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|err| StoreError::Open(err.to_string()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS decisions (
                id            TEXT PRIMARY KEY,
                trigger       TEXT NOT NULL,
                reasoning     TEXT NOT NULL,
                actions_taken TEXT NOT NULL,
                outcome       TEXT NOT NULL,
                timestamp_ms  INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_decisions_timestamp ON decisions(timestamp_ms);
            CREATE TABLE IF NOT EXISTS context_snapshots (
                key          TEXT PRIMARY KEY,
                value        TEXT NOT NULL,
                timestamp_ms INTEGER NOT NULL
            );",
        )
        .map_err(|err| StoreError::Schema(err.to_string()))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Opens an in-memory context memory store, for tests.
    ///
    /// # Errors
    ///
    /// See [`Self::open`].
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::open(":memory:")
    }

    /// Persists a decision. Decisions are immutable after write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] or [`StoreError::Serialization`].
    pub fn store_decision(&self, decision: &AgentDecision) -> Result<(), StoreError> {
        let actions_json = serde_json::to_string(&decision.actions_taken)?;
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "INSERT INTO decisions (id, trigger, reasoning, actions_taken, outcome, \
             timestamp_ms) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                decision.id,
                decision.trigger,
                decision.reasoning,
                actions_json,
                decision.outcome,
                decision.timestamp.as_millis(),
            ],
        )?;
        Ok(())
    }

    /// Returns the most recent `n` decisions, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`].
    pub fn get_recent_decisions(&self, n: usize) -> Result<Vec<AgentDecision>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut stmt = conn.prepare(
            "SELECT id, trigger, reasoning, actions_taken, outcome, timestamp_ms FROM decisions \
             ORDER BY timestamp_ms DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![i64::try_from(n).unwrap_or(i64::MAX)], row_to_decision)?;
        let mut decisions = Vec::new();
        for row in rows {
            decisions.push(row?);
        }
        Ok(decisions)
    }

    /// Looks up a single decision by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`].
    pub fn get_decision(&self, id: &str) -> Result<Option<AgentDecision>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.query_row(
            "SELECT id, trigger, reasoning, actions_taken, outcome, timestamp_ms FROM decisions \
             WHERE id = ?1",
            params![id],
            row_to_decision,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// Upserts an opaque context value under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] or [`StoreError::Serialization`].
    pub fn store_context(&self, key: &str, value: &serde_json::Value) -> Result<(), StoreError> {
        let value_json = serde_json::to_string(value)?;
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "INSERT INTO context_snapshots (key, value, timestamp_ms) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
             timestamp_ms = excluded.timestamp_ms",
            params![key, value_json, Timestamp::now().as_millis()],
        )?;
        Ok(())
    }

    /// Returns the latest value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] or [`StoreError::Serialization`].
    pub fn get_latest_context(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let raw: Option<String> = conn
            .query_row("SELECT value FROM context_snapshots WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        raw.map(|raw| serde_json::from_str(&raw)).transpose().map_err(StoreError::from)
    }

    /// Builds a compact summary: total decision count plus the three most
    /// recent trigger texts.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`].
    pub fn get_context_summary(&self) -> Result<ContextSummary, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let decision_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM decisions", [], |row| row.get(0))?;
        let mut stmt = conn.prepare(
            "SELECT trigger FROM decisions ORDER BY timestamp_ms DESC LIMIT 3",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut recent_triggers = Vec::new();
        for row in rows {
            recent_triggers.push(row?);
        }
        Ok(ContextSummary {
            decision_count: decision_count.max(0) as u64,
            recent_triggers,
        })
    }

    /// Flushes and releases the underlying connection. `SQLite` commits are
    /// synchronous per-statement here, so this is a formality kept for
    /// symmetry with the spec's explicit `close` operation.
    pub fn close(self) {
        drop(self);
    }
}

fn row_to_decision(row: &rusqlite::Row<'_>) -> rusqlite::Result<AgentDecision> {
    let id: String = row.get(0)?;
    let trigger: String = row.get(1)?;
    let reasoning: String = row.get(2)?;
    let actions_raw: String = row.get(3)?;
    let outcome: String = row.get(4)?;
    let timestamp_ms: i64 = row.get(5)?;
    let actions_taken: Vec<String> = serde_json::from_str(&actions_raw).unwrap_or_default();
    Ok(AgentDecision {
        id,
        trigger,
        reasoning,
        actions_taken,
        outcome,
        timestamp: Timestamp::from_millis(timestamp_ms),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_decision(id: &str, trigger: &str, at_ms: i64) -> AgentDecision {
        AgentDecision {
            id: id.to_string(),
            trigger: trigger.to_string(),
            reasoning: "zone1 thermal overload observed".to_string(),
            actions_taken: vec!["scale_load(load3, 0.8)".to_string()],
            outcome: "loading reduced to 92%".to_string(),
            timestamp: Timestamp::from_millis(at_ms),
        }
    }

    #[test]
    fn store_then_get_decision_round_trips() {
        let memory = ContextMemory::open_in_memory().expect("open");
        memory.store_decision(&sample_decision("d1", "zone1 overload", 1_000)).expect("store");
        let fetched = memory.get_decision("d1").expect("get").expect("present");
        assert_eq!(fetched.trigger, "zone1 overload");
        assert_eq!(fetched.actions_taken, vec!["scale_load(load3, 0.8)".to_string()]);
    }

    #[test]
    fn get_recent_decisions_orders_newest_first() {
        let memory = ContextMemory::open_in_memory().expect("open");
        memory.store_decision(&sample_decision("d1", "first", 1_000)).expect("store");
        memory.store_decision(&sample_decision("d2", "second", 2_000)).expect("store");
        memory.store_decision(&sample_decision("d3", "third", 3_000)).expect("store");
        let recent = memory.get_recent_decisions(2).expect("recent");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, "d3");
        assert_eq!(recent[1].id, "d2");
    }

    #[test]
    fn context_summary_reports_count_and_three_most_recent_triggers() {
        let memory = ContextMemory::open_in_memory().expect("open");
        for (i, trigger) in ["a", "b", "c", "d"].iter().enumerate() {
            memory
                .store_decision(&sample_decision(&format!("d{i}"), trigger, 1_000 * (i as i64 + 1)))
                .expect("store");
        }
        let summary = memory.get_context_summary().expect("summary");
        assert_eq!(summary.decision_count, 4);
        assert_eq!(summary.recent_triggers, vec!["d", "c", "b"]);
    }

    #[test]
    fn store_context_upserts_latest_value() {
        let memory = ContextMemory::open_in_memory().expect("open");
        memory.store_context("last_zone1_status", &serde_json::json!({"state": "warning"})).expect("store");
        memory.store_context("last_zone1_status", &serde_json::json!({"state": "normal"})).expect("store");
        let latest = memory.get_latest_context("last_zone1_status").expect("get").expect("present");
        assert_eq!(latest, serde_json::json!({"state": "normal"}));
    }

    #[test]
    fn get_latest_context_returns_none_for_unknown_key() {
        let memory = ContextMemory::open_in_memory().expect("open");
        assert_eq!(memory.get_latest_context("missing").expect("get"), None);
    }
}
