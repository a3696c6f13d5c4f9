// crates/grid-registry/src/registry.rs
// ============================================================================
// Module: Registry Store (C4)
// Description: Thread-safe in-memory map of registered endpoints, with
//              optional atomic JSON snapshot persistence and a staleness
//              sweep.
// Purpose: The one place every endpoint registers with and every consumer
//          (C6's dispatcher, C9's discovery, C12's HTTP surface) queries.
// Dependencies: serde_json, std::fs
// ============================================================================

//! ## Overview
//! [`Registry`] guards a `HashMap<ServerId, ServerRecord>` behind one mutex,
//! the same single-mutex-around-a-map shape `grid-bus` uses for its
//! subscriber registry. Every mutating operation persists a full snapshot
//! to disk (if a path was configured) via temp-write-then-rename, so a
//! crash never leaves a partially written registry file on disk.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use grid_core::Timestamp;

use crate::error::RegistryError;
use crate::server::EndpointStatus;
use crate::server::ServerFilter;
use crate::server::ServerRecord;
use crate::ServerId;

/// How long a registered endpoint may go without a heartbeat before the
/// sweeper marks it stale (spec.md §4.4).
pub const STALE_AFTER_SECS: i64 = 60;

/// How often `grid-service`'s startup wiring is expected to invoke
/// [`Registry::sweep_stale`] (spec.md §4.4). The registry itself does not
/// own a timer; it is driven by the async runtime owned by `grid-monitor`
/// or `grid-service`.
pub const SWEEP_INTERVAL_SECS: u64 = 30;

struct Inner {
    records: HashMap<ServerId, ServerRecord>,
    snapshot_path: Option<PathBuf>,
}

/// Thread-safe in-memory registry of endpoint servers.
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    /// Builds an empty registry with no snapshot persistence.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner { records: HashMap::new(), snapshot_path: None }) }
    }

    /// Builds a registry that persists a full snapshot to `path` after
    /// every mutating operation, loading any existing snapshot first.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Persistence`] if an existing snapshot file
    /// is present but cannot be parsed.
    pub fn with_snapshot_path(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let records = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|err| RegistryError::Persistence(err.to_string()))?;
            serde_json::from_str(&raw).map_err(|err| RegistryError::Persistence(err.to_string()))?
        } else {
            HashMap::new()
        };
        Ok(Self { inner: Mutex::new(Inner { records, snapshot_path: Some(path) }) })
    }

    /// Registers (or re-registers) `record`. An existing record with the
    /// same id has its `registered_at`/`last_heartbeat` bumped to now and
    /// status set to [`EndpointStatus::Active`]; a new record is inserted
    /// as-is (its `registered_at`/`last_heartbeat` are expected to already
    /// be `now`).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Persistence`] if snapshot persistence is
    /// configured and the write fails.
    pub fn register(&self, mut record: ServerRecord) -> Result<(), RegistryError> {
        let now = Timestamp::now();
        let mut inner = self.lock();
        if inner.records.contains_key(&record.id) {
            record.registered_at = now;
        }
        record.last_heartbeat = now;
        record.status = EndpointStatus::Active;
        inner.records.insert(record.id.clone(), record);
        self.persist(&inner)
    }

    /// Removes a registered endpoint. A missing id is not an error: the
    /// caller's intent (the endpoint should not be registered) is already
    /// satisfied.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Persistence`] if snapshot persistence is
    /// configured and the write fails.
    pub fn unregister(&self, id: &ServerId) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        inner.records.remove(id);
        self.persist(&inner)
    }

    /// Bumps `last_heartbeat` to now and marks the endpoint active.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownServer`] if no such id is
    /// registered, or [`RegistryError::Persistence`] on a snapshot write
    /// failure.
    pub fn heartbeat(&self, id: &ServerId) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        let record = inner
            .records
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownServer(id.to_string()))?;
        record.last_heartbeat = Timestamp::now();
        record.status = EndpointStatus::Active;
        self.persist(&inner)
    }

    /// Looks up a single record by id.
    #[must_use]
    pub fn lookup(&self, id: &ServerId) -> Option<ServerRecord> {
        self.lock().records.get(id).cloned()
    }

    /// Lists records matching `filter`.
    #[must_use]
    pub fn list(&self, filter: &ServerFilter) -> Vec<ServerRecord> {
        let inner = self.lock();
        filter.apply(inner.records.values()).into_iter().cloned().collect()
    }

    /// Flattens every active endpoint's tool descriptors into one list,
    /// paired with the owning server id (spec.md §4.4's
    /// `flatten-tools-across-servers`). Stale endpoints are excluded, per
    /// spec.md §4.4's "must not be considered for tool dispatch".
    #[must_use]
    pub fn flatten_tools(&self) -> Vec<(ServerId, grid_contract::ToolDescriptor)> {
        let inner = self.lock();
        inner
            .records
            .values()
            .filter(|record| record.status == EndpointStatus::Active)
            .flat_map(|record| record.tools.iter().cloned().map(|tool| (record.id.clone(), tool)))
            .collect()
    }

    /// Marks every `Active` endpoint whose heartbeat age exceeds
    /// `stale_after_secs` as [`EndpointStatus::Stale`]. Returns the ids
    /// newly marked stale.
    ///
    /// Intended to be invoked on a fixed interval (spec.md §4.4's 30s
    /// sweeper) by whichever async runtime owns the registry's lifetime.
    pub fn sweep_stale(&self, now: Timestamp, stale_after_secs: i64) -> Vec<ServerId> {
        let mut inner = self.lock();
        let mut newly_stale = Vec::new();
        for record in inner.records.values_mut() {
            if record.status == EndpointStatus::Active
                && now.seconds_since(record.last_heartbeat) > stale_after_secs as f64
            {
                record.status = EndpointStatus::Stale;
                newly_stale.push(record.id.clone());
            }
        }
        if !newly_stale.is_empty() {
            let _ = self.persist(&inner);
        }
        newly_stale
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn persist(&self, inner: &Inner) -> Result<(), RegistryError> {
        let Some(path) = &inner.snapshot_path else {
            return Ok(());
        };
        write_atomic(path, &inner.records)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn write_atomic(path: &Path, records: &HashMap<ServerId, ServerRecord>) -> Result<(), RegistryError> {
    let json = serde_json::to_string_pretty(records).map_err(|err| RegistryError::Persistence(err.to_string()))?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, json).map_err(|err| RegistryError::Persistence(err.to_string()))?;
    fs::rename(&tmp_path, path).map_err(|err| RegistryError::Persistence(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use grid_core::ZoneId;

    use super::*;
    use crate::server::Domain;
    use crate::server::Tier;

    fn sample(id: &str) -> ServerRecord {
        ServerRecord {
            id: ServerId::from(id),
            kind: "voltage_sensor".to_string(),
            tier: Tier::Sensing,
            domain: Domain::power_grid(),
            zone: Some(ZoneId::Zone1),
            tools: Vec::new(),
            status: EndpointStatus::Active,
            registered_at: Timestamp::now(),
            last_heartbeat: Timestamp::now(),
        }
    }

    #[test]
    fn register_then_lookup_round_trips() {
        let registry = Registry::new();
        registry.register(sample("s1")).expect("register");
        let found = registry.lookup(&ServerId::from("s1")).expect("present");
        assert_eq!(found.kind, "voltage_sensor");
    }

    #[test]
    fn unregister_of_unknown_id_is_not_an_error() {
        let registry = Registry::new();
        registry.unregister(&ServerId::from("ghost")).expect("unregister");
    }

    #[test]
    fn heartbeat_of_unknown_id_is_an_error() {
        let registry = Registry::new();
        let result = registry.heartbeat(&ServerId::from("ghost"));
        assert_eq!(result, Err(RegistryError::UnknownServer("ghost".to_string())));
    }

    #[test]
    fn sweep_marks_endpoints_past_the_staleness_window() {
        let registry = Registry::new();
        let mut record = sample("s1");
        record.last_heartbeat = Timestamp::from_millis(0);
        registry.register(record).expect("register");
        // `register` stamps last_heartbeat to "now", so force it stale again
        // by going through the map directly via a second register call is not
        // possible (register always bumps); sweep instead with a `now` far in
        // the future relative to the heartbeat we observe.
        let far_future = Timestamp::from_millis(Timestamp::now().as_millis() + 120_000);
        let stale = registry.sweep_stale(far_future, STALE_AFTER_SECS);
        assert_eq!(stale, vec![ServerId::from("s1")]);
        assert_eq!(registry.lookup(&ServerId::from("s1")).unwrap().status, EndpointStatus::Stale);
    }

    #[test]
    fn stale_endpoints_are_excluded_from_flattened_tools() {
        let registry = Registry::new();
        let mut record = sample("s1");
        record.tools = vec![grid_contract::ToolDescriptor {
            name: grid_contract::ToolName::from("read_sensor"),
            description: "reads a sensor".to_string(),
            input_schema: serde_json::json!({}),
            output_schema: serde_json::json!({}),
            safety_class: grid_contract::SafetyClass::ReadOnly,
        }];
        registry.register(record).expect("register");
        assert_eq!(registry.flatten_tools().len(), 1);

        let far_future = Timestamp::from_millis(Timestamp::now().as_millis() + 120_000);
        registry.sweep_stale(far_future, STALE_AFTER_SECS);
        assert!(registry.flatten_tools().is_empty());
    }

    #[test]
    fn snapshot_persistence_round_trips_through_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("registry.json");
        {
            let registry = Registry::with_snapshot_path(&path).expect("open");
            registry.register(sample("s1")).expect("register");
        }
        let reopened = Registry::with_snapshot_path(&path).expect("reopen");
        assert!(reopened.lookup(&ServerId::from("s1")).is_some());
    }
}
