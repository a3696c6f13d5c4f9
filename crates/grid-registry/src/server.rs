// crates/grid-registry/src/server.rs
// ============================================================================
// Module: Registry Record Types
// Description: The server record the registry (C4) stores per registered
//              endpoint, plus the filters `list` accepts.
// Purpose: Give register/heartbeat/list a single, serializable shape so the
//          same record can be snapshotted to disk and served over HTTP.
// Dependencies: grid-core (ZoneId), serde
// ============================================================================

use grid_core::Timestamp;
use grid_core::ZoneId;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;

use crate::ServerId;

/// Broad capability tier an endpoint advertises to the strategic agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Read-only observation endpoints (sensors).
    Sensing,
    /// Actuation endpoints (breakers, generators, load controllers, …).
    Actuation,
    /// Zone-level coordination endpoints (C7 instances).
    Coordination,
}

/// The domain an endpoint belongs to (spec.md §4.12's domain adapter
/// contract supports more than the power-grid domain).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain(pub String);

impl Domain {
    /// The one concrete domain this workspace ships a full adapter for.
    #[must_use]
    pub fn power_grid() -> Self {
        Self("power_grid".to_string())
    }
}

/// Liveness state of a registered endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointStatus {
    /// Heartbeat observed within the staleness window.
    Active,
    /// Heartbeat age exceeds the staleness threshold; still queryable, but
    /// excluded from tool dispatch.
    Stale,
}

/// One registered endpoint, as stored by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    /// Stable server id (kind + zone + random suffix).
    pub id: ServerId,
    /// The endpoint kind, e.g. `"voltage_sensor"`, `"circuit_breaker"`.
    pub kind: String,
    /// Capability tier.
    pub tier: Tier,
    /// Owning domain.
    pub domain: Domain,
    /// Owning zone, if any (frequency sensors and system-wide endpoints
    /// have none).
    pub zone: Option<ZoneId>,
    /// Tool descriptors this endpoint advertises.
    pub tools: Vec<grid_contract::ToolDescriptor>,
    /// Current liveness status.
    pub status: EndpointStatus,
    /// When this endpoint first registered.
    pub registered_at: Timestamp,
    /// Most recent heartbeat timestamp.
    pub last_heartbeat: Timestamp,
}

/// Filters accepted by `Registry::list`. `None` on a field means
/// "unfiltered" for that dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerFilter {
    pub tier: Option<Tier>,
    pub domain: Option<String>,
    pub zone: Option<ZoneId>,
    pub status: Option<EndpointStatus>,
}

impl ServerFilter {
    fn matches(&self, record: &ServerRecord) -> bool {
        if let Some(tier) = self.tier
            && tier != record.tier
        {
            return false;
        }
        if let Some(domain) = &self.domain
            && *domain != record.domain.0
        {
            return false;
        }
        if let Some(zone) = self.zone
            && Some(zone) != record.zone
        {
            return false;
        }
        if let Some(status) = self.status
            && status != record.status
        {
            return false;
        }
        true
    }

    pub(crate) fn apply<'a>(
        &self,
        records: impl Iterator<Item = &'a ServerRecord>,
    ) -> Vec<&'a ServerRecord> {
        records.filter(|record| self.matches(record)).collect()
    }
}

/// Mints a stable server id: `<kind>-<zone-or-"system">-<random suffix>`.
#[must_use]
pub fn mint_server_id(kind: &str, zone: Option<ZoneId>) -> ServerId {
    let zone_label = zone.map_or_else(|| "system".to_string(), |z| z.to_string());
    let suffix: String =
        rand::thread_rng().sample_iter(&rand::distributions::Alphanumeric).take(6).map(char::from).collect();
    ServerId::from(format!("{kind}-{zone_label}-{}", suffix.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_server_id_embeds_kind_and_zone() {
        let id = mint_server_id("voltage_sensor", Some(ZoneId::Zone1));
        assert!(id.to_string().starts_with("voltage_sensor-zone1-"));
    }

    #[test]
    fn mint_server_id_uses_system_label_when_zoneless() {
        let id = mint_server_id("frequency_sensor", None);
        assert!(id.to_string().starts_with("frequency_sensor-system-"));
    }

    #[test]
    fn filter_matches_on_every_populated_dimension() {
        let record = ServerRecord {
            id: ServerId::from("a"),
            kind: "voltage_sensor".to_string(),
            tier: Tier::Sensing,
            domain: Domain::power_grid(),
            zone: Some(ZoneId::Zone1),
            tools: Vec::new(),
            status: EndpointStatus::Active,
            registered_at: Timestamp::from_millis(0),
            last_heartbeat: Timestamp::from_millis(0),
        };
        let matching = ServerFilter { tier: Some(Tier::Sensing), zone: Some(ZoneId::Zone1), ..Default::default() };
        let non_matching = ServerFilter { zone: Some(ZoneId::Zone2), ..Default::default() };
        assert!(matching.apply(std::iter::once(&record)).len() == 1);
        assert!(non_matching.apply(std::iter::once(&record)).is_empty());
    }
}
