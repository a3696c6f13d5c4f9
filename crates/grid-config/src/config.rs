// crates/grid-config/src/config.rs
// ============================================================================
// Module: Grid Configuration
// Description: Environment-first, file-fallback loader for every startup
//              input the control plane needs (spec.md §6).
// Purpose: Give the service binary a single fail-closed place to resolve
//          configuration before it constructs anything else.
// Dependencies: grid-providers, serde, toml
// ============================================================================

//! ## Overview
//! [`GridConfig::load`] resolves each input by checking the environment
//! first, then falling back to a dotted-key TOML file, matching this
//! workspace's preference for environment-driven configuration while still
//! allowing a checked-in file for local development. Keys the file does not
//! recognize are ignored rather than rejected; values neither source
//! supplies are either defaulted or reported as [`ConfigError::MissingRequired`]
//! depending on whether spec.md §7 treats them as required.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use grid_providers::config::ENV_CREDENTIAL;
use grid_providers::config::ENV_ENDPOINT;
use grid_providers::config::ENV_GUARDIAN_MODEL;
use grid_providers::config::ENV_STRATEGIC_MODEL;
use grid_providers::config::ENV_ZONE_MODEL_PREFIX;
use grid_providers::HttpLlmConfig;
use grid_providers::OracleConfig;
use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable naming the configuration file path.
pub const ENV_CONFIG_PATH: &str = "GRID_CONFIG_PATH";
/// Default configuration file name when `GRID_CONFIG_PATH` is unset and no
/// explicit path is given to [`GridConfig::load`].
pub const DEFAULT_CONFIG_NAME: &str = "grid.toml";
/// Maximum configuration file size accepted, mirroring this workspace's
/// other filesystem-facing size limits.
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

const ENV_LLM_CONTEXT_WINDOW: &str = "GRID_LLM_CONTEXT_WINDOW";
const ENV_REGISTRY_HOST: &str = "GRID_REGISTRY_HOST";
const ENV_REGISTRY_PORT: &str = "GRID_REGISTRY_PORT";
const ENV_MONITOR_INTERVAL_SECS: &str = "GRID_MONITOR_INTERVAL_SECS";
const ENV_DEMO_MODE: &str = "GRID_DEMO_MODE";
const ENV_TIMESERIES_URL: &str = "GRID_TIMESERIES_URL";
const ENV_TIMESERIES_TOKEN: &str = "GRID_TIMESERIES_TOKEN";
const ENV_TIMESERIES_ORG: &str = "GRID_TIMESERIES_ORG";
const ENV_TIMESERIES_BUCKET: &str = "GRID_TIMESERIES_BUCKET";
const ENV_BROKER_HOST: &str = "GRID_BROKER_HOST";
const ENV_BROKER_PORT: &str = "GRID_BROKER_PORT";
const ENV_BROKER_CLIENT_ID: &str = "GRID_BROKER_CLIENT_ID";

const DEFAULT_REGISTRY_HOST: &str = "127.0.0.1";
const DEFAULT_REGISTRY_PORT: u16 = 8080;
const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 5;
const DEFAULT_LLM_CONTEXT_WINDOW: usize = 8192;

/// Time-series store configuration. Named in spec.md §6 but has no
/// reader or writer in this workspace's scope; carried as a
/// named-contract-only value a future store adapter can consume.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct TimeSeriesStoreConfig {
    pub url: Option<String>,
    pub token: Option<String>,
    pub org: Option<String>,
    pub bucket: Option<String>,
}

/// Message-broker configuration. Named in spec.md §6 but has no reader
/// or writer in this workspace's scope; [`grid-bus`] is the in-process
/// broker actually used.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct MessageBrokerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub client_id: Option<String>,
}

/// Fully resolved control-plane configuration.
///
/// # Invariants
/// - `oracle.http.endpoint` and `oracle.http.credential` are always
///   non-empty; [`GridConfig::load`] fails closed otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    /// LLM oracle endpoint, credential, and per-role model identifiers.
    pub oracle: OracleConfig,
    /// Maximum context window, in tokens, the oracle accepts.
    pub llm_context_window: usize,
    /// Registry HTTP bind host.
    pub registry_host: String,
    /// Registry HTTP bind port.
    pub registry_port: u16,
    /// Interval between monitoring loop cycles.
    pub monitor_interval: Duration,
    /// When true, the service boots a mock demo publisher instead of the
    /// real C1/C4/C8/C9/C10 wiring sequence.
    pub demo_mode: bool,
    /// Time-series store configuration (named contract only).
    pub timeseries: TimeSeriesStoreConfig,
    /// Message-broker configuration (named contract only).
    pub broker: MessageBrokerConfig,
}

/// On-disk shape of the optional fallback configuration file. Every field
/// is optional: unset fields fall through to the environment or to a
/// default, and fields this struct does not name are silently ignored by
/// `serde`'s default behavior.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    llm: FileLlmConfig,
    registry: FileRegistryConfig,
    monitor: FileMonitorConfig,
    demo_mode: Option<bool>,
    timeseries: TimeSeriesStoreConfig,
    broker: MessageBrokerConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FileLlmConfig {
    endpoint: Option<String>,
    credential: Option<String>,
    strategic_model: Option<String>,
    guardian_model: Option<String>,
    context_window: Option<usize>,
    #[serde(default)]
    zone_models: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FileRegistryConfig {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FileMonitorConfig {
    interval_secs: Option<u64>,
}

impl GridConfig {
    /// Resolves configuration from the environment, falling back to a
    /// dotted-key TOML file for any value the environment leaves unset.
    ///
    /// `path` overrides [`ENV_CONFIG_PATH`] and [`DEFAULT_CONFIG_NAME`]. A
    /// missing file at the resolved path is not an error: every input is
    /// either satisfied by the environment, defaulted, or reported as
    /// [`ConfigError::MissingRequired`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if a file at an explicitly resolved
    /// path cannot be read, [`ConfigError::Parse`] if it is not valid
    /// TOML, and [`ConfigError::MissingRequired`] if the oracle endpoint
    /// or credential is absent from both sources.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = load_file(path)?;

        let endpoint = env::var(ENV_ENDPOINT)
            .ok()
            .filter(|value| !value.is_empty())
            .or(file.llm.endpoint.clone())
            .ok_or_else(|| ConfigError::MissingRequired(ENV_ENDPOINT.to_string()))?;
        let credential = env::var(ENV_CREDENTIAL)
            .ok()
            .filter(|value| !value.is_empty())
            .or(file.llm.credential.clone())
            .ok_or_else(|| ConfigError::MissingRequired(ENV_CREDENTIAL.to_string()))?;
        let strategic_model = env::var(ENV_STRATEGIC_MODEL)
            .ok()
            .or(file.llm.strategic_model.clone())
            .unwrap_or_else(|| "strategic-default".to_string());
        let guardian_model = env::var(ENV_GUARDIAN_MODEL)
            .ok()
            .or(file.llm.guardian_model.clone())
            .unwrap_or_else(|| "guardian-default".to_string());

        let mut zone_models = file.llm.zone_models.clone();
        for (key, value) in env::vars() {
            if let Some(zone) = key.strip_prefix(ENV_ZONE_MODEL_PREFIX) {
                zone_models.insert(zone.to_ascii_lowercase(), value);
            }
        }

        let llm_context_window = read_env_usize(ENV_LLM_CONTEXT_WINDOW)?
            .or(file.llm.context_window)
            .unwrap_or(DEFAULT_LLM_CONTEXT_WINDOW);

        let registry_host = env::var(ENV_REGISTRY_HOST)
            .ok()
            .or(file.registry.host.clone())
            .unwrap_or_else(|| DEFAULT_REGISTRY_HOST.to_string());
        let registry_port = read_env_u16(ENV_REGISTRY_PORT)?
            .or(file.registry.port)
            .unwrap_or(DEFAULT_REGISTRY_PORT);

        let monitor_interval_secs = read_env_u64(ENV_MONITOR_INTERVAL_SECS)?
            .or(file.monitor.interval_secs)
            .unwrap_or(DEFAULT_MONITOR_INTERVAL_SECS);

        let demo_mode = read_env_bool(ENV_DEMO_MODE)?.or(file.demo_mode).unwrap_or(false);

        let timeseries = TimeSeriesStoreConfig {
            url: env::var(ENV_TIMESERIES_URL).ok().or(file.timeseries.url.clone()),
            token: env::var(ENV_TIMESERIES_TOKEN).ok().or(file.timeseries.token.clone()),
            org: env::var(ENV_TIMESERIES_ORG).ok().or(file.timeseries.org.clone()),
            bucket: env::var(ENV_TIMESERIES_BUCKET).ok().or(file.timeseries.bucket.clone()),
        };
        let broker = MessageBrokerConfig {
            host: env::var(ENV_BROKER_HOST).ok().or(file.broker.host.clone()),
            port: read_env_u16(ENV_BROKER_PORT)?.or(file.broker.port),
            client_id: env::var(ENV_BROKER_CLIENT_ID).ok().or(file.broker.client_id.clone()),
        };

        let config = Self {
            oracle: OracleConfig {
                http: HttpLlmConfig { endpoint, credential, ..HttpLlmConfig::default() },
                strategic_model,
                guardian_model,
                zone_models,
            },
            llm_context_window,
            registry_host,
            registry_port,
            monitor_interval: Duration::from_secs(monitor_interval_secs),
            demo_mode,
            timeseries,
            broker,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field invariants not already enforced by resolution.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `llm_context_window` is zero.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.llm_context_window == 0 {
            return Err(ConfigError::Invalid("llm_context_window must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Resolves the config file path and parses it. A file that does not
/// exist at the resolved path is not an error: the file is one of two
/// equally valid sources, and the environment may supply everything on
/// its own.
fn load_file(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let resolved = path
        .map(Path::to_path_buf)
        .or_else(|| env::var(ENV_CONFIG_PATH).ok().map(std::path::PathBuf::from))
        .unwrap_or_else(|| std::path::PathBuf::from(DEFAULT_CONFIG_NAME));

    let metadata = match fs::metadata(&resolved) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(FileConfig::default()),
        Err(err) => return Err(ConfigError::Io(err.to_string())),
    };
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
    }

    let content = fs::read_to_string(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
    toml::from_str(&content).map_err(|err| ConfigError::Parse(err.to_string()))
}

fn read_env_usize(name: &str) -> Result<Option<usize>, ConfigError> {
    parse_env(name)
}

fn read_env_u16(name: &str) -> Result<Option<u16>, ConfigError> {
    parse_env(name)
}

fn read_env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
    parse_env(name)
}

fn read_env_bool(name: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(name) {
        Ok(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(Some(true)),
            "0" | "false" | "no" => Ok(Some(false)),
            _ => Err(ConfigError::Invalid(format!("{name} must be a boolean"))),
        },
        Err(_) => Ok(None),
    }
}

fn parse_env<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{name} is not a valid value"))),
        Err(_) => Ok(None),
    }
}
