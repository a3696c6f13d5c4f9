//! Integration tests for grid-config's environment/file precedence.
// crates/grid-config/tests/config_loading.rs
// ============================================================================
// Module: Config Loading Tests
// Description: End-to-end checks of GridConfig::load against real temp
//              files and the process environment.
// Purpose: Guard the env-first, file-fallback, unknown-keys-ignored
//          policy spec.md §6 requires.
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use grid_config::ConfigError;
use grid_config::GridConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_grid_env() {
    for (key, _) in env::vars() {
        if key.starts_with("GRID_") {
            env::remove_var(key);
        }
    }
}

#[test]
fn a_fully_specified_file_needs_no_environment_at_all() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    clear_grid_env();
    let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let path = dir.path().join("grid.toml");
    fs::write(
        &path,
        r#"
        demo_mode = true

        [llm]
        endpoint = "https://oracle.example/v1/chat/completions"
        credential = "file-only-credential"
        strategic_model = "strategic-7"
        guardian_model = "guardian-3"

        [llm.zone_models]
        zone2 = "zone2-specialist"

        [registry]
        host = "10.0.0.5"
        port = 7000

        [monitor]
        interval_secs = 2

        [timeseries]
        url = "https://ts.example"
        bucket = "grid"

        [broker]
        host = "broker.example"
        client_id = "grid-service"
        "#,
    )
    .unwrap_or_else(|err| panic!("write config: {err}"));

    let config = GridConfig::load(Some(&path)).unwrap_or_else(|err| panic!("load: {err}"));
    assert!(config.demo_mode);
    assert_eq!(config.oracle.http.endpoint, "https://oracle.example/v1/chat/completions");
    assert_eq!(config.oracle.strategic_model, "strategic-7");
    assert_eq!(config.oracle.model_for_zone("zone2"), "zone2-specialist");
    assert_eq!(config.oracle.model_for_zone("zone1"), "strategic-7");
    assert_eq!(config.registry_host, "10.0.0.5");
    assert_eq!(config.registry_port, 7000);
    assert_eq!(config.monitor_interval.as_secs(), 2);
    assert_eq!(config.timeseries.url.as_deref(), Some("https://ts.example"));
    assert_eq!(config.broker.client_id.as_deref(), Some("grid-service"));
}

#[test]
fn a_missing_config_file_is_not_an_error_when_the_environment_covers_everything() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    clear_grid_env();
    env::set_var("GRID_LLM_ENDPOINT", "https://env-only.example/v1/chat/completions");
    env::set_var("GRID_LLM_CREDENTIAL", "env-only-credential");

    let config = GridConfig::load(Some(Path::new("/definitely/does/not/exist/grid.toml")))
        .unwrap_or_else(|err| panic!("load: {err}"));
    assert_eq!(config.oracle.http.endpoint, "https://env-only.example/v1/chat/completions");

    clear_grid_env();
}

#[test]
fn an_invalid_numeric_environment_value_is_reported_as_invalid() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    clear_grid_env();
    env::set_var("GRID_LLM_ENDPOINT", "https://env.example/v1/chat/completions");
    env::set_var("GRID_LLM_CREDENTIAL", "env-credential");
    env::set_var("GRID_REGISTRY_PORT", "not-a-port");

    let result = GridConfig::load(Some(Path::new("/definitely/does/not/exist/grid.toml")));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));

    clear_grid_env();
}

#[test]
fn a_malformed_toml_file_is_reported_as_a_parse_error() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    clear_grid_env();
    let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let path = dir.path().join("grid.toml");
    fs::write(&path, "this is not [ valid toml").unwrap_or_else(|err| panic!("write config: {err}"));

    let result = GridConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}
