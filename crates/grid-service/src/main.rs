// crates/grid-service/src/main.rs
// ============================================================================
// Binary: grid-service
// Description: Process entry point. Resolves configuration, runs the
//              startup wiring sequence (real or demo), serves the HTTP
//              surface, and drives the monitoring loop under a cooperative
//              shutdown signal.
// Purpose: The one binary this workspace ships.
// Dependencies: grid-config, grid-service (lib), tokio
// ============================================================================

//! ## Overview
//! `GRID_CONFIG_PATH` (or `./grid.toml`) plus the environment resolve a
//! [`grid_config::GridConfig`]; a missing oracle endpoint or credential is
//! fatal (spec.md §7's one fatal startup condition). `GRID_DEMO_MODE=true`
//! skips the real boot sequence entirely and serves the mock publisher
//! path instead, matching spec.md §4.12's "mock demo publisher or a real
//! boot sequence" choice.

use std::net::SocketAddr;

use grid_config::GridConfig;
use grid_service::StorePaths;

const LOCAL_DASHBOARD_ORIGIN: &str = "http://localhost:5173";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = GridConfig::load(None).map_err(|err| {
        eprintln!("fatal: configuration error: {err}");
        err
    })?;

    let booted = if config.demo_mode {
        println!("grid-service: booting in demo mode (mock publisher, no LLM oracle)");
        grid_service::wiring::demo()
    } else {
        grid_service::wiring::boot(&config, &StorePaths::default()).await.map_err(|err| {
            eprintln!("fatal: startup wiring failed: {err}");
            err
        })?
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    if let Some(monitor) = booted.monitor.clone() {
        let rx = shutdown_rx.clone();
        tokio::spawn(async move {
            monitor.run(rx).await;
        });
    }

    let app = grid_service::router(booted.app_state, Some(LOCAL_DASHBOARD_ORIGIN));
    let addr: SocketAddr = format!("{}:{}", config.registry_host, config.registry_port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("grid-service: listening on {addr}");

    let serve = axum::serve(listener, app.into_make_service());
    tokio::select! {
        result = serve => {
            if let Err(err) = result {
                eprintln!("grid-service: server error: {err}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("grid-service: shutdown signal received, stopping monitoring loop");
            let _ = shutdown_tx.send(true);
        }
    }

    Ok(())
}
