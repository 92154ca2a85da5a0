//! Feed Watch - Main Entry Point
//!
//! `feedwatch` runs every enabled monitor until ctrl-c.
//! `feedwatch send-test` delivers one sample notification and exits.

use anyhow::{bail, Context, Result};
use feedwatch::{
    build_notifier, init_logging, open_state, send_test_alert, spawn_monitors, AppConfig,
};
use scheduler::Scheduler;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.log_level, config.log_json)?;

    info!("=== Feed Watch v{} ===", env!("CARGO_PKG_VERSION"));

    let notifier = Arc::new(build_notifier(&config));
    if !notifier.is_configured() {
        warn!("No webhook destination configured; alerts will only be logged");
    }

    match std::env::args().nth(1).as_deref() {
        None => {}
        Some("send-test") => return send_test_alert(notifier.as_ref()).await,
        Some(other) => bail!("unknown command: {} (expected `send-test`)", other),
    }

    let state = open_state(&config);
    info!("State file: {}", state.path().display());

    let mut scheduler = Scheduler::new(notifier, state);
    let started = spawn_monitors(&config, &mut scheduler)?;
    if started == 0 {
        warn!("All monitors are disabled; nothing to do");
        return Ok(());
    }
    info!("Started {} monitors", started);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("Shutdown requested");

    scheduler.shutdown().await;
    Ok(())
}
