use anyhow::Context;
use std::path::PathBuf;
use std::time::Duration;

use nerve::{build_bus, init_logging, publish_startup, spawn_heartbeat, Settings};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let path = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => Settings::default_path()?,
    };
    let settings = Settings::load_or_default(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;

    // Initialize logging
    init_logging(&settings.logging)?;
    tracing::info!(
        version = nerve::VERSION,
        build_date = nerve::BUILD_DATE,
        settings = %path.display(),
        "Starting nerve bus"
    );

    let bus = build_bus(&settings)?;
    publish_startup(&bus);

    let heartbeat = match settings.runtime.heartbeat_secs {
        0 => None,
        secs => Some(spawn_heartbeat(bus.clone(), Duration::from_secs(secs))),
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown requested, draining");

    if let Some(handle) = heartbeat {
        handle.abort();
    }
    bus.drained().await;

    let stats = serde_json::to_string(&bus.stats())?;
    tracing::info!(stats = %stats, "Nerve bus stopped");

    Ok(())
}
