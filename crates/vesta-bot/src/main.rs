use std::sync::Arc;

use tracing::info;

use vesta_core::config::FIRED_CHANNEL_CAPACITY;
use vesta_core::{Clock, VestaConfig};
use vesta_discord::{DiscordAdapter, EventApp};
use vesta_scheduler::engine::SchedulerState;
use vesta_scheduler::{Registry, TriggerEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vesta=info".into()),
        )
        .init();

    // load config: explicit path via VESTA_CONFIG > ~/.vesta/vesta.toml
    let config_path = std::env::var("VESTA_CONFIG").ok();
    let config = VestaConfig::load(config_path.as_deref())?;
    let clock = Clock::new(&config.timezone)?;
    info!(timezone = %config.timezone, "starting vesta");

    // Trigger table + job index share one mutex; the engine polls it, the
    // registry manages it.
    let state = SchedulerState::shared();
    let registry = Registry::new(Arc::clone(&state));

    // Fired-job channel: TriggerEngine → event delivery task
    let (fired_tx, fired_rx) = tokio::sync::mpsc::channel(FIRED_CHANNEL_CAPACITY);
    let engine = TriggerEngine::new(Arc::clone(&state), fired_tx);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(engine.run(shutdown_rx));

    let app = Arc::new(EventApp::new(registry, clock));
    let adapter = DiscordAdapter::new(&config.discord, app);
    tokio::spawn(adapter.run(fired_rx));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    Ok(())
}
