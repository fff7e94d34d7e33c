use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serenity::model::gateway::GatewayIntents;
use serenity::Client;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use vesta_core::config::DiscordConfig;
use vesta_core::Clock;
use vesta_scheduler::FiredJob;

use crate::context::EventApp;
use crate::create::EventCreator;
use crate::handler::VestaHandler;

/// Discord adapter.
///
/// Wraps a serenity `Client` and drives the event loop until the process
/// exits, reconnecting whenever the gateway drops.
pub struct DiscordAdapter {
    app: Arc<EventApp>,
    config: DiscordConfig,
}

impl DiscordAdapter {
    pub fn new(config: &DiscordConfig, app: Arc<EventApp>) -> Self {
        Self {
            app,
            config: config.clone(),
        }
    }

    /// Connect to Discord and keep reconnecting whenever the gateway drops.
    ///
    /// Never returns — runs for the lifetime of the process. The fired-job
    /// delivery task is spawned once off the first client's `Arc<Http>`
    /// (REST, not the gateway WebSocket), so it survives reconnects.
    pub async fn run(self, fired_rx: mpsc::Receiver<FiredJob>) {
        // Slash commands and component interactions only — no message
        // content needed.
        let intents = GatewayIntents::GUILDS;

        let first_client = loop {
            match self.build_client(intents).await {
                Ok(c) => break c,
                Err(e) => {
                    error!("Discord: initial connect failed ({e}), retrying in 30s");
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
            }
        };

        let creator = EventCreator::new(Arc::clone(&first_client.http));
        let clock = self.app.clock;
        tokio::spawn(crate::delivery::run_event_delivery(creator, clock, fired_rx));

        let mut client = first_client;

        loop {
            info!("Discord: gateway connecting");

            if let Err(e) = client.start().await {
                warn!("Discord: gateway error ({e}), reconnecting in 5s");
            } else {
                info!("Discord: gateway stopped cleanly, reconnecting in 5s");
            }

            tokio::time::sleep(Duration::from_secs(5)).await;

            client = loop {
                match self.build_client(intents).await {
                    Ok(c) => break c,
                    Err(e) => {
                        error!("Discord: reconnect failed ({e}), retrying in 30s");
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                }
            };
        }
    }

    async fn build_client(&self, intents: GatewayIntents) -> Result<Client, serenity::Error> {
        let handler = VestaHandler {
            app: Arc::clone(&self.app),
            config: self.config.clone(),
            flows: DashMap::new(),
        };

        Client::builder(&self.config.bot_token, intents)
            .event_handler(handler)
            .await
    }
}
