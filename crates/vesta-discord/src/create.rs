//! The actual side effect: creating a guild scheduled event over the
//! Discord REST API.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serenity::builder::CreateScheduledEvent;
use serenity::http::Http;
use serenity::model::guild::ScheduledEventType;
use serenity::model::id::{ChannelId, GuildId};
use serenity::model::Timestamp;
use tracing::info;

use vesta_core::action::{EventAction, EventLocation};

use crate::error::DiscordError;

/// Wraps the REST client. `Arc<Http>` stays valid across gateway
/// reconnects, so one creator serves the whole process lifetime.
pub struct EventCreator {
    http: Arc<Http>,
}

impl EventCreator {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    /// Create one scheduled event for `action` with the concrete
    /// `start`/`end` window.
    pub async fn create(
        &self,
        action: &EventAction,
        start: DateTime<FixedOffset>,
        end: Option<DateTime<FixedOffset>>,
    ) -> Result<(), DiscordError> {
        let start_ts = to_timestamp(start)?;

        let mut builder = match &action.location {
            EventLocation::Stage { channel_id } => CreateScheduledEvent::new(
                ScheduledEventType::StageInstance,
                action.event_name.clone(),
                start_ts,
            )
            .channel_id(ChannelId::new(*channel_id)),
            EventLocation::Voice { channel_id } => {
                CreateScheduledEvent::new(ScheduledEventType::Voice, action.event_name.clone(), start_ts)
                    .channel_id(ChannelId::new(*channel_id))
            }
            EventLocation::External { address } => CreateScheduledEvent::new(
                ScheduledEventType::External,
                action.event_name.clone(),
                start_ts,
            )
            .location(address.clone()),
        };
        if let Some(end) = end {
            builder = builder.end_time(to_timestamp(end)?);
        }

        GuildId::new(action.guild_id)
            .create_scheduled_event(&self.http, builder)
            .await?;

        info!(
            guild_id = action.guild_id,
            event_name = %action.event_name,
            start = %start,
            "scheduled event created"
        );
        Ok(())
    }
}

fn to_timestamp(dt: DateTime<FixedOffset>) -> Result<Timestamp, DiscordError> {
    Timestamp::from_unix_timestamp(dt.timestamp()).map_err(|_| DiscordError::Timestamp)
}
