//! Slash commands — `/schedule_event`, `/schedules`.
//!
//! Registration happens per configured guild in `ready()`. Interactions are
//! dispatched from `interaction_create` in the event handler. All validation
//! happens here, before anything touches the registry: a rejected invocation
//! registers nothing.

use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use serenity::builder::{
    CreateCommand, CreateCommandOption, CreateInteractionResponse,
    CreateInteractionResponseMessage,
};
use serenity::model::application::{CommandInteraction, CommandOptionType};
use serenity::model::channel::ChannelType;
use serenity::model::id::{GuildId, MessageId};
use serenity::model::Permissions;
use serenity::prelude::Context;
use tracing::{info, warn};

use vesta_core::action::{EventAction, EventLocation, Occurrence};
use vesta_core::VestaError;
use vesta_scheduler::{Frequency, Job, JobKey};

use crate::context::EventApp;
use crate::error::DiscordError;
use crate::flow::{RemovalFlow, FLOW_TTL};
use crate::view;

/// Register the guild-scoped slash commands. Call from `ready()`.
pub async fn register_commands(ctx: &Context, guild_id: GuildId) {
    let commands = vec![
        CreateCommand::new("schedule_event")
            .description("Schedule a one-time or recurring Discord event")
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "name", "Event name")
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "start",
                    "Date and time of the first event: YYYY-MM-DD HH:mm",
                )
                .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "repeat",
                    "How often to repeat this event",
                )
                .required(true)
                .add_string_choice("once", "once")
                .add_string_choice("daily", "daily")
                .add_string_choice("weekly", "weekly"),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Integer,
                    "lead_hours",
                    "How many hours before the start the event is created",
                )
                .required(true)
                .min_int_value(0),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Channel,
                    "stage_channel",
                    "Stage channel. Supply exactly one location",
                )
                .channel_types(vec![ChannelType::Stage]),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Channel,
                    "voice_channel",
                    "Voice channel. Supply exactly one location",
                )
                .channel_types(vec![ChannelType::Voice]),
            )
            .add_option(CreateCommandOption::new(
                CommandOptionType::String,
                "offline_location",
                "Address. Supply exactly one location",
            ))
            .add_option(CreateCommandOption::new(
                CommandOptionType::String,
                "end",
                "Date and time the event ends: YYYY-MM-DD HH:mm",
            )),
        CreateCommand::new("schedules").description("List and cancel your scheduled jobs"),
    ];

    match guild_id.set_commands(&ctx.http, commands).await {
        Ok(cmds) => info!(guild = %guild_id, count = cmds.len(), "registered slash commands"),
        Err(e) => warn!(guild = %guild_id, error = %e, "failed to register slash commands"),
    }
}

/// Dispatch a slash command interaction to the appropriate handler.
pub async fn handle_command(
    app: &Arc<EventApp>,
    ctx: &Context,
    command: &CommandInteraction,
    flows: &DashMap<MessageId, RemovalFlow>,
) {
    let result = match command.data.name.as_str() {
        "schedule_event" => handle_schedule_event(app, ctx, command).await,
        "schedules" => handle_schedules(app, ctx, command, flows).await,
        _ => {
            respond_ephemeral(ctx, command, "Unknown command.").await;
            Ok(())
        }
    };

    match result {
        Ok(()) => {}
        // Registry conflicts carry a message fit for the requester.
        Err(DiscordError::Scheduler(e)) => {
            respond_ephemeral(ctx, command, &e.to_string()).await;
        }
        Err(e) => {
            warn!(command = %command.data.name, error = %e, "slash command error");
            respond_ephemeral(ctx, command, "Internal error.").await;
        }
    }
}

/// `/schedule_event` — validate input and register a one-off or recurring job.
async fn handle_schedule_event(
    app: &Arc<EventApp>,
    ctx: &Context,
    command: &CommandInteraction,
) -> Result<(), DiscordError> {
    let Some(guild_id) = command.guild_id else {
        respond_ephemeral(ctx, command, "This command only works in a server.").await;
        return Ok(());
    };
    if !can_manage_events(command) {
        respond_ephemeral(
            ctx,
            command,
            "You need the Manage Events permission to use this command.",
        )
        .await;
        return Ok(());
    }

    let name = str_option(command, "name").unwrap_or("").to_string();
    let repeat = str_option(command, "repeat").unwrap_or("once");
    let lead_hours = int_option(command, "lead_hours").unwrap_or(0).max(0);

    let frequency: Frequency = match repeat.parse() {
        Ok(f) => f,
        Err(_) => {
            respond_ephemeral(ctx, command, "Repeat must be once, daily or weekly.").await;
            return Ok(());
        }
    };

    let start = match app.clock.parse(str_option(command, "start").unwrap_or("")) {
        Ok(dt) => dt,
        Err(e) => {
            respond_ephemeral(ctx, command, &e.to_string()).await;
            return Ok(());
        }
    };
    let end = match str_option(command, "end") {
        Some(raw) => match app.clock.parse(raw) {
            Ok(dt) => Some(dt),
            Err(e) => {
                respond_ephemeral(ctx, command, &e.to_string()).await;
                return Ok(());
            }
        },
        None => None,
    };

    let stage = channel_option(command, "stage_channel");
    let voice = channel_option(command, "voice_channel");
    let offline = str_option(command, "offline_location").map(str::to_string);
    let (location, end) = match resolve_location(stage, voice, offline, end) {
        Ok(resolved) => resolved,
        Err(e) => {
            respond_ephemeral(ctx, command, &e.to_string()).await;
            return Ok(());
        }
    };

    let key = JobKey::new(
        guild_id.to_string(),
        command.user.id.to_string(),
        command.id.to_string(),
    );
    // The job fires `lead_hours` ahead of the event itself.
    let fire_anchor = (start - Duration::hours(lead_hours)).with_timezone(&Utc);

    if frequency.is_recurring() {
        let action = EventAction {
            guild_id: guild_id.get(),
            event_name: name.clone(),
            location,
            occurrence: Occurrence::Recurring {
                first_start: start.fixed_offset(),
                first_end: end.map(|e| e.fixed_offset()),
                lead_hours,
            },
        };
        let job = Job::new(
            key,
            format!("Create event '{name}'"),
            frequency,
            command.user.name.clone(),
        );
        app.registry
            .register_recurring(job, fire_anchor, fire_anchor, action.to_json()?)?;
    } else {
        let action = EventAction {
            guild_id: guild_id.get(),
            event_name: name.clone(),
            location,
            occurrence: Occurrence::Single {
                start: start.fixed_offset(),
                end: end.map(|e| e.fixed_offset()),
            },
        };
        app.registry
            .register_oneoff(&key.display(), fire_anchor, action.to_json()?)?;
    }

    respond_ephemeral(ctx, command, "Successfully created schedule").await;
    Ok(())
}

/// `/schedules` — list jobs (all of them for administrators) and start the
/// cancellation flow.
async fn handle_schedules(
    app: &Arc<EventApp>,
    ctx: &Context,
    command: &CommandInteraction,
    flows: &DashMap<MessageId, RemovalFlow>,
) -> Result<(), DiscordError> {
    let Some(guild_id) = command.guild_id else {
        respond_ephemeral(ctx, command, "This command only works in a server.").await;
        return Ok(());
    };
    if !can_manage_events(command) {
        respond_ephemeral(
            ctx,
            command,
            "You need the Manage Events permission to use this command.",
        )
        .await;
        return Ok(());
    }

    let jobs = visible_jobs(app, command, guild_id);
    if jobs.is_empty() {
        respond_ephemeral(ctx, command, "There are no scheduled jobs").await;
        return Ok(());
    }

    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content("These are the scheduled jobs")
            .ephemeral(true)
            .components(vec![view::job_select_row(&jobs)]),
    );
    command.create_response(&ctx.http, response).await?;

    // One flow per listing message; component interactions are routed back
    // to it by message ID. Flows whose interaction tokens have expired can
    // never be reached again, so prune them on every insert.
    flows.retain(|_, flow| !flow.is_stale(FLOW_TTL));
    let message = command.get_response(&ctx.http).await?;
    flows.insert(message.id, RemovalFlow::new());
    Ok(())
}

/// Jobs the caller is allowed to see: administrators get the whole guild,
/// everyone else only their own.
pub(crate) fn visible_jobs(
    app: &Arc<EventApp>,
    command: &CommandInteraction,
    guild_id: GuildId,
) -> Vec<Job> {
    if member_permissions(command).contains(Permissions::ADMINISTRATOR) {
        app.registry.list_all(&guild_id.to_string())
    } else {
        app.registry
            .list_for_user(&guild_id.to_string(), &command.user.id.to_string())
    }
}

/// Exactly one of stage/voice/offline must be supplied. Offline locations
/// require an end time; channel locations drop any supplied end.
fn resolve_location<T>(
    stage: Option<u64>,
    voice: Option<u64>,
    offline: Option<String>,
    end: Option<T>,
) -> Result<(EventLocation, Option<T>), VestaError> {
    match (stage, voice, offline) {
        (Some(channel_id), None, None) => Ok((EventLocation::Stage { channel_id }, None)),
        (None, Some(channel_id), None) => Ok((EventLocation::Voice { channel_id }, None)),
        (None, None, Some(address)) => {
            if end.is_none() {
                Err(VestaError::Validation(
                    "Offline locations need an end datetime".to_string(),
                ))
            } else {
                Ok((EventLocation::External { address }, end))
            }
        }
        _ => Err(VestaError::Validation(
            "Please provide exactly one location".to_string(),
        )),
    }
}

pub(crate) fn can_manage_events(command: &CommandInteraction) -> bool {
    member_permissions(command).contains(Permissions::MANAGE_EVENTS)
}

fn member_permissions(command: &CommandInteraction) -> Permissions {
    command
        .member
        .as_ref()
        .and_then(|m| m.permissions)
        .unwrap_or(Permissions::empty())
}

fn str_option<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|o| o.name == name)
        .and_then(|o| o.value.as_str())
}

fn int_option(command: &CommandInteraction, name: &str) -> Option<i64> {
    command
        .data
        .options
        .iter()
        .find(|o| o.name == name)
        .and_then(|o| o.value.as_i64())
}

fn channel_option(command: &CommandInteraction, name: &str) -> Option<u64> {
    command
        .data
        .options
        .iter()
        .find(|o| o.name == name)
        .and_then(|o| o.value.as_channel_id())
        .map(|id| id.get())
}

pub(crate) async fn respond_ephemeral(ctx: &Context, command: &CommandInteraction, text: &str) {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(text)
            .ephemeral(true),
    );
    if let Err(e) = command.create_response(&ctx.http, response).await {
        warn!(error = %e, "failed to respond to interaction");
    }
}
