//! Serenity event handler — command dispatch and the component interactions
//! that drive the cancellation flow.

use std::sync::Arc;

use dashmap::DashMap;
use serenity::async_trait;
use serenity::builder::{
    CreateActionRow, CreateInteractionResponse, CreateInteractionResponseMessage,
};
use serenity::model::application::{
    ComponentInteraction, ComponentInteractionDataKind, Interaction,
};
use serenity::model::gateway::Ready;
use serenity::model::id::{GuildId, MessageId};
use serenity::model::Permissions;
use serenity::prelude::{Context, EventHandler};
use tracing::{info, warn};

use vesta_core::config::DiscordConfig;
use vesta_scheduler::Job;

use crate::commands;
use crate::context::EventApp;
use crate::flow::RemovalFlow;
use crate::view;

pub struct VestaHandler {
    pub app: Arc<EventApp>,
    pub config: DiscordConfig,
    /// One cancellation flow per listing message.
    pub flows: DashMap<MessageId, RemovalFlow>,
}

#[async_trait]
impl EventHandler for VestaHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(name = %ready.user.name, "Discord bot connected");
        for guild_id in &self.config.guild_ids {
            commands::register_commands(&ctx, GuildId::new(*guild_id)).await;
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => {
                commands::handle_command(&self.app, &ctx, &command, &self.flows).await;
            }
            Interaction::Component(component) => {
                self.handle_component(&ctx, &component).await;
            }
            _ => {}
        }
    }
}

type Reply = (String, Vec<CreateActionRow>);

impl VestaHandler {
    async fn handle_component(&self, ctx: &Context, component: &ComponentInteraction) {
        let message_id = component.message.id;

        // Drive the FSM synchronously; the flow guard must not be held
        // across an await.
        let (reply, settled) = {
            let mut flow = self.flows.entry(message_id).or_default();
            let reply = match component.data.custom_id.as_str() {
                view::SELECT_ID => self.on_select(component, &mut flow),
                view::REMOVE_ID => self.on_remove(&mut flow),
                view::CANCEL_ID => self.on_cancel(component, &mut flow),
                _ => None,
            };
            (reply, flow.is_settled())
        };
        if settled {
            self.flows.remove(&message_id);
        }

        let Some((content, components)) = reply else {
            return;
        };
        let response = CreateInteractionResponse::UpdateMessage(
            CreateInteractionResponseMessage::new()
                .content(content)
                .components(components),
        );
        if let Err(e) = component.create_response(&ctx.http, response).await {
            warn!(error = %e, "failed to update cancellation flow message");
        }
    }

    fn on_select(&self, component: &ComponentInteraction, flow: &mut RemovalFlow) -> Option<Reply> {
        let job_id = selected_value(component)?;
        let Some(job) = self.app.registry.get(&job_id) else {
            return Some(("That job no longer exists".to_string(), vec![]));
        };
        match flow.select(&job_id) {
            Ok(()) => Some((
                format!(
                    "Create event\n{}\n\nDo you want to remove this schedule?",
                    job.message()
                ),
                vec![view::confirm_buttons_row()],
            )),
            Err(e) => {
                warn!(job_id, error = %e, "ignoring select");
                None
            }
        }
    }

    fn on_remove(&self, flow: &mut RemovalFlow) -> Option<Reply> {
        let job_id = match flow.confirm() {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "ignoring remove");
                return None;
            }
        };
        match self.app.registry.unregister(&job_id) {
            Ok(()) => Some(("Job removed".to_string(), vec![])),
            Err(e) => {
                warn!(job_id, error = %e, "unregister failed");
                Some((
                    "No such job — it may have already been removed".to_string(),
                    vec![],
                ))
            }
        }
    }

    fn on_cancel(&self, component: &ComponentInteraction, flow: &mut RemovalFlow) -> Option<Reply> {
        if let Err(e) = flow.cancel() {
            warn!(error = %e, "ignoring cancel");
            return None;
        }
        // Re-list from the registry rather than the original message: jobs
        // may have fired or been removed meanwhile.
        let jobs = self.visible_jobs(component);
        if jobs.is_empty() {
            // Nothing left to pick; settle the flow so its entry is dropped.
            if let Err(e) = flow.close() {
                warn!(error = %e, "could not close empty-listing flow");
            }
            Some(("There are no scheduled jobs".to_string(), vec![]))
        } else {
            Some((
                "No job was removed".to_string(),
                vec![view::job_select_row(&jobs)],
            ))
        }
    }

    fn visible_jobs(&self, component: &ComponentInteraction) -> Vec<Job> {
        let Some(guild_id) = component.guild_id else {
            return Vec::new();
        };
        let perms = component
            .member
            .as_ref()
            .and_then(|m| m.permissions)
            .unwrap_or(Permissions::empty());
        if perms.contains(Permissions::ADMINISTRATOR) {
            self.app.registry.list_all(&guild_id.to_string())
        } else {
            self.app
                .registry
                .list_for_user(&guild_id.to_string(), &component.user.id.to_string())
        }
    }
}

fn selected_value(component: &ComponentInteraction) -> Option<String> {
    match &component.data.kind {
        ComponentInteractionDataKind::StringSelect { values } => values.first().cloned(),
        _ => None,
    }
}
