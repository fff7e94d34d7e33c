//! Discord adapter for Vesta — slash commands, the cancellation flow UI,
//! scheduled-event creation and fired-job delivery.

pub mod adapter;
pub mod commands;
pub mod context;
pub mod create;
pub mod delivery;
pub mod error;
pub mod flow;
pub mod handler;
pub mod view;

pub use adapter::DiscordAdapter;
pub use context::EventApp;
pub use error::DiscordError;
