use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The engine has no trigger with the given ID.
    #[error("No trigger with id '{id}'")]
    TriggerNotFound { id: String },

    /// A one-off registration collided with an active trigger ID.
    #[error("Trigger id '{id}' is already registered")]
    TriggerConflict { id: String },

    /// The display ID does not decompose into guild, user and nonce.
    #[error("Malformed job id '{id}'")]
    InvalidJobId { id: String },

    /// A one-shot frequency was passed where a recurring one is required.
    #[error("Frequency '{frequency}' cannot be registered as recurring")]
    NotRecurring { frequency: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
