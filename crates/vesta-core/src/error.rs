use thiserror::Error;

#[derive(Debug, Error)]
pub enum VestaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "Sorry, I don't understand the date '{input}'. \
         Please use the format [YYYY-MM-DD HH:mm], e.g. 2009-01-03 14:15"
    )]
    InvalidDate { input: String },

    /// User-facing input rejection; the message is shown verbatim.
    #[error("{0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VestaError>;
