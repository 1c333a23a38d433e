//! Error types for the Slack Q&A bot

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Slack API error: {error}, needed: {needed}")]
    SlackApi { error: String, needed: String },

    #[error("Slack request failed: {0}")]
    SlackTransport(String),

    #[error("OpenAI API error: {0}")]
    OpenAi(String),

    #[error("No completion choices returned")]
    NoCompletionChoices,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
