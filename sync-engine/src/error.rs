use thiserror::Error;

use crate::prediction::{FixtureId, FixtureState};

#[derive(Debug, Error)]
pub enum Error {
    /// The whole batch failed to reach the server or the server errored.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("fixture {fixture_id} no longer accepts predictions ({state:?})")]
    FixtureLocked { fixture_id: FixtureId, state: FixtureState },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("malformed payload: {0}")]
    Wire(#[from] serde_json::Error),
}

impl Error {
    /// Whether the same operation may succeed on a later attempt.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Storage(_) => true,
            Error::FixtureLocked { .. } => false,
            Error::Config(_) => false,
            Error::Wire(_) => false,
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
