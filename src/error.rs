use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::types::Source;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("{}", describe_failures(.0))]
    PartialBatch(Vec<SourceFailure>),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DashError>;

/// One configured source that could not be fetched during a full refresh.
#[derive(Debug)]
pub struct SourceFailure {
    pub source: Source,
    pub error: DashError,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load {}: {}", self.source, self.error)
    }
}

fn describe_failures(failures: &[SourceFailure]) -> String {
    failures
        .iter()
        .map(|failure| failure.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<tokio::task::JoinError> for DashError {
    fn from(err: tokio::task::JoinError) -> Self {
        DashError::Task(err.to_string())
    }
}
