use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoryError>;

/// One failed attempt against a single provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: String,
    pub message: String,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.message)
    }
}

#[derive(Debug, Error)]
pub enum StoryError {
    #[error("Database unavailable")] DbUnavailable,
    #[error("Storage error: {0}")] Storage(String),
    #[error("{0}")] Configuration(String),
    #[error("No AI preferences stored for user {0}")] PreferencesNotFound(String),
    #[error("Serialization error: {0}")] Serialization(#[from] serde_json::Error),
    #[error("All AI providers failed for {operation} ({})", join_failures(.failures))]
    AllProvidersFailed {
        operation: String,
        failures: Vec<ProviderFailure>,
    },
    #[error("Unknown error")] Unknown,
}

impl StoryError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DbUnavailable => "DB-1001",
            Self::Storage(_) => "DB-1002",
            Self::Configuration(_) => "CFG-1001",
            Self::PreferencesNotFound(_) => "SET-1001",
            Self::Serialization(_) => "SET-1002",
            Self::AllProvidersFailed { .. } => "AI-1002",
            Self::Unknown => "GEN-1000",
        }
    }
    pub fn explain(&self) -> &'static str {
        match self {
            Self::DbUnavailable => "The application could not access the SQLite database.",
            Self::Storage(_) => "Reading or writing persisted settings failed.",
            Self::Configuration(_) => "The AI provider configuration does not allow this request.",
            Self::PreferencesNotFound(_) => "The user has not saved any AI provider preferences.",
            Self::Serialization(_) => "Stored settings could not be encoded or decoded.",
            Self::AllProvidersFailed { .. } => {
                "Every configured AI provider rejected the request; retry later."
            }
            Self::Unknown => "An unspecified error occurred.",
        }
    }
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<rusqlite::Error> for StoryError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<r2d2::Error> for StoryError {
    fn from(_: r2d2::Error) -> Self {
        Self::DbUnavailable
    }
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
