use thiserror::Error;

/// Errors raised by the retrieval and validation core.
///
/// "No evidence" is never an error: empty result lists and insufficient
/// verdicts are ordinary values. Variants here are reserved for conditions
/// the caller has to handle or surface.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The lexical or semantic index has not been built (or is mid-rebuild).
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// An embedding, generation or vector-index call failed.
    #[error("Collaborator failed: {0}")]
    Collaborator(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl Error {
    pub fn collaborator(err: impl std::fmt::Display) -> Self { Self::Collaborator(err.to_string()) }

    pub fn operation(err: impl std::fmt::Display) -> Self { Self::Operation(err.to_string()) }

    pub fn is_unavailable(&self) -> bool { matches!(self, Self::IndexUnavailable(_)) }
}

pub type Result<T> = std::result::Result<T, Error>;
