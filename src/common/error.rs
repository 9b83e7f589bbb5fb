use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Invalid trajectory batch: {reason}")]
    InvalidBatch { reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Infrastructure error: {0}")]
    InfrastructureError(String),
}

/// Failures of the single request/response primitive.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Prediction service returned HTTP {0}")]
    Status(u16),

    #[error("Prediction service returned an empty body")]
    EmptyBody,

    #[error("Connection error: {0}")]
    Connection(String),
}

/// Outcome of one failed fetch attempt. Every variant except `Cancelled`
/// is recoverable by retrying.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("Malformed prediction response: {0}")]
    Parse(String),

    #[error("Prediction response carried no usable trajectory steps")]
    EmptyTrajectory,

    #[error("All candidate trajectories blocked after {attempts} attempts")]
    AllCandidatesBlocked { attempts: u32 },

    #[error("Agent cancelled while a request was in flight")]
    Cancelled,

    #[error("Observation capture failed: {0}")]
    Observation(#[from] DomainError),
}

impl FetchError {
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FetchError::Cancelled)
    }
}

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Agent task failed: {0}")]
    AgentTask(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
pub type ApplicationResult<T> = Result<T, ApplicationError>;
