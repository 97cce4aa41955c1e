/// Error taxonomy for the ghost-wallet analytic pipeline.
///
/// Stage boundaries never unwind the pipeline: analytic stages catch their
/// own `GhostError` and degrade to `Stage::Disabled` instead of propagating.
/// Only `InvalidAddress` aborts a whole request outright.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GhostError {
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("RPC transport error: {0}")]
    RpcTransport(String),

    #[error("RPC rate limited: {0}")]
    RpcRateLimited(String),

    #[error("RPC non-retryable error ({status}): {message}")]
    RpcNonRetryable { status: u16, message: String },

    #[error("failed to parse transaction: {0}")]
    ParseMalformed(String),

    #[error("degraded data: {0}")]
    DegradedData(String),

    #[error("insufficient graph data: {0}")]
    GraphInsufficient(String),

    #[error("analysis stage '{stage}' failed: {reason}")]
    AnalysisStageError { stage: String, reason: String },

    #[error("risk engine fell back to heuristic scoring: {0}")]
    EngineFallback(String),

    #[error("deadline exceeded: {0}")]
    Deadline(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, GhostError>;

impl From<reqwest::Error> for GhostError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GhostError::Deadline(e.to_string())
        } else {
            GhostError::RpcTransport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for GhostError {
    fn from(e: serde_json::Error) -> Self {
        GhostError::ParseMalformed(e.to_string())
    }
}
