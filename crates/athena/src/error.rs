//! Athena client error types.

use thiserror::Error;

use crate::types::ExecutionState;

/// Errors that can occur during Athena operations.
#[derive(Debug, Error)]
pub enum AthenaError {
    /// The backend rejected the query request.
    #[error("query submission failed: {0}")]
    Submission(String),

    /// Fetching the execution status failed (distinct from a FAILED query).
    #[error("status poll for query {query_id} failed: {message}")]
    Poll { query_id: String, message: String },

    /// The query reached FAILED or CANCELLED.
    #[error("query {query_id} ended {state}: {reason}")]
    Execution {
        query_id: String,
        state: ExecutionState,
        reason: String,
    },

    /// A result page or statistics fetch failed.
    #[error("fetch for query {query_id} failed: {message}")]
    Fetch { query_id: String, message: String },

    /// Statistics were requested for an execution the backend does not know.
    #[error("query execution not found: {0}")]
    NotFound(String),

    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl AthenaError {
    /// Terminal state carried by an [`AthenaError::Execution`].
    pub fn terminal_state(&self) -> Option<ExecutionState> {
        match self {
            Self::Execution { state, .. } => Some(*state),
            _ => None,
        }
    }
}
