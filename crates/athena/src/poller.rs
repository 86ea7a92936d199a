//! Bounded poll-until-terminal worker pool.
//!
//! Every admitted execution holds one semaphore permit for the whole of its
//! poll loop. Tokio's semaphore is fair, so waiters are admitted in FIFO
//! order; completion order still follows each query's real duration.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::backend::QueryBackend;
use crate::error::AthenaError;
use crate::types::{ExecutionState, ExecutionStatus};

/// Fixed-capacity poller with a fixed retry interval.
#[derive(Debug, Clone)]
pub struct Poller {
    slots: Arc<Semaphore>,
    capacity: usize,
    interval: Duration,
}

impl Poller {
    /// `capacity` must lie in `1..=Semaphore::MAX_PERMITS`
    /// (see [`AthenaConfig::validate`](crate::AthenaConfig::validate)).
    pub fn new(capacity: usize, interval: Duration) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            interval,
        }
    }

    /// Number of poll loops currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }

    /// Wait for a slot, then poll `query_id` until it reaches a terminal state.
    ///
    /// Returns the SUCCEEDED status. FAILED and CANCELLED end with
    /// [`AthenaError::Execution`]; a failed status fetch ends with the
    /// backend's [`AthenaError::Poll`] immediately. There is no retry cap and
    /// no overall timeout.
    pub async fn wait_for(
        &self,
        backend: &dyn QueryBackend,
        query_id: &str,
    ) -> Result<ExecutionStatus, AthenaError> {
        let _permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| AthenaError::Poll {
                query_id: query_id.to_string(),
                message: "poller is shut down".into(),
            })?;

        debug!(query_id = %query_id, in_flight = self.in_flight(), "Poll slot acquired");
        self.poll_loop(backend, query_id).await
    }

    async fn poll_loop(
        &self,
        backend: &dyn QueryBackend,
        query_id: &str,
    ) -> Result<ExecutionStatus, AthenaError> {
        let mut attempts: u64 = 0;

        loop {
            attempts += 1;
            let status = backend.execution_status(query_id).await?;

            debug!(
                query_id = %query_id,
                state = %status.state,
                attempts,
                "Polling query status"
            );

            match status.state {
                ExecutionState::Succeeded => {
                    info!(query_id = %query_id, attempts, "Query succeeded");
                    return Ok(status);
                }
                ExecutionState::Failed | ExecutionState::Cancelled => {
                    let reason = status
                        .reason
                        .clone()
                        .unwrap_or_else(|| "unknown".to_string());
                    if status.state == ExecutionState::Failed {
                        error!(query_id = %query_id, reason = %reason, "Query failed");
                    } else {
                        warn!(query_id = %query_id, reason = %reason, "Query was cancelled");
                    }
                    return Err(AthenaError::Execution {
                        query_id: query_id.to_string(),
                        state: status.state,
                        reason,
                    });
                }
                ExecutionState::Queued | ExecutionState::Running => {
                    tokio::time::sleep(self.interval).await;
                }
            }
        }
    }
}
