//! The managed query-execution backend seam.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AthenaError;
use crate::types::{ExecutionHandle, ExecutionStatistics, ExecutionStatus, QueryRequest, ResultPage};

/// Operations the engine consumes from the query service.
///
/// [`AwsAthenaBackend`](crate::AwsAthenaBackend) implements these against the
/// Athena API; tests substitute scripted in-memory backends. Implementations
/// must be stateless with respect to callers so one handle can be shared by
/// every in-flight query.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Start one execution. Errors map to [`AthenaError::Submission`].
    async fn submit_execution(&self, request: &QueryRequest) -> Result<ExecutionHandle, AthenaError>;

    /// Current status. Errors map to [`AthenaError::Poll`].
    async fn execution_status(&self, query_id: &str) -> Result<ExecutionStatus, AthenaError>;

    /// One result page of at most `max_results` rows.
    /// Errors map to [`AthenaError::Fetch`].
    async fn result_page(
        &self,
        query_id: &str,
        max_results: i32,
        next_token: Option<&str>,
    ) -> Result<ResultPage, AthenaError>;

    /// Metadata for one execution; [`AthenaError::NotFound`] for unknown ids.
    async fn execution_statistics(&self, query_id: &str) -> Result<ExecutionStatistics, AthenaError>;

    /// Metadata for up to [`BATCH_CEILING`](crate::batch::BATCH_CEILING) executions.
    async fn execution_statistics_batch(
        &self,
        query_ids: &[String],
    ) -> Result<Vec<ExecutionStatistics>, AthenaError>;
}

/// Blanket implementation so `Arc<dyn QueryBackend>` can be used directly.
#[async_trait]
impl<T: QueryBackend + ?Sized> QueryBackend for Arc<T> {
    async fn submit_execution(&self, request: &QueryRequest) -> Result<ExecutionHandle, AthenaError> {
        (**self).submit_execution(request).await
    }

    async fn execution_status(&self, query_id: &str) -> Result<ExecutionStatus, AthenaError> {
        (**self).execution_status(query_id).await
    }

    async fn result_page(
        &self,
        query_id: &str,
        max_results: i32,
        next_token: Option<&str>,
    ) -> Result<ResultPage, AthenaError> {
        (**self).result_page(query_id, max_results, next_token).await
    }

    async fn execution_statistics(&self, query_id: &str) -> Result<ExecutionStatistics, AthenaError> {
        (**self).execution_statistics(query_id).await
    }

    async fn execution_statistics_batch(
        &self,
        query_ids: &[String],
    ) -> Result<Vec<ExecutionStatistics>, AthenaError> {
        (**self).execution_statistics_batch(query_ids).await
    }
}
