//! Athena query client.
//!
//! Provides [`AthenaClient`], the entry point used by the GraphQL layer:
//! submit a query, wait for it in the bounded poller, page through the
//! results and reshape them into records. Statistics lookups go straight to
//! the backend without polling.

use std::sync::Arc;

use tracing::{info, warn};

use crate::aws::AwsAthenaBackend;
use crate::backend::QueryBackend;
use crate::batch::{fetch_batch_statistics, trim_quotes};
use crate::config::AthenaConfig;
use crate::error::AthenaError;
use crate::paginate::fetch_all_records;
use crate::poller::Poller;
use crate::types::{
    ExecutionHandle, ExecutionStatistics, QueryInput, QueryOverrides, QueryRequest, Record,
    ResultPage,
};

/// Page size used by [`AthenaClient::results`] when the caller passes none.
const DEFAULT_SINGLE_PAGE_SIZE: i32 = 100;

/// Client for executing queries against AWS Athena.
///
/// Cheap to clone: clones share the backend handle and the poller's slots.
#[derive(Clone)]
pub struct AthenaClient {
    config: AthenaConfig,
    backend: Arc<dyn QueryBackend>,
    poller: Poller,
}

impl AthenaClient {
    /// Create a client talking to AWS with the region and credentials in `config`.
    pub async fn new(config: AthenaConfig) -> Result<Self, AthenaError> {
        config.validate()?;
        let backend = AwsAthenaBackend::new(&config).await;
        Self::with_backend(config, Arc::new(backend))
    }

    /// Create a client over any [`QueryBackend`].
    pub fn with_backend(
        config: AthenaConfig,
        backend: Arc<dyn QueryBackend>,
    ) -> Result<Self, AthenaError> {
        config.validate()?;

        if !config.is_configured() {
            warn!("No Athena output location configured; queries rely on the workgroup default");
        }

        let poller = Poller::new(config.poll_concurrency, config.poll_interval());

        info!(
            region = %config.region,
            database = %config.database,
            poll_concurrency = config.poll_concurrency,
            poll_interval_ms = config.poll_interval_ms,
            page_size = config.page_size,
            "AthenaClient initialised"
        );

        Ok(Self {
            config,
            backend,
            poller,
        })
    }

    pub fn config(&self) -> &AthenaConfig {
        &self.config
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    // -----------------------------------------------------------------------
    // Public API
    // -----------------------------------------------------------------------

    /// Resolve caller input against the instance defaults.
    ///
    /// Caller fields win field by field. Encryption and workgroup are left
    /// out entirely when neither side sets them.
    pub fn build_request(&self, input: QueryInput) -> Result<QueryRequest, AthenaError> {
        let overrides = match input {
            QueryInput::Sql(sql) => QueryOverrides::sql(sql),
            QueryInput::Request(overrides) => overrides,
        };

        let sql_text = overrides
            .sql_text
            .filter(|sql| !sql.trim().is_empty())
            .ok_or_else(|| AthenaError::Submission("query string is required".into()))?;

        Ok(QueryRequest {
            sql_text,
            database: overrides
                .database
                .unwrap_or_else(|| self.config.database.clone()),
            output_location: overrides
                .output_location
                .unwrap_or_else(|| self.config.output_location.clone()),
            work_group: overrides.work_group.or_else(|| self.config.workgroup.clone()),
            encryption: overrides.encryption.or_else(|| self.config.encryption.clone()),
        })
    }

    /// Submit a query without waiting for it.
    pub async fn submit(&self, input: impl Into<QueryInput>) -> Result<ExecutionHandle, AthenaError> {
        let request = self.build_request(input.into())?;
        info!(sql = %request.sql_text, database = %request.database, "Starting Athena query");

        let query_id = self.backend.submit_execution(&request).await?;
        info!(query_id = %query_id, "Query execution started");
        Ok(query_id)
    }

    /// Execute a query and return every result row as a [`Record`].
    ///
    /// This performs the full lifecycle:
    /// 1. Submit the execution (exactly once)
    /// 2. Poll in the bounded poller until a terminal state
    /// 3. Fetch and reshape every result page
    pub async fn query(&self, input: impl Into<QueryInput>) -> Result<Vec<Record>, AthenaError> {
        let query_id = self.submit(input).await?;

        self.poller.wait_for(self.backend.as_ref(), &query_id).await?;

        let records =
            fetch_all_records(self.backend.as_ref(), &query_id, self.config.page_size).await?;

        info!(query_id = %query_id, rows = records.len(), "Query results assembled");
        Ok(records)
    }

    /// Fetch one raw result page of an execution (no polling, no reshaping).
    pub async fn results(
        &self,
        query_id: &str,
        max_results: Option<i32>,
        next_token: Option<&str>,
    ) -> Result<ResultPage, AthenaError> {
        let max_results = max_results.unwrap_or(DEFAULT_SINGLE_PAGE_SIZE);
        self.backend
            .result_page(trim_quotes(query_id), max_results, next_token)
            .await
    }

    /// Get metadata and statistics for one execution.
    ///
    /// Accepts ids still wrapped in JSON quotes (`"abc123"`).
    pub async fn stats(&self, query_id: &str) -> Result<ExecutionStatistics, AthenaError> {
        let query_id = trim_quotes(query_id);
        if query_id.is_empty() {
            return Err(AthenaError::NotFound(String::new()));
        }
        self.backend.execution_statistics(query_id).await
    }

    /// Statistics for many executions; only executions that scanned data are returned.
    pub async fn batch_stats<S: AsRef<str>>(
        &self,
        query_ids: &[S],
    ) -> Result<Vec<ExecutionStatistics>, AthenaError> {
        fetch_batch_statistics(self.backend.as_ref(), query_ids).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
