//! Scripted in-memory [`QueryBackend`] for tests.
//!
//! Compiled for this crate's unit tests and, behind the `test-util` feature,
//! for dependants that want to drive the engine without AWS.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::backend::QueryBackend;
use crate::error::AthenaError;
use crate::types::{
    ExecutionContext, ExecutionHandle, ExecutionState, ExecutionStatistics, ExecutionStatus,
    QueryRequest, ResultConfig, ResultPage,
};

/// One scripted status response.
#[derive(Debug, Clone)]
pub enum StatusStep {
    Status(ExecutionStatus),
    Error(String),
}

impl From<ExecutionState> for StatusStep {
    fn from(state: ExecutionState) -> Self {
        Self::Status(ExecutionStatus::new(state))
    }
}

#[derive(Default)]
struct State {
    submitted: Vec<QueryRequest>,
    submit_error: Option<String>,
    next_id: usize,
    default_script: Vec<StatusStep>,
    scripts: HashMap<String, VecDeque<StatusStep>>,
    status_calls: HashMap<String, Vec<Instant>>,
    polling: HashSet<String>,
    max_polling: usize,
    pages: HashMap<String, Vec<ResultPage>>,
    page_calls: Vec<(String, i32, Option<String>)>,
    failing_page: Option<usize>,
    stats: HashMap<String, ExecutionStatistics>,
    stats_calls: Vec<String>,
    batch_calls: Vec<Vec<String>>,
    batches_in_flight: usize,
    max_batches_in_flight: usize,
}

/// Backend whose responses are scripted up front and whose calls are recorded.
///
/// Status scripts are consumed one step per call; the last step repeats once
/// the script is exhausted. Pages are served in order by following the
/// `next_token` of the previous page.
#[derive(Default)]
pub struct ScriptedBackend {
    state: Mutex<State>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Status script applied to every execution created by `submit_execution`.
    pub fn with_default_script<S: Into<StatusStep>>(self, steps: impl IntoIterator<Item = S>) -> Self {
        self.lock().default_script = steps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_submit_error(self, message: &str) -> Self {
        self.lock().submit_error = Some(message.to_string());
        self
    }

    /// Status script for one execution id.
    pub fn script<S: Into<StatusStep>>(&self, query_id: &str, steps: impl IntoIterator<Item = S>) {
        self.lock()
            .scripts
            .insert(query_id.to_string(), steps.into_iter().map(Into::into).collect());
    }

    /// Result pages for one execution id, in fetch order.
    pub fn pages(&self, query_id: &str, pages: Vec<ResultPage>) {
        self.lock().pages.insert(query_id.to_string(), pages);
    }

    /// Make the page at `index` (0-based fetch order) fail.
    pub fn fail_page(&self, index: usize) {
        self.lock().failing_page = Some(index);
    }

    pub fn statistics(&self, stats: ExecutionStatistics) {
        self.lock().stats.insert(stats.execution_id.clone(), stats);
    }

    pub fn submitted(&self) -> Vec<QueryRequest> {
        self.lock().submitted.clone()
    }

    pub fn status_calls(&self, query_id: &str) -> Vec<Instant> {
        self.lock()
            .status_calls
            .get(query_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Highest number of executions observed between their first status
    /// fetch and their terminal status.
    pub fn max_concurrent_polls(&self) -> usize {
        self.lock().max_polling
    }

    pub fn page_calls(&self) -> Vec<(String, i32, Option<String>)> {
        self.lock().page_calls.clone()
    }

    pub fn stats_calls(&self) -> Vec<String> {
        self.lock().stats_calls.clone()
    }

    pub fn batch_calls(&self) -> Vec<Vec<String>> {
        self.lock().batch_calls.clone()
    }

    pub fn max_concurrent_batches(&self) -> usize {
        self.lock().max_batches_in_flight
    }
}

/// Statistics fixture with the given scanned bytes.
pub fn stats_fixture(query_id: &str, data_scanned_bytes: i64) -> ExecutionStatistics {
    ExecutionStatistics {
        execution_id: query_id.to_string(),
        sql_text: format!("SELECT * FROM logs -- {query_id}"),
        result_config: ResultConfig {
            output_location: Some(format!("s3://results/{query_id}.csv")),
            encryption: None,
        },
        execution_context: ExecutionContext {
            database: Some("default".into()),
            catalog: None,
        },
        status: ExecutionStatus::new(ExecutionState::Succeeded),
        engine_execution_time_ms: 1500,
        data_scanned_bytes,
    }
}

/// Page fixture from string slices.
pub fn page(columns: &[&str], rows: &[&[&str]], next_token: Option<&str>) -> ResultPage {
    ResultPage {
        column_names: columns.iter().map(|c| c.to_string()).collect(),
        rows: rows
            .iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect(),
        next_token: next_token.map(|t| t.to_string()),
    }
}

#[async_trait]
impl QueryBackend for ScriptedBackend {
    async fn submit_execution(&self, request: &QueryRequest) -> Result<ExecutionHandle, AthenaError> {
        let mut state = self.lock();
        state.submitted.push(request.clone());
        if let Some(ref message) = state.submit_error {
            return Err(AthenaError::Submission(message.clone()));
        }
        state.next_id += 1;
        let id = format!("exec-{}", state.next_id);
        let script: VecDeque<StatusStep> = state.default_script.iter().cloned().collect();
        state.scripts.entry(id.clone()).or_insert(script);
        Ok(id)
    }

    async fn execution_status(&self, query_id: &str) -> Result<ExecutionStatus, AthenaError> {
        let mut state = self.lock();
        state
            .status_calls
            .entry(query_id.to_string())
            .or_default()
            .push(Instant::now());

        if state.polling.insert(query_id.to_string()) {
            state.max_polling = state.max_polling.max(state.polling.len());
        }

        let step = {
            let script = state.scripts.entry(query_id.to_string()).or_default();
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };

        match step {
            Some(StatusStep::Status(status)) => {
                if status.state.is_terminal() {
                    state.polling.remove(query_id);
                }
                Ok(status)
            }
            Some(StatusStep::Error(message)) => {
                state.polling.remove(query_id);
                Err(AthenaError::Poll {
                    query_id: query_id.to_string(),
                    message,
                })
            }
            None => Ok(ExecutionStatus::new(ExecutionState::Succeeded)),
        }
    }

    async fn result_page(
        &self,
        query_id: &str,
        max_results: i32,
        next_token: Option<&str>,
    ) -> Result<ResultPage, AthenaError> {
        let mut state = self.lock();
        let call_index = state.page_calls.len();
        state
            .page_calls
            .push((query_id.to_string(), max_results, next_token.map(|t| t.to_string())));

        if state.failing_page == Some(call_index) {
            return Err(AthenaError::Fetch {
                query_id: query_id.to_string(),
                message: "scripted page failure".into(),
            });
        }

        let pages = state.pages.get(query_id).cloned().unwrap_or_default();
        let index = match next_token {
            None => Some(0),
            Some(token) => pages
                .iter()
                .position(|p| p.next_token.as_deref() == Some(token))
                .map(|i| i + 1),
        };

        match index.and_then(|i| pages.get(i)) {
            Some(page) => Ok(page.clone()),
            None if next_token.is_none() => Ok(ResultPage::default()),
            None => Err(AthenaError::Fetch {
                query_id: query_id.to_string(),
                message: format!("unknown continuation token {next_token:?}"),
            }),
        }
    }

    async fn execution_statistics(&self, query_id: &str) -> Result<ExecutionStatistics, AthenaError> {
        let mut state = self.lock();
        state.stats_calls.push(query_id.to_string());
        state
            .stats
            .get(query_id)
            .cloned()
            .ok_or_else(|| AthenaError::NotFound(query_id.to_string()))
    }

    async fn execution_statistics_batch(
        &self,
        query_ids: &[String],
    ) -> Result<Vec<ExecutionStatistics>, AthenaError> {
        {
            let mut state = self.lock();
            state.batch_calls.push(query_ids.to_vec());
            state.batches_in_flight += 1;
            state.max_batches_in_flight = state.max_batches_in_flight.max(state.batches_in_flight);
        }

        // Give sibling batch futures a chance to start before this one finishes.
        tokio::task::yield_now().await;

        let mut state = self.lock();
        state.batches_in_flight -= 1;
        Ok(query_ids
            .iter()
            .filter_map(|id| state.stats.get(id).cloned())
            .collect())
    }
}
