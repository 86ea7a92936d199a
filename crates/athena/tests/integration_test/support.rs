//! Minimal in-memory backend: every execution succeeds after a fixed number
//! of RUNNING observations and serves one fixed table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use athenaql_athena::*;

pub struct TableBackend {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub rows_per_page: usize,
    pub running_polls: usize,
    pub submitted: Mutex<Vec<QueryRequest>>,
    polls: Mutex<HashMap<String, usize>>,
    next_id: AtomicUsize,
    pub stats: Mutex<HashMap<String, ExecutionStatistics>>,
}

impl TableBackend {
    pub fn new(columns: &[&str], rows: Vec<Vec<String>>, rows_per_page: usize) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            rows_per_page,
            running_polls: 2,
            submitted: Mutex::new(Vec::new()),
            polls: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
            stats: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_stats(&self, id: &str, bytes: i64) {
        self.stats.lock().unwrap().insert(
            id.to_string(),
            ExecutionStatistics {
                execution_id: id.to_string(),
                sql_text: "SELECT 1".into(),
                result_config: ResultConfig {
                    output_location: None,
                    encryption: None,
                },
                execution_context: ExecutionContext {
                    database: Some("default".into()),
                    catalog: None,
                },
                status: ExecutionStatus::new(ExecutionState::Succeeded),
                engine_execution_time_ms: 90_000,
                data_scanned_bytes: bytes,
            },
        );
    }

    pub fn polls(&self, id: &str) -> usize {
        self.polls.lock().unwrap().get(id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl QueryBackend for TableBackend {
    async fn submit_execution(&self, request: &QueryRequest) -> Result<ExecutionHandle, AthenaError> {
        self.submitted.lock().unwrap().push(request.clone());
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("it-{n}"))
    }

    async fn execution_status(&self, query_id: &str) -> Result<ExecutionStatus, AthenaError> {
        let mut polls = self.polls.lock().unwrap();
        let seen = polls.entry(query_id.to_string()).or_insert(0);
        *seen += 1;
        if *seen > self.running_polls {
            Ok(ExecutionStatus::new(ExecutionState::Succeeded))
        } else {
            Ok(ExecutionStatus::new(ExecutionState::Running))
        }
    }

    async fn result_page(
        &self,
        _query_id: &str,
        _max_results: i32,
        next_token: Option<&str>,
    ) -> Result<ResultPage, AthenaError> {
        // Row 0 of the underlying table is the header row, as Athena returns it.
        let mut table = vec![self.columns.clone()];
        table.extend(self.rows.iter().cloned());

        let offset: usize = next_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (offset + self.rows_per_page).min(table.len());
        Ok(ResultPage {
            column_names: self.columns.clone(),
            rows: table[offset..end].to_vec(),
            next_token: (end < table.len()).then(|| end.to_string()),
        })
    }

    async fn execution_statistics(&self, query_id: &str) -> Result<ExecutionStatistics, AthenaError> {
        self.stats
            .lock()
            .unwrap()
            .get(query_id)
            .cloned()
            .ok_or_else(|| AthenaError::NotFound(query_id.to_string()))
    }

    async fn execution_statistics_batch(
        &self,
        query_ids: &[String],
    ) -> Result<Vec<ExecutionStatistics>, AthenaError> {
        let stats = self.stats.lock().unwrap();
        Ok(query_ids.iter().filter_map(|id| stats.get(id).cloned()).collect())
    }
}

pub fn rows(n: usize) -> Vec<Vec<String>> {
    (0..n)
        .map(|i| vec![i.to_string(), format!("user-{i}")])
        .collect()
}

pub fn fast_config() -> AthenaConfig {
    AthenaConfig {
        output_location: "s3://bucket/athena_temp/".into(),
        poll_interval_ms: 5,
        page_size: 4,
        ..AthenaConfig::default()
    }
}
