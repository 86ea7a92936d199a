//! Batched execution statistics.

use futures::future::try_join_all;
use indexmap::IndexSet;
use tracing::debug;

use crate::backend::QueryBackend;
use crate::error::AthenaError;
use crate::types::ExecutionStatistics;

/// Maximum ids accepted by one `BatchGetQueryExecution` call.
pub const BATCH_CEILING: usize = 50;

/// Strip surrounding double quotes from an id extracted from JSON text
/// (e.g. `json_extract` output such as `"abc123"`).
pub fn trim_quotes(id: &str) -> &str {
    id.trim_matches('"')
}

/// Quote-trim, drop empties and de-duplicate, keeping first-seen order.
pub fn normalize_ids<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    ids.iter()
        .map(|id| trim_quotes(id.as_ref()))
        .filter(|id| !id.is_empty())
        .map(|id| id.to_string())
        .collect::<IndexSet<String>>()
        .into_iter()
        .collect()
}

/// Fetch statistics for `ids` in chunks of [`BATCH_CEILING`], all chunks
/// concurrently, keeping only executions that scanned data.
///
/// Output order is not guaranteed to follow input order. The first failing
/// chunk fails the whole call.
pub async fn fetch_batch_statistics<S: AsRef<str>>(
    backend: &dyn QueryBackend,
    ids: &[S],
) -> Result<Vec<ExecutionStatistics>, AthenaError> {
    let ids = normalize_ids(ids);
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let chunks: Vec<&[String]> = ids.chunks(BATCH_CEILING).collect();
    debug!(ids = ids.len(), batches = chunks.len(), "Fetching batch statistics");

    let responses = try_join_all(
        chunks
            .iter()
            .map(|chunk| backend.execution_statistics_batch(chunk)),
    )
    .await?;

    Ok(responses
        .into_iter()
        .flatten()
        .filter(|stats| stats.data_scanned_bytes > 0)
        .collect())
}
