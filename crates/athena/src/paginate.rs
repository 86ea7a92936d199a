//! Multi-page result fetching.

use tracing::debug;

use crate::backend::QueryBackend;
use crate::error::AthenaError;
use crate::reshape::reshape_page;
use crate::types::Record;

/// Fetch every page of a finished execution and reshape it into records.
///
/// Follows `next_token` until a page comes back without one; there is no
/// page limit. Records keep page order and row order. Any failed page aborts
/// the whole run: no partial result is returned.
pub async fn fetch_all_records(
    backend: &dyn QueryBackend,
    query_id: &str,
    page_size: i32,
) -> Result<Vec<Record>, AthenaError> {
    let mut records: Vec<Record> = Vec::new();
    let mut next_token: Option<String> = None;
    let mut pages: usize = 0;

    loop {
        let page = backend
            .result_page(query_id, page_size, next_token.as_deref())
            .await?;
        pages += 1;

        records.extend(reshape_page(&page.column_names, &page.rows));

        next_token = page.next_token;
        if next_token.is_none() {
            break;
        }
    }

    debug!(query_id = %query_id, pages, records = records.len(), "Fetched all result pages");
    Ok(records)
}
