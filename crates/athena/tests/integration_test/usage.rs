//! Usage summaries over batch statistics.

use std::sync::Arc;

use athenaql_athena::*;

use crate::support::{fast_config, TableBackend};

#[tokio::test]
async fn test_usage_summary_from_batch_stats() {
    let backend = Arc::new(TableBackend::new(&["n"], vec![], 1));
    backend.add_stats("q1", 1_073_741_824);
    backend.add_stats("q2", 536_870_912);
    backend.add_stats("q3", 0);
    let client = AthenaClient::with_backend(fast_config(), backend).unwrap();

    let stats = client.batch_stats(&["q1", "q2", "q3"]).await.unwrap();
    let summary = UsageSummary::from_statistics(&stats);

    assert_eq!(summary.executions, 2);
    assert_eq!(summary.data_scanned(), "1.50 GB");
    // 2 x 90s of engine time.
    assert_eq!(summary.total_minutes(), 3);
    assert_eq!(summary.total_cost(), "$ 0.00732422");
}

#[test]
fn test_formatting_helpers() {
    assert_eq!(bytes_to_size(1024), "1.00 KB");
    assert_eq!(bytes_to_size(-1), "n/a");
    assert_eq!(format_cost(bytes_to_tb(1_099_511_627_776 * 3)), "$ 15.00");
    assert_eq!(millis_to_minutes(125_000), 2);
}
