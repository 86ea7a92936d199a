//! End-to-end query lifecycle through AthenaClient.

use std::sync::Arc;

use athenaql_athena::*;

use crate::support::{fast_config, rows, TableBackend};

#[tokio::test]
async fn test_query_walks_every_page_and_drops_headers() {
    let backend = Arc::new(TableBackend::new(&["id", "user"], rows(10), 4));
    let client = AthenaClient::with_backend(fast_config(), backend.clone()).unwrap();

    let records = client.query("SELECT id, user FROM events").await.unwrap();

    // 11 table rows (header + 10) over pages of 4: header dropped on page one only.
    assert_eq!(records.len(), 10);
    assert_eq!(records[0]["id"], "0");
    assert_eq!(records[9]["user"], "user-9");
    let keys: Vec<&str> = records[0].keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["id", "user"]);

    assert_eq!(backend.submitted.lock().unwrap().len(), 1);
    assert_eq!(backend.polls("it-1"), 3);
}

#[tokio::test]
async fn test_concurrent_queries_share_the_poller() {
    let backend = Arc::new(TableBackend::new(&["id", "user"], rows(3), 10));
    let cfg = AthenaConfig {
        poll_concurrency: 2,
        ..fast_config()
    };
    let client = AthenaClient::with_backend(cfg, backend.clone()).unwrap();

    let queries = (0..6).map(|i| {
        let client = client.clone();
        async move { client.query(format!("SELECT {i}")).await }
    });
    let results = futures::future::join_all(queries).await;

    assert!(results.iter().all(|r| matches!(r, Ok(records) if records.len() == 3)));
    assert_eq!(backend.submitted.lock().unwrap().len(), 6);
    assert_eq!(client.poller().in_flight(), 0);
}

#[tokio::test]
async fn test_request_overrides_reach_the_backend() {
    let backend = Arc::new(TableBackend::new(&["n"], vec![], 10));
    let client = AthenaClient::with_backend(fast_config(), backend.clone()).unwrap();

    let request = QueryOverrides::sql("SELECT 1")
        .database("cloudtrail")
        .work_group("analysts");
    let records = client.query(request).await.unwrap();

    assert!(records.is_empty());
    let submitted = backend.submitted.lock().unwrap();
    assert_eq!(submitted[0].database, "cloudtrail");
    assert_eq!(submitted[0].work_group.as_deref(), Some("analysts"));
    assert_eq!(submitted[0].output_location, "s3://bucket/athena_temp/");
    assert!(submitted[0].encryption.is_none());
}

#[tokio::test]
async fn test_single_results_page_is_raw() {
    let backend = Arc::new(TableBackend::new(&["id", "user"], rows(5), 3));
    let client = AthenaClient::with_backend(fast_config(), backend).unwrap();

    let first = client.results("it-1", None, None).await.unwrap();
    assert_eq!(first.rows.len(), 3);
    assert_eq!(first.rows[0], vec!["id".to_string(), "user".to_string()]);

    let second = client
        .results("it-1", Some(3), first.next_token.as_deref())
        .await
        .unwrap();
    assert_eq!(second.rows[0][0], "2");
    assert!(second.next_token.is_none());
}

#[tokio::test]
async fn test_stats_and_batch_stats() {
    let backend = Arc::new(TableBackend::new(&["n"], vec![], 10));
    backend.add_stats("a", 0);
    backend.add_stats("b", 1_099_511_627_776);
    let client = AthenaClient::with_backend(fast_config(), backend).unwrap();

    let one = client.stats("\"b\"").await.unwrap();
    assert!((one.cost_estimate_usd() - 5.0).abs() < 1e-9);

    let err = client.stats("missing").await.unwrap_err();
    assert!(matches!(err, AthenaError::NotFound(_)));

    let ids: Vec<String> = vec!["\"a\"".into(), "\"b\"".into(), "\"c\"".into(), "".into()];
    let many = client.batch_stats(&ids).await.unwrap();
    assert_eq!(many.len(), 1);
    assert_eq!(many[0].execution_id, "b");
}

// ── Real AWS Tests (ignored by default) ──────────────────────────────

/// Requires AWS credentials and `ATHENA_OUTPUT_LOCATION`.
///
/// Run with: `cargo test -p athenaql-athena real_athena -- --ignored`
#[tokio::test]
#[ignore]
async fn test_real_athena_query() {
    load_dotenv();
    let config = AthenaConfig::from_env().expect("valid Athena env config");
    let client = AthenaClient::new(config).await.expect("client");

    let records = client.query("SELECT 1 AS test_column").await.expect("query");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["test_column"], "1");
}
