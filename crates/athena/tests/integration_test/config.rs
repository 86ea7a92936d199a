//! Tests for AthenaConfig: profile selection through ATHENAQL_PROFILE.

use std::env;
use std::sync::Mutex;

use athenaql_athena::*;

// Env-based tests must run serially to avoid interfering with each other.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_athena_env() {
    let keys = [
        "ATHENAQL_PROFILE",
        "ATHENA_DATABASE",
        "ATHENA_OUTPUT_LOCATION",
        "ATHENA_WORKGROUP",
        "ATHENA_POLL_CONCURRENCY",
        "STAGING_ATHENA_DATABASE",
        "STAGING_ATHENA_WORKGROUP",
    ];
    for k in keys {
        env::remove_var(k);
    }
}

#[test]
fn test_profile_selected_by_env() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_athena_env();

    env::set_var("ATHENA_DATABASE", "base_db");
    env::set_var("ATHENA_OUTPUT_LOCATION", "s3://base/");
    env::set_var("ATHENAQL_PROFILE", "staging");
    env::set_var("STAGING_ATHENA_DATABASE", "staging_db");
    env::set_var("STAGING_ATHENA_WORKGROUP", "staging-wg");

    let cfg = AthenaConfig::from_env().unwrap();

    // Profile name is upper-cased before lookup.
    assert_eq!(cfg.database, "staging_db");
    assert_eq!(cfg.workgroup.as_deref(), Some("staging-wg"));
    // Unprofiled keys still apply.
    assert_eq!(cfg.output_location, "s3://base/");
    assert!(cfg.is_configured());

    clear_athena_env();
}

#[test]
fn test_zero_concurrency_fails_client_construction() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_athena_env();

    env::set_var("ATHENA_POLL_CONCURRENCY", "0");
    let cfg = AthenaConfig::from_env().unwrap();

    let backend = std::sync::Arc::new(crate::support::TableBackend::new(&["n"], vec![], 1));
    let err = match AthenaClient::with_backend(cfg, backend) {
        Ok(_) => panic!("zero concurrency must be rejected"),
        Err(e) => e,
    };
    assert!(matches!(err, AthenaError::Config(_)));

    clear_athena_env();
}
