//! Integration tests for athenaql-athena.
//!
//! These tests drive the public API through an in-memory backend and never
//! touch AWS. Tests marked with `#[ignore]` need real credentials and must be
//! run explicitly.

mod client;
mod config;
mod support;
mod usage;
