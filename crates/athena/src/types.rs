//! Request, status, page and statistics types shared by the engine and its backends.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::AthenaError;
use crate::usage::{bytes_to_tb, tb_to_dollars};

/// Backend-assigned identifier of one query execution.
pub type ExecutionHandle = String;

/// One result row keyed by column name, in column order.
pub type Record = IndexMap<String, String>;

// ── Encryption ──────────────────────────────────────────────────

/// Server/client side encryption mode for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EncryptionOption {
    SseS3,
    SseKms,
    CseKms,
}

impl EncryptionOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SseS3 => "SSE_S3",
            Self::SseKms => "SSE_KMS",
            Self::CseKms => "CSE_KMS",
        }
    }
}

impl FromStr for EncryptionOption {
    type Err = AthenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SSE_S3" => Ok(Self::SseS3),
            "SSE_KMS" => Ok(Self::SseKms),
            "CSE_KMS" => Ok(Self::CseKms),
            other => Err(AthenaError::Config(format!(
                "unknown encryption option '{other}' (expected SSE_S3, SSE_KMS or CSE_KMS)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionConfig {
    pub option: EncryptionOption,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key: Option<String>,
}

// ── Requests ────────────────────────────────────────────────────

/// A fully resolved query submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    pub sql_text: String,
    pub database: String,
    pub output_location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionConfig>,
}

/// Caller-supplied request fields. Every field set here wins over the
/// client's instance defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueryOverrides {
    #[serde(default)]
    pub sql_text: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub output_location: Option<String>,
    #[serde(default)]
    pub work_group: Option<String>,
    #[serde(default)]
    pub encryption: Option<EncryptionConfig>,
}

impl QueryOverrides {
    pub fn sql(sql: impl Into<String>) -> Self {
        Self {
            sql_text: Some(sql.into()),
            ..Self::default()
        }
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn output_location(mut self, location: impl Into<String>) -> Self {
        self.output_location = Some(location.into());
        self
    }

    pub fn work_group(mut self, work_group: impl Into<String>) -> Self {
        self.work_group = Some(work_group.into());
        self
    }

    pub fn encryption(mut self, encryption: EncryptionConfig) -> Self {
        self.encryption = Some(encryption);
        self
    }
}

/// Input accepted by [`AthenaClient::query`](crate::AthenaClient::query).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryInput {
    Sql(String),
    Request(QueryOverrides),
}

impl From<&str> for QueryInput {
    fn from(sql: &str) -> Self {
        Self::Sql(sql.to_string())
    }
}

impl From<String> for QueryInput {
    fn from(sql: String) -> Self {
        Self::Sql(sql)
    }
}

impl From<QueryOverrides> for QueryInput {
    fn from(overrides: QueryOverrides) -> Self {
        Self::Request(overrides)
    }
}

// ── Status ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl ExecutionState {
    /// SUCCEEDED, FAILED and CANCELLED never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    pub state: ExecutionState,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExecutionStatus {
    pub fn new(state: ExecutionState) -> Self {
        Self {
            state,
            reason: None,
            submitted_at: None,
            completed_at: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

// ── Result pages ────────────────────────────────────────────────

/// One page of a query result as returned by `GetQueryResults`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPage {
    pub column_names: Vec<String>,
    /// Raw rows; SQL NULL cells are empty strings.
    pub rows: Vec<Vec<String>>,
    /// Present when more pages follow.
    #[serde(default)]
    pub next_token: Option<String>,
}

// ── Statistics ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultConfig {
    pub output_location: Option<String>,
    pub encryption: Option<EncryptionConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub database: Option<String>,
    pub catalog: Option<String>,
}

/// Snapshot of one execution's metadata, fetched on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatistics {
    pub execution_id: ExecutionHandle,
    pub sql_text: String,
    pub result_config: ResultConfig,
    pub execution_context: ExecutionContext,
    pub status: ExecutionStatus,
    pub engine_execution_time_ms: i64,
    pub data_scanned_bytes: i64,
}

impl ExecutionStatistics {
    /// Estimated query cost in USD at the per-TB list price.
    pub fn cost_estimate_usd(&self) -> f64 {
        tb_to_dollars(bytes_to_tb(self.data_scanned_bytes))
    }
}
