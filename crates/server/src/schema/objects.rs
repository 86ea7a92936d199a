//! GraphQL output types.

use async_graphql::{ComplexObject, Context, Object, Result, SimpleObject};

use athenaql_athena::{
    bytes_to_size, bytes_to_tb, format_cost, trim_quotes, AthenaClient, EncryptionConfig,
    ExecutionStatistics, ExecutionStatus, Record, ResultConfig, UsageSummary,
};

/// Case-insensitive column lookup; Athena lower-cases column labels.
fn column<'a>(record: &'a Record, name: &str) -> Option<&'a str> {
    record
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn column_string(record: &Record, name: &str) -> String {
    column(record, name).unwrap_or_default().to_string()
}

fn column_trimmed(record: &Record, name: &str) -> String {
    trim_quotes(column(record, name).unwrap_or_default()).to_string()
}

// ── Execution statistics ────────────────────────────────────────

#[derive(SimpleObject)]
#[graphql(name = "AthenaResultEncryptionConfiguration")]
pub struct EncryptionObject {
    encryption_option: String,
    kms_key: Option<String>,
}

impl From<&EncryptionConfig> for EncryptionObject {
    fn from(config: &EncryptionConfig) -> Self {
        Self {
            encryption_option: config.option.as_str().to_string(),
            kms_key: config.kms_key.clone(),
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "AthenaResultConfiguration")]
pub struct ResultConfigurationObject {
    output_location: Option<String>,
    encryption_configuration: Option<EncryptionObject>,
}

impl From<&ResultConfig> for ResultConfigurationObject {
    fn from(config: &ResultConfig) -> Self {
        Self {
            output_location: config.output_location.clone(),
            encryption_configuration: config.encryption.as_ref().map(EncryptionObject::from),
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "AthenaQueryExecutionContext")]
pub struct ExecutionContextObject {
    database: Option<String>,
    catalog: Option<String>,
}

#[derive(SimpleObject)]
#[graphql(name = "AthenaQueryExecutionStatus")]
pub struct ExecutionStatusObject {
    state: String,
    state_change_reason: Option<String>,
    submission_date_time: Option<String>,
    completion_date_time: Option<String>,
}

impl From<&ExecutionStatus> for ExecutionStatusObject {
    fn from(status: &ExecutionStatus) -> Self {
        Self {
            state: status.state.as_str().to_string(),
            state_change_reason: status.reason.clone(),
            submission_date_time: status.submitted_at.map(|t| t.to_rfc3339()),
            completion_date_time: status.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "AthenaQueryStatistics")]
pub struct StatisticsObject {
    engine_execution_time_in_millis: i64,
    data_scanned_in_bytes: i64,
    /// Scanned bytes in 1024-based units.
    data_scanned_formatted: String,
    /// Estimated cost at $5 per TB scanned.
    query_cost: String,
}

impl From<&ExecutionStatistics> for StatisticsObject {
    fn from(stats: &ExecutionStatistics) -> Self {
        Self {
            engine_execution_time_in_millis: stats.engine_execution_time_ms,
            data_scanned_in_bytes: stats.data_scanned_bytes,
            data_scanned_formatted: bytes_to_size(stats.data_scanned_bytes),
            query_cost: format_cost(bytes_to_tb(stats.data_scanned_bytes)),
        }
    }
}

/// Metadata and statistics of one query execution.
pub struct QueryStats(pub ExecutionStatistics);

#[Object(name = "AthenaQueryStats")]
impl QueryStats {
    async fn query_execution_id(&self) -> &str {
        &self.0.execution_id
    }

    async fn query_string(&self) -> &str {
        &self.0.sql_text
    }

    async fn result_configuration(&self) -> ResultConfigurationObject {
        ResultConfigurationObject::from(&self.0.result_config)
    }

    async fn query_execution_context(&self) -> ExecutionContextObject {
        ExecutionContextObject {
            database: self.0.execution_context.database.clone(),
            catalog: self.0.execution_context.catalog.clone(),
        }
    }

    async fn query_status(&self) -> ExecutionStatusObject {
        ExecutionStatusObject::from(&self.0.status)
    }

    async fn query_stats(&self) -> StatisticsObject {
        StatisticsObject::from(&self.0)
    }
}

// ── Dashboard rows ──────────────────────────────────────────────

/// A failed `StartQueryExecution` call. Field names follow the CloudTrail
/// table columns.
#[derive(SimpleObject)]
#[graphql(name = "AthenaFailedQuery", rename_fields = "snake_case")]
pub struct FailedQuery {
    ts: String,
    date: String,
    identity_username: String,
    errorcode: String,
    errormessage: String,
    queryexecutionid: String,
    sqlquery: String,
}

impl From<&Record> for FailedQuery {
    fn from(record: &Record) -> Self {
        Self {
            ts: column_string(record, "ts"),
            date: column_string(record, "date"),
            identity_username: column_string(record, "identity_username"),
            errorcode: column_string(record, "errorcode"),
            errormessage: column_string(record, "errormessage"),
            queryexecutionid: column_trimmed(record, "queryexecutionid"),
            sqlquery: column_trimmed(record, "sqlquery"),
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "AthenaUsageRollup")]
pub struct UsageRollup {
    executions: i32,
    data_scanned: String,
    total_cost: String,
    total_minutes: i64,
}

impl From<&UsageSummary> for UsageRollup {
    fn from(summary: &UsageSummary) -> Self {
        Self {
            executions: i32::try_from(summary.executions).unwrap_or(i32::MAX),
            data_scanned: summary.data_scanned(),
            total_cost: summary.total_cost(),
            total_minutes: summary.total_minutes(),
        }
    }
}

/// An Athena `StartQueryExecution` event from raw CloudTrail logs.
#[derive(SimpleObject)]
#[graphql(name = "AthenaCloudTrailEvent", complex)]
pub struct CloudTrailEvent {
    event_time: String,
    event_source: String,
    event_name: String,
    error_code: String,
    aws_region: String,
    user_type: String,
    user_arn: String,
    user_principal_id: String,
    user_account_id: String,
    query_execution_id: String,
}

#[ComplexObject]
impl CloudTrailEvent {
    /// Statistics of the started execution, fetched only when selected.
    async fn athena_stats(&self, ctx: &Context<'_>) -> Result<Option<QueryStats>> {
        if self.query_execution_id.is_empty() {
            return Ok(None);
        }
        let client = ctx.data::<AthenaClient>()?;
        let stats = client.stats(&self.query_execution_id).await?;
        Ok(Some(QueryStats(stats)))
    }
}

impl From<&Record> for CloudTrailEvent {
    fn from(record: &Record) -> Self {
        Self {
            event_time: column_string(record, "eventtime"),
            event_source: column_string(record, "eventsource"),
            event_name: column_string(record, "eventname"),
            error_code: column_string(record, "errorcode"),
            aws_region: column_string(record, "awsregion"),
            user_type: column_string(record, "usertype"),
            user_arn: column_string(record, "userarn"),
            user_principal_id: column_string(record, "userprincipalid"),
            user_account_id: column_string(record, "useraccountid"),
            query_execution_id: column_trimmed(record, "queryexecutionid"),
        }
    }
}

/// Execution ids found in the `queryexecutionid` column, quote-trimmed.
pub fn execution_ids(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|record| column_trimmed(record, "queryexecutionid"))
        .filter(|id| !id.is_empty())
        .collect()
}
